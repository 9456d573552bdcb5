use serde::{Deserialize, Serialize};

use crate::backend::DEFAULT_BACKEND_URL;
use crate::report::{PartialReportConfig, DEFAULT_STORE_NAME, DEFAULT_STORE_PHONE};

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub report: ReportSettings,
    #[serde(default)]
    pub backend: BackendSettings,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StoreSettings {
    pub name: String,
    pub phone: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            name: DEFAULT_STORE_NAME.to_string(),
            phone: DEFAULT_STORE_PHONE.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ReportSettings {
    pub output_dir: String,
    /// Typst executable used to produce PDFs
    #[serde(default = "default_typst")]
    pub typst: String,
}

fn default_typst() -> String {
    "typst".to_string()
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            output_dir: "~/.rapport/output".to_string(),
            typst: default_typst(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct BackendSettings {
    pub url: String,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_BACKEND_URL.to_string(),
        }
    }
}

impl Config {
    /// Report header fields taken from the store section
    pub fn report_config(&self) -> PartialReportConfig {
        PartialReportConfig {
            store_name: Some(self.store.name.clone()),
            store_phone: Some(self.store.phone.clone()),
            ..Default::default()
        }
    }
}
