mod settings;

pub use settings::{BackendSettings, Config, ReportSettings, StoreSettings};

use crate::auth::SessionFile;
use crate::error::{RapportError, Result};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Get the config directory path (XDG config dir, or ~/.rapport/)
pub fn config_dir() -> Result<PathBuf> {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "rapport") {
        return Ok(proj_dirs.config_dir().to_path_buf());
    }

    // Fallback to ~/.rapport/
    let home = dirs_home().ok_or_else(|| {
        RapportError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not determine home directory",
        ))
    })?;

    Ok(home.join(".rapport"))
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

/// Expand ~ in paths
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs_home() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Load config.toml from an initialized config directory
pub fn load_config(config_dir: &Path) -> Result<Config> {
    if !config_dir.exists() {
        return Err(RapportError::ConfigNotFound(config_dir.to_path_buf()));
    }
    let path = config_dir.join("config.toml");
    if !path.exists() {
        return Err(RapportError::ConfigFileNotFound(path));
    }
    let content = fs::read_to_string(&path)?;
    let config = toml::from_str(&content).map_err(|e| RapportError::ConfigParse { path, source: e })?;
    debug!(dir = %config_dir.display(), "loaded config");
    Ok(config)
}

/// Output directory from config.toml; relative paths are taken from the config directory
pub fn resolve_output_dir(config_dir: &Path, config: &Config) -> PathBuf {
    let dir = expand_path(&config.report.output_dir);
    if dir.is_absolute() {
        dir
    } else {
        config_dir.join(dir)
    }
}

pub fn session_path(config_dir: &Path) -> PathBuf {
    config_dir.join("session.toml")
}

/// Token store kept next to config.toml
pub fn session_store(config_dir: &Path) -> SessionFile {
    SessionFile::new(session_path(config_dir))
}

/// Create the config directory and write the templates
pub fn init(config_dir: &Path) -> Result<()> {
    if config_dir.exists() {
        return Err(RapportError::AlreadyInitialized(config_dir.to_path_buf()));
    }

    fs::create_dir_all(config_dir.join("output"))?;
    fs::write(config_dir.join("config.toml"), CONFIG_TEMPLATE)?;
    Ok(())
}

/// Template content for config.toml
pub const CONFIG_TEMPLATE: &str = r#"[store]
name = "Restaurant chez Mamoune"
phone = "99 83 77 77"

[report]
# Relative paths are resolved against this directory
output_dir = "output"
# typst = "/usr/local/bin/typst"   # optional, defaults to typst on PATH

[backend]
url = "http://localhost:7000"
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn template_parses_to_defaults() {
        let config: Config = toml::from_str(CONFIG_TEMPLATE).unwrap();
        assert_eq!(config.store.name, "Restaurant chez Mamoune");
        assert_eq!(config.report.output_dir, "output");
        assert_eq!(config.report.typst, "typst");
        assert_eq!(config.backend.url, "http://localhost:7000");
    }

    #[test]
    fn sections_are_optional() {
        let config: Config = toml::from_str("[store]\nname = \"Maquis\"\nphone = \"01\"\n").unwrap();
        assert_eq!(config.store.name, "Maquis");
        assert_eq!(config.backend.url, "http://localhost:7000");
    }

    #[test]
    fn init_then_load() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("cfg");
        init(&dir).unwrap();
        assert!(dir.join("output").is_dir());

        let config = load_config(&dir).unwrap();
        assert_eq!(resolve_output_dir(&dir, &config), dir.join("output"));
        assert!(matches!(init(&dir), Err(RapportError::AlreadyInitialized(_))));
    }

    #[test]
    fn missing_dir_is_reported() {
        let tmp = TempDir::new().unwrap();
        let err = load_config(&tmp.path().join("nope")).unwrap_err();
        assert!(matches!(err, RapportError::ConfigNotFound(_)));
    }

    #[test]
    fn bad_toml_names_the_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("config.toml"), "[store\n").unwrap();
        let err = load_config(tmp.path()).unwrap_err();
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn report_header_comes_from_store() {
        let config = Config::default();
        let partial = config.report_config();
        assert_eq!(partial.store_phone.as_deref(), Some("99 83 77 77"));
        assert_eq!(partial.title, None);
    }
}
