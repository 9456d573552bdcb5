pub mod auth;
pub mod backend;
pub mod cart;
pub mod config;
pub mod error;
pub mod output;
pub mod pdf;
pub mod report;

pub use auth::{ExpiryWatcher, TokenPayload, UserType};
pub use backend::{BackendClient, DateFilter, ExpenseCategory, ExpenseFilter};
pub use config::Config;
pub use error::{RapportError, Result};
pub use output::{Host, RenderedReport, SystemHost};
pub use pdf::{Renderer, TypstRenderer};
pub use report::{
    Document, ExpenseItem, GameSessionItem, PartialReportConfig, ReportGenerator, ReportKind,
};

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Install the stderr log subscriber once. `RAPPORT_LOG` takes precedence
/// over `RUST_LOG`; without either only warnings are shown.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter = EnvFilter::try_from_env("RAPPORT_LOG")
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("rapport=warn"));

        let _ = fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    });
}
