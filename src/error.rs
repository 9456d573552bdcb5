use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RapportError {
    #[error("Config directory not found at {0}. Run 'rapport init' to create it.")]
    ConfigNotFound(PathBuf),

    #[error("Config file not found: {0}")]
    ConfigFileNotFound(PathBuf),

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config directory already exists at {0}")]
    AlreadyInitialized(PathBuf),

    #[error("Failed to read records from {path}: {source}")]
    InputParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid date '{0}'. Expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("No records to report on. Use --input <file.json> or configure [backend] in config.toml")]
    NoSource,

    #[error("Not logged in as {0}. Run 'rapport login' first.")]
    NotAuthenticated(String),

    #[error("Malformed token: {0}")]
    MalformedToken(String),

    #[error("Backend request failed: {0}")]
    Backend(String),

    #[error("Typst not found. Install it from https://typst.app/ or run: cargo install typst-cli")]
    TypstNotFound,

    #[error("Failed to generate PDF: {0}")]
    PdfGeneration(String),

    #[error("Cart is empty, nothing to put on a receipt")]
    EmptyCart,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RapportError>;
