use crate::interchange::ValidationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MochiError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Remote { status: u16, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("no data.json or data.edn file found in .mochi archive")]
    NoDataEntry,

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// A file path or archive entry name that cannot be used as given.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Api Error: {0}")]
    Api(String),
}

pub type Result<T> = std::result::Result<T, MochiError>;
