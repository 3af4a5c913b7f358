use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TagError {
    #[error("Extraction failed for {path}: {message}")]
    ExtractionFailed { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown tag field: {0}")]
    UnknownField(String),
}

pub type Result<T> = std::result::Result<T, TagError>;
