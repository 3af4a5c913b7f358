use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Scan cancelled")]
    Cancelled,

    #[error("Scan timeout after {0} seconds")]
    Timeout(u64),

    #[error("Catalog store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Catalog error: {0}")]
    Catalog(#[from] core_catalog::CatalogError),

    #[error("Tag error: {0}")]
    Tags(#[from] core_tags::TagError),

    #[error("Invalid input: {field} - {message}")]
    InvalidInput { field: String, message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, ScanError>;
