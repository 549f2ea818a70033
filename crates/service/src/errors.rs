use thiserror::Error;

/// Failures at the document-store seam.
///
/// Backend driver errors are flattened into these variants inside each
/// adapter so callers never depend on a specific driver's error types.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database not connected")]
    Unavailable,
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("write failed: {0}")]
    Write(String),
    #[error("read failed: {0}")]
    Read(String),
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceError {
    pub fn name_required() -> Self { Self::Validation("Name is required".into()) }
}
