use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VaultError {
    /// Invalid runtime configuration.
    #[error("config error: {0}")]
    Config(String),

    /// Table file whose size is not a whole number of records.
    #[error("size mismatch: {0}")]
    SizeMismatch(String),

    /// I/O failure carrying the operation and path that produced it.
    #[error("I/O error {operation} '{}': {source}", .path.display())]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Catch all for unexpected internal problems.
    #[error("internal error: {0}")]
    Internal(String),
}

impl VaultError {
    /// Attach the failing operation and path to an I/O error.
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        VaultError::Io {
            operation,
            path: path.into(),
            source,
        }
    }
}
