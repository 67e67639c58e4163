use std::path::PathBuf;
use thiserror::Error;

/// Core error type for kiln operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Neither `FRONTEND_HOST` nor `APP_HOST` was set.
    #[error("no frontend host configured: set FRONTEND_HOST or APP_HOST")]
    MissingHost,

    /// The upstream value carried a port suffix that is not a usable port,
    /// or the derived port would leave the valid port range.
    #[error("invalid port in upstream address {value:?}")]
    InvalidPort { value: String },

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to build {path}: {message}")]
    Build { path: PathBuf, message: String },

    #[error("watch error: {0}")]
    Watch(#[from] notify::Error),
}
