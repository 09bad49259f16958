//! Unified error types for overcast.

use tokio_rusqlite::rusqlite;

/// Unified error types for the offline engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// URL could not be parsed or resolved against the base URL.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Store database operation failed.
    #[error("store error: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("store error: migration failed: {0}")]
    MigrationFailed(String),

    /// Connection-level network failure (DNS, refused, timeout). Not an
    /// HTTP error status; those travel back as ordinary responses.
    #[error("network unreachable: {0}")]
    Network(String),

    /// A shell-manifest URL could not be fetched at install time.
    #[error("install failed: {0}")]
    InstallFailed(String),

    /// Lifecycle transition requested from a state that does not allow it.
    #[error("invalid lifecycle transition: {0}")]
    InvalidTransition(String),

    /// Control channel receiver is gone.
    #[error("control channel closed")]
    ControlClosed,
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}
