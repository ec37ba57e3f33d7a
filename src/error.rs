//! Error taxonomy shared by the persistence and export services. The UI turns
//! every variant into a status message, so the `Display` strings are written
//! to be shown to the user as-is.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Convenience alias used by every service function.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Connection failure, SQL syntax error, or constraint violation.
    #[error("Database error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// A required field was missing or malformed. Raised before any query runs.
    #[error("{0}")]
    Validation(String),

    /// A mutation targeted a record id that is no longer in storage.
    #[error("Student #{id} was not found (it may have been deleted).")]
    NotFound { id: i64 },

    /// The export destination could not be created or written.
    #[error("Failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    pub(crate) fn validation<S: Into<String>>(message: S) -> Self {
        Error::Validation(message.into())
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}
