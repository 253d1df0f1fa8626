//! Error type shared by the whole workspace.

use thiserror::Error;

/// Primary error type for hostsql operations.
///
/// Failures inside engine callbacks are converted with
/// [`HostError::into_sqlite`] so they surface through the statement that
/// triggered them; everything else is returned directly to the caller.
#[derive(Debug, Error)]
pub enum HostError {
    /// A table, module, or column name failed identifier validation.
    ///
    /// Identifiers are restricted to `[A-Za-z0-9_]+` before any SQL is
    /// assembled from them.
    #[error("invalid SQL identifier: {name:?}")]
    InvalidIdentifier { name: String },

    /// A mutation was attempted against a table that does not accept it.
    #[error("attempt to write a read-only virtual table")]
    ReadOnly,

    /// A host delete/insert/update callback reported failure.
    #[error("{op} rejected by host callback")]
    WriteRejected { op: &'static str },

    /// The engine asked for a scan strategy this table never advertised.
    #[error("no scan strategy registered for plan {idx_num}")]
    UnknownPlan { idx_num: i32 },

    /// A rowid handed back by the engine does not fit the host's row space.
    #[error("rowid {rowid} out of range")]
    RowidOutOfRange { rowid: i64 },

    /// Malformed wire protocol frame or payload.
    #[error("protocol error: {detail}")]
    Protocol { detail: String },

    /// I/O error, primarily from the socket layer.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error reported by the SQL engine itself.
    #[error(transparent)]
    Engine(#[from] rusqlite::Error),
}

impl HostError {
    /// Create a protocol error.
    pub fn protocol(detail: impl Into<String>) -> Self {
        Self::Protocol {
            detail: detail.into(),
        }
    }

    /// Convert into an engine error suitable for returning from a
    /// virtual-table callback.
    ///
    /// Read-only rejections keep their engine error code so statements
    /// fail with the engine's own "readonly" diagnosis; everything else
    /// rides the generic user-callback channel.
    pub(crate) fn into_sqlite(self) -> rusqlite::Error {
        match self {
            Self::Engine(e) => e,
            Self::ReadOnly => rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_READONLY),
                Some("attempt to write a read-only virtual table".to_owned()),
            ),
            other => rusqlite::Error::UserFunctionError(Box::new(other)),
        }
    }
}

/// Result type alias using [`HostError`].
pub type Result<T> = std::result::Result<T, HostError>;
