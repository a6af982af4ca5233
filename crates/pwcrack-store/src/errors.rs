//! # Store error type

/// Errors from the persistence layer: SQLite schema/IO failures, distinct
/// from `pwcrack::PwCrackError` so the CLI can apply spec §7's
/// differentiated handling (fatal abort for store errors vs.
/// logged-and-dropped for per-password training errors).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A `rusqlite` call failed.
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    /// A row failed the schema contract expected by a loader (e.g. a
    /// `Grammar` row whose `item` isn't a valid base-structure string).
    #[error("malformed row in {table}: {detail}")]
    MalformedRow {
        /// The table the bad row came from.
        table: &'static str,
        /// What was wrong with it.
        detail: String,
    },

    /// The database path's parent directory could not be created.
    #[error("failed to prepare database directory: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for `pwcrack-store` operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
