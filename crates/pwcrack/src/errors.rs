//! # Error Types

/// Errors from pwcrack grammar/guesser operations.
#[derive(Debug, thiserror::Error)]
pub enum PwCrackError {
    /// A password segment carries a label the parser does not recognize.
    #[error("invalid segment label: {0}")]
    InvalidSegment(String),

    /// Two training observations disagree about a grammar invariant
    /// (e.g. a structure token appearing with two different arities).
    #[error("grammar conflict: {0}")]
    GrammarConflict(String),

    /// I/O error, surfaced from training-file or dictionary reads.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Error from the persistence layer (SQLite schema or disk layout).
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Error parsing `config.ini` or a CLI-supplied configuration value.
    #[error("config error: {0}")]
    Config(String),

    /// A guesser was asked to enumerate a length/level combination that
    /// isn't representable (out of bounds for the trained grammar).
    #[error("guesser out of range: {0}")]
    OutOfRange(String),
}

/// Result type for pwcrack operations.
pub type PwResult<T> = std::result::Result<T, PwCrackError>;
