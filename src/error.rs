//! Error types for pdfjornada.
//!
//! A single [`Error`] enum covers every failure of a run: reading documents,
//! configuration, the remote extraction call, and report generation.

/// All errors that can occur while reading, extracting, and exporting.
#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    /// I/O error (file read, stdout write, report write).
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// Document-level error (not a PDF, corrupt, encrypted, too large).
    #[error("{0}")]
    Document(String),

    /// Missing or invalid configuration (API key, endpoint).
    #[error("configuration: {0}")]
    Config(String),

    /// The remote extraction call failed (transport, HTTP status).
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// The remote service answered, but not with a JSON array.
    #[error("invalid response shape: {0}")]
    InvalidResponse(String),

    /// A run finished in the error state; carries its message.
    #[error("{0}")]
    Run(String),

    /// The selection was changed while a run was in progress.
    #[error("a run is already in progress")]
    Busy,

    /// Pretty-printing error (bat rendering failure).
    #[error("pretty print: {0}")]
    Render(String),

    /// PDF report generation failure.
    #[error("report: {0}")]
    Report(String),
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Self::Extraction(e.to_string())
    }
}

impl From<lopdf::Error> for Error {
    fn from(e: lopdf::Error) -> Self {
        Self::Report(e.to_string())
    }
}

/// Convenience alias used throughout the crate.
pub(crate) type Result<T> = std::result::Result<T, Error>;
