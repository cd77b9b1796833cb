use thiserror::Error;

/// Canonical errors for exq core
#[derive(Error, Debug)]
pub enum Error {
    // -------- Pattern extraction --------
    #[error("failed to parse source: {0}")]
    Parse(String),

    #[error("could not find asq_start and asq_end comments")]
    MarkersNotFound,

    #[error("no node found between markers")]
    NoPatternNode,

    // -------- Match resolution --------
    #[error("could not detect language")]
    UnknownLanguage,

    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("no match found for capture @x")]
    NoMatch,

    // -------- Wrapped sources --------
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
