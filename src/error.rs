//! Error types for the text core
//!
//! Only the fallible boundaries surface here: configuration loading, parser
//! set-up and parsing. Out-of-range queries return `Option` instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The parser ran past its time budget; the layer keeps its previous tree.
    #[error("parser timed out")]
    ParserTimeout,

    #[error("unknown language `{0}`")]
    UnknownLanguage(String),

    #[error("incompatible tree-sitter language: {0}")]
    Language(#[from] tree_sitter::LanguageError),

    #[error("included range {0} overlaps or is out of order")]
    IncludedRanges(usize),

    #[error("invalid highlight query: {0}")]
    Query(#[from] tree_sitter::QueryError),

    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
