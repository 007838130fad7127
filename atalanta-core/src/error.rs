//! Error types for atalanta

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Index corruption: {0}")]
    Corruption(String),

    #[error("Unknown index type: {0}")]
    UnknownIndexType(String),

    #[error("Unknown algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("Unknown scorer: {0}")]
    UnknownScorer(String),

    #[error("Unknown stemmer: {0}")]
    UnknownStemmer(String),

    #[error("Could not parse term identifiers of query `{0}`")]
    QueryParse(String),

    #[error("Multi-queries must have ids")]
    MissingQueryId,

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Query worker failed: {0}")]
    WorkerFailed(String),
}

pub type Result<T> = std::result::Result<T, Error>;
