use thiserror::Error;

use crate::parser::ParseError;
use crate::sql_compiler::CompileError;

/// Errors surfaced by the query composition library.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(String),

    /// Persisted or URL state could not be decoded
    #[error("failed to decode `{key}`: {message}")]
    Decode { key: String, message: String },

    /// A producer handed the manager a fragment of the wrong shape
    #[error("invalid fragment `{name}`: {source}")]
    InvalidFragment {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("route error: {0}")]
    Route(#[from] ParseError),

    #[error("sql compilation failed: {0}")]
    Compile(#[from] CompileError),

    /// The ancestor relation loops back onto an item already visited
    #[error("ancestor cycle detected at item `{id}`")]
    AncestorCycle { id: String },

    #[error("ancestor chain deeper than {max_depth} items")]
    BreadcrumbTooDeep { max_depth: usize },

    /// The item source (backend) failed
    #[error("item source error: {0}")]
    Source(String),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = QueryError> = std::result::Result<T, E>;
