use thiserror::Error;

/// Errors that can abort a search
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SearchError {
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Cannot reduce over zero scored children at depth {depth}")]
    EmptyChildren { depth: usize },

    #[error("No legal moves available")]
    NoLegalMoves,

    #[error("Invalid depth limit {0}, must be between 1 and {max}", max = crate::MAX_SEARCH_DEPTH)]
    InvalidDepth(usize),
}

/// Convenience Result type for search operations
pub type Result<T> = std::result::Result<T, SearchError>;
