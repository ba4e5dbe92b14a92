//! Error Taxonomy
//!
//! Every mutation entry point on the graph returns one of these values. The
//! core never panics across this boundary; the transport layer turns each
//! variant into its wire code with [`GraphError::code`].

use thiserror::Error;

/// Reasons a graph mutation can be rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// A node with this id already exists, or the connection is already present.
    #[error("duplicate id: {0}")]
    DuplicateId(String),

    /// A referenced node, interface or connection does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Unknown node type, mismatched interface directions, or incompatible value types.
    #[error("invalid type: {0}")]
    InvalidType(String),

    /// Committing the connection would close a cycle.
    #[error("circular connection: {0}")]
    CircularConnection(String),

    /// The request payload failed to parse before reaching the graph.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// The option document was not an object.
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// An invariant inside the graph was found broken.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GraphError {
    /// The stable wire name of this error.
    pub fn code(&self) -> &'static str {
        match self {
            GraphError::DuplicateId(_) => "duplicate_id",
            GraphError::NotFound(_) => "not_found",
            GraphError::InvalidType(_) => "invalid_type",
            GraphError::CircularConnection(_) => "circular_connection",
            GraphError::MalformedPayload(_) => "malformed_payload",
            GraphError::InvalidOptions(_) => "invalid_options",
            GraphError::Internal(_) => "internal_error",
        }
    }
}

/// Result alias used by graph mutations.
pub type GraphResult<T = ()> = Result<T, GraphError>;
