use thiserror::Error;

use crate::backwards::NodeId;

/// Errors returned by the fallible entry points of the crate.
///
/// Operator overloads never return these; the backward pass is infallible once a graph exists.
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum Error {
    #[error("unknown node {id:?}: graph holds {len} nodes")]
    UnknownNode { id: NodeId, len: usize },

    #[error("node {0:?} is not a leaf; only leaf data may be reassigned")]
    NotALeaf(NodeId),

    #[error("input size mismatch: expected {expected}, got {actual}")]
    InputSizeMismatch { expected: usize, actual: usize },

    #[error("invalid architecture: {0}")]
    InvalidArchitecture(String),
}

pub type Result<T> = std::result::Result<T, Error>;
