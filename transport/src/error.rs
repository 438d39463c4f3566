//! Transport-level failures.

use thiserror::Error;

/// Failures the tree transport can report.
///
/// Per spec §5, the transport's blocking operations have no built-in
/// timeout; a `Disconnected` edge is the only failure mode this facade
/// models, standing in for "the peer is gone or the process died".
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransportError {
    #[error("no policy available on the down-edge into node {0}")]
    Disconnected(usize),
    #[error("node {node} expected samples from {expected} children, got {got}")]
    ChildCountMismatch { node: usize, expected: usize, got: usize },
    #[error("node {0} has no parent edge (it is the root)")]
    NoParent(usize),
}
