//! The tree transport facade (spec §6).
//!
//! Generalizes the teacher's point-to-point [`Push`]/[`Pull`](
//! `timely_communication::{Push, Pull}`) split-phase channel traits to the
//! two tree-shaped operations the balancing core needs: broadcasting a
//! policy down to every child, and gathering one sample per child back up.
//! A concrete transport (TCP, MPI, the in-process [`InProcessTree`](
//! crate::in_process::InProcessTree) used in tests) only has to implement
//! this trait; the core never sees the wire.

use crate::error::TransportError;
use crate::vectors::{PolicyVector, SampleVector};

/// One node's view of its edges in the agent tree.
pub trait TreeTransport {
    /// Broadcasts `policy` to every child (spec §3 invariant: all children
    /// receive the same vector). A no-op for a childless (leaf) node.
    fn send_down(&mut self, policy: PolicyVector) -> Result<(), TransportError>;

    /// Blocks until the policy vector this node's parent sent down arrives.
    /// Must not be called on the root, which has no parent edge.
    fn recv_down(&mut self) -> Result<PolicyVector, TransportError>;

    /// Blocks until every child has sent its sample vector, in child order.
    /// Returns an empty vector for a childless (leaf) node.
    fn recv_up(&mut self) -> Result<Vec<SampleVector>, TransportError>;

    /// Sends this node's aggregated sample vector up to its parent.
    /// Must not be called on the root, which has no parent edge.
    fn send_up(&mut self, sample: SampleVector) -> Result<(), TransportError>;

    /// Number of direct children this node has.
    fn num_children(&self) -> usize;

    /// Whether this node is the tree root (has no parent edge).
    fn is_root(&self) -> bool;
}
