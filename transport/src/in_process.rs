//! An in-process tree transport for simulation and tests.
//!
//! Modeled on the teacher's `allocator::thread::Thread`: each edge is a
//! `Rc<RefCell<VecDeque<_>>>` shared between the two endpoints it connects,
//! generalized from one bidirectional pipe to the fan-out/fan-in shape of a
//! tree (one down-edge and one up-edge per parent/child pair).
//!
//! Spec §5 describes `recv_down`/`recv_up` as blocking; this single-process
//! simulation instead returns `Err` when data has not arrived yet, since
//! there is exactly one (cooperatively scheduled) thread driving every node
//! and a true block would deadlock. Callers (the test driver, or
//! `Controller` in `powercap-core`) are expected to tick children before
//! their parent within one round.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::error::TransportError;
use crate::facade::TreeTransport;
use crate::vectors::{PolicyVector, SampleVector};

type DownEdge = Rc<RefCell<VecDeque<PolicyVector>>>;
type UpEdge = Rc<RefCell<VecDeque<SampleVector>>>;

/// A node's endpoint into an [`InProcessTree`].
pub struct Endpoint {
    node: usize,
    parent_down: Option<DownEdge>,
    parent_up: Option<UpEdge>,
    children_down: Vec<DownEdge>,
    children_up: Vec<UpEdge>,
}

impl TreeTransport for Endpoint {
    fn send_down(&mut self, policy: PolicyVector) -> Result<(), TransportError> {
        for edge in &self.children_down {
            edge.borrow_mut().push_back(policy);
        }
        Ok(())
    }

    fn recv_down(&mut self) -> Result<PolicyVector, TransportError> {
        let edge = self.parent_down.as_ref().ok_or(TransportError::NoParent(self.node))?;
        edge.borrow_mut().pop_front().ok_or(TransportError::Disconnected(self.node))
    }

    fn recv_up(&mut self) -> Result<Vec<SampleVector>, TransportError> {
        let mut samples = Vec::with_capacity(self.children_up.len());
        for edge in &self.children_up {
            match edge.borrow_mut().pop_front() {
                Some(sample) => samples.push(sample),
                None => return Err(TransportError::ChildCountMismatch {
                    node: self.node,
                    expected: self.children_up.len(),
                    got: samples.len(),
                }),
            }
        }
        Ok(samples)
    }

    fn send_up(&mut self, sample: SampleVector) -> Result<(), TransportError> {
        let edge = self.parent_up.as_ref().ok_or(TransportError::NoParent(self.node))?;
        edge.borrow_mut().push_back(sample);
        Ok(())
    }

    fn num_children(&self) -> usize {
        self.children_down.len()
    }

    fn is_root(&self) -> bool {
        self.parent_down.is_none()
    }
}

/// Builds a whole tree of in-process endpoints from a parent map.
///
/// `parent[i]` is `Some(p)` if node `i`'s parent is node `p`, or `None` if
/// node `i` is the root. Exactly one node must have `parent[i] == None`.
/// Returns one [`Endpoint`] per node, indexed the same way as `parent`.
pub struct InProcessTree;

impl InProcessTree {
    pub fn build(parent: &[Option<usize>]) -> Vec<Endpoint> {
        let n = parent.len();
        assert_eq!(parent.iter().filter(|p| p.is_none()).count(), 1, "exactly one root required");

        let down_edges: Vec<DownEdge> = (0..n).map(|_| Rc::new(RefCell::new(VecDeque::new()))).collect();
        let up_edges: Vec<UpEdge> = (0..n).map(|_| Rc::new(RefCell::new(VecDeque::new()))).collect();

        let mut children: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (child, p) in parent.iter().enumerate() {
            if let Some(p) = p {
                children[*p].push(child);
            }
        }

        (0..n).map(|i| {
            let (parent_down, parent_up) = match parent[i] {
                Some(_) => (Some(down_edges[i].clone()), Some(up_edges[i].clone())),
                None => (None, None),
            };
            let children_down = children[i].iter().map(|&c| down_edges[c].clone()).collect();
            let children_up = children[i].iter().map(|&c| up_edges[c].clone()).collect();
            Endpoint { node: i, parent_down, parent_up, children_down, children_up }
        }).collect()
    }

    /// Convenience constructor for a two-level star: one root, `num_leaves` direct children.
    pub fn star(num_leaves: usize) -> Vec<Endpoint> {
        let mut parent = vec![Some(0); num_leaves + 1];
        parent[0] = None;
        Self::build(&parent)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn star_delivers_identical_policy_to_every_child() {
        let mut nodes = InProcessTree::star(3);
        let policy = PolicyVector { power_cap: 42.0, step_count: 1, max_epoch_runtime: 0.0, power_slack: 0.0 };
        nodes[0].send_down(policy).unwrap();
        for leaf in &mut nodes[1..] {
            assert_eq!(leaf.recv_down().unwrap(), policy);
        }
    }

    #[test]
    fn star_gathers_one_sample_per_child_in_order() {
        let mut nodes = InProcessTree::star(2);
        nodes[1].send_up(SampleVector { step_count: 0, max_epoch_runtime: 1.0, sum_power_slack: 0.0, min_power_headroom: 0.0 }).unwrap();
        nodes[2].send_up(SampleVector { step_count: 0, max_epoch_runtime: 2.0, sum_power_slack: 0.0, min_power_headroom: 0.0 }).unwrap();
        let samples = nodes[0].recv_up().unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].max_epoch_runtime, 1.0);
        assert_eq!(samples[1].max_epoch_runtime, 2.0);
    }

    #[test]
    fn recv_up_before_all_children_report_errs() {
        let mut nodes = InProcessTree::star(2);
        nodes[1].send_up(SampleVector::default()).unwrap();
        let err = nodes[0].recv_up().unwrap_err();
        assert!(matches!(err, TransportError::ChildCountMismatch { expected: 2, got: 1, .. }));
    }

    #[test]
    fn root_has_no_parent_edge() {
        let mut nodes = InProcessTree::star(1);
        assert!(nodes[0].is_root());
        assert!(matches!(nodes[0].recv_down().unwrap_err(), TransportError::NoParent(0)));
        assert!(matches!(nodes[0].send_up(SampleVector::default()).unwrap_err(), TransportError::NoParent(0)));
    }
}
