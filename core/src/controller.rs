//! Drives a whole tree of agents in lockstep rounds (spec §5).
//!
//! Grounded on the teacher's `execute_directly`/`step_or_park` loop in
//! `execute.rs`: a single thread repeatedly stepping a worker until told to
//! stop, at a cadence the caller controls rather than an event-driven
//! scheduler. Here one "step" is a whole tree round: every node's descend
//! phase top-down, then every node's ascend phase bottom-up (see
//! [`crate::agent::Agent::descend`] for why the two phases can't interleave
//! per-node in a single-process simulation).
//!
//! A real deployment runs one [`crate::agent::Agent`] per node, each on its
//! own thread or process with a real [`powercap_transport::TreeTransport`];
//! `Controller` is for simulating or testing the whole tree in one process.

use std::time::{Duration, Instant};

use powercap_platform::PlatformIo;
use powercap_transport::TreeTransport;
use tracing::{debug, trace};

use crate::agent::Agent;
use crate::error::AgentError;

/// Runs a fixed set of agents through repeated rounds at a configured cadence.
///
/// `order` is a top-down topological order over the tree (root first, each node after its
/// parent) — the ascend phase runs it in reverse.
pub struct Controller<P: PlatformIo, T: TreeTransport> {
    nodes: Vec<Agent<P, T>>,
    order: Vec<usize>,
    wait_interval: Duration,
}

impl<P: PlatformIo, T: TreeTransport> Controller<P, T> {
    /// `order[i]` must list every valid index into `nodes` exactly once, root first.
    pub fn new(nodes: Vec<Agent<P, T>>, order: Vec<usize>, wait_interval_sec: f64) -> Self {
        Controller { nodes, order, wait_interval: Duration::from_secs_f64(wait_interval_sec.max(0.0)) }
    }

    /// Runs every node's descend phase top-down, then every node's ascend phase bottom-up.
    pub fn run_round(&mut self) -> Result<(), AgentError> {
        for &idx in &self.order {
            self.nodes[idx].descend()?;
        }
        for &idx in self.order.iter().rev() {
            self.nodes[idx].ascend()?;
        }
        Ok(())
    }

    /// Runs `rounds` rounds, busy-waiting for `wait_interval` between each (spec §5, "fixed wait
    /// period" — not a sleep-based scheduler, since the interval is meant to be on the order of
    /// milliseconds and a sleeping thread's wakeup latency is not reliable at that scale).
    pub fn run(&mut self, rounds: usize) -> Result<(), AgentError> {
        for round in 0..rounds {
            self.run_round()?;
            trace!(round, "completed tree round");
            self.spin_wait();
        }
        Ok(())
    }

    /// Runs rounds until `is_done` returns true (checked after each round) or `max_rounds` is
    /// reached, whichever comes first. Returns the number of rounds actually run.
    pub fn run_until(&mut self, max_rounds: usize, mut is_done: impl FnMut(&[Agent<P, T>]) -> bool) -> Result<usize, AgentError> {
        for round in 0..max_rounds {
            self.run_round()?;
            if is_done(&self.nodes) {
                debug!(round, "tree converged");
                return Ok(round + 1);
            }
            self.spin_wait();
        }
        Ok(max_rounds)
    }

    fn spin_wait(&self) {
        if self.wait_interval.is_zero() {
            return;
        }
        let deadline = Instant::now() + self.wait_interval;
        while Instant::now() < deadline {
            std::hint::spin_loop();
        }
    }

    pub fn nodes(&self) -> &[Agent<P, T>] {
        &self.nodes
    }
}

#[cfg(test)]
mod test {
    use powercap_platform::{MockPlatform, PlatformLimits};
    use powercap_transport::InProcessTree;

    use super::*;
    use crate::config::BalancerConfig;

    fn mock_platform() -> MockPlatform {
        let platform = MockPlatform::new(1);
        platform.set_limits(0, PlatformLimits { min_power: 50.0, max_power: 200.0, tdp: 180.0, time_window: 0.001 });
        platform
    }

    #[test]
    fn one_round_with_zero_wait_runs_without_blocking() {
        let mut transports = InProcessTree::star(2);
        let leaf1_t = transports.pop().unwrap();
        let leaf2_t = transports.pop().unwrap();
        let root_t = transports.pop().unwrap();

        let config = BalancerConfig::default();
        let limits = PlatformLimits { min_power: 50.0, max_power: 200.0, tdp: 180.0, time_window: 0.001 };
        let root = Agent::root(2, limits, 2, root_t);
        let leaf1 = Agent::leaf(mock_platform(), 150.0, &config, leaf1_t).unwrap();
        let leaf2 = Agent::leaf(mock_platform(), 150.0, &config, leaf2_t).unwrap();

        let mut nodes = vec![root, leaf1, leaf2];
        nodes[0].inject_cap(300.0).unwrap();

        let mut controller = Controller::new(nodes, vec![0, 1, 2], 0.0);
        controller.run_round().unwrap();

        assert_eq!(controller.nodes()[1].step_count(), 0);
    }
}
