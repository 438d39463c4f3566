//! Ties a [`Role`] to its platform and transport collaborators into one tickable unit (spec §2).
//!
//! Re-architected per spec §9: one `Agent` struct parameterized over the role it plays, rather
//! than three classes implementing a shared interface. [`Agent::descend`] and [`Agent::ascend`]
//! together are the whole loop body from spec §5 for whichever role this node holds.

use powercap_platform::{PlatformIo, PlatformLimits};
use powercap_transport::{SampleVector, TreeTransport};

use crate::config::BalancerConfig;
use crate::error::AgentError;
use crate::role::intermediate::IntermediateState;
use crate::role::leaf::LeafState;
use crate::role::root::RootState;

/// Which position in the tree this agent occupies, and the state that comes with it.
enum Role<P: PlatformIo> {
    Leaf(LeafState, P),
    Intermediate(IntermediateState),
    Root(RootState),
}

impl<P: PlatformIo> Role<P> {
    fn name(&self) -> &'static str {
        match self {
            Role::Leaf(..) => "leaf",
            Role::Intermediate(_) => "intermediate",
            Role::Root(_) => "root",
        }
    }
}

/// One node in the power-balancing tree: a role, its transport edges, and (for a leaf) the
/// platform it drives.
pub struct Agent<P: PlatformIo, T: TreeTransport> {
    role: Role<P>,
    transport: T,
}

impl<P: PlatformIo, T: TreeTransport> Agent<P, T> {
    /// Builds a leaf agent, seeding one [`crate::balancer::PowerBalancer`] per package reported
    /// by `platform` at an even share of `initial_cap`.
    pub fn leaf(platform: P, initial_cap: f64, config: &BalancerConfig, transport: T) -> Result<Self, AgentError> {
        let state = LeafState::new(&platform, initial_cap, config)?;
        Ok(Agent { role: Role::Leaf(state, platform), transport })
    }

    /// Builds an interior tree node that only relays policy down and aggregates samples up.
    pub fn intermediate(transport: T) -> Self {
        Agent { role: Role::Intermediate(IntermediateState::new()), transport }
    }

    /// Builds the one agent with no parent. `num_node` is the total leaf count, used to average
    /// aggregate power slack (spec §4.4). `job_limits` and `num_packages_in_job` are the
    /// per-package platform bounds and total package count across the whole job, used to apply
    /// the policy boundary contract (spec §6) to an injected cap.
    pub fn root(num_node: usize, job_limits: PlatformLimits, num_packages_in_job: usize, transport: T) -> Self {
        Agent { role: Role::Root(RootState::new(num_node, job_limits, num_packages_in_job)), transport }
    }

    /// Installs a fresh job-level power cap (spec §6). Valid only on the root.
    pub fn inject_cap(&mut self, cap: f64) -> Result<(), AgentError> {
        match &mut self.role {
            Role::Root(root) => root.inject_cap(cap),
            other => Err(AgentError::WrongRole { method: "inject_cap", role: other.name() }),
        }
    }

    /// The node's own `step_count`, for diagnostics and tests.
    pub fn step_count(&self) -> u64 {
        match &self.role {
            Role::Leaf(state, _) => state.step_count,
            Role::Intermediate(state) => state.step_count(),
            Role::Root(state) => state.step_count(),
        }
    }

    /// The job-level cap installed on package `index`. Valid only on a leaf.
    pub fn package_cap(&self, index: usize) -> Option<f64> {
        match &self.role {
            Role::Leaf(state, _) => Some(state.package_cap(index)),
            _ => None,
        }
    }

    /// The most recently aggregated tree-wide sample. Valid only on the root.
    pub fn root_last_sample(&self) -> Option<SampleVector> {
        match &self.role {
            Role::Root(state) => state.last_sample(),
            _ => None,
        }
    }

    /// The descend half of one control-loop round (spec §5): receive (or, on the root,
    /// construct) this round's policy, apply or relay it, and fan it out to any children.
    ///
    /// Split from [`Agent::ascend`] rather than folded into one `tick` because a single-process
    /// simulation driving the whole tree (see [`crate::controller::Controller`]) must run every
    /// node's descend phase top-down before any node's ascend phase runs bottom-up — a child's
    /// `send_up` during the *same* round it received its policy would otherwise race the parent's
    /// `recv_up` for that same round.
    pub fn descend(&mut self) -> Result<(), AgentError> {
        let Agent { role, transport } = self;

        match role {
            Role::Leaf(state, platform) => {
                let policy = transport.recv_down()?;
                state.adjust_platform(policy, platform)?;
            }
            Role::Intermediate(state) => {
                let incoming = transport.recv_down()?;
                let outgoing = state.descend(incoming)?;
                transport.send_down(outgoing)?;
            }
            Role::Root(state) => {
                let outgoing = state.broadcast()?;
                transport.send_down(outgoing)?;
            }
        }
        Ok(())
    }

    /// The ascend half of one control-loop round (spec §5): gather children's samples (if any),
    /// sample or aggregate, and report upward (unless this node is the root).
    pub fn ascend(&mut self) -> Result<(), AgentError> {
        let Agent { role, transport } = self;

        match role {
            Role::Leaf(state, platform) => {
                let mut sample = SampleVector::default();
                state.sample_platform(platform, &mut sample);
                transport.send_up(sample)?;
            }
            Role::Intermediate(state) => {
                let children = transport.recv_up()?;
                if let Some(aggregated) = state.ascend(&children)? {
                    transport.send_up(aggregated)?;
                }
            }
            Role::Root(state) => {
                let children = transport.recv_up()?;
                state.ascend(&children)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use powercap_platform::{MockPlatform, PlatformLimits};
    use powercap_transport::InProcessTree;

    use super::*;

    fn mock_platform(num_packages: usize) -> MockPlatform {
        let platform = MockPlatform::new(num_packages);
        for i in 0..num_packages {
            platform.set_limits(i, PlatformLimits { min_power: 50.0, max_power: 200.0, tdp: 180.0, time_window: 0.001 });
        }
        platform
    }

    #[test]
    fn injected_cap_resets_the_leaf_through_one_full_round() {
        let mut nodes = InProcessTree::star(1);
        let leaf_transport = nodes.pop().unwrap();
        let root_transport = nodes.pop().unwrap();

        let config = BalancerConfig::default();
        let limits = PlatformLimits { min_power: 50.0, max_power: 200.0, tdp: 180.0, time_window: 0.001 };
        let mut leaf = Agent::leaf(mock_platform(1), 150.0, &config, leaf_transport).unwrap();
        let mut root: Agent<MockPlatform, _> = Agent::root(1, limits, 1, root_transport);

        root.inject_cap(300.0).unwrap();
        root.descend().unwrap();
        leaf.descend().unwrap();
        leaf.ascend().unwrap();
        root.ascend().unwrap();

        assert_eq!(leaf.step_count(), 0);
    }

    #[test]
    fn inject_cap_is_wrong_role_off_the_root() {
        let nodes = InProcessTree::star(1);
        let mut leaf = Agent::leaf(mock_platform(1), 150.0, &BalancerConfig::default(), nodes.into_iter().nth(1).unwrap()).unwrap();
        assert!(matches!(leaf.inject_cap(10.0).unwrap_err(), AgentError::WrongRole { .. }));
    }
}
