//! The leaf role: one per compute node (spec §4.2).

use powercap_platform::PlatformIo;
use powercap_transport::{PolicyVector, SampleVector};
use tracing::warn;

use crate::balancer::PowerBalancer;
use crate::config::BalancerConfig;
use crate::error::AgentError;
use crate::role::{validate_transition, Transition};
use crate::step::{write_power_limit, Step};

/// Per-package bookkeeping a leaf owns exclusively (spec §9, ring ownership).
#[derive(Debug, Clone)]
pub struct PackageState {
    pub(crate) index: usize,
    pub(crate) balancer: PowerBalancer,
    pub(crate) done: bool,
    pub(crate) out_of_bounds: bool,
    pub(crate) runtime: f64,
    pub(crate) power_slack: f64,
    pub(crate) power_headroom: f64,
}

impl PackageState {
    fn new(index: usize, min_power: f64, initial_cap: f64, measurement_window: f64, config: &BalancerConfig) -> Self {
        PackageState {
            index,
            balancer: PowerBalancer::new(min_power, initial_cap, measurement_window, config),
            done: true,
            out_of_bounds: false,
            runtime: 0.0,
            power_slack: 0.0,
            power_headroom: 0.0,
        }
    }
}

/// State machine driven on a leaf (spec §4.2).
pub struct LeafState {
    pub(crate) step_count: u64,
    pub(crate) step_complete: bool,
    pub(crate) packages: Vec<PackageState>,
}

impl LeafState {
    /// Builds a leaf with `num_packages` balancers, each seeded from the platform's reported
    /// bounds for that package and an even share of `initial_cap`.
    pub fn new<P: PlatformIo>(platform: &P, initial_cap: f64, config: &BalancerConfig) -> Result<Self, AgentError> {
        let num_packages = platform.num_packages();
        let share = initial_cap / num_packages.max(1) as f64;
        let mut packages = Vec::with_capacity(num_packages);
        for index in 0..num_packages {
            let limits = platform.limits(index).map_err(|source| AgentError::TransientPlatform { package: index, source })?;
            packages.push(PackageState::new(index, limits.min_power, share, limits.time_window, config));
        }
        Ok(LeafState { step_count: 0, step_complete: true, packages })
    }

    pub fn step(&self) -> Step {
        Step::from_count(self.step_count)
    }

    /// Applies an incoming policy: a fresh job-level cap hard-resets the leaf; otherwise the step
    /// transition rule (spec §4.1) decides whether to advance. Either way, every call pushes each
    /// package's current `power_limit` to the platform — REDUCE_LIMIT (spec §4.5) lowers that
    /// value on essentially every tick within a step, well before `step_count` itself advances, so
    /// skipping the write on an unchanged step would leave the platform pinned at a stale cap.
    /// Packages the platform clips are marked out-of-bounds.
    pub fn adjust_platform<P: PlatformIo>(&mut self, policy: PolicyVector, platform: &mut P) -> Result<(), AgentError> {
        let transition = validate_transition(self.step_count, self.step_complete, policy.step_count, policy.power_cap != 0.0, "leaf")?;

        match transition {
            Transition::Unchanged => {}
            Transition::Reset => {
                if policy.power_cap < 0.0 {
                    return Err(AgentError::InvalidPolicy { reason: "negative power_cap".to_string() });
                }
                let num_packages = self.packages.len().max(1) as f64;
                let share = policy.power_cap / num_packages;
                for pkg in self.packages.iter_mut() {
                    pkg.balancer.power_cap(share);
                    pkg.done = true;
                    pkg.out_of_bounds = false;
                    pkg.runtime = 0.0;
                    pkg.power_slack = 0.0;
                    pkg.power_headroom = 0.0;
                }
                self.step_count = 0;
                self.step_complete = true;
            }
            Transition::Advance => {
                self.step_count += 1;
                let step = Step::from_count(self.step_count);
                step.leaf_enter(&mut self.packages, &policy);
                self.step_complete = matches!(step, Step::SendDownLimit);
            }
        }

        for pkg in self.packages.iter_mut() {
            let requested = pkg.balancer.power_limit();
            match write_power_limit(platform, pkg.index, requested) {
                Ok(actual) if (actual - requested).abs() > f64::EPSILON => {
                    let clipped = AgentError::PlatformClipped { package: pkg.index, requested, actual };
                    warn!(%clipped, "recovered locally");
                    pkg.balancer.power_limit_adjusted(actual);
                    pkg.out_of_bounds = true;
                }
                Ok(_) => {}
                Err(source) => {
                    let transient = AgentError::TransientPlatform { package: pkg.index, source };
                    warn!(%transient, "recovered locally");
                }
            }
        }
        Ok(())
    }

    /// Observes one epoch per undone package and reports the aggregate sample. Returns `true`
    /// once every package has finished the current step.
    pub fn sample_platform<P: PlatformIo>(&mut self, platform: &mut P, out: &mut SampleVector) -> bool {
        let step = self.step();
        let done = step.leaf_sample(&mut self.packages, platform);
        if done {
            self.step_complete = true;
        }

        out.step_count = self.step_count;
        out.max_epoch_runtime = self.packages.iter().map(|p| p.runtime).fold(0.0_f64, f64::max);
        out.sum_power_slack = self.packages.iter().map(|p| p.power_slack).sum();
        out.min_power_headroom = self.packages.iter()
            .map(|p| p.power_headroom)
            .fold(f64::INFINITY, f64::min);
        if out.min_power_headroom.is_infinite() {
            out.min_power_headroom = 0.0;
        }

        self.step_complete
    }

    /// Total power limit currently enforced across all packages (spec §6, trace surface).
    pub fn total_power_limit(&self) -> f64 {
        self.packages.iter().map(|p| p.balancer.power_limit()).sum()
    }

    /// The job-level cap currently installed on one package's balancer, for diagnostics.
    pub fn package_cap(&self, index: usize) -> f64 {
        self.packages[index].balancer.cap()
    }
}
