//! The three-step cycle every role visits (spec §4.1).
//!
//! Re-architected per spec §9: rather than a parallel class hierarchy of
//! step-strategy objects with back-pointers into the role, `Step` is a plain
//! enum and the per-step behavior is free functions taking the role's state
//! as an explicit argument.

use powercap_platform::{Control, PlatformIo, Signal};
use powercap_transport::{PolicyVector, SampleVector};

use crate::role::leaf::PackageState;

/// `step_count mod 3` selects one of these at every tick (spec §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    SendDownLimit,
    MeasureRuntime,
    ReduceLimit,
}

impl Step {
    pub fn from_count(step_count: u64) -> Step {
        match step_count % 3 {
            0 => Step::SendDownLimit,
            1 => Step::MeasureRuntime,
            _ => Step::ReduceLimit,
        }
    }

    /// Leaf-only: runs once when a role first advances into this step (spec §4.2).
    pub fn leaf_enter(self, packages: &mut [PackageState], policy: &PolicyVector) {
        match self {
            Step::SendDownLimit => {
                let num_packages = packages.len().max(1) as f64;
                for pkg in packages.iter_mut() {
                    let new_cap = pkg.balancer.cap() + policy.power_slack / num_packages;
                    pkg.balancer.power_cap(new_cap);
                    pkg.done = true;
                }
            }
            Step::MeasureRuntime => {
                for pkg in packages.iter_mut() {
                    pkg.done = false;
                }
            }
            Step::ReduceLimit => {
                for pkg in packages.iter_mut() {
                    pkg.balancer.target_runtime(policy.max_epoch_runtime);
                    pkg.done = false;
                    pkg.out_of_bounds = false;
                }
            }
        }
    }

    /// Leaf-only: runs on every tick while in this step, observing one epoch's worth of platform
    /// signals per package not yet done (spec §4.2). Returns once every package is done.
    pub fn leaf_sample(self, packages: &mut [PackageState], platform: &mut impl PlatformIo) -> bool {
        match self {
            Step::SendDownLimit => {}
            Step::MeasureRuntime => {
                for pkg in packages.iter_mut() {
                    if pkg.done {
                        continue;
                    }
                    if let Some(balanced) = balanced_epoch_runtime(platform, pkg.index) {
                        if pkg.balancer.is_runtime_stable(balanced) {
                            pkg.done = true;
                            pkg.runtime = pkg.balancer.runtime_sample();
                        }
                    }
                }
            }
            Step::ReduceLimit => {
                for pkg in packages.iter_mut() {
                    if pkg.done {
                        continue;
                    }
                    if pkg.out_of_bounds {
                        pkg.done = true;
                    } else if let Some(balanced) = balanced_epoch_runtime(platform, pkg.index) {
                        if pkg.balancer.is_target_met(balanced) {
                            pkg.done = true;
                        }
                    }
                    pkg.power_slack = pkg.balancer.power_slack();
                    pkg.power_headroom = pkg.balancer.power_slack();
                }
            }
        }
        packages.iter().all(|pkg| pkg.done)
    }

    /// Root-only: folds a just-completed step's aggregated sample into the policy that will be
    /// disseminated next (spec §4.4).
    pub fn root_update_policy(self, sample: &SampleVector, policy: &mut PolicyVector, num_node: usize) {
        match self {
            Step::SendDownLimit => {
                policy.power_cap = 0.0;
            }
            Step::MeasureRuntime => {
                policy.max_epoch_runtime = sample.max_epoch_runtime;
            }
            Step::ReduceLimit => {
                let n = num_node.max(1) as f64;
                policy.power_slack = (sample.sum_power_slack / n).min(sample.min_power_headroom);
            }
        }
    }
}

/// `total_epoch_time - network_time - ignore_time` (spec §4.2, glossary "Balanced epoch runtime").
/// Reads are skipped (treated as no sample, spec §4.6 `TransientPlatform`) if any signal read fails.
fn balanced_epoch_runtime(platform: &mut impl PlatformIo, package: usize) -> Option<f64> {
    let total = platform.read_signal(Signal::EpochRuntime, package).ok()?;
    let network = platform.read_signal(Signal::EpochRuntimeNetwork, package).ok()?;
    let ignore = platform.read_signal(Signal::EpochRuntimeIgnore, package).ok()?;
    Some(total - network - ignore)
}

/// Applies `limit` to `package`'s `POWER_PACKAGE_LIMIT` control, returning the value the platform
/// actually applied. Exposed for the leaf role's `adjust_platform`.
pub fn write_power_limit(platform: &mut impl PlatformIo, package: usize, limit: f64) -> Result<f64, powercap_platform::PlatformError> {
    platform.write_control(Control::PowerPackageLimit, package, limit)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn from_count_cycles_through_three_steps() {
        assert_eq!(Step::from_count(0), Step::SendDownLimit);
        assert_eq!(Step::from_count(1), Step::MeasureRuntime);
        assert_eq!(Step::from_count(2), Step::ReduceLimit);
        assert_eq!(Step::from_count(3), Step::SendDownLimit);
        assert_eq!(Step::from_count(100), Step::MeasureRuntime);
    }

    #[test]
    fn root_update_policy_applies_per_step_rule() {
        let mut policy = PolicyVector { power_cap: 300.0, step_count: 0, max_epoch_runtime: 0.0, power_slack: 0.0 };
        let sample = SampleVector { step_count: 0, max_epoch_runtime: 2.0, sum_power_slack: 40.0, min_power_headroom: 40.0 };

        Step::SendDownLimit.root_update_policy(&sample, &mut policy, 3);
        assert_eq!(policy.power_cap, 0.0);

        Step::MeasureRuntime.root_update_policy(&sample, &mut policy, 3);
        assert_eq!(policy.max_epoch_runtime, 2.0);

        Step::ReduceLimit.root_update_policy(&sample, &mut policy, 3);
        assert!((policy.power_slack - (40.0 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn root_update_policy_clamps_slack_by_headroom() {
        let mut policy = PolicyVector::default();
        // S3: sum=60 split 2 ways would be 30, but min headroom is 0.
        let sample = SampleVector { step_count: 2, max_epoch_runtime: 2.0, sum_power_slack: 60.0, min_power_headroom: 0.0 };
        Step::ReduceLimit.root_update_policy(&sample, &mut policy, 2);
        assert_eq!(policy.power_slack, 0.0);
    }
}
