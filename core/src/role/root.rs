//! The root role: the one node with no parent (spec §4.4).

use powercap_platform::{validate_job_power_cap, PlatformLimits};
use powercap_transport::{PolicyVector, SampleVector};

use crate::error::AgentError;
use crate::role::intermediate::IntermediateState;
use crate::step::Step;

/// Root extends [`IntermediateState`] rather than duplicating its relay/aggregate logic (spec
/// §9): it owns no parent edge, so instead of receiving a `PolicyVector` from above it builds one
/// itself, either from an externally injected job-level cap or by folding the previous step's
/// aggregated sample via [`Step::root_update_policy`].
#[derive(Debug, Clone)]
pub struct RootState {
    inner: IntermediateState,
    policy: PolicyVector,
    num_node: usize,
    job_limits: PlatformLimits,
    num_packages_in_job: usize,
    last_sample: Option<SampleVector>,
}

impl RootState {
    /// `num_node` is the number of leaves in the tree, used to average slack across them
    /// (spec §4.4, glossary "Aggregate power slack"). `job_limits` and `num_packages_in_job` are
    /// the per-package platform bounds and total package count across the whole job, used by
    /// [`RootState::inject_cap`] to apply the policy boundary contract (spec §6).
    pub fn new(num_node: usize, job_limits: PlatformLimits, num_packages_in_job: usize) -> Self {
        RootState {
            inner: IntermediateState::new(),
            policy: PolicyVector::default(),
            num_node,
            job_limits,
            num_packages_in_job,
            last_sample: None,
        }
    }

    /// The most recently aggregated sample from the whole tree, for diagnostics (spec §6).
    pub fn last_sample(&self) -> Option<SampleVector> {
        self.last_sample
    }

    pub fn step(&self) -> Step {
        self.inner.step()
    }

    pub fn step_count(&self) -> u64 {
        self.inner.step_count()
    }

    /// `descend` is invalid at the root: there is no parent to receive a policy from (spec §4.4).
    /// Callers drive the root via [`RootState::inject_cap`] and [`RootState::broadcast`] instead.
    pub fn descend(&mut self, _incoming: PolicyVector) -> Result<PolicyVector, AgentError> {
        Err(AgentError::WrongRole { method: "descend", role: "root" })
    }

    /// Installs a fresh job-level power cap to be sent out on the next [`RootState::broadcast`]
    /// (spec §6 boundary contract): a `NaN` cap is replaced by the job's total TDP, a nonzero cap
    /// is clamped to the job's total `[min_power, max_power]` band, and the all-zero policy that
    /// would result from an exactly-zero cap is rejected.
    pub fn inject_cap(&mut self, cap: f64) -> Result<(), AgentError> {
        let cap = validate_job_power_cap(cap, self.job_limits, self.num_packages_in_job);
        if cap == 0.0 {
            return Err(AgentError::InvalidPolicy { reason: "job-level power cap resolved to zero (all-zero policy rejected)".to_string() });
        }
        self.policy = PolicyVector { power_cap: cap, step_count: 0, max_epoch_runtime: 0.0, power_slack: 0.0 };
        Ok(())
    }

    /// Produces the policy to broadcast to every child this tick: freshly injected, or carried
    /// forward from the last `ascend`. Clears the injected cap after one use so later rounds fall
    /// back to `Unchanged`/`Advance` transitions instead of re-triggering a reset.
    pub fn broadcast(&mut self) -> Result<PolicyVector, AgentError> {
        let out = self.inner.descend(self.policy)?;
        self.policy.power_cap = 0.0;
        Ok(out)
    }

    /// Aggregates children's samples and, once a full round completes, folds them into the
    /// policy the next `broadcast` will send (spec §4.4).
    pub fn ascend(&mut self, children: &[SampleVector]) -> Result<Option<SampleVector>, AgentError> {
        let aggregated = self.inner.ascend(children)?;
        if let Some(sample) = aggregated {
            let step = self.inner.step();
            step.root_update_policy(&sample, &mut self.policy, self.num_node);
            // Signals the next `broadcast` to advance past the step that just completed.
            self.policy.step_count = self.inner.step_count() + 1;
            self.last_sample = Some(sample);
            return Ok(Some(sample));
        }
        Ok(None)
    }
}
