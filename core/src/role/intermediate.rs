//! The intermediate role: relays policy down and aggregates samples up (spec §4.3).

use powercap_transport::{PolicyVector, SampleVector};

use crate::error::AgentError;
use crate::role::{validate_transition, Transition};
use crate::step::Step;

/// State machine driven on an interior tree node. [`crate::role::root::RootState`] wraps one of
/// these rather than duplicating the relay/aggregate logic (spec §9: "Root extends Intermediate").
#[derive(Debug, Clone)]
pub struct IntermediateState {
    pub(crate) step_count: u64,
    pub(crate) step_complete: bool,
    last_policy: PolicyVector,
}

impl Default for IntermediateState {
    fn default() -> Self {
        IntermediateState { step_count: 0, step_complete: true, last_policy: PolicyVector::default() }
    }
}

impl IntermediateState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self) -> Step {
        Step::from_count(self.step_count)
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    pub fn step_complete(&self) -> bool {
        self.step_complete
    }

    /// Applies the step-transition rule to `incoming`, then re-admits the resulting policy to be
    /// broadcast unchanged to every child — an intermediate node never edits a `PolicyVector` in
    /// transit, it only decides when to admit a new one (spec §4.3). The transport's `send_down`
    /// fans the returned vector out to every child edge identically.
    pub fn descend(&mut self, incoming: PolicyVector) -> Result<PolicyVector, AgentError> {
        let transition = validate_transition(self.step_count, self.step_complete, incoming.step_count, incoming.power_cap != 0.0, "intermediate")?;

        match transition {
            Transition::Unchanged => {}
            Transition::Reset => {
                if incoming.power_cap < 0.0 {
                    return Err(AgentError::InvalidPolicy { reason: "negative power_cap".to_string() });
                }
                self.step_count = 0;
                self.step_complete = false;
                self.last_policy = incoming;
            }
            Transition::Advance => {
                self.step_count += 1;
                self.step_complete = false;
                self.last_policy = incoming;
            }
        }

        Ok(self.last_policy)
    }

    /// Aggregates one batch of per-child samples (spec §3 field-wise rules). Returns `Ok(None)`
    /// if the children haven't all caught up to this node's current step yet — normal during a
    /// step transition, not a desync. A children's aggregate step strictly *ahead* of this node's
    /// own step is impossible under correct operation and is reported as a desync.
    pub fn ascend(&mut self, children: &[SampleVector]) -> Result<Option<SampleVector>, AgentError> {
        let Some(aggregated) = SampleVector::aggregate(children) else {
            return Ok(None);
        };

        if aggregated.step_count < self.step_count {
            return Ok(None);
        }
        if aggregated.step_count > self.step_count {
            return Err(AgentError::ProtocolDesync { role: "intermediate", expected_step: self.step_count, found_step: aggregated.step_count });
        }

        self.step_complete = true;
        Ok(Some(aggregated))
    }
}
