//! Per-tree-position specialization of the agent (spec §2, §9).
//!
//! Re-architected per the design notes: one `Role` enum with three variants
//! instead of a class hierarchy, dispatched through [`leaf`], [`intermediate`],
//! and [`root`] — each a thin module around a state struct, not a trait
//! object.

pub mod intermediate;
pub mod leaf;
pub mod root;

use crate::error::AgentError;

/// What a step-transition check (spec §4.1) decided to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// `incoming.step_count == own.step_count` and no new cap: no-op, re-emit what was last sent.
    Unchanged,
    /// `own.step_complete && incoming.step_count == own.step_count + 1`: move to the next step.
    Advance,
    /// `incoming.power_cap != 0`: hard reset to `SEND_DOWN_LIMIT` regardless of completion state.
    Reset,
}

/// The shared step-transition rule every role applies to every incoming policy (spec §4.1).
///
/// Anything other than the three outcomes above is a protocol violation: the step counters
/// disagree in a way no valid transition explains.
pub fn validate_transition(
    own_step_count: u64,
    own_complete: bool,
    incoming_step_count: u64,
    incoming_cap_nonzero: bool,
    role: &'static str,
) -> Result<Transition, AgentError> {
    if incoming_cap_nonzero {
        return Ok(Transition::Reset);
    }
    if incoming_step_count == own_step_count {
        return Ok(Transition::Unchanged);
    }
    if own_complete && incoming_step_count == own_step_count + 1 {
        return Ok(Transition::Advance);
    }
    Err(AgentError::ProtocolDesync { role, expected_step: own_step_count, found_step: incoming_step_count })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn unchanged_when_step_counts_match_and_no_new_cap() {
        assert_eq!(validate_transition(3, false, 3, false, "leaf").unwrap(), Transition::Unchanged);
    }

    #[test]
    fn advance_requires_completion_and_plus_one() {
        assert_eq!(validate_transition(3, true, 4, false, "leaf").unwrap(), Transition::Advance);
        assert!(validate_transition(3, false, 4, false, "leaf").is_err());
    }

    #[test]
    fn nonzero_cap_always_forces_reset() {
        assert_eq!(validate_transition(5, false, 5, true, "root").unwrap(), Transition::Reset);
        assert_eq!(validate_transition(0, false, 9, true, "root").unwrap(), Transition::Reset);
    }

    #[test]
    fn arbitrary_jump_is_a_desync() {
        let err = validate_transition(3, true, 7, false, "intermediate").unwrap_err();
        assert!(matches!(err, AgentError::ProtocolDesync { expected_step: 3, found_step: 7, .. }));
    }
}
