//! The error taxonomy from spec §7.
//!
//! `ProtocolDesync`, `InvalidPolicy`, and `WrongRole` are fatal: they surface
//! to the controller with enough context (role, step, offending values) to
//! emit a diagnostic, per §7 "Propagation". `TransientPlatform` and
//! `PlatformClipped` are recovered locally inside the leaf role and must
//! never be constructed by anything that returns `Err` out of
//! [`Agent::descend`](crate::agent::Agent::descend) or
//! [`Agent::ascend`](crate::agent::Agent::ascend) — they exist in this enum
//! only so platform failures can be logged uniformly on their way to being
//! swallowed.

use thiserror::Error;

/// Fatal and recoverable error kinds raised while running the balancing core.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AgentError {
    /// Step counters disagree across `descend`/`ascend` in a way no valid transition explains. Fatal.
    #[error("protocol desync in {role}: expected step {expected_step}, found {found_step}")]
    ProtocolDesync { role: &'static str, expected_step: u64, found_step: u64 },

    /// A policy was outside platform bounds, or all-zero. Fatal at the boundary.
    #[error("invalid policy: {reason}")]
    InvalidPolicy { reason: String },

    /// A leaf-only or non-leaf-only method was called on the wrong role. Programming bug; fatal.
    #[error("{method} is not valid for role {role}")]
    WrongRole { method: &'static str, role: &'static str },

    /// A platform signal/control call failed once. Recovered locally: drop the sample, proceed.
    #[error("transient platform failure on package {package}: {source}")]
    TransientPlatform { package: usize, source: powercap_platform::PlatformError },

    /// The platform clipped a requested limit. Recovered locally: the package is marked
    /// out-of-bounds so the REDUCE step treats it as target-met.
    #[error("package {package} clipped: requested {requested}, applied {actual}")]
    PlatformClipped { package: usize, requested: f64, actual: f64 },

    /// The transport reported a failure while sending or receiving a vector.
    #[error("transport failure: {0}")]
    Transport(#[from] powercap_transport::TransportError),
}

impl AgentError {
    /// True for the two kinds spec §7 says must never escape the agent as an `Err`.
    pub fn is_locally_recovered(&self) -> bool {
        matches!(self, AgentError::TransientPlatform { .. } | AgentError::PlatformClipped { .. })
    }
}
