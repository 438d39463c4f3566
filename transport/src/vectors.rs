//! Wire payloads carried by the tree transport (spec §3).
//!
//! Both vectors are small, `Copy`, fixed-shape numeric records — there is no
//! variable-length framing or fragmentation concern here, which is why they
//! are plain structs rather than the teacher's more general `Message<T>`
//! wrapper (built for arbitrarily large, possibly-serialized dataflow
//! records). `serde` is kept from the teacher's dependency stack so a real
//! transport (TCP, MPI, whatever) can (de)serialize them directly.

use serde::{Deserialize, Serialize};

/// Flows from the root toward the leaves.
///
/// `power_cap` is non-zero *only* on the tick a fresh job-level cap is
/// injected; it is zero on every other tick (spec §3 invariant).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PolicyVector {
    pub power_cap: f64,
    pub step_count: u64,
    pub max_epoch_runtime: f64,
    pub power_slack: f64,
}

impl PolicyVector {
    /// An all-zero policy is rejected as invalid at the root boundary (spec §6).
    pub fn is_all_zero(&self) -> bool {
        self.power_cap == 0.0
            && self.step_count == 0
            && self.max_epoch_runtime == 0.0
            && self.power_slack == 0.0
    }
}

/// Flows from the leaves toward the root.
///
/// Aggregated per field as documented in spec §3: `step_count` by min,
/// `max_epoch_runtime` by max, `sum_power_slack` by sum, `min_power_headroom`
/// by min.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SampleVector {
    pub step_count: u64,
    pub max_epoch_runtime: f64,
    pub sum_power_slack: f64,
    pub min_power_headroom: f64,
}

impl SampleVector {
    /// Aggregates `self` with one more child sample using the per-field
    /// functions from spec §3 (min/max/sum/min).
    pub fn combine(self, other: &SampleVector) -> SampleVector {
        SampleVector {
            step_count: self.step_count.min(other.step_count),
            max_epoch_runtime: self.max_epoch_runtime.max(other.max_epoch_runtime),
            sum_power_slack: self.sum_power_slack + other.sum_power_slack,
            min_power_headroom: self.min_power_headroom.min(other.min_power_headroom),
        }
    }

    /// Aggregates a whole batch of child samples; panics-free on an empty batch only
    /// because the identity element makes `step_count` saturate to its own max, which
    /// callers must not mistake for a real step completion (a leaf always has at least
    /// one package, so an empty batch only arises for a childless node, which never
    /// aggregates — see `Role::Leaf`).
    pub fn aggregate<'a>(samples: impl IntoIterator<Item = &'a SampleVector>) -> Option<SampleVector> {
        let mut iter = samples.into_iter();
        let first = *iter.next()?;
        Some(iter.fold(first, |acc, s| acc.combine(s)))
    }
}
