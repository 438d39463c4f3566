//! The per-package power balancer (spec §4.5).
//!
//! One instance lives per package/NUMA domain on a leaf. It is owned
//! exclusively by the leaf role (spec §9, "shared ring buffer ownership") —
//! nothing else ever touches its ring, so there is no reference counting
//! here, just a plain struct.

use std::collections::VecDeque;

use crate::config::BalancerConfig;

/// Given a stream of epoch runtimes under a stationary cap, decides when the
/// stream is stable, then searches downward for the smallest limit that
/// still meets a target runtime.
#[derive(Debug, Clone)]
pub struct PowerBalancer {
    power_cap: f64,
    power_limit: f64,
    min_power: f64,
    target_runtime: Option<f64>,
    last_known_good_limit: f64,
    runtime_ring: VecDeque<f64>,
    ring_capacity: usize,
    stability_factor: f64,
    measurement_window: f64,
    min_num_samples: usize,
    reduction_step_fraction: f64,
}

impl PowerBalancer {
    /// Creates a balancer for one package, seeded with its platform bounds and the shared
    /// [`BalancerConfig`]. `measurement_window` is `POWER_PACKAGE_TIME_WINDOW`, read once at init.
    pub fn new(min_power: f64, initial_cap: f64, measurement_window: f64, config: &BalancerConfig) -> Self {
        let min_num_samples = config.min_num_samples.max(1);
        PowerBalancer {
            power_cap: initial_cap,
            power_limit: initial_cap,
            min_power,
            target_runtime: None,
            last_known_good_limit: initial_cap,
            runtime_ring: VecDeque::with_capacity(min_num_samples * 4),
            ring_capacity: min_num_samples * 4,
            stability_factor: config.stability_factor,
            measurement_window,
            min_num_samples,
            reduction_step_fraction: config.reduction_step_fraction,
        }
    }

    /// Sets the hard upper bound; resets `power_limit`, the ring, and all stability/search state
    /// (spec §3 "Lifecycle": a new job-level cap resets every balancer).
    pub fn power_cap(&mut self, cap: f64) {
        self.power_cap = cap;
        self.power_limit = cap;
        self.last_known_good_limit = cap;
        self.target_runtime = None;
        self.runtime_ring.clear();
    }

    pub fn cap(&self) -> f64 {
        self.power_cap
    }

    /// The platform floor this balancer will never reduce below.
    pub fn min_power(&self) -> f64 {
        self.min_power
    }

    /// The currently enforced limit; always `<= power_cap`.
    pub fn power_limit(&self) -> f64 {
        self.power_limit
    }

    /// Informs the balancer that the platform clipped the requested limit to `actual`;
    /// subsequent slack reporting uses `actual` (spec §4.5).
    pub fn power_limit_adjusted(&mut self, actual: f64) {
        self.power_limit = actual;
    }

    /// Installs the target the balancer will try to meet while minimizing power. Starts a fresh
    /// reduction search from the current limit.
    pub fn target_runtime(&mut self, target: f64) {
        self.target_runtime = Some(target);
        self.last_known_good_limit = self.power_limit;
        self.runtime_ring.clear();
    }

    fn push_sample(&mut self, sample: f64) {
        if sample.is_nan() || sample <= 0.0 {
            return;
        }
        if self.runtime_ring.len() >= self.ring_capacity {
            self.runtime_ring.pop_front();
        }
        self.runtime_ring.push_back(sample);
    }

    /// Median of the ring, recomputed on demand.
    pub fn runtime_sample(&self) -> f64 {
        median(self.runtime_ring.iter().copied())
    }

    fn tolerance(&self) -> f64 {
        self.stability_factor * self.measurement_window
    }

    /// Appends `sample` to the ring; returns true once at least `min_num_samples` have been seen
    /// and the most recent ones fall within `stability_factor * measurement_window` of the
    /// running median (spec §4.5).
    pub fn is_runtime_stable(&mut self, sample: f64) -> bool {
        self.push_sample(sample);
        if self.runtime_ring.len() < self.min_num_samples {
            return false;
        }
        let window_start = self.runtime_ring.len() - self.min_num_samples;
        let window: Vec<f64> = self.runtime_ring.iter().skip(window_start).copied().collect();
        let med = median(window.iter().copied());
        let tol = self.tolerance();
        window.iter().all(|v| (v - med).abs() <= tol)
    }

    /// Appends `sample`, then runs one round of the reduction policy (spec §4.5):
    /// while the ring's median is within tolerance of `target_runtime`, the package is at its
    /// floor or already converged, this returns true and the package is done for this REDUCE
    /// step; otherwise it adjusts `power_limit` (lower if there's headroom to give up, or reverts
    /// to the last known-good limit if a reduction overshot) and returns false.
    pub fn is_target_met(&mut self, sample: f64) -> bool {
        let Some(target) = self.target_runtime else {
            return true;
        };
        self.push_sample(sample);
        if self.runtime_ring.len() < self.min_num_samples {
            return false;
        }
        let med = self.runtime_sample();
        let tol = self.tolerance();

        if (med - target).abs() <= tol {
            // Converged: current limit meets the target closely enough. Nothing further to do.
            self.last_known_good_limit = self.power_limit;
            return true;
        }

        if med > target + tol {
            // A previous reduction overshot: this limit is too low to meet the target. Revert.
            self.power_limit = self.last_known_good_limit;
            self.runtime_ring.clear();
            return true;
        }

        // med < target - tol: comfortably faster than target, there is slack to give up.
        if (self.power_limit - self.min_power).abs() < f64::EPSILON {
            // Already at the platform floor; nowhere left to reduce.
            return true;
        }
        self.last_known_good_limit = self.power_limit;
        let next = self.power_limit - self.reduction_step_fraction * (self.power_limit - self.min_power);
        self.power_limit = next.max(self.min_power);
        self.runtime_ring.clear();
        false
    }

    /// `power_cap - power_limit` at the moment of the call.
    pub fn power_slack(&self) -> f64 {
        self.power_cap - self.power_limit
    }
}

fn median(values: impl Iterator<Item = f64>) -> f64 {
    let mut sorted: Vec<f64> = values.collect();
    if sorted.is_empty() {
        return 0.0;
    }
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
