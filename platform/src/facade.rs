//! The platform signal/control facade (spec §6).
//!
//! This module only defines the shape of the collaborator: reading package
//! energy counters and writing package power limits is someone else's job
//! (real implementations live outside this crate, e.g. behind `msr`/`sysfs`
//! or a vendor SDK). What lives here is the typed contract the balancing core
//! is written against, plus the constants it needs to validate a job-level
//! policy at the boundary.

use crate::error::PlatformError;

/// A signal the core reads from the platform, always scoped to one package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// Wall-clock time of the most recently completed epoch, in seconds.
    EpochRuntime,
    /// Monotone count of epochs completed so far.
    EpochCount,
    /// Portion of the epoch spent blocked on cross-node synchronization.
    EpochRuntimeNetwork,
    /// Portion of the epoch the application declared as ignored (warm-up, I/O, etc).
    EpochRuntimeIgnore,
    /// Platform-reported minimum power for the package, read once at init.
    PowerPackageMin,
    /// Platform-reported maximum power for the package, read once at init.
    PowerPackageMax,
    /// Platform-reported thermal design power for the package, read once at init.
    PowerPackageTdp,
    /// Platform power-averaging window, read once at init.
    PowerPackageTimeWindow,
}

/// A control the core writes to the platform, always scoped to one package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    /// The enforced power limit for the package.
    PowerPackageLimit,
}

/// Opaque handle returned by `push_signal`, presented back to `sample`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignalHandle(pub usize);

/// Opaque handle returned by `push_control`, presented back to `adjust`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControlHandle(pub usize);

/// The four init-time power bounds a leaf needs per package (spec §6).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlatformLimits {
    pub min_power: f64,
    pub max_power: f64,
    pub tdp: f64,
    pub time_window: f64,
}

/// Typed access to platform power/energy signals and controls.
///
/// Mirrors the batched push/sample/read_batch and push/adjust/write_batch
/// shape from spec §6: a caller registers the signals/controls it cares
/// about once (`push_signal`/`push_control`), then repeatedly refreshes them
/// in a batch (`read_batch`/`write_batch`) before consulting the cached
/// values (`sample`/`adjust`). `read_signal`/`write_control` are for callers
/// that only need a single value and don't want to manage a handle.
pub trait PlatformIo {
    /// Registers interest in `signal` for `package`, returning a handle for `sample`.
    fn push_signal(&mut self, signal: Signal, package: usize) -> SignalHandle;
    /// Returns the most recently batched value for `handle`.
    fn sample(&self, handle: SignalHandle) -> Result<f64, PlatformError>;
    /// Refreshes every pushed signal in one shot.
    fn read_batch(&mut self) -> Result<(), PlatformError>;

    /// Registers interest in `control` for `package`, returning a handle for `adjust`.
    fn push_control(&mut self, control: Control, package: usize) -> ControlHandle;
    /// Stages `value` to be written for `handle` on the next `write_batch`.
    fn adjust(&mut self, handle: ControlHandle, value: f64);
    /// Flushes every staged control write, returning the value the platform actually applied
    /// for each handle (a platform is free to clip a request, spec §4.6 `PlatformClipped`).
    fn write_batch(&mut self) -> Result<Vec<(ControlHandle, f64)>, PlatformError>;

    /// One-shot read, bypassing the push/batch machinery.
    fn read_signal(&self, signal: Signal, package: usize) -> Result<f64, PlatformError>;
    /// One-shot write, bypassing the push/batch machinery. Returns the value actually applied.
    fn write_control(&mut self, control: Control, package: usize, value: f64) -> Result<f64, PlatformError>;

    /// Number of packages (NUMA domains) on this node.
    fn num_packages(&self) -> usize;
    /// The init-time power bounds for `package`.
    fn limits(&self, package: usize) -> Result<PlatformLimits, PlatformError>;
}

/// Applies the job-level policy boundary contract (spec §6 "Policy validation") to a freshly
/// injected `power_cap`: a `NaN` cap is replaced by the job's total TDP, then any nonzero cap is
/// clamped to `[min_power, max_power]` scaled by the number of packages in the job. A cap of
/// exactly zero (no policy) passes through unclamped, since an all-zero policy is rejected by
/// the caller rather than clamped into range.
pub fn validate_job_power_cap(cap: f64, limits: PlatformLimits, num_packages_in_job: usize) -> f64 {
    let n = num_packages_in_job.max(1) as f64;
    let cap = if cap.is_nan() { limits.tdp * n } else { cap };
    if cap == 0.0 {
        return 0.0;
    }
    cap.clamp(limits.min_power * n, limits.max_power * n)
}

#[cfg(test)]
mod test {
    use super::*;

    fn bounds() -> PlatformLimits {
        PlatformLimits { min_power: 50.0, max_power: 200.0, tdp: 180.0, time_window: 0.001 }
    }

    #[test]
    fn nan_cap_is_replaced_by_total_tdp() {
        assert_eq!(validate_job_power_cap(f64::NAN, bounds(), 2), 360.0);
    }

    #[test]
    fn nonzero_cap_is_clamped_to_the_job_wide_band() {
        assert_eq!(validate_job_power_cap(10_000.0, bounds(), 2), 400.0);
        assert_eq!(validate_job_power_cap(-5.0, bounds(), 2), 100.0);
        assert_eq!(validate_job_power_cap(150.0, bounds(), 2), 150.0);
    }

    #[test]
    fn zero_cap_passes_through_unclamped() {
        assert_eq!(validate_job_power_cap(0.0, bounds(), 2), 0.0);
    }
}
