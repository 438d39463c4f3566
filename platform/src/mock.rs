//! An in-memory [`PlatformIo`] for simulation and tests.
//!
//! Modeled on the teacher's `allocator::thread::Thread`: single-threaded,
//! interior-mutable state shared through `Rc<RefCell<_>>`, no real I/O.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::PlatformError;
use crate::facade::{Control, ControlHandle, PlatformIo, PlatformLimits, Signal, SignalHandle};

#[derive(Default)]
struct PackageState {
    limits: PlatformLimits,
    epoch_runtime: f64,
    epoch_count: f64,
    epoch_runtime_network: f64,
    epoch_runtime_ignore: f64,
    power_limit: f64,
}

impl Default for PlatformLimits {
    fn default() -> Self {
        PlatformLimits { min_power: 0.0, max_power: 0.0, tdp: 0.0, time_window: 1.0 }
    }
}

struct Inner {
    packages: Vec<PackageState>,
    signal_regs: Vec<(Signal, usize)>,
    control_regs: Vec<(Control, usize)>,
    staged: Vec<(ControlHandle, f64)>,
}

/// A mock platform: one in-process struct standing in for the hardware facade.
///
/// Construct with [`MockPlatform::new`], seed each package's `min/max/tdp`
/// bounds with [`MockPlatform::set_limits`], then drive it from tests by
/// calling [`MockPlatform::set_epoch`] before each simulated epoch.
pub struct MockPlatform {
    inner: Rc<RefCell<Inner>>,
}

impl MockPlatform {
    pub fn new(num_packages: usize) -> Self {
        let packages = (0..num_packages).map(|_| PackageState::default()).collect();
        MockPlatform {
            inner: Rc::new(RefCell::new(Inner {
                packages,
                signal_regs: Vec::new(),
                control_regs: Vec::new(),
                staged: Vec::new(),
            })),
        }
    }

    pub fn set_limits(&self, package: usize, limits: PlatformLimits) {
        self.inner.borrow_mut().packages[package].limits = limits;
    }

    /// Sets the epoch measurement a leaf would read on its next `read_batch`.
    pub fn set_epoch(&self, package: usize, runtime: f64, network: f64, ignore: f64) {
        let mut inner = self.inner.borrow_mut();
        let pkg = &mut inner.packages[package];
        pkg.epoch_runtime = runtime;
        pkg.epoch_runtime_network = network;
        pkg.epoch_runtime_ignore = ignore;
        pkg.epoch_count += 1.0;
    }

    /// The power limit last applied to `package`, after platform clipping.
    pub fn power_limit(&self, package: usize) -> f64 {
        self.inner.borrow().packages[package].power_limit
    }
}

impl Clone for MockPlatform {
    fn clone(&self) -> Self {
        MockPlatform { inner: self.inner.clone() }
    }
}

fn signal_value(pkg: &PackageState, signal: Signal) -> f64 {
    match signal {
        Signal::EpochRuntime => pkg.epoch_runtime,
        Signal::EpochCount => pkg.epoch_count,
        Signal::EpochRuntimeNetwork => pkg.epoch_runtime_network,
        Signal::EpochRuntimeIgnore => pkg.epoch_runtime_ignore,
        Signal::PowerPackageMin => pkg.limits.min_power,
        Signal::PowerPackageMax => pkg.limits.max_power,
        Signal::PowerPackageTdp => pkg.limits.tdp,
        Signal::PowerPackageTimeWindow => pkg.limits.time_window,
    }
}

impl PlatformIo for MockPlatform {
    fn push_signal(&mut self, signal: Signal, package: usize) -> SignalHandle {
        let mut inner = self.inner.borrow_mut();
        inner.signal_regs.push((signal, package));
        SignalHandle(inner.signal_regs.len() - 1)
    }

    fn sample(&self, handle: SignalHandle) -> Result<f64, PlatformError> {
        let inner = self.inner.borrow();
        let (signal, package) = *inner.signal_regs.get(handle.0)
            .ok_or(PlatformError::UnknownHandle(handle.0))?;
        let pkg = inner.packages.get(package).ok_or(PlatformError::NoSuchPackage(package))?;
        Ok(signal_value(pkg, signal))
    }

    fn read_batch(&mut self) -> Result<(), PlatformError> {
        // The mock keeps live values at all times; a real facade would refresh its cache here.
        Ok(())
    }

    fn push_control(&mut self, control: Control, package: usize) -> ControlHandle {
        let mut inner = self.inner.borrow_mut();
        inner.control_regs.push((control, package));
        ControlHandle(inner.control_regs.len() - 1)
    }

    fn adjust(&mut self, handle: ControlHandle, value: f64) {
        let mut inner = self.inner.borrow_mut();
        inner.staged.push((handle, value));
    }

    fn write_batch(&mut self) -> Result<Vec<(ControlHandle, f64)>, PlatformError> {
        let mut inner = self.inner.borrow_mut();
        let staged = std::mem::take(&mut inner.staged);
        let mut applied = Vec::with_capacity(staged.len());
        for (handle, value) in staged {
            let (control, package) = *inner.control_regs.get(handle.0)
                .ok_or(PlatformError::UnknownHandle(handle.0))?;
            let Control::PowerPackageLimit = control;
            let pkg = inner.packages.get_mut(package).ok_or(PlatformError::NoSuchPackage(package))?;
            let clipped = value.clamp(pkg.limits.min_power, pkg.limits.max_power);
            pkg.power_limit = clipped;
            applied.push((handle, clipped));
        }
        Ok(applied)
    }

    fn read_signal(&self, signal: Signal, package: usize) -> Result<f64, PlatformError> {
        let inner = self.inner.borrow();
        let pkg = inner.packages.get(package).ok_or(PlatformError::NoSuchPackage(package))?;
        Ok(signal_value(pkg, signal))
    }

    fn write_control(&mut self, control: Control, package: usize, value: f64) -> Result<f64, PlatformError> {
        let Control::PowerPackageLimit = control;
        let mut inner = self.inner.borrow_mut();
        let pkg = inner.packages.get_mut(package).ok_or(PlatformError::NoSuchPackage(package))?;
        let clipped = value.clamp(pkg.limits.min_power, pkg.limits.max_power);
        pkg.power_limit = clipped;
        Ok(clipped)
    }

    fn num_packages(&self) -> usize {
        self.inner.borrow().packages.len()
    }

    fn limits(&self, package: usize) -> Result<PlatformLimits, PlatformError> {
        let inner = self.inner.borrow();
        inner.packages.get(package).map(|p| p.limits).ok_or(PlatformError::NoSuchPackage(package))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn write_control_clips_to_bounds() {
        let mut platform = MockPlatform::new(1);
        platform.set_limits(0, PlatformLimits { min_power: 50.0, max_power: 200.0, tdp: 180.0, time_window: 1.0 });
        let applied = platform.write_control(Control::PowerPackageLimit, 0, 500.0).unwrap();
        assert_eq!(applied, 200.0);
        assert_eq!(platform.power_limit(0), 200.0);
    }

    #[test]
    fn push_and_sample_round_trips() {
        let mut platform = MockPlatform::new(2);
        platform.set_epoch(1, 2.5, 0.1, 0.05);
        let handle = platform.push_signal(Signal::EpochRuntime, 1);
        assert_eq!(platform.sample(handle).unwrap(), 2.5);
    }
}
