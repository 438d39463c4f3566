//! Error kinds raised by the platform facade.

use thiserror::Error;

/// Failures a [`PlatformIo`](crate::PlatformIo) implementation can report.
///
/// Every variant here maps to the `TransientPlatform` kind in the core crate's
/// error taxonomy: a platform error never fails a whole tick, it just means
/// the caller should drop the current sample and carry on.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PlatformError {
    /// A signal or control handle was never registered with `push_signal`/`push_control`.
    #[error("unknown handle {0:?}")]
    UnknownHandle(usize),
    /// A one-shot or batched read failed transiently (e.g. a counter wrapped, a sysfs read raced).
    #[error("transient read failure for package {package}: {reason}")]
    ReadFailed { package: usize, reason: String },
    /// A one-shot or batched write failed transiently.
    #[error("transient write failure for package {package}: {reason}")]
    WriteFailed { package: usize, reason: String },
    /// `package` is out of range for this platform.
    #[error("package index {0} out of range")]
    NoSuchPackage(usize),
}
