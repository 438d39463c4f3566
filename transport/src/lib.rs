//! Tree-structured message transport for the power-balancing agent tree
//! (spec §6).
//!
//! The wire format is fixed: four `f64`/`u64` policy fields flowing down,
//! four flowing up (spec §3), no fragmentation. What varies is the edge
//! implementation, captured behind [`TreeTransport`].

mod error;
mod facade;
pub mod in_process;
mod vectors;

pub use error::TransportError;
pub use facade::TreeTransport;
pub use in_process::{Endpoint, InProcessTree};
pub use vectors::{PolicyVector, SampleVector};
