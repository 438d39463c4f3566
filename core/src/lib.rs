//! Hierarchical power-balancing runtime.
//!
//! A tree of agents (one per compute node, one per aggregation level, one
//! root) cooperatively searches for the smallest per-package power limit
//! that still meets a shared target runtime, under a job-level power cap
//! (spec §1-§4). This crate implements the agent state machine
//! ([`role`], [`step`]), the per-package search ([`balancer`]), and the glue
//! that ties a role to its platform and transport ([`agent`], [`controller`]).
//!
//! Reading and writing actual hardware power/energy counters
//! ([`powercap_platform::PlatformIo`]) and moving policy/sample vectors
//! between nodes ([`powercap_transport::TreeTransport`]) are out of scope —
//! this crate is written against those two traits and ships an in-process
//! mock/simulation of each for tests.

pub mod agent;
pub mod balancer;
pub mod config;
pub mod controller;
pub mod error;
pub mod role;
pub mod step;

pub use agent::Agent;
pub use balancer::PowerBalancer;
pub use config::BalancerConfig;
pub use controller::Controller;
pub use error::AgentError;
pub use step::Step;
