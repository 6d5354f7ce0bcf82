//! foreman: phase state machine and swarm spawning for long-running
//! AI coding-agent sessions.
//!
//! The entry point is [`manager::PhaseManager::check`], called once per
//! session per scheduler tick. Everything it decides is derived from durable
//! metadata, workspace artifacts and the live session roster.

pub mod artifacts;
pub mod config;
pub mod errors;
pub mod evaluator;
pub mod manager;
pub mod metadata;
pub mod phase;
pub mod session;
pub mod swarm;

pub use manager::{CycleReport, PhaseManager};
pub use phase::Phase;
