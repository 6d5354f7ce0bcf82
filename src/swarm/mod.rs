//! Swarms: role-scoped sub-sessions spawned under one parent session.
//!
//! ## Components
//!
//! - [`coverage`]: joins the roster against a (parent, phase, round) slot
//! - [`spawner`]: turns a [`SwarmRequest`] into deduplicated spawn calls
//! - [`prompts`]: prompt templates for reviewers, planners and implementers
//!
//! A swarm request names the roles that should be live. The spawner decides
//! which of them actually need a new session this cycle.

pub mod coverage;
pub mod prompts;
pub mod spawner;

pub use coverage::SwarmCoverage;
pub use spawner::{SpawnOutcome, SpawnPlan, SwarmSpawner};

use crate::phase::Phase;

/// One role the swarm should have, with the prompt to start it with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwarmMember {
    pub role: String,
    pub prompt: String,
}

impl SwarmMember {
    pub fn new(role: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            prompt: prompt.into(),
        }
    }
}

/// Roles to keep live for one (phase, round) of a parent session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwarmRequest {
    pub phase: Phase,
    pub round: u32,
    pub members: Vec<SwarmMember>,
    /// Most spawn calls issued in one cycle. `None` is unbounded.
    pub max_agents: Option<usize>,
}

impl SwarmRequest {
    pub fn new(phase: Phase, round: u32, members: Vec<SwarmMember>) -> Self {
        Self {
            phase,
            round,
            members,
            max_agents: None,
        }
    }

    pub fn with_max_agents(mut self, max_agents: Option<usize>) -> Self {
        self.max_agents = max_agents;
        self
    }

    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(|m| m.role.as_str())
    }
}
