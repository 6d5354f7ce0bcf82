//! Roster join: which roles of a swarm slot are already live.
//!
//! Coverage is derived from the roster every cycle. Nothing about past spawn
//! calls is remembered, so a restart loses nothing.

use std::collections::{BTreeMap, BTreeSet};

use crate::phase::Phase;
use crate::session::Session;

/// Sub-sessions of one parent for one (phase, round), grouped by role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SwarmCoverage {
    /// Roles with at least one non-terminal sub-session, with those session ids.
    pub live: BTreeMap<String, Vec<String>>,
    /// Roles whose sub-session finished its work (`done` / `merged`).
    pub finished: BTreeSet<String>,
    /// Roles that only have terminal sub-sessions which did not finish.
    pub dead: BTreeSet<String>,
}

impl SwarmCoverage {
    pub fn from_roster(roster: &[Session], parent_session_id: &str, phase: Phase, round: u32) -> Self {
        let mut coverage = Self::default();

        let members = roster.iter().filter_map(|session| {
            session
                .sub_session_info
                .as_ref()
                .filter(|info| info.belongs_to(parent_session_id, phase, round))
                .map(|info| (info.role.as_str(), session))
        });

        for (role, session) in members {
            if !session.is_terminal() {
                coverage
                    .live
                    .entry(role.to_string())
                    .or_default()
                    .push(session.id.clone());
            } else if session.status.is_finished() {
                coverage.finished.insert(role.to_string());
            } else {
                coverage.dead.insert(role.to_string());
            }
        }

        // A live or finished sibling outranks a crashed one.
        let dead: BTreeSet<String> = coverage
            .dead
            .iter()
            .filter(|role| !coverage.live.contains_key(*role) && !coverage.finished.contains(*role))
            .cloned()
            .collect();
        coverage.dead = dead;

        coverage
    }

    pub fn is_covered(&self, role: &str) -> bool {
        self.live.contains_key(role)
    }

    pub fn is_finished(&self, role: &str) -> bool {
        self.finished.contains(role)
    }
}
