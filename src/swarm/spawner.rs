//! Swarm spawner: dedup against the live roster, cap, then spawn.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::try_join_all;
use tracing::{info, warn};

use super::{SwarmCoverage, SwarmMember, SwarmRequest};
use crate::errors::CheckError;
use crate::session::{Session, SessionManager, SpawnRequest, SubSessionInfo};

/// What one cycle will do for a swarm request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnPlan<'a> {
    pub to_spawn: Vec<&'a SwarmMember>,
    pub already_covered: Vec<String>,
    /// Uncovered roles pushed to a later cycle by the `max_agents` cap.
    pub deferred: Vec<String>,
}

/// Decide which members need a new session this cycle.
///
/// Never-spawned roles and roles whose sub-session died are treated the
/// same. Duplicate roles in the request are spawned at most once.
pub fn plan_spawns<'a>(request: &'a SwarmRequest, coverage: &SwarmCoverage) -> SpawnPlan<'a> {
    let mut seen = HashSet::new();
    let mut already_covered = Vec::new();
    let mut uncovered = Vec::new();

    for member in &request.members {
        if !seen.insert(member.role.as_str()) {
            continue;
        }
        if coverage.is_covered(&member.role) {
            already_covered.push(member.role.clone());
        } else {
            uncovered.push(member);
        }
    }

    let cap = request.max_agents.unwrap_or(usize::MAX);
    let deferred = uncovered
        .iter()
        .skip(cap)
        .map(|member| member.role.clone())
        .collect();
    uncovered.truncate(cap);

    SpawnPlan {
        to_spawn: uncovered,
        already_covered,
        deferred,
    }
}

/// Result of [`SwarmSpawner::ensure`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpawnOutcome {
    pub spawned: Vec<Session>,
    pub already_covered: Vec<String>,
    pub deferred: Vec<String>,
}

/// Issues spawn calls against the session manager.
pub struct SwarmSpawner {
    sessions: Arc<dyn SessionManager>,
}

impl SwarmSpawner {
    pub fn new(sessions: Arc<dyn SessionManager>) -> Self {
        Self { sessions }
    }

    /// Make sure every role in `request` has a live sub-session under `parent`.
    ///
    /// Spawns for different roles run concurrently. The first failure fails
    /// the call; the next cycle recomputes coverage and retries.
    pub async fn ensure(
        &self,
        parent: &Session,
        request: &SwarmRequest,
        roster: &[Session],
    ) -> Result<SpawnOutcome, CheckError> {
        let coverage = SwarmCoverage::from_roster(roster, &parent.id, request.phase, request.round);
        let plan = plan_spawns(request, &coverage);

        if !plan.deferred.is_empty() {
            warn!(
                session_id = %parent.id,
                phase = %request.phase,
                round = request.round,
                deferred = ?plan.deferred,
                max_agents = ?request.max_agents,
                "Spawn cap reached, deferring roles to the next cycle"
            );
        }

        let sessions = &self.sessions;
        let spawns = plan.to_spawn.iter().map(|member| {
            let role = member.role.clone();
            let spawn = SpawnRequest {
                project_id: parent.project_id.clone(),
                phase: request.phase,
                prompt: member.prompt.clone(),
                branch: parent.branch.clone(),
                workspace_path: parent.workspace_path.clone(),
                sub_session: SubSessionInfo::new(&parent.id, &role, request.phase, request.round),
            };
            let respawn = coverage.dead.contains(&role);
            async move {
                info!(
                    session_id = %parent.id,
                    phase = %request.phase,
                    round = request.round,
                    role = %role,
                    respawn,
                    "Spawning swarm member"
                );
                sessions
                    .spawn(spawn)
                    .await
                    .map_err(|source| CheckError::Spawn { role, source })
            }
        });

        let spawned = try_join_all(spawns).await?;

        Ok(SpawnOutcome {
            spawned,
            already_covered: plan.already_covered,
            deferred: plan.deferred,
        })
    }
}
