//! Phase manager: one evaluation cycle for one session.
//!
//! `check` reads durable state, runs the evaluator, persists what changed and
//! issues spawn requests. It is meant to be called once per session per
//! scheduler tick; calls for the same session must not overlap.

use std::sync::Arc;

use tracing::{debug, info};

use crate::artifacts::{ArtifactStore, PlanArtifact, ReviewArtifact};
use crate::config::{WorkflowConfig, WorkflowConfigs};
use crate::errors::CheckError;
use crate::evaluator::{EvaluationInput, GateStatus, ReviewTally, evaluate};
use crate::metadata::{MetadataStore, Rounds, SessionMetadata};
use crate::phase::Phase;
use crate::session::{Session, SessionManager};
use crate::swarm::{SpawnOutcome, SwarmSpawner};

/// What a single `check` cycle did.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub previous: Phase,
    pub phase: Phase,
    pub rounds: Rounds,
    pub metadata_written: bool,
    pub tally: Option<ReviewTally>,
    pub spawn: Option<SpawnOutcome>,
}

impl CycleReport {
    pub fn transitioned(&self) -> bool {
        self.previous != self.phase
    }

    /// Number of spawn calls issued this cycle.
    pub fn spawned(&self) -> usize {
        self.spawn.as_ref().map_or(0, |outcome| outcome.spawned.len())
    }
}

/// Reads a cycle needs for the recorded phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Reads {
    plan: bool,
    review_round: Option<u32>,
    roster: bool,
}

impl Reads {
    fn for_phase(phase: Phase, workflow: &WorkflowConfig, stored: &SessionMetadata) -> Self {
        if workflow.is_simple() {
            return Self::default();
        }
        let rounds = stored.rounds;
        match phase {
            Phase::Planning => Self {
                plan: true,
                review_round: None,
                roster: workflow.planning_swarm.is_some(),
            },
            Phase::PlanReview | Phase::CodeReview => Self {
                plan: false,
                review_round: rounds.for_review_phase(phase),
                roster: true,
            },
            Phase::Implementing => {
                let distributing = workflow.implementation_swarm.is_some()
                    && stored.implementation_swarm_round != Some(rounds.implementation());
                Self {
                    plan: distributing,
                    review_round: None,
                    roster: distributing,
                }
            }
            Phase::ReadyToMerge => Self::default(),
        }
    }
}

/// Entry point for the workflow engine.
pub struct PhaseManager {
    metadata: Arc<dyn MetadataStore>,
    artifacts: Arc<dyn ArtifactStore>,
    sessions: Arc<dyn SessionManager>,
    spawner: SwarmSpawner,
    workflows: WorkflowConfigs,
}

impl PhaseManager {
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        artifacts: Arc<dyn ArtifactStore>,
        sessions: Arc<dyn SessionManager>,
        workflows: WorkflowConfigs,
    ) -> Self {
        let spawner = SwarmSpawner::new(Arc::clone(&sessions));
        Self {
            metadata,
            artifacts,
            sessions,
            spawner,
            workflows,
        }
    }

    /// Run one cycle and return the resulting phase.
    pub async fn check(&self, session: &Session) -> Result<Phase, CheckError> {
        Ok(self.check_detailed(session).await?.phase)
    }

    /// Run one cycle and report what it did.
    pub async fn check_detailed(&self, session: &Session) -> Result<CycleReport, CheckError> {
        // Swarm members are driven by their parent, never on their own.
        if session.sub_session_info.is_some() {
            debug!(session_id = %session.id, "Sub-session, nothing to evaluate");
            return Ok(CycleReport {
                previous: session.phase,
                phase: session.phase,
                rounds: Rounds::default(),
                metadata_written: false,
                tally: None,
                spawn: None,
            });
        }

        let stored = self
            .metadata
            .read(&session.id)
            .await
            .map_err(CheckError::Metadata)?
            .unwrap_or_default();
        let previous = stored.phase.unwrap_or(session.phase);
        let workflow = self.workflows.get(&session.project_id);
        let reads = Reads::for_phase(previous, workflow, &stored);

        let (plan, reviews, roster) = tokio::try_join!(
            self.read_plan(session, reads.plan),
            self.read_reviews(session, previous, reads.review_round),
            self.list_roster(reads.roster),
        )?;

        let decision = evaluate(&EvaluationInput {
            session,
            phase: previous,
            metadata: &stored,
            workflow,
            plan: plan.as_ref(),
            reviews: &reviews,
            roster: &roster,
        });

        if let Some(tally) = &decision.tally
            && tally.status != GateStatus::Pending
        {
            info!(
                session_id = %session.id,
                phase = %previous,
                status = tally.status.as_str(),
                approved = ?tally.approved_by(),
                changes_requested = ?tally.changes_requested_by(),
                "Review round decided"
            );
        }

        let changed = stored.phase != Some(decision.phase)
            || stored.rounds != decision.rounds
            || stored.implementation_swarm_round != decision.implementation_swarm_round;

        if changed {
            let mut updated = stored.clone();
            updated.phase = Some(decision.phase);
            updated.rounds = decision.rounds;
            updated.implementation_swarm_round = decision.implementation_swarm_round;
            self.metadata
                .write(&session.id, &updated)
                .await
                .map_err(CheckError::Metadata)?;
        }

        if previous != decision.phase {
            info!(
                session_id = %session.id,
                from = %previous,
                to = %decision.phase,
                plan_round = decision.rounds.plan(),
                review_round = decision.rounds.review(),
                implementation_round = decision.rounds.implementation(),
                code_review_round = decision.rounds.code_review(),
                "Phase transition"
            );
        } else {
            debug!(
                session_id = %session.id,
                phase = %previous,
                metadata_written = changed,
                "Phase unchanged"
            );
        }

        let spawn = match &decision.swarm {
            Some(request) => Some(self.spawner.ensure(session, request, &roster).await?),
            None => None,
        };

        Ok(CycleReport {
            previous,
            phase: decision.phase,
            rounds: decision.rounds,
            metadata_written: changed,
            tally: decision.tally,
            spawn,
        })
    }

    async fn read_plan(
        &self,
        session: &Session,
        wanted: bool,
    ) -> Result<Option<PlanArtifact>, CheckError> {
        if !wanted {
            return Ok(None);
        }
        self.artifacts
            .read_plan(&session.workspace_path)
            .await
            .map_err(CheckError::Artifacts)
    }

    async fn read_reviews(
        &self,
        session: &Session,
        phase: Phase,
        round: Option<u32>,
    ) -> Result<Vec<ReviewArtifact>, CheckError> {
        let Some(round) = round else {
            return Ok(Vec::new());
        };
        self.artifacts
            .read_reviews(&session.workspace_path, phase, round)
            .await
            .map_err(CheckError::Artifacts)
    }

    async fn list_roster(&self, wanted: bool) -> Result<Vec<Session>, CheckError> {
        if !wanted {
            return Ok(Vec::new());
        }
        self.sessions.list().await.map_err(CheckError::Roster)
    }
}
