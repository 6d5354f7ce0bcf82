//! End-to-end `check()` cycles against the file-backed stores and an
//! in-memory session manager.

use async_trait::async_trait;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use foreman::artifacts::{ArtifactStore, FileArtifactStore, PlanArtifact, ReviewArtifact, ReviewRole};
use foreman::config::{SwarmConfig, WorkflowConfig, WorkflowConfigs};
use foreman::errors::CheckError;
use foreman::metadata::{FileMetadataStore, MetadataStore};
use foreman::session::{Session, SessionManager, SessionStatus, SpawnRequest, SubSessionInfo};
use foreman::{Phase, PhaseManager};

const SESSION_ID: &str = "app-1";

/// Session manager double: spawned sessions join the roster as live.
#[derive(Default)]
struct FakeSessions {
    roster: Mutex<Vec<Session>>,
    spawned: Mutex<Vec<SpawnRequest>>,
    fail_spawn: bool,
    fail_list: bool,
}

impl FakeSessions {
    fn spawned_roles(&self) -> Vec<String> {
        self.spawned
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.sub_session.role.clone())
            .collect()
    }

    fn spawn_count(&self) -> usize {
        self.spawned.lock().unwrap().len()
    }

    fn add(&self, session: Session) {
        self.roster.lock().unwrap().push(session);
    }

    fn set_status(&self, role: &str, status: SessionStatus) {
        for session in self.roster.lock().unwrap().iter_mut() {
            if session
                .sub_session_info
                .as_ref()
                .is_some_and(|info| info.role == role)
            {
                session.status = status.clone();
            }
        }
    }
}

#[async_trait]
impl SessionManager for FakeSessions {
    async fn list(&self) -> anyhow::Result<Vec<Session>> {
        if self.fail_list {
            anyhow::bail!("session manager unreachable");
        }
        Ok(self.roster.lock().unwrap().clone())
    }

    async fn spawn(&self, request: SpawnRequest) -> anyhow::Result<Session> {
        if self.fail_spawn {
            anyhow::bail!("runtime refused to start agent");
        }
        let mut spawned = self.spawned.lock().unwrap();
        let id = format!("{}-sub-{}", request.sub_session.parent_session_id, spawned.len());
        let session = Session::new(&id, &request.project_id, request.workspace_path.clone())
            .with_phase(request.phase)
            .with_sub_session(request.sub_session.clone());
        self.roster.lock().unwrap().push(session.clone());
        spawned.push(request);
        Ok(session)
    }
}

struct Harness {
    _dir: TempDir,
    sessions_dir: PathBuf,
    workspace: PathBuf,
    sessions: Arc<FakeSessions>,
    manager: PhaseManager,
}

impl Harness {
    fn new(workflow: WorkflowConfig) -> Self {
        Self::with_sessions(workflow, FakeSessions::default())
    }

    fn with_sessions(workflow: WorkflowConfig, sessions: FakeSessions) -> Self {
        let dir = TempDir::new().unwrap();
        let sessions_dir = dir.path().join("sessions");
        let workspace = dir.path().join("ws");
        fs::create_dir_all(&workspace).unwrap();
        let sessions = Arc::new(sessions);
        let manager = PhaseManager::new(
            Arc::new(FileMetadataStore::new(&sessions_dir)),
            Arc::new(FileArtifactStore::new()),
            sessions.clone(),
            WorkflowConfigs::default().with_project("app", workflow),
        );
        Self {
            _dir: dir,
            sessions_dir,
            workspace,
            sessions,
            manager,
        }
    }

    fn session(&self) -> Session {
        Session::new(SESSION_ID, "app", &self.workspace)
    }

    fn write_metadata(&self, content: &str) {
        fs::create_dir_all(&self.sessions_dir).unwrap();
        fs::write(self.sessions_dir.join(SESSION_ID), content).unwrap();
    }

    fn metadata_file(&self) -> String {
        fs::read_to_string(self.sessions_dir.join(SESSION_ID)).unwrap()
    }

    async fn write_plan(&self, plan: PlanArtifact) {
        FileArtifactStore::new()
            .write_plan(&self.workspace, &plan)
            .await
            .unwrap();
    }

    async fn review(&self, artifact: ReviewArtifact) {
        FileArtifactStore::new()
            .write_review(&self.workspace, &artifact)
            .await
            .unwrap();
    }

    async fn check(&self) -> Phase {
        self.manager.check(&self.session()).await.unwrap()
    }

    fn sub_session(&self, role: &str, phase: Phase, round: u32) -> Session {
        Session::new(&format!("existing-{role}"), "app", &self.workspace)
            .with_sub_session(SubSessionInfo::new(SESSION_ID, role, phase, round))
    }
}

fn full() -> WorkflowConfig {
    WorkflowConfig::full()
}

// =============================================================================
// Planning
// =============================================================================

mod planning {
    use super::*;

    #[tokio::test]
    async fn test_plan_present_moves_to_plan_review() {
        let h = Harness::new(full());
        h.write_metadata("phase=planning\n");
        h.write_plan(PlanArtifact::new("# Plan\n\ntext")).await;

        assert_eq!(h.check().await, Phase::PlanReview);
        let stored = h.metadata_file();
        assert!(stored.contains("phase=plan_review\n"));
        assert!(stored.contains("reviewRound=1\n"));
        assert_eq!(h.sessions.spawn_count(), 0);
    }

    #[tokio::test]
    async fn test_no_metadata_and_no_plan_stays_planning() {
        let h = Harness::new(full());
        assert_eq!(h.check().await, Phase::Planning);
        assert!(h.metadata_file().contains("phase=planning\n"));
    }

    #[tokio::test]
    async fn test_planning_swarm_respects_max_agents_and_catches_up() {
        let workflow = full().with_planning_swarm(
            SwarmConfig::new(["researcher", "architect", "planner"]).with_max_agents(2),
        );
        let h = Harness::new(workflow);

        assert_eq!(h.check().await, Phase::Planning);
        assert_eq!(h.sessions.spawned_roles(), vec!["researcher", "architect"]);

        assert_eq!(h.check().await, Phase::Planning);
        assert_eq!(
            h.sessions.spawned_roles(),
            vec!["researcher", "architect", "planner"]
        );

        assert_eq!(h.check().await, Phase::Planning);
        assert_eq!(h.sessions.spawn_count(), 3);
    }

    #[tokio::test]
    async fn test_revision_round_waits_for_marked_plan() {
        let h = Harness::new(full());
        h.write_metadata("phase=planning\nplanRound=2\nreviewRound=2\n");
        h.write_plan(PlanArtifact::for_round("# Plan v1", 1)).await;

        assert_eq!(h.check().await, Phase::Planning);

        h.write_plan(PlanArtifact::for_round("# Plan v2", 2)).await;
        assert_eq!(h.check().await, Phase::PlanReview);
        assert!(h.metadata_file().contains("reviewRound=2\n"));
    }
}

// =============================================================================
// Reviews
// =============================================================================

mod reviews {
    use super::*;

    #[tokio::test]
    async fn test_unanimous_plan_approval_moves_to_implementing() {
        let h = Harness::new(full());
        h.write_metadata("phase=plan_review\nreviewRound=1\n");
        for role in ReviewRole::ALL {
            h.review(ReviewArtifact::approved(Phase::PlanReview, 1, role)).await;
        }

        assert_eq!(h.check().await, Phase::Implementing);
        assert!(h.metadata_file().contains("phase=implementing\n"));
        assert_eq!(h.sessions.spawn_count(), 0);
    }

    #[tokio::test]
    async fn test_plan_changes_requested_returns_to_planning() {
        let h = Harness::new(full());
        h.write_metadata("phase=plan_review\nreviewRound=2\nplanRound=2\n");
        h.review(ReviewArtifact::changes_requested(
            Phase::PlanReview,
            2,
            ReviewRole::Architect,
        ))
        .await;

        assert_eq!(h.check().await, Phase::Planning);
        let stored = h.metadata_file();
        assert!(stored.contains("phase=planning\n"));
        assert!(stored.contains("reviewRound=3\n"));
        assert!(stored.contains("planRound=3\n"));
        assert_eq!(h.sessions.spawn_count(), 0);
    }

    #[tokio::test]
    async fn test_no_reviews_spawns_all_three_reviewers() {
        let h = Harness::new(full());
        h.write_metadata("phase=plan_review\nreviewRound=1\n");

        assert_eq!(h.check().await, Phase::PlanReview);
        assert_eq!(
            h.sessions.spawned_roles(),
            vec!["architect", "developer", "product"]
        );

        let spawned = h.sessions.spawned.lock().unwrap();
        for request in spawned.iter() {
            assert_eq!(request.phase, Phase::PlanReview);
            assert_eq!(request.sub_session.parent_session_id, SESSION_ID);
            assert_eq!(request.sub_session.round, 1);
            assert!(request.prompt.contains("foreman submit-review"));
        }
    }

    #[tokio::test]
    async fn test_live_reviewer_is_not_duplicated() {
        let h = Harness::new(full());
        h.write_metadata("phase=plan_review\nreviewRound=1\n");
        h.sessions
            .add(h.sub_session("architect", Phase::PlanReview, 1));

        assert_eq!(h.check().await, Phase::PlanReview);
        assert_eq!(h.sessions.spawned_roles(), vec!["developer", "product"]);
    }

    #[tokio::test]
    async fn test_second_check_is_idempotent() {
        let h = Harness::new(full());
        h.write_metadata("phase=plan_review\nreviewRound=1\n");

        assert_eq!(h.check().await, Phase::PlanReview);
        let before = h.metadata_file();
        assert_eq!(h.sessions.spawn_count(), 3);

        assert_eq!(h.check().await, Phase::PlanReview);
        assert_eq!(h.sessions.spawn_count(), 3);
        assert_eq!(h.metadata_file(), before);
    }

    #[tokio::test]
    async fn test_terminated_reviewer_is_respawned_once() {
        let h = Harness::new(full());
        h.write_metadata("phase=plan_review\nreviewRound=1\n");
        assert_eq!(h.check().await, Phase::PlanReview);
        assert_eq!(h.sessions.spawn_count(), 3);

        h.sessions.set_status("developer", SessionStatus::Killed);

        assert_eq!(h.check().await, Phase::PlanReview);
        assert_eq!(
            h.sessions.spawned_roles(),
            vec!["architect", "developer", "product", "developer"]
        );
    }

    #[tokio::test]
    async fn test_reviewer_that_submitted_is_not_respawned() {
        let h = Harness::new(full());
        h.write_metadata("phase=code_review\ncodeReviewRound=1\n");
        h.sessions.add(
            h.sub_session("architect", Phase::CodeReview, 1)
                .with_status(SessionStatus::Done),
        );
        h.review(ReviewArtifact::approved(Phase::CodeReview, 1, ReviewRole::Architect))
            .await;

        assert_eq!(h.check().await, Phase::CodeReview);
        assert_eq!(h.sessions.spawned_roles(), vec!["developer", "product"]);
    }

    #[tokio::test]
    async fn test_code_changes_requested_returns_to_implementing() {
        let h = Harness::new(full());
        h.write_metadata("phase=code_review\ncodeReviewRound=2\nimplementationRound=1\n");
        h.review(ReviewArtifact::changes_requested(
            Phase::CodeReview,
            2,
            ReviewRole::Architect,
        ))
        .await;

        assert_eq!(h.check().await, Phase::Implementing);
        let stored = h.metadata_file();
        assert!(stored.contains("codeReviewRound=3\n"));
        assert!(stored.contains("implementationRound=2\n"));
    }

    #[tokio::test]
    async fn test_code_approval_is_ready_to_merge_and_terminal() {
        let h = Harness::new(full());
        h.write_metadata("phase=code_review\ncodeReviewRound=1\n");
        for role in ReviewRole::ALL {
            h.review(ReviewArtifact::approved(Phase::CodeReview, 1, role)).await;
        }

        assert_eq!(h.check().await, Phase::ReadyToMerge);
        let stored = h.metadata_file();

        assert_eq!(h.check().await, Phase::ReadyToMerge);
        assert_eq!(h.metadata_file(), stored);
        assert_eq!(h.sessions.spawn_count(), 0);
    }

    #[tokio::test]
    async fn test_malformed_review_is_ignored() {
        let h = Harness::new(full());
        h.write_metadata("phase=plan_review\nreviewRound=1\n");
        let dir = h.workspace.join(".foreman/reviews/plan_review/round-1");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("architect.json"), r#"{"role": "architect"}"#).unwrap();

        assert_eq!(h.check().await, Phase::PlanReview);
        assert_eq!(h.sessions.spawn_count(), 3);
    }

    #[tokio::test]
    async fn test_undecodable_review_is_ignored_and_reviewer_respawned() {
        let h = Harness::new(full());
        h.write_metadata("phase=plan_review\nreviewRound=1\n");
        let dir = h.workspace.join(".foreman/reviews/plan_review/round-1");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("architect.json"), b"\xff\xfe").unwrap();

        assert_eq!(h.check().await, Phase::PlanReview);
        assert_eq!(h.sessions.spawn_count(), 3);
        assert_eq!(h.check().await, Phase::PlanReview);
        assert_eq!(h.sessions.spawn_count(), 3);
    }
}

// =============================================================================
// Implementation
// =============================================================================

mod implementation {
    use super::*;

    fn workflow() -> WorkflowConfig {
        full().with_implementation_swarm(SwarmConfig::new(["backend", "frontend"]))
    }

    #[tokio::test]
    async fn test_swarm_distribution_then_code_review() {
        let h = Harness::new(workflow());
        h.write_metadata("phase=implementing\n");
        h.write_plan(PlanArtifact::new("# Plan\n\n- Build API\n- Build UI\n- Write docs\n"))
            .await;

        assert_eq!(h.check().await, Phase::Implementing);
        assert_eq!(h.sessions.spawned_roles(), vec!["backend", "frontend"]);
        {
            let spawned = h.sessions.spawned.lock().unwrap();
            assert!(spawned[0].prompt.contains("Build API"));
            assert!(spawned[1].prompt.contains("Build UI"));
        }
        assert!(!h.metadata_file().contains("implementationSwarmRound"));

        assert_eq!(h.check().await, Phase::Implementing);
        assert!(h.metadata_file().contains("implementationSwarmRound=1\n"));
        assert_eq!(h.sessions.spawn_count(), 2);

        let parent = h
            .session()
            .with_status(SessionStatus::ReviewPending)
            .with_pr("https://example.com/pr/12");
        assert_eq!(h.manager.check(&parent).await.unwrap(), Phase::CodeReview);
        let stored = h.metadata_file();
        assert!(stored.contains("phase=code_review\n"));
        assert!(stored.contains("codeReviewRound=1\n"));
        assert_eq!(h.sessions.spawn_count(), 2);
    }

    #[tokio::test]
    async fn test_crashed_implementer_respawned_before_distribution_completes() {
        let h = Harness::new(workflow());
        h.write_metadata("phase=implementing\n");
        h.write_plan(PlanArtifact::new("- Build API\n- Build UI\n")).await;

        h.check().await;
        h.sessions.set_status("frontend", SessionStatus::Errored);
        h.sessions.set_status("frontend", SessionStatus::Terminated);

        h.check().await;
        assert_eq!(
            h.sessions.spawned_roles(),
            vec!["backend", "frontend", "frontend"]
        );
    }

    #[tokio::test]
    async fn test_pr_without_auto_code_review_stays_implementing() {
        let h = Harness::new(full().with_auto_code_review(false));
        h.write_metadata("phase=implementing\n");
        let parent = h
            .session()
            .with_status(SessionStatus::ReviewPending)
            .with_pr("12");
        assert_eq!(h.manager.check(&parent).await.unwrap(), Phase::Implementing);
    }
}

// =============================================================================
// Workflow mode, persistence and failures
// =============================================================================

mod behavior {
    use super::*;

    #[tokio::test]
    async fn test_simple_mode_always_planning() {
        let h = Harness::new(WorkflowConfig::default());
        h.write_metadata("phase=plan_review\nreviewRound=1\n");
        h.write_plan(PlanArtifact::new("# Plan")).await;

        assert_eq!(h.check().await, Phase::Planning);
        assert_eq!(h.check().await, Phase::Planning);
        assert_eq!(h.sessions.spawn_count(), 0);
        assert!(h.metadata_file().contains("phase=planning\n"));
    }

    #[tokio::test]
    async fn test_unknown_project_uses_simple_mode() {
        let h = Harness::new(full());
        h.write_plan(PlanArtifact::new("# Plan")).await;
        let other = Session::new("other-1", "unconfigured", &h.workspace);
        assert_eq!(h.manager.check(&other).await.unwrap(), Phase::Planning);
    }

    #[tokio::test]
    async fn test_pass_through_fields_survive_transition() {
        let h = Harness::new(full());
        h.write_metadata("phase=planning\nbranch=feat/login\nissue=APP-7\nstatus=working\n");
        h.write_plan(PlanArtifact::new("# Plan")).await;

        assert_eq!(h.check().await, Phase::PlanReview);
        let stored = h.metadata_file();
        assert!(stored.contains("branch=feat/login\n"));
        assert!(stored.contains("issue=APP-7\n"));
        assert!(stored.contains("status=working\n"));
    }

    #[tokio::test]
    async fn test_corrupt_round_defaults_to_one() {
        let h = Harness::new(full());
        h.write_metadata("phase=plan_review\nreviewRound=banana\n");
        for role in ReviewRole::ALL {
            h.review(ReviewArtifact::approved(Phase::PlanReview, 1, role)).await;
        }
        assert_eq!(h.check().await, Phase::Implementing);
    }

    #[tokio::test]
    async fn test_round_at_max_does_not_wrap() {
        let h = Harness::new(full());
        h.write_metadata("phase=plan_review\nreviewRound=4294967295\n");
        h.review(ReviewArtifact::changes_requested(
            Phase::PlanReview,
            u32::MAX,
            ReviewRole::Architect,
        ))
        .await;

        assert_eq!(h.check().await, Phase::Planning);
        let stored = h.metadata_file();
        assert!(stored.contains("reviewRound=4294967295\n"));
        assert!(stored.contains("planRound=2\n"));
    }

    #[tokio::test]
    async fn test_metadata_is_source_of_truth_over_session_phase() {
        let h = Harness::new(full());
        h.write_metadata("phase=code_review\ncodeReviewRound=1\n");
        let stale = h.session().with_phase(Phase::Planning);

        assert_eq!(h.manager.check(&stale).await.unwrap(), Phase::CodeReview);
        assert_eq!(h.sessions.spawn_count(), 3);
    }

    #[tokio::test]
    async fn test_sub_session_is_left_alone() {
        let h = Harness::new(full());
        let member = h.sub_session("architect", Phase::PlanReview, 1);
        assert_eq!(h.manager.check(&member).await.unwrap(), Phase::Planning);
        assert!(!h.sessions_dir.exists());
        assert_eq!(h.sessions.spawn_count(), 0);
    }

    #[tokio::test]
    async fn test_spawn_failure_propagates() {
        let h = Harness::with_sessions(
            full(),
            FakeSessions {
                fail_spawn: true,
                ..Default::default()
            },
        );
        h.write_metadata("phase=plan_review\nreviewRound=1\n");

        let err = h.manager.check(&h.session()).await.unwrap_err();
        assert!(matches!(err, CheckError::Spawn { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn test_roster_failure_propagates() {
        let h = Harness::with_sessions(
            full(),
            FakeSessions {
                fail_list: true,
                ..Default::default()
            },
        );
        h.write_metadata("phase=plan_review\nreviewRound=1\n");

        let err = h.manager.check(&h.session()).await.unwrap_err();
        assert!(matches!(err, CheckError::Roster(_)), "{err:?}");
    }

    #[tokio::test]
    async fn test_unreadable_metadata_is_fatal() {
        let h = Harness::new(full());
        fs::create_dir_all(h.sessions_dir.join(SESSION_ID)).unwrap();

        let err = h.manager.check(&h.session()).await.unwrap_err();
        assert!(matches!(err, CheckError::Metadata(_)), "{err:?}");
    }

    #[tokio::test]
    async fn test_check_detailed_reports_transition() {
        let h = Harness::new(full());
        h.write_metadata("phase=plan_review\nreviewRound=1\n");
        for role in ReviewRole::ALL {
            h.review(ReviewArtifact::approved(Phase::PlanReview, 1, role)).await;
        }

        let report = h.manager.check_detailed(&h.session()).await.unwrap();
        assert!(report.transitioned());
        assert_eq!(report.previous, Phase::PlanReview);
        assert_eq!(report.phase, Phase::Implementing);
        assert!(report.metadata_written);
        assert_eq!(report.spawned(), 0);

        let store = FileMetadataStore::new(&h.sessions_dir);
        let stored = store.read(SESSION_ID).await.unwrap().unwrap();
        assert_eq!(stored.phase, Some(Phase::Implementing));
    }
}
