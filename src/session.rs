//! Session roster types and the session manager seam.
//!
//! Sessions are owned by an external session manager. foreman only reads
//! them (to find live sub-sessions) and asks the manager to spawn new ones.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::phase::Phase;

/// Lifecycle status reported by the session manager.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Spawning,
    Working,
    PrOpen,
    CiFailed,
    ReviewPending,
    ChangesRequested,
    Approved,
    Mergeable,
    Merged,
    NeedsInput,
    Stuck,
    Errored,
    Killed,
    Done,
    Terminated,
    /// Anything the manager reports that foreman doesn't know about.
    #[serde(untagged)]
    Other(String),
}

impl SessionStatus {
    /// Terminal statuses: the session is no longer running.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Killed | Self::Done | Self::Terminated | Self::Merged
        )
    }

    /// Terminal statuses that mean the session finished its work.
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Done | Self::Merged)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Spawning => "spawning",
            Self::Working => "working",
            Self::PrOpen => "pr_open",
            Self::CiFailed => "ci_failed",
            Self::ReviewPending => "review_pending",
            Self::ChangesRequested => "changes_requested",
            Self::Approved => "approved",
            Self::Mergeable => "mergeable",
            Self::Merged => "merged",
            Self::NeedsInput => "needs_input",
            Self::Stuck => "stuck",
            Self::Errored => "errored",
            Self::Killed => "killed",
            Self::Done => "done",
            Self::Terminated => "terminated",
            Self::Other(s) => s,
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "spawning" => Self::Spawning,
            "working" => Self::Working,
            "pr_open" => Self::PrOpen,
            "ci_failed" => Self::CiFailed,
            "review_pending" => Self::ReviewPending,
            "changes_requested" => Self::ChangesRequested,
            "approved" => Self::Approved,
            "mergeable" => Self::Mergeable,
            "merged" => Self::Merged,
            "needs_input" => Self::NeedsInput,
            "stuck" => Self::Stuck,
            "errored" => Self::Errored,
            "killed" => Self::Killed,
            "done" => Self::Done,
            "terminated" => Self::Terminated,
            other => Self::Other(other.to_string()),
        })
    }
}

/// What the agent inside the session is doing, as last observed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activity {
    Active,
    Ready,
    #[default]
    Idle,
    WaitingInput,
    Blocked,
    Exited,
}

/// Links a sub-session to its parent and the swarm slot it fills.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubSessionInfo {
    pub parent_session_id: String,
    pub role: String,
    pub phase: Phase,
    pub round: u32,
}

impl SubSessionInfo {
    pub fn new(parent_session_id: &str, role: &str, phase: Phase, round: u32) -> Self {
        Self {
            parent_session_id: parent_session_id.to_string(),
            role: role.to_string(),
            phase,
            round,
        }
    }

    /// Whether this sub-session belongs to the given swarm slot.
    pub fn belongs_to(&self, parent_session_id: &str, phase: Phase, round: u32) -> bool {
        self.parent_session_id == parent_session_id && self.phase == phase && self.round == round
    }
}

/// A session as reported by the session manager. Read-only to foreman.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub project_id: String,
    #[serde(default)]
    pub phase: Phase,
    pub status: SessionStatus,
    #[serde(default)]
    pub activity: Activity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    pub workspace_path: PathBuf,
    /// Pull request URL or number, once one has been opened.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_session_info: Option<SubSessionInfo>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Session {
    pub fn new(id: &str, project_id: &str, workspace_path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.to_string(),
            project_id: project_id.to_string(),
            phase: Phase::Planning,
            status: SessionStatus::Working,
            activity: Activity::Active,
            branch: None,
            workspace_path: workspace_path.into(),
            pr: None,
            sub_session_info: None,
            metadata: HashMap::new(),
        }
    }

    pub fn with_status(mut self, status: SessionStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_activity(mut self, activity: Activity) -> Self {
        self.activity = activity;
        self
    }

    pub fn with_phase(mut self, phase: Phase) -> Self {
        self.phase = phase;
        self
    }

    pub fn with_pr(mut self, pr: &str) -> Self {
        self.pr = Some(pr.to_string());
        self
    }

    pub fn with_branch(mut self, branch: &str) -> Self {
        self.branch = Some(branch.to_string());
        self
    }

    pub fn with_sub_session(mut self, info: SubSessionInfo) -> Self {
        self.sub_session_info = Some(info);
        self
    }

    /// No longer running: terminal status or an exited agent.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal() || self.activity == Activity::Exited
    }

    /// The change is waiting on review and a PR exists.
    pub fn is_awaiting_code_review(&self) -> bool {
        self.status == SessionStatus::ReviewPending && self.pr.is_some()
    }
}

/// Everything the session manager needs to start a swarm member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnRequest {
    pub project_id: String,
    pub phase: Phase,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    pub workspace_path: PathBuf,
    pub sub_session: SubSessionInfo,
}

/// The external session manager.
///
/// Real implementations launch agents in some runtime. Tests use an
/// in-memory double that records spawn requests.
#[async_trait]
pub trait SessionManager: Send + Sync {
    /// Every session currently known, sub-sessions included.
    async fn list(&self) -> Result<Vec<Session>>;

    /// Start a new sub-session.
    async fn spawn(&self, request: SpawnRequest) -> Result<Session>;
}
