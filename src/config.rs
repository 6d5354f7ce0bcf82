//! Configuration for foreman.
//!
//! Settings are read from `foreman.toml`:
//!
//! ```toml
//! sessions_dir = "/var/lib/foreman/sessions"
//!
//! [projects.my-app.workflow]
//! mode = "full"
//! auto_code_review = true
//!
//! [projects.my-app.workflow.planning_swarm]
//! roles = ["researcher", "planner"]
//! max_agents = 2
//!
//! [projects.my-app.workflow.implementation_swarm]
//! roles = ["backend", "frontend"]
//! ```
//!
//! Projects without a `[projects.<id>]` table get the default workflow,
//! which is `simple` mode (no automation).

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::errors::ConfigError;

/// Environment variable overriding the sessions directory.
pub const SESSIONS_DIR_ENV: &str = "FOREMAN_SESSIONS_DIR";

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "FOREMAN_CONFIG";

/// How much of the workflow foreman automates for a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowMode {
    /// The session stays in planning; no phase automation.
    #[default]
    Simple,
    /// Full plan → review → implement → review pipeline.
    Full,
}

impl std::fmt::Display for WorkflowMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkflowMode::Simple => write!(f, "simple"),
            WorkflowMode::Full => write!(f, "full"),
        }
    }
}

impl std::str::FromStr for WorkflowMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "simple" => Ok(WorkflowMode::Simple),
            "full" => Ok(WorkflowMode::Full),
            _ => anyhow::bail!("Invalid workflow mode '{}'. Valid values: simple, full", s),
        }
    }
}

/// A configured swarm: which roles to run and how many to start per cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwarmConfig {
    /// Role names, in assignment order.
    #[serde(default)]
    pub roles: Vec<String>,
    /// Cap on spawn requests issued in a single evaluation cycle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_agents: Option<usize>,
}

impl SwarmConfig {
    pub fn new<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            roles: roles.into_iter().map(Into::into).collect(),
            max_agents: None,
        }
    }

    pub fn with_max_agents(mut self, max_agents: usize) -> Self {
        self.max_agents = Some(max_agents);
        self
    }
}

/// Per-project workflow settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    #[serde(default)]
    pub mode: WorkflowMode,
    /// Move to code review automatically once the PR is waiting on review.
    #[serde(default = "default_auto_code_review")]
    pub auto_code_review: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planning_swarm: Option<SwarmConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implementation_swarm: Option<SwarmConfig>,
}

fn default_auto_code_review() -> bool {
    true
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            mode: WorkflowMode::default(),
            auto_code_review: default_auto_code_review(),
            planning_swarm: None,
            implementation_swarm: None,
        }
    }
}

impl WorkflowConfig {
    /// Full-mode workflow with no swarms configured.
    pub fn full() -> Self {
        Self {
            mode: WorkflowMode::Full,
            ..Self::default()
        }
    }

    pub fn with_planning_swarm(mut self, swarm: SwarmConfig) -> Self {
        self.planning_swarm = Some(swarm);
        self
    }

    pub fn with_implementation_swarm(mut self, swarm: SwarmConfig) -> Self {
        self.implementation_swarm = Some(swarm);
        self
    }

    pub fn with_auto_code_review(mut self, enabled: bool) -> Self {
        self.auto_code_review = enabled;
        self
    }

    pub fn is_simple(&self) -> bool {
        self.mode == WorkflowMode::Simple
    }
}

/// One `[projects.<id>]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSection {
    #[serde(default)]
    pub workflow: WorkflowConfig,
}

/// The complete foreman.toml structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForemanToml {
    /// Directory holding one metadata file per session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sessions_dir: Option<PathBuf>,
    #[serde(default)]
    pub projects: HashMap<String, ProjectSection>,
}

impl ForemanToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration, returning defaults if the file doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Resolve the sessions directory: explicit override, then
    /// `FOREMAN_SESSIONS_DIR`, then the file setting, then `~/.foreman/sessions`.
    pub fn sessions_dir(&self, cli_override: Option<&Path>) -> PathBuf {
        if let Some(dir) = cli_override {
            return dir.to_path_buf();
        }
        if let Ok(dir) = std::env::var(SESSIONS_DIR_ENV)
            && !dir.is_empty()
        {
            return PathBuf::from(dir);
        }
        self.sessions_dir
            .clone()
            .unwrap_or_else(|| foreman_home().join("sessions"))
    }

    /// Workflow settings keyed by project id.
    pub fn workflows(&self) -> WorkflowConfigs {
        let mut configs = WorkflowConfigs::default();
        for (project, section) in &self.projects {
            configs.insert(project.clone(), section.workflow.clone());
        }
        configs
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        let mut projects: Vec<_> = self.projects.iter().collect();
        projects.sort_by(|a, b| a.0.cmp(b.0));

        for (project, section) in projects {
            let workflow = &section.workflow;
            let swarms = [
                ("planning_swarm", workflow.planning_swarm.as_ref()),
                ("implementation_swarm", workflow.implementation_swarm.as_ref()),
            ];
            for (name, swarm) in swarms {
                let Some(swarm) = swarm else { continue };
                if swarm.roles.is_empty() {
                    warnings.push(format!("Project '{}': {} has no roles", project, name));
                }
                if swarm.max_agents == Some(0) {
                    warnings.push(format!(
                        "Project '{}': {} max_agents = 0 never spawns anything",
                        project, name
                    ));
                }
                let mut seen = HashSet::new();
                for role in &swarm.roles {
                    if !seen.insert(role.as_str()) {
                        warnings.push(format!(
                            "Project '{}': {} lists role '{}' more than once",
                            project, name, role
                        ));
                    }
                }
            }
            if workflow.is_simple()
                && (workflow.planning_swarm.is_some() || workflow.implementation_swarm.is_some())
            {
                warnings.push(format!(
                    "Project '{}': swarms are configured but mode is simple, they will never run",
                    project
                ));
            }
        }

        warnings
    }
}

/// Project id → workflow settings, with a fallback for unknown projects.
#[derive(Debug, Clone, Default)]
pub struct WorkflowConfigs {
    projects: HashMap<String, WorkflowConfig>,
    fallback: WorkflowConfig,
}

impl WorkflowConfigs {
    /// Use `fallback` for every project without explicit settings.
    pub fn with_fallback(fallback: WorkflowConfig) -> Self {
        Self {
            projects: HashMap::new(),
            fallback,
        }
    }

    pub fn insert(&mut self, project_id: impl Into<String>, config: WorkflowConfig) {
        self.projects.insert(project_id.into(), config);
    }

    pub fn with_project(mut self, project_id: impl Into<String>, config: WorkflowConfig) -> Self {
        self.insert(project_id, config);
        self
    }

    pub fn get(&self, project_id: &str) -> &WorkflowConfig {
        self.projects.get(project_id).unwrap_or(&self.fallback)
    }
}

/// `~/.foreman`, or `./.foreman` when no home directory is known.
pub fn foreman_home() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".foreman"))
        .unwrap_or_else(|| PathBuf::from(".foreman"))
}

/// Default config location: `FOREMAN_CONFIG`, then `~/.foreman/foreman.toml`.
pub fn default_config_path() -> PathBuf {
    std::env::var(CONFIG_PATH_ENV)
        .ok()
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| foreman_home().join("foreman.toml"))
}
