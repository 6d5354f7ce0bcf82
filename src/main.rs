use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use foreman::artifacts::{ReviewDecision, ReviewRole};
use foreman::phase::Phase;

mod cmd;

#[derive(Parser)]
#[command(name = "foreman")]
#[command(version, about = "Phase workflow engine for AI coding-agent sessions")]
pub struct Cli {
    /// Raise the default log filter to debug
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to foreman.toml (defaults to $FOREMAN_CONFIG, then ~/.foreman/foreman.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding session metadata files
    #[arg(long, global = true)]
    pub sessions_dir: Option<PathBuf>,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// View, validate or create configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Show the persisted phase and rounds of a session
    Status {
        /// Session id
        session_id: String,
    },
    /// Write the plan document for a workspace
    SubmitPlan {
        /// Workspace directory of the parent session
        #[arg(long)]
        workspace: PathBuf,

        /// Planning round this plan answers
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        round: Option<u32>,

        /// Read the plan from this file (stdin if not provided)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Record a reviewer's decision for one review round
    SubmitReview {
        /// Workspace directory of the parent session
        #[arg(long)]
        workspace: PathBuf,

        /// Review phase: plan_review or code_review
        #[arg(long)]
        phase: Phase,

        /// Review round
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        round: u32,

        /// Reviewer role: architect, developer or product
        #[arg(long)]
        role: ReviewRole,

        /// approved or changes_requested
        #[arg(long)]
        decision: ReviewDecision,

        /// Free-text review notes
        #[arg(long)]
        notes: Option<String>,
    },
    /// Show the review tally for one round
    Reviews {
        /// Workspace directory of the parent session
        #[arg(long)]
        workspace: PathBuf,

        /// Review phase: plan_review or code_review
        #[arg(long)]
        phase: Phase,

        /// Review round
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        round: u32,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show the resolved configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Write a default foreman.toml
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    cmd::init_tracing(cli.verbose, cli.log_format)?;

    match &cli.command {
        Commands::Config { command } => cmd::cmd_config(&cli, command.clone())?,
        Commands::Status { session_id } => cmd::cmd_status(&cli, session_id).await?,
        Commands::SubmitPlan {
            workspace,
            round,
            file,
        } => cmd::cmd_submit_plan(workspace, *round, file.as_deref()).await?,
        Commands::SubmitReview {
            workspace,
            phase,
            round,
            role,
            decision,
            notes,
        } => {
            cmd::cmd_submit_review(
                workspace,
                *phase,
                *round,
                *role,
                *decision,
                notes.as_deref(),
            )
            .await?
        }
        Commands::Reviews {
            workspace,
            phase,
            round,
        } => cmd::cmd_reviews(workspace, *phase, *round).await?,
    }

    Ok(())
}
