//! Session metadata view — `foreman status`.

use anyhow::Result;

use super::super::Cli;
use super::load_config;
use foreman::metadata::{FileMetadataStore, MetadataStore};

pub async fn cmd_status(cli: &Cli, session_id: &str) -> Result<()> {
    let toml = load_config(cli)?;
    let store = FileMetadataStore::new(toml.sessions_dir(cli.sessions_dir.as_deref()));

    let Some(metadata) = store.read(session_id).await? else {
        anyhow::bail!(
            "No metadata for session '{}' in {}",
            session_id,
            store.sessions_dir().display()
        );
    };

    let phase = metadata
        .phase
        .map_or_else(|| "(unset)".to_string(), |p| p.to_string());
    let rounds = metadata.rounds;

    println!("Session: {}", session_id);
    println!("  phase:                {}", phase);
    println!("  planRound:            {}", rounds.plan());
    println!("  reviewRound:          {}", rounds.review());
    println!("  implementationRound:  {}", rounds.implementation());
    println!("  codeReviewRound:      {}", rounds.code_review());
    if let Some(round) = metadata.implementation_swarm_round {
        println!("  work distributed for implementation round {}", round);
    }
    for (label, value) in [
        ("project", &metadata.project),
        ("branch", &metadata.branch),
        ("issue", &metadata.issue),
    ] {
        if let Some(value) = value {
            println!("  {:<21} {}", format!("{}:", label), value);
        }
    }

    Ok(())
}
