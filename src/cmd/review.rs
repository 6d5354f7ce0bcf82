//! Review submission and tally — `foreman submit-review`, `foreman reviews`.

use anyhow::Result;
use std::path::Path;

use foreman::artifacts::{ArtifactStore, FileArtifactStore, ReviewArtifact, ReviewDecision, ReviewRole};
use foreman::evaluator::ReviewTally;
use foreman::phase::Phase;

pub async fn cmd_submit_review(
    workspace: &Path,
    phase: Phase,
    round: u32,
    role: ReviewRole,
    decision: ReviewDecision,
    notes: Option<&str>,
) -> Result<()> {
    let mut artifact = ReviewArtifact::new(phase, round, role, decision);
    if let Some(notes) = notes {
        artifact = artifact.with_notes(notes);
    }

    let path = FileArtifactStore::new().write_review(workspace, &artifact).await?;
    println!(
        "Recorded {} from {} for {} round {}",
        decision, role, phase, round
    );
    println!("  {}", path.display());

    Ok(())
}

pub async fn cmd_reviews(workspace: &Path, phase: Phase, round: u32) -> Result<()> {
    if !phase.is_review() {
        anyhow::bail!("{} is not a review phase (use plan_review or code_review)", phase);
    }

    let artifacts = FileArtifactStore::new()
        .read_reviews(workspace, phase, round)
        .await?;
    let tally = ReviewTally::from_artifacts(&ReviewRole::ALL, &artifacts);

    println!("{} round {}: {}", phase, round, tally.status.as_str());
    for role in ReviewRole::ALL {
        let decision = tally
            .decisions
            .get(&role)
            .map_or("missing", |d| d.as_str());
        println!("  {:<10} {}", role.as_str(), decision);
    }

    let noted: Vec<_> = artifacts.iter().filter(|a| !a.notes.is_empty()).collect();
    if !noted.is_empty() {
        println!();
        println!("Notes:");
        for artifact in noted {
            println!("  [{}] {}", artifact.role, artifact.notes);
        }
    }

    Ok(())
}
