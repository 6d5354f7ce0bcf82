//! Plan submission — `foreman submit-plan`.

use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;

use foreman::artifacts::{ArtifactStore, FileArtifactStore, PlanArtifact};

pub async fn cmd_submit_plan(workspace: &Path, round: Option<u32>, file: Option<&Path>) -> Result<()> {
    let text = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read plan from {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read plan from stdin")?;
            buf
        }
    };

    if text.trim().is_empty() {
        anyhow::bail!("Plan is empty");
    }

    let plan = match round {
        Some(round) => PlanArtifact::for_round(text, round),
        None => PlanArtifact::new(text),
    };
    let items = plan.work_items().len();
    let path = FileArtifactStore::new().write_plan(workspace, &plan).await?;

    println!("Wrote plan to {}", path.display());
    println!("  work items: {}", items);
    if let Some(round) = round {
        println!("  planning round: {}", round);
    }

    Ok(())
}
