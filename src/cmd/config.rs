//! Configuration view and validation commands — `foreman config`.

use anyhow::{Context, Result};

use super::super::{Cli, ConfigCommands};
use super::{config_path, load_config};
use foreman::config::ForemanToml;

pub fn cmd_config(cli: &Cli, command: Option<ConfigCommands>) -> Result<()> {
    let path = config_path(cli);

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Foreman Configuration");
            println!("=====================");
            println!();

            let toml = load_config(cli)?;
            if path.exists() {
                println!("Config file: {}", path.display());
            } else {
                println!("No foreman.toml found at {}, using defaults", path.display());
            }
            println!(
                "Sessions dir: {}",
                toml.sessions_dir(cli.sessions_dir.as_deref()).display()
            );
            println!();

            if toml.projects.is_empty() {
                println!("No projects configured. Every project runs the simple workflow.");
                println!();
                return Ok(());
            }

            let mut projects: Vec<_> = toml.projects.iter().collect();
            projects.sort_by(|a, b| a.0.cmp(b.0));
            for (project, section) in projects {
                let workflow = &section.workflow;
                println!("[projects.{}.workflow]", project);
                println!("  mode = \"{}\"", workflow.mode);
                println!("  auto_code_review = {}", workflow.auto_code_review);
                let swarms = [
                    ("planning_swarm", &workflow.planning_swarm),
                    ("implementation_swarm", &workflow.implementation_swarm),
                ];
                for (name, swarm) in swarms {
                    if let Some(swarm) = swarm {
                        let cap = swarm
                            .max_agents
                            .map_or_else(|| "unbounded".to_string(), |n| n.to_string());
                        println!(
                            "  {} = [{}] (max_agents: {})",
                            name,
                            swarm.roles.join(", "),
                            cap
                        );
                    }
                }
                println!();
            }
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            if !path.exists() {
                println!("No foreman.toml found. Using defaults (valid).");
                return Ok(());
            }

            let toml = ForemanToml::load(&path)?;
            let warnings = toml.validate();

            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if path.exists() {
                println!("foreman.toml already exists at {}", path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }

            ForemanToml::default().save(&path)?;

            println!("Created foreman.toml at {}", path.display());
            println!();
            println!("Add a [projects.<id>.workflow] table to enable the full workflow:");
            println!("  mode = \"full\"");
            println!("  auto_code_review = true");
            println!("  [projects.<id>.workflow.implementation_swarm]");
            println!("  roles = [\"backend\", \"frontend\"]");
            println!();
        }
    }

    Ok(())
}
