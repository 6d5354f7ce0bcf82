//! CLI command implementations.
//!
//! | Module    | Commands handled              |
//! |-----------|-------------------------------|
//! | `config`  | `Config`                      |
//! | `status`  | `Status`                      |
//! | `plan`    | `SubmitPlan`                  |
//! | `review`  | `SubmitReview`, `Reviews`     |

pub mod config;
pub mod plan;
pub mod review;
pub mod status;

pub use config::cmd_config;
pub use plan::cmd_submit_plan;
pub use review::{cmd_reviews, cmd_submit_review};
pub use status::cmd_status;

use anyhow::Result;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt};

use super::{Cli, LogFormat};
use foreman::config::{ForemanToml, default_config_path};

/// Install the stderr subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing(verbose: bool, format: LogFormat) -> Result<()> {
    let default = if verbose { "foreman=debug" } else { "foreman=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let builder = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    match format {
        LogFormat::Text => builder
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to install log subscriber: {}", e)),
        LogFormat::Json => builder
            .json()
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to install log subscriber: {}", e)),
    }
}

/// `--config`, else `$FOREMAN_CONFIG`, else `~/.foreman/foreman.toml`.
pub fn config_path(cli: &Cli) -> PathBuf {
    cli.config.clone().unwrap_or_else(default_config_path)
}

pub fn load_config(cli: &Cli) -> Result<ForemanToml> {
    Ok(ForemanToml::load_or_default(&config_path(cli))?)
}
