use anyhow::Result;
use clap::Parser;
use tracing::{debug, error, info};

use costline::propagation::metrics;

use super::context::CliContext;
use super::dispatch::dispatch;
use super::env::CliArgs;
use super::runtime::{init_logging, load_config, LoadedConfig};

pub async fn run() -> Result<()> {
    let cli = CliArgs::parse();

    init_logging(&cli.log_level, cli.debug)?;

    info!("Starting Costline v{}", env!("CARGO_PKG_VERSION"));

    let LoadedConfig { config, path } = load_config(cli.config.as_ref()).await?;
    let cli_context = CliContext::new(config, path, cli.store.clone(), cli.output);

    let result = dispatch(&cli, &cli_context).await;
    debug!(counters = ?metrics::snapshot(), "propagation counters");

    match result {
        Ok(()) => {
            info!("Command completed successfully");
            Ok(())
        }
        Err(err) => {
            error!("Command failed: {}", err);
            Err(err)
        }
    }
}
