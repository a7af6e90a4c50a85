//! ffclipper command-line entry point
//!
//! ```bash
//! ffclipper clip movie.mkv --start 1:30 --duration 20s --target-size 8
//! ffclipper clip movie.mkv -s 10 -e 25 --copy-video --copy-audio
//! ffclipper inspect movie.mkv --json
//! ffclipper budget --target-size 10 --duration 10
//! ```

use anyhow::Result;
use clap::Parser;
use tracing::{debug, info};

use ffclipper::adapters::init_tracing;
use ffclipper::cli::{commands, Cli, Commands};
use ffclipper::config::ClipperConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = ClipperConfig::load(cli.config.as_deref())?;
    cli.apply_to(&mut config);
    init_tracing(&config.log_level, config.log_format)?;
    debug!(?config, "Effective configuration");

    match cli.command {
        Commands::Clip(args) => {
            info!("Executing clip command");
            commands::clip(args, &config).await?;
        }
        Commands::Inspect(args) => commands::inspect(args, &config)?,
        Commands::Keyframes(args) => commands::keyframes(args, &config)?,
        Commands::Budget(args) => commands::budget(args, &config)?,
        Commands::Config => commands::show_config(&config)?,
    }
    Ok(())
}
