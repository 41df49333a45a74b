//! ctldl - Download YouTube and SoundCloud playlists with resolved metadata

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod config;
mod fetch;
mod finalize;
mod matcher;
mod musicbrainz;
mod pipeline;
mod playlist;
mod report;
mod review;
mod tagging;
mod utils;

#[cfg(test)]
mod testing;

use cli::commands::GlobalFlags;
use cli::{Cli, Commands};
use utils::{ConditionalStderrLayer, TuiSwitch};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "ctldl=debug,reqwest=debug"
    } else if cli.quiet {
        "ctldl=warn"
    } else {
        "ctldl=info"
    };

    // Silenced while the review screen owns the terminal
    let switch = TuiSwitch::new();
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(ConditionalStderrLayer::new(fmt_layer, switch.clone()))
        .init();

    let flags = GlobalFlags {
        verbose: cli.verbose,
        quiet: cli.quiet,
        fail_on_warning: cli.fail_on_warning,
    };

    match cli.command {
        Commands::Download(args) => {
            cli::commands::download(args, flags).await?;
        }
        Commands::Review { output } => {
            cli::commands::review(output, &switch).await?;
        }
        Commands::Status { output } => {
            cli::commands::status(output)?;
        }
        Commands::Completion { shell } => {
            cli::commands::completion(shell);
        }
    }

    Ok(())
}
