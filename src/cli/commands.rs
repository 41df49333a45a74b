//! CLI command handlers

use anyhow::{Context, Result};
use clap_complete::generate;
use colored::Colorize;
use dialoguer::Confirm;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};

use super::DownloadArgs;
use crate::config::{self, Config, FileConfig};
use crate::fetch::{Downloader, YtDlp};
use crate::matcher::Matcher;
use crate::musicbrainz::MusicBrainzClient;
use crate::pipeline::{Pipeline, PipelineOptions, PipelineResult};
use crate::report::{ReportStatus, ReportStore};
use crate::review::{self, HttpImageCheck};
use crate::tagging::LoftyTagger;
use crate::utils::TuiSwitch;
use crate::utils::connectivity::{CONNECTIVITY_CHECK_RETRIES, SERVICE_URLS, connectivity_check};

/// Flags shared by every subcommand
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalFlags {
    pub verbose: bool,
    pub quiet: bool,
    pub fail_on_warning: bool,
}

/// Handle the `download` command
pub async fn download(args: DownloadArgs, flags: GlobalFlags) -> Result<()> {
    let file = FileConfig::load()?;
    let config = build_config(&file, &args, flags)?;

    let urls = if args.playlists.is_empty() {
        file.playlists.clone()
    } else {
        args.playlists.clone()
    };
    if urls.is_empty() {
        anyhow::bail!("No playlists given. Pass --playlists or list them in the config file.");
    }

    if args.fresh {
        wipe_output_dir(&config.output_dir)?;
    }
    std::fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("Failed to create {:?}", config.output_dir))?;

    let http = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .build()
        .context("Failed to create HTTP client")?;

    let interval = args.interval.or(file.interval_hours);
    loop {
        let completed = run_once(&config, &urls, &http, args.skip_connectivity_check).await?;

        let Some(hours) = interval.filter(|_| completed) else {
            return Ok(());
        };
        info!("Next run in {} hour(s)", hours);
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(hours * 3600)) => {}
            _ = shutdown_signal() => return Ok(()),
        }
    }
}

/// One pipeline run; `false` when it was interrupted
async fn run_once(
    config: &Config,
    urls: &[String],
    http: &reqwest::Client,
    skip_connectivity_check: bool,
) -> Result<bool> {
    if !skip_connectivity_check {
        println!("{}", "Checking connectivity...".cyan());
        if !connectivity_check(http, SERVICE_URLS, CONNECTIVITY_CHECK_RETRIES).await {
            warn!("Services unreachable, skipping this run");
            return Ok(true);
        }
    }

    let mut report = ReportStore::load(&config.output_dir)
        .with_context(|| format!("Failed to load report from {:?}", config.output_dir))?;

    let extractor = YtDlp::new(config, http.clone());
    let downloader = Downloader::new(YtDlp::new(config, http.clone()), config.retries);
    let matcher = Matcher::new(MusicBrainzClient::new(&config.user_agent)?, config.retries);
    let tagger = LoftyTagger::new(http.clone());

    let pipeline = Pipeline::new(
        &extractor,
        downloader,
        matcher,
        &tagger,
        PipelineOptions::from_config(config),
    );
    let result = pipeline.run(urls, &mut report, shutdown_signal()).await?;

    print_run_summary(&result, &report);

    if config.fail_on_warning && !result.warnings.is_empty() {
        anyhow::bail!("Run produced {} warning(s)", result.warnings.len());
    }
    Ok(!result.interrupted)
}

fn print_run_summary(result: &PipelineResult, report: &ReportStore) {
    println!();
    if result.interrupted {
        println!("{}", "Run interrupted, progress saved.".yellow().bold());
    } else {
        println!("{}", "Run complete!".green().bold());
    }
    println!("  Playlists: {}", result.playlists);
    println!("  Tracks seen: {}", result.tracks_seen);
    println!("  Downloaded: {}", result.downloaded);
    println!("  Already archived: {}", result.archived);
    println!("  Albums found: {}", result.albums);
    println!("  Singles found: {}", result.singles);
    println!("  Not found: {}", result.not_found);
    if result.finalized > 0 {
        println!("  Finalized: {}", result.finalized);
    }
    if result.failed > 0 {
        println!("  {} {}", "Failed:".red(), result.failed);
    }

    if !result.warnings.is_empty() {
        println!();
        println!("{}", "Warnings:".yellow().bold());
        for warning in &result.warnings {
            println!("  - {}", warning);
        }
    }

    if !report.is_empty() {
        println!();
        println!(
            "{} entries pending. Run {} to finish them.",
            report.len(),
            "ctldl review".cyan()
        );
    }
}

/// Handle the `review` command
pub async fn review(output: Option<PathBuf>, switch: &TuiSwitch) -> Result<()> {
    let file = FileConfig::load()?;
    let output_dir = resolve_output_dir(output, &file)?;

    let mut store = ReportStore::load(&output_dir)
        .with_context(|| format!("Failed to load report from {:?}", output_dir))?;
    if store.is_empty() {
        println!("{}", "Nothing to review.".green());
        return Ok(());
    }

    let http = reqwest::Client::builder()
        .user_agent(config::user_agent(file.email.as_deref()))
        .build()
        .context("Failed to create HTTP client")?;
    let tagger = LoftyTagger::new(http.clone());
    let images = HttpImageCheck::new(http.clone());

    let summary = review::run_review(&mut store, &tagger, &images, http, &output_dir, switch).await?;

    println!("{}", "Review finished.".green().bold());
    println!("  Finalized: {}", summary.finalized);
    println!("  Skipped: {}", summary.skipped);
    println!("  Dropped: {}", summary.dropped);
    println!("  Remaining: {}", summary.remaining);

    let warnings = switch.drain();
    if !warnings.is_empty() {
        println!();
        println!("{}", "Warnings during review:".yellow().bold());
        for warning in warnings {
            println!("  - {}", warning);
        }
    }

    Ok(())
}

/// Handle the `status` command
pub fn status(output: Option<PathBuf>) -> Result<()> {
    let file = FileConfig::load()?;
    let output_dir = resolve_output_dir(output, &file)?;
    let store = ReportStore::load(&output_dir)
        .with_context(|| format!("Failed to load report from {:?}", output_dir))?;

    println!("Report: {}", store.path().display());
    if store.is_empty() {
        println!("  {}", "No pending entries.".green());
        return Ok(());
    }

    for (status, count) in store.status_counts() {
        let label = format!("{:<20}", status.as_str());
        let label = match status {
            ReportStatus::DownloadFailure => label.red(),
            ReportStatus::DownloadSuccess | ReportStatus::MetadataNotFound => label.yellow(),
            ReportStatus::Single => label.cyan(),
            ReportStatus::AlbumFound => label.green(),
        };
        println!("  {} {}", label, count);
    }

    let failures: Vec<&str> = store
        .iter()
        .filter(|(_, entry)| entry.status == ReportStatus::DownloadFailure)
        .map(|(url, _)| url)
        .collect();
    if !failures.is_empty() {
        println!();
        println!("{}", "Failed downloads:".red().bold());
        for url in failures {
            println!("  - {}", url);
        }
    }

    Ok(())
}

/// Handle the `completion` command
pub fn completion(shell: clap_complete::Shell) {
    let mut cmd = super::Cli::command();
    generate(shell, &mut cmd, "ctldl", &mut io::stdout());
}

// Extension trait for Cli to get clap Command
impl super::Cli {
    fn command() -> clap::Command {
        <Self as clap::CommandFactory>::command()
    }
}

/// Merge config file defaults with command line values
fn build_config(file: &FileConfig, args: &DownloadArgs, flags: GlobalFlags) -> Result<Config> {
    let output_dir = resolve_output_dir(args.output.clone(), file)?;
    let email = args.email.as_deref().or(file.email.as_deref());

    Ok(Config {
        output_dir,
        ytdlp_path: file
            .ytdlp_path
            .clone()
            .unwrap_or_else(|| config::DEFAULT_YTDLP.to_string()),
        retries: args.retries.or(file.retries).unwrap_or(config::DEFAULT_RETRIES),
        download_sleep: args
            .download_sleep
            .or(file.download_sleep)
            .unwrap_or(config::DEFAULT_DOWNLOAD_SLEEP),
        request_sleep: args
            .request_sleep
            .or(file.request_sleep)
            .unwrap_or(config::DEFAULT_REQUEST_SLEEP),
        user_agent: config::user_agent(email),
        auto_accept: args.auto_accept || file.auto_accept.unwrap_or(false),
        fail_on_warning: flags.fail_on_warning,
        verbose: flags.verbose,
        quiet: flags.quiet,
    })
}

fn resolve_output_dir(output: Option<PathBuf>, file: &FileConfig) -> Result<PathBuf> {
    output
        .or_else(|| file.output_dir.clone())
        .map(|dir| config::expand_home(&dir))
        .ok_or_else(|| {
            anyhow::anyhow!("No output directory. Pass --output or set output_dir in the config file.")
        })
}

fn wipe_output_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        return Ok(());
    }

    let confirmed = Confirm::new()
        .with_prompt(format!(
            "Delete {} and everything in it?",
            dir.display()
        ))
        .default(false)
        .interact()
        .context("Failed to read confirmation")?;
    if !confirmed {
        anyhow::bail!("Aborted, output directory left untouched");
    }

    std::fs::remove_dir_all(dir).with_context(|| format!("Failed to delete {:?}", dir))?;
    info!("Deleted {}", dir.display());
    Ok(())
}

/// Completes on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received terminate signal"),
    }
}
