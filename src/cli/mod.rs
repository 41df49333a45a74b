//! CLI module for ctldl

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

#[derive(Parser, Debug)]
#[command(
    name = "ctldl",
    about = "Download YouTube and SoundCloud playlists with resolved metadata"
)]
#[command(version, author)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Exit with an error if a run produced warnings
    #[arg(long, global = true)]
    pub fail_on_warning: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download playlists and resolve track metadata
    Download(DownloadArgs),

    /// Review pending report entries interactively
    Review {
        /// Output directory holding the report
        #[arg(short, long, env = "CTLDL_OUTPUT")]
        output: Option<PathBuf>,
    },

    /// Summarize the report of an output directory
    Status {
        /// Output directory holding the report
        #[arg(short, long, env = "CTLDL_OUTPUT")]
        output: Option<PathBuf>,
    },

    /// Generate shell completions
    Completion {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[derive(Args, Debug, Clone)]
pub struct DownloadArgs {
    /// Playlist URLs (YouTube or SoundCloud)
    #[arg(short = 'i', long = "playlists", num_args = 1.., value_name = "URL")]
    pub playlists: Vec<String>,

    /// Output directory for tracks, playlists and the report
    #[arg(short, long, env = "CTLDL_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Extra attempts for failed downloads and catalog lookups
    #[arg(long)]
    pub retries: Option<u32>,

    /// Maximum random sleep before each download, in seconds
    #[arg(long, value_name = "SECS")]
    pub download_sleep: Option<u64>,

    /// Sleep between extractor requests, in seconds
    #[arg(long, value_name = "SECS")]
    pub request_sleep: Option<u64>,

    /// Contact address sent to MusicBrainz
    #[arg(long, env = "CTLDL_EMAIL")]
    pub email: Option<String>,

    /// Re-run forever, sleeping this many hours between runs
    #[arg(long, value_name = "HOURS")]
    pub interval: Option<u64>,

    /// Delete the output directory before downloading
    #[arg(long)]
    pub fresh: bool,

    /// Finalize complete matches without review
    #[arg(long)]
    pub auto_accept: bool,

    /// Skip the service reachability check
    #[arg(long)]
    pub skip_connectivity_check: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_args() {
        let cli = Cli::try_parse_from([
            "ctldl",
            "download",
            "-i",
            "https://youtube.com/playlist?list=a",
            "https://soundcloud.com/u/sets/b",
            "-o",
            "/srv/music",
            "--retries",
            "3",
            "--auto-accept",
            "-q",
        ])
        .unwrap();

        assert!(cli.quiet);
        match cli.command {
            Commands::Download(args) => {
                assert_eq!(args.playlists.len(), 2);
                assert_eq!(args.output, Some(PathBuf::from("/srv/music")));
                assert_eq!(args.retries, Some(3));
                assert!(args.auto_accept);
                assert!(!args.fresh);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["ctldl", "-v", "-q", "status"]).is_err());
    }
}
