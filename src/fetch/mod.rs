//! Playlist extraction and audio download through yt-dlp

mod downloader;
mod models;
mod ytdlp;

pub use downloader::{DownloadOutcome, Downloader};
pub use models::{FetchOutcome, FetchResult, FlatEntry, FlatPlaylist, Thumbnail, TrackInfo};
pub use ytdlp::{YtDlp, clean_ytdlp_artifacts};

use async_trait::async_trait;
use thiserror::Error;

use crate::playlist::TrackReference;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("failed to run yt-dlp: {0}")]
    Process(#[from] std::io::Error),

    #[error("extraction failed for {url}: {message}")]
    Extract { url: String, message: String },

    #[error("download failed for {url}: {message}")]
    Download { url: String, message: String },

    #[error("unexpected yt-dlp output: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Metadata-only access to the source sites
#[async_trait]
pub trait Extractor: Send + Sync {
    /// List a playlist without downloading anything
    async fn extract_flat(&self, url: &str) -> Result<FlatPlaylist, FetchError>;

    /// Full metadata for one track, without downloading it
    async fn extract_track(&self, url: &str) -> Result<TrackInfo, FetchError>;
}

/// Downloads and transcodes one track
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Single attempt; retries are driven by [`Downloader`]
    async fn fetch(&self, track: &TrackReference) -> Result<FetchOutcome, FetchError>;
}
