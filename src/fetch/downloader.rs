//! Retrying download driver

use std::time::Duration;
use tracing::{debug, info, warn};

use super::{FetchOutcome, FetchResult, Fetcher};
use crate::playlist::TrackReference;

const BACKOFF_UNIT: Duration = Duration::from_secs(10);

/// Final result of downloading one track after retries
#[derive(Debug, Clone, PartialEq)]
pub enum DownloadOutcome {
    Downloaded(FetchResult),
    Archived,
    /// Every attempt failed; holds the last error message
    Failed(String),
}

/// Wraps a [`Fetcher`] with the bounded retry policy
///
/// A failed attempt `n` (zero based) sleeps `n * 10` seconds before the next
/// one, so the first retry is immediate.
pub struct Downloader<F> {
    fetcher: F,
    retries: u32,
}

impl<F: Fetcher> Downloader<F> {
    /// `retries` extra attempts are made after the first failure
    pub fn new(fetcher: F, retries: u32) -> Self {
        Self {
            fetcher,
            retries,
        }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Download one track, retrying transient failures
    pub async fn download_one(&self, track: &TrackReference) -> DownloadOutcome {
        let attempts = self.retries + 1;
        let mut last_error = String::new();

        for attempt in 0..attempts {
            match self.fetcher.fetch(track).await {
                Ok(FetchOutcome::Downloaded(result)) => {
                    debug!("Downloaded {} to {}", track.url, result.local_path.display());
                    return DownloadOutcome::Downloaded(result);
                }
                Ok(FetchOutcome::Archived) => {
                    info!("Skipping {}: already present in the archive", track.title);
                    return DownloadOutcome::Archived;
                }
                Err(e) => {
                    info!("(#{}) Failed to download {}... Retrying", attempt + 1, track.title);
                    debug!("Download error: {}", e);
                    last_error = e.to_string();
                    if attempt + 1 < attempts {
                        tokio::time::sleep(BACKOFF_UNIT * attempt).await;
                    }
                }
            }
        }

        warn!(
            "Giving up on {} after {} attempts: {}",
            track.url, attempts, last_error
        );
        DownloadOutcome::Failed(last_error)
    }
}
