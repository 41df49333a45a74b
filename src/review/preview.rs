//! Background cover art lookup for the entry under review

use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::utils::cover_art::{self, ImageSummary};

const PREVIEW_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, PartialEq)]
pub enum PreviewState {
    /// No cover URL for this entry
    Empty,
    Loading,
    Ready(ImageSummary),
    Failed(String),
}

/// Owns at most one in-flight cover fetch
///
/// Showing another URL aborts the previous worker, and each worker reports
/// through its own channel, so a stale result can never replace a newer one.
pub struct CoverPreview {
    http: reqwest::Client,
    retry_delay: Duration,
    worker: Option<JoinHandle<()>>,
    state: watch::Receiver<PreviewState>,
}

impl CoverPreview {
    pub fn new(http: reqwest::Client) -> Self {
        let (_, state) = watch::channel(PreviewState::Empty);
        Self {
            http,
            retry_delay: Duration::from_millis(500),
            worker: None,
            state,
        }
    }

    pub fn show(&mut self, url: Option<&str>) {
        self.cancel();

        let Some(url) = url.filter(|u| !u.is_empty()) else {
            let (_, state) = watch::channel(PreviewState::Empty);
            self.state = state;
            return;
        };

        let (tx, rx) = watch::channel(PreviewState::Loading);
        self.state = rx;

        let http = self.http.clone();
        let url = url.to_string();
        let retry_delay = self.retry_delay;
        self.worker = Some(tokio::spawn(async move {
            let result = fetch_summary(&http, &url, retry_delay).await;
            let _ = tx.send(match result {
                Ok(summary) => PreviewState::Ready(summary),
                Err(message) => PreviewState::Failed(message),
            });
        }));
    }

    pub fn state(&self) -> PreviewState {
        self.state.borrow().clone()
    }

    pub fn cancel(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
    }
}

impl Drop for CoverPreview {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn fetch_summary(
    http: &reqwest::Client,
    url: &str,
    retry_delay: Duration,
) -> Result<ImageSummary, String> {
    let mut last_error = String::new();

    for attempt in 0..PREVIEW_ATTEMPTS {
        if attempt > 0 {
            tokio::time::sleep(retry_delay).await;
        }
        let response = match http.get(url).send().await {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                last_error = format!("HTTP {}", r.status());
                continue;
            }
            Err(e) => {
                last_error = e.to_string();
                continue;
            }
        };
        match response.bytes().await {
            Ok(data) => {
                return tokio::task::spawn_blocking(move || cover_art::describe_image(&data))
                    .await
                    .map_err(|e| e.to_string())?
                    .map_err(|e| format!("{:#}", e));
            }
            Err(e) => last_error = e.to_string(),
        }
        debug!("Cover preview attempt {} failed: {}", attempt + 1, last_error);
    }

    Err(last_error)
}
