//! Pre-run reachability check of every remote service

use std::time::Duration;
use tracing::{debug, info};

pub const CONNECTIVITY_CHECK_RETRIES: u32 = 5;

/// Services a run depends on
pub const SERVICE_URLS: &[&str] = &[
    "https://soundcloud.com/",
    "https://www.youtube.com/",
    "https://musicbrainz.org/ws/2/",
];

/// Check every service until all answer 200 at once
///
/// Failed rounds sleep `(attempt + 2)²` seconds. Returns `false` once
/// `retries` rounds have failed.
pub async fn connectivity_check(client: &reqwest::Client, urls: &[&str], retries: u32) -> bool {
    for attempt in 0..retries {
        if all_reachable(client, urls).await {
            return true;
        }

        let delay = u64::from((attempt + 2).pow(2));
        info!("Failed to connect. Retrying in: {} seconds....", delay);
        tokio::time::sleep(Duration::from_secs(delay)).await;
    }
    false
}

async fn all_reachable(client: &reqwest::Client, urls: &[&str]) -> bool {
    for url in urls {
        match client.get(*url).timeout(Duration::from_secs(15)).send().await {
            Ok(resp) if resp.status() == reqwest::StatusCode::OK => {}
            Ok(resp) => {
                debug!("{} answered {}", url, resp.status());
                return false;
            }
            Err(e) => {
                debug!("{} unreachable: {}", url, e);
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_gives_up() {
        let client = reqwest::Client::new();
        // port 9 on localhost refuses connections
        let ok = connectivity_check(&client, &["http://127.0.0.1:9/"], 2).await;
        assert!(!ok);
    }

    #[tokio::test]
    async fn test_no_services_is_reachable() {
        let client = reqwest::Client::new();
        assert!(connectivity_check(&client, &[], 1).await);
    }
}
