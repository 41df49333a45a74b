//! MusicBrainz and Cover Art Archive HTTP client

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

use super::models::{Recording, RecordingSearch};
use super::{Catalog, CatalogError};

const MUSICBRAINZ_BASE_URL: &str = "https://musicbrainz.org/ws/2";
const COVER_ART_BASE_URL: &str = "https://coverartarchive.org";
/// MusicBrainz allows one request per second per client
const RATE_LIMIT_MS: u64 = 1000;
const SEARCH_LIMIT: u32 = 10;

/// Spaces out requests to respect the service rate limit
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval: Duration) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval,
        }
    }

    async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                debug!("Rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

/// Catalog backed by the public MusicBrainz web service
#[derive(Clone)]
pub struct MusicBrainzClient {
    http_client: Client,
    base_url: String,
    cover_base_url: String,
    rate_limiter: Arc<RateLimiter>,
}

impl MusicBrainzClient {
    pub fn new(user_agent: &str) -> Result<Self, CatalogError> {
        let http_client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| CatalogError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: MUSICBRAINZ_BASE_URL.to_string(),
            cover_base_url: COVER_ART_BASE_URL.to_string(),
            rate_limiter: Arc::new(RateLimiter::new(Duration::from_millis(RATE_LIMIT_MS))),
        })
    }

    fn search_url(&self, artist: &str, title: &str) -> String {
        let query = format!(
            "artist:\"{}\" AND recording:\"{}\"",
            escape_query(artist),
            escape_query(title)
        );
        format!(
            "{}/recording?query={}&limit={}&fmt=json",
            self.base_url,
            urlencoding::encode(&query),
            SEARCH_LIMIT
        )
    }

    fn cover_url(&self, release_id: &str, size: u32) -> String {
        format!("{}/release/{}/front-{}", self.cover_base_url, release_id, size)
    }
}

#[async_trait]
impl Catalog for MusicBrainzClient {
    async fn search_recordings(
        &self,
        artist: &str,
        title: &str,
    ) -> Result<Vec<Recording>, CatalogError> {
        self.rate_limiter.wait().await;

        let url = self.search_url(artist, title);
        debug!(artist = %artist, title = %title, "Querying MusicBrainz");

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| CatalogError::Network(e.to_string()))?;

        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound(format!("{} - {}", artist, title)));
        }

        if status == StatusCode::SERVICE_UNAVAILABLE || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(CatalogError::RateLimited);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(CatalogError::Api(status.as_u16(), error_text));
        }

        let search: RecordingSearch = response
            .json()
            .await
            .map_err(|e| CatalogError::Parse(e.to_string()))?;

        debug!(
            "MusicBrainz returned {} of {} recordings",
            search.recordings.len(),
            search.count
        );
        Ok(search.recordings)
    }

    async fn front_cover(&self, release_id: &str, size: u32) -> Result<Option<String>, CatalogError> {
        let url = self.cover_url(release_id, size);

        let response = self
            .http_client
            .head(&url)
            .send()
            .await
            .map_err(|e| CatalogError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            debug!("Cover art available at {}", url);
            Ok(Some(url))
        } else if status == StatusCode::NOT_FOUND {
            Ok(None)
        } else {
            Err(CatalogError::Api(status.as_u16(), format!("cover art lookup {}", url)))
        }
    }
}

/// Escape Lucene phrase metacharacters
fn escape_query(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
