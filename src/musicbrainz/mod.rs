//! External music catalog

mod client;
mod models;

pub use client::MusicBrainzClient;
pub use models::{
    Artist, ArtistCredit, Medium, MediumTrack, Recording, RecordingSearch, Release, ReleaseGroup,
};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl CatalogError {
    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            CatalogError::Network(_) | CatalogError::RateLimited => true,
            CatalogError::Api(status, _) => *status >= 500,
            CatalogError::NotFound(_) | CatalogError::Parse(_) => false,
        }
    }
}

/// Recording search plus cover art lookup
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Candidate recordings for an artist and title, best first
    ///
    /// An empty list and [`CatalogError::NotFound`] both mean there is no
    /// match; other errors describe a failed request.
    async fn search_recordings(&self, artist: &str, title: &str)
    -> Result<Vec<Recording>, CatalogError>;

    /// URL of the release's front cover at `size` pixels, if one exists
    async fn front_cover(&self, release_id: &str, size: u32) -> Result<Option<String>, CatalogError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(CatalogError::Network("reset".to_string()).is_transient());
        assert!(CatalogError::RateLimited.is_transient());
        assert!(CatalogError::Api(502, String::new()).is_transient());
        assert!(!CatalogError::Api(400, String::new()).is_transient());
        assert!(!CatalogError::NotFound("x".to_string()).is_transient());
    }
}
