//! Interactive review of pending ledger entries

pub mod form;
mod interactive;
mod preview;
mod session;

pub use interactive::run_review;

use async_trait::async_trait;
use tracing::debug;

/// Checks that a URL serves an image
#[async_trait]
pub trait ImageCheck: Send + Sync {
    async fn is_image(&self, url: &str) -> bool;
}

/// GET must answer 200 with an `image/*` content type
pub struct HttpImageCheck {
    http: reqwest::Client,
}

impl HttpImageCheck {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ImageCheck for HttpImageCheck {
    async fn is_image(&self, url: &str) -> bool {
        let response = match self.http.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                debug!("Image check for {} failed: {}", url, e);
                return false;
            }
        };
        if response.status() != reqwest::StatusCode::OK {
            debug!("Image check for {} returned {}", url, response.status());
            return false;
        }
        response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("image/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_host_is_not_an_image() {
        let images = HttpImageCheck::new(reqwest::Client::new());
        assert!(!images.is_image("http://127.0.0.1:9/cover.jpg").await);
    }
}
