//! Final tag writing and file renaming

mod tagger;

pub use tagger::LoftyTagger;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::report::{PostSearch, PreSearch};

#[derive(Error, Debug)]
pub enum TagError {
    #[error("cover art unavailable: {0}")]
    CoverArt(String),

    #[error("failed to write tags: {0}")]
    Tag(String),

    #[error("file operation failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Metadata written into a finalized track
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrackMetadata {
    pub title: String,
    pub artist: String,
    pub artists: Vec<String>,
    pub album: String,
    pub release_date: Option<String>,
    pub track_num: u32,
    pub total_tracks: u32,
    pub genres: Vec<String>,
    pub thumbnail_url: Option<String>,
}

impl TrackMetadata {
    /// Commit resolved catalog metadata; genres come from the download
    pub fn from_post(post: &PostSearch, pre: &PreSearch) -> Self {
        let title = post.title.clone().unwrap_or_default();
        Self {
            artist: post.artist.clone().unwrap_or_default(),
            artists: post.artists.clone(),
            album: post.album.clone().unwrap_or_else(|| title.clone()),
            release_date: post.release_date.clone(),
            track_num: post.track_num.unwrap_or(1),
            total_tracks: post.total_tracks.unwrap_or(1),
            genres: pre.genres.clone().unwrap_or_default(),
            thumbnail_url: post.thumbnail_url.clone(),
            title,
        }
    }

    /// Commit the downloaded metadata as an unresolved single
    pub fn from_pre(pre: &PreSearch) -> Self {
        let title = pre.title.clone().unwrap_or_default();
        let artist = pre.uploader.clone().unwrap_or_default();
        Self {
            artists: if artist.is_empty() {
                Vec::new()
            } else {
                vec![artist.clone()]
            },
            album: title.clone(),
            release_date: None,
            track_num: 1,
            total_tracks: 1,
            genres: pre.genres.clone().unwrap_or_default(),
            thumbnail_url: pre.thumbnail_url.clone(),
            title,
            artist,
        }
    }
}

/// Writes tags into a file and moves it to its final name
#[async_trait]
pub trait TagApplier: Send + Sync {
    /// Returns the new path of the file
    async fn apply(&self, path: &Path, metadata: &TrackMetadata) -> Result<PathBuf, TagError>;
}
