//! yt-dlp JSON output models and fetch results

use serde::Deserialize;
use std::path::PathBuf;

/// Output of a flat (no download) playlist extraction
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlatPlaylist {
    /// yt-dlp extractor that handled the URL, e.g. `YoutubeTab`
    #[serde(default)]
    pub extractor_key: String,
    #[serde(default)]
    pub title: Option<String>,
    /// SoundCloud sets carry their display name here
    #[serde(default)]
    pub album: Option<String>,
    /// Redirect target reported by the generic extractor
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub webpage_url: Option<String>,
    #[serde(default)]
    pub entries: Option<Vec<FlatEntry>>,
}

impl FlatPlaylist {
    /// Display name of the playlist, preferring the set name for SoundCloud
    pub fn name(&self) -> Option<&str> {
        self.album.as_deref().or(self.title.as_deref())
    }
}

/// One member of a flat playlist
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlatEntry {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub ie_key: Option<String>,
    #[serde(default)]
    pub thumbnails: Vec<Thumbnail>,
}

impl FlatEntry {
    /// Largest listed thumbnail; yt-dlp sorts them ascending
    pub fn best_thumbnail(&self) -> Option<&str> {
        self.thumbnails.last().map(|t| t.url.as_str())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Thumbnail {
    pub url: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

/// Full single-track extraction (simulate mode)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrackInfo {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub genres: Option<Vec<String>>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
}

impl TrackInfo {
    /// Artist credit if present, otherwise the uploading account
    pub fn artist_or_uploader(&self) -> Option<&str> {
        self.artist.as_deref().or(self.uploader.as_deref())
    }

    pub fn all_genres(&self) -> Vec<String> {
        match (&self.genres, &self.genre) {
            (Some(genres), _) if !genres.is_empty() => genres.clone(),
            (_, Some(genre)) if !genre.is_empty() => vec![genre.clone()],
            _ => Vec::new(),
        }
    }
}

/// A downloaded file ready to be recorded in the ledger
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResult {
    pub local_path: PathBuf,
    pub extension: String,
    pub duration_seconds: u64,
    pub thumbnail_url: Option<String>,
    pub thumbnail_width: Option<u32>,
    pub thumbnail_height: Option<u32>,
    pub genres: Option<Vec<String>>,
}

/// What a single fetch attempt produced
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Downloaded(FetchResult),
    /// Already listed in the download archive; nothing was written
    Archived,
}
