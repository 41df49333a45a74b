//! Source playlists and the track references they expand into

mod resolver;
mod writer;

pub use resolver::{PlaylistResolver, UrlKind, classify_url};
pub use writer::PlaylistWriter;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Site a track is downloaded from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provider {
    Youtube,
    Soundcloud,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Youtube => f.write_str("Youtube"),
            Provider::Soundcloud => f.write_str("Soundcloud"),
        }
    }
}

/// A source playlist as `(url, name)`
///
/// Serialized as a two element array, which is how ledger entries record
/// playlist membership.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlaylistSpec(pub String, pub String);

impl PlaylistSpec {
    pub fn new(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self(url.into(), name.into())
    }

    pub fn url(&self) -> &str {
        &self.0
    }

    pub fn name(&self) -> &str {
        &self.1
    }
}

/// One song to fetch, as listed in a source playlist
#[derive(Debug, Clone, PartialEq)]
pub struct TrackReference {
    pub url: String,
    pub provider: Provider,
    pub title: String,
    /// Channel or account name; the best available guess at the artist
    pub uploader: String,
    pub thumbnail_url: Option<String>,
    /// Normalized genres (SoundCloud only)
    pub genres: Option<Vec<String>>,
}

/// A source playlist with its tracks in listed order
#[derive(Debug, Clone)]
pub struct ResolvedPlaylist {
    pub spec: PlaylistSpec,
    pub tracks: Vec<TrackReference>,
}

/// All playlists resolved for one run, in input order
#[derive(Debug, Clone, Default)]
pub struct PlaylistIndex {
    playlists: Vec<ResolvedPlaylist>,
}

impl PlaylistIndex {
    pub fn new(playlists: Vec<ResolvedPlaylist>) -> Self {
        Self { playlists }
    }

    pub fn playlists(&self) -> &[ResolvedPlaylist] {
        &self.playlists
    }

    /// Track references in processing order: playlists in input order,
    /// tracks within each in listed order
    pub fn tracks(&self) -> impl Iterator<Item = &TrackReference> {
        self.playlists.iter().flat_map(|p| p.tracks.iter())
    }

    pub fn track_count(&self) -> usize {
        self.playlists.iter().map(|p| p.tracks.len()).sum()
    }

    /// Every playlist that lists `url`
    pub fn membership(&self, url: &str) -> Vec<PlaylistSpec> {
        self.playlists
            .iter()
            .filter(|p| p.tracks.iter().any(|t| t.url == url))
            .map(|p| p.spec.clone())
            .collect()
    }
}
