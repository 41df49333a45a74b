//! In-memory stand-ins for the external tools and services

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::fetch::{Extractor, FetchError, FetchOutcome, FetchResult, Fetcher, FlatPlaylist, TrackInfo};
use crate::musicbrainz::{
    Artist, ArtistCredit, Catalog, CatalogError, Medium, MediumTrack, Recording, Release,
    ReleaseGroup,
};
use crate::playlist::{Provider, TrackReference};
use crate::review::ImageCheck;
use crate::tagging::{TagApplier, TagError, TrackMetadata};
use crate::utils::track_file_name;

pub fn sample_track(url: &str) -> TrackReference {
    TrackReference {
        url: url.to_string(),
        provider: Provider::Youtube,
        title: "Sample Track".to_string(),
        uploader: "Sample Artist".to_string(),
        thumbnail_url: None,
        genres: None,
    }
}

#[derive(Default)]
pub struct FakeExtractor {
    playlists: Mutex<HashMap<String, FlatPlaylist>>,
    tracks: Mutex<HashMap<String, TrackInfo>>,
}

impl FakeExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_flat(&self, url: &str, playlist: FlatPlaylist) {
        self.playlists.lock().unwrap().insert(url.to_string(), playlist);
    }

    pub fn add_track(&self, url: &str, info: TrackInfo) {
        self.tracks.lock().unwrap().insert(url.to_string(), info);
    }
}

#[async_trait]
impl Extractor for FakeExtractor {
    async fn extract_flat(&self, url: &str) -> Result<FlatPlaylist, FetchError> {
        self.playlists
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Extract {
                url: url.to_string(),
                message: "ERROR: Unsupported URL".to_string(),
            })
    }

    async fn extract_track(&self, url: &str) -> Result<TrackInfo, FetchError> {
        self.tracks
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Extract {
                url: url.to_string(),
                message: "ERROR: Video unavailable".to_string(),
            })
    }
}

/// Fetcher that succeeds unless told otherwise; nothing is written to disk
///
/// A URL that downloaded once reports `Archived` afterwards.
pub struct FakeFetcher {
    output_dir: PathBuf,
    failures: Mutex<HashMap<String, u32>>,
    archived: Mutex<HashSet<String>>,
    hanging: Mutex<HashSet<String>>,
    calls: Mutex<HashMap<String, u32>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::in_dir(&std::env::temp_dir())
    }

    pub fn in_dir(output_dir: &Path) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
            failures: Mutex::new(HashMap::new()),
            archived: Mutex::new(HashSet::new()),
            hanging: Mutex::new(HashSet::new()),
            calls: Mutex::new(HashMap::new()),
        }
    }

    /// The next `times` attempts for `url` fail
    pub fn fail_times(&self, url: &str, times: u32) {
        self.failures.lock().unwrap().insert(url.to_string(), times);
    }

    pub fn archive(&self, url: &str) {
        self.archived.lock().unwrap().insert(url.to_string());
    }

    /// Attempts for `url` never complete
    pub fn hang(&self, url: &str) {
        self.hanging.lock().unwrap().insert(url.to_string());
    }

    pub fn calls(&self, url: &str) -> u32 {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> u32 {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, track: &TrackReference) -> Result<FetchOutcome, FetchError> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(track.url.clone())
            .or_insert(0) += 1;

        if self.hanging.lock().unwrap().contains(&track.url) {
            std::future::pending::<()>().await;
        }
        if self.archived.lock().unwrap().contains(&track.url) {
            return Ok(FetchOutcome::Archived);
        }
        {
            let mut failures = self.failures.lock().unwrap();
            if let Some(remaining) = failures.get_mut(&track.url)
                && *remaining > 0
            {
                *remaining -= 1;
                return Err(FetchError::Download {
                    url: track.url.clone(),
                    message: "HTTP Error 403: Forbidden".to_string(),
                });
            }
        }

        // like yt-dlp's download archive, a finished download is never repeated
        self.archived.lock().unwrap().insert(track.url.clone());
        Ok(FetchOutcome::Downloaded(FetchResult {
            local_path: self.output_dir.join(format!("{}.opus", track.title)),
            extension: "opus".to_string(),
            duration_seconds: 200,
            thumbnail_url: track.thumbnail_url.clone(),
            thumbnail_width: None,
            thumbnail_height: None,
            genres: track.genres.clone(),
        }))
    }
}

#[derive(Default)]
pub struct FakeCatalog {
    searches: Mutex<HashMap<(String, String), Vec<Recording>>>,
    covers: Mutex<HashSet<(String, u32)>>,
    failing_searches: AtomicU32,
    search_calls: AtomicU32,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_search(&self, artist: &str, title: &str, recordings: Vec<Recording>) {
        self.searches
            .lock()
            .unwrap()
            .insert((artist.to_string(), title.to_string()), recordings);
    }

    pub fn add_cover(&self, release_id: &str, size: u32) {
        self.covers.lock().unwrap().insert((release_id.to_string(), size));
    }

    /// The next `n` searches fail with a network error
    pub fn fail_searches(&self, n: u32) {
        self.failing_searches.store(n, Ordering::SeqCst);
    }

    pub fn search_calls(&self) -> u32 {
        self.search_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Catalog for FakeCatalog {
    async fn search_recordings(&self, artist: &str, title: &str) -> Result<Vec<Recording>, CatalogError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);

        let failing = self.failing_searches.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_searches.store(failing - 1, Ordering::SeqCst);
            return Err(CatalogError::Network("connection reset".to_string()));
        }

        Ok(self
            .searches
            .lock()
            .unwrap()
            .get(&(artist.to_string(), title.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn front_cover(&self, release_id: &str, size: u32) -> Result<Option<String>, CatalogError> {
        let found = self
            .covers
            .lock()
            .unwrap()
            .contains(&(release_id.to_string(), size));
        Ok(found.then(|| format!("https://coverartarchive.org/release/{}/front-{}", release_id, size)))
    }
}

fn credit(artist: &str) -> Vec<ArtistCredit> {
    vec![ArtistCredit {
        name: artist.to_string(),
        joinphrase: None,
        artist: Some(Artist {
            id: format!("artist-{}", artist),
            name: artist.to_string(),
        }),
    }]
}

/// Recording listed on one album release with a digital medium
pub fn album_recording(
    title: &str,
    artist: &str,
    album: &str,
    track_num: u32,
    total_tracks: u32,
    status: &str,
) -> Recording {
    Recording {
        id: format!("rec-{}", title),
        score: Some(100),
        title: title.to_string(),
        artist_credit: credit(artist),
        first_release_date: Some("2020-03-20".to_string()),
        releases: vec![Release {
            id: format!("rel-{}", album),
            title: album.to_string(),
            status: Some(status.to_string()),
            date: Some("2020-03-20".to_string()),
            release_group: Some(ReleaseGroup {
                id: Some(format!("rg-{}", album)),
                title: Some(album.to_string()),
                primary_type: Some("Album".to_string()),
            }),
            track_count: Some(total_tracks),
            media: vec![Medium {
                format: Some("Digital Media".to_string()),
                position: Some(1),
                track_count: Some(total_tracks),
                track_offset: Some(track_num.saturating_sub(1)),
                track: vec![MediumTrack {
                    id: Some(format!("track-{}", title)),
                    number: Some(track_num.to_string()),
                    title: Some(title.to_string()),
                }],
            }],
        }],
    }
}

/// Recording on one official release that is not an album
pub fn single_recording(title: &str, artist: &str, primary_type: &str) -> Recording {
    Recording {
        id: format!("rec-{}", title),
        score: Some(100),
        title: title.to_string(),
        artist_credit: credit(artist),
        first_release_date: Some("2021-06-01".to_string()),
        releases: vec![Release {
            id: format!("rel-{}", title),
            title: title.to_string(),
            status: Some("Official".to_string()),
            date: Some("2021-06-01".to_string()),
            release_group: Some(ReleaseGroup {
                id: None,
                title: Some(title.to_string()),
                primary_type: Some(primary_type.to_string()),
            }),
            track_count: Some(1),
            media: Vec::new(),
        }],
    }
}

/// Tagger that only computes the final file name
pub struct FakeTagger {
    fail: bool,
    applied: Mutex<Vec<(PathBuf, TrackMetadata)>>,
}

impl FakeTagger {
    pub fn new() -> Self {
        Self {
            fail: false,
            applied: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            applied: Mutex::new(Vec::new()),
        }
    }

    pub fn applied(&self) -> Vec<(PathBuf, TrackMetadata)> {
        self.applied.lock().unwrap().clone()
    }
}

#[async_trait]
impl TagApplier for FakeTagger {
    async fn apply(&self, path: &Path, metadata: &TrackMetadata) -> Result<PathBuf, TagError> {
        if self.fail {
            return Err(TagError::Tag("Unable to write tags".to_string()));
        }
        self.applied
            .lock()
            .unwrap()
            .push((path.to_path_buf(), metadata.clone()));

        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(path.with_file_name(track_file_name(
            &metadata.artist,
            &metadata.album,
            metadata.track_num,
            &metadata.title,
            &ext,
        )))
    }
}

/// Accepts only the URLs it was built with
pub struct FakeImageCheck {
    images: HashSet<String>,
}

impl FakeImageCheck {
    pub fn accepting(urls: &[&str]) -> Self {
        Self {
            images: urls.iter().map(|u| u.to_string()).collect(),
        }
    }
}

#[async_trait]
impl ImageCheck for FakeImageCheck {
    async fn is_image(&self, url: &str) -> bool {
        self.images.contains(url)
    }
}
