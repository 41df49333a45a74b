//! Metadata resolution against the catalog
//!
//! Turns a scraped `(title, uploader, provider)` triple into a probable
//! `(artist, title)`, searches the catalog, and picks a release by status
//! tier. Every candidate is tried within a tier before the tier is relaxed;
//! the first candidate that classifies cleanly wins.

mod title;

pub use title::{clean_uploader, parse_youtube_title};

use std::time::Duration;
use tracing::{debug, info, warn};

use crate::musicbrainz::{Catalog, CatalogError, Recording, Release};
use crate::playlist::Provider;
use crate::report::{PostSearch, ReportStatus};

/// Release status preference, best first; `None` is a release without status
pub const RELEASE_STATUS_TIERS: &[Option<&str>] = &[
    Some("Official"),
    None,
    Some("Bootleg"),
    Some("Pseudo-Release"),
    Some("Promotion"),
];

/// Medium formats whose track listing is trusted for position and count
pub const ACCEPTED_MEDIUM_FORMATS: &[&str] = &[
    "Digital Media",
    "CD",
    "Enhanced CD",
    "Vinyl",
    "12\" Vinyl",
    "7\" Vinyl",
    "10\" Vinyl",
    "Cassette",
    "SACD",
    "Hybrid SACD",
    "Blu-spec CD",
    "SHM-CD",
];

/// Cover sizes to request, largest first
pub const COVER_SIZES: &[u32] = &[1200, 500, 250];

/// Catalog retry `n` waits `n² * BACKOFF_UNIT`
const BACKOFF_UNIT: Duration = Duration::from_secs(1);

/// Resolved metadata for one track
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub title: String,
    pub artist: String,
    pub artists: Vec<String>,
    pub album: String,
    pub is_single: bool,
    pub release_date: Option<String>,
    pub track_num: u32,
    pub total_tracks: u32,
    pub release_mbid: String,
    pub thumbnail_url: Option<String>,
    /// Edge length of the square cover at `thumbnail_url`
    pub thumbnail_resolution: Option<u32>,
}

impl MatchResult {
    pub fn status(&self) -> ReportStatus {
        if self.is_single {
            ReportStatus::Single
        } else {
            ReportStatus::AlbumFound
        }
    }

    /// Snapshot for the ledger's `post` slot
    pub fn to_post(&self) -> PostSearch {
        PostSearch {
            title: Some(self.title.clone()),
            artist: Some(self.artist.clone()),
            artists: self.artists.clone(),
            album: Some(self.album.clone()),
            is_single: self.is_single,
            release_date: self.release_date.clone(),
            track_num: Some(self.track_num),
            total_tracks: Some(self.total_tracks),
            mbid: Some(self.release_mbid.clone()),
            thumbnail_url: self.thumbnail_url.clone(),
            thumbnail_width: self.thumbnail_resolution,
            thumbnail_height: self.thumbnail_resolution,
        }
    }
}

/// Normalize a scraped title and uploader into a catalog query
///
/// When a YouTube title cannot be split, the raw title is paired with the
/// cleaned channel name.
pub fn normalize_query(title: &str, uploader: &str, provider: Provider) -> (String, String) {
    if provider != Provider::Youtube {
        return (uploader.to_string(), title.to_string());
    }
    match parse_youtube_title(title, uploader) {
        (Some(artist), Some(parsed_title)) => (artist, parsed_title),
        _ => (clean_uploader(uploader), title.to_string()),
    }
}

pub struct Matcher<C> {
    catalog: C,
    retries: u32,
}

impl<C: Catalog> Matcher<C> {
    /// `retries` extra attempts are made for transient catalog errors
    pub fn new(catalog: C, retries: u32) -> Self {
        Self {
            catalog,
            retries,
        }
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Resolve metadata for one track; `None` means not found
    pub async fn resolve(&self, title: &str, uploader: &str, provider: Provider) -> Option<MatchResult> {
        let (artist, title) = normalize_query(title, uploader, provider);
        debug!("Searching catalog for '{}' by '{}'", title, artist);

        let recordings = self.search_with_retries(&artist, &title).await?;
        if recordings.is_empty() {
            info!("{} - {} has no MusicBrainz entry. Consider contributing!", title, artist);
            return None;
        }

        let Some((recording, release, mut result)) = select_release(&recordings) else {
            info!("No usable release found for {} - {}", title, artist);
            return None;
        };
        debug!(
            "Matched recording {} on release {} ({})",
            recording.id,
            release.id,
            release.status.as_deref().unwrap_or("no status")
        );

        self.attach_cover(&mut result).await;
        Some(result)
    }

    async fn search_with_retries(&self, artist: &str, title: &str) -> Option<Vec<Recording>> {
        let mut attempt: u32 = 0;
        loop {
            match self.catalog.search_recordings(artist, title).await {
                Ok(recordings) => return Some(recordings),
                Err(CatalogError::NotFound(_)) => return Some(Vec::new()),
                Err(e) if e.is_transient() && attempt < self.retries => {
                    attempt += 1;
                    let delay = BACKOFF_UNIT * attempt.pow(2);
                    debug!("Catalog request failed ({}), retrying in {:?}", e, delay);
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    warn!("Catalog search for {} - {} failed: {}", title, artist, e);
                    return None;
                }
            }
        }
    }

    /// Cover lookup failures leave the thumbnail fields empty
    async fn attach_cover(&self, result: &mut MatchResult) {
        for size in COVER_SIZES {
            match self.catalog.front_cover(&result.release_mbid, *size).await {
                Ok(Some(url)) => {
                    result.thumbnail_url = Some(url);
                    result.thumbnail_resolution = Some(*size);
                    return;
                }
                Ok(None) => continue,
                Err(e) => {
                    warn!("Cover art lookup for release {} failed: {}", result.release_mbid, e);
                    return;
                }
            }
        }
    }
}

/// Walk status tiers, then candidates, then their releases
fn select_release(recordings: &[Recording]) -> Option<(&Recording, &Release, MatchResult)> {
    for tier in RELEASE_STATUS_TIERS {
        for recording in recordings {
            let in_tier = recording
                .releases
                .iter()
                .filter(|r| r.status.as_deref() == *tier);
            for release in in_tier {
                match classify(recording, release) {
                    Some(result) => return Some((recording, release, result)),
                    // album without a trusted track listing: next candidate
                    None => break,
                }
            }
        }
    }
    None
}

fn classify(recording: &Recording, release: &Release) -> Option<MatchResult> {
    let artists = recording.artist_names();
    let artist = artists.first()?.clone();
    let release_date = release
        .date
        .clone()
        .or_else(|| recording.first_release_date.clone())
        .filter(|d| !d.is_empty());

    if release.primary_type() == Some("Album") {
        let medium = release.media.iter().find(|m| {
            m.format
                .as_deref()
                .is_some_and(|f| ACCEPTED_MEDIUM_FORMATS.contains(&f))
        })?;
        let total_tracks = medium.track_count?;
        let track_num = medium.track_offset.map(|offset| offset + 1).or_else(|| {
            medium
                .track
                .first()
                .and_then(|t| t.number.as_deref())
                .and_then(|n| n.parse().ok())
        })?;
        if track_num == 0 || track_num > total_tracks {
            return None;
        }

        let album = release
            .release_group
            .as_ref()
            .and_then(|g| g.title.clone())
            .unwrap_or_else(|| release.title.clone());

        Some(MatchResult {
            title: recording.title.clone(),
            artist,
            artists,
            album,
            is_single: false,
            release_date,
            track_num,
            total_tracks,
            release_mbid: release.id.clone(),
            thumbnail_url: None,
            thumbnail_resolution: None,
        })
    } else {
        Some(MatchResult {
            title: recording.title.clone(),
            artist,
            artists,
            album: recording.title.clone(),
            is_single: true,
            release_date,
            track_num: 1,
            total_tracks: 1,
            release_mbid: release.id.clone(),
            thumbnail_url: None,
            thumbnail_resolution: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeCatalog, album_recording, single_recording};

    #[tokio::test]
    async fn test_album_found() {
        let catalog = FakeCatalog::new();
        catalog.add_search(
            "The Weeknd",
            "Blinding Lights",
            vec![album_recording("Blinding Lights", "The Weeknd", "After Hours", 9, 14, "Official")],
        );
        catalog.add_cover("rel-After Hours", 500);
        let matcher = Matcher::new(catalog, 3);

        let result = matcher
            .resolve("Blinding Lights", "The Weeknd", Provider::Youtube)
            .await
            .unwrap();

        assert_eq!(result.status(), ReportStatus::AlbumFound);
        assert_eq!(result.track_num, 9);
        assert_eq!(result.total_tracks, 14);
        assert!(!result.is_single);
        assert_eq!(result.album, "After Hours");
        assert_eq!(result.thumbnail_resolution, Some(500));

        let post = result.to_post();
        assert_eq!(post.track_num, Some(9));
        assert_eq!(post.total_tracks, Some(14));
        assert!(!post.is_single);
    }

    #[tokio::test]
    async fn test_no_candidates() {
        let catalog = FakeCatalog::new();
        let matcher = Matcher::new(catalog, 3);
        assert!(matcher.resolve("Unknown", "Nobody", Provider::Soundcloud).await.is_none());
    }

    #[tokio::test]
    async fn test_non_album_is_single() {
        let catalog = FakeCatalog::new();
        catalog.add_search("Artist", "Song", vec![single_recording("Song", "Artist", "Single")]);
        let matcher = Matcher::new(catalog, 3);

        let result = matcher.resolve("Song", "Artist", Provider::Soundcloud).await.unwrap();
        assert_eq!(result.status(), ReportStatus::Single);
        assert_eq!(result.track_num, 1);
        assert_eq!(result.total_tracks, 1);
        assert_eq!(result.album, result.title);
        assert!(result.thumbnail_url.is_none());
    }

    #[tokio::test]
    async fn test_status_tier_beats_candidate_order() {
        let catalog = FakeCatalog::new();
        catalog.add_search(
            "Artist",
            "Song",
            vec![
                album_recording("Song", "Artist", "Bootleg Live", 3, 10, "Bootleg"),
                album_recording("Song", "Artist", "Studio Album", 2, 12, "Official"),
            ],
        );
        let matcher = Matcher::new(catalog, 0);

        let result = matcher.resolve("Song", "Artist", Provider::Soundcloud).await.unwrap();
        assert_eq!(result.album, "Studio Album");
        assert_eq!(result.track_num, 2);
    }

    #[tokio::test]
    async fn test_album_without_accepted_medium_tries_next_candidate() {
        let mut unusable = album_recording("Song", "Artist", "Odd Format", 1, 5, "Official");
        unusable.releases[0].media[0].format = Some("Laserdisc".to_string());

        let catalog = FakeCatalog::new();
        catalog.add_search(
            "Artist",
            "Song",
            vec![unusable, album_recording("Song", "Artist", "Good Album", 4, 8, "Official")],
        );
        let matcher = Matcher::new(catalog, 0);

        let result = matcher.resolve("Song", "Artist", Provider::Soundcloud).await.unwrap();
        assert_eq!(result.album, "Good Album");
        assert_eq!((result.track_num, result.total_tracks), (4, 8));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_retried_then_not_found() {
        let catalog = FakeCatalog::new();
        catalog.fail_searches(10);
        let matcher = Matcher::new(catalog, 2);

        assert!(matcher.resolve("Song", "Artist", Provider::Soundcloud).await.is_none());
        assert_eq!(matcher.catalog().search_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_error_recovers() {
        let catalog = FakeCatalog::new();
        catalog.fail_searches(1);
        catalog.add_search("Artist", "Song", vec![single_recording("Song", "Artist", "Single")]);
        let matcher = Matcher::new(catalog, 2);

        assert!(matcher.resolve("Song", "Artist", Provider::Soundcloud).await.is_some());
        assert_eq!(matcher.catalog().search_calls(), 2);
    }

    #[test]
    fn test_normalize_query() {
        assert_eq!(
            normalize_query("Daft Punk - Around the World (Official Audio)", "Daft Punk", Provider::Youtube),
            ("Daft Punk".to_string(), "Around the World".to_string())
        );
        // SoundCloud titles are taken as-is
        assert_eq!(
            normalize_query("Artist - Song", "uploader", Provider::Soundcloud),
            ("uploader".to_string(), "Artist - Song".to_string())
        );
        // unusable split falls back to the raw title
        assert_eq!(
            normalize_query("(Official Video)", "", Provider::Youtube),
            ("".to_string(), "(Official Video)".to_string())
        );
    }

    #[test]
    fn test_normalize_query_fallback_cleans_channel() {
        assert_eq!(
            normalize_query("(Official Video)", "DaftPunkVEVO", Provider::Youtube),
            ("DaftPunk".to_string(), "(Official Video)".to_string())
        );
        assert_eq!(
            normalize_query("[HD]", "Daft Punk - Topic", Provider::Youtube),
            ("Daft Punk".to_string(), "[HD]".to_string())
        );
        // channel suffixes only apply to YouTube
        assert_eq!(
            normalize_query("(Official Video)", "DaftPunkVEVO", Provider::Soundcloud),
            ("DaftPunkVEVO".to_string(), "(Official Video)".to_string())
        );
    }
}
