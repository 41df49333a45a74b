//! Expands playlist URLs into ordered track references

use anyhow::{Context, Result};
use tracing::{debug, info, warn};
use url::Url;

use super::{PlaylistIndex, PlaylistSpec, Provider, ResolvedPlaylist, TrackReference};
use crate::fetch::{Extractor, FlatEntry, FlatPlaylist};
use crate::utils::genre::normalize_genres;

const SOUNDCLOUD_SET_EXTRACTOR: &str = "SoundcloudSet";
const YOUTUBE_TAB_EXTRACTOR: &str = "YoutubeTab";
const GENERIC_EXTRACTOR: &str = "Generic";

const SOUNDCLOUD_HOSTS: &[&str] = &["soundcloud.com", "www.soundcloud.com", "m.soundcloud.com"];
const SOUNDCLOUD_SHORT_HOSTS: &[&str] = &["on.soundcloud.com"];
const YOUTUBE_HOSTS: &[&str] = &[
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "music.youtube.com",
    "youtu.be",
];

/// Shape of a playlist URL, decided from its host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlKind {
    SoundcloudLong,
    SoundcloudShort,
    Youtube,
    Unknown,
}

pub fn classify_url(raw: &str) -> UrlKind {
    let Ok(url) = Url::parse(raw.trim()) else {
        return UrlKind::Unknown;
    };
    if !matches!(url.scheme(), "http" | "https") {
        return UrlKind::Unknown;
    }
    let Some(host) = url.host_str().map(str::to_lowercase) else {
        return UrlKind::Unknown;
    };

    if SOUNDCLOUD_HOSTS.contains(&host.as_str()) {
        UrlKind::SoundcloudLong
    } else if SOUNDCLOUD_SHORT_HOSTS.contains(&host.as_str()) {
        UrlKind::SoundcloudShort
    } else if YOUTUBE_HOSTS.contains(&host.as_str()) {
        UrlKind::Youtube
    } else {
        UrlKind::Unknown
    }
}

/// Resolves playlists through an [`Extractor`] in flat mode
pub struct PlaylistResolver<'a, E: ?Sized> {
    extractor: &'a E,
    warnings: Vec<String>,
}

impl<'a, E: Extractor + ?Sized> PlaylistResolver<'a, E> {
    pub fn new(extractor: &'a E) -> Self {
        Self {
            extractor,
            warnings: Vec::new(),
        }
    }

    /// Non-fatal problems seen while resolving
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Resolve every URL in input order
    ///
    /// Unknown hosts and URLs that turn out not to be playlists are skipped
    /// with a warning. An extraction failure for a playlist aborts the whole
    /// resolution, since none of its tracks can be identified.
    pub async fn resolve(&mut self, urls: &[String]) -> Result<PlaylistIndex> {
        let mut playlists = Vec::new();

        for url in urls {
            if let Some(playlist) = self.resolve_one(url).await? {
                info!(
                    "Resolved playlist '{}' with {} tracks",
                    playlist.spec.name(),
                    playlist.tracks.len()
                );
                playlists.push(playlist);
            }
        }

        Ok(PlaylistIndex::new(playlists))
    }

    async fn resolve_one(&mut self, url: &str) -> Result<Option<ResolvedPlaylist>> {
        let kind = classify_url(url);
        if kind == UrlKind::Unknown {
            self.warn(format!("Unexpected domain, skipping {}", url));
            return Ok(None);
        }

        let mut info = self.extract(url).await?;

        if kind == UrlKind::SoundcloudShort && info.extractor_key == GENERIC_EXTRACTOR {
            let Some(target) = info.url.clone().or_else(|| info.webpage_url.clone()) else {
                self.warn(format!("{} did not redirect to a playlist", url));
                return Ok(None);
            };
            debug!("Following shortened link {} -> {}", url, target);
            info = self.extract(&target).await?;
        }

        let provider = match info.extractor_key.as_str() {
            SOUNDCLOUD_SET_EXTRACTOR => Provider::Soundcloud,
            YOUTUBE_TAB_EXTRACTOR => Provider::Youtube,
            other => {
                self.warn(format!("Unexpected extractor '{}' for {}", other, url));
                return Ok(None);
            }
        };

        let Some(entries) = info.entries.as_deref() else {
            self.warn(format!("{} does not seem to be a playlist", url));
            return Ok(None);
        };

        let name = info.name().unwrap_or(url).to_string();
        let spec = PlaylistSpec::new(url, name);

        let mut tracks = Vec::with_capacity(entries.len());
        for (idx, entry) in entries.iter().enumerate() {
            let Some(entry_url) = entry.url.as_deref().filter(|u| !u.is_empty()) else {
                self.warn(format!(
                    "[{}] Skipping: no URL found for {}",
                    idx + 1,
                    entry.title.as_deref().unwrap_or("untitled entry")
                ));
                continue;
            };

            let track = match provider {
                Provider::Youtube => Some(youtube_track(entry_url, entry)),
                Provider::Soundcloud => self.soundcloud_track(entry_url).await,
            };
            tracks.extend(track);
        }

        Ok(Some(ResolvedPlaylist { spec, tracks }))
    }

    async fn extract(&self, url: &str) -> Result<FlatPlaylist> {
        self.extractor
            .extract_flat(url)
            .await
            .with_context(|| format!("Failed to resolve playlist {}", url))
    }

    /// SoundCloud flat entries only reference the track, so look it up
    async fn soundcloud_track(&mut self, url: &str) -> Option<TrackReference> {
        match self.extractor.extract_track(url).await {
            Ok(info) => {
                let genres = normalize_genres(&info.all_genres());
                Some(TrackReference {
                    url: url.to_string(),
                    provider: Provider::Soundcloud,
                    title: info.title.clone().unwrap_or_default(),
                    uploader: info.artist_or_uploader().unwrap_or_default().to_string(),
                    thumbnail_url: info.thumbnail.clone(),
                    genres: Some(genres).filter(|g| !g.is_empty()),
                })
            }
            Err(e) => {
                self.warn(format!("Skipping {}: {}", url, e));
                None
            }
        }
    }

    fn warn(&mut self, message: String) {
        warn!("{}", message);
        self.warnings.push(message);
    }
}

fn youtube_track(url: &str, entry: &FlatEntry) -> TrackReference {
    TrackReference {
        url: url.to_string(),
        provider: Provider::Youtube,
        title: entry.title.clone().unwrap_or_default(),
        uploader: entry
            .uploader
            .clone()
            .or_else(|| entry.channel.clone())
            .unwrap_or_default(),
        thumbnail_url: entry.best_thumbnail().map(str::to_string),
        genres: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::TrackInfo;
    use crate::testing::FakeExtractor;

    fn yt_entry(url: &str, title: &str) -> FlatEntry {
        FlatEntry {
            url: Some(url.to_string()),
            title: Some(title.to_string()),
            uploader: Some("Uploader".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_classify_url() {
        assert_eq!(
            classify_url("https://soundcloud.com/user/sets/mix"),
            UrlKind::SoundcloudLong
        );
        assert_eq!(
            classify_url("https://on.soundcloud.com/AbC123"),
            UrlKind::SoundcloudShort
        );
        assert_eq!(
            classify_url("https://www.youtube.com/playlist?list=PL123"),
            UrlKind::Youtube
        );
        assert_eq!(classify_url("https://example.com/playlist"), UrlKind::Unknown);
        assert_eq!(classify_url("not a url"), UrlKind::Unknown);
        assert_eq!(classify_url("ftp://youtube.com/x"), UrlKind::Unknown);
    }

    #[tokio::test]
    async fn test_youtube_playlist_in_order() {
        let extractor = FakeExtractor::new();
        extractor.add_flat(
            "https://www.youtube.com/playlist?list=PL1",
            FlatPlaylist {
                extractor_key: "YoutubeTab".to_string(),
                title: Some("Road Trip".to_string()),
                entries: Some(vec![
                    yt_entry("https://www.youtube.com/watch?v=1", "First"),
                    yt_entry("https://www.youtube.com/watch?v=2", "Second"),
                ]),
                ..Default::default()
            },
        );

        let mut resolver = PlaylistResolver::new(&extractor);
        let index = resolver
            .resolve(&["https://www.youtube.com/playlist?list=PL1".to_string()])
            .await
            .unwrap();

        let playlist = &index.playlists()[0];
        assert_eq!(playlist.spec.name(), "Road Trip");
        let titles: Vec<&str> = playlist.tracks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Second"]);
        assert!(playlist.tracks.iter().all(|t| t.provider == Provider::Youtube));
    }

    #[tokio::test]
    async fn test_unknown_domain_is_skipped() {
        let extractor = FakeExtractor::new();
        let mut resolver = PlaylistResolver::new(&extractor);

        let index = resolver
            .resolve(&["https://example.com/list".to_string()])
            .await
            .unwrap();

        assert!(index.playlists().is_empty());
        assert_eq!(resolver.warnings().len(), 1);
    }

    #[tokio::test]
    async fn test_extraction_failure_is_fatal() {
        let extractor = FakeExtractor::new();
        let mut resolver = PlaylistResolver::new(&extractor);

        let result = resolver
            .resolve(&["https://www.youtube.com/playlist?list=missing".to_string()])
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_soundcloud_short_link_redirect() {
        let extractor = FakeExtractor::new();
        extractor.add_flat(
            "https://on.soundcloud.com/abc",
            FlatPlaylist {
                extractor_key: "Generic".to_string(),
                url: Some("https://soundcloud.com/dj/sets/night".to_string()),
                ..Default::default()
            },
        );
        extractor.add_flat(
            "https://soundcloud.com/dj/sets/night",
            FlatPlaylist {
                extractor_key: "SoundcloudSet".to_string(),
                album: Some("Night Set".to_string()),
                entries: Some(vec![
                    FlatEntry {
                        url: Some("https://api.soundcloud.com/tracks/1".to_string()),
                        ..Default::default()
                    },
                    FlatEntry {
                        url: Some("https://api.soundcloud.com/tracks/2".to_string()),
                        ..Default::default()
                    },
                ]),
                ..Default::default()
            },
        );
        extractor.add_track(
            "https://api.soundcloud.com/tracks/1",
            TrackInfo {
                title: Some("Nightcall".to_string()),
                uploader: Some("dj-account".to_string()),
                artist: Some("Kavinsky".to_string()),
                genres: Some(vec!["electro".to_string()]),
                thumbnail: Some("https://i1.sndcdn.com/art.jpg".to_string()),
                ..Default::default()
            },
        );

        let mut resolver = PlaylistResolver::new(&extractor);
        let index = resolver
            .resolve(&["https://on.soundcloud.com/abc".to_string()])
            .await
            .unwrap();

        let playlist = &index.playlists()[0];
        assert_eq!(playlist.spec, PlaylistSpec::new("https://on.soundcloud.com/abc", "Night Set"));
        // track 2 has no lookup result and is skipped with a warning
        assert_eq!(playlist.tracks.len(), 1);
        let track = &playlist.tracks[0];
        assert_eq!(track.uploader, "Kavinsky");
        assert_eq!(track.genres, Some(vec!["Electronic".to_string()]));
        assert_eq!(resolver.warnings().len(), 1);
    }

    #[tokio::test]
    async fn test_non_playlist_warns() {
        let extractor = FakeExtractor::new();
        extractor.add_flat(
            "https://soundcloud.com/dj/single-track",
            FlatPlaylist {
                extractor_key: "Soundcloud".to_string(),
                ..Default::default()
            },
        );

        let mut resolver = PlaylistResolver::new(&extractor);
        let index = resolver
            .resolve(&["https://soundcloud.com/dj/single-track".to_string()])
            .await
            .unwrap();
        assert!(index.playlists().is_empty());
        assert_eq!(resolver.warnings().len(), 1);
    }
}
