//! MusicBrainz web service response models (JSON, `fmt=json`)

use serde::Deserialize;

/// Response of `GET /ws/2/recording?query=...`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordingSearch {
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub recordings: Vec<Recording>,
}

/// A candidate recording
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Recording {
    pub id: String,
    /// Search relevance, 0 to 100
    #[serde(default)]
    pub score: Option<u32>,
    pub title: String,
    #[serde(rename = "artist-credit", default)]
    pub artist_credit: Vec<ArtistCredit>,
    #[serde(rename = "first-release-date", default)]
    pub first_release_date: Option<String>,
    #[serde(default)]
    pub releases: Vec<Release>,
}

impl Recording {
    /// Credited artist names in credit order
    pub fn artist_names(&self) -> Vec<String> {
        self.artist_credit.iter().map(|c| c.name.clone()).collect()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArtistCredit {
    pub name: String,
    #[serde(default)]
    pub joinphrase: Option<String>,
    #[serde(default)]
    pub artist: Option<Artist>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Artist {
    pub id: String,
    pub name: String,
}

/// A release containing the recording
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Release {
    pub id: String,
    pub title: String,
    /// `Official`, `Promotion`, `Bootleg`, `Pseudo-Release`, or absent
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(rename = "release-group", default)]
    pub release_group: Option<ReleaseGroup>,
    #[serde(rename = "track-count", default)]
    pub track_count: Option<u32>,
    #[serde(default)]
    pub media: Vec<Medium>,
}

impl Release {
    pub fn primary_type(&self) -> Option<&str> {
        self.release_group.as_ref()?.primary_type.as_deref()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReleaseGroup {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(rename = "primary-type", default)]
    pub primary_type: Option<String>,
}

/// One disc or side of a release, restricted to the matched track
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Medium {
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub position: Option<u32>,
    #[serde(rename = "track-count", default)]
    pub track_count: Option<u32>,
    /// Zero-based index of the matched track on this medium
    #[serde(rename = "track-offset", default)]
    pub track_offset: Option<u32>,
    #[serde(default)]
    pub track: Vec<MediumTrack>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediumTrack {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_recording_search() {
        let json = r#"{
            "created": "2024-01-01T00:00:00.000Z",
            "count": 1,
            "offset": 0,
            "recordings": [{
                "id": "rec-1",
                "score": 100,
                "title": "Blinding Lights",
                "length": 200040,
                "artist-credit": [{"name": "The Weeknd", "artist": {"id": "a-1", "name": "The Weeknd", "sort-name": "Weeknd, The"}}],
                "first-release-date": "2019-11-29",
                "releases": [{
                    "id": "rel-1",
                    "title": "After Hours",
                    "status": "Official",
                    "date": "2020-03-20",
                    "release-group": {"id": "rg-1", "title": "After Hours", "primary-type": "Album"},
                    "track-count": 14,
                    "media": [{"position": 1, "format": "Digital Media", "track-count": 14, "track-offset": 8,
                               "track": [{"id": "t-1", "number": "9", "title": "Blinding Lights", "length": 200040}]}]
                }]
            }]
        }"#;

        let search: RecordingSearch = serde_json::from_str(json).unwrap();
        let recording = &search.recordings[0];
        assert_eq!(recording.artist_names(), vec!["The Weeknd"]);
        let release = &recording.releases[0];
        assert_eq!(release.primary_type(), Some("Album"));
        assert_eq!(release.media[0].track_offset, Some(8));
    }
}
