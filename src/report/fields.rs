//! Typed snapshots stored in the `pre` and `post` slots of a ledger entry
//!
//! On disk both slots are plain JSON objects whose keys must come from
//! [`VALID_REPORT_KEYS`]. The structs here are the typed views used by the
//! pipeline and the review session; they convert to and from [`Fields`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::ReportError;
use crate::playlist::{PlaylistSpec, Provider};

/// Raw key/value snapshot as persisted in the ledger
pub type Fields = serde_json::Map<String, serde_json::Value>;

/// Every key a `pre` or `post` snapshot may contain
pub const VALID_REPORT_KEYS: &[&str] = &[
    "title",
    "uploader",
    "provider",
    "ext",
    "duration",
    "thumbnail_url",
    "thumbnail_width",
    "thumbnail_height",
    "genres",
    "path",
    "url",
    "playlists",
    "artist",
    "artists",
    "album",
    "single",
    "release_date",
    "track_num",
    "total_tracks",
    "mbid",
];

/// Reject any key outside the whitelist
pub fn verify_keys(fields: &Fields) -> Result<(), ReportError> {
    match fields.keys().find(|key| !VALID_REPORT_KEYS.contains(&key.as_str())) {
        Some(key) => Err(ReportError::InvalidKey { key: key.clone() }),
        None => Ok(()),
    }
}

/// Conversion between a typed snapshot and its persisted form
pub trait Snapshot: Serialize + DeserializeOwned {
    fn to_fields(&self) -> Result<Fields, ReportError> {
        match serde_json::to_value(self)? {
            serde_json::Value::Object(map) => Ok(map),
            other => Err(ReportError::Shape(format!(
                "snapshot serialized to {} instead of an object",
                other
            ))),
        }
    }

    fn from_fields(fields: &Fields) -> Result<Self, ReportError> {
        Ok(serde_json::from_value(serde_json::Value::Object(fields.clone()))?)
    }
}

/// State captured right after a successful download
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreSearch {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploader: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<Provider>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Duration in whole seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genres: Option<Vec<String>>,
    /// Source playlists this track was listed in
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub playlists: Vec<PlaylistSpec>,
}

impl PreSearch {
    /// Snapshot recorded when every download attempt failed
    pub fn failed(url: &str) -> Self {
        Self {
            url: url.to_string(),
            ..Default::default()
        }
    }
}

impl Snapshot for PreSearch {}

/// Metadata resolved from the catalog
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostSearch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(default)]
    pub artists: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(rename = "single", default)]
    pub is_single: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_num: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tracks: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mbid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_height: Option<u32>,
}

impl PostSearch {
    /// Whether every field needed to commit without manual editing is present
    pub fn is_complete(&self) -> bool {
        self.title.as_deref().is_some_and(|t| !t.is_empty())
            && self.artist.as_deref().is_some_and(|a| !a.is_empty())
            && !self.artists.is_empty()
            && self.track_num.is_some()
            && self.total_tracks.is_some()
            && self.release_date.as_deref().is_some_and(|d| !d.is_empty())
            && self.thumbnail_url.as_deref().is_some_and(|u| !u.is_empty())
    }
}

impl Snapshot for PostSearch {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pre_search_uses_whitelisted_keys() {
        let pre = PreSearch {
            url: "https://youtube.com/watch?v=abc".to_string(),
            title: Some("Song".to_string()),
            provider: Some(Provider::Youtube),
            duration: Some(201),
            playlists: vec![PlaylistSpec::new("https://youtube.com/playlist?list=x", "Mix")],
            ..Default::default()
        };

        let fields = pre.to_fields().unwrap();
        assert!(verify_keys(&fields).is_ok());
        assert_eq!(fields["provider"], json!("Youtube"));
        assert_eq!(
            fields["playlists"],
            json!([["https://youtube.com/playlist?list=x", "Mix"]])
        );
        assert!(!fields.contains_key("thumbnail_url"));
    }

    #[test]
    fn test_post_search_single_key_name() {
        let post = PostSearch {
            title: Some("Song".to_string()),
            is_single: true,
            ..Default::default()
        };
        let fields = post.to_fields().unwrap();
        assert_eq!(fields["single"], json!(true));
        assert!(verify_keys(&fields).is_ok());
        assert_eq!(PostSearch::from_fields(&fields).unwrap(), post);
    }

    #[test]
    fn test_verify_keys_rejects_unknown() {
        let mut fields = Fields::new();
        fields.insert("title".to_string(), json!("x"));
        fields.insert("bitrate".to_string(), json!(320));

        match verify_keys(&fields) {
            Err(ReportError::InvalidKey { key }) => assert_eq!(key, "bitrate"),
            other => panic!("expected InvalidKey, got {:?}", other),
        }
    }

    #[test]
    fn test_post_completeness() {
        let mut post = PostSearch {
            title: Some("Blinding Lights".to_string()),
            artist: Some("The Weeknd".to_string()),
            artists: vec!["The Weeknd".to_string()],
            album: Some("After Hours".to_string()),
            release_date: Some("2020-03-20".to_string()),
            track_num: Some(9),
            total_tracks: Some(14),
            thumbnail_url: Some("https://coverartarchive.org/release/x/front-1200".to_string()),
            ..Default::default()
        };
        assert!(post.is_complete());

        post.thumbnail_url = None;
        assert!(!post.is_complete());
    }
}
