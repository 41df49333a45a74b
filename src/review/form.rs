//! Manual metadata edit form and its validators

use chrono::NaiveDate;

use super::ImageCheck;
use crate::report::{PostSearch, PreSearch};
use crate::tagging::TrackMetadata;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKey {
    Title,
    Artist,
    Artists,
    Album,
    ReleaseDate,
    TrackNum,
    TotalTracks,
    CoverUrl,
    Genres,
}

impl FieldKey {
    pub const ALL: [FieldKey; 9] = [
        FieldKey::Title,
        FieldKey::Artist,
        FieldKey::Artists,
        FieldKey::Album,
        FieldKey::ReleaseDate,
        FieldKey::TrackNum,
        FieldKey::TotalTracks,
        FieldKey::CoverUrl,
        FieldKey::Genres,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            FieldKey::Title => "Title",
            FieldKey::Artist => "Artist",
            FieldKey::Artists => "Artists (comma separated)",
            FieldKey::Album => "Album",
            FieldKey::ReleaseDate => "Release date (YYYY-MM-DD)",
            FieldKey::TrackNum => "Track number",
            FieldKey::TotalTracks => "Album length",
            FieldKey::CoverUrl => "Cover URL",
            FieldKey::Genres => "Genres (comma separated)",
        }
    }

    fn index(&self) -> usize {
        FieldKey::ALL
            .iter()
            .position(|k| k == self)
            .unwrap_or_default()
    }
}

/// A field that failed validation and why
#[derive(Debug, Clone, PartialEq)]
pub struct FieldError {
    pub key: FieldKey,
    pub message: String,
}

impl FieldError {
    fn new(key: FieldKey, message: impl Into<String>) -> Self {
        Self {
            key,
            message: message.into(),
        }
    }
}

/// Editable copy of an entry's metadata, one string per [`FieldKey`]
#[derive(Debug, Clone, PartialEq)]
pub struct EditForm {
    values: [String; 9],
}

impl EditForm {
    /// Pre-filled from the resolved snapshot; genres come from the download
    pub fn from_post(post: &PostSearch, pre: &PreSearch) -> Self {
        Self::from_metadata(&TrackMetadata::from_post(post, pre))
    }

    pub fn from_pre(pre: &PreSearch) -> Self {
        Self::from_metadata(&TrackMetadata::from_pre(pre))
    }

    fn from_metadata(meta: &TrackMetadata) -> Self {
        let mut form = Self {
            values: Default::default(),
        };
        form.set(FieldKey::Title, meta.title.clone());
        form.set(FieldKey::Artist, meta.artist.clone());
        form.set(FieldKey::Artists, meta.artists.join(", "));
        form.set(FieldKey::Album, meta.album.clone());
        form.set(FieldKey::ReleaseDate, meta.release_date.clone().unwrap_or_default());
        form.set(FieldKey::TrackNum, meta.track_num.to_string());
        form.set(FieldKey::TotalTracks, meta.total_tracks.to_string());
        form.set(FieldKey::CoverUrl, meta.thumbnail_url.clone().unwrap_or_default());
        form.set(FieldKey::Genres, meta.genres.join(", "));
        form
    }

    pub fn value(&self, key: FieldKey) -> &str {
        &self.values[key.index()]
    }

    pub fn set(&mut self, key: FieldKey, value: String) {
        self.values[key.index()] = value;
    }

    pub fn push_char(&mut self, key: FieldKey, c: char) {
        self.values[key.index()].push(c);
    }

    pub fn pop_char(&mut self, key: FieldKey) {
        self.values[key.index()].pop();
    }

    /// Checks that need no network access
    pub fn check_local(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();

        for key in [FieldKey::Title, FieldKey::Artist, FieldKey::Album] {
            if self.value(key).trim().is_empty() {
                errors.push(FieldError::new(key, "must not be empty"));
            }
        }
        if split_list(self.value(FieldKey::Artists)).is_empty() {
            errors.push(FieldError::new(FieldKey::Artists, "at least one artist is required"));
        }
        if let Err(message) = validate_date(self.value(FieldKey::ReleaseDate)) {
            errors.push(FieldError::new(FieldKey::ReleaseDate, message));
        }

        let track = parse_positive(self.value(FieldKey::TrackNum));
        let total = parse_positive(self.value(FieldKey::TotalTracks));
        match (&track, &total) {
            (Err(message), _) => errors.push(FieldError::new(FieldKey::TrackNum, message.clone())),
            (Ok(t), Ok(n)) if t > n => errors.push(FieldError::new(
                FieldKey::TrackNum,
                format!("track {} is past the album length {}", t, n),
            )),
            _ => {}
        }
        if let Err(message) = total {
            errors.push(FieldError::new(FieldKey::TotalTracks, message));
        }

        if self.value(FieldKey::CoverUrl).trim().is_empty() {
            errors.push(FieldError::new(FieldKey::CoverUrl, "must not be empty"));
        }
        errors
    }

    /// Full validation; on success the metadata to commit
    pub async fn validate<P: ImageCheck + ?Sized>(
        &self,
        images: &P,
    ) -> Result<TrackMetadata, Vec<FieldError>> {
        let mut errors = self.check_local();

        let cover = self.value(FieldKey::CoverUrl).trim();
        if !cover.is_empty() && !images.is_image(cover).await {
            errors.push(FieldError::new(
                FieldKey::CoverUrl,
                "does not point to a reachable image",
            ));
        }

        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(self.to_metadata())
    }

    fn to_metadata(&self) -> TrackMetadata {
        TrackMetadata {
            title: self.value(FieldKey::Title).trim().to_string(),
            artist: self.value(FieldKey::Artist).trim().to_string(),
            artists: split_list(self.value(FieldKey::Artists)),
            album: self.value(FieldKey::Album).trim().to_string(),
            release_date: Some(self.value(FieldKey::ReleaseDate).trim().to_string()),
            track_num: parse_positive(self.value(FieldKey::TrackNum)).unwrap_or(1),
            total_tracks: parse_positive(self.value(FieldKey::TotalTracks)).unwrap_or(1),
            genres: split_list(self.value(FieldKey::Genres)),
            thumbnail_url: Some(self.value(FieldKey::CoverUrl).trim().to_string()),
        }
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn validate_date(value: &str) -> Result<(), String> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map(|_| ())
        .map_err(|_| format!("'{}' is not a YYYY-MM-DD date", value.trim()))
}

fn parse_positive(value: &str) -> Result<u32, String> {
    match value.trim().parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("'{}' is not a positive number", value.trim())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeImageCheck;

    const COVER: &str = "https://coverartarchive.org/release/rel/front-500";

    fn valid_form() -> EditForm {
        let post = PostSearch {
            title: Some("Blinding Lights".to_string()),
            artist: Some("The Weeknd".to_string()),
            artists: vec!["The Weeknd".to_string()],
            album: Some("After Hours".to_string()),
            release_date: Some("2020-03-20".to_string()),
            track_num: Some(9),
            total_tracks: Some(14),
            thumbnail_url: Some(COVER.to_string()),
            ..Default::default()
        };
        let pre = PreSearch {
            url: "u".to_string(),
            genres: Some(vec!["Pop".to_string(), "Synthwave".to_string()]),
            ..Default::default()
        };
        EditForm::from_post(&post, &pre)
    }

    fn keys(errors: &[FieldError]) -> Vec<FieldKey> {
        errors.iter().map(|e| e.key).collect()
    }

    #[tokio::test]
    async fn test_valid_form_commits() {
        let form = valid_form();
        assert_eq!(form.value(FieldKey::Genres), "Pop, Synthwave");

        let meta = form
            .validate(&FakeImageCheck::accepting(&[COVER]))
            .await
            .unwrap();
        assert_eq!(meta.track_num, 9);
        assert_eq!(meta.total_tracks, 14);
        assert_eq!(meta.genres, vec!["Pop", "Synthwave"]);
        assert_eq!(meta.release_date.as_deref(), Some("2020-03-20"));
    }

    #[tokio::test]
    async fn test_unreachable_cover_rejected() {
        let form = valid_form();
        let errors = form
            .validate(&FakeImageCheck::accepting(&[]))
            .await
            .unwrap_err();
        assert_eq!(keys(&errors), vec![FieldKey::CoverUrl]);
    }

    #[test]
    fn test_date_format() {
        let mut form = valid_form();
        form.set(FieldKey::ReleaseDate, "20/03/2020".to_string());
        assert_eq!(keys(&form.check_local()), vec![FieldKey::ReleaseDate]);

        form.set(FieldKey::ReleaseDate, "2020-02-30".to_string());
        assert_eq!(keys(&form.check_local()), vec![FieldKey::ReleaseDate]);
    }

    #[test]
    fn test_track_past_album_length() {
        let mut form = valid_form();
        form.set(FieldKey::TrackNum, "15".to_string());
        assert_eq!(keys(&form.check_local()), vec![FieldKey::TrackNum]);

        form.set(FieldKey::TrackNum, "0".to_string());
        assert_eq!(keys(&form.check_local()), vec![FieldKey::TrackNum]);

        form.set(FieldKey::TrackNum, "14".to_string());
        assert!(form.check_local().is_empty());
    }

    #[test]
    fn test_required_fields() {
        let mut form = valid_form();
        form.set(FieldKey::Title, "  ".to_string());
        form.set(FieldKey::Artists, " , ".to_string());
        form.set(FieldKey::CoverUrl, String::new());
        assert_eq!(
            keys(&form.check_local()),
            vec![FieldKey::Title, FieldKey::Artists, FieldKey::CoverUrl]
        );
    }

    #[test]
    fn test_from_pre_prefill() {
        let pre = PreSearch {
            url: "u".to_string(),
            title: Some("Nightcall".to_string()),
            uploader: Some("Kavinsky".to_string()),
            thumbnail_url: Some("https://i1.sndcdn.com/art.jpg".to_string()),
            ..Default::default()
        };
        let mut form = EditForm::from_pre(&pre);
        assert_eq!(form.value(FieldKey::Album), "Nightcall");
        assert_eq!(form.value(FieldKey::TrackNum), "1");
        assert_eq!(form.value(FieldKey::ReleaseDate), "");

        form.push_char(FieldKey::Title, '!');
        assert_eq!(form.value(FieldKey::Title), "Nightcall!");
        form.pop_char(FieldKey::Title);
        assert_eq!(form.value(FieldKey::Title), "Nightcall");
    }
}
