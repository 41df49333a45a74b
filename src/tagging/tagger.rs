//! lofty based tag writer

use async_trait::async_trait;
use bytes::Bytes;
use lofty::config::WriteOptions;
use lofty::prelude::*;
use lofty::probe::Probe;
use lofty::tag::{Tag, TagType};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use super::{TagApplier, TagError, TrackMetadata};
use crate::utils::cover_art::{self, ProcessedCover};
use crate::utils::track_file_name;

/// Attempts made to download a cover before giving up
const COVER_ATTEMPTS: u32 = 5;

/// Writes tags with lofty and renames to `<artist>_<album>_<NN>_<title>.<ext>`
pub struct LoftyTagger {
    http: reqwest::Client,
    retry_delay: Duration,
}

impl LoftyTagger {
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            retry_delay: Duration::from_secs(1),
        }
    }

    async fn download_cover(&self, url: &str) -> Result<Bytes, TagError> {
        let mut last_error = String::new();

        for attempt in 0..COVER_ATTEMPTS {
            if attempt > 0 {
                tokio::time::sleep(self.retry_delay * attempt).await;
            }
            match self.http.get(url).send().await {
                Ok(resp) if resp.status().is_success() => match resp.bytes().await {
                    Ok(data) => return Ok(data),
                    Err(e) => last_error = e.to_string(),
                },
                Ok(resp) => last_error = format!("HTTP {}", resp.status()),
                Err(e) => last_error = e.to_string(),
            }
            debug!("Cover download attempt {} failed: {}", attempt + 1, last_error);
        }

        Err(TagError::CoverArt(format!("{}: {}", url, last_error)))
    }
}

#[async_trait]
impl TagApplier for LoftyTagger {
    async fn apply(&self, path: &Path, metadata: &TrackMetadata) -> Result<PathBuf, TagError> {
        let cover = match metadata.thumbnail_url.as_deref() {
            Some(url) => {
                let data = self.download_cover(url).await?;
                let processed = tokio::task::spawn_blocking(move || cover_art::process_cover_art(&data))
                    .await
                    .map_err(|e| TagError::CoverArt(e.to_string()))?
                    .map_err(|e| TagError::CoverArt(format!("{:#}", e)))?;
                Some(processed)
            }
            None => None,
        };

        let path = path.to_path_buf();
        let metadata = metadata.clone();
        tokio::task::spawn_blocking(move || write_and_rename(&path, &metadata, cover.as_ref()))
            .await
            .map_err(|e| TagError::Tag(e.to_string()))?
    }
}

fn write_and_rename(
    path: &Path,
    metadata: &TrackMetadata,
    cover: Option<&ProcessedCover>,
) -> Result<PathBuf, TagError> {
    write_tags(path, metadata, cover)?;

    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_string())
        .unwrap_or_default();
    let file_name = track_file_name(
        &metadata.artist,
        &metadata.album,
        metadata.track_num,
        &metadata.title,
        &ext,
    );
    let target = path.with_file_name(file_name);

    if target != path {
        std::fs::rename(path, &target)?;
    }
    info!(
        "{} -> {}",
        path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default(),
        target.display()
    );
    Ok(target)
}

/// Replace every tag in the file with a fresh one holding `metadata`
fn write_tags(
    path: &Path,
    metadata: &TrackMetadata,
    cover: Option<&ProcessedCover>,
) -> Result<(), TagError> {
    let tag_err = |e: lofty::error::LoftyError| TagError::Tag(e.to_string());

    let mut tagged_file = Probe::open(path)
        .map_err(tag_err)?
        .read()
        .map_err(tag_err)?;

    let primary = tagged_file.primary_tag_type();
    let stale: Vec<TagType> = tagged_file
        .tags()
        .iter()
        .map(|t| t.tag_type())
        .filter(|t| *t != primary)
        .collect();
    for tag_type in stale {
        tagged_file.remove(tag_type);
        tag_type.remove_from_path(path).map_err(tag_err)?;
    }

    let mut tag = Tag::new(primary);
    tag.set_title(metadata.title.clone());
    tag.set_artist(metadata.artist.clone());
    tag.set_album(metadata.album.clone());
    tag.set_track(metadata.track_num);
    tag.set_track_total(metadata.total_tracks);
    if !metadata.artists.is_empty() {
        tag.insert_text(
            ItemKey::Unknown("ARTISTS".to_string()),
            metadata.artists.join("; "),
        );
    }
    if let Some(date) = metadata.release_date.as_deref().filter(|d| !d.is_empty()) {
        tag.insert_text(ItemKey::RecordingDate, date.to_string());
    }
    if !metadata.genres.is_empty() {
        tag.set_genre(metadata.genres.join("; "));
    }
    if let Some(cover) = cover {
        cover_art::set_front_cover(&mut tag, cover);
    }

    tagged_file.insert_tag(tag);
    tagged_file
        .save_to_path(path, WriteOptions::default())
        .map_err(tag_err)?;

    debug!("Wrote tags to {}", path.display());
    Ok(())
}
