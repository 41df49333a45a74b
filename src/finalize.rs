//! Commit path shared by auto-accept and the review session
//!
//! Tags are applied and the file renamed, the track is appended to every
//! playlist it was listed in, and only then is the ledger entry removed and
//! the ledger dumped. Any failure leaves the entry in place.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::playlist::PlaylistWriter;
use crate::report::{ReportError, ReportStore};
use crate::tagging::{TagApplier, TagError, TrackMetadata};

#[derive(Error, Debug)]
pub enum FinalizeError {
    #[error(transparent)]
    Tag(#[from] TagError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error("entry {0} has no downloaded file")]
    MissingFile(String),

    #[error("playlist update failed: {0:#}")]
    Playlist(anyhow::Error),
}

pub struct Finalizer<'a, T: ?Sized> {
    tagger: &'a T,
    writer: &'a PlaylistWriter,
}

impl<'a, T: TagApplier + ?Sized> Finalizer<'a, T> {
    pub fn new(tagger: &'a T, writer: &'a PlaylistWriter) -> Self {
        Self { tagger, writer }
    }

    /// Finalize one ledger entry with the chosen metadata
    pub async fn finalize(
        &self,
        store: &mut ReportStore,
        url: &str,
        metadata: &TrackMetadata,
    ) -> Result<PathBuf, FinalizeError> {
        let entry = store.get(url).ok_or_else(|| ReportError::MissingEntry {
            url: url.to_string(),
        })?;
        let pre = entry.pre_search()?;
        let path = pre
            .path
            .as_deref()
            .map(PathBuf::from)
            .ok_or_else(|| FinalizeError::MissingFile(url.to_string()))?;

        let new_path = self.tagger.apply(&path, metadata).await?;

        if let Err(e) = self.writer.append_track(
            &pre.playlists,
            pre.duration.unwrap_or(0),
            &metadata.artist,
            &metadata.title,
            &new_path,
        ) {
            warn!("Playlist update for {} failed after tagging", url);
            record_move(store, url, &path, &new_path)?;
            return Err(FinalizeError::Playlist(e));
        }

        store.remove(url);
        store.dump()?;

        info!("Finalized {} - {}", metadata.artist, metadata.title);
        Ok(new_path)
    }
}

fn record_move(store: &mut ReportStore, url: &str, old: &Path, new: &Path) -> Result<(), ReportError> {
    if old != new {
        store.relocate(url, new)?;
        store.dump()?;
    }
    Ok(())
}
