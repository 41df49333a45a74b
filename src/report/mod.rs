//! Crash-safe work ledger mapping track URL to its pending outcome
//!
//! The ledger lives in `<output>/ctl_report` as a single JSON object keyed by
//! track URL. Every entry carries a `pre` snapshot written right after the
//! download step, a numeric `status`, and once matching has produced
//! something, a `post` snapshot. An entry present in the ledger means work on
//! that track is still pending; finalizing a track removes it.
//!
//! The file is only ever replaced wholesale by [`ReportStore::dump`], which
//! writes a sibling temp file and renames it into place.

mod fields;

pub use fields::{Fields, PostSearch, PreSearch, Snapshot, VALID_REPORT_KEYS, verify_keys};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Ledger file name inside the output directory
pub const REPORT_FILE: &str = "ctl_report";

/// Errors raised by the ledger
///
/// `InvalidKey`, `MissingEntry` and `TerminalStatus` are contract violations
/// by the caller; the remaining variants are I/O failures.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("invalid report key: {key}")]
    InvalidKey { key: String },

    #[error("no report entry for {url}")]
    MissingEntry { url: String },

    #[error("entry {url} is {status} and cannot transition")]
    TerminalStatus { url: String, status: ReportStatus },

    #[error("status {status} is not valid for this write")]
    InvalidTransition { status: ReportStatus },

    #[error("malformed report: {0}")]
    Shape(String),

    #[error("report I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("report serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Outcome classification of a ledger entry
///
/// Persisted as its integer code for compatibility with existing ledgers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ReportStatus {
    DownloadFailure,
    DownloadSuccess,
    MetadataNotFound,
    Single,
    AlbumFound,
}

impl ReportStatus {
    pub const ALL: [ReportStatus; 5] = [
        ReportStatus::DownloadFailure,
        ReportStatus::DownloadSuccess,
        ReportStatus::MetadataNotFound,
        ReportStatus::Single,
        ReportStatus::AlbumFound,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::DownloadFailure => "DOWNLOAD_FAILURE",
            ReportStatus::DownloadSuccess => "DOWNLOAD_SUCCESS",
            ReportStatus::MetadataNotFound => "METADATA_NOT_FOUND",
            ReportStatus::Single => "SINGLE",
            ReportStatus::AlbumFound => "ALBUM_FOUND",
        }
    }

    /// Statuses produced by the matcher
    pub fn is_match_outcome(&self) -> bool {
        matches!(
            self,
            ReportStatus::MetadataNotFound | ReportStatus::Single | ReportStatus::AlbumFound
        )
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ReportStatus> for u8 {
    fn from(status: ReportStatus) -> u8 {
        match status {
            ReportStatus::DownloadFailure => 0,
            ReportStatus::DownloadSuccess => 1,
            ReportStatus::MetadataNotFound => 2,
            ReportStatus::Single => 3,
            ReportStatus::AlbumFound => 4,
        }
    }
}

impl TryFrom<u8> for ReportStatus {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        ReportStatus::ALL
            .into_iter()
            .find(|status| u8::from(*status) == code)
            .ok_or_else(|| format!("unknown report status code {}", code))
    }
}

/// One pending track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub pre: Fields,
    pub status: ReportStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post: Option<Fields>,
}

impl ReportEntry {
    pub fn pre_search(&self) -> Result<PreSearch, ReportError> {
        PreSearch::from_fields(&self.pre)
    }

    pub fn post_search(&self) -> Result<Option<PostSearch>, ReportError> {
        self.post.as_ref().map(PostSearch::from_fields).transpose()
    }
}

/// In-memory ledger bound to its file
#[derive(Debug)]
pub struct ReportStore {
    path: PathBuf,
    entries: Vec<(String, ReportEntry)>,
    /// URLs recorded as `DOWNLOAD_FAILURE` during this process lifetime
    failed_this_run: HashSet<String>,
}

impl ReportStore {
    /// Empty ledger that will be written to `<output_dir>/ctl_report`
    pub fn new(output_dir: &Path) -> Self {
        Self {
            path: output_dir.join(REPORT_FILE),
            entries: Vec::new(),
            failed_this_run: HashSet::new(),
        }
    }

    /// Load the ledger for an output directory; a missing file is an empty ledger
    pub fn load(output_dir: &Path) -> Result<Self, ReportError> {
        let mut store = Self::new(output_dir);

        if !store.path.exists() {
            debug!("No report found at {}", store.path.display());
            return Ok(store);
        }

        let content = std::fs::read_to_string(&store.path)?;
        let raw: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&content)?;

        for (url, value) in raw {
            let entry: ReportEntry = serde_json::from_value(value)?;
            verify_keys(&entry.pre)?;
            if let Some(post) = &entry.post {
                verify_keys(post)?;
            }
            store.entries.push((url, entry));
        }

        debug!(
            "Loaded report with {} entries from {}",
            store.entries.len(),
            store.path.display()
        );
        Ok(store)
    }

    /// Write the whole ledger, replacing the previous file atomically
    pub fn dump(&self) -> Result<(), ReportError> {
        let mut map = serde_json::Map::new();
        for (url, entry) in &self.entries {
            map.insert(url.clone(), serde_json::to_value(entry)?);
        }

        let content = serde_json::to_string_pretty(&serde_json::Value::Object(map))?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let tmp_path = self.path.with_extension("tmp");
        std::fs::write(&tmp_path, content)?;
        std::fs::rename(&tmp_path, &self.path)?;

        debug!(
            "Dumped {} report entries to {}",
            self.entries.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Insert or overwrite the `pre` snapshot for `url`
    ///
    /// Only the two download statuses may be written here. Any existing
    /// `post` snapshot is discarded, since it described a previous download.
    pub fn put_pre(
        &mut self,
        url: &str,
        fields: Fields,
        status: ReportStatus,
    ) -> Result<(), ReportError> {
        if !matches!(
            status,
            ReportStatus::DownloadSuccess | ReportStatus::DownloadFailure
        ) {
            return Err(ReportError::InvalidTransition { status });
        }
        verify_keys(&fields)?;
        self.ensure_not_failed(url)?;

        let entry = ReportEntry {
            pre: fields,
            status,
            post: None,
        };

        match self.position(url) {
            Some(idx) => self.entries[idx].1 = entry,
            None => self.entries.push((url.to_string(), entry)),
        }

        if status == ReportStatus::DownloadFailure {
            self.failed_this_run.insert(url.to_string());
        }
        Ok(())
    }

    /// Attach a `post` snapshot to an existing entry
    pub fn put_post(
        &mut self,
        url: &str,
        fields: Fields,
        status: ReportStatus,
    ) -> Result<(), ReportError> {
        if !status.is_match_outcome() {
            return Err(ReportError::InvalidTransition { status });
        }
        verify_keys(&fields)?;
        let entry = self.writable_entry(url)?;
        entry.post = Some(fields);
        entry.status = status;
        Ok(())
    }

    /// Status-only transition from `DOWNLOAD_SUCCESS` to `METADATA_NOT_FOUND`
    ///
    /// The other match outcomes carry a `post` snapshot and go through
    /// [`ReportStore::put_post`].
    pub fn update_status(&mut self, url: &str, status: ReportStatus) -> Result<(), ReportError> {
        if status != ReportStatus::MetadataNotFound {
            return Err(ReportError::InvalidTransition { status });
        }
        let entry = self.writable_entry(url)?;
        if entry.status != ReportStatus::DownloadSuccess {
            return Err(ReportError::InvalidTransition {
                status: entry.status,
            });
        }
        entry.status = status;
        Ok(())
    }

    /// Record that the downloaded file moved, keeping status and `post`
    pub fn relocate(&mut self, url: &str, new_path: &Path) -> Result<(), ReportError> {
        let entry = self.writable_entry(url)?;
        entry.pre.insert(
            "path".to_string(),
            serde_json::Value::String(new_path.display().to_string()),
        );
        Ok(())
    }

    /// Drop a finalized entry
    pub fn remove(&mut self, url: &str) -> Option<ReportEntry> {
        let idx = self.position(url)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn get(&self, url: &str) -> Option<&ReportEntry> {
        self.position(url).map(|idx| &self.entries[idx].1)
    }

    pub fn contains(&self, url: &str) -> bool {
        self.position(url).is_some()
    }

    /// Entries in ledger insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ReportEntry)> {
        self.entries.iter().map(|(url, entry)| (url.as_str(), entry))
    }

    /// URLs in ledger insertion order
    pub fn urls(&self) -> Vec<String> {
        self.entries.iter().map(|(url, _)| url.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Count of entries per status, in status order
    pub fn status_counts(&self) -> Vec<(ReportStatus, usize)> {
        ReportStatus::ALL
            .into_iter()
            .map(|status| {
                let count = self.entries.iter().filter(|(_, e)| e.status == status).count();
                (status, count)
            })
            .collect()
    }

    /// Wrap the store so it is dumped however the holder exits
    pub fn guard(&mut self) -> DumpGuard<'_> {
        DumpGuard {
            store: self,
            armed: true,
        }
    }

    fn position(&self, url: &str) -> Option<usize> {
        self.entries.iter().position(|(u, _)| u == url)
    }

    fn ensure_not_failed(&self, url: &str) -> Result<(), ReportError> {
        if self.failed_this_run.contains(url) {
            return Err(ReportError::TerminalStatus {
                url: url.to_string(),
                status: ReportStatus::DownloadFailure,
            });
        }
        Ok(())
    }

    fn writable_entry(&mut self, url: &str) -> Result<&mut ReportEntry, ReportError> {
        let idx = self.position(url).ok_or_else(|| ReportError::MissingEntry {
            url: url.to_string(),
        })?;
        let entry = &mut self.entries[idx].1;
        if entry.status == ReportStatus::DownloadFailure {
            return Err(ReportError::TerminalStatus {
                url: url.to_string(),
                status: entry.status,
            });
        }
        Ok(entry)
    }
}

/// Scoped access to a [`ReportStore`] that dumps it when dropped
///
/// Use [`DumpGuard::finish`] on the normal path to observe dump errors; the
/// drop path can only log them.
pub struct DumpGuard<'a> {
    store: &'a mut ReportStore,
    armed: bool,
}

impl DumpGuard<'_> {
    pub fn finish(mut self) -> Result<(), ReportError> {
        self.armed = false;
        self.store.dump()
    }
}

impl Deref for DumpGuard<'_> {
    type Target = ReportStore;

    fn deref(&self) -> &ReportStore {
        self.store
    }
}

impl DerefMut for DumpGuard<'_> {
    fn deref_mut(&mut self) -> &mut ReportStore {
        self.store
    }
}

impl Drop for DumpGuard<'_> {
    fn drop(&mut self) {
        if self.armed
            && let Err(e) = self.store.dump()
        {
            warn!("Failed to dump report to {}: {}", self.store.path.display(), e);
        }
    }
}
