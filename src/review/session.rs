//! Operator decisions over pending ledger entries
//!
//! The session walks a snapshot of the ledger's URLs in insertion order. Every
//! action ends the current entry's visit except `Edit`, which hands back a
//! form, and a failed commit, which hands the form back with the error.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use super::form::EditForm;
use crate::finalize::{FinalizeError, Finalizer};
use crate::playlist::PlaylistWriter;
use crate::report::{PreSearch, ReportEntry, ReportError, ReportStatus, ReportStore};
use crate::tagging::{TagApplier, TrackMetadata};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormSource {
    Pre,
    Post,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    AcceptResolved,
    AcceptOriginal,
    Edit(FormSource),
    Skip,
    /// Remove the entry without applying anything
    Drop,
    Quit,
}

impl Action {
    pub fn label(&self) -> &'static str {
        match self {
            Action::AcceptResolved => "accept resolved",
            Action::AcceptOriginal => "accept original",
            Action::Edit(FormSource::Pre) => "edit original",
            Action::Edit(FormSource::Post) => "edit resolved",
            Action::Skip => "skip",
            Action::Drop => "drop entry",
            Action::Quit => "quit",
        }
    }
}

/// What the operator may do with an entry
pub fn allowed_actions(entry: &ReportEntry) -> Vec<Action> {
    if entry.status == ReportStatus::DownloadFailure {
        return vec![Action::Skip, Action::Drop, Action::Quit];
    }

    let mut actions = Vec::new();
    if matches!(entry.status, ReportStatus::Single | ReportStatus::AlbumFound) && entry.post.is_some() {
        actions.push(Action::AcceptResolved);
    }
    actions.push(Action::AcceptOriginal);
    actions.push(Action::Edit(FormSource::Pre));
    if entry.post.is_some() {
        actions.push(Action::Edit(FormSource::Post));
    }
    actions.extend([Action::Skip, Action::Drop, Action::Quit]);
    actions
}

#[derive(Debug)]
pub enum Outcome {
    Finalized(PathBuf),
    Skipped,
    Dropped,
    /// Fill in the form, then call [`ReviewSession::commit`]
    NeedsEdit { form: EditForm, error: Option<String> },
    Quit,
}

#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("no entry left to review")]
    Exhausted,

    #[error("'{action}' is not available for a {status} entry")]
    NotAllowed { action: &'static str, status: ReportStatus },

    #[error(transparent)]
    Report(#[from] ReportError),
}

/// Tally of one session
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ReviewSummary {
    pub finalized: usize,
    pub skipped: usize,
    pub dropped: usize,
    pub remaining: usize,
}

pub struct ReviewSession<'a, T: ?Sized> {
    store: &'a mut ReportStore,
    tagger: &'a T,
    writer: PlaylistWriter,
    queue: Vec<String>,
    position: usize,
    summary: ReviewSummary,
}

impl<'a, T: TagApplier + ?Sized> ReviewSession<'a, T> {
    pub fn new(store: &'a mut ReportStore, tagger: &'a T, output_dir: &Path) -> Self {
        let queue = store.urls();
        Self {
            store,
            tagger,
            writer: PlaylistWriter::new(output_dir),
            queue,
            position: 0,
            summary: ReviewSummary::default(),
        }
    }

    /// Entry under review, skipping URLs no longer in the ledger
    pub fn current(&mut self) -> Option<(&str, &ReportEntry)> {
        while let Some(url) = self.queue.get(self.position) {
            if self.store.contains(url) {
                break;
            }
            self.position += 1;
        }
        let url = self.queue.get(self.position)?;
        let entry = self.store.get(url)?;
        Some((url.as_str(), entry))
    }

    /// 1-based position and total, for display
    pub fn progress(&self) -> (usize, usize) {
        ((self.position + 1).min(self.queue.len()), self.queue.len())
    }

    pub fn summary(&self) -> ReviewSummary {
        ReviewSummary {
            remaining: self.store.len(),
            ..self.summary.clone()
        }
    }

    pub async fn act(&mut self, action: Action) -> Result<Outcome, ReviewError> {
        let (url, entry) = match self.current() {
            Some(current) => current,
            None if action == Action::Quit => {
                self.store.dump()?;
                return Ok(Outcome::Quit);
            }
            None => return Err(ReviewError::Exhausted),
        };
        let url = url.to_string();
        if !allowed_actions(entry).contains(&action) {
            return Err(ReviewError::NotAllowed {
                action: action.label(),
                status: entry.status,
            });
        }
        let pre = entry.pre_search()?;
        let post = entry.post_search()?;

        match action {
            Action::AcceptResolved => {
                let Some(post) = post.filter(|p| p.is_complete()) else {
                    info!("Resolved metadata for {} is incomplete, opening editor", url);
                    let form = match entry.post_search()? {
                        Some(post) => EditForm::from_post(&post, &pre),
                        None => EditForm::from_pre(&pre),
                    };
                    return Ok(Outcome::NeedsEdit { form, error: None });
                };
                let metadata = TrackMetadata::from_post(&post, &pre);
                let form = EditForm::from_post(&post, &pre);
                self.finalize(&url, &metadata, form).await
            }
            Action::AcceptOriginal => {
                let metadata = TrackMetadata::from_pre(&pre);
                self.finalize(&url, &metadata, EditForm::from_pre(&pre)).await
            }
            Action::Edit(source) => Ok(Outcome::NeedsEdit {
                form: edit_form(source, &pre, post.as_ref()),
                error: None,
            }),
            Action::Skip => {
                self.position += 1;
                self.summary.skipped += 1;
                Ok(Outcome::Skipped)
            }
            Action::Drop => {
                self.store.remove(&url);
                self.store.dump()?;
                self.position += 1;
                self.summary.dropped += 1;
                info!("Dropped {} from the report", url);
                Ok(Outcome::Dropped)
            }
            Action::Quit => {
                self.store.dump()?;
                Ok(Outcome::Quit)
            }
        }
    }

    /// Commit metadata from a validated form
    pub async fn commit(&mut self, form: EditForm, metadata: TrackMetadata) -> Result<Outcome, ReviewError> {
        let (url, _) = self.current().ok_or(ReviewError::Exhausted)?;
        let url = url.to_string();
        self.finalize(&url, &metadata, form).await
    }

    async fn finalize(
        &mut self,
        url: &str,
        metadata: &TrackMetadata,
        form: EditForm,
    ) -> Result<Outcome, ReviewError> {
        let finalizer = Finalizer::new(self.tagger, &self.writer);
        match finalizer.finalize(self.store, url, metadata).await {
            Ok(path) => {
                self.position += 1;
                self.summary.finalized += 1;
                Ok(Outcome::Finalized(path))
            }
            Err(FinalizeError::Report(e)) => Err(e.into()),
            Err(e) => {
                warn!("Could not finalize {}: {}", url, e);
                Ok(Outcome::NeedsEdit {
                    form,
                    error: Some(e.to_string()),
                })
            }
        }
    }
}

fn edit_form(source: FormSource, pre: &PreSearch, post: Option<&crate::report::PostSearch>) -> EditForm {
    match (source, post) {
        (FormSource::Post, Some(post)) => EditForm::from_post(post, pre),
        _ => EditForm::from_pre(pre),
    }
}
