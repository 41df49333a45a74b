//! Download and match orchestration
//!
//! One run resolves the source playlists, then walks every track in order:
//! download, record the `pre` snapshot, query the catalog, record the outcome.
//! Tracks are processed strictly one after another. The ledger is held through
//! a [`DumpGuard`](crate::report::DumpGuard) for the whole run, so it reaches
//! disk on normal completion, on error, and when the shutdown future fires.
//!
//! Auto-accepted matches are finalized after the walk, outside the part of the
//! run that shutdown can cancel. An interrupted run leaves them for review.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashSet;
use std::future::Future;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::fetch::{DownloadOutcome, Downloader, Extractor, FetchResult, Fetcher, clean_ytdlp_artifacts};
use crate::finalize::Finalizer;
use crate::matcher::Matcher;
use crate::musicbrainz::Catalog;
use crate::playlist::{PlaylistIndex, PlaylistResolver, PlaylistWriter, TrackReference};
use crate::report::{PreSearch, ReportStatus, ReportStore, Snapshot};
use crate::tagging::{TagApplier, TrackMetadata};

/// Settings for a pipeline run
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub output_dir: PathBuf,
    /// Finalize complete matches without review
    pub auto_accept: bool,
    pub show_progress: bool,
}

impl PipelineOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            output_dir: config.output_dir.clone(),
            auto_accept: config.auto_accept,
            show_progress: !config.quiet,
        }
    }
}

/// Counts for one run
#[derive(Debug, Default)]
pub struct PipelineResult {
    pub playlists: usize,
    pub tracks_seen: usize,
    pub downloaded: usize,
    pub archived: usize,
    pub failed: usize,
    pub albums: usize,
    pub singles: usize,
    pub not_found: usize,
    pub finalized: usize,
    pub warnings: Vec<String>,
    /// The shutdown future fired before the run finished
    pub interrupted: bool,
}

/// Complete match queued for finalizing once the walk is done
struct Accepted {
    url: String,
    metadata: TrackMetadata,
}

pub struct Pipeline<'a, E: ?Sized, F, C, T: ?Sized> {
    extractor: &'a E,
    downloader: Downloader<F>,
    matcher: Matcher<C>,
    tagger: &'a T,
    writer: PlaylistWriter,
    options: PipelineOptions,
}

impl<'a, E, F, C, T> Pipeline<'a, E, F, C, T>
where
    E: Extractor + ?Sized,
    F: Fetcher,
    C: Catalog,
    T: TagApplier + ?Sized,
{
    pub fn new(
        extractor: &'a E,
        downloader: Downloader<F>,
        matcher: Matcher<C>,
        tagger: &'a T,
        options: PipelineOptions,
    ) -> Self {
        Self {
            writer: PlaylistWriter::new(&options.output_dir),
            extractor,
            downloader,
            matcher,
            tagger,
            options,
        }
    }

    pub fn downloader(&self) -> &Downloader<F> {
        &self.downloader
    }

    /// Run once over `urls`, stopping early if `shutdown` completes
    ///
    /// Returns an error only for failures that abort the whole run: an
    /// unreachable source playlist or a ledger that cannot be written.
    pub async fn run<S>(
        &self,
        urls: &[String],
        report: &mut ReportStore,
        shutdown: S,
    ) -> Result<PipelineResult>
    where
        S: Future<Output = ()>,
    {
        let mut result = PipelineResult::default();
        let mut accepted = Vec::new();
        let mut guard = report.guard();

        let finished = tokio::select! {
            res = self.run_inner(urls, &mut guard, &mut result, &mut accepted) => Some(res),
            _ = shutdown => None,
        };
        let outcome = match finished {
            Some(res) => res,
            None => {
                warn!("Shutdown requested, saving report");
                result.interrupted = true;
                Ok(())
            }
        };

        if outcome.is_ok() && !result.interrupted {
            self.finalize_accepted(&mut guard, accepted, &mut result).await;
        } else if !accepted.is_empty() {
            info!("Leaving {} auto-accepted tracks for review", accepted.len());
        }

        // dump first so a failed run still persists what it committed
        let dumped = guard.finish().context("Failed to save report");
        outcome?;
        dumped?;

        match clean_ytdlp_artifacts(&self.options.output_dir) {
            Ok(0) => {}
            Ok(n) => debug!("Removed {} leftover yt-dlp files", n),
            Err(e) => warn!("Failed to clean yt-dlp leftovers: {}", e),
        }

        Ok(result)
    }

    async fn run_inner(
        &self,
        urls: &[String],
        report: &mut ReportStore,
        result: &mut PipelineResult,
        accepted: &mut Vec<Accepted>,
    ) -> Result<()> {
        let mut resolver = PlaylistResolver::new(self.extractor);
        let index = resolver.resolve(urls).await?;
        result.warnings.extend(resolver.warnings().iter().cloned());
        result.playlists = index.playlists().len();

        info!(
            "Found {} tracks across {} playlists",
            index.track_count(),
            index.playlists().len()
        );

        let progress = self.progress_bar(index.track_count() as u64);
        let mut seen: HashSet<&str> = HashSet::new();

        for track in index.tracks() {
            progress.inc(1);
            if !seen.insert(track.url.as_str()) {
                debug!("{} already processed this run", track.url);
                continue;
            }
            result.tracks_seen += 1;
            progress.set_message(track.title.clone());

            if let Some(track) = self.process_track(track, &index, report, result).await? {
                accepted.push(track);
            }
        }

        progress.finish_and_clear();
        Ok(())
    }

    /// Returns the match when it qualifies for auto-accept
    async fn process_track(
        &self,
        track: &TrackReference,
        index: &PlaylistIndex,
        report: &mut ReportStore,
        result: &mut PipelineResult,
    ) -> Result<Option<Accepted>> {
        let fetched = match self.downloader.download_one(track).await {
            DownloadOutcome::Archived => {
                result.archived += 1;
                return Ok(None);
            }
            DownloadOutcome::Failed(reason) => {
                report.put_pre(
                    &track.url,
                    PreSearch::failed(&track.url).to_fields()?,
                    ReportStatus::DownloadFailure,
                )?;
                result.failed += 1;
                result
                    .warnings
                    .push(format!("Download of {} failed: {}", track.url, reason));
                return Ok(None);
            }
            DownloadOutcome::Downloaded(fetched) => fetched,
        };

        let pre = pre_search(track, fetched, index);
        report.put_pre(&track.url, pre.to_fields()?, ReportStatus::DownloadSuccess)?;
        result.downloaded += 1;

        let uploader = pre.uploader.as_deref().unwrap_or_default();
        let title = pre.title.as_deref().unwrap_or_default();
        let Some(matched) = self.matcher.resolve(title, uploader, track.provider).await else {
            report.update_status(&track.url, ReportStatus::MetadataNotFound)?;
            result.not_found += 1;
            return Ok(None);
        };

        let post = matched.to_post();
        report.put_post(&track.url, post.to_fields()?, matched.status())?;
        match matched.status() {
            ReportStatus::AlbumFound => result.albums += 1,
            _ => result.singles += 1,
        }
        info!(
            "Matched {} -> {} - {} ({})",
            track.title,
            matched.artist,
            matched.title,
            matched.status()
        );

        if !(self.options.auto_accept && post.is_complete()) {
            return Ok(None);
        }
        Ok(Some(Accepted {
            url: track.url.clone(),
            metadata: TrackMetadata::from_post(&post, &pre),
        }))
    }

    async fn finalize_accepted(
        &self,
        report: &mut ReportStore,
        accepted: Vec<Accepted>,
        result: &mut PipelineResult,
    ) {
        let finalizer = Finalizer::new(self.tagger, &self.writer);
        for track in accepted {
            match finalizer.finalize(report, &track.url, &track.metadata).await {
                Ok(_) => result.finalized += 1,
                Err(e) => warn!("Auto-accept of {} failed, left for review: {}", track.url, e),
            }
        }
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.options.show_progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(len);
        if let Ok(style) =
            ProgressStyle::with_template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
        {
            bar.set_style(style.progress_chars("#>-"));
        }
        bar
    }
}

fn pre_search(track: &TrackReference, fetched: FetchResult, index: &PlaylistIndex) -> PreSearch {
    PreSearch {
        url: track.url.clone(),
        title: Some(track.title.clone()),
        uploader: Some(track.uploader.clone()),
        provider: Some(track.provider),
        ext: Some(fetched.extension),
        path: Some(fetched.local_path.display().to_string()),
        duration: Some(fetched.duration_seconds),
        thumbnail_url: fetched.thumbnail_url.or_else(|| track.thumbnail_url.clone()),
        thumbnail_width: fetched.thumbnail_width,
        thumbnail_height: fetched.thumbnail_height,
        genres: fetched.genres.or_else(|| track.genres.clone()),
        playlists: index.membership(&track.url),
    }
}
