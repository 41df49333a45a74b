//! yt-dlp process adapter

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

use super::{Extractor, FetchError, FetchOutcome, FetchResult, FlatPlaylist, Fetcher, TrackInfo};
use crate::config::Config;
use crate::playlist::{Provider, TrackReference};
use crate::utils::cover_art;

/// Largest square size requested when upgrading a YouTube thumbnail
const REQUEST_RESOLUTION: u32 = 1200;

/// Size marker of the small thumbnails listed for YouTube playlist entries
const SMALL_THUMBNAIL_MARKER: &str = "w120-h120";

/// File extensions yt-dlp leaves behind after interrupted or finished downloads
const ARTIFACT_EXTENSIONS: &[&str] = &["part", "ytdl", "webp"];

/// Field separator in the after-move print template
const PRINT_SEPARATOR: char = '\t';

/// Metadata fields cleared before embedding, plus title quote/dot trimming
const PARSE_METADATA_RULES: &[&str] = &[
    ":(?P<meta_synopsis>)",
    ":(?P<meta_description>)",
    ":(?P<meta_purl>)",
    ":(?P<meta_comment>)",
    r#"title:^(“|")(?P<title>[^“”"]+)(“|”|")$|"#,
    r"title:^(?P<title>.+[^0-9])\.$|",
];

/// Runs the `yt-dlp` executable for extraction and downloads
pub struct YtDlp {
    binary: String,
    output_dir: PathBuf,
    download_sleep: u64,
    request_sleep: u64,
    verbose: bool,
    http: reqwest::Client,
}

impl YtDlp {
    pub fn new(config: &Config, http: reqwest::Client) -> Self {
        Self {
            binary: config.ytdlp_path.clone(),
            output_dir: config.output_dir.clone(),
            download_sleep: config.download_sleep,
            request_sleep: config.request_sleep,
            verbose: config.verbose,
            http,
        }
    }

    fn archive_path(&self) -> PathBuf {
        self.output_dir.join("archive")
    }

    async fn run(&self, args: &[String]) -> Result<Output, FetchError> {
        debug!("Running {} {}", self.binary, args.join(" "));
        let output = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;
        Ok(output)
    }

    fn common_args(&self) -> Vec<String> {
        let mut args = vec!["--no-warnings".to_string()];
        if self.verbose {
            args.push("--verbose".to_string());
        }
        if self.request_sleep > 0 {
            args.push("--sleep-requests".to_string());
            args.push(self.request_sleep.to_string());
        }
        args
    }

    fn download_args(&self, url: &str) -> Vec<String> {
        let mut args = self.common_args();
        args.extend(
            [
                "--format",
                "bestaudio/best",
                "--extract-audio",
                "--audio-format",
                "opus",
                "--audio-quality",
                "0",
                "--embed-metadata",
                "--embed-thumbnail",
                "--no-playlist",
                "--abort-on-unavailable-fragments",
                "--no-progress",
                "--no-simulate",
                "--output",
                "%(title)s.%(ext)s",
            ]
            .map(String::from),
        );
        for rule in PARSE_METADATA_RULES {
            args.push("--parse-metadata".to_string());
            args.push(rule.to_string());
        }
        args.push("--paths".to_string());
        args.push(self.output_dir.display().to_string());
        args.push("--download-archive".to_string());
        args.push(self.archive_path().display().to_string());
        if self.download_sleep > 0 {
            args.push("--sleep-interval".to_string());
            args.push("0".to_string());
            args.push("--max-sleep-interval".to_string());
            args.push(self.download_sleep.to_string());
        }
        args.push("--print".to_string());
        args.push(format!(
            "after_move:%(duration)s{}%(filepath)s",
            PRINT_SEPARATOR
        ));
        args.push(url.to_string());
        args
    }

    /// Best known cover for a track: upgraded YouTube size, or the listed one
    async fn resolve_thumbnail(&self, track: &TrackReference) -> Option<String> {
        let listed = track.thumbnail_url.as_deref()?;
        if track.provider == Provider::Youtube
            && let Some(upgraded) = upgrade_thumbnail_url(&self.http, listed, REQUEST_RESOLUTION).await
        {
            return Some(upgraded);
        }
        Some(listed.to_string())
    }
}

#[async_trait]
impl Extractor for YtDlp {
    async fn extract_flat(&self, url: &str) -> Result<FlatPlaylist, FetchError> {
        let mut args = self.common_args();
        args.extend(["--flat-playlist", "--dump-single-json"].map(String::from));
        args.push(url.to_string());

        let output = self.run(&args).await?;
        if !output.status.success() {
            return Err(FetchError::Extract {
                url: url.to_string(),
                message: stderr_summary(&output),
            });
        }
        Ok(serde_json::from_slice(&output.stdout)?)
    }

    async fn extract_track(&self, url: &str) -> Result<TrackInfo, FetchError> {
        let mut args = self.common_args();
        args.extend(["--dump-single-json", "--skip-download", "--no-playlist"].map(String::from));
        args.push(url.to_string());

        let output = self.run(&args).await?;
        if !output.status.success() {
            return Err(FetchError::Extract {
                url: url.to_string(),
                message: stderr_summary(&output),
            });
        }
        Ok(serde_json::from_slice(&output.stdout)?)
    }
}

#[async_trait]
impl Fetcher for YtDlp {
    async fn fetch(&self, track: &TrackReference) -> Result<FetchOutcome, FetchError> {
        let output = self.run(&self.download_args(&track.url)).await?;
        if !output.status.success() {
            return Err(FetchError::Download {
                url: track.url.clone(),
                message: stderr_summary(&output),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let Some((duration, local_path)) = parse_after_move(&stdout) else {
            return Ok(FetchOutcome::Archived);
        };

        let extension = local_path
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_default();

        let embedded_path = local_path.clone();
        let embedded = tokio::task::spawn_blocking(move || {
            cover_art::embedded_cover_dimensions(&embedded_path)
        })
        .await
        .ok()
        .and_then(|r| r.ok());

        let thumbnail_url = self.resolve_thumbnail(track).await;
        let (thumbnail_width, thumbnail_height) = match embedded {
            Some((w, h)) => (Some(w), Some(h)),
            None => (None, None),
        };

        Ok(FetchOutcome::Downloaded(FetchResult {
            local_path,
            extension,
            duration_seconds: duration,
            thumbnail_url,
            thumbnail_width,
            thumbnail_height,
            genres: track.genres.clone(),
        }))
    }
}

/// Parse the `duration<TAB>filepath` line printed after the file is moved
///
/// `None` means yt-dlp printed nothing, which happens when the URL is in the
/// download archive.
fn parse_after_move(stdout: &str) -> Option<(u64, PathBuf)> {
    let line = stdout.lines().rev().find(|l| l.contains(PRINT_SEPARATOR))?;
    let (duration, path) = line.split_once(PRINT_SEPARATOR)?;
    let path = path.trim();
    if path.is_empty() {
        return None;
    }
    let duration = duration.trim().parse::<f64>().map(|d| d.round() as u64).unwrap_or(0);
    Some((duration, PathBuf::from(path)))
}

/// Last `ERROR:` line of stderr, or its last non-empty line
fn stderr_summary(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    stderr
        .lines()
        .rev()
        .find(|l| l.starts_with("ERROR"))
        .or_else(|| stderr.lines().rev().find(|l| !l.trim().is_empty()))
        .map(|l| l.trim().to_string())
        .unwrap_or_else(|| format!("yt-dlp exited with {}", output.status))
}

/// Swap a small YouTube thumbnail size for the largest one the CDN serves
///
/// Tries `start`, then steps down by 100 pixels until a HEAD request returns
/// 200. Returns `None` when the URL has no size marker or nothing larger
/// exists.
pub async fn upgrade_thumbnail_url(
    client: &reqwest::Client,
    url: &str,
    start: u32,
) -> Option<String> {
    if !url.contains(SMALL_THUMBNAIL_MARKER) {
        return None;
    }

    let mut size = start;
    while size > 120 {
        let candidate = url.replace(SMALL_THUMBNAIL_MARKER, &format!("w{}-h{}", size, size));
        match client
            .head(&candidate)
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(resp) if resp.status() == reqwest::StatusCode::OK => {
                debug!("Upgraded thumbnail to {}x{}", size, size);
                return Some(candidate);
            }
            Ok(_) => {}
            Err(e) => debug!("Thumbnail check for {} failed: {}", candidate, e),
        }
        size -= 100;
    }
    None
}

/// Remove leftover yt-dlp artifacts from the output directory
pub fn clean_ytdlp_artifacts(dir: &Path) -> std::io::Result<usize> {
    let mut removed = 0;
    if !dir.exists() {
        return Ok(removed);
    }

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let is_artifact = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| ARTIFACT_EXTENSIONS.contains(&e));
        if is_artifact {
            match std::fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
            }
        }
    }

    debug!("Removed {} yt-dlp artifacts from {}", removed, dir.display());
    Ok(removed)
}
