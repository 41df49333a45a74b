//! Appends finalized tracks to local m3u playlists

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::PlaylistSpec;
use crate::utils::{M3U_HEADER, m3u_entry, m3u_path, sanitize_filename};

/// Writes `<output>/<playlist name>.m3u` files
#[derive(Debug, Clone)]
pub struct PlaylistWriter {
    output_dir: PathBuf,
}

impl PlaylistWriter {
    pub fn new(output_dir: &Path) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
        }
    }

    pub fn playlist_path(&self, name: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}.m3u", sanitize_filename(name)))
    }

    /// Append raw entry text, creating the file with its header if needed
    pub fn append(&self, name: &str, entry: &str) -> Result<PathBuf> {
        let path = self.playlist_path(name);
        let is_new = !path.exists();

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open playlist {:?}", path))?;

        if is_new {
            file.write_all(M3U_HEADER.as_bytes())
                .with_context(|| format!("Failed to write playlist header to {:?}", path))?;
        }
        file.write_all(entry.as_bytes())
            .with_context(|| format!("Failed to append to playlist {:?}", path))?;

        debug!("Appended to playlist {}", path.display());
        Ok(path)
    }

    /// Append one track to every listed playlist
    ///
    /// Playlists that already list `file` are skipped.
    pub fn append_track(
        &self,
        playlists: &[PlaylistSpec],
        duration_seconds: u64,
        artist: &str,
        title: &str,
        file: &Path,
    ) -> Result<()> {
        let entry = m3u_entry(duration_seconds, artist, title, file);
        let file_line = m3u_path(file);
        for playlist in playlists {
            if self.lists_file(playlist.name(), &file_line)? {
                debug!("{} already lists {}", playlist.name(), file_line);
                continue;
            }
            self.append(playlist.name(), &entry)?;
        }
        Ok(())
    }

    fn lists_file(&self, name: &str, file_line: &str) -> Result<bool> {
        let path = self.playlist_path(name);
        if !path.exists() {
            return Ok(false);
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read playlist {:?}", path))?;
        Ok(content.lines().any(|line| line == file_line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_header_written_once() {
        let dir = TempDir::new().unwrap();
        let writer = PlaylistWriter::new(dir.path());
        let playlists = vec![PlaylistSpec::new("https://youtube.com/playlist?list=x", "Road Trip")];

        writer
            .append_track(&playlists, 200, "The Weeknd", "Blinding Lights", Path::new("/m/a.opus"))
            .unwrap();
        writer
            .append_track(&playlists, 185, "Daft Punk", "One More Time", Path::new("/m/b.opus"))
            .unwrap();

        let content = std::fs::read_to_string(dir.path().join("Road Trip.m3u")).unwrap();
        assert_eq!(
            content,
            "#EXTM3U\n\
             #EXTINF:200,The Weeknd - Blinding Lights\na.opus\n\
             #EXTINF:185,Daft Punk - One More Time\nb.opus\n"
        );
    }

    #[test]
    fn test_listed_file_not_appended_again() {
        let dir = TempDir::new().unwrap();
        let writer = PlaylistWriter::new(dir.path());
        let playlists = vec![PlaylistSpec::new("p1", "Chill")];
        let file = Path::new("/m/Kavinsky_Nightcall_01_Nightcall.opus");

        writer.append_track(&playlists, 258, "Kavinsky", "Nightcall", file).unwrap();
        writer.append_track(&playlists, 258, "Kavinsky", "Nightcall", file).unwrap();

        let content = std::fs::read_to_string(dir.path().join("Chill.m3u")).unwrap();
        assert_eq!(content.matches("#EXTINF").count(), 1);
    }

    #[test]
    fn test_every_playlist_gets_entry() {
        let dir = TempDir::new().unwrap();
        let writer = PlaylistWriter::new(dir.path());
        let playlists = vec![
            PlaylistSpec::new("p1", "Chill"),
            PlaylistSpec::new("p2", "Focus/Work"),
        ];

        writer
            .append_track(&playlists, 1, "a", "t", Path::new("x.opus"))
            .unwrap();

        assert!(dir.path().join("Chill.m3u").exists());
        assert!(writer.playlist_path("Focus/Work").exists());
    }
}
