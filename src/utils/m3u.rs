//! M3U playlist entries

use std::path::Path;

pub const M3U_HEADER: &str = "#EXTM3U\n";

/// Path written into a playlist for a track file
///
/// Playlists live next to the tracks, so only the file name is used. A name
/// starting with `#` would read as a directive and gets a `./` prefix.
pub fn m3u_path(file: &Path) -> String {
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    if name.starts_with('#') {
        format!("./{}", name)
    } else {
        name
    }
}

/// One `#EXTINF` line plus the path line
pub fn m3u_entry(duration_seconds: u64, artist: &str, title: &str, file: &Path) -> String {
    format!(
        "#EXTINF:{},{} - {}\n{}\n",
        duration_seconds,
        artist,
        title,
        m3u_path(file)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_format() {
        let entry = m3u_entry(
            200,
            "The Weeknd",
            "Blinding Lights",
            Path::new("/music/The Weeknd_After Hours_09_Blinding Lights.opus"),
        );
        assert_eq!(
            entry,
            "#EXTINF:200,The Weeknd - Blinding Lights\nThe Weeknd_After Hours_09_Blinding Lights.opus\n"
        );
    }

    #[test]
    fn test_hash_prefixed_name() {
        assert_eq!(m3u_path(Path::new("/music/#1 Hit.opus")), "./#1 Hit.opus");
        assert_eq!(m3u_path(Path::new("plain.opus")), "plain.opus");
    }
}
