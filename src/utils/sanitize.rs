//! File name construction for tagged tracks

/// Make a name component safe for any filesystem
///
/// Unsafe characters become visually similar Unicode characters so the name
/// still reads the same in a file browser.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' => '⧸',  // U+29F8 Big Solidus
            '\\' => '⧹', // U+29F9 Big Reverse Solidus
            ':' => '꞉',  // U+A789 Modifier Letter Colon
            '*' => '⁎',  // U+204E Low Asterisk
            '?' => '？', // U+FF1F Fullwidth Question Mark
            '"' => '″',  // U+2033 Double Prime
            '<' => '‹',
            '>' => '›',
            '|' => '｜',
            '\0' => '_',
            _ => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// `<artist>_<album>_<NN>_<title>.<ext>` with every component sanitized
pub fn track_file_name(artist: &str, album: &str, track_num: u32, title: &str, ext: &str) -> String {
    let ext = ext.trim_start_matches('.');
    format!(
        "{}_{}_{:02}_{}.{}",
        sanitize_filename(artist),
        sanitize_filename(album),
        track_num,
        sanitize_filename(title),
        ext
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_separators() {
        assert_eq!(sanitize_filename("AC/DC"), "AC⧸DC");
        assert_eq!(sanitize_filename("Re: Stacks"), "Re꞉ Stacks");
        assert_eq!(sanitize_filename("Why?  "), "Why？");
    }

    #[test]
    fn test_track_file_name() {
        assert_eq!(
            track_file_name("The Weeknd", "After Hours", 9, "Blinding Lights", "opus"),
            "The Weeknd_After Hours_09_Blinding Lights.opus"
        );
        assert_eq!(
            track_file_name("AC/DC", "Back in Black", 12, "Rock and Roll Ain't Noise Pollution", ".mp3"),
            "AC⧸DC_Back in Black_12_Rock and Roll Ain't Noise Pollution.mp3"
        );
    }
}
