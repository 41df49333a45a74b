//! Artist and title extraction from video titles

/// Words that mark a bracketed segment as noise, e.g. `(Official Video)`
const NOISE_KEYWORDS: &[&str] = &[
    "official",
    "video",
    "audio",
    "lyric",
    "lyrics",
    "visualizer",
    "visualiser",
    "music video",
    "hd",
    "hq",
    "4k",
    "mv",
    "m/v",
    "explicit",
    "clean",
    "feat",
    "feat.",
    "ft",
    "ft.",
    "prod",
    "prod.",
];

/// Artist/title separators in order of preference
const SEPARATORS: &[&str] = &[" - ", " – ", " — ", " -- ", " ~ ", " | ", " : "];

/// Uploader suffixes that are not part of the artist name
const UPLOADER_SUFFIXES: &[&str] = &[" - Topic", "VEVO", " Official"];

/// Split a video title into `(artist, title)`
///
/// Noise segments are removed first. Without a separator, the cleaned
/// uploader stands in for the artist. A side is `None` when it ends up empty.
pub fn parse_youtube_title(raw_title: &str, uploader: &str) -> (Option<String>, Option<String>) {
    let cleaned = strip_noise(raw_title);

    let (artist, title) = match split_artist_title(&cleaned) {
        Some((artist, title)) => (artist.to_string(), title.to_string()),
        None => (clean_uploader(uploader), cleaned.clone()),
    };

    (non_empty(strip_quotes(&artist)), non_empty(strip_quotes(&title)))
}

/// Remove a channel suffix such as ` - Topic` or `VEVO`
pub fn clean_uploader(uploader: &str) -> String {
    let mut name = uploader.trim();
    for suffix in UPLOADER_SUFFIXES {
        if let Some(stripped) = name.strip_suffix(suffix) {
            name = stripped.trim_end();
        }
    }
    name.to_string()
}

fn split_artist_title(title: &str) -> Option<(&str, &str)> {
    SEPARATORS.iter().find_map(|sep| {
        let (artist, rest) = title.split_once(sep)?;
        let (artist, rest) = (artist.trim(), rest.trim());
        (!artist.is_empty() && !rest.is_empty()).then_some((artist, rest))
    })
}

/// Drop bracketed segments that only describe the upload
fn strip_noise(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut rest = title;

    while let Some(open_idx) = rest.find(['(', '[']) {
        let close = if rest[open_idx..].starts_with('(') { ')' } else { ']' };
        let Some(close_rel) = rest[open_idx..].find(close) else {
            break;
        };
        let close_idx = open_idx + close_rel;
        let inner = &rest[open_idx + 1..close_idx];

        out.push_str(&rest[..open_idx]);
        if !is_noise(inner) {
            out.push_str(&rest[open_idx..=close_idx]);
        }
        rest = &rest[close_idx + 1..];
    }
    out.push_str(rest);

    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_noise(segment: &str) -> bool {
    let lowered = segment.to_lowercase();
    lowered
        .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .any(|word| NOISE_KEYWORDS.contains(&word))
}

fn strip_quotes(value: &str) -> String {
    value
        .trim()
        .trim_matches(|c| matches!(c, '"' | '“' | '”' | '\''))
        .trim()
        .to_string()
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}
