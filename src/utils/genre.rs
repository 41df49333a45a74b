//! Genre name normalization
//!
//! SoundCloud genres are free text. Known genres are mapped onto a fixed
//! canonical spelling; anything unrecognized is kept as the uploader wrote it.

/// Canonical name followed by the lowercase spellings that map onto it
const CANONICAL_GENRES: &[(&str, &[&str])] = &[
    ("Alternative", &["alternative", "alt", "alternative rock", "alt rock"]),
    ("Ambient", &["ambient", "chillout", "chill out"]),
    ("Blues", &["blues"]),
    ("Classical", &["classical", "classic"]),
    ("Country", &["country"]),
    ("Dance", &["dance", "dance & edm", "edm", "dance/edm"]),
    ("Deep House", &["deep house", "deephouse"]),
    ("Disco", &["disco", "nu disco", "nu-disco"]),
    ("Drum & Bass", &["drum & bass", "drum and bass", "drum n bass", "dnb", "d&b"]),
    ("Dubstep", &["dubstep", "dub step"]),
    ("Electronic", &["electronic", "electronica", "electro"]),
    ("Folk", &["folk", "singer-songwriter", "singer songwriter"]),
    ("Hip-Hop", &["hip-hop", "hip hop", "hiphop", "hip-hop & rap", "hip hop & rap"]),
    ("House", &["house"]),
    ("Indie", &["indie", "indie rock", "indie pop"]),
    ("Jazz", &["jazz", "jazz & blues"]),
    ("Lo-Fi", &["lo-fi", "lofi", "lo fi", "lofi hip hop"]),
    ("Metal", &["metal", "heavy metal"]),
    ("Pop", &["pop"]),
    ("Punk", &["punk", "punk rock"]),
    ("R&B", &["r&b", "rnb", "r & b", "r&b & soul", "rhythm and blues"]),
    ("Rap", &["rap"]),
    ("Reggae", &["reggae", "dancehall"]),
    ("Rock", &["rock", "classic rock"]),
    ("Soul", &["soul"]),
    ("Soundtrack", &["soundtrack", "score", "film score"]),
    ("Techno", &["techno"]),
    ("Trance", &["trance"]),
    ("Trap", &["trap"]),
    ("World", &["world", "world music"]),
];

/// Canonical spelling of a single genre, if it is known
pub fn canonical_genre(name: &str) -> Option<&'static str> {
    let lowered = name.trim().to_lowercase();
    CANONICAL_GENRES
        .iter()
        .find(|(canonical, aliases)| {
            canonical.to_lowercase() == lowered || aliases.contains(&lowered.as_str())
        })
        .map(|(canonical, _)| *canonical)
}

/// Normalize a list of raw genre strings
///
/// Entries are split on `,`, `/` and `;`, mapped to canonical names where
/// possible, and deduplicated in first-seen order. Combined aliases such as
/// `dance/edm` are matched before splitting.
pub fn normalize_genres<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();

    for entry in raw {
        let entry = entry.as_ref().trim();
        if entry.is_empty() {
            continue;
        }

        let parts: Vec<&str> = match canonical_genre(entry) {
            Some(_) => vec![entry],
            None => entry.split([',', '/', ';']).collect(),
        };

        for part in parts {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let name = canonical_genre(part)
                .map(str::to_string)
                .unwrap_or_else(|| part.to_string());
            if !out.iter().any(|g| g.eq_ignore_ascii_case(&name)) {
                out.push(name);
            }
        }
    }

    out
}
