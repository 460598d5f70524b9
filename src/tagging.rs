//! Artist / song guessing from catalog titles.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // A dash, pipe or colon flanked by whitespace, or a double hyphen.
    static ref TITLE_SEPARATOR: Regex = Regex::new(r"\s+[-\u{2013}\u{2014}|:]\s+|\s*--\s+").unwrap();
}

/// Splits a catalog title of the form "Artist - Song" into its parts.
///
/// Returns `None` when no separator is found or one side is blank, leaving
/// the caller to fall back to channel metadata.
pub fn split_artist_title(title: &str) -> Option<(String, String)> {
    let separator = TITLE_SEPARATOR.find(title)?;
    let artist = clean(&title[..separator.start()]);
    let song = clean(&title[separator.end()..]);
    if artist.is_empty() || song.is_empty() {
        return None;
    }
    Some((artist, song))
}

/// Strips outer whitespace and one layer of wrapping quotes.
fn clean(part: &str) -> String {
    let trimmed = part.trim();
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| trimmed.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))
        .or_else(|| {
            trimmed
                .strip_prefix('\u{201c}')
                .and_then(|s| s.strip_suffix('\u{201d}'))
        })
        .unwrap_or(trimmed);
    unquoted.trim().to_string()
}

/// Tag overrides applied on top of a record's own tags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagPatch {
    pub artist: Option<String>,
    pub song: Option<String>,
}

impl TagPatch {
    pub fn artist(value: impl Into<String>) -> Self {
        Self {
            artist: Some(value.into()),
            song: None,
        }
    }

    pub fn song(value: impl Into<String>) -> Self {
        Self {
            artist: None,
            song: Some(value.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.artist.is_none() && self.song.is_none()
    }
}
