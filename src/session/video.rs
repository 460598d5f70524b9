//! Normalized media records and the raw-to-record normalizer.

use crate::catalog::{CoverArt, RawCatalogItem, RawThumbnail};
use crate::codec::Codec;
use crate::duration;
use crate::tagging;
use thiserror::Error;
use uuid::Uuid;

/// Thumbnail variants eligible as cover art. `maxres` is not among them.
const ALLOWED_THUMBNAILS: [&str; 4] = ["standard", "high", "medium", "default"];

/// Why a raw item could not become a record. The message is shown to users
/// as-is, so it names the offending title.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("\"{title}\" has no usable thumbnail")]
    NoThumbnail { title: String },
    #[error("\"{title}\" has an unreadable duration ({raw})")]
    BadDuration { title: String, raw: String },
}

/// Details carried over from the catalog, already display-ready.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoDetails {
    /// Catalog id of the source video.
    pub video_id: String,
    pub title: String,
    pub channel_id: String,
    pub channel_title: String,
    pub description: String,
    /// Clock-style duration, e.g. "4:13".
    pub duration: String,
    /// URL of the chosen thumbnail.
    pub thumbnail: String,
    /// View/like/dislike counters. Missing or unparsable counts read as 0.
    pub views: u64,
    pub likes: u64,
    pub dislikes: u64,
}

/// Editable rip metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoTags {
    pub artist: String,
    pub song: String,
    pub cover: Option<CoverArt>,
}

/// One normalized, rippable record.
#[derive(Debug, Clone, PartialEq)]
pub struct Video {
    /// Session-local identity. Two inspections of the same catalog item
    /// produce different uuids.
    pub uuid: Uuid,
    pub details: VideoDetails,
    pub tags: VideoTags,
    pub format: Codec,
    pub selected: bool,
    /// Completion percentage of an active download, `None` when idle.
    pub progress: Option<u8>,
    /// Set from download start until the post-completion reset. A locked
    /// record rejects edits.
    pub locked: bool,
}

/// Turns a raw catalog item into a record, or reports why it cannot be one.
///
/// Artist and song are guessed from the title; when that fails the channel
/// becomes the artist and the full title the song.
pub fn normalize(raw: &RawCatalogItem, format: Codec) -> Result<Video, NormalizeError> {
    let title = raw.snippet.title.clone();
    let thumbnail = pick_thumbnail(raw).ok_or_else(|| NormalizeError::NoThumbnail {
        title: title.clone(),
    })?;
    let duration =
        duration::humanize(&raw.content_details.duration).ok_or_else(|| {
            NormalizeError::BadDuration {
                title: title.clone(),
                raw: raw.content_details.duration.clone(),
            }
        })?;
    let (artist, song) = tagging::split_artist_title(&title)
        .unwrap_or_else(|| (raw.snippet.channel_title.clone(), title.clone()));

    Ok(Video {
        uuid: Uuid::new_v4(),
        details: VideoDetails {
            video_id: raw.id.clone(),
            title,
            channel_id: raw.snippet.channel_id.clone(),
            channel_title: raw.snippet.channel_title.clone(),
            description: raw.snippet.description.clone(),
            duration,
            thumbnail,
            views: parse_stat(raw.statistics.view_count.as_deref()),
            likes: parse_stat(raw.statistics.like_count.as_deref()),
            dislikes: parse_stat(raw.statistics.dislike_count.as_deref()),
        },
        tags: VideoTags {
            artist,
            song,
            cover: None,
        },
        format,
        selected: false,
        progress: None,
        locked: false,
    })
}

/// Picks the widest thumbnail among the eligible variants. Declared widths
/// break ties in favor of the first eligible name.
fn pick_thumbnail(raw: &RawCatalogItem) -> Option<String> {
    let mut best: Option<&RawThumbnail> = None;
    for name in ALLOWED_THUMBNAILS {
        if let Some(thumbnail) = raw.snippet.thumbnails.get(name) {
            if thumbnail.url.is_empty() {
                continue;
            }
            let better = match best {
                Some(current) => thumbnail.width > current.width,
                None => true,
            };
            if better {
                best = Some(thumbnail);
            }
        }
    }
    best.map(|thumbnail| thumbnail.url.clone())
}

fn parse_stat(raw: Option<&str>) -> u64 {
    raw.and_then(|s| s.trim().parse().ok()).unwrap_or(0)
}
