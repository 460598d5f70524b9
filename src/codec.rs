//! Output formats the ripper service can produce.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Target format for a ripped file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    #[default]
    Mp3,
    Aac,
    Vorbis,
    Opus,
    Mp4,
    Webm,
}

impl Codec {
    /// Encoder name the ripper service expects for this format.
    pub fn encoder(&self) -> &'static str {
        match self {
            Codec::Mp3 => "libmp3lame",
            Codec::Aac => "aac",
            Codec::Vorbis => "libvorbis",
            Codec::Opus => "libopus",
            Codec::Mp4 => "libx264",
            Codec::Webm => "libvpx",
        }
    }

    /// File extension for this format, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Codec::Mp3 => "mp3",
            Codec::Aac => "aac",
            Codec::Vorbis => "ogg",
            Codec::Opus => "opus",
            Codec::Mp4 => "mp4",
            Codec::Webm => "webm",
        }
    }

    /// True for formats that keep the video track.
    pub fn is_video(&self) -> bool {
        matches!(self, Codec::Mp4 | Codec::Webm)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Codec::Mp3 => "mp3",
            Codec::Aac => "aac",
            Codec::Vorbis => "vorbis",
            Codec::Opus => "opus",
            Codec::Mp4 => "mp4",
            Codec::Webm => "webm",
        }
    }

    pub fn from_str(s: &str) -> Option<Codec> {
        match s.to_lowercase().as_str() {
            "mp3" => Some(Codec::Mp3),
            "aac" => Some(Codec::Aac),
            "vorbis" => Some(Codec::Vorbis),
            "opus" => Some(Codec::Opus),
            "mp4" => Some(Codec::Mp4),
            "webm" => Some(Codec::Webm),
            _ => None,
        }
    }
}
