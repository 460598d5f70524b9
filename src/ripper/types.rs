//! Types for talking to the ripper service.

use crate::catalog::CoverArt;
use crate::codec::Codec;
use serde::Deserialize;

/// A single rip job handed to the ripper service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RipRequest {
    /// Catalog id of the source video.
    pub video_id: String,
    pub codec: Codec,
    pub artist: String,
    pub song: String,
    pub cover: Option<CoverArt>,
}

/// A finished file produced by the ripper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RippedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Messages surfaced by an active rip job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RipMessage {
    /// Completion percentage, 0 to 100.
    Progress(u8),
    /// Terminal message carrying the produced file.
    Done(RippedFile),
}

/// Text frames the ripper sends over the socket. The `done` frame announces
/// the file name; the file bytes follow in a single binary frame.
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub(crate) enum RipFrame {
    Progress { data: i64 },
    Done { name: String },
}

/// Decodes a text frame. Anything malformed, including progress values
/// outside 0..=100, yields `None` and is dropped by the caller.
pub(crate) fn parse_frame(text: &str) -> Option<RipFrame> {
    match serde_json::from_str::<RipFrame>(text) {
        Ok(RipFrame::Progress { data }) if !(0..=100).contains(&data) => None,
        Ok(frame) => Some(frame),
        Err(_) => None,
    }
}
