//! Wire types for the catalog lookup API.

use crate::subject::SubjectKind;
use serde::Deserialize;
use std::collections::HashMap;

/// One catalog item exactly as the lookup API returns it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCatalogItem {
    pub id: String,
    pub snippet: RawSnippet,
    pub content_details: RawContentDetails,
    #[serde(default)]
    pub statistics: RawStatistics,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSnippet {
    pub title: String,
    #[serde(default)]
    pub channel_id: String,
    #[serde(default)]
    pub channel_title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub thumbnails: HashMap<String, RawThumbnail>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawThumbnail {
    pub url: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawContentDetails {
    /// ISO 8601 duration, e.g. "PT4M13S".
    #[serde(default)]
    pub duration: String,
}

/// View / like counters, returned by the API as decimal strings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStatistics {
    #[serde(default)]
    pub view_count: Option<String>,
    #[serde(default)]
    pub like_count: Option<String>,
    #[serde(default)]
    pub dislike_count: Option<String>,
}

/// Summary of the subject itself, resolved before any items stream in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogAbout {
    pub kind: SubjectKind,
    /// Canonical id, which may differ from what the user pasted.
    pub id: String,
    pub title: String,
    pub channel_title: String,
    /// How many items the subject is expected to yield. Always 1 for a
    /// single video.
    pub item_count: u64,
}

/// Raw cover art bytes with their sniffed mime type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverArt {
    pub mime: String,
    pub bytes: Vec<u8>,
}
