//! Catalog lookup: resolving a subject and streaming its raw items.

mod http_client;
mod types;

pub use http_client::HttpCatalogClient;
pub use types::{
    CatalogAbout, CoverArt, RawCatalogItem, RawContentDetails, RawSnippet, RawStatistics,
    RawThumbnail,
};

use crate::subject::Subject;
use anyhow::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Stream of raw catalog items. A failed element surfaces as `Err` without
/// invalidating items that already arrived; the stream ends after the first
/// `Err` since pagination cannot continue past it.
pub type RawItemStream = BoxStream<'static, Result<RawCatalogItem>>;

/// Client for the catalog lookup service.
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// One-time connectivity check at startup.
    async fn init(&self) -> Result<()> {
        Ok(())
    }

    /// Resolves the subject itself: display title, channel and item count.
    async fn about(&self, subject: &Subject) -> Result<CatalogAbout>;

    /// Opens the item stream for a subject. A single video yields exactly
    /// one element.
    async fn items(&self, subject: &Subject) -> Result<RawItemStream>;

    /// Fetches cover art, validating that the payload is an image.
    async fn fetch_cover(&self, url: &str) -> Result<CoverArt>;
}
