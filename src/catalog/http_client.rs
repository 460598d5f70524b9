//! HTTP implementation of the catalog lookup service.
//!
//! Speaks the public data API shape: `videos`, `playlists` and
//! `playlistItems` endpoints, with `pageToken` pagination. Playlist pages
//! only carry item ids, so each page is followed by a `videos` lookup to
//! get full snippets.

use super::types::{CatalogAbout, CoverArt, RawCatalogItem, RawSnippet};
use super::{CatalogService, RawItemStream};
use crate::subject::{Subject, SubjectKind};
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// HTTP client for the catalog lookup service.
#[derive(Clone)]
pub struct HttpCatalogClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    page_size: u32,
    item_cap: usize,
}

impl HttpCatalogClient {
    /// Create a new catalog client.
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the lookup API
    /// * `api_key` - Optional key sent as the `key` query parameter
    /// * `page_size` - Playlist page size, 1 to 100
    /// * `item_cap` - Upper bound on streamed items, 0 for no cap
    /// * `timeout_sec` - Request timeout in seconds
    pub fn new(
        base_url: String,
        api_key: Option<String>,
        page_size: u32,
        item_cap: usize,
        timeout_sec: u64,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_sec))
            .build()
            .expect("Failed to create HTTP client");

        // Ensure base_url doesn't have a trailing slash
        let base_url = base_url.trim_end_matches('/').to_string();

        Self {
            client,
            base_url,
            api_key,
            page_size,
            item_cap,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let mut request = self.client.get(&url).query(params);
        if let Some(key) = &self.api_key {
            request = request.query(&[("key", key.as_str())]);
        }
        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to reach catalog endpoint {}", endpoint))?;

        if !response.status().is_success() {
            bail!(
                "Catalog request to {} failed with status: {}",
                endpoint,
                response.status()
            );
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse catalog response from {}", endpoint))
    }

    /// Full snippet lookup for a batch of video ids. Results come back in
    /// request order.
    async fn lookup_videos(&self, ids: &[String]) -> Result<Vec<RawCatalogItem>> {
        let joined = ids.join(",");
        let page: ItemListResponse = self
            .get_json(
                "videos",
                &[
                    ("part", "snippet,contentDetails,statistics"),
                    ("id", &joined),
                ],
            )
            .await?;
        Ok(page.items)
    }

    fn playlist_items(&self, playlist_id: String) -> RawItemStream {
        struct PageState {
            client: HttpCatalogClient,
            playlist_id: String,
            page_token: Option<String>,
            first: bool,
        }

        let state = PageState {
            client: self.clone(),
            playlist_id,
            page_token: None,
            first: true,
        };
        let pages = stream::try_unfold(state, |mut state| async move {
            if !state.first && state.page_token.is_none() {
                return Ok::<_, anyhow::Error>(None);
            }
            state.first = false;
            let page_size = state.client.page_size.to_string();
            let mut params = vec![
                ("part", "contentDetails".to_string()),
                ("playlistId", state.playlist_id.clone()),
                ("maxResults", page_size),
            ];
            if let Some(token) = state.page_token.take() {
                params.push(("pageToken", token));
            }
            let borrowed: Vec<(&str, &str)> =
                params.iter().map(|(k, v)| (*k, v.as_str())).collect();
            let page: PlaylistItemsResponse =
                state.client.get_json("playlistItems", &borrowed).await?;
            state.page_token = page.next_page_token;
            let ids: Vec<String> = page
                .items
                .into_iter()
                .map(|item| item.content_details.video_id)
                .collect();
            let items = if ids.is_empty() {
                Vec::new()
            } else {
                state.client.lookup_videos(&ids).await?
            };
            debug!(
                count = items.len(),
                more = state.page_token.is_some(),
                "catalog page fetched"
            );
            Ok(Some((items, state)))
        });
        let items = pages
            .map_ok(|batch| stream::iter(batch.into_iter().map(Ok)))
            .try_flatten();
        if self.item_cap > 0 {
            items.take(self.item_cap).boxed()
        } else {
            items.boxed()
        }
    }
}

#[async_trait]
impl CatalogService for HttpCatalogClient {
    async fn init(&self) -> Result<()> {
        // An empty id filter is the cheapest request that still exercises
        // connectivity and the API key.
        let _: serde_json::Value = self
            .get_json("videos", &[("part", "id"), ("id", "")])
            .await
            .context("Catalog service is unreachable")?;
        Ok(())
    }

    async fn about(&self, subject: &Subject) -> Result<CatalogAbout> {
        match subject.kind {
            SubjectKind::Video => {
                let page: ItemListResponse = self
                    .get_json(
                        "videos",
                        &[("part", "snippet,contentDetails"), ("id", &subject.id)],
                    )
                    .await?;
                let item = page
                    .items
                    .into_iter()
                    .next()
                    .ok_or_else(|| anyhow!("Video {} not found in catalog", subject.id))?;
                Ok(CatalogAbout {
                    kind: SubjectKind::Video,
                    id: item.id,
                    title: item.snippet.title,
                    channel_title: item.snippet.channel_title,
                    item_count: 1,
                })
            }
            SubjectKind::Playlist => {
                let page: PlaylistListResponse = self
                    .get_json(
                        "playlists",
                        &[("part", "snippet,contentDetails"), ("id", &subject.id)],
                    )
                    .await?;
                let item = page
                    .items
                    .into_iter()
                    .next()
                    .ok_or_else(|| anyhow!("Playlist {} not found in catalog", subject.id))?;
                Ok(CatalogAbout {
                    kind: SubjectKind::Playlist,
                    id: item.id,
                    title: item.snippet.title,
                    channel_title: item.snippet.channel_title,
                    item_count: item.content_details.item_count,
                })
            }
        }
    }

    async fn items(&self, subject: &Subject) -> Result<RawItemStream> {
        match subject.kind {
            SubjectKind::Video => {
                let items = self.lookup_videos(std::slice::from_ref(&subject.id)).await?;
                if items.is_empty() {
                    bail!("Video {} not found in catalog", subject.id);
                }
                Ok(stream::iter(items.into_iter().map(Ok)).boxed())
            }
            SubjectKind::Playlist => Ok(self.playlist_items(subject.id.clone())),
        }
    }

    async fn fetch_cover(&self, url: &str) -> Result<CoverArt> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to fetch cover art")?;

        if !response.status().is_success() {
            bail!("Cover art request failed with status: {}", response.status());
        }

        let bytes = response
            .bytes()
            .await
            .context("Failed to read cover art body")?
            .to_vec();

        let kind = infer::get(&bytes)
            .ok_or_else(|| anyhow!("Cover art payload has an unrecognized type"))?;
        if kind.matcher_type() != infer::MatcherType::Image {
            bail!("Cover art payload is not an image ({})", kind.mime_type());
        }
        Ok(CoverArt {
            mime: kind.mime_type().to_string(),
            bytes,
        })
    }
}

// ==================== Response envelopes ====================

#[derive(Debug, Deserialize)]
struct ItemListResponse {
    #[serde(default)]
    items: Vec<RawCatalogItem>,
}

#[derive(Debug, Deserialize)]
struct PlaylistListResponse {
    #[serde(default)]
    items: Vec<PlaylistResource>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistResource {
    id: String,
    snippet: RawSnippet,
    content_details: PlaylistContentDetails,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistContentDetails {
    #[serde(default)]
    item_count: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemsResponse {
    #[serde(default)]
    items: Vec<PlaylistItemResource>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemResource {
    content_details: PlaylistItemContentDetails,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemContentDetails {
    video_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = HttpCatalogClient::new(
            "https://api.example.test/v3/".to_string(),
            Some("k".to_string()),
            50,
            200,
            30,
        );
        assert_eq!(client.base_url(), "https://api.example.test/v3");
    }

    #[test]
    fn test_decode_playlist_envelope() {
        let json = r#"{
            "items": [{
                "id": "PL123",
                "snippet": { "title": "Road Mix", "channelTitle": "Someone" },
                "contentDetails": { "itemCount": 9 }
            }]
        }"#;
        let page: PlaylistListResponse = serde_json::from_str(json).unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].content_details.item_count, 9);
        assert_eq!(page.items[0].snippet.title, "Road Mix");
    }

    #[test]
    fn test_decode_playlist_items_envelope() {
        let json = r#"{
            "items": [
                { "contentDetails": { "videoId": "a1" } },
                { "contentDetails": { "videoId": "b2" } }
            ],
            "nextPageToken": "CAUQAA"
        }"#;
        let page: PlaylistItemsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[1].content_details.video_id, "b2");
        assert_eq!(page.next_page_token.as_deref(), Some("CAUQAA"));
    }

    #[test]
    fn test_decode_last_page_has_no_token() {
        let page: PlaylistItemsResponse = serde_json::from_str(r#"{ "items": [] }"#).unwrap();
        assert!(page.items.is_empty());
        assert!(page.next_page_token.is_none());
    }
}
