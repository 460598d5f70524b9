//! Common test infrastructure
//!
//! Scripted fakes for the catalog, ripper and save sink, plus a harness
//! that wires them into an engine with short test timings.

#![allow(dead_code)]

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;
use tuberip::catalog::{CatalogAbout, CatalogService, CoverArt, RawCatalogItem, RawItemStream};
use tuberip::codec::Codec;
use tuberip::navigation::MemoryNavigator;
use tuberip::ripper::{RipMessage, RipRequest, RipService, RipStream, RippedFile};
use tuberip::save::SaveSink;
use tuberip::session::{SessionEngine, SessionEvent, SessionSettings};
use tuberip::subject::{Subject, SubjectKind};

pub const DEBOUNCE_MS: u64 = 20;
pub const COOLDOWN_MS: u64 = 60;

// ==================== Fixtures ====================

/// Raw catalog item shaped like a lookup API response.
pub fn raw_item(id: &str, title: &str, channel: &str, duration: &str) -> RawCatalogItem {
    serde_json::from_value(json!({
        "id": id,
        "snippet": {
            "title": title,
            "channelId": format!("chan-{id}"),
            "channelTitle": channel,
            "description": "",
            "thumbnails": {
                "default": {
                    "url": format!("http://img.test/{id}/default.jpg"),
                    "width": 120,
                    "height": 90
                },
                "high": {
                    "url": format!("http://img.test/{id}/high.jpg"),
                    "width": 480,
                    "height": 360
                }
            }
        },
        "contentDetails": { "duration": duration },
        "statistics": { "viewCount": "100" }
    }))
    .unwrap()
}

/// Raw item with no thumbnails, which normalization must reject.
pub fn raw_item_without_thumbnails(id: &str, title: &str) -> RawCatalogItem {
    serde_json::from_value(json!({
        "id": id,
        "snippet": { "title": title, "channelTitle": "chan" },
        "contentDetails": { "duration": "PT1M" }
    }))
    .unwrap()
}

// ==================== Fake catalog ====================

/// Catalog service that plays a fixed script regardless of the subject.
pub struct FakeCatalog {
    about: Result<CatalogAbout, String>,
    items: Vec<Result<RawCatalogItem, String>>,
    item_delay: Duration,
    cover_failures: Vec<String>,
    pub about_calls: AtomicUsize,
    pub items_calls: AtomicUsize,
    pub cover_calls: AtomicUsize,
}

impl FakeCatalog {
    pub fn playlist(id: &str, title: &str, channel: &str, items: Vec<RawCatalogItem>) -> Self {
        let about = CatalogAbout {
            kind: SubjectKind::Playlist,
            id: id.to_string(),
            title: title.to_string(),
            channel_title: channel.to_string(),
            item_count: items.len() as u64,
        };
        Self::scripted(Ok(about), items.into_iter().map(Ok).collect())
    }

    pub fn single(item: RawCatalogItem) -> Self {
        let about = CatalogAbout {
            kind: SubjectKind::Video,
            id: item.id.clone(),
            title: item.snippet.title.clone(),
            channel_title: item.snippet.channel_title.clone(),
            item_count: 1,
        };
        Self::scripted(Ok(about), vec![Ok(item)])
    }

    /// Catalog that cannot resolve the subject at all.
    pub fn unresolvable(message: &str) -> Self {
        Self::scripted(Err(message.to_string()), Vec::new())
    }

    fn scripted(
        about: Result<CatalogAbout, String>,
        items: Vec<Result<RawCatalogItem, String>>,
    ) -> Self {
        Self {
            about,
            items,
            item_delay: Duration::ZERO,
            cover_failures: Vec::new(),
            about_calls: AtomicUsize::new(0),
            items_calls: AtomicUsize::new(0),
            cover_calls: AtomicUsize::new(0),
        }
    }

    /// Sleeps this long before yielding each item.
    pub fn with_item_delay(mut self, delay: Duration) -> Self {
        self.item_delay = delay;
        self
    }

    /// Makes cover fetches fail for any thumbnail URL containing the
    /// fragment.
    pub fn with_cover_failure(mut self, url_fragment: &str) -> Self {
        self.cover_failures.push(url_fragment.to_string());
        self
    }

    /// Ends the item stream with an error after the scripted items.
    pub fn with_trailing_error(mut self, message: &str) -> Self {
        self.items.push(Err(message.to_string()));
        self
    }
}

#[async_trait]
impl CatalogService for FakeCatalog {
    async fn about(&self, _subject: &Subject) -> Result<CatalogAbout> {
        self.about_calls.fetch_add(1, Ordering::SeqCst);
        match &self.about {
            Ok(about) => Ok(about.clone()),
            Err(message) => bail!("{}", message),
        }
    }

    async fn items(&self, _subject: &Subject) -> Result<RawItemStream> {
        self.items_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.item_delay;
        let items = self.items.clone();
        Ok(stream::iter(items)
            .then(move |item| async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                item.map_err(|message| anyhow!(message))
            })
            .boxed())
    }

    async fn fetch_cover(&self, url: &str) -> Result<CoverArt> {
        self.cover_calls.fetch_add(1, Ordering::SeqCst);
        for fragment in &self.cover_failures {
            if url.contains(fragment) {
                bail!("cover fetch refused for {}", url);
            }
        }
        Ok(CoverArt {
            mime: "image/jpeg".to_string(),
            bytes: vec![0xff, 0xd8, 0xff, 0xe0],
        })
    }
}

// ==================== Fake ripper ====================

/// What the fake ripper does with a job for a given video id.
#[derive(Debug, Clone)]
pub enum RipScript {
    /// Emit these progress values, then the finished file.
    Deliver {
        progress: Vec<u8>,
        name: String,
        bytes: Vec<u8>,
    },
    /// Open fine, then fail mid-stream.
    Fail(String),
    /// Refuse to open the job at all.
    Refuse(String),
    /// Open and then produce nothing until cancelled.
    Stall,
}

/// Ripper service that plays per-video scripts and records every request.
pub struct FakeRipper {
    scripts: Mutex<HashMap<String, RipScript>>,
    step_delay: Duration,
    requests: Mutex<Vec<RipRequest>>,
}

impl FakeRipper {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            step_delay: Duration::from_millis(5),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn script(self, video_id: &str, script: RipScript) -> Self {
        self.scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(video_id.to_string(), script);
        self
    }

    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }

    /// Every job request received so far, oldest first.
    pub fn requests(&self) -> Vec<RipRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for FakeRipper {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RipService for FakeRipper {
    async fn open(&self, request: RipRequest) -> Result<RipStream> {
        let script = self
            .scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&request.video_id)
            .cloned()
            .unwrap_or_else(|| RipScript::Deliver {
                progress: vec![30, 70],
                name: format!("{}.mp3", request.video_id),
                bytes: request.video_id.clone().into_bytes(),
            });
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);

        let delay = self.step_delay;
        let messages: Vec<Result<RipMessage>> = match script {
            RipScript::Refuse(message) => bail!("{}", message),
            RipScript::Stall => return Ok(stream::pending().boxed()),
            RipScript::Fail(message) => {
                vec![Ok(RipMessage::Progress(10)), Err(anyhow!(message))]
            }
            RipScript::Deliver {
                progress,
                name,
                bytes,
            } => {
                let mut messages: Vec<Result<RipMessage>> = progress
                    .into_iter()
                    .map(|value| Ok(RipMessage::Progress(value)))
                    .collect();
                messages.push(Ok(RipMessage::Done(RippedFile { name, bytes })));
                messages
            }
        };
        Ok(stream::iter(messages)
            .then(move |message| async move {
                tokio::time::sleep(delay).await;
                message
            })
            .boxed())
    }
}

// ==================== Fake save sink ====================

/// Save sink that keeps finished files in memory.
#[derive(Default)]
pub struct MemorySaveSink {
    files: Mutex<Vec<RippedFile>>,
    refuse: bool,
}

impl MemorySaveSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink that rejects every file.
    pub fn refusing() -> Self {
        Self {
            files: Mutex::new(Vec::new()),
            refuse: true,
        }
    }

    pub fn files(&self) -> Vec<RippedFile> {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl SaveSink for MemorySaveSink {
    async fn save(&self, file: &RippedFile) -> Result<()> {
        if self.refuse {
            bail!("disk full");
        }
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(file.clone());
        Ok(())
    }
}

// ==================== Harness ====================

/// One engine wired to fakes, with its event feed already subscribed.
pub struct TestHarness {
    pub engine: SessionEngine,
    pub catalog: Arc<FakeCatalog>,
    pub ripper: Arc<FakeRipper>,
    pub saver: Arc<MemorySaveSink>,
    pub navigator: Arc<MemoryNavigator>,
    pub events: broadcast::Receiver<SessionEvent>,
}

pub fn harness(catalog: FakeCatalog, ripper: FakeRipper) -> TestHarness {
    harness_with(catalog, ripper, MemorySaveSink::new())
}

pub fn harness_with(
    catalog: FakeCatalog,
    ripper: FakeRipper,
    saver: MemorySaveSink,
) -> TestHarness {
    let catalog = Arc::new(catalog);
    let ripper = Arc::new(ripper);
    let saver = Arc::new(saver);
    let navigator = Arc::new(MemoryNavigator::new());
    let settings = SessionSettings {
        debounce: Duration::from_millis(DEBOUNCE_MS),
        cooldown: Duration::from_millis(COOLDOWN_MS),
        default_format: Codec::Mp3,
    };
    let engine = SessionEngine::new(
        catalog.clone(),
        ripper.clone(),
        saver.clone(),
        navigator.clone(),
        settings,
    );
    let events = engine.subscribe();
    TestHarness {
        engine,
        catalog,
        ripper,
        saver,
        navigator,
        events,
    }
}

// ==================== Event helpers ====================

/// Receives events until one matches, failing the test after five quiet
/// seconds.
pub async fn wait_for_event<F>(
    events: &mut broadcast::Receiver<SessionEvent>,
    mut matches: F,
) -> SessionEvent
where
    F: FnMut(&SessionEvent) -> bool,
{
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("timed out waiting for a session event")
            .expect("event channel closed");
        if matches(&event) {
            return event;
        }
    }
}

/// Collects every event up to and including the first match.
pub async fn collect_until<F>(
    events: &mut broadcast::Receiver<SessionEvent>,
    mut until: F,
) -> Vec<SessionEvent>
where
    F: FnMut(&SessionEvent) -> bool,
{
    let mut seen = Vec::new();
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("timed out waiting for a session event")
            .expect("event channel closed");
        let done = until(&event);
        seen.push(event);
        if done {
            return seen;
        }
    }
}

/// Everything already buffered on the receiver, without waiting.
pub fn drain_now(events: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    seen
}

pub async fn wait_for_inspection_end(events: &mut broadcast::Receiver<SessionEvent>) {
    wait_for_event(events, |event| {
        matches!(event, SessionEvent::InspectionFinished)
    })
    .await;
}
