//! The session engine: public request surface and shared state.

use super::collection::VideoCollection;
use super::context::Context;
use super::error_store::{ErrorRecord, ErrorScope, ErrorStore};
use super::events::SessionEvent;
use super::video::Video;
use crate::catalog::CatalogService;
use crate::codec::Codec;
use crate::navigation::Navigator;
use crate::ripper::RipService;
use crate::save::SaveSink;
use crate::subject::Subject;
use crate::tagging::TagPatch;
use anyhow::{Context as _, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

/// Window title when nothing is inspected.
pub(super) const BASE_TITLE: &str = "Tuberip";

/// Timing knobs and defaults for a session.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Idle window between an inspect request and the catalog lookup.
    pub debounce: Duration,
    /// How long a finished download stays visible before resetting.
    pub cooldown: Duration,
    /// Format given to a fresh context and to newly normalized records.
    pub default_format: Codec,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(500),
            cooldown: Duration::from_millis(1500),
            default_format: Codec::Mp3,
        }
    }
}

/// Errors returned to direct callers of the engine API.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("no record with uuid {0}")]
    UnknownVideo(Uuid),
    #[error("record {0} is locked by an active download")]
    VideoLocked(Uuid),
}

/// What a download request ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadDisposition {
    Started,
    /// The record was already downloading, so the request cancelled that
    /// job instead.
    Cancelled,
}

pub(super) struct JobHandle {
    pub(super) id: u64,
    pub(super) token: CancellationToken,
}

pub(super) struct SessionState {
    pub(super) context: Context,
    pub(super) videos: VideoCollection,
    pub(super) jobs: HashMap<Uuid, JobHandle>,
    /// Parent of every inspection and job token. Replaced on `clear`.
    pub(super) session_token: CancellationToken,
    pub(super) inspection: Option<CancellationToken>,
    job_seq: u64,
}

impl SessionState {
    fn new(default_format: Codec) -> Self {
        Self {
            context: Context::new(default_format),
            videos: VideoCollection::default(),
            jobs: HashMap::new(),
            session_token: CancellationToken::new(),
            inspection: None,
            job_seq: 0,
        }
    }

    pub(super) fn next_job_id(&mut self) -> u64 {
        self.job_seq += 1;
        self.job_seq
    }

    /// True while `job_id` is still the registered job for `uuid`. Late
    /// messages from a replaced job must not touch the record.
    pub(super) fn owns_job(&self, uuid: Uuid, job_id: u64) -> bool {
        self.jobs.get(&uuid).map(|handle| handle.id) == Some(job_id)
    }
}

/// Orchestrates one inspection session end to end.
///
/// Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct SessionEngine {
    pub(super) state: Arc<RwLock<SessionState>>,
    pub(super) errors: Arc<ErrorStore>,
    pub(super) events: broadcast::Sender<SessionEvent>,
    pub(super) catalog: Arc<dyn CatalogService>,
    pub(super) ripper: Arc<dyn RipService>,
    pub(super) saver: Arc<dyn SaveSink>,
    pub(super) navigator: Arc<dyn Navigator>,
    pub(super) settings: SessionSettings,
}

impl SessionEngine {
    pub fn new(
        catalog: Arc<dyn CatalogService>,
        ripper: Arc<dyn RipService>,
        saver: Arc<dyn SaveSink>,
        navigator: Arc<dyn Navigator>,
        settings: SessionSettings,
    ) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            state: Arc::new(RwLock::new(SessionState::new(settings.default_format))),
            errors: Arc::new(ErrorStore::new()),
            events,
            catalog,
            ripper,
            saver,
            navigator,
            settings,
        }
    }

    /// Subscribes to session events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub(super) fn emit(&self, event: SessionEvent) {
        // Nobody listening is fine.
        let _ = self.events.send(event);
    }

    // ==================== Bootstrap ====================

    /// Brings the engine up: checks the catalog service, publishes the
    /// base title and starts following external navigation. An already
    /// populated path is inspected right away.
    pub async fn bootstrap(&self) -> Result<()> {
        {
            let mut state = self.state.write().await;
            state.context.ready = false;
        }
        self.catalog
            .init()
            .await
            .context("Catalog service failed to initialize")?;
        {
            let mut state = self.state.write().await;
            state.context.ready = true;
        }
        self.navigator.set_title(BASE_TITLE);
        self.follow_navigation();
        let initial = self.navigator.current_path();
        if !initial.is_empty() {
            self.navigate(&initial).await;
        }
        info!("session engine ready");
        Ok(())
    }

    fn follow_navigation(&self) {
        let engine = self.clone();
        let mut back = self.navigator.back_events();
        tokio::spawn(async move {
            loop {
                match back.recv().await {
                    Ok(path) => engine.navigate(&path).await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "navigation events lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    /// Reacts to a path activated outside the engine. A parseable path
    /// starts an inspection of its canonical URL; anything else resets
    /// the session.
    async fn navigate(&self, path: &str) {
        if path.is_empty() {
            self.clear().await;
            return;
        }
        match path.parse::<Subject>() {
            Ok(subject) => self.inspect(&subject.canonical_url()).await,
            Err(err) => {
                warn!(path, "ignoring unresolvable navigation target: {}", err);
                self.clear().await;
            }
        }
    }

    // ==================== Session-wide requests ====================

    /// Sets the format applied to the context and future normalizations.
    /// Records already in the collection keep their own format.
    pub async fn configure(&self, format: Codec) {
        let mut state = self.state.write().await;
        state.context.format = format;
    }

    /// Tears down everything: the running inspection, all jobs, records,
    /// errors and the published location.
    pub async fn clear(&self) {
        {
            let mut state = self.state.write().await;
            state.session_token.cancel();
            state.session_token = CancellationToken::new();
            state.inspection = None;
            state.jobs.clear();
            state.context = Context::new(self.settings.default_format);
            state.videos.clear();
        }
        self.errors.clear(None).await;
        if !self.navigator.current_path().is_empty() {
            self.navigator.push("");
        }
        self.navigator.set_title(BASE_TITLE);
        self.emit(SessionEvent::SessionCleared);
        info!("session cleared");
    }

    // ==================== Record edits ====================

    /// Toggles the selection mark on a record, or forces it with `Some`.
    /// Returns the new state.
    pub async fn select(&self, uuid: Uuid, selected: Option<bool>) -> Result<bool, EngineError> {
        let selected = {
            let mut state = self.state.write().await;
            let video = state
                .videos
                .get_mut(uuid)
                .ok_or(EngineError::UnknownVideo(uuid))?;
            if video.locked {
                return Err(EngineError::VideoLocked(uuid));
            }
            video.selected = selected.unwrap_or(!video.selected);
            video.selected
        };
        self.emit(SessionEvent::SelectionChanged { uuid, selected });
        Ok(selected)
    }

    /// Overwrites the artist / song tags of a record.
    pub async fn annotate(&self, uuid: Uuid, patch: TagPatch) -> Result<(), EngineError> {
        if patch.is_empty() {
            return Ok(());
        }
        let mut state = self.state.write().await;
        let video = state
            .videos
            .get_mut(uuid)
            .ok_or(EngineError::UnknownVideo(uuid))?;
        if video.locked {
            return Err(EngineError::VideoLocked(uuid));
        }
        if let Some(artist) = patch.artist {
            video.tags.artist = artist;
        }
        if let Some(song) = patch.song {
            video.tags.song = song;
        }
        Ok(())
    }

    /// Swaps the artist and song tags of a record.
    pub async fn invert_tags(&self, uuid: Uuid) -> Result<(), EngineError> {
        let mut state = self.state.write().await;
        let video = state
            .videos
            .get_mut(uuid)
            .ok_or(EngineError::UnknownVideo(uuid))?;
        if video.locked {
            return Err(EngineError::VideoLocked(uuid));
        }
        std::mem::swap(&mut video.tags.artist, &mut video.tags.song);
        Ok(())
    }

    /// Sets the target format of a single record.
    pub async fn configure_video(&self, uuid: Uuid, format: Codec) -> Result<(), EngineError> {
        let mut state = self.state.write().await;
        let video = state
            .videos
            .get_mut(uuid)
            .ok_or(EngineError::UnknownVideo(uuid))?;
        if video.locked {
            return Err(EngineError::VideoLocked(uuid));
        }
        video.format = format;
        Ok(())
    }

    // ==================== Snapshots ====================

    pub async fn context(&self) -> Context {
        self.state.read().await.context.clone()
    }

    /// All records in arrival order.
    pub async fn videos(&self) -> Vec<Video> {
        self.state.read().await.videos.snapshot()
    }

    pub async fn video(&self, uuid: Uuid) -> Option<Video> {
        self.state.read().await.videos.get(uuid).cloned()
    }

    pub async fn errors(&self, scope: ErrorScope) -> Vec<ErrorRecord> {
        self.errors.for_scope(scope).await
    }

    pub async fn all_errors(&self) -> Vec<ErrorRecord> {
        self.errors.snapshot().await
    }

    /// True while any download job is running.
    pub async fn downloading(&self) -> bool {
        self.state.read().await.context.downloading
    }
}
