//! Subject inspection: debounce, catalog resolution and the item pipeline.

use super::context::{Context, ExpectedTotal};
use super::engine::{SessionEngine, BASE_TITLE};
use super::error_store::ErrorScope;
use super::events::SessionEvent;
use super::video::{normalize, Video};
use super::{BATCH_SIZE, ENRICH_CONCURRENCY};
use crate::catalog::RawCatalogItem;
use crate::subject::{Subject, SubjectError};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

impl SessionEngine {
    /// Requests inspection of a new subject.
    ///
    /// Always wins over whatever is running: the previous inspection is
    /// cancelled, records and errors are dropped and active jobs die with
    /// the records they belonged to. The catalog is only contacted once
    /// the debounce window passes without a newer request.
    pub async fn inspect(&self, raw_subject: &str) {
        let token = {
            let mut state = self.state.write().await;
            if let Some(previous) = state.inspection.take() {
                previous.cancel();
            }
            for (_, handle) in state.jobs.drain() {
                handle.token.cancel();
            }
            let token = state.session_token.child_token();
            state.inspection = Some(token.clone());
            state.context = Context::for_subject(raw_subject, self.settings.default_format);
            state.videos.clear();
            token
        };
        self.errors.clear(None).await;
        self.emit(SessionEvent::InspectionStarted {
            subject: raw_subject.to_string(),
        });
        let engine = self.clone();
        let raw_subject = raw_subject.to_string();
        tokio::spawn(async move {
            engine.run_inspection(raw_subject, token).await;
        });
    }

    async fn run_inspection(self, raw_subject: String, token: CancellationToken) {
        tokio::select! {
            _ = token.cancelled() => return,
            _ = tokio::time::sleep(self.settings.debounce) => {}
        }
        let subject = match raw_subject.parse::<Subject>() {
            Ok(subject) => subject,
            Err(SubjectError::Empty) => {
                debug!("empty subject, nothing to inspect");
                return;
            }
            Err(err) => {
                self.fail_inspection(&token, err.to_string()).await;
                return;
            }
        };
        info!(subject = %subject, "inspecting");
        tokio::join!(
            self.resolve_about(&subject, &token),
            self.pump_items(&subject, &token),
        );
        if token.is_cancelled() {
            return;
        }
        self.emit(SessionEvent::InspectionFinished);
        info!(subject = %subject, "inspection finished");
    }

    /// Marks the whole inspection failed: `Failed` total, fatal error
    /// record, pipeline cancelled. Only the first failure wins.
    async fn fail_inspection(&self, token: &CancellationToken, message: String) {
        {
            let mut state = self.state.write().await;
            if token.is_cancelled() || state.context.total == Some(ExpectedTotal::Failed) {
                return;
            }
            state.context.total = Some(ExpectedTotal::Failed);
            self.errors
                .include(ErrorScope::Context, [message.clone()], true)
                .await;
        }
        token.cancel();
        warn!("inspection failed: {}", message);
        self.emit(SessionEvent::TotalResolved {
            total: ExpectedTotal::Failed,
        });
        self.emit(SessionEvent::ErrorsIncluded {
            scope: ErrorScope::Context,
            fatal: true,
            count: 1,
        });
    }

    /// Resolves the subject summary: expected total, canonical location
    /// and window title.
    async fn resolve_about(&self, subject: &Subject, token: &CancellationToken) {
        let about = tokio::select! {
            _ = token.cancelled() => return,
            result = self.catalog.about(subject) => result,
        };
        let about = match about {
            Ok(about) => about,
            Err(err) => {
                self.fail_inspection(token, format!("Subject lookup failed: {}", err))
                    .await;
                return;
            }
        };
        {
            let mut state = self.state.write().await;
            if token.is_cancelled() {
                return;
            }
            state.context.total = Some(ExpectedTotal::Count(about.item_count));
        }
        let canonical = Subject {
            kind: about.kind,
            id: about.id.clone(),
        };
        let path = canonical.path();
        if self.navigator.current_path() != path {
            self.navigator.push(&path);
        }
        self.navigator.set_title(&format!(
            "{} - \"{}\" from {}",
            BASE_TITLE, about.title, about.channel_title
        ));
        self.emit(SessionEvent::TotalResolved {
            total: ExpectedTotal::Count(about.item_count),
        });
        info!(total = about.item_count, title = %about.title, "subject resolved");
    }

    /// Streams raw items through normalization and cover enrichment into
    /// the collection, in batches.
    async fn pump_items(&self, subject: &Subject, token: &CancellationToken) {
        let stream = tokio::select! {
            _ = token.cancelled() => return,
            result = self.catalog.items(subject) => result,
        };
        let stream = match stream {
            Ok(stream) => stream,
            Err(err) => {
                self.fail_inspection(token, format!("Item listing failed: {}", err))
                    .await;
                return;
            }
        };
        let engine = self.clone();
        let mut batches = stream
            .map(move |raw| {
                let engine = engine.clone();
                async move { engine.prepare(raw).await }
            })
            .buffered(ENRICH_CONCURRENCY)
            .chunks(BATCH_SIZE)
            .boxed();
        loop {
            let batch = tokio::select! {
                _ = token.cancelled() => return,
                batch = batches.next() => match batch {
                    Some(batch) => batch,
                    None => break,
                },
            };
            self.apply_batch(batch, token).await;
        }
    }

    /// Normalizes one raw item and attaches its cover art. An `Err` is a
    /// per-item failure message, not the end of the inspection.
    async fn prepare(&self, raw: anyhow::Result<RawCatalogItem>) -> Result<Video, String> {
        let raw = raw.map_err(|err| format!("Item listing interrupted: {}", err))?;
        let format = self.state.read().await.context.format;
        let mut video = normalize(&raw, format).map_err(|err| err.to_string())?;
        match self.catalog.fetch_cover(&video.details.thumbnail).await {
            Ok(cover) => video.tags.cover = Some(cover),
            Err(err) => {
                return Err(format!(
                    "Cover art for \"{}\" failed: {}",
                    video.details.title, err
                ));
            }
        }
        Ok(video)
    }

    /// Commits one batch: good records join the collection, failures
    /// become non-fatal context errors. Batches from a superseded
    /// inspection are dropped whole.
    async fn apply_batch(&self, batch: Vec<Result<Video, String>>, token: &CancellationToken) {
        let mut videos = Vec::new();
        let mut failures = Vec::new();
        for item in batch {
            match item {
                Ok(video) => videos.push(video),
                Err(message) => failures.push(message),
            }
        }
        let uuids: Vec<Uuid> = videos.iter().map(|video| video.uuid).collect();
        let failure_count = failures.len();
        {
            let mut state = self.state.write().await;
            if token.is_cancelled() {
                return;
            }
            if !videos.is_empty() {
                state.videos.include(videos);
            }
            if !failures.is_empty() {
                self.errors
                    .include(ErrorScope::Context, failures, false)
                    .await;
            }
        }
        if !uuids.is_empty() {
            debug!(count = uuids.len(), "records included");
            self.emit(SessionEvent::VideosIncluded { uuids });
        }
        if failure_count > 0 {
            self.emit(SessionEvent::ErrorsIncluded {
                scope: ErrorScope::Context,
                fatal: false,
                count: failure_count,
            });
        }
    }
}
