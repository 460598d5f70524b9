//! Download jobs: one rip job per record, cancel on repeat, cooldown
//! after a finished file.

use super::engine::{DownloadDisposition, EngineError, JobHandle, SessionEngine, SessionState};
use super::error_store::ErrorScope;
use super::events::SessionEvent;
use crate::ripper::{RipMessage, RipRequest, RippedFile};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

impl SessionEngine {
    /// Requests a download for one record.
    ///
    /// A repeat request while the record's job is running cancels that job
    /// instead. A record in its post-download cooldown rejects the request
    /// with [`EngineError::VideoLocked`].
    pub async fn download(&self, uuid: Uuid) -> Result<DownloadDisposition, EngineError> {
        let job = {
            let mut state = self.state.write().await;
            if let Some(handle) = state.jobs.remove(&uuid) {
                handle.token.cancel();
                state.videos.reset_download(uuid);
                state.context.downloading = !state.jobs.is_empty();
                None
            } else {
                if state.videos.get(uuid).is_none() {
                    return Err(EngineError::UnknownVideo(uuid));
                }
                match Self::begin_job(&mut state, uuid) {
                    Some(job) => Some(job),
                    None => return Err(EngineError::VideoLocked(uuid)),
                }
            }
        };
        match job {
            Some((job_id, token, request)) => {
                self.emit(SessionEvent::DownloadStarted { uuid });
                self.emit(SessionEvent::ProgressChanged {
                    uuid,
                    progress: Some(0),
                });
                self.spawn_job(uuid, job_id, request, token);
                Ok(DownloadDisposition::Started)
            }
            None => {
                debug!(%uuid, "download cancelled by repeat request");
                self.emit(SessionEvent::DownloadCancelled { uuid });
                self.emit(SessionEvent::ProgressChanged {
                    uuid,
                    progress: None,
                });
                Ok(DownloadDisposition::Cancelled)
            }
        }
    }

    /// Starts a job for every selected idle record. Records that are
    /// already downloading or cooling down are left alone. Returns the
    /// records that actually got a job.
    pub async fn download_selected(&self) -> Vec<Uuid> {
        let jobs = {
            let mut state = self.state.write().await;
            let candidates: Vec<Uuid> = state
                .videos
                .iter()
                .filter(|video| video.selected)
                .map(|video| video.uuid)
                .collect();
            let mut jobs = Vec::new();
            for uuid in candidates {
                if let Some(job) = Self::begin_job(&mut state, uuid) {
                    jobs.push((uuid, job));
                }
            }
            jobs
        };
        let mut started = Vec::with_capacity(jobs.len());
        for (uuid, (job_id, token, request)) in jobs {
            self.emit(SessionEvent::DownloadStarted { uuid });
            self.emit(SessionEvent::ProgressChanged {
                uuid,
                progress: Some(0),
            });
            self.spawn_job(uuid, job_id, request, token);
            started.push(uuid);
        }
        if !started.is_empty() {
            info!(count = started.len(), "selected downloads started");
        }
        started
    }

    /// Registers a job for an idle record and marks it active. `None` if
    /// the record is missing, locked or already has a job.
    fn begin_job(
        state: &mut SessionState,
        uuid: Uuid,
    ) -> Option<(u64, CancellationToken, RipRequest)> {
        let video = state.videos.get(uuid)?;
        if video.locked || state.jobs.contains_key(&uuid) {
            return None;
        }
        let request = RipRequest {
            video_id: video.details.video_id.clone(),
            codec: video.format,
            artist: video.tags.artist.clone(),
            song: video.tags.song.clone(),
            cover: video.tags.cover.clone(),
        };
        let job_id = state.next_job_id();
        let token = state.session_token.child_token();
        state.jobs.insert(
            uuid,
            JobHandle {
                id: job_id,
                token: token.clone(),
            },
        );
        state.videos.begin_download(uuid);
        state.context.downloading = true;
        Some((job_id, token, request))
    }

    fn spawn_job(&self, uuid: Uuid, job_id: u64, request: RipRequest, token: CancellationToken) {
        let engine = self.clone();
        tokio::spawn(async move {
            engine.run_job(uuid, job_id, request, token).await;
        });
    }

    async fn run_job(self, uuid: Uuid, job_id: u64, request: RipRequest, token: CancellationToken) {
        info!(%uuid, video_id = %request.video_id, codec = request.codec.as_str(), "download started");
        let stream = tokio::select! {
            _ = token.cancelled() => return,
            result = self.ripper.open(request) => result,
        };
        let mut stream = match stream {
            Ok(stream) => stream,
            Err(err) => {
                self.fail_job(uuid, job_id, format!("Failed to start job: {}", err))
                    .await;
                return;
            }
        };
        loop {
            let message = tokio::select! {
                _ = token.cancelled() => return,
                message = stream.next() => message,
            };
            match message {
                Some(Ok(RipMessage::Progress(progress))) => {
                    self.apply_progress(uuid, job_id, progress).await;
                }
                Some(Ok(RipMessage::Done(file))) => {
                    self.finish_job(uuid, job_id, file, &token).await;
                    return;
                }
                Some(Err(err)) => {
                    self.fail_job(uuid, job_id, format!("Download failed: {}", err))
                        .await;
                    return;
                }
                None => {
                    self.fail_job(uuid, job_id, "Job ended without a result".to_string())
                        .await;
                    return;
                }
            }
        }
    }

    /// Moves a record's progress. Writes from a superseded job are dropped.
    async fn apply_progress(&self, uuid: Uuid, job_id: u64, progress: u8) {
        {
            let mut state = self.state.write().await;
            if !state.owns_job(uuid, job_id) {
                return;
            }
            state.videos.set_progress(uuid, progress);
        }
        self.emit(SessionEvent::ProgressChanged {
            uuid,
            progress: Some(progress),
        });
    }

    /// Lands a finished file: full progress, save, cooldown, back to idle.
    /// The record stays locked until the cooldown ends.
    async fn finish_job(
        &self,
        uuid: Uuid,
        job_id: u64,
        file: RippedFile,
        token: &CancellationToken,
    ) {
        {
            let mut state = self.state.write().await;
            if !state.owns_job(uuid, job_id) {
                return;
            }
            state.jobs.remove(&uuid);
            state.videos.set_progress(uuid, 100);
            state.context.downloading = !state.jobs.is_empty();
        }
        self.emit(SessionEvent::ProgressChanged {
            uuid,
            progress: Some(100),
        });
        info!(%uuid, name = %file.name, size = file.bytes.len(), "download finished");
        if let Err(err) = self.saver.save(&file).await {
            warn!(%uuid, "Failed to save \"{}\": {}", file.name, err);
            self.errors
                .include(
                    ErrorScope::Videos,
                    [format!("Failed to save \"{}\": {}", file.name, err)],
                    false,
                )
                .await;
            self.emit(SessionEvent::ErrorsIncluded {
                scope: ErrorScope::Videos,
                fatal: false,
                count: 1,
            });
        }
        self.emit(SessionEvent::DownloadFinished {
            uuid,
            name: file.name,
        });
        tokio::select! {
            _ = token.cancelled() => return,
            _ = tokio::time::sleep(self.settings.cooldown) => {}
        }
        {
            let mut state = self.state.write().await;
            // The record may be gone if a new inspection replaced the
            // collection while the cooldown was running.
            if token.is_cancelled() || state.videos.get(uuid).is_none() {
                return;
            }
            state.videos.reset_download(uuid);
        }
        self.emit(SessionEvent::ProgressChanged {
            uuid,
            progress: None,
        });
    }

    /// Tears a failed job down and records the failure against the record
    /// scope. Non-fatal: the rest of the session keeps going.
    async fn fail_job(&self, uuid: Uuid, job_id: u64, message: String) {
        {
            let mut state = self.state.write().await;
            if !state.owns_job(uuid, job_id) {
                return;
            }
            state.jobs.remove(&uuid);
            state.videos.reset_download(uuid);
            state.context.downloading = !state.jobs.is_empty();
            self.errors
                .include(ErrorScope::Videos, [message.clone()], false)
                .await;
        }
        warn!(%uuid, "download failed: {}", message);
        self.emit(SessionEvent::ProgressChanged {
            uuid,
            progress: None,
        });
        self.emit(SessionEvent::ErrorsIncluded {
            scope: ErrorScope::Videos,
            fatal: false,
            count: 1,
        });
    }
}
