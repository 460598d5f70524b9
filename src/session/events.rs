//! Events broadcast by the session engine.

use super::context::ExpectedTotal;
use super::error_store::ErrorScope;
use uuid::Uuid;

/// Everything observers can learn about a running session.
///
/// Delivered over a `tokio::sync::broadcast` channel. Fan-out is best
/// effort: a slow observer may see `Lagged` and should re-read the engine
/// snapshots instead of replaying.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A new inspection was accepted, before its debounce window.
    InspectionStarted { subject: String },
    /// The subject resolved, or failed to resolve, to an expected size.
    TotalResolved { total: ExpectedTotal },
    /// A batch of records joined the collection, in catalog order.
    VideosIncluded { uuids: Vec<Uuid> },
    /// Failure records were appended to a scope.
    ErrorsIncluded {
        scope: ErrorScope,
        fatal: bool,
        count: usize,
    },
    /// The item stream of the current inspection is exhausted.
    InspectionFinished,
    SelectionChanged { uuid: Uuid, selected: bool },
    DownloadStarted { uuid: Uuid },
    /// Progress moved. `None` means the record returned to idle.
    ProgressChanged { uuid: Uuid, progress: Option<u8> },
    /// A file came back and was handed to the save sink.
    DownloadFinished { uuid: Uuid, name: String },
    DownloadCancelled { uuid: Uuid },
    /// Everything was torn down by a global clear.
    SessionCleared,
}
