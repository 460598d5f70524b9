//! Session orchestration: inspection, normalization, downloads and errors.
//!
//! The engine owns one inspection session at a time. Requests come in
//! through [`SessionEngine`]; observers follow along via broadcast
//! [`SessionEvent`]s or read snapshots directly.

mod collection;
mod context;
mod downloads;
mod engine;
mod error_store;
mod events;
mod inspector;
mod video;

pub use context::{Context, ExpectedTotal};
pub use engine::{DownloadDisposition, EngineError, SessionEngine, SessionSettings};
pub use error_store::{ErrorRecord, ErrorScope, ErrorStore};
pub use events::SessionEvent;
pub use video::{normalize, NormalizeError, Video, VideoDetails, VideoTags};

/// Records are appended to the collection in batches of this size. The
/// last batch of an inspection may be smaller.
pub const BATCH_SIZE: usize = 7;

/// How many records are enriched (cover art fetch) concurrently. Catalog
/// order is preserved regardless.
pub(crate) const ENRICH_CONCURRENCY: usize = 4;
