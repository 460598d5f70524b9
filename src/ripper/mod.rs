//! Ripper service client: one socket per job, progress streamed back.

mod types;
mod ws_client;

pub use types::{RipMessage, RipRequest, RippedFile};
pub use ws_client::WsRipClient;

use anyhow::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Stream of messages for one job. Ends after `Done`; an `Err` element is
/// terminal and means the job failed.
pub type RipStream = BoxStream<'static, Result<RipMessage>>;

/// Client for the ripper service.
#[async_trait]
pub trait RipService: Send + Sync {
    /// Submits a job and returns the stream of its messages.
    async fn open(&self, request: RipRequest) -> Result<RipStream>;
}
