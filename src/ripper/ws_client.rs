//! WebSocket client for the ripper service.
//!
//! Each job gets its own connection. The job request goes out as one JSON
//! text frame; the service answers with progress frames and finally a done
//! frame followed by the file bytes in a binary frame.

use super::types::{parse_frame, RipFrame, RipMessage, RipRequest, RippedFile};
use super::{RipService, RipStream};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use futures::stream;
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Outbound job request frame.
#[derive(Serialize)]
struct JobFrame<'a> {
    id: &'a str,
    codec: &'static str,
    artist: &'a str,
    song: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    cover: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cover_mime: Option<&'a str>,
}

/// WebSocket client for the ripper service.
pub struct WsRipClient {
    url: String,
}

impl WsRipClient {
    pub fn new(url: String) -> Self {
        Self { url }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl RipService for WsRipClient {
    async fn open(&self, request: RipRequest) -> Result<RipStream> {
        let (mut socket, _) = connect_async(&self.url)
            .await
            .with_context(|| format!("Failed to connect to ripper at {}", self.url))?;

        let frame = JobFrame {
            id: &request.video_id,
            codec: request.codec.encoder(),
            artist: &request.artist,
            song: &request.song,
            cover: request.cover.as_ref().map(|c| BASE64.encode(&c.bytes)),
            cover_mime: request.cover.as_ref().map(|c| c.mime.as_str()),
        };
        let payload = serde_json::to_string(&frame).context("Failed to encode rip job")?;
        socket
            .send(Message::Text(payload.into()))
            .await
            .context("Failed to submit rip job")?;
        debug!(
            video_id = %request.video_id,
            codec = request.codec.as_str(),
            "rip job submitted"
        );

        Ok(stream::unfold(JobSocket::new(socket), JobSocket::next_message).boxed())
    }
}

/// Reader state for one job socket, driven through `stream::unfold`.
struct JobSocket {
    socket: Socket,
    /// File name from a `done` frame, held until the binary frame arrives.
    pending_name: Option<String>,
    finished: bool,
}

impl JobSocket {
    fn new(socket: Socket) -> Self {
        Self {
            socket,
            pending_name: None,
            finished: false,
        }
    }

    async fn next_message(mut self) -> Option<(Result<RipMessage>, JobSocket)> {
        if self.finished {
            return None;
        }
        loop {
            let message = match self.socket.next().await {
                Some(Ok(message)) => message,
                Some(Err(err)) => {
                    self.finished = true;
                    return Some((Err(anyhow!("Ripper socket error: {}", err)), self));
                }
                None => {
                    self.finished = true;
                    return Some((
                        Err(anyhow!("Ripper closed the connection mid-job")),
                        self,
                    ));
                }
            };
            match message {
                Message::Text(text) => match parse_frame(&text) {
                    Some(RipFrame::Progress { data }) => {
                        return Some((Ok(RipMessage::Progress(data as u8)), self));
                    }
                    Some(RipFrame::Done { name }) => {
                        self.pending_name = Some(name);
                    }
                    None => {
                        debug!("Ignoring malformed ripper frame: {}", text);
                    }
                },
                Message::Binary(bytes) => match self.pending_name.take() {
                    Some(name) => {
                        self.finished = true;
                        let file = RippedFile {
                            name,
                            bytes: bytes.to_vec(),
                        };
                        return Some((Ok(RipMessage::Done(file)), self));
                    }
                    None => {
                        debug!(len = bytes.len(), "Ignoring unannounced binary frame");
                    }
                },
                Message::Ping(data) => {
                    if let Err(err) = self.socket.send(Message::Pong(data)).await {
                        warn!("Failed to answer ripper ping: {}", err);
                    }
                }
                Message::Close(_) => {
                    self.finished = true;
                    return Some((
                        Err(anyhow!("Ripper closed the connection mid-job")),
                        self,
                    ));
                }
                _ => {}
            }
        }
    }
}
