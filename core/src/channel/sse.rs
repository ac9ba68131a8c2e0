//! Server-Sent Events push provider.

use async_trait::async_trait;
use futures_util::StreamExt;
use log::{debug, warn};
use reqwest::header::ACCEPT;
use reqwest::{Client, Url};
use tokio::sync::mpsc;

use super::{PushChannelProvider, PushSubscription, RawPushEvent};
use crate::config::OrchestratorConfig;
use crate::correlation::CorrelationId;
use crate::error::TransportError;
use crate::transport::{endpoint, ensure_success, parse_base_url};

const EVENT_BUFFER: usize = 64;
const DEFAULT_EVENT_NAME: &str = "message";

/// Incremental `text/event-stream` decoder.
///
/// Bytes are buffered until a full line is available, so multi-byte
/// characters split across network chunks decode correctly.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    event_name: Option<String>,
    data: Vec<String>,
    /// Last line ended in `\r`; a `\n` starting the next chunk belongs to it.
    skip_lf: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk and returns every event it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<RawPushEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        loop {
            if self.skip_lf && !self.buffer.is_empty() {
                if self.buffer[0] == b'\n' {
                    self.buffer.drain(..1);
                }
                self.skip_lf = false;
            }

            let Some(end) = self
                .buffer
                .iter()
                .position(|byte| *byte == b'\n' || *byte == b'\r')
            else {
                break;
            };
            let mut line: Vec<u8> = self.buffer.drain(..=end).collect();
            self.skip_lf = line.pop() == Some(b'\r');

            let line = String::from_utf8_lossy(&line);
            if let Some(event) = self.process_line(&line) {
                events.push(event);
            }
        }
        events
    }

    fn process_line(&mut self, line: &str) -> Option<RawPushEvent> {
        // Blank line dispatches the pending event
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.event_name = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<RawPushEvent> {
        let name = self.event_name.take();
        if self.data.is_empty() {
            return None;
        }

        let data = self.data.join("\n");
        self.data.clear();
        Some(RawPushEvent {
            name: name
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| DEFAULT_EVENT_NAME.to_string()),
            data,
        })
    }
}

/// Subscribes to `{base}/progress/subscribe/{id}` and pumps the decoded
/// events into a [`PushSubscription`].
#[derive(Debug, Clone)]
pub struct SseChannelProvider {
    client: Client,
    base_url: Url,
}

impl SseChannelProvider {
    pub fn new(config: &OrchestratorConfig) -> Result<Self, TransportError> {
        // Streams stay open for the whole translation; only connecting is bounded.
        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|error| TransportError::Network(error.to_string()))?;

        Ok(Self {
            client,
            base_url: parse_base_url(&config.base_url)?,
        })
    }
}

#[async_trait]
impl PushChannelProvider for SseChannelProvider {
    async fn subscribe(&self, id: &CorrelationId) -> Result<PushSubscription, TransportError> {
        let url = endpoint(&self.base_url, &["progress", "subscribe", id.as_str()])?;
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "text/event-stream")
            .send()
            .await?;
        let response = ensure_success(response).await?;

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let id = id.clone();
        let pump = tokio::spawn(async move {
            let mut decoder = SseDecoder::new();
            let mut stream = response.bytes_stream();
            while let Some(chunk) = stream.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(error) => {
                        warn!("progress stream {id} failed: {error}");
                        return;
                    }
                };
                for event in decoder.push(&chunk) {
                    if tx.send(event).await.is_err() {
                        return;
                    }
                }
            }
            debug!("progress stream {id} closed by server");
        });

        Ok(PushSubscription::with_pump(rx, pump))
    }
}
