//! Progress channel adapter.
//!
//! A [`PushChannelProvider`] opens one raw push subscription per correlation
//! id. [`ProgressChannel`] normalizes its named events into
//! [`ChannelEvent`]s and enforces the delivery contract: any number of
//! progress events, then at most one terminal event, then silence.

pub mod sse;

use async_trait::async_trait;
use log::{debug, warn};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::correlation::CorrelationId;
use crate::error::TransportError;
use crate::progress::FileProgress;

pub use sse::SseChannelProvider;

pub const EVENT_PROGRESS: &str = "progress";
pub const EVENT_COMPLETE: &str = "complete";
pub const EVENT_ERROR: &str = "error";

/// Named event exactly as the push transport delivered it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPushEvent {
    pub name: String,
    pub data: String,
}

impl RawPushEvent {
    pub fn new(name: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }
}

/// Open push connection. Closing it (explicitly or by drop) stops the
/// background pump and discards anything still buffered.
#[derive(Debug)]
pub struct PushSubscription {
    events: mpsc::Receiver<RawPushEvent>,
    pump: Option<JoinHandle<()>>,
}

impl PushSubscription {
    pub fn new(events: mpsc::Receiver<RawPushEvent>) -> Self {
        Self { events, pump: None }
    }

    /// Ties a task feeding `events` to this subscription's lifetime.
    pub fn with_pump(events: mpsc::Receiver<RawPushEvent>, pump: JoinHandle<()>) -> Self {
        Self {
            events,
            pump: Some(pump),
        }
    }

    async fn recv(&mut self) -> Option<RawPushEvent> {
        self.events.recv().await
    }

    fn try_recv(&mut self) -> Option<RawPushEvent> {
        self.events.try_recv().ok()
    }

    pub fn close(&mut self) {
        self.events.close();
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}

impl Drop for PushSubscription {
    fn drop(&mut self) {
        self.close();
    }
}

#[async_trait]
pub trait PushChannelProvider: Send + Sync {
    /// Resolves once the subscription is live on the server side, so a start
    /// request issued afterwards cannot outrun it.
    async fn subscribe(&self, id: &CorrelationId) -> Result<PushSubscription, TransportError>;
}

/// Normalized event handed to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Progress(FileProgress),
    Complete,
    Error(String),
}

impl ChannelEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ChannelEvent::Progress(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Open,
    /// A `complete` or `error` event was delivered.
    Terminated,
    /// Closed by the caller, or by the transport before any terminal event.
    Closed,
}

#[derive(Deserialize)]
struct ProgressPayload {
    message: String,
    percentage: i64,
}

#[derive(Deserialize)]
struct ErrorPayload {
    message: String,
}

pub struct ProgressChannel {
    id: CorrelationId,
    subscription: Option<PushSubscription>,
    state: ChannelState,
}

impl ProgressChannel {
    pub async fn open(
        provider: &dyn PushChannelProvider,
        id: CorrelationId,
    ) -> Result<Self, TransportError> {
        let subscription = provider.subscribe(&id).await?;
        debug!("progress channel {id} open");
        Ok(Self {
            id,
            subscription: Some(subscription),
            state: ChannelState::Open,
        })
    }

    pub fn id(&self) -> &CorrelationId {
        &self.id
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    /// Next normalized event, or `None` once the channel terminated or
    /// closed. Malformed and unknown events are skipped.
    ///
    /// Cancel safe: dropping the future before it resolves loses no event.
    pub async fn next_event(&mut self) -> Option<ChannelEvent> {
        if self.state != ChannelState::Open {
            return None;
        }

        loop {
            let raw = match self.subscription.as_mut() {
                Some(subscription) => subscription.recv().await,
                None => None,
            };

            let Some(raw) = raw else {
                debug!("progress channel {} ended without a terminal event", self.id);
                self.finish(ChannelState::Closed);
                return None;
            };

            if let Some(event) = self.normalize(raw) {
                if event.is_terminal() {
                    self.finish(ChannelState::Terminated);
                }
                return Some(event);
            }
        }
    }

    /// Like [`next_event`](Self::next_event), but only looks at events
    /// already buffered and never waits.
    pub fn try_next_event(&mut self) -> Option<ChannelEvent> {
        if self.state != ChannelState::Open {
            return None;
        }

        loop {
            let raw = self.subscription.as_mut()?.try_recv()?;
            if let Some(event) = self.normalize(raw) {
                if event.is_terminal() {
                    self.finish(ChannelState::Terminated);
                }
                return Some(event);
            }
        }
    }

    pub fn close(&mut self) {
        if self.state == ChannelState::Open {
            self.finish(ChannelState::Closed);
        } else if let Some(mut subscription) = self.subscription.take() {
            subscription.close();
        }
    }

    fn finish(&mut self, state: ChannelState) {
        self.state = state;
        if let Some(mut subscription) = self.subscription.take() {
            subscription.close();
        }
    }

    fn normalize(&self, raw: RawPushEvent) -> Option<ChannelEvent> {
        match raw.name.as_str() {
            EVENT_PROGRESS => match serde_json::from_str::<ProgressPayload>(&raw.data) {
                Ok(payload) => Some(ChannelEvent::Progress(FileProgress::new(
                    payload.message,
                    payload.percentage,
                ))),
                Err(error) => {
                    warn!("ignoring malformed progress event on {}: {error}", self.id);
                    None
                }
            },
            EVENT_COMPLETE => Some(ChannelEvent::Complete),
            EVENT_ERROR => {
                let message = serde_json::from_str::<ErrorPayload>(&raw.data)
                    .map(|payload| payload.message)
                    .unwrap_or_else(|_| raw.data.trim().to_string());
                let message = if message.is_empty() {
                    "translation failed on the server".to_string()
                } else {
                    message
                };
                Some(ChannelEvent::Error(message))
            }
            other => {
                debug!("ignoring '{other}' event on {}", self.id);
                None
            }
        }
    }
}

impl Drop for ProgressChannel {
    fn drop(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.close();
        }
    }
}
