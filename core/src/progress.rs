//! Observable progress state.
//!
//! The orchestrator is the only writer. Observers hold a [`ProgressObserver`]
//! and read consistent [`ProgressSnapshot`]s through a `tokio::sync::watch`
//! channel, so a presentation layer never sees a half-applied update.

use serde::Serialize;
use tokio::sync::watch;

/// Position within the running batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchProgress {
    pub total: usize,
    /// Zero-based index of the file in flight; equals `total` once every
    /// file finished and before progress is cleared.
    pub current: usize,
    pub current_file: String,
}

impl BatchProgress {
    pub fn new(total: usize, current: usize, current_file: impl Into<String>) -> Self {
        Self {
            total,
            current: current.min(total),
            current_file: current_file.into(),
        }
    }

    pub fn finished(total: usize) -> Self {
        Self::new(total, total, "")
    }

    pub fn is_finished(&self) -> bool {
        self.current == self.total
    }
}

/// Latest push update for the file in flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileProgress {
    pub message: String,
    pub percentage: u8,
}

impl FileProgress {
    /// Out-of-range percentages are clamped into `0..=100`.
    pub fn new(message: impl Into<String>, percentage: i64) -> Self {
        Self {
            message: message.into(),
            percentage: percentage.clamp(0, 100) as u8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Error,
    Advisory,
}

/// Content of the single error/advisory slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusMessage {
    pub kind: StatusKind,
    pub text: String,
}

impl StatusMessage {
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Error,
            text: text.into(),
        }
    }

    pub fn advisory(text: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Advisory,
            text: text.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == StatusKind::Error
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub batch: Option<BatchProgress>,
    pub file: Option<FileProgress>,
    pub status: Option<StatusMessage>,
    /// The listing is being (re)loaded.
    pub loading: bool,
}

impl ProgressSnapshot {
    pub fn is_idle(&self) -> bool {
        self.batch.is_none() && self.file.is_none()
    }
}

/// Writer side, owned by the orchestrator.
#[derive(Debug)]
pub struct ProgressState {
    tx: watch::Sender<ProgressSnapshot>,
}

impl Default for ProgressState {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressState {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ProgressSnapshot::default());
        Self { tx }
    }

    pub fn subscribe(&self) -> ProgressObserver {
        ProgressObserver {
            rx: self.tx.subscribe(),
        }
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.tx.borrow().clone()
    }

    pub(crate) fn set_batch(&self, progress: BatchProgress) {
        self.tx.send_modify(|state| state.batch = Some(progress));
    }

    pub(crate) fn set_file(&self, progress: FileProgress) {
        self.tx.send_modify(|state| state.file = Some(progress));
    }

    pub(crate) fn clear_file(&self) {
        self.tx.send_if_modified(|state| state.file.take().is_some());
    }

    /// Clears batch and file progress together.
    pub(crate) fn teardown(&self) {
        self.tx.send_if_modified(|state| {
            let had_batch = state.batch.take().is_some();
            let had_file = state.file.take().is_some();
            had_batch || had_file
        });
    }

    pub(crate) fn set_status(&self, status: StatusMessage) {
        self.tx.send_modify(|state| state.status = Some(status));
    }

    pub(crate) fn clear_status(&self) {
        self.tx.send_if_modified(|state| state.status.take().is_some());
    }

    pub(crate) fn set_loading(&self, loading: bool) {
        self.tx.send_if_modified(|state| {
            let changed = state.loading != loading;
            state.loading = loading;
            changed
        });
    }
}

/// Read side handed to presentation layers.
#[derive(Debug, Clone)]
pub struct ProgressObserver {
    rx: watch::Receiver<ProgressSnapshot>,
}

impl ProgressObserver {
    pub fn current(&self) -> ProgressSnapshot {
        self.rx.borrow().clone()
    }

    /// Waits for the next update. Returns `None` once the writer is gone.
    pub async fn changed(&mut self) -> Option<ProgressSnapshot> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

/// Clears batch and file progress when dropped, covering early returns and
/// a dropped batch future alike.
pub(crate) struct TeardownGuard<'a> {
    state: &'a ProgressState,
}

impl<'a> TeardownGuard<'a> {
    pub(crate) fn new(state: &'a ProgressState) -> Self {
        Self { state }
    }
}

impl Drop for TeardownGuard<'_> {
    fn drop(&mut self) {
        self.state.teardown();
    }
}
