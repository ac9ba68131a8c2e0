//! Batch translation orchestrator.
//!
//! Files are translated strictly one at a time in selection order. Each file
//! gets a fresh correlation id and its own progress channel, which is closed
//! before the next file starts.
//!
//! Failure policy: the first failing file aborts the rest of the queue. The
//! remaining names are reported in [`BatchOutcome::not_attempted`] and are
//! never started.

pub mod actions;
mod attempt;

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};

use crate::channel::{ProgressChannel, PushChannelProvider};
use crate::config::OrchestratorConfig;
use crate::correlation::{CorrelationIdGenerator, UuidGenerator};
use crate::error::{Advisory, BatchError, TransportError};
use crate::metadata::{self, FileMetadata};
use crate::progress::{
    BatchProgress, FileProgress, ProgressObserver, ProgressSnapshot, ProgressState,
    StatusMessage, TeardownGuard,
};
use crate::selection::SelectionState;
use crate::transport::TranslationTransport;

pub use attempt::{AttemptResult, AttemptState};

/// Selected names split by whether they can be translated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Eligibility {
    pub eligible: Vec<String>,
    /// Outlined files; never sent to the server.
    pub outlined: Vec<String>,
    /// Selected names missing from the listing.
    pub missing: Vec<String>,
}

/// Splits `selected` against `metadata`, keeping selection order and
/// dropping duplicate names.
pub fn partition(selected: &[String], metadata: &[FileMetadata]) -> Eligibility {
    let mut result = Eligibility::default();
    let mut seen: Vec<&str> = Vec::with_capacity(selected.len());

    for name in selected {
        if seen.contains(&name.as_str()) {
            continue;
        }
        seen.push(name);

        match metadata::find(metadata, name) {
            Some(entry) if entry.outlined => result.outlined.push(name.clone()),
            Some(_) => result.eligible.push(name.clone()),
            None => result.missing.push(name.clone()),
        }
    }
    result
}

/// What happened to a batch. Never an `Err`: failures are recorded here and
/// in the status slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
    /// Eligible files skipped because an earlier file failed.
    pub not_attempted: Vec<String>,
    /// Outlined files left out of the batch.
    pub excluded: Vec<String>,
    /// Selected names absent from the listing.
    pub missing: Vec<String>,
    pub advisory: Option<Advisory>,
    /// First (and only) failure; the batch stops on it.
    pub failure: Option<BatchError>,
    /// Listing fetched after the batch, if the refresh succeeded.
    pub refreshed_metadata: Option<Vec<FileMetadata>>,
    pub refresh_error: Option<TransportError>,
}

impl BatchOutcome {
    fn rejected(error: BatchError) -> Self {
        Self {
            failure: Some(error),
            ..Self::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

pub struct BatchOrchestrator {
    transport: Arc<dyn TranslationTransport>,
    channels: Arc<dyn PushChannelProvider>,
    ids: Arc<dyn CorrelationIdGenerator>,
    progress: ProgressState,
    terminal_event_timeout: Option<Duration>,
    preparing_message: String,
}

impl BatchOrchestrator {
    pub fn new(
        transport: Arc<dyn TranslationTransport>,
        channels: Arc<dyn PushChannelProvider>,
        config: &OrchestratorConfig,
    ) -> Self {
        Self {
            transport,
            channels,
            ids: Arc::new(UuidGenerator),
            progress: ProgressState::new(),
            terminal_event_timeout: config.terminal_event_timeout(),
            preparing_message: config.preparing_message.clone(),
        }
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn CorrelationIdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn observe(&self) -> ProgressObserver {
        self.progress.subscribe()
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.progress.snapshot()
    }

    /// Clears the status slot, e.g. when the user dismisses a message.
    pub fn dismiss_status(&self) {
        self.progress.clear_status();
    }

    /// Fetches the listing, flagging `loading` while the request runs.
    pub async fn load_metadata(&self) -> Result<Vec<FileMetadata>, BatchError> {
        self.progress.set_loading(true);
        self.progress.clear_status();
        let result = self.transport.list_metadata().await;
        self.progress.set_loading(false);

        result.map_err(|source| {
            warn!("failed to load file list: {source}");
            let error = BatchError::MetadataLoad(source);
            self.progress.set_status(StatusMessage::error(error.user_message()));
            error
        })
    }

    /// Loads the listing into `selection`.
    pub async fn refresh_selection(&self, selection: &mut SelectionState) -> Result<(), BatchError> {
        let listing = self.load_metadata().await?;
        selection.set_metadata(listing);
        Ok(())
    }

    /// Runs the batch for `selection` and stores the refreshed listing back
    /// into it.
    pub async fn run_selection(&mut self, selection: &mut SelectionState) -> BatchOutcome {
        let outcome = self
            .run_batch(selection.selected(), selection.metadata())
            .await;
        if let Some(listing) = &outcome.refreshed_metadata {
            selection.set_metadata(listing.clone());
        }
        outcome
    }

    /// Translates the eligible part of `selected`, one file at a time.
    ///
    /// Takes `&mut self` so a single orchestrator never runs two batches at
    /// once.
    pub async fn run_batch(&mut self, selected: &[String], metadata: &[FileMetadata]) -> BatchOutcome {
        if selected.is_empty() {
            return self.reject(BatchError::NoSelection);
        }

        let Eligibility {
            eligible,
            outlined,
            missing,
        } = partition(selected, metadata);

        if !missing.is_empty() {
            warn!(
                "skipping {} selected file(s) missing from the listing: {}",
                missing.len(),
                missing.join(", ")
            );
        }
        if eligible.is_empty() {
            let error = if outlined.is_empty() {
                BatchError::NoSelection
            } else {
                BatchError::AllOutlined(outlined.clone())
            };
            let mut outcome = self.reject(error);
            outcome.excluded = outlined;
            outcome.missing = missing;
            return outcome;
        }

        let advisory = (!outlined.is_empty()).then(|| Advisory::PartialOutlined(outlined.clone()));
        match &advisory {
            Some(advisory) => self
                .progress
                .set_status(StatusMessage::advisory(advisory.to_string())),
            None => self.progress.clear_status(),
        }

        let mut outcome = BatchOutcome {
            excluded: outlined,
            missing,
            advisory,
            ..BatchOutcome::default()
        };

        let total = eligible.len();
        info!("starting batch translation of {total} file(s)");
        let _teardown = TeardownGuard::new(&self.progress);
        self.progress.set_batch(BatchProgress::new(total, 0, ""));

        for (index, file_name) in eligible.iter().enumerate() {
            self.progress
                .set_batch(BatchProgress::new(total, index, file_name.as_str()));

            match self.translate_file(file_name).await {
                Ok(()) => outcome.succeeded.push(file_name.clone()),
                Err(error) => {
                    outcome.failed.push(file_name.clone());
                    outcome.not_attempted = eligible[index + 1..].to_vec();
                    if !outcome.not_attempted.is_empty() {
                        warn!(
                            "aborting batch after {file_name}; not attempted: {}",
                            outcome.not_attempted.join(", ")
                        );
                    }
                    outcome.failure = Some(error);
                    break;
                }
            }
        }

        match &outcome.failure {
            None => {
                self.progress.set_batch(BatchProgress::finished(total));
                info!("batch finished: {} file(s) translated", outcome.succeeded.len());
            }
            Some(error) => {
                self.progress.set_status(StatusMessage::error(error.user_message()));
            }
        }

        // One refresh after every batch that reached the server.
        match self.transport.list_metadata().await {
            Ok(listing) => outcome.refreshed_metadata = Some(listing),
            Err(source) => {
                warn!("failed to refresh file list after batch: {source}");
                if outcome.failure.is_none() {
                    self.progress.set_status(StatusMessage::error(
                        BatchError::MetadataLoad(source.clone()).user_message(),
                    ));
                }
                outcome.refresh_error = Some(source);
            }
        }

        outcome
    }

    async fn translate_file(&self, file_name: &str) -> Result<(), BatchError> {
        let id = self.ids.next();
        debug!("translating {file_name} with correlation id {id}");

        let mut channel = ProgressChannel::open(self.channels.as_ref(), id.clone())
            .await
            .map_err(|source| BatchError::Transport {
                file: file_name.to_string(),
                source,
            })?;
        self.progress
            .set_file(FileProgress::new(self.preparing_message.as_str(), 0));

        let mut attempt = attempt::FileAttempt::new(file_name, id);
        let result = attempt
            .run(
                self.transport.as_ref(),
                &mut channel,
                &self.progress,
                self.terminal_event_timeout,
            )
            .await;
        debug!("{file_name} attempt ended in {:?}", attempt.state());

        channel.close();
        self.progress.clear_file();
        result
    }

    fn reject(&self, error: BatchError) -> BatchOutcome {
        warn!("batch rejected: {error}");
        self.progress.set_status(StatusMessage::error(error.user_message()));
        BatchOutcome::rejected(error)
    }
}
