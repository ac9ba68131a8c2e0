use std::time::Duration;

use log::{debug, info, warn};

use crate::channel::{ChannelEvent, ProgressChannel};
use crate::correlation::CorrelationId;
use crate::error::{BatchError, HangReason};
use crate::progress::{FileProgress, ProgressState};
use crate::transport::TranslationTransport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptResult {
    Success,
    Failure,
}

/// Lifecycle of a single file's translation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    Idle,
    /// Start request issued, no push event seen yet.
    AwaitingStart,
    /// At least one progress event arrived.
    Streaming,
    Terminated(AttemptResult),
}

/// Drives one file from start request to terminal push event.
///
/// The step ends on `complete`, on `error`, on a failed start request, on
/// the channel closing early, or on the deadline. A start request that
/// merely succeeds does not end it.
pub(crate) struct FileAttempt<'a> {
    file_name: &'a str,
    id: CorrelationId,
    state: AttemptState,
}

impl<'a> FileAttempt<'a> {
    pub(crate) fn new(file_name: &'a str, id: CorrelationId) -> Self {
        Self {
            file_name,
            id,
            state: AttemptState::Idle,
        }
    }

    pub(crate) fn state(&self) -> AttemptState {
        self.state
    }

    pub(crate) async fn run(
        &mut self,
        transport: &dyn TranslationTransport,
        channel: &mut ProgressChannel,
        progress: &ProgressState,
        deadline: Option<Duration>,
    ) -> Result<(), BatchError> {
        let file_name = self.file_name;
        let result = match deadline {
            Some(limit) => {
                match tokio::time::timeout(limit, self.drive(transport, channel, progress)).await {
                    Ok(result) => result,
                    Err(_) => {
                        warn!(
                            "{file_name} got no terminal event within {}s",
                            limit.as_secs()
                        );
                        Err(BatchError::ChannelHang {
                            file: file_name.to_string(),
                            reason: HangReason::DeadlineElapsed(limit),
                        })
                    }
                }
            }
            None => self.drive(transport, channel, progress).await,
        };

        self.state = AttemptState::Terminated(match result {
            Ok(()) => AttemptResult::Success,
            Err(_) => AttemptResult::Failure,
        });
        result
    }

    async fn drive(
        &mut self,
        transport: &dyn TranslationTransport,
        channel: &mut ProgressChannel,
        progress: &ProgressState,
    ) -> Result<(), BatchError> {
        self.state = AttemptState::AwaitingStart;
        let id = self.id.clone();
        let start = transport.start_translation(self.file_name, &id);
        tokio::pin!(start);
        let mut start_settled = false;

        loop {
            tokio::select! {
                biased;

                event = channel.next_event() => match event {
                    Some(ChannelEvent::Progress(update)) => self.on_progress(update, progress),
                    Some(terminal) => return self.on_terminal(terminal),
                    None => {
                        warn!("{}: progress channel {} closed early", self.file_name, self.id);
                        return Err(BatchError::ChannelHang {
                            file: self.file_name.to_string(),
                            reason: HangReason::Disconnected,
                        });
                    }
                },

                result = &mut start, if !start_settled => {
                    start_settled = true;
                    match result {
                        Ok(ack) => debug!(
                            "start request for {} settled ({:?}); waiting for completion event",
                            self.file_name, ack.session_id
                        ),
                        Err(source) => {
                            // The server emits its error event before failing
                            // the request; let the pump deliver it, then
                            // prefer it over the HTTP error.
                            tokio::task::yield_now().await;
                            if let Some(result) = self.settle_from_buffer(channel, progress) {
                                return result;
                            }
                            warn!("start request for {} failed: {source}", self.file_name);
                            return Err(BatchError::Transport {
                                file: self.file_name.to_string(),
                                source,
                            });
                        }
                    }
                }
            }
        }
    }

    /// Applies already-buffered events; returns the outcome if one of them
    /// was terminal.
    fn settle_from_buffer(
        &mut self,
        channel: &mut ProgressChannel,
        progress: &ProgressState,
    ) -> Option<Result<(), BatchError>> {
        while let Some(event) = channel.try_next_event() {
            match event {
                ChannelEvent::Progress(update) => self.on_progress(update, progress),
                terminal => return Some(self.on_terminal(terminal)),
            }
        }
        None
    }

    fn on_progress(&mut self, update: FileProgress, progress: &ProgressState) {
        self.state = AttemptState::Streaming;
        debug!("{}: {}% {}", self.file_name, update.percentage, update.message);
        progress.set_file(update);
    }

    fn on_terminal(&self, event: ChannelEvent) -> Result<(), BatchError> {
        match event {
            ChannelEvent::Error(message) => {
                warn!("{} failed on the server: {message}", self.file_name);
                Err(BatchError::ChannelReported {
                    file: self.file_name.to_string(),
                    message,
                })
            }
            ChannelEvent::Complete | ChannelEvent::Progress(_) => {
                info!("{} translated", self.file_name);
                Ok(())
            }
        }
    }
}
