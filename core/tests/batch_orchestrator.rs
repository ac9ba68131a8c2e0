//! Batch orchestrator behaviour against in-memory transport and push fakes.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use batch_translator_core::{
    ActionError, Advisory, BatchError, BatchOrchestrator, BatchProgress, CorrelationId,
    FileMetadata, FileProgress, HangReason, OrchestratorConfig, ProgressObserver,
    ProgressSnapshot, PushChannelProvider, PushSubscription, RawPushEvent, SelectionState,
    StartAck, StatusKind, TranslationTransport, TransportError, UploadAck, UploadFile,
};
use bytes::Bytes;
use tokio::sync::mpsc;

const PREPARING: &str = "preparing";

/// How the fake server reacts to a start request for one file.
#[derive(Clone)]
enum Script {
    Succeed(Vec<(&'static str, i64)>),
    ServerError(&'static str),
    StartFails(TransportError),
    /// Push an `error` event, then fail the start request as well.
    ErrorThenStartFails(&'static str),
    Hang,
    CloseEarly,
}

struct StartCall {
    file_name: String,
    id: CorrelationId,
    snapshot: Option<ProgressSnapshot>,
    open_channels: usize,
}

#[derive(Default)]
struct Hub {
    listing: Vec<FileMetadata>,
    scripts: HashMap<String, Script>,
    senders: HashMap<CorrelationId, mpsc::Sender<RawPushEvent>>,
    /// Every subscription ever opened, to tell which are still live.
    all_senders: Vec<(CorrelationId, mpsc::Sender<RawPushEvent>)>,
    starts: Vec<StartCall>,
    list_calls: usize,
    fail_listing: bool,
    fail_subscribe: bool,
    max_open: usize,
    deleted: Vec<String>,
    uploads: Vec<String>,
    observer: Option<ProgressObserver>,
    /// Progress as seen by each listing request.
    listing_snapshots: Vec<ProgressSnapshot>,
}

impl Hub {
    fn open_channels(&self) -> usize {
        self.all_senders
            .iter()
            .filter(|(_, tx)| !tx.is_closed())
            .count()
    }
}

#[derive(Clone, Default)]
struct FakeServer {
    hub: Arc<Mutex<Hub>>,
}

impl FakeServer {
    fn with_listing(listing: Vec<FileMetadata>) -> Self {
        let server = Self::default();
        server.hub.lock().unwrap().listing = listing;
        server
    }

    fn script(&self, file_name: &str, script: Script) {
        self.hub
            .lock()
            .unwrap()
            .scripts
            .insert(file_name.to_string(), script);
    }

    fn orchestrator(&self, config: &OrchestratorConfig) -> BatchOrchestrator {
        let orchestrator =
            BatchOrchestrator::new(Arc::new(self.clone()), Arc::new(self.clone()), config);
        self.hub.lock().unwrap().observer = Some(orchestrator.observe());
        orchestrator
    }

    fn started(&self) -> Vec<String> {
        self.hub
            .lock()
            .unwrap()
            .starts
            .iter()
            .map(|call| call.file_name.clone())
            .collect()
    }

    fn list_calls(&self) -> usize {
        self.hub.lock().unwrap().list_calls
    }
}

#[async_trait]
impl TranslationTransport for FakeServer {
    async fn list_metadata(&self) -> Result<Vec<FileMetadata>, TransportError> {
        let mut hub = self.hub.lock().unwrap();
        hub.list_calls += 1;
        if let Some(snapshot) = hub.observer.as_ref().map(|observer| observer.current()) {
            hub.listing_snapshots.push(snapshot);
        }
        if hub.fail_listing {
            return Err(TransportError::Network("connection refused".into()));
        }
        Ok(hub.listing.clone())
    }

    async fn upload_file(
        &self,
        file_name: &str,
        _contents: Bytes,
    ) -> Result<UploadAck, TransportError> {
        let mut hub = self.hub.lock().unwrap();
        let outlined = file_name.contains("outlined");
        hub.uploads.push(file_name.to_string());
        hub.listing.push(FileMetadata::new(file_name).outlined(outlined));
        Ok(UploadAck {
            file_name: file_name.to_string(),
            outlined,
        })
    }

    async fn start_translation(
        &self,
        file_name: &str,
        correlation_id: &CorrelationId,
    ) -> Result<StartAck, TransportError> {
        let mut hub = self.hub.lock().unwrap();
        let snapshot = hub.observer.as_ref().map(|observer| observer.current());
        let open_channels = hub.open_channels();
        hub.starts.push(StartCall {
            file_name: file_name.to_string(),
            id: correlation_id.clone(),
            snapshot,
            open_channels,
        });

        let script = hub
            .scripts
            .get(file_name)
            .cloned()
            .unwrap_or(Script::Succeed(vec![("translating", 50)]));
        let sender = hub.senders.remove(correlation_id);

        match script {
            Script::Succeed(steps) => {
                let sender = sender.expect("subscription opened before start");
                for (message, percentage) in steps {
                    let data = serde_json::json!({"message": message, "percentage": percentage});
                    sender
                        .try_send(RawPushEvent::new("progress", data.to_string()))
                        .unwrap();
                }
                sender
                    .try_send(RawPushEvent::new("complete", "Translation finished"))
                    .unwrap();
                Ok(StartAck::default())
            }
            Script::ServerError(message) => {
                let sender = sender.expect("subscription opened before start");
                let data = serde_json::json!({ "message": message });
                sender
                    .try_send(RawPushEvent::new("error", data.to_string()))
                    .unwrap();
                Ok(StartAck::default())
            }
            Script::StartFails(error) => Err(error),
            Script::ErrorThenStartFails(message) => {
                let sender = sender.expect("subscription opened before start");
                let data = serde_json::json!({ "message": message });
                sender
                    .try_send(RawPushEvent::new("error", data.to_string()))
                    .unwrap();
                Err(TransportError::Status {
                    status: 500,
                    message: "An unexpected error occurred".into(),
                })
            }
            Script::Hang => {
                // Keep the sender alive so the channel stays open and silent.
                if let Some(sender) = sender {
                    hub.senders.insert(correlation_id.clone(), sender);
                }
                Ok(StartAck::default())
            }
            Script::CloseEarly => {
                // Dropping every sender ends the stream without a terminal event.
                drop(sender);
                hub.all_senders.retain(|(id, _)| id != correlation_id);
                Ok(StartAck::default())
            }
        }
    }

    async fn delete_files(&self, file_names: &[String]) -> Result<(), TransportError> {
        let mut hub = self.hub.lock().unwrap();
        hub.deleted.extend(file_names.iter().cloned());
        hub.listing
            .retain(|entry| !file_names.contains(&entry.file_name));
        Ok(())
    }

    async fn download_translated(&self, file_name: &str) -> Result<Bytes, TransportError> {
        Ok(Bytes::from(format!("<svg>{file_name}</svg>")))
    }
}

#[async_trait]
impl PushChannelProvider for FakeServer {
    async fn subscribe(&self, id: &CorrelationId) -> Result<PushSubscription, TransportError> {
        let mut hub = self.hub.lock().unwrap();
        if hub.fail_subscribe {
            return Err(TransportError::Status {
                status: 503,
                message: "progress endpoint unavailable".into(),
            });
        }

        let (tx, rx) = mpsc::channel(16);
        hub.all_senders.push((id.clone(), tx.clone()));
        hub.senders.insert(id.clone(), tx);
        let open = hub.open_channels();
        hub.max_open = hub.max_open.max(open);
        Ok(PushSubscription::new(rx))
    }
}

fn config() -> OrchestratorConfig {
    OrchestratorConfig {
        terminal_event_timeout_secs: Some(5),
        preparing_message: PREPARING.into(),
        ..OrchestratorConfig::default()
    }
}

fn names(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

fn listing() -> Vec<FileMetadata> {
    vec![FileMetadata::new("a.svg"), FileMetadata::new("b.svg")]
}

fn assert_torn_down(orchestrator: &BatchOrchestrator) {
    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.batch, None);
    assert_eq!(snapshot.file, None);
}

#[tokio::test]
async fn two_files_succeed_in_selection_order() {
    let server = FakeServer::with_listing(listing());
    let mut orchestrator = server.orchestrator(&config());

    let outcome = orchestrator
        .run_batch(&names(&["a.svg", "b.svg"]), &listing())
        .await;

    assert!(outcome.is_success());
    assert_eq!(outcome.succeeded, names(&["a.svg", "b.svg"]));
    assert!(outcome.failed.is_empty());
    assert_eq!(outcome.refreshed_metadata, Some(listing()));
    assert_eq!(server.started(), names(&["a.svg", "b.svg"]));
    assert_eq!(server.list_calls(), 1);
    assert_torn_down(&orchestrator);
    assert_eq!(orchestrator.snapshot().status, None);
}

#[tokio::test]
async fn batch_progress_advances_one_file_at_a_time() {
    let server = FakeServer::with_listing(listing());
    let mut orchestrator = server.orchestrator(&config());

    orchestrator
        .run_batch(&names(&["a.svg", "b.svg"]), &listing())
        .await;

    let hub = server.hub.lock().unwrap();
    let seen: Vec<_> = hub
        .starts
        .iter()
        .map(|call| call.snapshot.clone().unwrap())
        .collect();
    assert_eq!(seen[0].batch, Some(BatchProgress::new(2, 0, "a.svg")));
    assert_eq!(seen[1].batch, Some(BatchProgress::new(2, 1, "b.svg")));
    for snapshot in &seen {
        assert_eq!(snapshot.file, Some(FileProgress::new(PREPARING, 0)));
    }
}

#[tokio::test]
async fn finished_progress_is_published_before_refresh() {
    let server = FakeServer::with_listing(listing());
    let mut orchestrator = server.orchestrator(&config());

    orchestrator
        .run_batch(&names(&["a.svg", "b.svg"]), &listing())
        .await;

    let hub = server.hub.lock().unwrap();
    assert_eq!(hub.listing_snapshots.len(), 1);
    let at_refresh = &hub.listing_snapshots[0];
    assert_eq!(at_refresh.batch, Some(BatchProgress::new(2, 2, "")));
    assert_eq!(at_refresh.file, None);
}

#[tokio::test]
async fn failed_batch_never_reports_finished_progress() {
    let server = FakeServer::with_listing(listing());
    server.script("a.svg", Script::ServerError("OCR failed"));
    let mut orchestrator = server.orchestrator(&config());

    orchestrator
        .run_batch(&names(&["a.svg", "b.svg"]), &listing())
        .await;

    let hub = server.hub.lock().unwrap();
    let batch = hub.listing_snapshots[0].batch.clone().unwrap();
    assert!(batch.current < batch.total);
    assert!(!batch.is_finished());
    assert_eq!(hub.listing_snapshots[0].file, None);
}

#[tokio::test]
async fn only_one_channel_is_open_at_a_time() {
    let names_list = names(&["a.svg", "b.svg", "c.svg"]);
    let metadata: Vec<_> = names_list.iter().map(FileMetadata::new).collect();
    let server = FakeServer::with_listing(metadata.clone());
    let mut orchestrator = server.orchestrator(&config());

    orchestrator.run_batch(&names_list, &metadata).await;

    let hub = server.hub.lock().unwrap();
    assert_eq!(hub.max_open, 1);
    assert!(hub.starts.iter().all(|call| call.open_channels == 1));
    assert_eq!(hub.open_channels(), 0);

    let ids: HashSet<_> = hub.starts.iter().map(|call| call.id.clone()).collect();
    assert_eq!(ids.len(), 3);
}

#[tokio::test]
async fn all_outlined_selection_makes_no_requests() {
    let metadata = vec![FileMetadata::new("a.svg").outlined(true)];
    let server = FakeServer::with_listing(metadata.clone());
    let mut orchestrator = server.orchestrator(&config());

    let outcome = orchestrator.run_batch(&names(&["a.svg"]), &metadata).await;

    assert_eq!(
        outcome.failure,
        Some(BatchError::AllOutlined(names(&["a.svg"])))
    );
    assert_eq!(outcome.excluded, names(&["a.svg"]));
    assert!(server.started().is_empty());
    assert_eq!(server.list_calls(), 0);

    let status = orchestrator.snapshot().status.unwrap();
    assert_eq!(status.kind, StatusKind::Error);
    assert!(status.text.contains("a.svg"));
    assert_torn_down(&orchestrator);
}

#[tokio::test]
async fn partially_outlined_selection_proceeds_with_advisory() {
    let metadata = vec![
        FileMetadata::new("a.svg").outlined(true),
        FileMetadata::new("b.svg"),
    ];
    let server = FakeServer::with_listing(metadata.clone());
    let mut orchestrator = server.orchestrator(&config());

    let outcome = orchestrator
        .run_batch(&names(&["a.svg", "b.svg"]), &metadata)
        .await;

    assert_eq!(
        outcome.advisory,
        Some(Advisory::PartialOutlined(names(&["a.svg"])))
    );
    assert_eq!(outcome.succeeded, names(&["b.svg"]));
    assert_eq!(server.started(), names(&["b.svg"]));

    let status = orchestrator.snapshot().status.unwrap();
    assert_eq!(status.kind, StatusKind::Advisory);
    assert!(status.text.contains("a.svg"));
}

#[tokio::test]
async fn server_error_event_aborts_remaining_files() {
    let server = FakeServer::with_listing(listing());
    server.script("a.svg", Script::ServerError("OCR failed"));
    let mut orchestrator = server.orchestrator(&config());

    let outcome = orchestrator
        .run_batch(&names(&["a.svg", "b.svg"]), &listing())
        .await;

    assert_eq!(
        outcome.failure,
        Some(BatchError::ChannelReported {
            file: "a.svg".into(),
            message: "OCR failed".into()
        })
    );
    assert_eq!(outcome.failed, names(&["a.svg"]));
    assert_eq!(outcome.not_attempted, names(&["b.svg"]));
    assert!(outcome.succeeded.is_empty());
    assert_eq!(server.started(), names(&["a.svg"]));
    assert_eq!(server.list_calls(), 1);

    let status = orchestrator.snapshot().status.unwrap();
    assert_eq!(status.kind, StatusKind::Error);
    assert!(status.text.contains("OCR failed"));
    assert_torn_down(&orchestrator);
}

#[tokio::test]
async fn empty_selection_is_rejected_without_transport_calls() {
    let server = FakeServer::with_listing(listing());
    let mut orchestrator = server.orchestrator(&config());

    let outcome = orchestrator.run_batch(&[], &listing()).await;

    assert_eq!(outcome.failure, Some(BatchError::NoSelection));
    assert!(server.started().is_empty());
    assert_eq!(server.list_calls(), 0);
    assert!(orchestrator.snapshot().status.unwrap().is_error());
}

#[tokio::test]
async fn failed_start_request_surfaces_server_message() {
    let server = FakeServer::with_listing(listing());
    server.script(
        "a.svg",
        Script::StartFails(TransportError::Status {
            status: 500,
            message: "parser crashed".into(),
        }),
    );
    let mut orchestrator = server.orchestrator(&config());

    let outcome = orchestrator
        .run_batch(&names(&["a.svg", "b.svg"]), &listing())
        .await;

    assert!(matches!(
        outcome.failure,
        Some(BatchError::Transport { ref file, .. }) if file == "a.svg"
    ));
    assert_eq!(outcome.not_attempted, names(&["b.svg"]));
    assert!(orchestrator
        .snapshot()
        .status
        .unwrap()
        .text
        .contains("parser crashed"));
    assert_eq!(server.hub.lock().unwrap().open_channels(), 0);
    assert_torn_down(&orchestrator);
}

#[tokio::test]
async fn error_event_wins_over_failed_start_request() {
    let server = FakeServer::with_listing(listing());
    server.script("a.svg", Script::ErrorThenStartFails("OCR failed"));
    let mut orchestrator = server.orchestrator(&config());

    let outcome = orchestrator
        .run_batch(&names(&["a.svg", "b.svg"]), &listing())
        .await;

    assert_eq!(
        outcome.failure,
        Some(BatchError::ChannelReported {
            file: "a.svg".into(),
            message: "OCR failed".into()
        })
    );
    assert_eq!(outcome.not_attempted, names(&["b.svg"]));
    let status = orchestrator.snapshot().status.unwrap();
    assert_eq!(status.text, "Batch translation failed: OCR failed");
    assert_eq!(server.hub.lock().unwrap().open_channels(), 0);
    assert_torn_down(&orchestrator);
}

#[tokio::test(start_paused = true)]
async fn silent_channel_hits_the_deadline() {
    let server = FakeServer::with_listing(listing());
    server.script("a.svg", Script::Hang);
    let mut orchestrator = server.orchestrator(&config());

    let outcome = orchestrator.run_batch(&names(&["a.svg"]), &listing()).await;

    assert_eq!(
        outcome.failure,
        Some(BatchError::ChannelHang {
            file: "a.svg".into(),
            reason: HangReason::DeadlineElapsed(Duration::from_secs(5)),
        })
    );
    assert_eq!(server.hub.lock().unwrap().open_channels(), 0);
    assert_torn_down(&orchestrator);
}

#[tokio::test]
async fn channel_closing_without_terminal_event_fails_the_file() {
    let server = FakeServer::with_listing(listing());
    server.script("a.svg", Script::CloseEarly);
    let mut orchestrator = server.orchestrator(&config());

    let outcome = orchestrator.run_batch(&names(&["a.svg"]), &listing()).await;

    assert_eq!(
        outcome.failure,
        Some(BatchError::ChannelHang {
            file: "a.svg".into(),
            reason: HangReason::Disconnected,
        })
    );
}

#[tokio::test]
async fn failed_subscription_never_starts_the_file() {
    let server = FakeServer::with_listing(listing());
    server.hub.lock().unwrap().fail_subscribe = true;
    let mut orchestrator = server.orchestrator(&config());

    let outcome = orchestrator.run_batch(&names(&["a.svg"]), &listing()).await;

    assert!(matches!(outcome.failure, Some(BatchError::Transport { .. })));
    assert!(server.started().is_empty());
    assert_eq!(server.list_calls(), 1);
    assert_torn_down(&orchestrator);
}

#[tokio::test]
async fn names_missing_from_listing_are_skipped() {
    let server = FakeServer::with_listing(listing());
    let mut orchestrator = server.orchestrator(&config());

    let outcome = orchestrator
        .run_batch(&names(&["gone.svg", "b.svg", "b.svg"]), &listing())
        .await;

    assert_eq!(outcome.missing, names(&["gone.svg"]));
    assert_eq!(server.started(), names(&["b.svg"]));
    assert!(outcome.is_success());
}

#[tokio::test]
async fn refresh_failure_after_success_is_reported() {
    let server = FakeServer::with_listing(listing());
    server.hub.lock().unwrap().fail_listing = true;
    let mut orchestrator = server.orchestrator(&config());

    let outcome = orchestrator.run_batch(&names(&["a.svg"]), &listing()).await;

    assert!(outcome.is_success());
    assert!(outcome.refresh_error.is_some());
    assert_eq!(outcome.refreshed_metadata, None);
    let status = orchestrator.snapshot().status.unwrap();
    assert!(status.is_error());
    assert!(status.text.contains("file list"));
    assert_torn_down(&orchestrator);
}

#[tokio::test]
async fn run_selection_stores_refreshed_listing() {
    let mut refreshed = listing();
    refreshed[0].translated = true;
    refreshed[0].version = Some(1);
    let server = FakeServer::with_listing(refreshed.clone());
    let mut orchestrator = server.orchestrator(&config());

    let mut selection = SelectionState::new(listing());
    selection.toggle("a.svg");
    let outcome = orchestrator.run_selection(&mut selection).await;

    assert!(outcome.is_success());
    assert_eq!(selection.metadata(), refreshed.as_slice());
    assert!(selection.is_selected("a.svg"));
}

#[tokio::test]
async fn progress_events_reach_observers() {
    let server = FakeServer::with_listing(listing());
    server.script("a.svg", Script::Hang);
    let mut orchestrator = server.orchestrator(&OrchestratorConfig {
        terminal_event_timeout_secs: None,
        ..config()
    });
    let mut observer = orchestrator.observe();

    let batch = tokio::spawn(async move {
        let outcome = orchestrator.run_batch(&names(&["a.svg"]), &listing()).await;
        (outcome, orchestrator)
    });

    // Wait until the start request went out, then push events by hand.
    let id = loop {
        let started = server
            .hub
            .lock()
            .unwrap()
            .starts
            .first()
            .map(|call| call.id.clone());
        if let Some(id) = started {
            break id;
        }
        tokio::task::yield_now().await;
    };
    let sender = server.hub.lock().unwrap().senders.remove(&id).unwrap();
    sender
        .send(RawPushEvent::new(
            "progress",
            r#"{"message":"translating nodes","percentage":70}"#,
        ))
        .await
        .unwrap();

    let seen = loop {
        let snapshot = observer.changed().await.unwrap();
        if snapshot.file.as_ref().map(|f| f.percentage) == Some(70) {
            break snapshot;
        }
    };
    assert_eq!(
        seen.file,
        Some(FileProgress::new("translating nodes", 70))
    );
    assert_eq!(seen.batch, Some(BatchProgress::new(1, 0, "a.svg")));

    sender
        .send(RawPushEvent::new("complete", "Translation finished"))
        .await
        .unwrap();
    let (outcome, orchestrator) = batch.await.unwrap();
    assert!(outcome.is_success());
    assert_torn_down(&orchestrator);
}

#[tokio::test]
async fn load_metadata_failure_is_written_to_status() {
    let server = FakeServer::with_listing(listing());
    server.hub.lock().unwrap().fail_listing = true;
    let orchestrator = server.orchestrator(&config());

    let error = orchestrator.load_metadata().await.unwrap_err();

    assert!(matches!(error, BatchError::MetadataLoad(_)));
    let snapshot = orchestrator.snapshot();
    assert!(!snapshot.loading);
    assert!(snapshot.status.unwrap().text.contains("file list"));
}

#[tokio::test]
async fn download_selected_only_fetches_translated_files() {
    let metadata = vec![
        FileMetadata::new("a.svg").translated(true),
        FileMetadata::new("b.svg"),
    ];
    let server = FakeServer::with_listing(metadata.clone());
    let orchestrator = server.orchestrator(&config());
    let mut selection = SelectionState::new(metadata);
    selection.select_all();

    let downloads = orchestrator.download_selected(&selection).await.unwrap();

    assert_eq!(downloads.len(), 1);
    assert_eq!(downloads[0].file_name, "a.svg");
    assert_eq!(downloads[0].save_as, "a_translated.svg");
    assert_eq!(&downloads[0].contents[..], b"<svg>a.svg</svg>");
}

#[tokio::test]
async fn download_without_translations_reports_error() {
    let server = FakeServer::with_listing(listing());
    let orchestrator = server.orchestrator(&config());
    let mut selection = SelectionState::new(listing());
    selection.toggle("b.svg");

    let error = orchestrator.download_selected(&selection).await.unwrap_err();

    assert_eq!(error, ActionError::NoTranslatedFiles);
    assert!(orchestrator.snapshot().status.unwrap().is_error());
}

#[tokio::test]
async fn delete_selected_refreshes_and_clears_selection() {
    let server = FakeServer::with_listing(listing());
    let orchestrator = server.orchestrator(&config());
    let mut selection = SelectionState::new(listing());
    selection.toggle("a.svg");

    let deleted = orchestrator.delete_selected(&mut selection).await.unwrap();

    assert_eq!(deleted, 1);
    assert!(selection.is_empty());
    assert_eq!(selection.metadata(), &[FileMetadata::new("b.svg")]);
    assert_eq!(server.hub.lock().unwrap().deleted, names(&["a.svg"]));
}

#[tokio::test]
async fn delete_with_empty_selection_is_rejected() {
    let server = FakeServer::with_listing(listing());
    let orchestrator = server.orchestrator(&config());
    let mut selection = SelectionState::new(listing());

    let error = orchestrator.delete_selected(&mut selection).await.unwrap_err();

    assert_eq!(error, ActionError::NothingSelected("delete"));
    assert!(server.hub.lock().unwrap().deleted.is_empty());
}

#[tokio::test]
async fn upload_skips_unsupported_files_and_names_outlined_ones() {
    let server = FakeServer::with_listing(Vec::new());
    let orchestrator = server.orchestrator(&config());
    let mut selection = SelectionState::default();

    let report = orchestrator
        .upload(
            vec![
                UploadFile::new("flow.svg", b"<svg/>".to_vec()),
                UploadFile::new("notes.txt", b"hello".to_vec()),
                UploadFile::new("logo_outlined.SVG", b"<svg/>".to_vec()),
            ],
            &mut selection,
        )
        .await
        .unwrap();

    assert_eq!(report.uploaded, names(&["flow.svg", "logo_outlined.SVG"]));
    assert_eq!(report.outlined, names(&["logo_outlined.SVG"]));
    assert_eq!(report.unsupported, names(&["notes.txt"]));
    assert_eq!(server.hub.lock().unwrap().uploads, report.uploaded);
    assert_eq!(selection.metadata().len(), 2);
    assert!(selection.lookup("logo_outlined.SVG").unwrap().outlined);

    let status = orchestrator.snapshot().status.unwrap();
    assert_eq!(status.kind, StatusKind::Error);
    assert!(status.text.starts_with("1 file(s) have an unsupported format"));
    assert!(status.text.ends_with("logo_outlined.SVG"));
}

#[tokio::test]
async fn outlined_upload_alone_is_an_advisory() {
    let server = FakeServer::with_listing(Vec::new());
    let orchestrator = server.orchestrator(&config());
    let mut selection = SelectionState::default();

    orchestrator
        .upload(
            vec![UploadFile::new("outlined.svg", b"<svg/>".to_vec())],
            &mut selection,
        )
        .await
        .unwrap();

    let status = orchestrator.snapshot().status.unwrap();
    assert_eq!(status.kind, StatusKind::Advisory);
    assert!(status.text.contains("outlined.svg"));
}

#[tokio::test]
async fn upload_without_supported_files_makes_no_requests() {
    let server = FakeServer::with_listing(listing());
    let orchestrator = server.orchestrator(&config());
    let mut selection = SelectionState::new(listing());

    let error = orchestrator
        .upload(
            vec![UploadFile::new("notes.txt", b"hello".to_vec())],
            &mut selection,
        )
        .await
        .unwrap_err();

    assert_eq!(error, ActionError::NoSupportedFiles);
    assert!(server.hub.lock().unwrap().uploads.is_empty());
    assert_eq!(server.list_calls(), 0);
    assert!(orchestrator.snapshot().status.unwrap().is_error());
}
