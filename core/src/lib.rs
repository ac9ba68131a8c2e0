pub mod batch;
pub mod channel;
pub mod config;
pub mod correlation;
pub mod error;
pub mod metadata;
pub mod progress;
pub mod selection;
pub mod transport;

pub use batch::actions::{ActionError, DownloadedFile, UploadFile, UploadReport};
pub use batch::{partition, AttemptResult, AttemptState, BatchOrchestrator, BatchOutcome, Eligibility};
pub use channel::{
    ChannelEvent, ChannelState, ProgressChannel, PushChannelProvider, PushSubscription,
    RawPushEvent, SseChannelProvider,
};
pub use config::{ConfigError, OrchestratorConfig};
pub use correlation::{CorrelationId, CorrelationIdGenerator, UuidGenerator};
pub use error::{Advisory, BatchError, HangReason, TransportError};
pub use metadata::{is_supported_file, translated_file_name, FileMetadata};
pub use progress::{
    BatchProgress, FileProgress, ProgressObserver, ProgressSnapshot, ProgressState, StatusKind,
    StatusMessage,
};
pub use selection::SelectionState;
pub use transport::{HttpTransport, StartAck, TranslationTransport, UploadAck};
