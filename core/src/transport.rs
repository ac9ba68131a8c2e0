use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use log::debug;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::{Deserialize, Serialize};

use crate::config::OrchestratorConfig;
use crate::correlation::CorrelationId;
use crate::error::TransportError;
use crate::metadata::FileMetadata;

/// Server reply to a start-translation request. It arrives when the server
/// has finished (or given up), but the batch only advances on push events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartAck {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Server reply to an upload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadAck {
    /// Name the server stored the file under.
    pub file_name: String,
    #[serde(default)]
    pub outlined: bool,
}

#[async_trait]
pub trait TranslationTransport: Send + Sync {
    async fn list_metadata(&self) -> Result<Vec<FileMetadata>, TransportError>;

    /// Uploads one document as the multipart field `file`.
    async fn upload_file(
        &self,
        file_name: &str,
        contents: Bytes,
    ) -> Result<UploadAck, TransportError>;

    async fn start_translation(
        &self,
        file_name: &str,
        correlation_id: &CorrelationId,
    ) -> Result<StartAck, TransportError>;

    async fn delete_files(&self, file_names: &[String]) -> Result<(), TransportError>;

    /// Latest translated copy of `file_name`.
    async fn download_translated(&self, file_name: &str) -> Result<Bytes, TransportError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StartTranslationBody<'a> {
    file_name: &'a str,
    client_id: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchDeleteBody<'a> {
    file_names: &'a [String],
}

/// `reqwest`-backed transport speaking the translation server's REST API.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
    request_timeout: Duration,
    start_timeout: Option<Duration>,
}

impl HttpTransport {
    pub fn new(config: &OrchestratorConfig) -> Result<Self, TransportError> {
        // No client-wide timeout: the start request stays open for the whole
        // server-side translation and gets its own limit below.
        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|error| TransportError::Network(error.to_string()))?;

        Ok(Self {
            client,
            base_url: parse_base_url(&config.base_url)?,
            request_timeout: config.request_timeout(),
            start_timeout: config.terminal_event_timeout(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, segments: &[&str]) -> Result<Url, TransportError> {
        endpoint(&self.base_url, segments)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, TransportError> {
        let response = request.send().await?;
        ensure_success(response).await
    }
}

#[async_trait]
impl TranslationTransport for HttpTransport {
    async fn list_metadata(&self) -> Result<Vec<FileMetadata>, TransportError> {
        let url = self.url(&["files", "metadata"])?;
        let response = self
            .send(self.client.get(url).timeout(self.request_timeout))
            .await?;
        let listing: Vec<FileMetadata> = response.json().await?;
        debug!("listing returned {} file(s)", listing.len());
        Ok(listing)
    }

    async fn upload_file(
        &self,
        file_name: &str,
        contents: Bytes,
    ) -> Result<UploadAck, TransportError> {
        let url = self.url(&["files", "target"])?;
        let part = Part::bytes(contents.to_vec()).file_name(file_name.to_string());
        let form = Form::new().part("file", part);

        let response = self
            .send(
                self.client
                    .post(url)
                    .timeout(self.request_timeout)
                    .multipart(form),
            )
            .await?;
        let ack: UploadAck = response.json().await?;
        debug!("uploaded {file_name} as {} (outlined: {})", ack.file_name, ack.outlined);
        Ok(ack)
    }

    async fn start_translation(
        &self,
        file_name: &str,
        correlation_id: &CorrelationId,
    ) -> Result<StartAck, TransportError> {
        let url = self.url(&["translate-file"])?;
        let mut request = self.client.post(url).json(&StartTranslationBody {
            file_name,
            client_id: correlation_id.as_str(),
        });
        if let Some(limit) = self.start_timeout {
            request = request.timeout(limit);
        }

        let response = self.send(request).await?;
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(StartAck::default());
        }
        serde_json::from_str(&text).map_err(|error| TransportError::Decode(error.to_string()))
    }

    async fn delete_files(&self, file_names: &[String]) -> Result<(), TransportError> {
        let url = self.url(&["files", "batch-delete"])?;
        self.send(
            self.client
                .post(url)
                .timeout(self.request_timeout)
                .json(&BatchDeleteBody { file_names }),
        )
        .await?;
        Ok(())
    }

    async fn download_translated(&self, file_name: &str) -> Result<Bytes, TransportError> {
        let url = self.url(&["download", "translated", file_name])?;
        let response = self
            .send(self.client.get(url).timeout(self.request_timeout))
            .await?;
        Ok(response.bytes().await?)
    }
}

pub(crate) fn parse_base_url(raw: &str) -> Result<Url, TransportError> {
    let url = Url::parse(raw.trim()).map_err(|error| TransportError::InvalidUrl(error.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(TransportError::InvalidUrl(format!("{raw} cannot be a base url")));
    }
    Ok(url)
}

/// Appends percent-encoded path segments to `base`, keeping its own path.
pub(crate) fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, TransportError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| TransportError::InvalidUrl(base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

pub(crate) async fn ensure_success(response: Response) -> Result<Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(TransportError::from_response_body(
        status.as_u16(),
        status.canonical_reason(),
        &body,
    ))
}
