//! Upload, plus selection-wide download and delete.

use bytes::Bytes;
use log::{info, warn};
use thiserror::Error;

use super::BatchOrchestrator;
use crate::error::{Advisory, TransportError};
use crate::metadata::{is_supported_file, translated_file_name};
use crate::progress::StatusMessage;
use crate::selection::SelectionState;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ActionError {
    #[error("Select at least one file to {0}.")]
    NothingSelected(&'static str),
    #[error("None of the selected files has a translation to download.")]
    NoTranslatedFiles,
    #[error("Failed to download {file}: {source}")]
    Download {
        file: String,
        #[source]
        source: TransportError,
    },
    #[error("Batch delete failed: {}", .0.user_message())]
    Delete(#[source] TransportError),
    #[error("Only .asta, .astah and .svg files can be uploaded.")]
    NoSupportedFiles,
    #[error("Failed to upload {file}: {}", .source.user_message())]
    Upload {
        file: String,
        #[source]
        source: TransportError,
    },
}

/// A local document queued for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub contents: Bytes,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, contents: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            contents: contents.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadReport {
    /// Names the server stored, in upload order.
    pub uploaded: Vec<String>,
    /// Uploaded files the server found outlined.
    pub outlined: Vec<String>,
    /// Skipped for their extension; never sent.
    pub unsupported: Vec<String>,
}

impl UploadReport {
    fn status(&self) -> Option<StatusMessage> {
        let unsupported = (!self.unsupported.is_empty()).then(|| {
            format!(
                "{} file(s) have an unsupported format and were skipped; only .asta, .astah and .svg are allowed.",
                self.unsupported.len()
            )
        });
        let outlined = (!self.outlined.is_empty())
            .then(|| Advisory::UploadedOutlined(self.outlined.clone()).to_string());

        match (unsupported, outlined) {
            (Some(unsupported), Some(outlined)) => {
                Some(StatusMessage::error(format!("{unsupported} {outlined}")))
            }
            (Some(unsupported), None) => Some(StatusMessage::error(unsupported)),
            (None, Some(outlined)) => Some(StatusMessage::advisory(outlined)),
            (None, None) => None,
        }
    }
}

/// A translated file fetched from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    pub file_name: String,
    /// Suggested local name, e.g. `flow_translated.svg`.
    pub save_as: String,
    pub contents: Bytes,
}

impl BatchOrchestrator {
    /// Uploads the supported files one by one, then reloads the listing.
    ///
    /// Files with other extensions are skipped and counted in the status
    /// slot; outlined uploads are named there too. The first failed upload
    /// stops the rest and leaves the listing as it was.
    pub async fn upload(
        &self,
        files: Vec<UploadFile>,
        selection: &mut SelectionState,
    ) -> Result<UploadReport, ActionError> {
        if files.is_empty() {
            return Ok(UploadReport::default());
        }

        let (accepted, rejected): (Vec<_>, Vec<_>) = files
            .into_iter()
            .partition(|file| is_supported_file(&file.file_name));
        let mut report = UploadReport {
            unsupported: rejected.into_iter().map(|file| file.file_name).collect(),
            ..UploadReport::default()
        };
        if accepted.is_empty() {
            let result = Err(ActionError::NoSupportedFiles);
            self.report(&result);
            return result;
        }
        if !report.unsupported.is_empty() {
            warn!("skipping unsupported file(s): {}", report.unsupported.join(", "));
        }

        for file in accepted {
            match self.transport.upload_file(&file.file_name, file.contents).await {
                Ok(ack) => {
                    if ack.outlined {
                        report.outlined.push(ack.file_name.clone());
                    }
                    report.uploaded.push(ack.file_name);
                }
                Err(source) => {
                    let result = Err(ActionError::Upload {
                        file: file.file_name,
                        source,
                    });
                    self.report(&result);
                    return result;
                }
            }
        }
        info!("uploaded {} file(s)", report.uploaded.len());

        if let Err(error) = self.refresh_selection(selection).await {
            warn!("listing not refreshed after upload: {error}");
            return Ok(report);
        }
        if let Some(status) = report.status() {
            self.progress.set_status(status);
        }
        Ok(report)
    }

    /// Downloads the translation of every selected file that has one,
    /// sequentially. Untranslated selections are skipped.
    pub async fn download_selected(
        &self,
        selection: &SelectionState,
    ) -> Result<Vec<DownloadedFile>, ActionError> {
        let result = self.collect_downloads(selection).await;
        self.report(&result);
        result
    }

    async fn collect_downloads(
        &self,
        selection: &SelectionState,
    ) -> Result<Vec<DownloadedFile>, ActionError> {
        if selection.is_empty() {
            return Err(ActionError::NothingSelected("download"));
        }

        let translated: Vec<&String> = selection
            .selected()
            .iter()
            .filter(|name| selection.lookup(name).map(|m| m.translated).unwrap_or(false))
            .collect();
        if translated.is_empty() {
            return Err(ActionError::NoTranslatedFiles);
        }

        let mut downloads = Vec::with_capacity(translated.len());
        for file_name in translated {
            let contents = self
                .transport
                .download_translated(file_name)
                .await
                .map_err(|source| ActionError::Download {
                    file: file_name.clone(),
                    source,
                })?;
            downloads.push(DownloadedFile {
                file_name: file_name.clone(),
                save_as: translated_file_name(file_name),
                contents,
            });
        }
        info!("downloaded {} translated file(s)", downloads.len());
        Ok(downloads)
    }

    /// Deletes every selected file, reloads the listing and clears the
    /// selection. Returns how many names were deleted.
    pub async fn delete_selected(&self, selection: &mut SelectionState) -> Result<usize, ActionError> {
        if selection.is_empty() {
            let result = Err(ActionError::NothingSelected("delete"));
            self.report(&result);
            return result;
        }

        let names = selection.selected().to_vec();
        if let Err(source) = self.transport.delete_files(&names).await {
            let result = Err(ActionError::Delete(source));
            self.report(&result);
            return result;
        }
        info!("deleted {} file(s)", names.len());
        self.progress.clear_status();

        // The delete already happened; a failed reload only leaves the
        // listing stale and is reported through the status slot.
        if let Err(error) = self.refresh_selection(selection).await {
            warn!("listing not refreshed after delete: {error}");
        }
        selection.deselect_all();
        Ok(names.len())
    }

    fn report<T>(&self, result: &Result<T, ActionError>) {
        match result {
            Ok(_) => self.progress.clear_status(),
            Err(error) => {
                warn!("{error}");
                self.progress.set_status(StatusMessage::error(error.to_string()));
            }
        }
    }
}
