//! Client for the extraction service that turns a PDF into a workflow description.
//!
//! Documents are validated locally before anything is sent; the POST itself goes through
//! a [`Transport`] so sessions can run against an in-memory service.

use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::UploadConfig;
use crate::error::{InputRejection, TransportError, UploadError, UploadFailure};
use crate::ir::WorkflowDescription;

pub use crate::config::DEFAULT_MAX_FILE_BYTES;

pub const PDF_MIME: &str = "application/pdf";
pub const FALLBACK_FAILURE_MESSAGE: &str = "Failed to process PDF";

/// What is known about a document before its bytes are read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentCandidate {
    pub file_name: String,
    pub mime_type: Option<String>,
    pub size: u64,
}

impl DocumentCandidate {
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let size = std::fs::metadata(path)?.len();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            mime_type: mime_from_extension(&file_name).map(str::to_string),
            file_name,
            size,
        })
    }

    pub fn is_pdf(&self) -> bool {
        let declared = self
            .mime_type
            .as_deref()
            .is_some_and(|mime| mime.eq_ignore_ascii_case(PDF_MIME));
        declared || has_pdf_extension(&self.file_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl Document {
    pub fn pdf(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: PDF_MIME.to_string(),
            bytes,
        }
    }

    pub fn candidate(&self) -> DocumentCandidate {
        DocumentCandidate {
            file_name: self.file_name.clone(),
            mime_type: Some(self.mime_type.clone()),
            size: self.bytes.len() as u64,
        }
    }
}

fn has_pdf_extension(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

fn mime_from_extension(file_name: &str) -> Option<&'static str> {
    has_pdf_extension(file_name).then_some(PDF_MIME)
}

/// Type first, then emptiness, then the size ceiling.
pub fn validate_document(
    candidate: &DocumentCandidate,
    max_bytes: u64,
) -> Result<(), InputRejection> {
    if !candidate.is_pdf() {
        return Err(InputRejection::NotPdf);
    }
    if candidate.size == 0 {
        return Err(InputRejection::Empty);
    }
    if candidate.size > max_bytes {
        return Err(InputRejection::TooLarge {
            size: candidate.size,
            limit: max_bytes,
        });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

pub trait Transport {
    fn post(&self, url: &str, document: &Document) -> Result<RawResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn post(&self, url: &str, document: &Document) -> Result<RawResponse, TransportError> {
        (**self).post(url, document)
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    success: bool,
    workflow: Option<WorkflowDescription>,
    detail: Option<serde_json::Value>,
    error: Option<String>,
}

/// Maps a service response onto a workflow or a failure.
pub fn interpret_response(raw: &RawResponse) -> Result<WorkflowDescription, UploadFailure> {
    if !raw.is_success() {
        return Err(UploadFailure::Transport {
            reason: format!("HTTP status {}", raw.status),
        });
    }
    let response: UploadResponse =
        serde_json::from_str(&raw.body).map_err(|err| UploadFailure::Transport {
            reason: format!("unreadable response: {err}"),
        })?;

    match response {
        UploadResponse {
            success: true,
            workflow: Some(workflow),
            ..
        } => Ok(workflow),
        UploadResponse { detail, error, .. } => {
            let message = detail
                .and_then(|detail| match detail {
                    serde_json::Value::Null => None,
                    serde_json::Value::String(text) => Some(text),
                    other => Some(other.to_string()),
                })
                .or(error)
                .unwrap_or_else(|| FALLBACK_FAILURE_MESSAGE.to_string());
            Err(UploadFailure::Application { message })
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UploadState {
    Idle,
    Uploading { file_name: String },
    Ready(WorkflowDescription),
    Rejected(InputRejection),
    Failed(UploadFailure),
}

impl UploadState {
    /// Message a surface shows under the drop zone, if any.
    pub fn message(&self) -> Option<String> {
        match self {
            Self::Rejected(rejection) => Some(rejection.to_string()),
            Self::Failed(failure) => Some(failure.to_string()),
            _ => None,
        }
    }
}

/// One document at a time: a second submission while uploading is refused.
#[derive(Debug)]
pub struct UploadSession<T> {
    transport: T,
    config: UploadConfig,
    state: UploadState,
}

impl<T: Transport> UploadSession<T> {
    pub fn new(transport: T, config: UploadConfig) -> Self {
        Self {
            transport,
            config,
            state: UploadState::Idle,
        }
    }

    pub fn state(&self) -> &UploadState {
        &self.state
    }

    pub fn is_accepting(&self) -> bool {
        !matches!(self.state, UploadState::Uploading { .. })
    }

    pub fn upload_url(&self) -> String {
        format!("{}/api/upload", self.config.endpoint.trim_end_matches('/'))
    }

    /// Validates `candidate` and marks the session busy.
    pub fn begin(&mut self, candidate: &DocumentCandidate) -> Result<(), UploadError> {
        if !self.is_accepting() {
            return Err(UploadError::Busy);
        }
        if let Err(rejection) = validate_document(candidate, self.config.max_file_bytes) {
            debug!(file = %candidate.file_name, %rejection, "document rejected");
            self.state = UploadState::Rejected(rejection.clone());
            return Err(rejection.into());
        }
        self.state = UploadState::Uploading {
            file_name: candidate.file_name.clone(),
        };
        Ok(())
    }

    /// Settles an upload started with [`begin`](Self::begin).
    pub fn finish(
        &mut self,
        response: Result<RawResponse, TransportError>,
    ) -> Result<WorkflowDescription, UploadError> {
        let outcome = response
            .map_err(|err| UploadFailure::Transport { reason: err.0 })
            .and_then(|raw| interpret_response(&raw));
        match outcome {
            Ok(workflow) => {
                info!(
                    stages = workflow.stages.len(),
                    steps = workflow.steps.len(),
                    "workflow extracted"
                );
                self.state = UploadState::Ready(workflow.clone());
                Ok(workflow)
            }
            Err(failure) => {
                match &failure {
                    UploadFailure::Transport { reason } => warn!(%reason, "upload failed"),
                    UploadFailure::Application { message } => {
                        warn!(%message, "extraction service reported an error")
                    }
                }
                self.state = UploadState::Failed(failure.clone());
                Err(failure.into())
            }
        }
    }

    pub fn submit(&mut self, document: &Document) -> Result<WorkflowDescription, UploadError> {
        self.begin(&document.candidate())?;
        let url = self.upload_url();
        info!(file = %document.file_name, bytes = document.bytes.len(), %url, "uploading document");
        let response = self.transport.post(&url, document);
        self.finish(response)
    }

    /// Checks the file's metadata before reading it, so oversized files are never loaded.
    pub fn submit_path(&mut self, path: &Path) -> Result<WorkflowDescription, UploadError> {
        if !self.is_accepting() {
            return Err(UploadError::Busy);
        }
        let candidate = DocumentCandidate::from_path(path)?;
        if let Err(rejection) = validate_document(&candidate, self.config.max_file_bytes) {
            self.state = UploadState::Rejected(rejection.clone());
            return Err(rejection.into());
        }
        let bytes = std::fs::read(path)?;
        self.submit(&Document::pdf(candidate.file_name, bytes))
    }

    /// Returns a rejected or failed session to idle. Other states are left alone.
    pub fn retry(&mut self) {
        if matches!(self.state, UploadState::Rejected(_) | UploadState::Failed(_)) {
            self.state = UploadState::Idle;
        }
    }

    pub fn reset(&mut self) {
        self.state = UploadState::Idle;
    }
}

#[cfg(feature = "upload")]
pub use http::HttpTransport;

#[cfg(feature = "upload")]
mod http {
    use std::time::Duration;

    use reqwest::blocking::{Client, multipart};

    use super::{Document, RawResponse, Transport};
    use crate::config::UploadConfig;
    use crate::error::TransportError;

    /// Blocking multipart POST with a single `file` field.
    #[derive(Debug, Clone)]
    pub struct HttpTransport {
        client: Client,
    }

    impl HttpTransport {
        pub fn new(config: &UploadConfig) -> Result<Self, TransportError> {
            let client = Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .user_agent(concat!("wfviz/", env!("CARGO_PKG_VERSION")))
                .build()
                .map_err(|e| TransportError(format!("failed to build HTTP client: {e}")))?;
            Ok(Self { client })
        }
    }

    impl Transport for HttpTransport {
        fn post(&self, url: &str, document: &Document) -> Result<RawResponse, TransportError> {
            let part = multipart::Part::bytes(document.bytes.clone())
                .file_name(document.file_name.clone())
                .mime_str(&document.mime_type)
                .map_err(|e| TransportError(e.to_string()))?;
            let form = multipart::Form::new().part("file", part);
            let response = self
                .client
                .post(url)
                .multipart(form)
                .send()
                .map_err(|e| TransportError(e.to_string()))?;
            let status = response.status().as_u16();
            let body = response.text().map_err(|e| TransportError(e.to_string()))?;
            Ok(RawResponse { status, body })
        }
    }
}
