//! Whole-file submission to the ingestion endpoint.
//!
//! The preview never travels: the original file is streamed from disk as a
//! single multipart `file` part and the backend's count is taken at face value.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::io;
use std::path::PathBuf;
use tokio_util::io::ReaderStream;

use crate::config::ClientConfig;
use crate::io::SelectedFile;

const CSV_MIME: &str = "text/csv";
/// Longest backend message carried into an error.
const MAX_DETAIL_LEN: usize = 300;

/// Outcome of a successful ingestion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    /// Rows the backend reports as ingested.
    pub row_count: u64,
    pub message: Option<String>,
}

/// Errors from the upload step. Each variant is a distinct reason the caller can render.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// The selected file could not be opened for streaming.
    #[error("could not read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("upload request failed: {0}")]
    Connection(#[from] reqwest::Error),

    /// The endpoint answered with a non-2xx status.
    #[error("upload failed with status {status}: {}", .message.as_deref().unwrap_or("the server rejected the file"))]
    Rejected { status: u16, message: Option<String> },

    /// 2xx, but the body carries no usable row count.
    #[error("upload response is malformed: {0}")]
    MalformedResponse(String),
}

/// Sends a selected file to wherever accidents are ingested.
#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(&self, file: &SelectedFile) -> Result<UploadReceipt, UploadError>;
}

#[derive(Debug, Deserialize)]
struct IngestResponse {
    // older backends answer with `total_rows`
    #[serde(alias = "total_rows")]
    count: u64,
    #[serde(default)]
    message: Option<String>,
}

/// [`Submitter`] posting to `{api_url}/accidents/upload`.
pub struct HttpSubmitter {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

impl HttpSubmitter {
    pub fn new(config: &ClientConfig) -> reqwest::Result<Self> {
        Ok(Self::with_client(config.http_client()?, config))
    }

    /// Reuse an existing [`reqwest::Client`] (shared pool with the API client).
    pub fn with_client(client: reqwest::Client, config: &ClientConfig) -> Self {
        Self {
            client,
            endpoint: config.upload_endpoint(),
            token: config.token.clone(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn file_part(file: &SelectedFile) -> Result<Part, UploadError> {
        let read_err = |source| UploadError::Read {
            path: file.path().to_path_buf(),
            source,
        };
        let handle = tokio::fs::File::open(file.path()).await.map_err(read_err)?;
        // size may have moved since selection; the part length must match what streams
        let len = handle.metadata().await.map_err(read_err)?.len();

        let body = reqwest::Body::wrap_stream(ReaderStream::new(handle));
        let part = Part::stream_with_length(body, len)
            .file_name(file.name().to_string())
            .mime_str(CSV_MIME)?;
        Ok(part)
    }
}

#[async_trait]
impl Submitter for HttpSubmitter {
    async fn submit(&self, file: &SelectedFile) -> Result<UploadReceipt, UploadError> {
        let form = Form::new().part("file", Self::file_part(file).await?);

        let mut request = self.client.post(&self.endpoint).multipart(form);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        tracing::debug!(endpoint = %self.endpoint, file = %file.name(), bytes = file.size(), "sending upload");
        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(UploadError::Rejected {
                status: status.as_u16(),
                message: backend_detail(&body),
            });
        }

        let parsed: IngestResponse = serde_json::from_slice(&body)
            .map_err(|e| UploadError::MalformedResponse(e.to_string()))?;

        Ok(UploadReceipt {
            row_count: parsed.count,
            message: parsed.message,
        })
    }
}

/// Best human-readable message in an error body: a JSON `detail` or
/// `message` string, else the trimmed body text.
pub(crate) fn backend_detail(body: &[u8]) -> Option<String> {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) {
        let detail = ["detail", "message", "error"]
            .iter()
            .find_map(|key| value.get(*key).and_then(|v| v.as_str()));
        if let Some(detail) = detail {
            return Some(truncate(detail));
        }
    }

    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    (!text.is_empty()).then(|| truncate(text))
}

fn truncate(text: &str) -> String {
    match text.char_indices().nth(MAX_DETAIL_LEN) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}
