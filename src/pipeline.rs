//! Import session state machine.
//!
//! ```text
//! Idle ──select──▶ Selected ──parse ok──▶ Parsed ──missing = ∅──▶ Valid ──submit──▶ Uploading
//!                     │                      └──missing ≠ ∅──▶ Invalid                │
//!                     └──parse fails──▶ Invalid                           ok ◀────────┴────▶ err
//!                                                                     Succeeded          Failed
//! ```
//!
//! Any state but `Uploading` accepts a new selection, which replaces the
//! session wholesale. Preview results are tagged with the generation of the
//! session that asked for them and dropped if a newer selection won the race.

use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

use crate::io::SelectedFile;
use crate::preview::{parse_preview, CsvPreview, PreviewRow};
use crate::upload::{Submitter, UploadError, UploadReceipt};
use crate::validate::missing_columns;
use crate::{ParseError, PREVIEW_LIMIT, REQUIRED_COLUMNS};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ImportState {
    #[default]
    Idle,
    Selected,
    Parsed,
    Valid,
    Invalid,
    Uploading,
    Succeeded,
    Failed,
}

impl ImportState {
    pub fn as_str(self) -> &'static str {
        match self {
            ImportState::Idle => "idle",
            ImportState::Selected => "selected",
            ImportState::Parsed => "parsed",
            ImportState::Valid => "valid",
            ImportState::Invalid => "invalid",
            ImportState::Uploading => "uploading",
            ImportState::Succeeded => "succeeded",
            ImportState::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ImportState::Succeeded | ImportState::Failed)
    }
}

impl fmt::Display for ImportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("{name} is not a CSV file")]
    NotCsv { name: String },
    #[error("Missing required columns: {}", .missing.join(", "))]
    Validation { missing: Vec<String> },
    #[error("Error uploading file: {0}")]
    Upload(#[from] UploadError),
    #[error("an upload is already in progress")]
    ConcurrentOperation,
    #[error("cannot {action} while the import is {state}")]
    InvalidTransition {
        action: &'static str,
        state: ImportState,
    },
}

/// One import attempt, from selection to a terminal state.
#[derive(Debug, Clone, Default)]
pub struct ImportSession {
    generation: u64,
    file: Option<SelectedFile>,
    header_columns: Vec<String>,
    preview_rows: Vec<PreviewRow>,
    missing_columns: BTreeSet<String>,
    state: ImportState,
    result_row_count: Option<u64>,
    error_message: Option<String>,
}

impl ImportSession {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn file(&self) -> Option<&SelectedFile> {
        self.file.as_ref()
    }

    pub fn header_columns(&self) -> &[String] {
        &self.header_columns
    }

    pub fn preview_rows(&self) -> &[PreviewRow] {
        &self.preview_rows
    }

    pub fn missing_columns(&self) -> &BTreeSet<String> {
        &self.missing_columns
    }

    pub fn state(&self) -> ImportState {
        self.state
    }

    pub fn result_row_count(&self) -> Option<u64> {
        self.result_row_count
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    fn selected(generation: u64, file: SelectedFile) -> Self {
        Self {
            generation,
            file: Some(file),
            state: ImportState::Selected,
            ..Self::default()
        }
    }

    fn record_preview(&mut self, preview: CsvPreview, limit: usize) {
        let CsvPreview { header, mut rows } = preview;
        rows.truncate(limit);
        self.header_columns = header;
        self.preview_rows = rows;
        self.state = ImportState::Parsed;
    }

    fn record_parse_failure(&mut self, err: &ParseError) {
        self.error_message = Some(format!("Error parsing CSV file: {err}"));
        self.state = ImportState::Invalid;
    }

    fn validate(&mut self, required: &[&str]) {
        self.missing_columns = missing_columns(&self.header_columns, required);
        if self.missing_columns.is_empty() {
            self.state = ImportState::Valid;
        } else {
            let missing: Vec<&str> = self.missing_columns.iter().map(String::as_str).collect();
            self.error_message = Some(format!("Missing required columns: {}", missing.join(", ")));
            self.state = ImportState::Invalid;
        }
    }

    fn begin_upload(&mut self) -> Result<SelectedFile, ImportError> {
        match self.state {
            ImportState::Valid => {}
            ImportState::Uploading => return Err(ImportError::ConcurrentOperation),
            ImportState::Invalid if !self.missing_columns.is_empty() => {
                return Err(ImportError::Validation {
                    missing: self.missing_columns.iter().cloned().collect(),
                })
            }
            state => {
                return Err(ImportError::InvalidTransition {
                    action: "submit",
                    state,
                })
            }
        }
        let file = self.file.clone().ok_or(ImportError::InvalidTransition {
            action: "submit",
            state: self.state,
        })?;
        self.state = ImportState::Uploading;
        Ok(file)
    }

    fn cancel_upload(&mut self) {
        self.result_row_count = None;
        self.error_message = Some("Error uploading file: upload cancelled".to_string());
        self.state = ImportState::Failed;
    }

    fn finish_upload(&mut self, outcome: &Result<UploadReceipt, UploadError>) {
        match outcome {
            Ok(receipt) => {
                self.result_row_count = Some(receipt.row_count);
                self.error_message = None;
                self.state = ImportState::Succeeded;
            }
            Err(err) => {
                self.result_row_count = None;
                self.error_message = Some(format!("Error uploading file: {err}"));
                self.state = ImportState::Failed;
            }
        }
    }
}

/// A preview the controller has asked for but not yet received.
///
/// Produced by [`ImportController::select`]; run it with [`PendingPreview::parse`]
/// and hand the result back through [`ImportController::apply_preview`].
#[derive(Debug)]
pub struct PendingPreview {
    generation: u64,
    file: SelectedFile,
    limit: usize,
}

impl PendingPreview {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub async fn parse(self) -> ParsedPreview {
        let result = parse_preview(&self.file, self.limit).await;
        ParsedPreview {
            generation: self.generation,
            result,
        }
    }
}

#[derive(Debug)]
pub struct ParsedPreview {
    generation: u64,
    result: Result<CsvPreview, ParseError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewOutcome {
    /// The session moved to the contained state.
    Applied(ImportState),
    /// A newer selection replaced the session; the result was dropped.
    Stale,
}

/// Owns the single active [`ImportSession`] and drives it through the pipeline.
///
/// Methods take `&self`, so one controller can be shared by the task running
/// an upload and whatever tries to interfere with it.
pub struct ImportController<S> {
    submitter: S,
    required: Vec<&'static str>,
    preview_limit: usize,
    session: Mutex<ImportSession>,
}

impl<S: Submitter> ImportController<S> {
    pub fn new(submitter: S) -> Self {
        Self {
            submitter,
            required: REQUIRED_COLUMNS.to_vec(),
            preview_limit: PREVIEW_LIMIT,
            session: Mutex::new(ImportSession::default()),
        }
    }

    /// Narrow the preview below [`PREVIEW_LIMIT`]; larger values are capped.
    pub fn with_preview_limit(mut self, limit: usize) -> Self {
        self.preview_limit = limit.min(PREVIEW_LIMIT);
        self
    }

    pub fn with_required_columns(mut self, required: &[&'static str]) -> Self {
        self.required = required.to_vec();
        self
    }

    pub fn submitter(&self) -> &S {
        &self.submitter
    }

    /// Snapshot of the current session.
    pub fn session(&self) -> ImportSession {
        self.session.lock().clone()
    }

    pub fn state(&self) -> ImportState {
        self.session.lock().state
    }

    /// Start a fresh session for `file`. Rejected while an upload is running.
    pub fn select(&self, file: SelectedFile) -> Result<PendingPreview, ImportError> {
        if !file.has_csv_extension() {
            return Err(ImportError::NotCsv {
                name: file.name().to_string(),
            });
        }

        let mut session = self.session.lock();
        if session.state == ImportState::Uploading {
            return Err(ImportError::ConcurrentOperation);
        }

        let generation = session.generation + 1;
        *session = ImportSession::selected(generation, file.clone());
        tracing::info!(generation, file = %file.name(), bytes = file.size(), "import file selected");

        Ok(PendingPreview {
            generation,
            file,
            limit: self.preview_limit,
        })
    }

    /// Record a finished preview and validate its header, unless the session moved on.
    pub fn apply_preview(&self, parsed: ParsedPreview) -> PreviewOutcome {
        let mut session = self.session.lock();
        if parsed.generation != session.generation || session.state != ImportState::Selected {
            tracing::debug!(
                stale = parsed.generation,
                current = session.generation,
                "discarding preview for a replaced session"
            );
            return PreviewOutcome::Stale;
        }

        match parsed.result {
            Ok(preview) => {
                session.record_preview(preview, self.preview_limit);
                tracing::debug!(
                    generation = session.generation,
                    columns = session.header_columns.len(),
                    rows = session.preview_rows.len(),
                    "preview parsed"
                );
                session.validate(&self.required);
                if session.state == ImportState::Valid {
                    tracing::info!(generation = session.generation, "import file is valid");
                } else {
                    tracing::warn!(
                        generation = session.generation,
                        missing = ?session.missing_columns,
                        "import file lacks required columns"
                    );
                }
            }
            Err(err) => {
                tracing::warn!(generation = session.generation, error = %err, "preview parse failed");
                session.record_parse_failure(&err);
            }
        }
        PreviewOutcome::Applied(session.state)
    }

    /// Select, preview and validate in one go. Returns the state reached.
    pub async fn open(&self, file: SelectedFile) -> Result<ImportState, ImportError> {
        let pending = self.select(file)?;
        let parsed = pending.parse().await;
        Ok(match self.apply_preview(parsed) {
            PreviewOutcome::Applied(state) => state,
            PreviewOutcome::Stale => self.state(),
        })
    }

    /// Upload the selected file. Only a `Valid` session may submit.
    ///
    /// A second call while the first is in flight fails with
    /// [`ImportError::ConcurrentOperation`] and leaves the session alone.
    pub async fn submit(&self) -> Result<UploadReceipt, ImportError> {
        let (generation, file) = {
            let mut session = self.session.lock();
            let file = session.begin_upload()?;
            (session.generation, file)
        };
        tracing::info!(generation, file = %file.name(), "upload started");

        let guard = UploadGuard {
            session: &self.session,
            generation,
        };
        let outcome = self.submitter.submit(&file).await;
        std::mem::forget(guard);

        let mut session = self.session.lock();
        // selection is refused while uploading, so the session is still ours
        debug_assert_eq!(session.generation, generation);
        session.finish_upload(&outcome);
        match outcome {
            Ok(receipt) => {
                tracing::info!(generation, row_count = receipt.row_count, "upload succeeded");
                Ok(receipt)
            }
            Err(err) => {
                tracing::warn!(generation, error = %err, "upload failed");
                Err(ImportError::Upload(err))
            }
        }
    }
}

/// Fails the session if a `submit` future is dropped mid-upload.
struct UploadGuard<'a> {
    session: &'a Mutex<ImportSession>,
    generation: u64,
}

impl Drop for UploadGuard<'_> {
    fn drop(&mut self) {
        let mut session = self.session.lock();
        if session.generation == self.generation && session.state == ImportState::Uploading {
            session.cancel_upload();
            tracing::warn!(generation = self.generation, "upload cancelled");
        }
    }
}
