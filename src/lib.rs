//! CSV import pipeline for the road-traffic-accident dashboard.
//!
//! - Preview: header plus the first few data rows, read without loading the file.
//! - Validation: which required columns the header lacks.
//! - Upload: the whole original file in one multipart request; the backend reports the count.
//! - Controller: one import session at a time, driven through an explicit state machine.
//!
//! Data shape:
//! - `CsvPreview { header, rows }` where each row is a `BTreeMap<String, String>`
//! - `ImportSession` snapshots from `ImportController::session()`
//!
//! The `api` and `list` modules cover the rest of the dashboard surface: a typed
//! client for the accident and analytics routes, and the accident table's
//! filter/sort/paginate view model.
//
mod codec;
mod io;

pub mod api;
pub mod config;
pub mod list;
pub mod models;
pub mod pipeline;
pub mod preview;
pub mod template;
pub mod upload;
pub mod validate;

pub use crate::config::ClientConfig;
pub use crate::io::{build_text_reader, SelectedFile};
pub use crate::pipeline::{ImportController, ImportError, ImportSession, ImportState};
pub use crate::preview::{parse_preview, preview_from_reader, CsvPreview, PreviewRow};
pub use crate::upload::{HttpSubmitter, Submitter, UploadError, UploadReceipt};
pub use crate::validate::missing_columns;

use thiserror::Error;

/// Columns every import file must carry in its header row.
pub const REQUIRED_COLUMNS: [&str; 10] = [
    "date",
    "longitude",
    "latitude",
    "accident_severity",
    "number_of_vehicles",
    "number_of_casualties",
    "road_type",
    "speed_limit",
    "weather_conditions",
    "light_conditions",
];

/// Maximum number of data rows parsed for display before submission.
pub const PREVIEW_LIMIT: usize = 5;

/// Failure to read a preview out of the selected file.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("file has no header line")]
    Empty,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv_async::Error),
}

pub type ParseResult<T> = std::result::Result<T, ParseError>;
