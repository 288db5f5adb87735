//! Downloadable CSV template: the required header and one example row.

use std::io;
use std::path::{Path, PathBuf};

use crate::REQUIRED_COLUMNS;

pub const TEMPLATE_FILE_NAME: &str = "accidents_template.csv";

/// One row of plausible values, in `REQUIRED_COLUMNS` order.
const EXAMPLE_ROW: [&str; 10] = [
    "2024-01-01",
    "-0.1276",
    "51.5074",
    "2",
    "2",
    "1",
    "Single carriageway",
    "30",
    "Fine without high winds",
    "Daylight: Street light present",
];

pub fn template_csv() -> String {
    format!("{}\n{}\n", REQUIRED_COLUMNS.join(","), EXAMPLE_ROW.join(","))
}

/// Write the template into `dir`, replacing any earlier copy.
pub async fn write_template(dir: &Path) -> io::Result<PathBuf> {
    let path = dir.join(TEMPLATE_FILE_NAME);
    tokio::fs::write(&path, template_csv()).await?;
    Ok(path)
}
