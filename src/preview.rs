//! Bounded CSV preview: header line plus the first few data rows.

use csv_async::{AsyncReaderBuilder, StringRecord};
use std::collections::BTreeMap;
use tokio::io::AsyncRead;

use crate::io::SelectedFile;
use crate::{ParseError, ParseResult};

/// One data row keyed by header name. Values are raw; nothing is coerced.
pub type PreviewRow = BTreeMap<String, String>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvPreview {
    pub header: Vec<String>,
    pub rows: Vec<PreviewRow>,
}

/// Parse the header and at most `limit` data rows of `file`.
pub async fn parse_preview(file: &SelectedFile, limit: usize) -> ParseResult<CsvPreview> {
    let reader = file.text_reader().await?;
    preview_from_reader(reader, limit).await
}

/// Preview over any UTF-8 byte stream. Stops reading once `limit` rows are in hand.
pub async fn preview_from_reader<R>(reader: R, limit: usize) -> ParseResult<CsvPreview>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut rdr = AsyncReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .create_reader(reader);

    let header: Vec<String> = rdr.headers().await?.iter().map(str::to_owned).collect();
    if header.is_empty() {
        return Err(ParseError::Empty);
    }

    let mut rows = Vec::with_capacity(limit.min(crate::PREVIEW_LIMIT));
    let mut record = StringRecord::new();
    while rows.len() < limit && rdr.read_record(&mut record).await? {
        rows.push(zip_row(&header, &record));
    }

    Ok(CsvPreview { header, rows })
}

// Short rows leave trailing columns absent; surplus fields are dropped.
fn zip_row(header: &[String], record: &StringRecord) -> PreviewRow {
    header
        .iter()
        .zip(record.iter())
        .map(|(column, value)| (column.clone(), value.to_owned()))
        .collect()
}
