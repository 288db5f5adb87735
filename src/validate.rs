//! Required-column check over a parsed header row.

use std::collections::BTreeSet;

use crate::REQUIRED_COLUMNS;

/// Required names absent from `header`. Matching is exact and case-sensitive.
pub fn missing_columns<S: AsRef<str>>(header: &[S], required: &[&str]) -> BTreeSet<String> {
    let present: BTreeSet<&str> = header.iter().map(|h| h.as_ref()).collect();
    required
        .iter()
        .filter(|column| !present.contains(*column))
        .map(|column| column.to_string())
        .collect()
}

/// Whether `column` belongs to the fixed import column set.
pub fn is_required_column(column: &str) -> bool {
    REQUIRED_COLUMNS.contains(&column)
}
