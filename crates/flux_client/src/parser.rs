//! Tabular response parser.
//!
//! The query endpoint answers with delimited text: one header line
//! naming the columns, then one line per row. Fields may be wrapped in
//! quotes; a delimiter inside quotes is content, a doubled quote is a
//! literal quote. Annotation lines (leading `#`) and blank lines are
//! skipped. Rows whose field count differs from the header are dropped
//! rather than padded — a malformed row must never shift columns.

use std::collections::HashMap;

use chrono::{DateTime, TimeZone, Utc};
use common::{TableRow, TimeSeriesPoint, Value};
use tracing::debug;

/// Field splitting options.
#[derive(Debug, Clone, Copy)]
pub struct ParseOptions {
    pub delimiter: char,
    pub quote: char,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            delimiter: ',',
            quote: '"',
        }
    }
}

/// Parse a raw tabular payload into rows.
///
/// Empty input, or input with only a header, yields an empty vec —
/// "no data" is a valid response, not an error.
pub fn parse(raw: &str, opts: &ParseOptions) -> Vec<TableRow> {
    let mut header: Option<Vec<String>> = None;
    let mut rows = Vec::new();

    for line in raw.lines() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }

        let fields = split_record(line, opts);
        match &header {
            None => header = Some(fields),
            Some(columns) => {
                if fields.len() != columns.len() {
                    debug!(
                        "dropping row with {} fields (header has {})",
                        fields.len(),
                        columns.len()
                    );
                    continue;
                }
                let cells = columns
                    .iter()
                    .cloned()
                    .zip(fields.iter().map(|f| Value::coerce(f)))
                    .collect();
                rows.push(TableRow::from_cells(cells));
            }
        }
    }

    rows
}

/// Split one line into fields, honoring quoting.
fn split_record(line: &str, opts: &ParseOptions) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == opts.quote {
                if chars.peek() == Some(&opts.quote) {
                    // Doubled quote inside a quoted field.
                    current.push(opts.quote);
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(c);
            }
        } else if c == opts.quote {
            in_quotes = true;
        } else if c == opts.delimiter {
            fields.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    fields.push(current);

    fields
}

/// Group rows by the value of one column.
///
/// Rows missing the column are skipped. Within each group, row order is
/// preserved.
pub fn group_by(rows: &[TableRow], key: &str) -> HashMap<String, Vec<TableRow>> {
    let mut groups: HashMap<String, Vec<TableRow>> = HashMap::new();
    for row in rows {
        if let Some(value) = row.get(key) {
            groups.entry(value.to_string()).or_default().push(row.clone());
        }
    }
    groups
}

/// Pivot one-row-per-field samples into one point per timestamp.
///
/// `row_key` names the timestamp column, `column_key` the column whose
/// value becomes the field name, `value_column` the numeric value.
/// Rows with a missing or unparseable timestamp, field name or value
/// are skipped. Points come back in first-appearance order of their
/// timestamps.
pub fn pivot(
    rows: &[TableRow],
    row_key: &str,
    column_key: &str,
    value_column: &str,
) -> Vec<TimeSeriesPoint> {
    let mut points: Vec<TimeSeriesPoint> = Vec::new();
    let mut index: HashMap<DateTime<Utc>, usize> = HashMap::new();

    for row in rows {
        let Some(timestamp) = row.get(row_key).and_then(parse_timestamp) else {
            continue;
        };
        let Some(field) = row.get(column_key).map(|v| v.to_string()) else {
            continue;
        };
        let Some(value) = row.get(value_column).and_then(Value::as_f64) else {
            continue;
        };

        let slot = *index.entry(timestamp).or_insert_with(|| {
            points.push(TimeSeriesPoint::new(timestamp));
            points.len() - 1
        });
        points[slot].fields.insert(field, value);
    }

    points
}

/// Convert already-pivoted rows (one column per field) into points.
///
/// Every numeric column except the timestamp column becomes a field.
pub fn flat_points(rows: &[TableRow], time_column: &str) -> Vec<TimeSeriesPoint> {
    let mut points = Vec::new();
    for row in rows {
        let Some(timestamp) = row.get(time_column).and_then(parse_timestamp) else {
            continue;
        };
        let mut point = TimeSeriesPoint::new(timestamp);
        for (name, value) in row.iter() {
            if name == time_column {
                continue;
            }
            if let Some(n) = value.as_f64() {
                point.fields.insert(name.to_string(), n);
            }
        }
        points.push(point);
    }
    points
}

/// Parse an RFC 3339 string or unix-seconds number into a UTC instant.
fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Str(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Num(n) => Utc.timestamp_opt(*n as i64, 0).single(),
        Value::Bool(_) => None,
    }
}
