//! CSV export of the filtered match set. The document is deterministic for
//! a given mask: fixed header, one row per masked record in mask order.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::domain::GmvError;
use crate::record::{Field, MatchRecord};

/// Quote a cell when it carries a separator, quote or line break; embedded
/// quotes are doubled (RFC 4180).
pub fn escape_cell(value: &str) -> String {
    let needs_quoting = value.chars().any(|c| matches!(c, ',' | '"' | '\n' | '\r'));
    if !needs_quoting {
        return value.to_string();
    }
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if c == '"' {
            out.push('"');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// One record as a CSV line over the fixed field set, without terminator.
pub fn csv_row(record: &MatchRecord) -> String {
    Field::ALL
        .iter()
        .map(|&f| escape_cell(record.field(f)))
        .collect::<Vec<String>>()
        .join(",")
}

pub fn csv_header() -> String {
    Field::ALL
        .iter()
        .map(|f| f.name().to_string())
        .collect::<Vec<String>>()
        .join(",")
}

/// Serialize the masked records. Callers pass the full filtered mask, not a
/// page slice; the export always covers the whole matching set.
pub fn to_csv_string(records: &[MatchRecord], rows: &[usize]) -> String {
    let mut out = String::new();
    out.push_str(&csv_header());
    out.push('\n');
    for &ridx in rows {
        out.push_str(&csv_row(&records[ridx]));
        out.push('\n');
    }
    out
}

/// Write the filtered set to disk. This is the one side effect of the
/// pipeline; nothing downstream consumes its result.
pub fn export_csv(records: &[MatchRecord], rows: &[usize], path: &Path) -> Result<(), GmvError> {
    let doc = to_csv_string(records, rows);
    fs::write(path, doc)?;
    info!("Exported {} rows to {}", rows.len(), path.display());
    Ok(())
}
