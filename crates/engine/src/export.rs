//! CSV export of ledger entries.
//!
//! Free-text cells are escaped by hand so that anything a spreadsheet could
//! read as a formula (`=`, `+`, `-`, `@`) ends up quoted; the csv writer itself
//! never adds quotes.

use std::{
    fs::File,
    io::Write,
    path::{Path, PathBuf},
};

use chrono::NaiveDate;
use csv::{QuoteStyle, Terminator, WriterBuilder};

use crate::Entry;

pub const CSV_HEADER: [&str; 5] = ["Date", "Tenant", "Amount", "Category", "Description"];

/// Escape a free-text cell: double embedded quotes, and wrap the cell in
/// quotes when it holds a delimiter, a formula trigger, a quote or a line
/// break.
pub fn escape_cell(cell: &str) -> String {
    let escaped = cell.replace('"', "\"\"");
    let needs_quotes = escaped
        .chars()
        .any(|c| matches!(c, ',' | '=' | '+' | '-' | '@' | '"' | '\n' | '\r'));
    if needs_quotes {
        format!("\"{escaped}\"")
    } else {
        escaped
    }
}

/// Write the header and one row per entry to `writer`.
pub fn write_csv<W: Write>(writer: W, entries: &[Entry]) -> csv::Result<()> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Never)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(writer);

    writer.write_record(CSV_HEADER)?;
    for entry in entries {
        writer.write_record([
            entry.date.format("%Y-%m-%d").to_string(),
            escape_cell(&entry.tenant),
            entry.amount.to_string(),
            entry.category.as_str().to_string(),
            escape_cell(&entry.description),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Render the export in memory. An empty list yields the header alone.
pub fn to_csv(entries: &[Entry]) -> String {
    let mut buffer = Vec::new();
    if let Err(err) = write_csv(&mut buffer, entries) {
        tracing::error!("failed to render csv export: {err}");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// `tenant-ledger-<yyyy-MM-dd>.csv`
pub fn export_filename(date: NaiveDate) -> String {
    format!("tenant-ledger-{}.csv", date.format("%Y-%m-%d"))
}

/// Write the export into `dir` under [`export_filename`] and return the path.
pub fn export_to_dir(dir: &Path, date: NaiveDate, entries: &[Entry]) -> csv::Result<PathBuf> {
    let path = dir.join(export_filename(date));
    let file = File::create(&path)?;
    write_csv(file, entries)?;
    tracing::info!("exported {} entries to {}", entries.len(), path.display());
    Ok(path)
}
