use std::path::Path;

use anyhow::{Context, Result};

/// Writes a report as CSV: one header band row, then `rows` as given (the
/// first of which is normally the column names).
pub fn write_table(path: &Path, header_band: &[&str], rows: &[Vec<String>]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    writer.write_record(header_band)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", path.display()))?;

    tracing::info!(path = %path.display(), rows = rows.len(), "wrote report");
    Ok(())
}
