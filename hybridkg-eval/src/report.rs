//! Metrics CSV report.

use std::path::Path;
use tracing::info;

use hybridkg_core::{HybridKgError, Result};

use crate::metrics::Metrics;

/// Header of the metrics CSV, in column order.
pub const METRICS_COLUMNS: [&str; 7] = [
    "question_id",
    "precision_all",
    "recall_all",
    "precision_col",
    "recall_col",
    "query_length",
    "order_correctness",
];

/// Render rows (summary row included) as CSV text.
///
/// The header is written even when there are no rows.
pub fn metrics_to_csv(rows: &[Metrics]) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(METRICS_COLUMNS)?;
    for row in rows {
        writer.serialize(row)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| HybridKgError::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| HybridKgError::validation(e.to_string()))
}

/// Write rows to a CSV file.
pub async fn write_metrics_csv<P: AsRef<Path>>(path: P, rows: &[Metrics]) -> Result<()> {
    let path = path.as_ref();
    tokio::fs::write(path, metrics_to_csv(rows)?).await?;
    info!("Wrote {} metric rows to {}", rows.len(), path.display());
    Ok(())
}

/// Read rows back from a metrics CSV file.
pub async fn read_metrics_csv<P: AsRef<Path>>(path: P) -> Result<Vec<Metrics>> {
    let content = tokio::fs::read_to_string(path).await?;
    let mut reader = csv::Reader::from_reader(content.as_bytes());
    reader
        .deserialize()
        .map(|row| row.map_err(HybridKgError::from))
        .collect()
}
