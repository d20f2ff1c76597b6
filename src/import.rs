use std::path::Path;
use std::time::Instant;

use rusqlite::Connection;
use serde::Serialize;

use crate::config::get_config_from_db;
use crate::db::{record_import, upsert_tickets};
use crate::error::AppError;
use crate::parser::pipeline::ingest_now;
use crate::parser::schema::SchemaRegistry;
use crate::parser::types::IngestionReport;
use crate::reader::read_table;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub import_id: i64,
    pub filename: String,
    /// Tickets written to the store; zero for an aborted run.
    pub stored_tickets: usize,
    pub report: IngestionReport,
    pub duration_ms: u64,
}

/// Read a CSV or spreadsheet export, ingest it with the stored configuration, and persist
/// the run summary plus the accepted tickets.
///
/// The run is recorded even when it aborts on unresolved required columns, so the
/// history shows why nothing was stored.
pub fn import_file(
    conn: &mut Connection,
    path: impl AsRef<Path>,
) -> Result<ImportResult, AppError> {
    let start = Instant::now();
    let path = path.as_ref();

    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| path.display().to_string());

    let table = read_table(path)?;
    let config = get_config_from_db(conn)?;
    let batch = ingest_now(&table, &SchemaRegistry::ticket_schema(), &config);

    let import_id = record_import(conn, &filename, &batch.report)?;
    let stored_tickets = if batch.report.is_aborted() {
        0
    } else {
        upsert_tickets(conn, import_id, &batch.tickets)?
    };

    let duration_ms = start.elapsed().as_millis() as u64;
    log::info!(
        "Import {} ({}): {} tickets stored in {}ms",
        import_id,
        filename,
        stored_tickets,
        duration_ms
    );

    Ok(ImportResult {
        import_id,
        filename,
        stored_tickets,
        report: batch.report,
        duration_ms,
    })
}
