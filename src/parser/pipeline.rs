use std::time::Instant;

use chrono::{NaiveDateTime, Utc};

use crate::analyzer::metrics::derive_ticket;
use crate::config::IngestConfig;
use crate::parser::columns::resolve_columns;
use crate::parser::normalizer::normalize_rows;
use crate::parser::schema::SchemaRegistry;
use crate::parser::types::{
    IngestionBatch, IngestionReport, RawTable, ReasonCode, RejectionRecord, Ticket,
};
use crate::parser::validator::RecordValidator;

/// Run one ingestion: resolve columns, normalize, validate, derive metrics.
///
/// Never fails. An input missing a required column yields a batch with no tickets and a
/// report listing the unresolved fields; every row-level problem ends up in the report.
/// `evaluated_at` is the reference time for ticket age and SLA breach.
pub fn ingest(
    table: &RawTable,
    registry: &SchemaRegistry,
    config: &IngestConfig,
    evaluated_at: NaiveDateTime,
) -> IngestionBatch {
    let start = Instant::now();
    let total_rows_read = table.row_count();

    log::info!(
        "Ingestion started: {} rows, {} columns",
        total_rows_read,
        table.headers.len()
    );

    // Phase 1: columns
    let resolution = resolve_columns(&table.headers, registry);

    if !resolution.is_complete() {
        log::warn!(
            "Ingestion aborted, unresolved required fields: {}",
            resolution.unresolved_required.join(", ")
        );
        return IngestionBatch {
            tickets: Vec::new(),
            report: IngestionReport {
                total_rows_read,
                accepted_count: 0,
                rejected_count: 0,
                records: Vec::new(),
                unresolved_required: resolution.unresolved_required,
                unresolved_optional: resolution.unresolved_optional,
                column_mapping: resolution.assignments,
                unmapped_headers: resolution.unmapped_headers,
                evaluated_at,
                duration_ms: start.elapsed().as_millis() as u64,
            },
        };
    }

    // Phase 2: values
    let mut records = Vec::new();
    let rows = normalize_rows(table, &resolution, registry, config, &mut records);

    // Phase 3: rules
    let validator = RecordValidator::new(registry, config, table, &resolution);
    let outcome = validator.validate(rows, &mut records);
    let mut rejected_rows = outcome.rejected_rows;

    // Phase 4: derived metrics
    let mut tickets: Vec<Ticket> = Vec::with_capacity(outcome.accepted.len());
    for row in &outcome.accepted {
        match derive_ticket(row, config, evaluated_at) {
            Ok(ticket) => tickets.push(ticket),
            Err(key) => {
                let raw = resolution
                    .column_of(key)
                    .map(|col| table.cell(row.index, col).snapshot())
                    .unwrap_or_default();
                log::debug!("Row {} rejected: unusable {:?}", row.index, key);
                records.push(RejectionRecord::error(
                    row.index,
                    Some(&registry.name_of(key)),
                    ReasonCode::UnusableRequiredValue,
                    &raw,
                ));
                rejected_rows += 1;
            }
        }
    }

    // Row order; within a row, value problems come before rule violations.
    records.sort_by_key(|r| r.row_index);

    if rejected_rows > 0 {
        log::warn!("{} of {} rows rejected", rejected_rows, total_rows_read);
    }

    let report = IngestionReport {
        total_rows_read,
        accepted_count: tickets.len(),
        rejected_count: rejected_rows,
        records,
        unresolved_required: Vec::new(),
        unresolved_optional: resolution.unresolved_optional,
        column_mapping: resolution.assignments,
        unmapped_headers: resolution.unmapped_headers,
        evaluated_at,
        duration_ms: start.elapsed().as_millis() as u64,
    };

    log::info!(
        "Ingestion done: {} accepted, {} rejected, {} warnings in {} ms",
        report.accepted_count,
        report.rejected_count,
        report.warnings().count(),
        report.duration_ms
    );

    IngestionBatch { tickets, report }
}

/// `ingest` evaluated against the current UTC time.
pub fn ingest_now(
    table: &RawTable,
    registry: &SchemaRegistry,
    config: &IngestConfig,
) -> IngestionBatch {
    ingest(table, registry, config, Utc::now().naive_utc())
}

// ─── Tests ────────────────────────────────────────────────────────────────────
