//! Row-level and cross-field rules applied after normalization.
//!
//! Each rule is a standalone check returning the records it raises; `RecordValidator`
//! runs them in a fixed order and partitions rows into accepted and rejected.

use std::collections::HashSet;

use crate::config::IngestConfig;
use crate::parser::columns::ColumnResolution;
use crate::parser::schema::{FieldKey, SchemaRegistry};
use crate::parser::types::{NormalizedRow, RawTable, ReasonCode, RejectionRecord};

/// Rows that passed every hard rule, in input order.
#[derive(Debug)]
pub struct ValidationOutcome {
    pub accepted: Vec<NormalizedRow>,
    pub rejected_rows: usize,
}

pub struct RecordValidator<'a> {
    registry: &'a SchemaRegistry,
    config: &'a IngestConfig,
    table: &'a RawTable,
    resolution: &'a ColumnResolution,
}

impl<'a> RecordValidator<'a> {
    pub fn new(
        registry: &'a SchemaRegistry,
        config: &'a IngestConfig,
        table: &'a RawTable,
        resolution: &'a ColumnResolution,
    ) -> Self {
        RecordValidator {
            registry,
            config,
            table,
            resolution,
        }
    }

    /// Raw cell text behind `key` on row `index`; empty when the field has no column.
    fn raw(&self, index: usize, key: FieldKey) -> String {
        self.resolution
            .column_of(key)
            .map(|col| self.table.cell(index, col).snapshot())
            .unwrap_or_default()
    }

    /// Every required field must hold a value. Fields already reported as
    /// uncoercible by the normalizer are not reported twice.
    pub fn check_required(&self, row: &NormalizedRow) -> Vec<RejectionRecord> {
        self.registry
            .required()
            .filter(|f| !row.is_present(f.key) && !row.invalid.contains(&f.key))
            .map(|f| {
                RejectionRecord::error(
                    row.index,
                    Some(&f.name),
                    ReasonCode::MissingRequiredField,
                    &self.raw(row.index, f.key),
                )
            })
            .collect()
    }

    /// Resolved Date, when present, must not precede Requested Date.
    pub fn check_date_order(&self, row: &NormalizedRow) -> Option<RejectionRecord> {
        let requested = row.date(FieldKey::RequestedDate)?;
        let resolved = row.date(FieldKey::ResolvedDate)?;
        (resolved < requested).then(|| {
            RejectionRecord::error(
                row.index,
                Some(&self.registry.name_of(FieldKey::ResolvedDate)),
                ReasonCode::ResolvedBeforeRequested,
                &self.raw(row.index, FieldKey::ResolvedDate),
            )
        })
    }

    /// A ticket in a resolved/closed state should say when and by whom.
    /// Absence is a warning only.
    pub fn check_resolution_fields(&self, row: &NormalizedRow) -> Vec<RejectionRecord> {
        let Some(status) = row.text(FieldKey::CurrentStatus) else {
            return Vec::new();
        };
        if !self.config.is_resolved_status(status) {
            return Vec::new();
        }
        [FieldKey::ResolvedDate, FieldKey::ResolvedBy]
            .into_iter()
            .filter(|key| !row.is_present(*key))
            .map(|key| {
                RejectionRecord::warning(
                    row.index,
                    Some(&self.registry.name_of(key)),
                    ReasonCode::MissingResolutionFields,
                    &self.raw(row.index, key),
                )
            })
            .collect()
    }

    /// Apply every rule to `rows`, appending records to `records`.
    pub fn validate(
        &self,
        rows: Vec<NormalizedRow>,
        records: &mut Vec<RejectionRecord>,
    ) -> ValidationOutcome {
        let mut seen = DuplicateTracker::default();
        let mut accepted = Vec::with_capacity(rows.len());
        let mut rejected_rows = 0usize;

        for row in rows {
            let mut errors = self.check_required(&row);
            errors.extend(self.check_date_order(&row));

            if errors.is_empty() && row.invalid.is_empty() {
                if let Some(dup) = seen.check(&row, self) {
                    errors.push(dup);
                }
            }

            let warnings = self.check_resolution_fields(&row);
            let hard_failure = !errors.is_empty() || !row.invalid.is_empty();

            if hard_failure {
                log::debug!(
                    "Row {} rejected: {}",
                    row.index,
                    errors
                        .iter()
                        .map(|e| e.reason.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                );
                rejected_rows += 1;
            }

            records.extend(errors);
            records.extend(warnings);

            if !hard_failure {
                accepted.push(row);
            }
        }

        ValidationOutcome {
            accepted,
            rejected_rows,
        }
    }
}

/// First valid occurrence of each Ticket ID wins; later ones are rejected.
#[derive(Debug, Default)]
struct DuplicateTracker {
    seen: HashSet<String>,
}

impl DuplicateTracker {
    fn check(
        &mut self,
        row: &NormalizedRow,
        validator: &RecordValidator<'_>,
    ) -> Option<RejectionRecord> {
        let id = row.text(FieldKey::TicketId)?;
        if self.seen.insert(id.to_string()) {
            return None;
        }
        Some(RejectionRecord::error(
            row.index,
            Some(&validator.registry.name_of(FieldKey::TicketId)),
            ReasonCode::DuplicateTicketId,
            id,
        ))
    }
}
