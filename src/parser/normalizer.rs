//! Per-cell coercion of raw values to each logical field's declared type.

use crate::config::IngestConfig;
use crate::parser::columns::ColumnResolution;
use crate::parser::deserializers::{canonical_identifier, cell_text, parse_date_cell};
use crate::parser::schema::{FieldKind, LogicalField, SchemaRegistry};
use crate::parser::types::{
    EnumValue, FieldValue, NormalizedRow, RawCell, RawTable, ReasonCode, RejectionRecord,
};

/// Result of coercing one cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellOutcome {
    Value(FieldValue),
    /// Kept as-is but reported (unrecognized enumerated value).
    Flagged(FieldValue, ReasonCode),
    /// Could not be coerced; the field is left unset.
    Failed(ReasonCode),
}

/// Coerce a single raw cell according to `field.kind`.
pub fn normalize_value(field: &LogicalField, cell: &RawCell, config: &IngestConfig) -> CellOutcome {
    if cell.is_blank() {
        return CellOutcome::Value(FieldValue::Empty);
    }

    match field.kind {
        FieldKind::Text => CellOutcome::Value(
            cell_text(cell)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .map_or(FieldValue::Empty, FieldValue::Text),
        ),
        FieldKind::FreeText => {
            CellOutcome::Value(cell_text(cell).map_or(FieldValue::Empty, FieldValue::Text))
        }
        FieldKind::Identifier => CellOutcome::Value(
            canonical_identifier(cell).map_or(FieldValue::Empty, FieldValue::Text),
        ),
        FieldKind::Date => match parse_date_cell(cell) {
            Some(dt) => CellOutcome::Value(FieldValue::Date(dt)),
            None => CellOutcome::Failed(ReasonCode::UnparseableDate),
        },
        FieldKind::Enum(domain) => {
            let raw = cell_text(cell).unwrap_or_default();
            let raw = raw.trim();
            match config.vocabulary(domain).lookup(raw) {
                Some(label) => CellOutcome::Value(FieldValue::Enum(EnumValue::known(label))),
                None => CellOutcome::Flagged(
                    FieldValue::Enum(EnumValue::unknown(raw)),
                    ReasonCode::UnrecognizedValue,
                ),
            }
        }
    }
}

/// Normalize one source row, appending any cell-level records to `records`.
///
/// Unparseable dates are errors for required fields and warnings for optional ones;
/// in both cases the field is left unset.
pub fn normalize_row(
    table: &RawTable,
    row_index: usize,
    resolution: &ColumnResolution,
    registry: &SchemaRegistry,
    config: &IngestConfig,
    records: &mut Vec<RejectionRecord>,
) -> NormalizedRow {
    let mut row = NormalizedRow::new(row_index);

    for assignment in &resolution.assignments {
        let Some(field) = registry.field(assignment.field) else {
            continue;
        };
        let cell = table.cell(row_index, assignment.column);

        match normalize_value(field, cell, config) {
            CellOutcome::Value(FieldValue::Empty) => {}
            CellOutcome::Value(value) => {
                row.values.insert(field.key, value);
            }
            CellOutcome::Flagged(value, reason) => {
                records.push(RejectionRecord::warning(
                    row_index,
                    Some(&field.name),
                    reason,
                    &cell.snapshot(),
                ));
                row.values.insert(field.key, value);
            }
            CellOutcome::Failed(reason) => {
                if field.required {
                    row.invalid.insert(field.key);
                    records.push(RejectionRecord::error(
                        row_index,
                        Some(&field.name),
                        reason,
                        &cell.snapshot(),
                    ));
                } else {
                    records.push(RejectionRecord::warning(
                        row_index,
                        Some(&field.name),
                        reason,
                        &cell.snapshot(),
                    ));
                }
            }
        }
    }

    row
}

/// Normalize every row of `table`, preserving row order.
pub fn normalize_rows(
    table: &RawTable,
    resolution: &ColumnResolution,
    registry: &SchemaRegistry,
    config: &IngestConfig,
    records: &mut Vec<RejectionRecord>,
) -> Vec<NormalizedRow> {
    (0..table.row_count())
        .map(|i| normalize_row(table, i, resolution, registry, config, records))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::columns::resolve_columns;
    use crate::parser::schema::FieldKey;
    use crate::parser::types::Severity;
    use chrono::NaiveDate;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::ticket_schema()
    }

    fn field(key: FieldKey) -> LogicalField {
        registry().field(key).unwrap().clone()
    }

    fn text(s: &str) -> RawCell {
        RawCell::Text(s.to_string())
    }

    fn normalize(key: FieldKey, cell: &RawCell) -> CellOutcome {
        normalize_value(&field(key), cell, &IngestConfig::default())
    }

    // ── text ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_text_trimmed() {
        let out = normalize(FieldKey::AssignedTo, &text("  J. Doe "));
        assert_eq!(out, CellOutcome::Value(FieldValue::Text("J. Doe".into())));
    }

    #[test]
    fn test_blank_and_empty_are_empty() {
        let config = IngestConfig::default();
        for cell in [RawCell::Empty, text(""), text("   ")] {
            assert_eq!(
                normalize_value(&field(FieldKey::AssignedTo), &cell, &config),
                CellOutcome::Value(FieldValue::Empty)
            );
        }
    }

    #[test]
    fn test_free_text_untouched() {
        let out = normalize_value(
            &field(FieldKey::Description),
            &text("  line one\nline two  "),
            &IngestConfig::default(),
        );
        assert_eq!(
            out,
            CellOutcome::Value(FieldValue::Text("  line one\nline two  ".into()))
        );
    }

    #[test]
    fn test_numeric_cell_in_text_field() {
        let out = normalize(FieldKey::BranchName, &RawCell::Number(12.0));
        assert_eq!(out, CellOutcome::Value(FieldValue::Text("12".into())));
    }

    // ── identifiers ──────────────────────────────────────────────────────────

    #[test]
    fn test_identifier_from_number() {
        let out = normalize(FieldKey::TicketId, &RawCell::Number(1001.0));
        assert_eq!(out, CellOutcome::Value(FieldValue::Text("1001".into())));
    }

    // ── enums ────────────────────────────────────────────────────────────────

    #[test]
    fn test_enum_known_case_insensitive() {
        let out = normalize(FieldKey::CurrentStatus, &text("CLOSED"));
        assert_eq!(
            out,
            CellOutcome::Value(FieldValue::Enum(EnumValue::known("Closed")))
        );
    }

    #[test]
    fn test_enum_unknown_kept_and_flagged() {
        let out = normalize(FieldKey::Priority, &text(" Whenever "));
        assert_eq!(
            out,
            CellOutcome::Flagged(
                FieldValue::Enum(EnumValue::unknown("Whenever")),
                ReasonCode::UnrecognizedValue
            )
        );
    }

    #[test]
    fn test_enum_vocabulary_override() {
        let mut config = IngestConfig::default();
        config.priority_vocabulary = crate::config::Vocabulary::new(&[("Whenever", &[])]);
        let out = normalize_value(&field(FieldKey::Priority), &text("whenever"), &config);
        assert_eq!(
            out,
            CellOutcome::Value(FieldValue::Enum(EnumValue::known("Whenever")))
        );
    }

    // ── dates ────────────────────────────────────────────────────────────────

    #[test]
    fn test_date_parsed() {
        let out = normalize(FieldKey::RequestedDate, &text("2024-01-05"));
        let expected = NaiveDate::from_ymd_opt(2024, 1, 5)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(out, CellOutcome::Value(FieldValue::Date(expected)));
    }

    #[test]
    fn test_date_unparseable() {
        let out = normalize(FieldKey::RequestedDate, &text("someday"));
        assert_eq!(out, CellOutcome::Failed(ReasonCode::UnparseableDate));
    }

    // ── rows ─────────────────────────────────────────────────────────────────

    fn table_and_resolution(headers: &[&str], rows: &[&[&str]]) -> (RawTable, ColumnResolution) {
        let table = RawTable::from_strings(headers, rows);
        let resolution = resolve_columns(&table.headers, &registry());
        (table, resolution)
    }

    #[test]
    fn test_required_bad_date_is_error_and_marks_invalid() {
        let (table, res) = table_and_resolution(
            &["Ticket ID", "Status", "AssignedTo", "Requested Date"],
            &[&["T-1", "Open", "Ann", "yesterday"]],
        );
        let mut records = Vec::new();
        let config = IngestConfig::default();
        let row = normalize_row(&table, 0, &res, &registry(), &config, &mut records);
        assert!(row.invalid.contains(&FieldKey::RequestedDate));
        assert!(!row.is_present(FieldKey::RequestedDate));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].severity, Severity::Error);
        assert_eq!(records[0].reason, ReasonCode::UnparseableDate);
        assert_eq!(records[0].field.as_deref(), Some("Requested Date"));
        assert_eq!(records[0].raw_value, "yesterday");
    }

    #[test]
    fn test_optional_bad_date_is_warning_and_unset() {
        let (table, res) = table_and_resolution(
            &["Ticket ID", "Status", "AssignedTo", "Requested Date", "Resolved Date"],
            &[&["T-1", "Open", "Ann", "2024-01-05", "n/a"]],
        );
        let mut records = Vec::new();
        let config = IngestConfig::default();
        let row = normalize_row(&table, 0, &res, &registry(), &config, &mut records);
        assert!(row.invalid.is_empty());
        assert!(row.date(FieldKey::ResolvedDate).is_none());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].severity, Severity::Warning);
        assert_eq!(records[0].reason, ReasonCode::UnparseableDate);
    }

    #[test]
    fn test_unresolved_optional_fields_stay_empty() {
        let (table, res) = table_and_resolution(
            &["Ticket ID", "Status", "AssignedTo", "Requested Date"],
            &[&["T-1", "Open", "Ann", "2024-01-05"]],
        );
        let mut records = Vec::new();
        let config = IngestConfig::default();
        let rows = normalize_rows(&table, &res, &registry(), &config, &mut records);
        assert_eq!(rows.len(), 1);
        assert!(records.is_empty());
        assert_eq!(rows[0].text(FieldKey::TicketId), Some("T-1"));
        assert!(!rows[0].is_present(FieldKey::CompanyName));
    }

    #[test]
    fn test_short_row_reads_as_empty() {
        let (table, res) = table_and_resolution(
            &["Ticket ID", "Status", "AssignedTo", "Requested Date"],
            &[&["T-1", "Open"]],
        );
        let mut records = Vec::new();
        let config = IngestConfig::default();
        let row = normalize_row(&table, 0, &res, &registry(), &config, &mut records);
        assert!(!row.is_present(FieldKey::AssignedTo));
        assert!(!row.is_present(FieldKey::RequestedDate));
        assert!(row.invalid.is_empty());
    }
}
