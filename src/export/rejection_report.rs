use rust_xlsxwriter::{Workbook, Worksheet, XlsxError};

use crate::error::AppError;
use crate::export::{
    apply_severity_highlight, create_date_format, create_integer_format, create_percent_format,
    write_header_row, xlsx_err,
};
use crate::parser::types::IngestionReport;

/// Validation report as XLSX: a "Summary" sheet and a "Rejections" sheet listing
/// every record with its spreadsheet line, so the source file can be corrected.
pub fn generate_rejection_report(report: &IngestionReport) -> Result<Vec<u8>, AppError> {
    let mut wb = Workbook::new();
    write_summary(wb.add_worksheet(), report).map_err(xlsx_err)?;
    write_rejections(wb.add_worksheet(), report).map_err(xlsx_err)?;
    wb.save_to_buffer().map_err(xlsx_err)
}

// ── Sheet 1: Summary ──────────────────────────────────────────────────────────

fn write_summary(ws: &mut Worksheet, r: &IngestionReport) -> Result<(), XlsxError> {
    ws.set_name("Summary")?;

    let int = create_integer_format();
    let pct = create_percent_format();
    let date = create_date_format();

    write_header_row(ws, 0, &["Indicator", "Value"])?;

    let outcome = if r.is_aborted() {
        "Aborted: required columns not found"
    } else {
        "Completed"
    };
    ws.write(1, 0, "Outcome")?;
    ws.write(1, 1, outcome)?;

    let counts: &[(&str, usize)] = &[
        ("Rows read", r.total_rows_read),
        ("Accepted", r.accepted_count),
        ("Rejected", r.rejected_count),
        ("Errors", r.errors().count()),
        ("Warnings", r.warnings().count()),
    ];
    let mut row = 2u32;
    for (label, value) in counts {
        ws.write(row, 0, *label)?;
        ws.write_with_format(row, 1, *value as f64, &int)?;
        row += 1;
    }

    if r.total_rows_read > 0 {
        ws.write(row, 0, "Acceptance rate")?;
        ws.write_with_format(
            row,
            1,
            r.accepted_count as f64 / r.total_rows_read as f64,
            &pct,
        )?;
        row += 1;
    }
    ws.write(row, 0, "Evaluated at")?;
    ws.write_datetime_with_format(row, 1, &r.evaluated_at, &date)?;
    row += 1;
    ws.write(row, 0, "Duration (ms)")?;
    ws.write_with_format(row, 1, r.duration_ms as f64, &int)?;
    row += 2;

    // Unresolved fields
    write_header_row(ws, row, &["Unresolved field", "Required"])?;
    row += 1;
    let unresolved_start = row;
    for name in &r.unresolved_required {
        ws.write(row, 0, name.as_str())?;
        ws.write(row, 1, "yes")?;
        row += 1;
    }
    for name in &r.unresolved_optional {
        ws.write(row, 0, name.as_str())?;
        ws.write(row, 1, "no")?;
        row += 1;
    }
    if !r.unresolved_required.is_empty() {
        apply_severity_highlight(ws, unresolved_start, 1, row - 1, "yes", None)?;
    }
    row += 1;

    // Column mapping
    write_header_row(ws, row, &["Field", "Header", "Column", "Match"])?;
    row += 1;
    for a in &r.column_mapping {
        ws.write(row, 0, a.field_name.as_str())?;
        ws.write(row, 1, a.header.as_str())?;
        ws.write_with_format(row, 2, (a.column + 1) as f64, &int)?;
        ws.write(row, 3, format!("{:?}", a.tier))?;
        row += 1;
    }
    row += 1;

    write_header_row(ws, row, &["Ignored header"])?;
    row += 1;
    for h in &r.unmapped_headers {
        ws.write(row, 0, h.as_str())?;
        row += 1;
    }

    ws.set_column_width(0, 28)?;
    ws.set_column_width(1, 28)?;
    ws.set_column_width(2, 10)?;
    ws.set_column_width(3, 16)?;

    Ok(())
}

// ── Sheet 2: Rejections ───────────────────────────────────────────────────────

fn write_rejections(ws: &mut Worksheet, r: &IngestionReport) -> Result<(), XlsxError> {
    ws.set_name("Rejections")?;

    let int = create_integer_format();
    let headers = ["Line", "Field", "Severity", "Reason", "Raw value"];
    write_header_row(ws, 0, &headers)?;

    for (i, rec) in r.records.iter().enumerate() {
        let row = (i + 1) as u32;
        ws.write_with_format(row, 0, rec.line() as f64, &int)?;
        ws.write(row, 1, rec.field.as_deref().unwrap_or(""))?;
        ws.write(row, 2, rec.severity.as_str())?;
        ws.write(row, 3, rec.reason.as_str())?;
        ws.write(row, 4, rec.raw_value.as_str())?;
    }

    if !r.records.is_empty() {
        let last_row = r.records.len() as u32;
        ws.set_freeze_panes(1, 0)?;
        ws.autofilter(0, 0, last_row, (headers.len() - 1) as u16)?;
        apply_severity_highlight(ws, 1, 2, last_row, "error", Some("warning"))?;
    }

    ws.set_column_width(0, 8)?;
    ws.set_column_width(1, 22)?;
    ws.set_column_width(2, 10)?;
    ws.set_column_width(3, 28)?;
    ws.set_column_width(4, 40)?;

    Ok(())
}

// ─── Tests ────────────────────────────────────────────────────────────────────
