use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};

use crate::error::AppError;
use crate::export::{
    apply_severity_highlight, create_date_format, create_integer_format, write_header_row,
    xlsx_err,
};
use crate::parser::schema::FieldKey;
use crate::parser::types::Ticket;

/// Text columns written after the fixed ones, in this order.
const TEXT_FIELDS: &[(FieldKey, &str)] = &[
    (FieldKey::ResolvedBy, "Resolved By"),
    (FieldKey::Priority, "Priority"),
    (FieldKey::CompanyName, "Company Name"),
    (FieldKey::BranchName, "Branch Name"),
    (FieldKey::TicketCategory, "Ticket Category"),
    (FieldKey::TicketSubCategory, "Ticket Sub Category"),
    (FieldKey::Subject, "Subject"),
    (FieldKey::Requester, "Requester"),
    (FieldKey::TicketType, "Ticket Type"),
    (FieldKey::DepartmentName, "Department Name"),
    (FieldKey::Sla, "SLA"),
];

/// Accepted tickets with their derived metrics, one row per ticket.
pub fn generate_ticket_export(tickets: &[Ticket]) -> Result<Vec<u8>, AppError> {
    let mut wb = Workbook::new();
    write_tickets(wb.add_worksheet(), tickets).map_err(xlsx_err)?;
    wb.save_to_buffer().map_err(xlsx_err)
}

fn write_opt_date(
    ws: &mut Worksheet,
    row: u32,
    col: u16,
    value: Option<&chrono::NaiveDateTime>,
    fmt: &Format,
) -> Result<(), XlsxError> {
    if let Some(dt) = value {
        ws.write_datetime_with_format(row, col, dt, fmt)?;
    }
    Ok(())
}

fn write_tickets(ws: &mut Worksheet, tickets: &[Ticket]) -> Result<(), XlsxError> {
    ws.set_name("Tickets")?;

    let date = create_date_format();
    let int = create_integer_format();

    let mut headers = vec![
        "Ticket ID",
        "Current Status",
        "State",
        "AssignedTo",
        "Requested Date",
        "Resolved Date",
        "Resolution (days)",
        "Age (days)",
        "SLA Breached",
    ];
    let first_text_col = headers.len() as u16;
    headers.extend(TEXT_FIELDS.iter().map(|(_, name)| *name));
    write_header_row(ws, 0, &headers)?;

    for (i, t) in tickets.iter().enumerate() {
        let row = (i + 1) as u32;
        ws.write(row, 0, t.ticket_id.as_str())?;
        ws.write(row, 1, t.status.label.as_str())?;
        ws.write(row, 2, t.state.as_str())?;
        ws.write(row, 3, t.assigned_to.as_str())?;
        ws.write_datetime_with_format(row, 4, &t.requested_date, &date)?;
        write_opt_date(ws, row, 5, t.resolved_date.as_ref(), &date)?;
        if let Some(d) = t.resolution_days {
            ws.write_with_format(row, 6, d as f64, &int)?;
        }
        if let Some(d) = t.age_days {
            ws.write_with_format(row, 7, d as f64, &int)?;
        }
        ws.write(row, 8, if t.sla_breached { "yes" } else { "no" })?;

        for (offset, (key, _)) in TEXT_FIELDS.iter().enumerate() {
            if let Some(value) = t.field_text(*key) {
                ws.write(row, first_text_col + offset as u16, value)?;
            }
        }
    }

    if !tickets.is_empty() {
        let last_row = tickets.len() as u32;
        ws.set_freeze_panes(1, 1)?;
        ws.autofilter(0, 0, last_row, (headers.len() - 1) as u16)?;
        apply_severity_highlight(ws, 1, 8, last_row, "yes", None)?;
    }

    ws.set_column_width(0, 14)?;
    ws.set_column_width(1, 16)?;
    ws.set_column_width(3, 22)?;
    ws.set_column_width(4, 18)?;
    ws.set_column_width(5, 18)?;
    for col in first_text_col..headers.len() as u16 {
        ws.set_column_width(col, 20)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::summary::tests::ticket;
    use crate::parser::types::{EnumValue, TicketState};
    use chrono::NaiveDate;

    #[test]
    fn test_ticket_export_xlsx_signature() {
        let requested = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let mut closed = ticket("T-1", "Closed", TicketState::Resolved, requested);
        closed.resolved_date = Some(requested + chrono::Duration::days(3));
        closed.resolution_days = Some(3);
        closed.priority = Some(EnumValue::known("High"));
        closed.company_name = Some("Acme".into());
        let mut open = ticket("T-2", "Open", TicketState::Pending, requested);
        open.age_days = Some(45);
        open.sla_breached = true;

        let bytes = generate_ticket_export(&[closed, open]).unwrap();
        assert!(bytes.len() > 4);
        assert_eq!(bytes[0], 0x50);
        assert_eq!(bytes[1], 0x4B);
    }

    #[test]
    fn test_ticket_export_empty() {
        let bytes = generate_ticket_export(&[]).unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }
}
