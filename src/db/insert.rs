use chrono::NaiveDateTime;
use rusqlite::Connection;

use crate::db::DB_DATETIME_FORMAT;
use crate::parser::types::{IngestionReport, Ticket};

fn fmt_dt(dt: &NaiveDateTime) -> String {
    dt.format(DB_DATETIME_FORMAT).to_string()
}

/// Store the run summary and every rejection record; returns the new import id.
/// The new import becomes the active one.
pub fn record_import(
    conn: &mut Connection,
    filename: &str,
    report: &IngestionReport,
) -> Result<i64, rusqlite::Error> {
    let tx = conn.transaction()?;

    tx.execute("UPDATE imports SET is_active = 0 WHERE is_active = 1", [])?;
    tx.execute(
        "INSERT INTO imports (
            filename, evaluated_at, total_rows, accepted_count, rejected_count, warning_count,
            unresolved_required, unmapped_headers, column_mapping, duration_ms, is_active
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 1)",
        rusqlite::params![
            filename,
            fmt_dt(&report.evaluated_at),
            report.total_rows_read as i64,
            report.accepted_count as i64,
            report.rejected_count as i64,
            report.warnings().count() as i64,
            serde_json::to_string(&report.unresolved_required).unwrap_or_default(),
            serde_json::to_string(&report.unmapped_headers).unwrap_or_default(),
            serde_json::to_string(&report.column_mapping).unwrap_or_default(),
            report.duration_ms as i64,
        ],
    )?;
    let import_id = tx.last_insert_rowid();

    {
        let mut stmt = tx.prepare_cached(
            "INSERT INTO rejections (import_id, row_index, field, reason, severity, raw_value)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for r in &report.records {
            stmt.execute(rusqlite::params![
                import_id,
                r.row_index as i64,
                r.field,
                r.reason.as_str(),
                r.severity.as_str(),
                r.raw_value,
            ])?;
        }
    }

    tx.commit()?;
    Ok(import_id)
}

/// Insert or update tickets keyed by Ticket ID, in one transaction.
pub fn upsert_tickets(
    conn: &mut Connection,
    import_id: i64,
    tickets: &[Ticket],
) -> Result<usize, rusqlite::Error> {
    let tx = conn.transaction()?;

    {
        let mut stmt = tx.prepare_cached(
            "INSERT INTO tickets (
                ticket_id, import_id, status, status_known, assigned_to,
                requested_date, resolved_date, resolved_by, priority, priority_known,
                company_name, branch_name, ticket_category, ticket_sub_category,
                subject, description, requester, created_user, ticket_type, department_name,
                sla, assign_from, assigned_date, last_comment, last_remark,
                state, resolution_days, age_days, sla_breached
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5,
                ?6, ?7, ?8, ?9, ?10,
                ?11, ?12, ?13, ?14,
                ?15, ?16, ?17, ?18, ?19, ?20,
                ?21, ?22, ?23, ?24, ?25,
                ?26, ?27, ?28, ?29
            )
            ON CONFLICT(ticket_id) DO UPDATE SET
                import_id = excluded.import_id,
                status = excluded.status,
                status_known = excluded.status_known,
                assigned_to = excluded.assigned_to,
                requested_date = excluded.requested_date,
                resolved_date = excluded.resolved_date,
                resolved_by = excluded.resolved_by,
                priority = excluded.priority,
                priority_known = excluded.priority_known,
                company_name = excluded.company_name,
                branch_name = excluded.branch_name,
                ticket_category = excluded.ticket_category,
                ticket_sub_category = excluded.ticket_sub_category,
                subject = excluded.subject,
                description = excluded.description,
                requester = excluded.requester,
                created_user = excluded.created_user,
                ticket_type = excluded.ticket_type,
                department_name = excluded.department_name,
                sla = excluded.sla,
                assign_from = excluded.assign_from,
                assigned_date = excluded.assigned_date,
                last_comment = excluded.last_comment,
                last_remark = excluded.last_remark,
                state = excluded.state,
                resolution_days = excluded.resolution_days,
                age_days = excluded.age_days,
                sla_breached = excluded.sla_breached,
                updated_at = datetime('now')",
        )?;

        for t in tickets {
            stmt.execute(rusqlite::params![
                t.ticket_id,
                import_id,
                t.status.label,
                t.status.known as i32,
                t.assigned_to,
                fmt_dt(&t.requested_date),
                t.resolved_date.as_ref().map(fmt_dt),
                t.resolved_by,
                t.priority.as_ref().map(|p| p.label.clone()),
                t.priority.as_ref().map(|p| p.known as i32),
                t.company_name,
                t.branch_name,
                t.ticket_category,
                t.ticket_sub_category,
                t.subject,
                t.description,
                t.requester,
                t.created_user,
                t.ticket_type,
                t.department_name,
                t.sla,
                t.assign_from,
                t.assigned_date.as_ref().map(fmt_dt),
                t.last_comment,
                t.last_remark,
                t.state.as_str(),
                t.resolution_days,
                t.age_days,
                t.sla_breached as i32,
            ])?;
        }
    }

    tx.commit()?;
    log::info!("Upserted {} tickets for import {}", tickets.len(), import_id);
    Ok(tickets.len())
}
