use chrono::NaiveDateTime;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row};
use serde::Serialize;

use crate::db::DB_DATETIME_FORMAT;
use crate::error::AppError;
use crate::parser::types::{
    EnumValue, ReasonCode, RejectionRecord, Severity, Ticket, TicketState,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRecord {
    pub id: i64,
    pub filename: String,
    pub import_date: String,
    pub evaluated_at: String,
    pub total_rows: usize,
    pub accepted_count: usize,
    pub rejected_count: usize,
    pub warning_count: usize,
    pub unresolved_required: Vec<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketStats {
    pub total: usize,
    pub pending: usize,
    pub resolved: usize,
    pub discarded: usize,
    pub sla_breached: usize,
}

// ─── Row mapping ──────────────────────────────────────────────────────────────

const TICKET_COLUMNS: &str = "ticket_id, status, status_known, assigned_to, requested_date,
    resolved_date, resolved_by, priority, priority_known, company_name, branch_name,
    ticket_category, ticket_sub_category, subject, description, requester, created_user,
    ticket_type, department_name, sla, assign_from, assigned_date, last_comment, last_remark,
    state, resolution_days, age_days, sla_breached";

fn parse_dt(idx: usize, value: &str) -> Result<NaiveDateTime, rusqlite::Error> {
    NaiveDateTime::parse_from_str(value, DB_DATETIME_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn get_dt(row: &Row, idx: usize) -> Result<NaiveDateTime, rusqlite::Error> {
    let s: String = row.get(idx)?;
    parse_dt(idx, &s)
}

fn get_opt_dt(row: &Row, idx: usize) -> Result<Option<NaiveDateTime>, rusqlite::Error> {
    row.get::<_, Option<String>>(idx)?
        .map(|s| parse_dt(idx, &s))
        .transpose()
}

fn ticket_from_row(row: &Row) -> Result<Ticket, rusqlite::Error> {
    let status = EnumValue {
        label: row.get(1)?,
        known: row.get::<_, i64>(2)? != 0,
    };
    let priority = row
        .get::<_, Option<String>>(7)?
        .map(|label| -> Result<EnumValue, rusqlite::Error> {
            Ok(EnumValue {
                label,
                known: row.get::<_, Option<i64>>(8)?.unwrap_or(0) != 0,
            })
        })
        .transpose()?;
    let state_text: String = row.get(24)?;
    let state = TicketState::from_str_opt(&state_text)
        .ok_or_else(|| rusqlite::Error::InvalidColumnType(24, "state".into(), Type::Text))?;

    Ok(Ticket {
        ticket_id: row.get(0)?,
        status,
        assigned_to: row.get(3)?,
        requested_date: get_dt(row, 4)?,
        resolved_date: get_opt_dt(row, 5)?,
        resolved_by: row.get(6)?,
        priority,
        company_name: row.get(9)?,
        branch_name: row.get(10)?,
        ticket_category: row.get(11)?,
        ticket_sub_category: row.get(12)?,
        subject: row.get(13)?,
        description: row.get(14)?,
        requester: row.get(15)?,
        created_user: row.get(16)?,
        ticket_type: row.get(17)?,
        department_name: row.get(18)?,
        sla: row.get(19)?,
        assign_from: row.get(20)?,
        assigned_date: get_opt_dt(row, 21)?,
        last_comment: row.get(22)?,
        last_remark: row.get(23)?,
        state,
        resolution_days: row.get(25)?,
        age_days: row.get(26)?,
        sla_breached: row.get::<_, i64>(27)? != 0,
    })
}

// ─── Tickets ──────────────────────────────────────────────────────────────────

/// Every stored ticket, oldest request first.
pub fn load_tickets(conn: &Connection) -> Result<Vec<Ticket>, rusqlite::Error> {
    let sql = format!(
        "SELECT {TICKET_COLUMNS} FROM tickets ORDER BY requested_date ASC, ticket_id ASC"
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt
        .query_map([], ticket_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn get_ticket(conn: &Connection, ticket_id: &str) -> Result<Option<Ticket>, rusqlite::Error> {
    let sql = format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE ticket_id = ?1");
    conn.query_row(&sql, [ticket_id], ticket_from_row)
        .optional()
}

pub fn get_ticket_stats(conn: &Connection) -> Result<TicketStats, rusqlite::Error> {
    conn.query_row(
        "SELECT COUNT(*),
                COALESCE(SUM(state = 'pending'), 0),
                COALESCE(SUM(state = 'resolved'), 0),
                COALESCE(SUM(state = 'discarded'), 0),
                COALESCE(SUM(sla_breached), 0)
         FROM tickets",
        [],
        |row| {
            Ok(TicketStats {
                total: row.get::<_, i64>(0)? as usize,
                pending: row.get::<_, i64>(1)? as usize,
                resolved: row.get::<_, i64>(2)? as usize,
                discarded: row.get::<_, i64>(3)? as usize,
                sla_breached: row.get::<_, i64>(4)? as usize,
            })
        },
    )
}

/// Delete every stored ticket. Import history and rejection records are kept.
pub fn clear_all_tickets(conn: &Connection) -> Result<usize, rusqlite::Error> {
    let n = conn.execute("DELETE FROM tickets", [])?;
    log::info!("Cleared {} tickets", n);
    Ok(n)
}

// ─── Imports ──────────────────────────────────────────────────────────────────

/// Import history, newest first.
pub fn get_import_history(conn: &Connection) -> Result<Vec<ImportRecord>, rusqlite::Error> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, filename, import_date, evaluated_at, total_rows, accepted_count,
                rejected_count, warning_count, unresolved_required, is_active
         FROM imports
         ORDER BY id DESC",
    )?;
    let rows = stmt
        .query_map([], |row| {
            let unresolved_json: String = row.get(8)?;
            Ok(ImportRecord {
                id: row.get(0)?,
                filename: row.get(1)?,
                import_date: row.get(2)?,
                evaluated_at: row.get(3)?,
                total_rows: row.get::<_, i64>(4)? as usize,
                accepted_count: row.get::<_, i64>(5)? as usize,
                rejected_count: row.get::<_, i64>(6)? as usize,
                warning_count: row.get::<_, i64>(7)? as usize,
                unresolved_required: serde_json::from_str(&unresolved_json).unwrap_or_default(),
                is_active: row.get::<_, i64>(9)? != 0,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Rejection and warning records of one import, in row order.
pub fn get_rejections(conn: &Connection, import_id: i64) -> Result<Vec<RejectionRecord>, AppError> {
    let exists: Option<i64> = conn
        .query_row("SELECT id FROM imports WHERE id = ?1", [import_id], |row| row.get(0))
        .optional()?;
    if exists.is_none() {
        return Err(AppError::ImportNotFound(import_id));
    }

    let mut stmt = conn.prepare_cached(
        "SELECT row_index, field, reason, severity, raw_value
         FROM rejections
         WHERE import_id = ?1
         ORDER BY row_index ASC, id ASC",
    )?;
    let rows = stmt
        .query_map([import_id], |row| {
            let reason: String = row.get(2)?;
            let severity: String = row.get(3)?;
            Ok(RejectionRecord {
                row_index: row.get::<_, i64>(0)? as usize,
                field: row.get(1)?,
                reason: ReasonCode::from_code(&reason).ok_or_else(|| {
                    rusqlite::Error::InvalidColumnType(2, "reason".into(), Type::Text)
                })?,
                severity: Severity::from_str_opt(&severity).ok_or_else(|| {
                    rusqlite::Error::InvalidColumnType(3, "severity".into(), Type::Text)
                })?,
                raw_value: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IngestConfig;
    use crate::db::insert::{record_import, upsert_tickets};
    use crate::parser::pipeline::ingest;
    use crate::parser::schema::SchemaRegistry;
    use crate::parser::types::{IngestionBatch, RawTable};
    use chrono::NaiveDate;

    fn setup_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::migrations::run_migrations(&conn).unwrap();
        conn
    }

    fn batch(rows: &[&[&str]]) -> IngestionBatch {
        let table = RawTable::from_strings(
            &[
                "Ticket ID",
                "Current Status",
                "AssignedTo",
                "Requested Date",
                "Resolved Date",
                "Resolved By",
                "Priority",
                "Company Name",
                "Description",
            ],
            rows,
        );
        ingest(
            &table,
            &SchemaRegistry::ticket_schema(),
            &IngestConfig::default(),
            NaiveDate::from_ymd_opt(2024, 6, 1)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
        )
    }

    fn sample() -> IngestionBatch {
        batch(&[
            &[
                "T-1",
                "Open",
                "Ann",
                "2024-01-05 09:30:00",
                "",
                "",
                "High",
                "Acme",
                "  spaced\ntext ",
            ],
            &["T-2", "Closed", "Bob", "2024-02-01", "2024-02-03", "Bob", "Nope", "", ""],
            &["T-3", "Discard", "Cy", "2024-03-01", "", "", "", "Acme", ""],
            &["T-2", "Open", "Dee", "2024-03-01", "", "", "", "", ""],
        ])
    }

    fn persist(conn: &mut Connection, b: &IngestionBatch) -> i64 {
        let import_id = record_import(conn, "tickets.csv", &b.report).unwrap();
        upsert_tickets(conn, import_id, &b.tickets).unwrap();
        import_id
    }

    // ── tickets ──────────────────────────────────────────────────────────────

    /// GIVEN an ingested batch
    /// WHEN persisted and loaded back
    /// THEN every ticket is reproduced field for field
    #[test]
    fn test_round_trip_preserves_tickets() {
        let mut conn = setup_db();
        let b = sample();
        persist(&mut conn, &b);

        let loaded = load_tickets(&conn).unwrap();
        assert_eq!(loaded, b.tickets);
    }

    #[test]
    fn test_get_ticket() {
        let mut conn = setup_db();
        persist(&mut conn, &sample());

        let t = get_ticket(&conn, "T-2").unwrap().unwrap();
        assert_eq!(t.state, TicketState::Resolved);
        assert_eq!(t.resolution_days, Some(2));
        let p = t.priority.unwrap();
        assert_eq!(p.label, "Nope");
        assert!(!p.known);

        assert!(get_ticket(&conn, "T-404").unwrap().is_none());
    }

    #[test]
    fn test_upsert_replaces_by_ticket_id() {
        let mut conn = setup_db();
        persist(&mut conn, &sample());

        let update = batch(&[&[
            "T-1",
            "Closed",
            "Zed",
            "2024-01-05",
            "2024-01-10",
            "Zed",
            "",
            "",
            "",
        ]]);
        persist(&mut conn, &update);

        let stats = get_ticket_stats(&conn).unwrap();
        assert_eq!(stats.total, 3);
        let t1 = get_ticket(&conn, "T-1").unwrap().unwrap();
        assert_eq!(t1.assigned_to, "Zed");
        assert_eq!(t1.state, TicketState::Resolved);
        assert_eq!(t1.company_name, None);
    }

    #[test]
    fn test_ticket_stats() {
        let mut conn = setup_db();
        assert_eq!(get_ticket_stats(&conn).unwrap(), TicketStats::default());

        persist(&mut conn, &sample());
        let stats = get_ticket_stats(&conn).unwrap();
        assert_eq!(
            stats,
            TicketStats {
                total: 3,
                pending: 1,
                resolved: 1,
                discarded: 1,
                sla_breached: 1,
            }
        );
    }

    #[test]
    fn test_clear_all_tickets_keeps_history() {
        let mut conn = setup_db();
        persist(&mut conn, &sample());
        assert_eq!(clear_all_tickets(&conn).unwrap(), 3);
        assert!(load_tickets(&conn).unwrap().is_empty());
        assert_eq!(get_import_history(&conn).unwrap().len(), 1);
    }

    // ── imports ──────────────────────────────────────────────────────────────

    #[test]
    fn test_import_history_newest_first_and_single_active() {
        let mut conn = setup_db();
        let first = persist(&mut conn, &sample());
        let second = persist(&mut conn, &sample());

        let history = get_import_history(&conn).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, second);
        assert_eq!(history[1].id, first);
        assert!(history[0].is_active);
        assert!(!history[1].is_active);
        assert_eq!(history[0].total_rows, 4);
        assert_eq!(history[0].accepted_count, 3);
        assert_eq!(history[0].rejected_count, 1);
        assert_eq!(history[0].evaluated_at, "2024-06-01T12:00:00");
    }

    #[test]
    fn test_aborted_import_recorded() {
        let mut conn = setup_db();
        let table = RawTable::from_strings(&["Ticket ID"], &[&["T-1"]]);
        let b = ingest(
            &table,
            &SchemaRegistry::ticket_schema(),
            &IngestConfig::default(),
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap().and_hms_opt(0, 0, 0).unwrap(),
        );
        record_import(&mut conn, "bad.csv", &b.report).unwrap();
        let history = get_import_history(&conn).unwrap();
        assert_eq!(
            history[0].unresolved_required,
            vec!["Current Status", "AssignedTo", "Requested Date"]
        );
    }

    #[test]
    fn test_rejections_round_trip() {
        let mut conn = setup_db();
        let b = sample();
        let import_id = persist(&mut conn, &b);

        let records = get_rejections(&conn, import_id).unwrap();
        assert_eq!(records, b.report.records);
        assert!(records
            .iter()
            .any(|r| r.reason == ReasonCode::DuplicateTicketId && r.row_index == 3));
    }

    #[test]
    fn test_rejections_unknown_import() {
        let conn = setup_db();
        assert!(matches!(
            get_rejections(&conn, 42),
            Err(AppError::ImportNotFound(42))
        ));
    }
}
