use chrono::NaiveDateTime;

use crate::config::IngestConfig;
use crate::parser::schema::FieldKey;
use crate::parser::types::{EnumValue, FieldValue, NormalizedRow, Ticket, TicketState};

/// Lifecycle class of a ticket from its status label and resolution timestamp.
pub fn ticket_state(
    status: &str,
    resolved_date: Option<NaiveDateTime>,
    config: &IngestConfig,
) -> TicketState {
    if config.is_discarded_status(status) {
        TicketState::Discarded
    } else if config.is_resolved_status(status) || resolved_date.is_some() {
        TicketState::Resolved
    } else {
        TicketState::Pending
    }
}

/// Whole days from request to resolution, truncated toward zero.
/// `None` when the ticket has no resolution timestamp.
pub fn resolution_days(requested: NaiveDateTime, resolved: Option<NaiveDateTime>) -> Option<i64> {
    resolved.map(|r| (r - requested).num_days())
}

/// Whole days a ticket has been open at `evaluated_at`.
pub fn age_days(requested: NaiveDateTime, evaluated_at: NaiveDateTime) -> i64 {
    (evaluated_at - requested).num_days()
}

pub fn is_sla_breached(age_days: i64, threshold_days: u32) -> bool {
    age_days > i64::from(threshold_days)
}

/// Build the final `Ticket` for an accepted row.
///
/// `Err` names the first required field whose value is absent or not of the type a
/// ticket needs (a registry declaring Requested Date as text, for instance).
/// A status declared as plain text is looked up in the status vocabulary.
pub fn derive_ticket(
    row: &NormalizedRow,
    config: &IngestConfig,
    evaluated_at: NaiveDateTime,
) -> Result<Ticket, FieldKey> {
    let ticket_id = row
        .text(FieldKey::TicketId)
        .ok_or(FieldKey::TicketId)?
        .to_string();
    let status = match row.get(FieldKey::CurrentStatus) {
        FieldValue::Enum(e) => e.clone(),
        FieldValue::Text(s) => match config.status_vocabulary.lookup(s) {
            Some(label) => EnumValue::known(label),
            None => EnumValue::unknown(s.trim()),
        },
        _ => return Err(FieldKey::CurrentStatus),
    };
    let assigned_to = row
        .text(FieldKey::AssignedTo)
        .ok_or(FieldKey::AssignedTo)?
        .to_string();
    let requested_date = row
        .date(FieldKey::RequestedDate)
        .ok_or(FieldKey::RequestedDate)?;
    let resolved_date = row.date(FieldKey::ResolvedDate);

    let text = |key| row.text(key).map(str::to_string);

    let state = ticket_state(&status.label, resolved_date, config);
    let age = (state == TicketState::Pending).then(|| age_days(requested_date, evaluated_at));

    Ok(Ticket {
        ticket_id,
        assigned_to,
        requested_date,
        resolved_date,
        resolved_by: text(FieldKey::ResolvedBy),
        priority: row.enum_value(FieldKey::Priority).cloned(),
        company_name: text(FieldKey::CompanyName),
        branch_name: text(FieldKey::BranchName),
        ticket_category: text(FieldKey::TicketCategory),
        ticket_sub_category: text(FieldKey::TicketSubCategory),
        subject: text(FieldKey::Subject),
        description: text(FieldKey::Description),
        requester: text(FieldKey::Requester),
        created_user: text(FieldKey::CreatedUser),
        ticket_type: text(FieldKey::TicketType),
        department_name: text(FieldKey::DepartmentName),
        sla: text(FieldKey::Sla),
        assign_from: text(FieldKey::AssignFrom),
        assigned_date: row.date(FieldKey::AssignedDate),
        last_comment: text(FieldKey::LastComment),
        last_remark: text(FieldKey::LastRemark),
        state,
        resolution_days: resolution_days(requested_date, resolved_date),
        age_days: age,
        sla_breached: age.is_some_and(|a| is_sla_breached(a, config.sla_threshold_days)),
        status,
    })
}
