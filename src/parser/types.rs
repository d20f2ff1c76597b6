use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::parser::columns::ColumnAssignment;
use crate::parser::schema::FieldKey;

/// Label used by aggregations for unrecognized or absent enumerated values.
pub const UNKNOWN_BUCKET: &str = "Unknown";

// ─── Raw input ────────────────────────────────────────────────────────────────

/// An untyped cell as delivered by the file reader.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RawCell {
    Empty,
    Text(String),
    Number(f64),
    DateTime(NaiveDateTime),
}

impl RawCell {
    /// Blank cells and whitespace-only text both count as empty.
    pub fn is_blank(&self) -> bool {
        match self {
            RawCell::Empty => true,
            RawCell::Text(s) => s.trim().is_empty(),
            RawCell::Number(_) | RawCell::DateTime(_) => false,
        }
    }

    /// Textual copy of the cell, kept in rejection records.
    pub fn snapshot(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RawCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawCell::Empty => Ok(()),
            RawCell::Text(s) => f.write_str(s),
            RawCell::Number(n) => write!(f, "{}", n),
            RawCell::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S")),
        }
    }
}

impl From<&str> for RawCell {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            RawCell::Empty
        } else {
            RawCell::Text(s.to_string())
        }
    }
}

static EMPTY_CELL: RawCell = RawCell::Empty;

/// Headers plus data rows, positionally aligned. Rows never change after reading.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<RawCell>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<RawCell>>) -> Self {
        RawTable { headers, rows }
    }

    /// Convenience constructor for text-only tables.
    pub fn from_strings(headers: &[&str], rows: &[&[&str]]) -> Self {
        RawTable {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|&c| RawCell::from(c)).collect())
                .collect(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Cell at (`row`, `column`); missing trailing cells read as empty.
    pub fn cell(&self, row: usize, column: usize) -> &RawCell {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&EMPTY_CELL)
    }
}

// ─── Typed values ─────────────────────────────────────────────────────────────

/// An enumerated value: canonical label when recognized, the trimmed input otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumValue {
    pub label: String,
    pub known: bool,
}

impl EnumValue {
    pub fn known(label: &str) -> Self {
        EnumValue {
            label: label.to_string(),
            known: true,
        }
    }

    pub fn unknown(raw: &str) -> Self {
        EnumValue {
            label: raw.to_string(),
            known: false,
        }
    }

    /// Aggregation bucket: the label, or "Unknown" for unrecognized input.
    pub fn bucket(&self) -> &str {
        if self.known {
            &self.label
        } else {
            UNKNOWN_BUCKET
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Empty,
    Text(String),
    Date(NaiveDateTime),
    Enum(EnumValue),
}

static EMPTY_VALUE: FieldValue = FieldValue::Empty;

impl FieldValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, FieldValue::Empty)
    }
}

/// A row after value normalization, keyed by logical field.
#[derive(Debug, Clone)]
pub struct NormalizedRow {
    /// Zero-based position of the source row among the data rows.
    pub index: usize,
    pub values: BTreeMap<FieldKey, FieldValue>,
    /// Fields whose raw value could not be coerced (an error-level record exists).
    pub invalid: BTreeSet<FieldKey>,
}

impl NormalizedRow {
    pub fn new(index: usize) -> Self {
        NormalizedRow {
            index,
            values: BTreeMap::new(),
            invalid: BTreeSet::new(),
        }
    }

    pub fn get(&self, key: FieldKey) -> &FieldValue {
        self.values.get(&key).unwrap_or(&EMPTY_VALUE)
    }

    pub fn is_present(&self, key: FieldKey) -> bool {
        !self.get(key).is_empty()
    }

    pub fn text(&self, key: FieldKey) -> Option<&str> {
        match self.get(key) {
            FieldValue::Text(s) => Some(s),
            FieldValue::Enum(e) => Some(&e.label),
            _ => None,
        }
    }

    pub fn date(&self, key: FieldKey) -> Option<NaiveDateTime> {
        match self.get(key) {
            FieldValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn enum_value(&self, key: FieldKey) -> Option<&EnumValue> {
        match self.get(key) {
            FieldValue::Enum(e) => Some(e),
            _ => None,
        }
    }
}

// ─── Rejections ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// The row is still accepted.
    Warning,
    /// The row is excluded from the accepted set.
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "warning" => Some(Severity::Warning),
            "error" => Some(Severity::Error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    MissingRequiredField,
    DuplicateTicketId,
    ResolvedBeforeRequested,
    UnparseableDate,
    UnrecognizedValue,
    MissingResolutionFields,
    UnusableRequiredValue,
}

impl ReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::MissingRequiredField => "missing required field",
            ReasonCode::DuplicateTicketId => "duplicate ticket id",
            ReasonCode::ResolvedBeforeRequested => "resolved before requested",
            ReasonCode::UnparseableDate => "unparseable date",
            ReasonCode::UnrecognizedValue => "unrecognized value",
            ReasonCode::MissingResolutionFields => "missing resolution fields",
            ReasonCode::UnusableRequiredValue => "unusable required value",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        [
            ReasonCode::MissingRequiredField,
            ReasonCode::DuplicateTicketId,
            ReasonCode::ResolvedBeforeRequested,
            ReasonCode::UnparseableDate,
            ReasonCode::UnrecognizedValue,
            ReasonCode::MissingResolutionFields,
            ReasonCode::UnusableRequiredValue,
        ]
        .into_iter()
        .find(|r| r.as_str() == code)
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectionRecord {
    /// Zero-based data row index (header excluded).
    pub row_index: usize,
    pub field: Option<String>,
    pub reason: ReasonCode,
    pub severity: Severity,
    pub raw_value: String,
}

impl RejectionRecord {
    pub fn error(row_index: usize, field: Option<&str>, reason: ReasonCode, raw: &str) -> Self {
        RejectionRecord {
            row_index,
            field: field.map(str::to_string),
            reason,
            severity: Severity::Error,
            raw_value: raw.to_string(),
        }
    }

    pub fn warning(row_index: usize, field: Option<&str>, reason: ReasonCode, raw: &str) -> Self {
        RejectionRecord {
            severity: Severity::Warning,
            ..Self::error(row_index, field, reason, raw)
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// 1-based line in the source spreadsheet, counting the header row.
    pub fn line(&self) -> usize {
        self.row_index + 2
    }
}

// ─── Tickets ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketState {
    Pending,
    Resolved,
    Discarded,
}

impl TicketState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketState::Pending => "pending",
            TicketState::Resolved => "resolved",
            TicketState::Discarded => "discarded",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TicketState::Pending),
            "resolved" => Some(TicketState::Resolved),
            "discarded" => Some(TicketState::Discarded),
            _ => None,
        }
    }
}

/// Final normalized entity handed to the persistence and visualization collaborators.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub ticket_id: String,
    pub status: EnumValue,
    pub assigned_to: String,
    pub requested_date: NaiveDateTime,
    pub resolved_date: Option<NaiveDateTime>,
    pub resolved_by: Option<String>,
    pub priority: Option<EnumValue>,
    pub company_name: Option<String>,
    pub branch_name: Option<String>,
    pub ticket_category: Option<String>,
    pub ticket_sub_category: Option<String>,
    pub subject: Option<String>,
    pub description: Option<String>,
    pub requester: Option<String>,
    pub created_user: Option<String>,
    pub ticket_type: Option<String>,
    pub department_name: Option<String>,
    pub sla: Option<String>,
    pub assign_from: Option<String>,
    pub assigned_date: Option<NaiveDateTime>,
    pub last_comment: Option<String>,
    pub last_remark: Option<String>,

    // Derived
    pub state: TicketState,
    pub resolution_days: Option<i64>,
    pub age_days: Option<i64>,
    pub sla_breached: bool,
}

impl Ticket {
    /// Display value of any logical field, `None` when unset.
    pub fn field_text(&self, key: FieldKey) -> Option<String> {
        let fmt_date = |d: &NaiveDateTime| d.format("%Y-%m-%dT%H:%M:%S").to_string();
        match key {
            FieldKey::TicketId => Some(self.ticket_id.clone()),
            FieldKey::CurrentStatus => Some(self.status.label.clone()),
            FieldKey::AssignedTo => Some(self.assigned_to.clone()),
            FieldKey::RequestedDate => Some(fmt_date(&self.requested_date)),
            FieldKey::ResolvedDate => self.resolved_date.as_ref().map(fmt_date),
            FieldKey::ResolvedBy => self.resolved_by.clone(),
            FieldKey::Priority => self.priority.as_ref().map(|p| p.label.clone()),
            FieldKey::CompanyName => self.company_name.clone(),
            FieldKey::BranchName => self.branch_name.clone(),
            FieldKey::TicketCategory => self.ticket_category.clone(),
            FieldKey::TicketSubCategory => self.ticket_sub_category.clone(),
            FieldKey::Subject => self.subject.clone(),
            FieldKey::Description => self.description.clone(),
            FieldKey::Requester => self.requester.clone(),
            FieldKey::CreatedUser => self.created_user.clone(),
            FieldKey::TicketType => self.ticket_type.clone(),
            FieldKey::DepartmentName => self.department_name.clone(),
            FieldKey::Sla => self.sla.clone(),
            FieldKey::AssignFrom => self.assign_from.clone(),
            FieldKey::AssignedDate => self.assigned_date.as_ref().map(fmt_date),
            FieldKey::LastComment => self.last_comment.clone(),
            FieldKey::LastRemark => self.last_remark.clone(),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.state == TicketState::Pending
    }
}

// ─── Run output ───────────────────────────────────────────────────────────────

/// Summary of one ingestion run. Immutable once returned.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionReport {
    pub total_rows_read: usize,
    pub accepted_count: usize,
    pub rejected_count: usize,
    pub records: Vec<RejectionRecord>,
    /// Required fields with no matching header; non-empty means the run aborted.
    pub unresolved_required: Vec<String>,
    pub unresolved_optional: Vec<String>,
    pub column_mapping: Vec<ColumnAssignment>,
    pub unmapped_headers: Vec<String>,
    pub evaluated_at: NaiveDateTime,
    pub duration_ms: u64,
}

impl IngestionReport {
    pub fn is_aborted(&self) -> bool {
        !self.unresolved_required.is_empty()
    }

    pub fn errors(&self) -> impl Iterator<Item = &RejectionRecord> {
        self.records.iter().filter(|r| r.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &RejectionRecord> {
        self.records.iter().filter(|r| !r.is_error())
    }

    /// Indices of rows excluded from the accepted set.
    pub fn rejected_rows(&self) -> BTreeSet<usize> {
        self.errors().map(|r| r.row_index).collect()
    }

    pub fn records_for_row(&self, row_index: usize) -> Vec<&RejectionRecord> {
        self.records
            .iter()
            .filter(|r| r.row_index == row_index)
            .collect()
    }
}

/// Result of one ingestion call: accepted tickets plus the report explaining the rest.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionBatch {
    pub tickets: Vec<Ticket>,
    pub report: IngestionReport,
}
