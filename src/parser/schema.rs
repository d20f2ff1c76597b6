//! Logical ticket fields and the header spellings each one accepts.

use serde::Serialize;

/// Every logical field the ingestion pipeline knows how to carry through to a `Ticket`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldKey {
    TicketId,
    CurrentStatus,
    AssignedTo,
    RequestedDate,
    ResolvedDate,
    ResolvedBy,
    Priority,
    CompanyName,
    BranchName,
    TicketCategory,
    TicketSubCategory,
    Subject,
    Description,
    Requester,
    CreatedUser,
    TicketType,
    DepartmentName,
    Sla,
    AssignFrom,
    AssignedDate,
    LastComment,
    LastRemark,
}

/// Vocabulary an enumerated field is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EnumDomain {
    Status,
    Priority,
}

/// Declared value type of a logical field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "type", content = "domain")]
pub enum FieldKind {
    /// Short text, trimmed.
    Text,
    /// Text that must survive spreadsheet numeric coercion ("1001.0" → "1001").
    Identifier,
    Date,
    Enum(EnumDomain),
    /// Long text passed through untouched unless blank.
    FreeText,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogicalField {
    pub key: FieldKey,
    /// Canonical name, also used in rejection records and reports.
    pub name: String,
    pub required: bool,
    pub kind: FieldKind,
    /// Alternative header spellings, compared case-insensitively.
    pub aliases: Vec<String>,
    /// Fragments that identify the field when contained in a header (last-resort tier).
    pub contains: Vec<String>,
}

impl LogicalField {
    fn new(key: FieldKey, name: &str, required: bool, kind: FieldKind) -> Self {
        LogicalField {
            key,
            name: name.to_string(),
            required,
            kind,
            aliases: Vec::new(),
            contains: Vec::new(),
        }
    }

    fn aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases.extend(aliases.iter().map(|a| a.to_string()));
        self
    }

    fn contains(mut self, fragments: &[&str]) -> Self {
        self.contains.extend(fragments.iter().map(|f| f.to_string()));
        self
    }

    /// Canonical name followed by every alias.
    pub fn spellings(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

/// Immutable set of logical fields, in resolution order (required fields first).
#[derive(Debug, Clone, Serialize)]
pub struct SchemaRegistry {
    fields: Vec<LogicalField>,
}

impl SchemaRegistry {
    /// The support-ticket schema: four required fields plus the optional columns
    /// commonly found in helpdesk exports.
    pub fn ticket_schema() -> Self {
        use EnumDomain::{Priority, Status};
        use FieldKey as K;
        use FieldKind::{Date, Enum, FreeText, Identifier, Text};

        let fields = vec![
            // Required
            LogicalField::new(K::TicketId, "Ticket ID", true, Identifier)
                .aliases(&["ID", "Ticket No", "Ticket Number", "Ticket #", "Incident ID"])
                .contains(&["ticketid", "ticketno", "ticketnumber"]),
            LogicalField::new(K::CurrentStatus, "Current Status", true, Enum(Status))
                .aliases(&["Status", "State", "Ticket Status"])
                .contains(&["status"]),
            LogicalField::new(K::AssignedTo, "AssignedTo", true, Text)
                .aliases(&["Assigned To", "Assigned User", "Assignee", "Technician", "Owner"])
                .contains(&["assign"]),
            LogicalField::new(K::RequestedDate, "Requested Date", true, Date)
                .aliases(&[
                    "Created Date",
                    "Request Date",
                    "Opened Date",
                    "Open Date",
                    "Created On",
                ])
                .contains(&["requested", "createddate", "opened"]),
            // Optional
            LogicalField::new(K::ResolvedDate, "Resolved Date", false, Date)
                .aliases(&["Resolution Date", "Closed Date", "Close Date", "Resolved On"])
                .contains(&["resolveddate", "resolutiondate", "closeddate"]),
            LogicalField::new(K::ResolvedBy, "Resolved By", false, Text)
                .aliases(&["Resolver", "Closed By"])
                .contains(&["resolvedby", "resolver"]),
            LogicalField::new(K::Priority, "Priority", false, Enum(Priority))
                .aliases(&["Urgency", "Severity"])
                .contains(&["priority"]),
            LogicalField::new(K::CompanyName, "Company Name", false, Text)
                .aliases(&["Company", "Client", "Customer"])
                .contains(&["company"]),
            LogicalField::new(K::BranchName, "Branch Name", false, Text)
                .aliases(&["Branch", "Site", "Location"])
                .contains(&["branch"]),
            LogicalField::new(K::TicketCategory, "Ticket Category", false, Text)
                .aliases(&["Category"]),
            LogicalField::new(K::TicketSubCategory, "Ticket Sub Category", false, Text)
                .aliases(&["Sub Category", "Subcategory"])
                .contains(&["subcategory"]),
            LogicalField::new(K::Subject, "Subject", false, Text).aliases(&["Title", "Summary"]),
            LogicalField::new(K::Description, "Description", false, FreeText)
                .aliases(&["Details", "Body"]),
            LogicalField::new(K::Requester, "Requester", false, Text)
                .aliases(&["Requested By", "Reporter", "Caller"]),
            LogicalField::new(K::CreatedUser, "Created User", false, Text)
                .aliases(&["Created By", "Creator"]),
            LogicalField::new(K::TicketType, "Ticket Type", false, Text).aliases(&["Type"]),
            LogicalField::new(K::DepartmentName, "Department Name", false, Text)
                .aliases(&["Department", "Dept"])
                .contains(&["department"]),
            LogicalField::new(K::Sla, "SLA", false, Text).aliases(&["SLA Name", "SLA Policy"]),
            LogicalField::new(K::AssignFrom, "Assign From", false, Text)
                .aliases(&["Assigned From", "Assigned By"]),
            LogicalField::new(K::AssignedDate, "Assigned Date", false, Date)
                .aliases(&["Assignment Date", "Assigned On"]),
            LogicalField::new(K::LastComment, "Last Comment", false, FreeText)
                .aliases(&["Comment", "Comments"]),
            LogicalField::new(K::LastRemark, "Last Remark", false, FreeText)
                .aliases(&["Remark", "Remarks"]),
        ];

        SchemaRegistry { fields }
    }

    /// Build a registry from an explicit field list. Required fields are moved to the
    /// front (stable) so they are resolved before optional ones.
    pub fn from_fields(mut fields: Vec<LogicalField>) -> Self {
        fields.sort_by_key(|f| !f.required);
        SchemaRegistry { fields }
    }

    /// Returns a copy of this registry with extra aliases declared for `key`.
    pub fn with_aliases(&self, key: FieldKey, aliases: &[&str]) -> Self {
        let mut fields = self.fields.clone();
        if let Some(field) = fields.iter_mut().find(|f| f.key == key) {
            field.aliases.extend(aliases.iter().map(|a| a.to_string()));
        }
        SchemaRegistry { fields }
    }

    pub fn fields(&self) -> &[LogicalField] {
        &self.fields
    }

    pub fn field(&self, key: FieldKey) -> Option<&LogicalField> {
        self.fields.iter().find(|f| f.key == key)
    }

    pub fn required(&self) -> impl Iterator<Item = &LogicalField> {
        self.fields.iter().filter(|f| f.required)
    }

    /// Canonical name of `key`, falling back to its debug name when not registered.
    pub fn name_of(&self, key: FieldKey) -> String {
        self.field(key)
            .map(|f| f.name.clone())
            .unwrap_or_else(|| format!("{:?}", key))
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::ticket_schema()
    }
}
