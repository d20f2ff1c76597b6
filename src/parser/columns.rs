use serde::Serialize;

use crate::parser::schema::{FieldKey, LogicalField, SchemaRegistry};

/// Header matching rules, strongest first. Each tier is evaluated for every field
/// before the next tier runs, so a strong match is never stolen by a weaker one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchTier {
    /// Header equals the canonical name or an alias, byte for byte.
    Exact,
    /// Same, ignoring case.
    CaseInsensitive,
    /// Same, ignoring case, whitespace and punctuation ("Ticket_Id" ≡ "ticket id").
    Normalized,
    /// Header contains one of the field's declared fragments ("Assigned Agent" ∋ "assign").
    Contains,
}

impl MatchTier {
    pub const ORDERED: [MatchTier; 4] = [
        MatchTier::Exact,
        MatchTier::CaseInsensitive,
        MatchTier::Normalized,
        MatchTier::Contains,
    ];

    /// Does `header` (already trimmed) satisfy this rule for `field`?
    pub fn matches(self, field: &LogicalField, header: &str) -> bool {
        match self {
            MatchTier::Exact => field.spellings().any(|s| s == header),
            MatchTier::CaseInsensitive => {
                let lower = header.to_lowercase();
                field.spellings().any(|s| s.to_lowercase() == lower)
            }
            MatchTier::Normalized => {
                let norm = normalize_header(header);
                !norm.is_empty() && field.spellings().any(|s| normalize_header(s) == norm)
            }
            MatchTier::Contains => {
                let norm = normalize_header(header);
                field.contains.iter().any(|fragment| {
                    let fragment = normalize_header(fragment);
                    !fragment.is_empty() && norm.contains(&fragment)
                })
            }
        }
    }
}

/// Lowercase and keep only letters and digits.
pub fn normalize_header(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// One logical field bound to one input column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnAssignment {
    pub field: FieldKey,
    pub field_name: String,
    pub header: String,
    pub column: usize,
    pub tier: MatchTier,
}

/// Header → logical field mapping for one input file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnResolution {
    /// In registry order.
    pub assignments: Vec<ColumnAssignment>,
    pub unresolved_required: Vec<String>,
    pub unresolved_optional: Vec<String>,
    /// Input headers no field claimed, in input order.
    pub unmapped_headers: Vec<String>,
}

impl ColumnResolution {
    pub fn column_of(&self, key: FieldKey) -> Option<usize> {
        self.assignments
            .iter()
            .find(|a| a.field == key)
            .map(|a| a.column)
    }

    pub fn assignment(&self, key: FieldKey) -> Option<&ColumnAssignment> {
        self.assignments.iter().find(|a| a.field == key)
    }

    /// All required fields have a column.
    pub fn is_complete(&self) -> bool {
        self.unresolved_required.is_empty()
    }
}

/// Map input headers to the registry's logical fields.
///
/// Greedy and deterministic: for each tier, fields are visited in registry order and
/// each unresolved field claims the first unclaimed header (input order) the tier accepts.
pub fn resolve_columns(headers: &[String], registry: &SchemaRegistry) -> ColumnResolution {
    let trimmed: Vec<&str> = headers.iter().map(|h| h.trim()).collect();
    let fields = registry.fields();

    let mut claimed_by: Vec<Option<usize>> = vec![None; trimmed.len()];
    let mut field_column: Vec<Option<(usize, MatchTier)>> = vec![None; fields.len()];

    for tier in MatchTier::ORDERED {
        for (fi, field) in fields.iter().enumerate() {
            if field_column[fi].is_some() {
                continue;
            }
            let hit = trimmed
                .iter()
                .enumerate()
                .find(|(ci, h)| {
                    claimed_by[*ci].is_none() && !h.is_empty() && tier.matches(field, h)
                });
            if let Some((ci, _)) = hit {
                claimed_by[ci] = Some(fi);
                field_column[fi] = Some((ci, tier));
                log::debug!(
                    "Column '{}' → {} ({:?})",
                    trimmed[ci],
                    field.name,
                    tier
                );
            }
        }
    }

    let mut assignments = Vec::new();
    let mut unresolved_required = Vec::new();
    let mut unresolved_optional = Vec::new();
    for (fi, field) in fields.iter().enumerate() {
        match field_column[fi] {
            Some((column, tier)) => assignments.push(ColumnAssignment {
                field: field.key,
                field_name: field.name.clone(),
                header: trimmed[column].to_string(),
                column,
                tier,
            }),
            None if field.required => unresolved_required.push(field.name.clone()),
            None => unresolved_optional.push(field.name.clone()),
        }
    }

    let unmapped_headers = trimmed
        .iter()
        .enumerate()
        .filter(|(ci, h)| claimed_by[*ci].is_none() && !h.is_empty())
        .map(|(_, h)| h.to_string())
        .collect();

    ColumnResolution {
        assignments,
        unresolved_required,
        unresolved_optional,
        unmapped_headers,
    }
}
