use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::parser::types::Ticket;

/// Dashboard filter. Unset criteria match everything; date bounds are inclusive and
/// compare the calendar day of the Requested Date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketFilter {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub company: Option<String>,
    pub branch: Option<String>,
    pub status: Option<String>,
}

fn same_text(wanted: &Option<String>, actual: Option<&str>) -> bool {
    match wanted.as_deref().map(str::trim).filter(|w| !w.is_empty()) {
        None => true,
        Some(w) => actual.is_some_and(|a| a.trim().eq_ignore_ascii_case(w)),
    }
}

impl TicketFilter {
    pub fn matches(&self, ticket: &Ticket) -> bool {
        let day = ticket.requested_date.date();
        self.date_from.map_or(true, |from| day >= from)
            && self.date_to.map_or(true, |to| day <= to)
            && same_text(&self.company, ticket.company_name.as_deref())
            && same_text(&self.branch, ticket.branch_name.as_deref())
            && same_text(&self.status, Some(ticket.status.label.as_str()))
    }

    pub fn apply(&self, tickets: &[Ticket]) -> Vec<Ticket> {
        tickets.iter().filter(|t| self.matches(t)).cloned().collect()
    }
}

/// Distinct values offered by the filter controls, sorted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterOptions {
    pub companies: Vec<String>,
    pub branches: Vec<String>,
    pub statuses: Vec<String>,
    pub date_min: Option<NaiveDate>,
    pub date_max: Option<NaiveDate>,
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn filter_options(tickets: &[Ticket]) -> FilterOptions {
    FilterOptions {
        companies: distinct(tickets.iter().filter_map(|t| t.company_name.as_deref())),
        branches: distinct(tickets.iter().filter_map(|t| t.branch_name.as_deref())),
        statuses: distinct(tickets.iter().map(|t| t.status.label.as_str())),
        date_min: tickets.iter().map(|t| t.requested_date.date()).min(),
        date_max: tickets.iter().map(|t| t.requested_date.date()).max(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::summary::tests::ticket;
    use crate::parser::types::TicketState;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn tickets() -> Vec<Ticket> {
        let at = |d: NaiveDate, h: u32| d.and_hms_opt(h, 0, 0).unwrap();
        let mut a = ticket("T-1", "Open", TicketState::Pending, at(day(2024, 1, 1), 23));
        a.company_name = Some("Acme".into());
        a.branch_name = Some("North".into());
        let mut b = ticket("T-2", "Closed", TicketState::Resolved, at(day(2024, 1, 15), 8));
        b.company_name = Some("Globex".into());
        let c = ticket("T-3", "Open", TicketState::Pending, at(day(2024, 2, 1), 0));
        vec![a, b, c]
    }

    fn ids(v: &[Ticket]) -> Vec<&str> {
        v.iter().map(|t| t.ticket_id.as_str()).collect()
    }

    #[test]
    fn test_default_filter_matches_all() {
        let all = tickets();
        assert_eq!(TicketFilter::default().apply(&all).len(), 3);
    }

    #[test]
    fn test_date_bounds_inclusive_by_day() {
        let all = tickets();
        let f = TicketFilter {
            date_from: Some(day(2024, 1, 1)),
            date_to: Some(day(2024, 1, 15)),
            ..Default::default()
        };
        assert_eq!(ids(&f.apply(&all)), vec!["T-1", "T-2"]);
    }

    #[test]
    fn test_company_branch_status_case_insensitive() {
        let all = tickets();
        let f = TicketFilter {
            company: Some(" acme ".into()),
            ..Default::default()
        };
        assert_eq!(ids(&f.apply(&all)), vec!["T-1"]);

        let f = TicketFilter {
            branch: Some("north".into()),
            status: Some("OPEN".into()),
            ..Default::default()
        };
        assert_eq!(ids(&f.apply(&all)), vec!["T-1"]);

        let f = TicketFilter {
            status: Some("open".into()),
            ..Default::default()
        };
        assert_eq!(ids(&f.apply(&all)), vec!["T-1", "T-3"]);
    }

    #[test]
    fn test_blank_criterion_ignored() {
        let all = tickets();
        let f = TicketFilter {
            company: Some("  ".into()),
            ..Default::default()
        };
        assert_eq!(f.apply(&all).len(), 3);
    }

    #[test]
    fn test_filter_options() {
        let opts = filter_options(&tickets());
        assert_eq!(opts.companies, vec!["Acme", "Globex"]);
        assert_eq!(opts.branches, vec!["North"]);
        assert_eq!(opts.statuses, vec!["Closed", "Open"]);
        assert_eq!(opts.date_min, Some(day(2024, 1, 1)));
        assert_eq!(opts.date_max, Some(day(2024, 2, 1)));
    }
}
