use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::Serialize;

use crate::analyzer::stats::{mean, median, percentile, rate};
use crate::parser::types::{Ticket, TicketState, UNKNOWN_BUCKET};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountEntry {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: usize,
}

/// One day of the created-versus-resolved trend, keyed on the Requested Date.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStatus {
    pub date: NaiveDate,
    pub total: usize,
    pub resolved: usize,
    pub pending: usize,
    pub cumulative_resolved: usize,
    pub cumulative_pending: usize,
}

/// Resolution-duration statistics over tickets that have one.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionStats {
    pub sample_size: usize,
    pub mean_days: f64,
    pub median_days: f64,
    pub p90_days: f64,
}

/// Headline figures and breakdowns for a set of tickets.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketSummary {
    pub total: usize,
    pub pending: usize,
    pub resolved: usize,
    pub discarded: usize,
    /// Resolved share of all tickets, in percent. `None` for an empty set.
    pub resolution_rate: Option<f64>,
    pub sla_breached: usize,
    pub by_status: Vec<CountEntry>,
    pub by_assignee: Vec<CountEntry>,
    /// Open workload per assignee.
    pub pending_by_assignee: Vec<CountEntry>,
    /// Resolved tickets per Resolved By; tickets without a resolver are left out.
    pub resolved_by_resolver: Vec<CountEntry>,
    pub by_company: Vec<CountEntry>,
    pub by_branch: Vec<CountEntry>,
    pub by_priority: Vec<CountEntry>,
    pub by_category: Vec<CountEntry>,
    pub resolution: ResolutionStats,
    /// Tickets created per calendar day of their Requested Date, oldest first.
    pub daily_created: Vec<DailyCount>,
    /// Tickets resolved per calendar day of their Resolved Date, oldest first.
    pub daily_resolved: Vec<DailyCount>,
    pub daily_status: Vec<DailyStatus>,
}

/// Count occurrences and sort by count descending, then label.
fn distribution<'a>(labels: impl Iterator<Item = &'a str>) -> Vec<CountEntry> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for label in labels {
        *counts.entry(label).or_insert(0) += 1;
    }
    let mut entries: Vec<CountEntry> = counts
        .into_iter()
        .map(|(label, count)| CountEntry {
            label: label.to_string(),
            count,
        })
        .collect();
    entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    entries
}

pub fn summarize(tickets: &[Ticket]) -> TicketSummary {
    let total = tickets.len();
    let count_state = |s: TicketState| tickets.iter().filter(|t| t.state == s).count();
    let resolved = count_state(TicketState::Resolved);

    let durations: Vec<f64> = tickets
        .iter()
        .filter_map(|t| t.resolution_days)
        .map(|d| d as f64)
        .collect();

    let daily_created = daily_counts(tickets.iter().map(|t| t.requested_date.date()));
    let daily_resolved =
        daily_counts(tickets.iter().filter_map(|t| t.resolved_date.map(|d| d.date())));

    TicketSummary {
        total,
        pending: count_state(TicketState::Pending),
        resolved,
        discarded: count_state(TicketState::Discarded),
        resolution_rate: rate(resolved, total),
        sla_breached: tickets.iter().filter(|t| t.sla_breached).count(),
        by_status: distribution(tickets.iter().map(|t| t.status.bucket())),
        by_assignee: distribution(tickets.iter().map(|t| t.assigned_to.as_str())),
        pending_by_assignee: distribution(
            tickets
                .iter()
                .filter(|t| t.state == TicketState::Pending)
                .map(|t| t.assigned_to.as_str()),
        ),
        resolved_by_resolver: distribution(
            tickets
                .iter()
                .filter(|t| t.state == TicketState::Resolved)
                .filter_map(|t| t.resolved_by.as_deref()),
        ),
        by_company: distribution(tickets.iter().filter_map(|t| t.company_name.as_deref())),
        by_branch: distribution(tickets.iter().filter_map(|t| t.branch_name.as_deref())),
        by_priority: distribution(
            tickets
                .iter()
                .map(|t| t.priority.as_ref().map_or(UNKNOWN_BUCKET, |p| p.bucket())),
        ),
        by_category: distribution(tickets.iter().filter_map(|t| t.ticket_category.as_deref())),
        resolution: ResolutionStats {
            sample_size: durations.len(),
            mean_days: mean(&durations),
            median_days: median(&durations),
            p90_days: percentile(&durations, 90.0),
        },
        daily_created,
        daily_resolved,
        daily_status: daily_status(tickets),
    }
}

fn daily_counts(dates: impl Iterator<Item = NaiveDate>) -> Vec<DailyCount> {
    let mut daily: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for date in dates {
        *daily.entry(date).or_insert(0) += 1;
    }
    daily
        .into_iter()
        .map(|(date, count)| DailyCount { date, count })
        .collect()
}

/// Per-day split by state with running totals. Discarded tickets count toward `total` only.
fn daily_status(tickets: &[Ticket]) -> Vec<DailyStatus> {
    let mut days: BTreeMap<NaiveDate, (usize, usize, usize)> = BTreeMap::new();
    for t in tickets {
        let day = days.entry(t.requested_date.date()).or_insert((0, 0, 0));
        day.0 += 1;
        match t.state {
            TicketState::Resolved => day.1 += 1,
            TicketState::Pending => day.2 += 1,
            TicketState::Discarded => {}
        }
    }

    let (mut cumulative_resolved, mut cumulative_pending) = (0, 0);
    days.into_iter()
        .map(|(date, (total, resolved, pending))| {
            cumulative_resolved += resolved;
            cumulative_pending += pending;
            DailyStatus {
                date,
                total,
                resolved,
                pending,
                cumulative_resolved,
                cumulative_pending,
            }
        })
        .collect()
}
