use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::parser::schema::EnumDomain;

pub const DEFAULT_SLA_THRESHOLD_DAYS: u32 = 30;

/// A canonical label and the spellings that map to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyEntry {
    pub label: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// Fixed vocabulary for an enumerated field. Matching ignores case and repeated spaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Vocabulary {
    pub entries: Vec<VocabularyEntry>,
}

impl Vocabulary {
    pub fn new(entries: &[(&str, &[&str])]) -> Self {
        Vocabulary {
            entries: entries
                .iter()
                .map(|(label, aliases)| VocabularyEntry {
                    label: label.to_string(),
                    aliases: aliases.iter().map(|a| a.to_string()).collect(),
                })
                .collect(),
        }
    }

    /// Canonical label for `raw`, if any entry recognizes it.
    pub fn lookup(&self, raw: &str) -> Option<&str> {
        let key = vocabulary_key(raw);
        if key.is_empty() {
            return None;
        }
        self.entries
            .iter()
            .find(|e| {
                vocabulary_key(&e.label) == key
                    || e.aliases.iter().any(|a| vocabulary_key(a) == key)
            })
            .map(|e| e.label.as_str())
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.label.as_str())
    }

    pub fn default_statuses() -> Self {
        Vocabulary::new(&[
            ("New", &[]),
            ("Open", &["opened"]),
            ("Assigned", &[]),
            ("In Progress", &["in-progress", "inprogress", "wip", "working"]),
            ("Pending", &["awaiting", "waiting", "waiting for customer"]),
            ("On Hold", &["hold", "on-hold"]),
            ("Re-Opened", &["reopened", "re opened"]),
            ("Resolved", &["solved", "fixed"]),
            ("Completed", &["complete", "done"]),
            ("Auto Completed", &["auto-completed", "autocompleted"]),
            ("Closed", &[]),
            ("Discard", &["discarded", "cancelled", "canceled", "rejected"]),
        ])
    }

    pub fn default_priorities() -> Self {
        Vocabulary::new(&[
            ("Low", &["p4", "minor"]),
            ("Medium", &["normal", "moderate", "p3"]),
            ("High", &["major", "p2"]),
            ("Critical", &["urgent", "very high", "p1", "blocker"]),
        ])
    }
}

fn vocabulary_key(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Explicit configuration consumed by one ingestion run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestConfig {
    /// A pending ticket older than this many days is flagged as an SLA breach.
    pub sla_threshold_days: u32,
    pub status_vocabulary: Vocabulary,
    pub priority_vocabulary: Vocabulary,
    /// Status labels meaning the ticket reached a resolved/closed state.
    pub resolved_statuses: Vec<String>,
    /// Status labels meaning the ticket was abandoned.
    pub discarded_statuses: Vec<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        IngestConfig {
            sla_threshold_days: DEFAULT_SLA_THRESHOLD_DAYS,
            status_vocabulary: Vocabulary::default_statuses(),
            priority_vocabulary: Vocabulary::default_priorities(),
            resolved_statuses: vec![
                "Resolved".into(),
                "Completed".into(),
                "Auto Completed".into(),
                "Closed".into(),
            ],
            discarded_statuses: vec!["Discard".into()],
        }
    }
}

impl IngestConfig {
    pub fn vocabulary(&self, domain: EnumDomain) -> &Vocabulary {
        match domain {
            EnumDomain::Status => &self.status_vocabulary,
            EnumDomain::Priority => &self.priority_vocabulary,
        }
    }

    pub fn is_resolved_status(&self, status: &str) -> bool {
        self.resolved_statuses
            .iter()
            .any(|s| s.eq_ignore_ascii_case(status.trim()))
    }

    pub fn is_discarded_status(&self, status: &str) -> bool {
        self.discarded_statuses
            .iter()
            .any(|s| s.eq_ignore_ascii_case(status.trim()))
    }
}

pub fn get_config_from_db(conn: &Connection) -> Result<IngestConfig, rusqlite::Error> {
    let mut stmt = conn.prepare_cached("SELECT key, value FROM config")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut config = IngestConfig::default();

    for row in rows {
        let (key, value) = row?;
        match key.as_str() {
            "sla_threshold_days" => {
                config.sla_threshold_days = value.parse().unwrap_or(DEFAULT_SLA_THRESHOLD_DAYS)
            }
            "status_vocabulary" => {
                if let Ok(v) = serde_json::from_str(&value) {
                    config.status_vocabulary = v;
                }
            }
            "priority_vocabulary" => {
                if let Ok(v) = serde_json::from_str(&value) {
                    config.priority_vocabulary = v;
                }
            }
            "resolved_statuses" => {
                if let Ok(v) = serde_json::from_str(&value) {
                    config.resolved_statuses = v;
                }
            }
            "discarded_statuses" => {
                if let Ok(v) = serde_json::from_str(&value) {
                    config.discarded_statuses = v;
                }
            }
            _ => {}
        }
    }

    Ok(config)
}

pub fn update_config_in_db(
    conn: &Connection,
    config: &IngestConfig,
) -> Result<(), rusqlite::Error> {
    let pairs: Vec<(&str, String)> = vec![
        ("sla_threshold_days", config.sla_threshold_days.to_string()),
        (
            "status_vocabulary",
            serde_json::to_string(&config.status_vocabulary).unwrap_or_default(),
        ),
        (
            "priority_vocabulary",
            serde_json::to_string(&config.priority_vocabulary).unwrap_or_default(),
        ),
        (
            "resolved_statuses",
            serde_json::to_string(&config.resolved_statuses).unwrap_or_default(),
        ),
        (
            "discarded_statuses",
            serde_json::to_string(&config.discarded_statuses).unwrap_or_default(),
        ),
    ];

    let mut stmt = conn.prepare_cached(
        "INSERT OR REPLACE INTO config (key, value, updated_at) VALUES (?1, ?2, datetime('now'))",
    )?;

    for (key, value) in pairs {
        stmt.execute(rusqlite::params![key, value])?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::migrations::run_migrations(&conn).unwrap();
        conn
    }

    // --- vocabulary ---

    #[test]
    fn test_lookup_case_and_spacing_insensitive() {
        let vocab = Vocabulary::default_statuses();
        assert_eq!(vocab.lookup("open"), Some("Open"));
        assert_eq!(vocab.lookup("  IN   progress "), Some("In Progress"));
        assert_eq!(vocab.lookup("cancelled"), Some("Discard"));
        assert_eq!(vocab.lookup("Limbo"), None);
        assert_eq!(vocab.lookup(""), None);
    }

    #[test]
    fn test_vocabulary_serializes_as_list() {
        let vocab = Vocabulary::new(&[("Urgent", &["asap"])]);
        let json = serde_json::to_string(&vocab).unwrap();
        assert_eq!(json, r#"[{"label":"Urgent","aliases":["asap"]}]"#);
        let back: Vocabulary = serde_json::from_str(r#"[{"label":"Urgent"}]"#).unwrap();
        assert_eq!(back.lookup("urgent"), Some("Urgent"));
    }

    // --- status classes ---

    #[test]
    fn test_resolved_and_discarded_statuses() {
        let config = IngestConfig::default();
        assert!(config.is_resolved_status("closed"));
        assert!(config.is_resolved_status("Auto Completed"));
        assert!(!config.is_resolved_status("Open"));
        assert!(config.is_discarded_status("Discard"));
        assert!(!config.is_discarded_status("Closed"));
    }

    // --- db store ---

    #[test]
    fn test_defaults_when_table_empty() {
        let conn = setup_db();
        let config = get_config_from_db(&conn).unwrap();
        assert_eq!(config, IngestConfig::default());
    }

    #[test]
    fn test_update_then_read_back() {
        let conn = setup_db();
        let mut config = IngestConfig::default();
        config.sla_threshold_days = 5;
        config.resolved_statuses = vec!["Done".into()];
        config.priority_vocabulary = Vocabulary::new(&[("P1", &["sev1"])]);
        update_config_in_db(&conn, &config).unwrap();

        let loaded = get_config_from_db(&conn).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_garbage_values_fall_back_to_defaults() {
        let conn = setup_db();
        conn.execute(
            "INSERT INTO config (key, value) VALUES \
             ('sla_threshold_days', 'soon'), ('resolved_statuses', '{')",
            [],
        )
        .unwrap();
        let config = get_config_from_db(&conn).unwrap();
        assert_eq!(config.sla_threshold_days, DEFAULT_SLA_THRESHOLD_DAYS);
        assert_eq!(config.resolved_statuses, IngestConfig::default().resolved_statuses);
    }
}
