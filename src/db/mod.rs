pub mod insert;
pub mod migrations;
pub mod queries;
pub mod setup;

/// Timestamps are stored as ISO-8601 text without zone; fractional seconds only when present.
pub const DB_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

pub use insert::{record_import, upsert_tickets};
pub use queries::{
    clear_all_tickets, get_import_history, get_rejections, get_ticket, get_ticket_stats,
    load_tickets, ImportRecord, TicketStats,
};
pub use setup::init_db;
