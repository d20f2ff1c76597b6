pub mod analyzer;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod import;
pub mod parser;
pub mod reader;

pub use analyzer::{filter_options, summarize, FilterOptions, TicketFilter, TicketSummary};
pub use config::{IngestConfig, Vocabulary};
pub use error::AppError;
pub use export::rejection_report::generate_rejection_report;
pub use export::ticket_export::generate_ticket_export;
pub use import::{import_file, ImportResult};
pub use parser::{
    ingest, ingest_now, IngestionBatch, IngestionReport, RawCell, RawTable, RejectionRecord,
    SchemaRegistry, Ticket, TicketState,
};
pub use reader::read_table;

// ─── E2E Integration Tests ──────────────────────────────────────────────────
