pub mod columns;
pub mod deserializers;
pub mod normalizer;
pub mod pipeline;
pub mod schema;
pub mod types;
pub mod validator;

pub use columns::{resolve_columns, ColumnAssignment, ColumnResolution, MatchTier};
pub use pipeline::{ingest, ingest_now};
pub use schema::{EnumDomain, FieldKey, FieldKind, LogicalField, SchemaRegistry};
pub use types::{
    EnumValue, FieldValue, IngestionBatch, IngestionReport, RawCell, RawTable, ReasonCode,
    RejectionRecord, Severity, Ticket, TicketState,
};
