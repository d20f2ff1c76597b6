pub mod filters;
pub mod metrics;
pub mod stats;
pub mod summary;

pub use filters::{filter_options, FilterOptions, TicketFilter};
pub use metrics::derive_ticket;
pub use summary::{summarize, TicketSummary};
