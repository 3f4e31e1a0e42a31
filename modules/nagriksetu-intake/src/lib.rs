//! Report intake: boundary validation, the deduplication engine, and the
//! ingestion gateway that ties them together.
//!
//! ```text
//! ReportForm ──validate──▶ NewTicket ──DedupEngine──▶ TicketStore::record_report
//! ```

pub mod engine;
pub mod error;
pub mod gateway;
pub mod validation;

pub use engine::{DedupEngine, DEFAULT_STORE_TIMEOUT};
pub use error::IntakeError;
pub use gateway::IngestionGateway;
pub use validation::{
    Attachment, CoordinateInput, FieldIssue, Problem, ReportForm, ValidationError,
    MAX_DESCRIPTION_CHARS,
};
