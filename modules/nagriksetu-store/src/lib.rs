//! Ticket persistence.
//!
//! [`TicketStore`] is the seam between the deduplication engine and storage.
//! [`PgTicketStore`] is the production implementation (PostgreSQL + PostGIS);
//! [`MemoryTicketStore`] keeps everything in process and backs tests and
//! database-less local runs.

pub mod cells;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

#[cfg(feature = "test-utils")]
pub mod testutil;

pub use error::{Result, StoreError};
pub use memory::MemoryTicketStore;
pub use postgres::PgTicketStore;
pub use store::{nearest_match, TicketStore};
