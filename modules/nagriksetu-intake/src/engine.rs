use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use nagriksetu_common::{
    Category, GeoPoint, NewTicket, Outcome, Page, Ticket, TicketResult, DEDUP_RADIUS_M,
};
use nagriksetu_store::{StoreError, TicketStore};

pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Decides whether a report is a new issue or another sighting of an open
/// one, and applies the resulting state change.
///
/// A report merges into the nearest open ticket of the same category within
/// [`DEDUP_RADIUS_M`] (inclusive); otherwise it becomes a new ticket. The
/// find and the write happen in one atomic store call, so concurrent reports
/// of the same spot cannot both create a ticket.
#[derive(Clone)]
pub struct DedupEngine {
    store: Arc<dyn TicketStore>,
    radius_m: f64,
    timeout: Duration,
}

impl DedupEngine {
    pub fn new(store: Arc<dyn TicketStore>) -> Self {
        Self {
            store,
            radius_m: DEDUP_RADIUS_M,
            timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    /// Bound on every store call. Exceeding it fails with [`StoreError::Timeout`].
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn radius_m(&self) -> f64 {
        self.radius_m
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn submit(
        &self,
        category: Category,
        point: GeoPoint,
        description: Option<&str>,
    ) -> Result<TicketResult, StoreError> {
        self.submit_ticket(NewTicket::new(category, description, point))
            .await
    }

    pub async fn submit_ticket(&self, report: NewTicket) -> Result<TicketResult, StoreError> {
        let category = report.category;
        let result = self
            .bounded(self.store.record_report(report, self.radius_m))
            .await?;

        let ticket = &result.ticket;
        match result.outcome {
            Outcome::Duplicate => info!(
                ticket_id = %ticket.id,
                %category,
                report_count = ticket.report_count,
                "Duplicate found, increased report count"
            ),
            Outcome::Created => info!(ticket_id = %ticket.id, %category, "Created new ticket"),
        }

        Ok(result)
    }

    pub async fn list(&self, page: Page) -> Result<Vec<Ticket>, StoreError> {
        self.bounded(self.store.list(page)).await
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| StoreError::Timeout(self.timeout))?
    }
}
