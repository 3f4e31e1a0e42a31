use async_trait::async_trait;
use uuid::Uuid;

use nagriksetu_common::{
    within_radius, Category, GeoPoint, NewTicket, Page, Ticket, TicketResult, TicketStatus,
};

use crate::error::Result;

// ---------------------------------------------------------------------------
// TicketStore
// ---------------------------------------------------------------------------

/// Persistence for tickets. Every write is individually atomic; the counter
/// is bumped by the store itself, never read-modify-written by callers.
#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Nearest open ticket of `category` within `radius_m` of `point`
    /// (inclusive). Ties go to the oldest ticket, then the lowest id.
    async fn find_within_radius(
        &self,
        category: Category,
        point: GeoPoint,
        radius_m: f64,
    ) -> Result<Option<Ticket>>;

    /// Persist a new open ticket with a report count of one.
    async fn insert(&self, ticket: NewTicket) -> Result<Ticket>;

    /// Add one report to an existing ticket and return the updated row.
    async fn increment_report_count(&self, id: Uuid) -> Result<Ticket>;

    /// Tickets in creation order.
    async fn list(&self, page: Page) -> Result<Vec<Ticket>>;

    async fn list_all(&self) -> Result<Vec<Ticket>> {
        self.list(Page::all()).await
    }

    /// Find-or-create-or-increment as one atomic step: if an open ticket of
    /// the same category lies within `radius_m`, count the report against it,
    /// otherwise insert `report` as a new ticket. Concurrent calls for nearby
    /// points are serialized so they cannot both insert.
    async fn record_report(&self, report: NewTicket, radius_m: f64) -> Result<TicketResult>;
}

/// Pick the ticket a report at `point` should merge into, applying the same
/// rule as [`TicketStore::find_within_radius`].
pub fn nearest_match<'a, I>(
    candidates: I,
    category: Category,
    point: GeoPoint,
    radius_m: f64,
) -> Option<&'a Ticket>
where
    I: IntoIterator<Item = &'a Ticket>,
{
    candidates
        .into_iter()
        .filter(|t| t.category == category && t.status == TicketStatus::Open)
        .map(|t| (point.distance_m(&t.location), t))
        .filter(|(d, _)| within_radius(*d, radius_m))
        .min_by(|(da, a), (db, b)| {
            da.total_cmp(db)
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.id.cmp(&b.id))
        })
        .map(|(_, t)| t)
}
