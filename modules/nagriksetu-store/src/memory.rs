// In-process ticket store.
//
// Tickets live behind one mutex, with a geohash cell index so radius lookups
// only visit the nine cells around the query point. `record_report` does its
// find and its write under the same lock, which makes it atomic.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use nagriksetu_common::{Category, GeoPoint, NewTicket, Page, Ticket, TicketResult};

use crate::cells;
use crate::error::{Result, StoreError};
use crate::store::{nearest_match, TicketStore};

#[derive(Default)]
pub struct MemoryTicketStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    tickets: HashMap<Uuid, Ticket>,
    /// Insertion order, for listing.
    order: Vec<Uuid>,
    by_cell: HashMap<String, Vec<Uuid>>,
    /// Tickets whose location could not be hashed; always scanned.
    unindexed: Vec<Uuid>,
}

impl MemoryTicketStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Every mutation is a single insert or field update, so a poisoned
        // lock still guards consistent data.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Inner {
    fn find(&self, category: Category, point: GeoPoint, radius_m: f64) -> Option<Ticket> {
        match cells::neighborhood(point, radius_m) {
            Some(cells) => {
                let candidates = cells
                    .iter()
                    .filter_map(|cell| self.by_cell.get(cell))
                    .flatten()
                    .chain(self.unindexed.iter())
                    .filter_map(|id| self.tickets.get(id));
                nearest_match(candidates, category, point, radius_m).cloned()
            }
            None => nearest_match(self.tickets.values(), category, point, radius_m).cloned(),
        }
    }

    fn insert(&mut self, new: NewTicket) -> Ticket {
        let ticket = new.into_ticket(Utc::now());
        let id = ticket.id;
        match cells::cell_of(ticket.location) {
            Some(cell) => self.by_cell.entry(cell).or_default().push(id),
            None => self.unindexed.push(id),
        }
        self.order.push(id);
        self.tickets.insert(id, ticket.clone());
        ticket
    }

    fn increment(&mut self, id: Uuid) -> Result<Ticket> {
        let ticket = self.tickets.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        ticket.report_count = ticket.report_count.saturating_add(1);
        ticket.last_reported_at = Utc::now();
        Ok(ticket.clone())
    }
}

#[async_trait]
impl TicketStore for MemoryTicketStore {
    async fn find_within_radius(
        &self,
        category: Category,
        point: GeoPoint,
        radius_m: f64,
    ) -> Result<Option<Ticket>> {
        Ok(self.lock().find(category, point, radius_m))
    }

    async fn insert(&self, ticket: NewTicket) -> Result<Ticket> {
        Ok(self.lock().insert(ticket))
    }

    async fn increment_report_count(&self, id: Uuid) -> Result<Ticket> {
        self.lock().increment(id)
    }

    async fn list(&self, page: Page) -> Result<Vec<Ticket>> {
        let inner = self.lock();
        let limit = page.limit.map_or(usize::MAX, |l| l as usize);
        Ok(inner
            .order
            .iter()
            .skip(page.offset as usize)
            .take(limit)
            .filter_map(|id| inner.tickets.get(id).cloned())
            .collect())
    }

    async fn record_report(&self, report: NewTicket, radius_m: f64) -> Result<TicketResult> {
        let mut inner = self.lock();
        match inner.find(report.category, report.location, radius_m) {
            Some(existing) => Ok(TicketResult::duplicate(inner.increment(existing.id)?)),
            None => Ok(TicketResult::created(inner.insert(report))),
        }
    }
}
