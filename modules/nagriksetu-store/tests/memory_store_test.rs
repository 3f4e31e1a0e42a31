//! Behavior of the in-process store. No database required.

use std::sync::Arc;

use nagriksetu_common::{Category, GeoPoint, NewTicket, Outcome, Page, DEDUP_RADIUS_M};
use nagriksetu_store::cells::{cell_of, CELL_PRECISION};
use nagriksetu_store::{MemoryTicketStore, StoreError, TicketStore};
use uuid::Uuid;

fn bhopal() -> GeoPoint {
    GeoPoint::new(23.2599, 77.4126).unwrap()
}

fn report(category: Category, at: GeoPoint) -> NewTicket {
    NewTicket::new(category, None, at)
}

// =========================================================================
// Primitives
// =========================================================================

#[tokio::test]
async fn insert_assigns_defaults() {
    let store = MemoryTicketStore::new();
    let t = store
        .insert(NewTicket::new(Category::Pothole, Some("deep"), bhopal()))
        .await
        .unwrap();

    assert_eq!(t.report_count, 1);
    assert_eq!(t.status.as_str(), "open");
    assert_eq!(t.description, "deep");
    assert_eq!(t.location, bhopal());
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn increment_bumps_count_without_moving_ticket() {
    let store = MemoryTicketStore::new();
    let t = store.insert(report(Category::Pothole, bhopal())).await.unwrap();

    let once = store.increment_report_count(t.id).await.unwrap();
    let twice = store.increment_report_count(t.id).await.unwrap();

    assert_eq!(once.report_count, 2);
    assert_eq!(twice.report_count, 3);
    assert_eq!(twice.location, t.location);
    assert!(twice.last_reported_at >= t.last_reported_at);
}

#[tokio::test]
async fn increment_unknown_id_is_not_found() {
    let store = MemoryTicketStore::new();
    let id = Uuid::new_v4();
    let err = store.increment_report_count(id).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(missing) if missing == id));
}

#[tokio::test]
async fn find_within_radius_filters_by_category_and_distance() {
    let store = MemoryTicketStore::new();
    let t = store.insert(report(Category::Pothole, bhopal())).await.unwrap();

    let near = bhopal().destination(30.0, 9.9);
    let far = bhopal().destination(30.0, 10.1);

    let hit = store
        .find_within_radius(Category::Pothole, near, DEDUP_RADIUS_M)
        .await
        .unwrap();
    assert_eq!(hit.map(|h| h.id), Some(t.id));

    assert!(store
        .find_within_radius(Category::Pothole, far, DEDUP_RADIUS_M)
        .await
        .unwrap()
        .is_none());
    assert!(store
        .find_within_radius(Category::Garbage, bhopal(), DEDUP_RADIUS_M)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn find_crosses_cell_boundaries() {
    // Walk east until the 9.9 m neighbor lands in a different geohash cell.
    let store = MemoryTicketStore::new();
    let mut origin = bhopal();
    let mut neighbor = origin.destination(90.0, 9.9);
    while cell_of(origin) == cell_of(neighbor) {
        origin = origin.destination(90.0, 5.0);
        neighbor = origin.destination(90.0, 9.9);
    }
    assert_eq!(cell_of(origin).unwrap().len(), CELL_PRECISION);

    let t = store.insert(report(Category::Garbage, origin)).await.unwrap();
    let hit = store
        .find_within_radius(Category::Garbage, neighbor, DEDUP_RADIUS_M)
        .await
        .unwrap();
    assert_eq!(hit.map(|h| h.id), Some(t.id));
}

#[tokio::test]
async fn wide_radius_scans_everything() {
    let store = MemoryTicketStore::new();
    let t = store.insert(report(Category::Pothole, bhopal())).await.unwrap();
    let kilometer_away = bhopal().destination(0.0, 1_000.0);

    let hit = store
        .find_within_radius(Category::Pothole, kilometer_away, 1_500.0)
        .await
        .unwrap();
    assert_eq!(hit.map(|h| h.id), Some(t.id));
}

#[tokio::test]
async fn list_pages_in_creation_order() {
    let store = MemoryTicketStore::new();
    let mut ids = Vec::new();
    for i in 0..5 {
        let at = bhopal().destination(0.0, 100.0 * f64::from(i));
        ids.push(store.insert(report(Category::Pothole, at)).await.unwrap().id);
    }

    let all = store.list_all().await.unwrap();
    assert_eq!(all.iter().map(|t| t.id).collect::<Vec<_>>(), ids);

    let page = store.list(Page::new(Some(2), Some(1))).await.unwrap();
    assert_eq!(page.iter().map(|t| t.id).collect::<Vec<_>>(), ids[1..3]);

    let past_end = store.list(Page::new(Some(10), Some(10))).await.unwrap();
    assert!(past_end.is_empty());
}

// =========================================================================
// record_report
// =========================================================================

#[tokio::test]
async fn record_report_creates_then_merges() {
    let store = MemoryTicketStore::new();

    let first = store
        .record_report(report(Category::Pothole, bhopal()), DEDUP_RADIUS_M)
        .await
        .unwrap();
    assert_eq!(first.outcome, Outcome::Created);
    assert_eq!(first.ticket.report_count, 1);

    let second = store
        .record_report(report(Category::Pothole, bhopal()), DEDUP_RADIUS_M)
        .await
        .unwrap();
    assert_eq!(second.outcome, Outcome::Duplicate);
    assert_eq!(second.ticket.id, first.ticket.id);
    assert_eq!(second.ticket.report_count, 2);

    let other = store
        .record_report(report(Category::Garbage, bhopal()), DEDUP_RADIUS_M)
        .await
        .unwrap();
    assert_eq!(other.outcome, Outcome::Created);
    assert_ne!(other.ticket.id, first.ticket.id);
    assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn duplicate_keeps_original_description() {
    let store = MemoryTicketStore::new();
    store
        .record_report(
            NewTicket::new(Category::WaterLeak, Some("main line burst"), bhopal()),
            DEDUP_RADIUS_M,
        )
        .await
        .unwrap();
    let dup = store
        .record_report(
            NewTicket::new(Category::WaterLeak, Some("still leaking"), bhopal()),
            DEDUP_RADIUS_M,
        )
        .await
        .unwrap();
    assert_eq!(dup.ticket.description, "main line burst");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_reports_of_one_place_make_one_ticket() {
    let store = Arc::new(MemoryTicketStore::new());
    let n = 32;

    let handles: Vec<_> = (0..n)
        .map(|i| {
            let store = store.clone();
            // Jitter within a couple of meters of the same spot.
            let at = bhopal().destination(f64::from(i) * 11.0, f64::from(i % 3));
            tokio::spawn(async move {
                store
                    .record_report(report(Category::Pothole, at), DEDUP_RADIUS_M)
                    .await
            })
        })
        .collect();

    let results: Vec<_> = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|r| r.unwrap().unwrap())
        .collect();

    let created = results.iter().filter(|r| r.outcome == Outcome::Created).count();
    assert_eq!(created, 1);

    let tickets = store.list_all().await.unwrap();
    assert_eq!(tickets.len(), 1);
    assert_eq!(tickets[0].report_count, n);
}
