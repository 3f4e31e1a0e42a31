//! Geohash cells used as the spatial key for indexing and write serialization.
//!
//! At precision 7 a cell is ~153 m tall and ~153 m·cos(lat) wide. As long as
//! the search radius is no wider than a cell, every point within the radius
//! of `p` lies in `p`'s cell or one of its eight neighbors.

use nagriksetu_common::{Category, GeoPoint, EARTH_RADIUS_M};

pub const CELL_PRECISION: usize = 7;

/// 35 bits at precision 7: 17 latitude bits, 18 longitude bits.
const CELL_LAT_SPAN_DEG: f64 = 180.0 / 131_072.0;
const CELL_LNG_SPAN_DEG: f64 = 360.0 / 262_144.0;

/// Geohash of the cell containing `point`.
pub fn cell_of(point: GeoPoint) -> Option<String> {
    geohash::encode(
        geohash::Coord {
            x: point.lng,
            y: point.lat,
        },
        CELL_PRECISION,
    )
    .ok()
}

/// The cell containing `point` plus its eight neighbors, sorted.
///
/// `None` when `radius_m` is wider than a cell at this latitude or the
/// neighborhood cannot be computed (poles, antimeridian). Callers must then
/// fall back to a category-wide scan or lock.
pub fn neighborhood(point: GeoPoint, radius_m: f64) -> Option<Vec<String>> {
    if !radius_fits_cell(point.lat, radius_m) {
        return None;
    }
    let center = cell_of(point)?;
    let n = geohash::neighbors(&center).ok()?;
    let mut cells = vec![center, n.n, n.ne, n.e, n.se, n.s, n.sw, n.w, n.nw];
    cells.sort();
    cells.dedup();
    Some(cells)
}

/// Advisory locks a writer must hold before deciding whether a report is a
/// duplicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteLocks {
    /// Category key held shared, then every cell key exclusively, in order.
    Cells { category: String, cells: Vec<String> },
    /// Category key held exclusively. Used when the radius cannot be covered
    /// by the cell neighborhood.
    Category(String),
}

impl WriteLocks {
    pub fn for_report(category: Category, point: GeoPoint, radius_m: f64) -> Self {
        let category_key = format!("civic_tickets:{}", category.as_str());
        match neighborhood(point, radius_m) {
            Some(cells) => WriteLocks::Cells {
                cells: cells
                    .into_iter()
                    .map(|cell| format!("{category_key}:{cell}"))
                    .collect(),
                category: category_key,
            },
            None => WriteLocks::Category(category_key),
        }
    }

    /// True when two writers holding these locks would block each other.
    pub fn conflicts_with(&self, other: &WriteLocks) -> bool {
        match (self, other) {
            (WriteLocks::Category(a), WriteLocks::Category(b)) => a == b,
            (WriteLocks::Category(a), WriteLocks::Cells { category: b, .. })
            | (WriteLocks::Cells { category: b, .. }, WriteLocks::Category(a)) => a == b,
            (WriteLocks::Cells { cells: a, .. }, WriteLocks::Cells { cells: b, .. }) => {
                a.iter().any(|k| b.contains(k))
            }
        }
    }
}

fn radius_fits_cell(lat: f64, radius_m: f64) -> bool {
    let meters_per_deg = EARTH_RADIUS_M.to_radians();
    let lat_span_m = CELL_LAT_SPAN_DEG * meters_per_deg;
    // Use the cell edge nearest the pole, where it is narrowest.
    let worst_lat = (lat.abs() + CELL_LAT_SPAN_DEG).min(90.0);
    let lng_span_m = CELL_LNG_SPAN_DEG * meters_per_deg * worst_lat.to_radians().cos();
    radius_m <= lat_span_m.min(lng_span_m)
}
