use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Mean Earth radius in meters. Matches the sphere PostGIS uses for
/// `geography` distance with `use_spheroid = false`, so in-memory and
/// database radius checks agree.
pub const EARTH_RADIUS_M: f64 = 6_371_008.771_4;

/// Reports of the same category this close to an open ticket are merged into it.
pub const DEDUP_RADIUS_M: f64 = 10.0;

/// Slack added to every radius comparison. Float error puts a point built
/// exactly on the boundary a few nanometers outside it.
pub const RADIUS_TOLERANCE_M: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordinateError {
    #[error("{axis} must be a finite number")]
    NotFinite { axis: &'static str },

    #[error("{axis} must be within [{min}, {max}], got {value}")]
    OutOfRange {
        axis: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

/// A WGS84 point. Construct through [`GeoPoint::new`] to get bounds checking.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Result<Self, CoordinateError> {
        Ok(Self {
            lat: check_latitude(lat)?,
            lng: check_longitude(lng)?,
        })
    }

    /// Great-circle distance to `other` in meters.
    pub fn distance_m(&self, other: &GeoPoint) -> f64 {
        haversine_m(self.lat, self.lng, other.lat, other.lng)
    }

    /// Point reached by travelling `distance_m` from here along the given
    /// initial bearing (degrees clockwise from north).
    pub fn destination(&self, bearing_deg: f64, distance_m: f64) -> GeoPoint {
        let delta = distance_m / EARTH_RADIUS_M;
        let theta = bearing_deg.to_radians();
        let phi1 = self.lat.to_radians();
        let lambda1 = self.lng.to_radians();

        let phi2 = (phi1.sin() * delta.cos() + phi1.cos() * delta.sin() * theta.cos()).asin();
        let lambda2 = lambda1
            + (theta.sin() * delta.sin() * phi1.cos()).atan2(delta.cos() - phi1.sin() * phi2.sin());

        let lng = (lambda2.to_degrees() + 540.0) % 360.0 - 180.0;
        GeoPoint {
            lat: phi2.to_degrees(),
            lng,
        }
    }
}

/// Latitude must be finite and within [-90, 90].
pub fn check_latitude(lat: f64) -> Result<f64, CoordinateError> {
    check_axis("lat", lat, 90.0).map(|_| lat)
}

/// Longitude must be finite and within [-180, 180].
pub fn check_longitude(lng: f64) -> Result<f64, CoordinateError> {
    check_axis("lng", lng, 180.0).map(|_| lng)
}

fn check_axis(axis: &'static str, value: f64, limit: f64) -> Result<(), CoordinateError> {
    if !value.is_finite() {
        return Err(CoordinateError::NotFinite { axis });
    }
    if value < -limit || value > limit {
        return Err(CoordinateError::OutOfRange {
            axis,
            value,
            min: -limit,
            max: limit,
        });
    }
    Ok(())
}

/// Haversine great-circle distance between two lat/lng points in meters.
pub fn haversine_m(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();
    let lat1_r = lat1.to_radians();
    let lat2_r = lat2.to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1_r.cos() * lat2_r.cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().min(1.0).asin();
    EARTH_RADIUS_M * c
}

/// Radius membership is inclusive: a point exactly on the boundary matches,
/// within [`RADIUS_TOLERANCE_M`].
pub fn within_radius(distance_m: f64, radius_m: f64) -> bool {
    distance_m <= radius_m + RADIUS_TOLERANCE_M
}
