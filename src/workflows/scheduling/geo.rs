use serde::Serialize;

use super::domain::{Center, GeoPoint};

const EARTH_RADIUS_KM: f64 = 6371.0;

/// A center paired with its great-circle distance from the query origin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CenterDistance {
    pub center: Center,
    pub distance_km: f64,
}

/// Great-circle (haversine) distance between two points, in kilometers.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Centers within `radius_km` of `origin`, ascending by distance.
///
/// An empty result is not an error: it means no center is in range and the
/// caller may widen the radius.
pub fn suggest_centers(origin: GeoPoint, radius_km: f64, centers: &[Center]) -> Vec<CenterDistance> {
    let mut matches: Vec<CenterDistance> = centers
        .iter()
        .map(|center| CenterDistance {
            distance_km: haversine_km(origin, center.location()),
            center: center.clone(),
        })
        .filter(|candidate| candidate.distance_km <= radius_km)
        .collect();

    matches.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    matches
}
