// core/src/dispatch/geo.rs

use crate::model::geo::GeoPoint;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two points, in kilometres.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
  let lat_a = a.lat.to_radians();
  let lat_b = b.lat.to_radians();
  let d_lat = (b.lat - a.lat).to_radians();
  let d_lng = (b.lng - a.lng).to_radians();

  let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lng / 2.0).sin().powi(2);
  2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}
