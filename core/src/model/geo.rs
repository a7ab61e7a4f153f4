// core/src/model/geo.rs

use serde::{Deserialize, Serialize};

/// A WGS84 coordinate pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
  pub lat: f64,
  pub lng: f64,
}

impl GeoPoint {
  pub fn new(lat: f64, lng: f64) -> Self {
    GeoPoint { lat, lng }
  }
}
