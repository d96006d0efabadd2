use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::weights::GeospatialWeights;

const EARTH_RADIUS_MILES: f64 = 3958.8;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    /// Checked constructor: latitude in [-90, 90], longitude in [-180, 180].
    pub fn new(lat: f64, lon: f64) -> Result<Self, String> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(format!("latitude {lat} is outside [-90, 90]"));
        }
        if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
            return Err(format!("longitude {lon} is outside [-180, 180]"));
        }
        Ok(Self { lat, lon })
    }

    /// Read a document location. Accepts `{"lat","lon"}`, `[lon, lat]`
    /// (GeoJSON order) and `"lat,lon"`.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Object(map) => {
                let lat = map.get("lat")?.as_f64()?;
                let lon = map.get("lon")?.as_f64()?;
                Self::new(lat, lon).ok()
            }
            Value::Array(pair) if pair.len() == 2 => {
                let lon = pair[0].as_f64()?;
                let lat = pair[1].as_f64()?;
                Self::new(lat, lon).ok()
            }
            Value::String(s) => {
                let (lat, lon) = s.split_once(',')?;
                Self::new(lat.trim().parse().ok()?, lon.trim().parse().ok()?).ok()
            }
            _ => None,
        }
    }
}

/// Great-circle distance in miles.
pub fn haversine_miles(a: GeoPoint, b: GeoPoint) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_MILES * h.sqrt().min(1.0).asin()
}

/// Gaussian proximity score: 1.0 inside `offset`, then
/// `exp(-((d - offset)^2 / (2 * scale^2)))`.
pub fn gaussian_decay(distance: f64, scale: f64, offset: f64) -> f64 {
    if distance <= offset {
        return 1.0;
    }
    let d = distance - offset;
    (-(d * d) / (2.0 * scale * scale)).exp()
}

/// Hard radius filter requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoFilter {
    pub origin: GeoPoint,
    pub distance_miles: f64,
}

impl GeoFilter {
    pub fn to_query(&self, field: &str) -> Value {
        serde_json::json!({
            "geo_distance": {
                "distance": format!("{}mi", self.distance_miles),
                field: { "lat": self.origin.lat, "lon": self.origin.lon }
            }
        })
    }
}

/// Scores documents by proximity to an origin with the active decay settings.
#[derive(Debug, Clone, Copy)]
pub struct GeoScorer {
    pub origin: GeoPoint,
    pub weight: f64,
    pub scale: f64,
    pub offset: f64,
}

impl GeoScorer {
    pub fn new(origin: GeoPoint, weights: &GeospatialWeights) -> Self {
        Self {
            origin,
            weight: weights.weight,
            scale: weights.decay_scale,
            offset: weights.decay_offset,
        }
    }

    /// Pre-weight decay score for a document `_source`, or `None` if it has
    /// no usable location.
    pub fn decay_for(&self, source: &Value) -> Option<f64> {
        let location = GeoPoint::from_value(source.get(super::LOCATION_FIELD)?)?;
        let distance = haversine_miles(self.origin, location);
        Some(gaussian_decay(distance, self.scale, self.offset))
    }
}
