//! Typed records for the detection and prediction feeds.
//!
//! These types mirror the feed wire formats. Required fields are plain
//! values; fields the feeds sometimes omit are `Option` or carry a serde
//! default, so a sparse record decodes instead of failing the whole batch.

use serde::{Deserialize, Serialize};

use crate::dates::DateRange;

/// A geographic bounding box in degrees.
///
/// `north > south` always holds after construction. East/west describe a
/// rectangle in equirectangular space; a box that would cross the
/// antimeridian (east < west after wraparound) is clamped to the hemisphere
/// of its western edge rather than split into two requests.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    /// Northern edge, degrees latitude.
    pub north: f64,
    /// Southern edge, degrees latitude.
    pub south: f64,
    /// Eastern edge, degrees longitude.
    pub east: f64,
    /// Western edge, degrees longitude.
    pub west: f64,
}

impl GeoBounds {
    /// Create a bounding box, normalizing corner order.
    ///
    /// Latitudes are swapped if given south-first. Reversed longitudes with
    /// a gap under a hemisphere are treated the same way (a rolled camera
    /// can deliver corners in either order); a wider gap is a genuine
    /// antimeridian wrap and is clamped so that `east >= west`.
    #[must_use]
    pub fn new(north: f64, south: f64, east: f64, west: f64) -> Self {
        let (north, south) = if north >= south {
            (north, south)
        } else {
            (south, north)
        };
        let (east, west) = if east >= west {
            (east, west)
        } else if west - east < 180.0 {
            (west, east)
        } else {
            (180.0, west)
        };
        Self {
            north,
            south,
            east,
            west,
        }
    }

    /// Width of the box in degrees longitude.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.east - self.west
    }

    /// Height of the box in degrees latitude.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.north - self.south
    }

    /// Center of the box as `(latitude, longitude)`.
    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        (
            (self.north + self.south) / 2.0,
            (self.east + self.west) / 2.0,
        )
    }

    /// Whether a coordinate falls inside the box (edges inclusive).
    #[must_use]
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat <= self.north && lat >= self.south && lon <= self.east && lon >= self.west
    }
}

/// Terrain context attached to a fire point by the detection feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainInfo {
    /// Ground elevation in meters.
    pub elevation: Option<f64>,
    /// Land-cover class name (e.g. "evergreen forest").
    pub land_cover: Option<String>,
    /// Terrain slope in degrees.
    pub slope: Option<f64>,
}

/// Vegetation context attached to a fire point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VegetationInfo {
    /// Vegetation density class (e.g. "dense", "sparse").
    pub density: Option<String>,
}

/// An observed fire detection as returned by the detection feed.
///
/// Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirePoint {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub brightness: f64,
    #[serde(default)]
    pub scan: f64,
    #[serde(default)]
    pub track: f64,
    /// Acquisition date, ISO-8601 date string.
    pub acq_date: String,
    #[serde(default)]
    pub acq_time: String,
    pub satellite: String,
    #[serde(default)]
    pub instrument: String,
    /// Detection confidence, percent.
    pub confidence: f64,
    #[serde(default)]
    pub version: f64,
    #[serde(default)]
    pub bright_t31: f64,
    /// Fire radiative power.
    #[serde(default)]
    pub frp: f64,
    #[serde(default)]
    pub daynight: String,
    #[serde(rename = "type", default)]
    pub detection_type: i32,
    /// Ground elevation at the detection, meters. Zero when unknown.
    #[serde(default)]
    pub elevation: f64,
    #[serde(default)]
    pub land_cover: i32,
    #[serde(default)]
    pub slope: f64,
    pub temperature: Option<f64>,
    pub wind_speed: Option<f64>,
    pub precipitation: Option<f64>,
    pub terrain: Option<TerrainInfo>,
    pub vegetation: Option<VegetationInfo>,
}

/// Envelope returned by the detection feed.
#[derive(Debug, Clone, Deserialize)]
pub struct FireResponse {
    pub count: u32,
    #[serde(rename = "requestedLimit")]
    pub requested_limit: u32,
    #[serde(rename = "bboxProvided")]
    pub bbox_provided: bool,
    pub data: Vec<FirePoint>,
}

/// A model-predicted risk point from the prediction feed's risk grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictedPoint {
    pub latitude: f64,
    pub longitude: f64,
    /// Probability of fire in [0, 1].
    #[serde(default)]
    pub fire_probability: f64,
    /// Risk class label (e.g. "high", "moderate").
    pub risk_level: String,
    #[serde(default)]
    pub elevation: f64,
    #[serde(default)]
    pub humidity: f64,
    #[serde(default)]
    pub temperature: f64,
    #[serde(default)]
    pub wind_speed: f64,
    #[serde(default)]
    pub precipitation: f64,
    #[serde(default)]
    pub model_used: String,
    pub terrain: Option<TerrainInfo>,
    pub vegetation: Option<VegetationInfo>,
}

/// Response body from the prediction feed.
#[derive(Debug, Clone, Deserialize)]
pub struct PredictionResponse {
    #[serde(default)]
    pub risk_grid: Vec<PredictedPoint>,
    #[serde(default)]
    pub recommendations: Vec<serde_json::Value>,
    #[serde(default)]
    pub fire_risk_assessment: Vec<serde_json::Value>,
}

/// The per-cycle request bundle: where to look, when, and how much.
#[derive(Debug, Clone)]
pub struct FireQuery {
    /// Viewport-derived bounding box.
    pub bounds: GeoBounds,
    /// Date range for the detection feed.
    pub range: DateRange,
    /// Result-count cap for the detection feed.
    pub limit: u32,
}

impl FireQuery {
    /// Create a new query.
    #[must_use]
    pub fn new(bounds: GeoBounds, range: DateRange, limit: u32) -> Self {
        Self {
            bounds,
            range,
            limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_normalizes_latitude_order() {
        let bounds = GeoBounds::new(-13.6, -13.4, -71.9, -72.0);
        assert!(bounds.north > bounds.south);
        assert_eq!(bounds.north, -13.4);
        assert_eq!(bounds.south, -13.6);
    }

    #[test]
    fn test_bounds_swaps_reversed_longitudes() {
        // A rolled camera hands over east/west reversed; that is a swap,
        // not a date-line wrap.
        let bounds = GeoBounds::new(1.0, 0.0, 5.0, 10.0);
        assert_eq!(bounds.west, 5.0);
        assert_eq!(bounds.east, 10.0);
        assert_eq!(bounds.width(), 5.0);
    }

    #[test]
    fn test_bounds_clamps_antimeridian() {
        // A viewport straddling the date line: west at 179, east wrapped to -179.
        let bounds = GeoBounds::new(10.0, 0.0, -179.0, 179.0);
        assert_eq!(bounds.east, 180.0);
        assert_eq!(bounds.west, 179.0);
        assert!(bounds.width() > 0.0);
    }

    #[test]
    fn test_bounds_center_and_contains() {
        let bounds = GeoBounds::new(1.0, 0.0, 1.0, 0.0);
        assert_eq!(bounds.center(), (0.5, 0.5));
        assert!(bounds.contains(0.5, 0.5));
        assert!(bounds.contains(1.0, 1.0));
        assert!(!bounds.contains(1.1, 0.5));
        assert!(!bounds.contains(0.5, -0.1));
    }

    #[test]
    fn test_fire_point_decodes_sparse_record() {
        // Only the fields the feed always sends.
        let json = r#"{
            "id": "fp-1",
            "latitude": -13.517,
            "longitude": -71.967,
            "acq_date": "2025-10-05",
            "satellite": "Terra",
            "confidence": 85,
            "temperature": null,
            "wind_speed": null,
            "precipitation": null
        }"#;

        let point: FirePoint = serde_json::from_str(json).unwrap();
        assert_eq!(point.id, "fp-1");
        assert_eq!(point.confidence, 85.0);
        assert_eq!(point.elevation, 0.0);
        assert!(point.terrain.is_none());
    }

    #[test]
    fn test_fire_point_decodes_terrain_context() {
        let json = r#"{
            "id": "fp-2",
            "latitude": -13.5,
            "longitude": -71.9,
            "acq_date": "2025-10-05",
            "satellite": "Aqua",
            "confidence": 62,
            "elevation": 3390.0,
            "temperature": 21.5,
            "wind_speed": 3.2,
            "precipitation": null,
            "terrain": {"elevation": 3390.0, "land_cover": "grassland", "slope": 12.0},
            "vegetation": {"density": "sparse"}
        }"#;

        let point: FirePoint = serde_json::from_str(json).unwrap();
        assert_eq!(point.elevation, 3390.0);
        assert_eq!(
            point.terrain.unwrap().land_cover.as_deref(),
            Some("grassland")
        );
        assert_eq!(point.vegetation.unwrap().density.as_deref(), Some("sparse"));
    }

    #[test]
    fn test_prediction_response_defaults_empty_grid() {
        let response: PredictionResponse = serde_json::from_str("{}").unwrap();
        assert!(response.risk_grid.is_empty());
        assert!(response.recommendations.is_empty());
    }

    #[test]
    fn test_predicted_point_decodes() {
        let json = r#"{
            "latitude": 0.5,
            "longitude": 0.5,
            "fire_probability": 0.83,
            "risk_level": "high",
            "model_used": "andes-v2"
        }"#;

        let point: PredictedPoint = serde_json::from_str(json).unwrap();
        assert_eq!(point.risk_level, "high");
        assert_eq!(point.fire_probability, 0.83);
    }
}
