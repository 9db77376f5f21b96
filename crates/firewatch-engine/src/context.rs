//! Shared view-context snapshot for the chat/UI layer.
//!
//! The controller is the only writer; the chat layer reads on demand when
//! composing the assistant's hidden context payload. Writes replace the
//! whole snapshot so a reader never observes a half-updated view.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use firewatch_feeds::{FirePoint, GeoBounds};

/// Where the camera is looking, in user-facing terms.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentLocation {
    /// Display name, if one is known (e.g. from a search).
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Camera altitude in kilometers, shown as the "zoom level".
    pub zoom_km: f64,
}

/// The most recent committed prediction, for the summary footer.
#[derive(Debug, Clone, PartialEq)]
pub struct LastPrediction {
    pub latitude: f64,
    pub longitude: f64,
    pub risk: String,
    pub timestamp: DateTime<Utc>,
}

/// What is currently on screen, as one immutable value.
#[derive(Debug, Clone, Default)]
pub struct ViewSnapshot {
    pub current_location: Option<CurrentLocation>,
    pub visible_fires: Vec<FirePoint>,
    pub bounding_box: Option<GeoBounds>,
    pub last_prediction: Option<LastPrediction>,
}

impl ViewSnapshot {
    /// Render the snapshot as the assistant's hidden context text.
    #[must_use]
    pub fn summary(&self, now: DateTime<Utc>) -> String {
        let mut summary = String::from("Current view context:\n");

        if let Some(location) = &self.current_location {
            summary.push_str(&format!(
                "Location: {} ({:.4}, {:.4})\n",
                location.name, location.latitude, location.longitude
            ));
            summary.push_str(&format!(
                "Zoom level: {:.0}km altitude\n",
                location.zoom_km
            ));
        }

        if let Some(bounds) = &self.bounding_box {
            summary.push_str(&format!(
                "Viewing area: {:.2}\u{b0}N to {:.2}\u{b0}S, {:.2}\u{b0}W to {:.2}\u{b0}E\n",
                bounds.north, bounds.south, bounds.west, bounds.east
            ));
        }

        if self.visible_fires.is_empty() {
            summary.push_str("No active fires detected in the current viewing area\n");
        } else {
            self.summarize_fires(&mut summary);
        }

        if let Some(prediction) = &self.last_prediction {
            let age_secs = (now - prediction.timestamp).num_seconds().max(0);
            summary.push_str(&format!(
                "Last prediction: {} risk at {:.4}, {:.4} ({age_secs}s ago)\n",
                prediction.risk, prediction.latitude, prediction.longitude
            ));
        }

        summary.push_str("\nThis information reflects what the user is currently viewing on the 3D map.");
        summary
    }

    fn summarize_fires(&self, summary: &mut String) {
        let fires = &self.visible_fires;
        summary.push_str(&format!(
            "Active fires visible: {} fire points\n",
            fires.len()
        ));

        let high = fires.iter().filter(|f| f.confidence > 80.0).count();
        let medium = fires
            .iter()
            .filter(|f| (50.0..=80.0).contains(&f.confidence))
            .count();
        let low = fires.iter().filter(|f| f.confidence < 50.0).count();
        if high > 0 {
            summary.push_str(&format!("  - High confidence: {high} fires\n"));
        }
        if medium > 0 {
            summary.push_str(&format!("  - Medium confidence: {medium} fires\n"));
        }
        if low > 0 {
            summary.push_str(&format!("  - Low confidence: {low} fires\n"));
        }

        let mut satellites: Vec<&str> = fires.iter().map(|f| f.satellite.as_str()).collect();
        satellites.sort_unstable();
        satellites.dedup();
        summary.push_str(&format!(
            "  - Data from satellites: {}\n",
            satellites.join(", ")
        ));

        let elevations: Vec<f64> = fires
            .iter()
            .filter(|f| f.elevation > 0.0)
            .map(|f| f.elevation)
            .collect();
        if !elevations.is_empty() {
            let min = elevations.iter().copied().fold(f64::INFINITY, f64::min);
            let max = elevations.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            #[allow(clippy::cast_precision_loss)]
            let avg = elevations.iter().sum::<f64>() / elevations.len() as f64;
            summary.push_str(&format!(
                "  - Elevation range: {min:.0}m - {max:.0}m (avg: {avg:.0}m)\n"
            ));
        }

        let mut cover_counts: HashMap<&str, usize> = HashMap::new();
        for cover in fires
            .iter()
            .filter_map(|f| f.terrain.as_ref()?.land_cover.as_deref())
        {
            *cover_counts.entry(cover).or_default() += 1;
        }
        if !cover_counts.is_empty() {
            let mut covers: Vec<(&str, usize)> = cover_counts.into_iter().collect();
            covers.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
            let line = covers
                .iter()
                .take(3)
                .map(|(cover, count)| format!("{cover} ({count})"))
                .collect::<Vec<_>>()
                .join(", ");
            summary.push_str(&format!("  - Land cover types: {line}\n"));
        }

        let mut recent: Vec<&FirePoint> = fires.iter().collect();
        recent.sort_by(|a, b| b.acq_date.cmp(&a.acq_date));
        summary.push_str("  - Most recent fires:\n");
        for fire in recent.iter().take(3) {
            let elevation = if fire.elevation > 0.0 {
                format!(" at {:.0}m elevation", fire.elevation)
            } else {
                String::new()
            };
            let terrain = fire
                .terrain
                .as_ref()
                .and_then(|t| t.land_cover.as_deref())
                .map(|cover| format!(" ({cover})"))
                .unwrap_or_default();
            summary.push_str(&format!(
                "    - {} at {:.3}, {:.3}{elevation}{terrain} (confidence: {:.0}%)\n",
                fire.acq_date, fire.latitude, fire.longitude, fire.confidence
            ));
        }
    }
}

/// Shared handle through which the controller publishes snapshots.
///
/// Replace-whole-value semantics: readers get either the previous snapshot
/// or the new one, never a mixture.
#[derive(Debug, Clone, Default)]
pub struct SharedViewContext {
    inner: Arc<RwLock<Option<ViewSnapshot>>>,
}

impl SharedViewContext {
    /// Create an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the published snapshot.
    pub fn publish(&self, snapshot: ViewSnapshot) {
        if let Ok(mut guard) = self.inner.write() {
            *guard = Some(snapshot);
        }
    }

    /// Read the current snapshot, if one has been published.
    #[must_use]
    pub fn read(&self) -> Option<ViewSnapshot> {
        self.inner.read().ok().and_then(|guard| guard.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fire(satellite: &str, confidence: f64, elevation: f64, acq_date: &str) -> FirePoint {
        let json = format!(
            r#"{{
                "id": "t",
                "latitude": -13.517,
                "longitude": -71.967,
                "acq_date": "{acq_date}",
                "satellite": "{satellite}",
                "confidence": {confidence},
                "elevation": {elevation},
                "temperature": null,
                "wind_speed": null,
                "precipitation": null,
                "terrain": {{"elevation": {elevation}, "land_cover": "grassland", "slope": 5.0}}
            }}"#
        );
        serde_json::from_str(&json).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 6, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_empty_snapshot_reports_no_fires() {
        let summary = ViewSnapshot::default().summary(now());
        assert!(summary.contains("No active fires detected"));
        assert!(summary.ends_with("viewing on the 3D map."));
    }

    #[test]
    fn test_summary_groups_by_confidence() {
        let snapshot = ViewSnapshot {
            visible_fires: vec![
                fire("Terra", 92.0, 3390.0, "2025-10-05"),
                fire("Aqua", 65.0, 3441.0, "2025-10-04"),
                fire("Terra", 30.0, 0.0, "2025-10-03"),
            ],
            ..ViewSnapshot::default()
        };
        let summary = snapshot.summary(now());

        assert!(summary.contains("Active fires visible: 3 fire points"));
        assert!(summary.contains("High confidence: 1 fires"));
        assert!(summary.contains("Medium confidence: 1 fires"));
        assert!(summary.contains("Low confidence: 1 fires"));
        assert!(summary.contains("Data from satellites: Aqua, Terra"));
    }

    #[test]
    fn test_summary_elevation_and_land_cover() {
        let snapshot = ViewSnapshot {
            visible_fires: vec![
                fire("Terra", 92.0, 3000.0, "2025-10-05"),
                fire("Terra", 92.0, 4000.0, "2025-10-05"),
            ],
            ..ViewSnapshot::default()
        };
        let summary = snapshot.summary(now());

        assert!(summary.contains("Elevation range: 3000m - 4000m (avg: 3500m)"));
        assert!(summary.contains("Land cover types: grassland (2)"));
    }

    #[test]
    fn test_summary_prediction_age() {
        let snapshot = ViewSnapshot {
            last_prediction: Some(LastPrediction {
                latitude: 0.5,
                longitude: 0.5,
                risk: "high".to_string(),
                timestamp: now() - chrono::Duration::seconds(42),
            }),
            ..ViewSnapshot::default()
        };
        let summary = snapshot.summary(now());
        assert!(summary.contains("Last prediction: high risk at 0.5000, 0.5000 (42s ago)"));
    }

    #[test]
    fn test_shared_context_replace_whole_value() {
        let context = SharedViewContext::new();
        assert!(context.read().is_none());

        context.publish(ViewSnapshot {
            visible_fires: vec![fire("Terra", 92.0, 0.0, "2025-10-05")],
            ..ViewSnapshot::default()
        });
        assert_eq!(context.read().unwrap().visible_fires.len(), 1);

        context.publish(ViewSnapshot::default());
        assert!(context.read().unwrap().visible_fires.is_empty());
    }
}
