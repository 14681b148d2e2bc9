// Position domain models - Raw fixes and the telemetry records built from them
use serde::{Deserialize, Serialize};

const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// A single fix as emitted by the position source.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionFix {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_meters: f64,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub heading: Option<f64>,
    pub captured_at_millis: i64,
}

impl PositionFix {
    pub fn new(latitude: f64, longitude: f64, accuracy_meters: f64, captured_at_millis: i64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy_meters,
            speed: None,
            heading: None,
            captured_at_millis,
        }
    }

    /// Great-circle distance in meters (haversine).
    pub fn distance_to(&self, other: &PositionFix) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let d_lat = lat2 - lat1;
        let d_lon = (other.longitude - self.longitude).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_METERS * a.sqrt().min(1.0).asin()
    }
}

/// An accepted fix waiting for delivery.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryRecord {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(rename = "accuracy")]
    pub accuracy_meters: f64,
    pub speed: Option<f64>,
    pub heading: Option<f64>,
    #[serde(rename = "timestamp")]
    pub captured_at_millis: i64,
    #[serde(rename = "batteryLevel")]
    pub battery_percent: Option<u8>,
    #[serde(rename = "activity")]
    pub motion_label: String,
    #[serde(skip)]
    pub enqueued_at_millis: i64,
    /// Assigned by the delivery queue; restores order when a batch is requeued.
    #[serde(skip)]
    pub sequence: u64,
}

impl TelemetryRecord {
    pub fn from_fix(
        fix: &PositionFix,
        battery_percent: Option<u8>,
        motion_label: &str,
        enqueued_at_millis: i64,
    ) -> Self {
        Self {
            latitude: fix.latitude,
            longitude: fix.longitude,
            accuracy_meters: fix.accuracy_meters,
            speed: fix.speed,
            heading: fix.heading,
            captured_at_millis: fix.captured_at_millis,
            battery_percent,
            motion_label: motion_label.to_string(),
            enqueued_at_millis,
            sequence: 0,
        }
    }
}

/// Request body of a single upload.
#[derive(Debug, Serialize)]
pub struct UploadPayload<'a> {
    pub locations: &'a [TelemetryRecord],
}
