//! Typed activity record shared between the fetcher, store, and stats layers.
//!
//! The wire shape comes from the Strava activity list endpoint. Fields we
//! never read are carried through a flattened map so a re-saved checkpoint
//! keeps everything an older run fetched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    /// Activity classification ("Run", "Ride", ...). `type` on the wire.
    #[serde(rename = "type", default)]
    pub sport: String,
    /// RFC3339 start timestamp as reported by the API.
    #[serde(default)]
    pub start_date: String,
    /// Distance in meters.
    #[serde(default)]
    pub distance: f64,
    /// Moving time in seconds.
    #[serde(default)]
    pub moving_time: i64,
    /// Elapsed time in seconds.
    #[serde(default)]
    pub elapsed_time: i64,
    /// Elevation gain in meters.
    #[serde(default)]
    pub total_elevation_gain: f64,
    /// Average speed in meters per second.
    #[serde(default)]
    pub average_speed: f64,
    #[serde(default)]
    pub average_heartrate: Option<f64>,
    #[serde(default)]
    pub max_heartrate: Option<f64>,
    #[serde(default)]
    pub average_cadence: Option<f64>,
    #[serde(default)]
    pub average_watts: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub commute: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Activity {
    /// Parsed start timestamp, `None` when the wire value is malformed.
    pub fn start(&self) -> Option<OffsetDateTime> {
        OffsetDateTime::parse(&self.start_date, &Rfc3339).ok()
    }

    /// Match against either the legacy `type` field or the newer `sport_type`.
    pub fn is_sport(&self, sport: &str) -> bool {
        if self.sport == sport {
            return true;
        }
        self.extra
            .get("sport_type")
            .and_then(Value::as_str)
            .map(|s| s == sport)
            .unwrap_or(false)
    }
}
