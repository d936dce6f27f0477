//! Derived workout statistics over the merged activity set.
//!
//! Everything here is a pure function of the record slice and a supplied
//! "now", so the rolling windows are reproducible in tests. Commute trips
//! are excluded from lists and totals by default but stay in storage.

use serde::Serialize;
use serde_json::{json, Value};
use time::{Duration, OffsetDateTime};

use crate::models::Activity;

/// Trailing window used for the "recent" totals (4 weeks).
pub const RECENT_WINDOW_DAYS: i64 = 28;

const METERS_TO_MILES: f64 = 0.000_621_371;
const METERS_TO_FEET: f64 = 3.280_84;
const MPS_TO_MPH: f64 = 2.236_94;

pub fn miles(meters: f64) -> f64 {
    round2(meters * METERS_TO_MILES)
}

pub fn feet(meters: f64) -> f64 {
    (meters * METERS_TO_FEET).round()
}

/// Average pace in minutes per mile; zero when the speed is zero.
pub fn pace_min_per_mile(meters_per_second: f64) -> f64 {
    let mph = meters_per_second * MPS_TO_MPH;
    if mph > 0.0 {
        round2(60.0 / mph)
    } else {
        0.0
    }
}

/// Aggregated totals for one set of activities.
#[derive(Debug, Default, PartialEq, Serialize)]
pub struct Totals {
    pub count: usize,
    /// Miles.
    pub distance: f64,
    /// Seconds.
    pub moving_time: i64,
    /// Seconds.
    pub elapsed_time: i64,
    /// Feet.
    pub elevation_gain: f64,
}

pub fn totals(activities: &[&Activity]) -> Totals {
    if activities.is_empty() {
        return Totals::default();
    }
    Totals {
        count: activities.len(),
        distance: miles(activities.iter().map(|a| a.distance).sum()),
        moving_time: activities.iter().map(|a| a.moving_time).sum(),
        elapsed_time: activities.iter().map(|a| a.elapsed_time).sum(),
        elevation_gain: feet(activities.iter().map(|a| a.total_elevation_gain).sum()),
    }
}

/// Non-commute activities of one sport, unordered.
pub fn by_sport<'a>(records: &'a [Activity], sport: &str) -> Vec<&'a Activity> {
    records
        .iter()
        .filter(|a| a.is_sport(sport) && !a.commute)
        .collect()
}

/// Newest-first by start date, truncated to `limit`.
pub fn newest<'a>(mut activities: Vec<&'a Activity>, limit: usize) -> Vec<&'a Activity> {
    activities.sort_by(|a, b| b.start_date.cmp(&a.start_date));
    activities.truncate(limit);
    activities
}

pub fn within_days<'a>(
    activities: &[&'a Activity],
    days: i64,
    now: OffsetDateTime,
) -> Vec<&'a Activity> {
    let cutoff = now - Duration::days(days);
    activities
        .iter()
        .filter(|a| a.start().map(|d| d >= cutoff).unwrap_or(false))
        .copied()
        .collect()
}

pub fn year_to_date<'a>(activities: &[&'a Activity], now: OffsetDateTime) -> Vec<&'a Activity> {
    activities
        .iter()
        .filter(|a| a.start().map(|d| d.year() == now.year()).unwrap_or(false))
        .copied()
        .collect()
}

/// All-time records: longest ride and biggest single climb.
pub fn record_stats(records: &[Activity]) -> Value {
    let biggest_ride = records
        .iter()
        .filter(|a| a.is_sport("Ride"))
        .map(|a| a.distance)
        .fold(0.0f64, f64::max);
    let biggest_climb = records
        .iter()
        .map(|a| a.total_elevation_gain)
        .fold(0.0f64, f64::max);
    json!({
        "biggest_ride_distance": miles(biggest_ride),
        "biggest_climb_elevation_gain": feet(biggest_climb),
    })
}

/// Per-activity presentation shape used in the recent lists.
pub fn format_activity(activity: &Activity) -> Value {
    json!({
        "id": activity.id,
        "name": activity.name,
        "type": activity.sport,
        "distance": miles(activity.distance),
        "moving_time": activity.moving_time,
        "elapsed_time": activity.elapsed_time,
        "elevation_gain": feet(activity.total_elevation_gain),
        "average_pace": pace_min_per_mile(activity.average_speed),
        "average_heartrate": activity.average_heartrate,
        "max_heartrate": activity.max_heartrate,
        "average_cadence": activity.average_cadence,
        "average_watts": activity.average_watts,
        "start_date": activity.start_date,
        "description": activity.description,
        "commute": activity.commute,
    })
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
