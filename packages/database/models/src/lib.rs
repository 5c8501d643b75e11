#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Database row types for the dashboard queries.
//!
//! These types represent the shapes of data as retrieved from the parking
//! and vehicle registration tables. They are distinct from the API response
//! types in `curbside_server_models`.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Single-character occupancy code derived from a bay's status.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum BayStatusCode {
    /// A vehicle is present in the bay.
    #[serde(rename = "P")]
    #[strum(serialize = "P")]
    Present,
    /// The bay is free (any status other than present).
    #[default]
    #[serde(rename = "U")]
    #[strum(serialize = "U")]
    Unoccupied,
}

/// A parking bay's status as retrieved by the marker lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BayStatusRow {
    /// Bay identifier.
    pub bay_id: String,
    /// Parking zone the bay belongs to.
    pub zone_number: i64,
    /// Sensor status text (e.g. `Present`, `Unoccupied`).
    pub status_description: Option<String>,
    /// When the status was recorded.
    pub status_timestamp: Option<NaiveDateTime>,
    /// Latitude (WGS84).
    pub latitude: Option<f64>,
    /// Longitude (WGS84).
    pub longitude: Option<f64>,
    /// Derived occupancy code.
    pub status_code: BayStatusCode,
    /// Street names of the bay's zone joined with `", "`.
    pub streets: Option<String>,
    /// Restriction descriptions of the bay's zone joined with `"; "`.
    pub restrictions: Option<String>,
}

/// One quarter of the compounded vehicle registration index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarterlyIndexRow {
    /// Label such as `Q1-2017`.
    pub quarter_label: String,
    /// Calendar year.
    pub year: i32,
    /// Quarter within the year (1-4).
    pub quarter: i32,
    /// Estimated number of vehicles added during the quarter.
    pub est_added_vehicles: i64,
    /// Compounded index value (first quarter = 100).
    pub index_val: f64,
}

/// Distinct values observed in the parking history, used to populate the
/// dashboard's filter controls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParkingMeta {
    /// Years with history rows.
    pub years: Vec<i32>,
    /// Months with history rows.
    pub months: Vec<i32>,
    /// Street names linked to zones with history.
    pub streets: Vec<String>,
    /// Zone numbers with history (zone 0 excluded).
    pub zones: Vec<i64>,
}

/// Result of the street/zone existence lookup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistenceCheck {
    /// The street substring matches a reference street.
    pub street_exists: bool,
    /// The zone number appears in the history.
    pub zone_exists: bool,
    /// History rows are linked to the matched street (or, without a matched
    /// street, the zone exists).
    pub history_exists: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_code_serializes_as_single_letter() {
        assert_eq!(BayStatusCode::Present.as_ref(), "P");
        assert_eq!(BayStatusCode::Unoccupied.to_string(), "U");
        assert_eq!("P".parse::<BayStatusCode>(), Ok(BayStatusCode::Present));
        assert!("X".parse::<BayStatusCode>().is_err());
    }
}
