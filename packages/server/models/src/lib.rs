#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the dashboard server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the database row types to allow independent evolution of the API
//! contract. Field casing follows what the dashboard frontend already
//! consumes: snake case for row data, camel case for the existence check.

use chrono::NaiveDateTime;
use curbside_database_models::{
    BayStatusCode, BayStatusRow, ExistenceCheck, ParkingMeta, QuarterlyIndexRow,
};
use curbside_parking_models::{FilterCriteria, RawFilters, parse_street, parse_zone};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};

/// Machine-readable error code carried in every error body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ApiErrorCode {
    /// Any failure while executing a database query.
    DbError,
}

/// Uniform error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code.
    pub error: ApiErrorCode,
}

impl ApiError {
    /// Body for a failed database query.
    #[must_use]
    pub const fn database() -> Self {
        Self {
            error: ApiErrorCode::DbError,
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiHealth {
    /// Whether the database answered the liveness query.
    pub ok: bool,
    /// Present only when the liveness query failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiErrorCode>,
}

/// Query parameters for `GET /api/parking/markers`.
///
/// Everything is taken as raw text so malformed values degrade to "no
/// constraint" instead of rejecting the request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarkerQueryParams {
    /// Street name substring.
    pub street: Option<String>,
    /// Zone number.
    pub zone: Option<String>,
    /// Comma-separated years.
    pub years: Option<String>,
    /// Comma-separated months.
    pub months: Option<String>,
    /// Comma-separated day numbers or weekday abbreviations.
    pub days: Option<String>,
    /// Hour of the time-of-day ceiling.
    pub hh: Option<String>,
    /// Minute of the time-of-day ceiling.
    pub mm: Option<String>,
}

impl MarkerQueryParams {
    /// Normalizes the parameters into filter criteria.
    #[must_use]
    pub fn to_criteria(&self) -> FilterCriteria {
        FilterCriteria::from_raw(RawFilters {
            years: self.years.as_deref(),
            months: self.months.as_deref(),
            days: self.days.as_deref(),
            hour: self.hh.as_deref(),
            minute: self.mm.as_deref(),
            street: self.street.as_deref(),
            zone: self.zone.as_deref(),
        })
    }
}

/// Query parameters for `GET /api/parking/exists`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExistsQueryParams {
    /// Street name substring.
    pub street: Option<String>,
    /// Zone number.
    pub zone: Option<String>,
}

impl ExistsQueryParams {
    /// Trimmed, non-blank street.
    #[must_use]
    pub fn street(&self) -> Option<String> {
        parse_street(self.street.as_deref())
    }

    /// Parsed zone number, if well-formed.
    #[must_use]
    pub fn zone(&self) -> Option<i64> {
        parse_zone(self.zone.as_deref())
    }
}

/// A parking bay marker as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiBayMarker {
    /// Bay identifier.
    pub bay_id: String,
    /// Parking zone number.
    pub zone_number: i64,
    /// Sensor status text.
    pub status_description: Option<String>,
    /// When the status was recorded.
    pub status_timestamp: Option<NaiveDateTime>,
    /// Latitude.
    pub latitude: Option<f64>,
    /// Longitude.
    pub longitude: Option<f64>,
    /// `P` (present) or `U` (unoccupied).
    pub status_code: BayStatusCode,
    /// Streets of the bay's zone, `", "`-separated.
    pub streets: Option<String>,
    /// Restrictions of the bay's zone, `"; "`-separated.
    pub restrictions: Option<String>,
}

impl From<BayStatusRow> for ApiBayMarker {
    fn from(row: BayStatusRow) -> Self {
        Self {
            bay_id: row.bay_id,
            zone_number: row.zone_number,
            status_description: row.status_description,
            status_timestamp: row.status_timestamp,
            latitude: row.latitude,
            longitude: row.longitude,
            status_code: row.status_code,
            streets: row.streets,
            restrictions: row.restrictions,
        }
    }
}

/// One point of the quarterly vehicle index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiQuarterlyIndex {
    /// Label such as `Q1-2017`.
    pub quarter_label: String,
    /// Calendar year.
    pub year: i32,
    /// Quarter (1-4).
    pub quarter: i32,
    /// Estimated vehicles added in the quarter.
    pub est_added_vehicles: i64,
    /// Compounded index value.
    pub index_val: f64,
}

impl From<QuarterlyIndexRow> for ApiQuarterlyIndex {
    fn from(row: QuarterlyIndexRow) -> Self {
        Self {
            quarter_label: row.quarter_label,
            year: row.year,
            quarter: row.quarter,
            est_added_vehicles: row.est_added_vehicles,
            index_val: row.index_val,
        }
    }
}

/// Filter control values for the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiParkingMeta {
    /// Years with history.
    pub years: Vec<i32>,
    /// Months with history.
    pub months: Vec<i32>,
    /// Streets linked to zones with history.
    pub streets: Vec<String>,
    /// Zones with history.
    pub zones: Vec<i64>,
}

impl From<ParkingMeta> for ApiParkingMeta {
    fn from(meta: ParkingMeta) -> Self {
        Self {
            years: meta.years,
            months: meta.months,
            streets: meta.streets,
            zones: meta.zones,
        }
    }
}

/// Response of the existence check.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiExistence {
    /// The street substring matches a reference street.
    pub street_exists: bool,
    /// The zone appears in the history.
    pub zone_exists: bool,
    /// History rows exist for the street (or zone).
    pub history_exists: bool,
}

impl From<ExistenceCheck> for ApiExistence {
    fn from(check: ExistenceCheck) -> Self {
        Self {
            street_exists: check.street_exists,
            zone_exists: check.zone_exists,
            history_exists: check.history_exists,
        }
    }
}
