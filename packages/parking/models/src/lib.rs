#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Parking filter criteria and query-string normalization.
//!
//! The dashboard sends its filter controls as loose query-string values
//! (comma-separated years, weekday abbreviations, an `hh`/`mm` pair, ...).
//! This crate turns those raw strings into a typed [`FilterCriteria`].
//! Malformed tokens are dropped silently: bad filter input never fails a
//! request, it only narrows less.

use std::collections::BTreeSet;

use strum_macros::{Display, EnumString};

/// Day of the week in the fixed 1-7 numbering used by the history queries
/// (Sunday = 1 through Saturday = 7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Weekday {
    /// Sunday (1)
    Sun = 1,
    /// Monday (2)
    Mon = 2,
    /// Tuesday (3)
    Tue = 3,
    /// Wednesday (4)
    Wed = 4,
    /// Thursday (5)
    Thu = 5,
    /// Friday (6)
    Fri = 6,
    /// Saturday (7)
    Sat = 7,
}

impl Weekday {
    /// Returns the fixed day number (Sunday = 1).
    #[must_use]
    pub const fn number(self) -> i32 {
        self as i32
    }
}

/// Upper bound on the time of day of a history row (inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeCeiling {
    /// Hour of the day.
    pub hour: i32,
    /// Minute within the hour.
    pub minute: i32,
}

/// Raw, unvalidated filter values as they arrive on the query string.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawFilters<'a> {
    /// Comma-separated years.
    pub years: Option<&'a str>,
    /// Comma-separated months (1-12).
    pub months: Option<&'a str>,
    /// Comma-separated day numbers or three-letter weekday names.
    pub days: Option<&'a str>,
    /// Hour of the time-of-day ceiling.
    pub hour: Option<&'a str>,
    /// Minute of the time-of-day ceiling.
    pub minute: Option<&'a str>,
    /// Free-text street substring.
    pub street: Option<&'a str>,
    /// Zone number.
    pub zone: Option<&'a str>,
}

/// Normalized constraints for the parking marker lookup.
///
/// Every dimension is optional. Years, months, days and the time ceiling are
/// the *temporal* dimensions; any one of them switches the lookup from the
/// latest snapshot to the history tables. Street and zone narrow either way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    /// Years of the status timestamp.
    pub years: BTreeSet<i32>,
    /// Months of the status timestamp.
    pub months: BTreeSet<i32>,
    /// Days of the week of the status timestamp (Sunday = 1).
    pub days: BTreeSet<i32>,
    /// Time-of-day ceiling.
    pub time: Option<TimeCeiling>,
    /// Case-insensitive street name substring.
    pub street: Option<String>,
    /// Exact zone number.
    pub zone: Option<i64>,
}

impl FilterCriteria {
    /// Normalizes raw query-string values.
    #[must_use]
    pub fn from_raw(raw: RawFilters<'_>) -> Self {
        Self {
            years: parse_int_list(raw.years),
            months: parse_int_list(raw.months),
            days: parse_day_list(raw.days),
            time: parse_time_ceiling(raw.hour, raw.minute),
            street: parse_street(raw.street),
            zone: parse_zone(raw.zone),
        }
    }

    /// Whether any temporal dimension is constrained.
    ///
    /// Street and zone alone do not count.
    #[must_use]
    pub fn filters_active(&self) -> bool {
        !self.years.is_empty()
            || !self.months.is_empty()
            || !self.days.is_empty()
            || self.time.is_some()
    }
}

/// Splits a comma-separated list into base-10 integers, dropping any token
/// that does not parse.
#[must_use]
pub fn parse_int_list(raw: Option<&str>) -> BTreeSet<i32> {
    raw.map(|s| s.split(',').filter_map(|t| t.trim().parse().ok()).collect())
        .unwrap_or_default()
}

/// Parses a single day token: a plain integer is taken as-is, otherwise a
/// three-letter weekday abbreviation in any case.
#[must_use]
pub fn parse_day_token(token: &str) -> Option<i32> {
    let token = token.trim();
    token
        .parse::<i32>()
        .ok()
        .or_else(|| token.parse::<Weekday>().ok().map(Weekday::number))
}

/// Splits a comma-separated list of day tokens, dropping unrecognized ones.
#[must_use]
pub fn parse_day_list(raw: Option<&str>) -> BTreeSet<i32> {
    raw.map(|s| s.split(',').filter_map(parse_day_token).collect())
        .unwrap_or_default()
}

/// Builds a time ceiling when both `hour` and `minute` are present and
/// non-blank. A part that fails to parse becomes 0.
#[must_use]
pub fn parse_time_ceiling(hour: Option<&str>, minute: Option<&str>) -> Option<TimeCeiling> {
    let hour = hour.map(str::trim).filter(|h| !h.is_empty())?;
    let minute = minute.map(str::trim).filter(|m| !m.is_empty())?;

    Some(TimeCeiling {
        hour: hour.parse().unwrap_or(0),
        minute: minute.parse().unwrap_or(0),
    })
}

/// Trims the street filter; blank input means no street constraint.
#[must_use]
pub fn parse_street(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Parses the zone filter; blank or non-numeric input means no zone
/// constraint.
#[must_use]
pub fn parse_zone(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|z| z.trim().parse().ok())
}
