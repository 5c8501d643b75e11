//! Statement construction for the parking marker lookup.
//!
//! Two statement shapes exist. Without temporal filters the lookup reads the
//! `parking_bay_latest` view. With at least one temporal filter it first
//! finds, per bay, the latest history timestamp that satisfies every filter
//! and then joins back to `parking_bay_history` for the full row. Both shapes
//! share the zone/street narrowing, the zone-0 exclusion, and the street and
//! restriction aggregates.

use curbside_parking_models::FilterCriteria;

use crate::statement::{BoundValue, Conditions, Predicate, Statement, contains_pattern};

/// Length the session's `group_concat_max_len` is raised to before a
/// marker query, so the aggregated street and restriction columns are not
/// truncated.
pub const GROUP_CONCAT_MAX_LEN: u32 = 1_000_000;

/// Which statement shape a lookup uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryPath {
    /// Latest known status per bay.
    Snapshot,
    /// Latest status per bay among history rows matching temporal filters.
    Historical,
}

const MARKER_COLUMNS: &str = "SELECT CAST(b.bay_id AS CHAR) AS bay_id,
       CAST(b.zone_number AS SIGNED) AS zone_number,
       b.status_description,
       b.status_timestamp,
       CAST(b.latitude AS DOUBLE) AS latitude,
       CAST(b.longitude AS DOUBLE) AS longitude,
       CASE WHEN LOWER(b.status_description) = 'present' THEN 'P' ELSE 'U' END AS status_code,
       GROUP_CONCAT(DISTINCT s.street_name ORDER BY s.street_name SEPARATOR ', ') AS streets,
       GROUP_CONCAT(DISTINCT CONCAT(r.restriction_days, ' ',
                                    TIME_FORMAT(r.start_time, '%H:%i'), '-',
                                    TIME_FORMAT(r.end_time, '%H:%i'), ' ',
                                    r.restriction_display)
                    SEPARATOR '; ') AS restrictions";

const SNAPSHOT_SOURCE: &str = " FROM parking_bay_latest b";

const HISTORY_LATEST_HEAD: &str = " FROM (SELECT h.bay_id, MAX(h.status_timestamp) AS max_ts
       FROM parking_bay_history h";

const HISTORY_LATEST_TAIL: &str = " GROUP BY h.bay_id) m
 JOIN parking_bay_history b ON b.bay_id = m.bay_id AND b.status_timestamp = m.max_ts";

const ZONE_JOINS: &str = "
 LEFT JOIN parking_zone_streets s ON s.zone_number = b.zone_number
 LEFT JOIN parking_zone_restrictions r ON r.zone_number = b.zone_number";

const GROUP_AND_ORDER: &str = "
 GROUP BY b.bay_id, b.zone_number, b.status_description, b.status_timestamp,
          b.latitude, b.longitude
 ORDER BY b.bay_id";

const STREET_EXISTS: &str = "EXISTS (SELECT 1 FROM parking_zone_streets sx
         WHERE sx.zone_number = b.zone_number AND LOWER(sx.street_name) LIKE ?)";

/// A marker lookup ready to be rendered into a [`Statement`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerQuery {
    path: QueryPath,
    temporal: Conditions,
    narrowing: Conditions,
}

impl MarkerQuery {
    /// Builds the lookup for the given criteria.
    #[must_use]
    pub fn from_criteria(criteria: &FilterCriteria) -> Self {
        let path = if criteria.filters_active() {
            QueryPath::Historical
        } else {
            QueryPath::Snapshot
        };

        let mut temporal = Conditions::new();
        if path == QueryPath::Historical {
            temporal.push_opt(Predicate::in_ints(
                "years",
                "YEAR(h.status_timestamp)",
                &criteria.years,
            ));
            temporal.push_opt(Predicate::in_ints(
                "months",
                "MONTH(h.status_timestamp)",
                &criteria.months,
            ));
            // DAYOFWEEK() numbers Sunday as 1, matching the filter numbering.
            temporal.push_opt(Predicate::in_ints(
                "days",
                "DAYOFWEEK(h.status_timestamp)",
                &criteria.days,
            ));
            temporal.push_opt(criteria.time.map(|t| {
                Predicate::time_at_or_before("time", "h.status_timestamp", t.hour, t.minute)
            }));
        }

        let mut narrowing = Conditions::new();
        narrowing.push(Predicate::literal("real_zone", "b.zone_number <> 0"));
        narrowing.push_opt(
            criteria
                .zone
                .map(|zone| Predicate::eq_int("zone", "b.zone_number", zone)),
        );
        narrowing.push_opt(criteria.street.as_deref().map(|street| {
            Predicate::template(
                "street",
                STREET_EXISTS,
                vec![BoundValue::Text(contains_pattern(street))],
            )
        }));

        Self {
            path,
            temporal,
            narrowing,
        }
    }

    /// The selected statement shape.
    #[must_use]
    pub const fn path(&self) -> QueryPath {
        self.path
    }

    /// Names of all active predicates, temporal first.
    #[must_use]
    pub fn predicate_names(&self) -> Vec<&'static str> {
        let mut names = self.temporal.names();
        names.extend(self.narrowing.names());
        names
    }

    /// Renders the SQL text and its positional parameters.
    #[must_use]
    pub fn render(&self) -> Statement {
        let mut sql = String::from(MARKER_COLUMNS);
        let mut params = Vec::new();

        match self.path {
            QueryPath::Snapshot => sql.push_str(SNAPSHOT_SOURCE),
            QueryPath::Historical => {
                sql.push_str(HISTORY_LATEST_HEAD);
                self.temporal.render_where(&mut sql, &mut params);
                sql.push_str(HISTORY_LATEST_TAIL);
            }
        }

        sql.push_str(ZONE_JOINS);
        self.narrowing.render_where(&mut sql, &mut params);
        sql.push_str(GROUP_AND_ORDER);

        Statement::with_params(sql, params)
    }
}

/// Session statement raising the aggregate length limit.
#[must_use]
pub fn session_setup() -> String {
    format!("SET SESSION group_concat_max_len = {GROUP_CONCAT_MAX_LEN}")
}

#[cfg(test)]
mod tests {
    use curbside_parking_models::RawFilters;

    use super::*;

    fn criteria(raw: RawFilters<'_>) -> FilterCriteria {
        FilterCriteria::from_raw(raw)
    }

    #[test]
    fn month_filter_selects_historical_path() {
        let query = MarkerQuery::from_criteria(&criteria(RawFilters {
            months: Some("3"),
            ..RawFilters::default()
        }));
        assert_eq!(query.path(), QueryPath::Historical);

        let statement = query.render();
        assert!(statement.sql.contains("MAX(h.status_timestamp)"));
        assert!(statement.sql.contains("MONTH(h.status_timestamp) IN (?)"));
        assert!(!statement.sql.contains("parking_bay_latest"));
        assert_eq!(statement.params, vec![BoundValue::Int(3)]);
    }

    #[test]
    fn zone_only_selects_snapshot_path() {
        let query = MarkerQuery::from_criteria(&criteria(RawFilters {
            zone: Some("7700"),
            ..RawFilters::default()
        }));
        assert_eq!(query.path(), QueryPath::Snapshot);

        let statement = query.render();
        assert!(statement.sql.contains("FROM parking_bay_latest b"));
        assert!(statement.sql.contains("b.zone_number = ?"));
        assert_eq!(statement.params, vec![BoundValue::Int(7700)]);
    }

    #[test]
    fn zone_zero_is_always_excluded() {
        for raw in [
            RawFilters::default(),
            RawFilters {
                zone: Some("0"),
                ..RawFilters::default()
            },
            RawFilters {
                years: Some("2019"),
                days: Some("mon"),
                ..RawFilters::default()
            },
        ] {
            let query = MarkerQuery::from_criteria(&criteria(raw));
            assert!(query.render().sql.contains("b.zone_number <> 0"));
            assert!(query.predicate_names().contains(&"real_zone"));
        }
    }

    #[test]
    fn temporal_predicates_are_anded_and_bound_in_order() {
        let query = MarkerQuery::from_criteria(&criteria(RawFilters {
            years: Some("2018,2017"),
            months: Some("12"),
            days: Some("sun,sat"),
            hour: Some("17"),
            minute: Some("45"),
            street: Some("Collins"),
            zone: Some("7700"),
        }));
        assert_eq!(
            query.predicate_names(),
            vec!["years", "months", "days", "time", "real_zone", "zone", "street"]
        );

        let statement = query.render();
        assert_eq!(
            statement.params,
            vec![
                BoundValue::Int(2017),
                BoundValue::Int(2018),
                BoundValue::Int(12),
                BoundValue::Int(1),
                BoundValue::Int(7),
                BoundValue::Int(17),
                BoundValue::Int(17),
                BoundValue::Int(45),
                BoundValue::Int(7700),
                BoundValue::Text("%collins%".to_string()),
            ]
        );
        assert_eq!(statement.sql.matches('?').count(), statement.params.len());
        assert!(statement.sql.contains(
            "YEAR(h.status_timestamp) IN (?, ?) AND MONTH(h.status_timestamp) IN (?) AND DAYOFWEEK(h.status_timestamp) IN (?, ?)"
        ));
    }

    #[test]
    fn user_text_never_reaches_sql() {
        let hostile = "x'); DROP TABLE parking_bay_history; --";
        let statement = MarkerQuery::from_criteria(&criteria(RawFilters {
            street: Some(hostile),
            years: Some("2019"),
            ..RawFilters::default()
        }))
        .render();

        assert!(!statement.sql.contains("DROP TABLE"));
        assert!(
            statement
                .params
                .contains(&BoundValue::Text(format!("%{}%", hostile.to_lowercase())))
        );
    }

    #[test]
    fn both_paths_aggregate_streets_and_restrictions() {
        for raw in [
            RawFilters::default(),
            RawFilters {
                hour: Some("8"),
                minute: Some("0"),
                ..RawFilters::default()
            },
        ] {
            let sql = MarkerQuery::from_criteria(&criteria(raw)).render().sql;
            assert!(sql.contains("SEPARATOR ', ') AS streets"));
            assert!(sql.contains("SEPARATOR '; ') AS restrictions"));
            assert!(sql.contains("GROUP BY b.bay_id"));
        }
    }

    #[test]
    fn session_setup_raises_concat_limit() {
        assert_eq!(
            session_setup(),
            "SET SESSION group_concat_max_len = 1000000"
        );
    }
}
