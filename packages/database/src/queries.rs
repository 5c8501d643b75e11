//! Dashboard queries: parking markers, filter metadata, existence checks,
//! the quarterly vehicle index, and the liveness check.

use curbside_database_models::{
    BayStatusCode, BayStatusRow, ExistenceCheck, ParkingMeta, QuarterlyIndexRow,
};
use curbside_parking_models::FilterCriteria;
use moosicbox_json_utils::database::ToValue as _;
use switchy_database::Row;

use crate::DbError;
use crate::db::DatabaseGateway;
use crate::markers::{MarkerQuery, session_setup};
use crate::quarterly::quarterly_index_statement;
use crate::statement::{BoundValue, Statement, contains_pattern};

/// Issues a trivial query and reports whether it answered `1`.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub async fn ping(gateway: &DatabaseGateway) -> Result<bool, DbError> {
    let rows = gateway.query(&Statement::new("SELECT 1 AS ok")).await?;
    let ok: i64 = rows
        .first()
        .ok_or_else(|| DbError::Conversion {
            message: "Liveness query returned no rows".to_string(),
        })?
        .to_value("ok")
        .map_err(|e| DbError::Conversion {
            message: format!("Failed to parse liveness value: {e}"),
        })?;
    Ok(ok == 1)
}

/// Looks up bay statuses matching the filter criteria.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn query_markers(
    gateway: &DatabaseGateway,
    criteria: &FilterCriteria,
) -> Result<Vec<BayStatusRow>, DbError> {
    let query = MarkerQuery::from_criteria(criteria);
    let statement = query.render();

    log::debug!(
        "Marker lookup via {:?} path with predicates {:?} ({} params)",
        query.path(),
        query.predicate_names(),
        statement.params.len()
    );

    let rows = gateway
        .query_in_session(&[session_setup()], &statement)
        .await?;

    rows.iter().map(bay_status_from_row).collect()
}

fn conversion<E: std::fmt::Display>(column: &'static str) -> impl FnOnce(E) -> DbError {
    move |e| DbError::Conversion {
        message: format!("Failed to parse {column}: {e}"),
    }
}

fn bay_status_from_row(row: &Row) -> Result<BayStatusRow, DbError> {
    let bay_id: String = row.to_value("bay_id").map_err(conversion("bay_id"))?;
    let zone_number: i64 = row
        .to_value("zone_number")
        .map_err(conversion("zone_number"))?;
    let status_code: String = row
        .to_value("status_code")
        .map_err(conversion("status_code"))?;
    let status_code: BayStatusCode = status_code.parse().map_err(conversion("status_code"))?;

    Ok(BayStatusRow {
        bay_id,
        zone_number,
        status_description: row.to_value("status_description").unwrap_or(None),
        status_timestamp: row.to_value("status_timestamp").unwrap_or(None),
        latitude: row.to_value("latitude").unwrap_or(None),
        longitude: row.to_value("longitude").unwrap_or(None),
        status_code,
        streets: row.to_value("streets").unwrap_or(None),
        restrictions: row.to_value("restrictions").unwrap_or(None),
    })
}

fn quarterly_index_from_row(row: &Row) -> Result<QuarterlyIndexRow, DbError> {
    let quarter_label: String = row
        .to_value("quarter_label")
        .map_err(conversion("quarter_label"))?;
    let year: i64 = row.to_value("year").map_err(conversion("year"))?;
    let quarter: i64 = row.to_value("quarter").map_err(conversion("quarter"))?;
    let est_added_vehicles: i64 = row
        .to_value("est_added_vehicles")
        .map_err(conversion("est_added_vehicles"))?;
    let index_val: f64 = row.to_value("index_val").map_err(conversion("index_val"))?;

    Ok(QuarterlyIndexRow {
        quarter_label,
        year: i32::try_from(year).map_err(conversion("year"))?,
        quarter: i32::try_from(quarter).map_err(conversion("quarter"))?,
        est_added_vehicles,
        index_val,
    })
}

/// Returns the compounded quarterly vehicle registration index in
/// chronological order.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn query_quarterly_index(
    gateway: &DatabaseGateway,
) -> Result<Vec<QuarterlyIndexRow>, DbError> {
    let rows = gateway.query(&quarterly_index_statement()).await?;

    rows.iter().map(quarterly_index_from_row).collect()
}

const META_YEARS: &str = "SELECT DISTINCT CAST(YEAR(status_timestamp) AS SIGNED) AS year
 FROM parking_bay_history
 WHERE status_timestamp IS NOT NULL
 ORDER BY year";

const META_MONTHS: &str = "SELECT DISTINCT CAST(MONTH(status_timestamp) AS SIGNED) AS month
 FROM parking_bay_history
 WHERE status_timestamp IS NOT NULL
 ORDER BY month";

const META_STREETS: &str = "SELECT DISTINCT s.street_name AS street
 FROM parking_zone_streets s
 WHERE s.street_name IS NOT NULL
   AND EXISTS (SELECT 1 FROM parking_bay_history h WHERE h.zone_number = s.zone_number)
 ORDER BY street";

const META_ZONES: &str = "SELECT DISTINCT CAST(zone_number AS SIGNED) AS zone
 FROM parking_bay_history
 WHERE zone_number <> 0
 ORDER BY zone";

async fn distinct_ints(
    gateway: &DatabaseGateway,
    sql: &'static str,
    column: &str,
) -> Result<Vec<i64>, DbError> {
    let rows = gateway.query(&Statement::new(sql)).await?;
    Ok(rows
        .iter()
        .filter_map(|row| {
            let value: Option<i64> = row.to_value(column).unwrap_or(None);
            value
        })
        .collect())
}

fn narrow(values: Vec<i64>) -> Vec<i32> {
    values
        .into_iter()
        .filter_map(|v| i32::try_from(v).ok())
        .collect()
}

/// Collects the distinct years, months, streets and zones seen in the
/// parking history. The four lookups run concurrently.
///
/// # Errors
///
/// Returns [`DbError`] if any of the lookups fails.
pub async fn query_parking_meta(gateway: &DatabaseGateway) -> Result<ParkingMeta, DbError> {
    let streets = async {
        let rows = gateway.query(&Statement::new(META_STREETS)).await?;
        Ok::<_, DbError>(
            rows.iter()
                .filter_map(|row| {
                    let street: Option<String> = row.to_value("street").unwrap_or(None);
                    street
                })
                .collect::<Vec<_>>(),
        )
    };

    let (years, months, streets, zones) = futures::try_join!(
        distinct_ints(gateway, META_YEARS, "year"),
        distinct_ints(gateway, META_MONTHS, "month"),
        streets,
        distinct_ints(gateway, META_ZONES, "zone"),
    )?;

    Ok(ParkingMeta {
        years: narrow(years),
        months: narrow(months),
        streets,
        zones,
    })
}

const STREET_EXISTS: &str = "SELECT 1 AS hit
 FROM parking_zone_streets
 WHERE LOWER(street_name) LIKE ?
 LIMIT 1";

const ZONE_EXISTS: &str = "SELECT 1 AS hit
 FROM parking_bay_history
 WHERE zone_number = ?
 LIMIT 1";

const STREET_HISTORY_EXISTS: &str = "SELECT 1 AS hit
 FROM parking_bay_history h
 JOIN parking_zone_streets s ON s.zone_number = h.zone_number
 WHERE LOWER(s.street_name) LIKE ?
 LIMIT 1";

async fn any_row(gateway: &DatabaseGateway, statement: &Statement) -> Result<bool, DbError> {
    Ok(!gateway.query(statement).await?.is_empty())
}

/// Reports whether a street substring and/or zone number are known.
///
/// `history_exists` is checked against history rows linked to the street
/// when the street matched a reference row; otherwise it mirrors
/// `zone_exists`.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn check_existence(
    gateway: &DatabaseGateway,
    street: Option<&str>,
    zone: Option<i64>,
) -> Result<ExistenceCheck, DbError> {
    let street_pattern = street.map(contains_pattern);

    let street_exists = match &street_pattern {
        Some(pattern) => {
            any_row(
                gateway,
                &Statement::with_params(STREET_EXISTS, vec![BoundValue::Text(pattern.clone())]),
            )
            .await?
        }
        None => false,
    };

    let zone_exists = match zone {
        Some(zone) => {
            any_row(
                gateway,
                &Statement::with_params(ZONE_EXISTS, vec![BoundValue::Int(zone)]),
            )
            .await?
        }
        None => false,
    };

    let history_exists = match street_pattern {
        Some(pattern) if street_exists => {
            any_row(
                gateway,
                &Statement::with_params(STREET_HISTORY_EXISTS, vec![BoundValue::Text(pattern)]),
            )
            .await?
        }
        _ => zone_exists,
    };

    Ok(ExistenceCheck {
        street_exists,
        zone_exists,
        history_exists,
    })
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use switchy_database::Database;
    use switchy_database_connection::init_sqlite_rusqlite;

    use super::*;

    fn temp_db_path() -> PathBuf {
        std::env::temp_dir().join(format!("curbside-{}.db", uuid::Uuid::new_v4()))
    }

    async fn seeded_gateway(path: &Path) -> DatabaseGateway {
        let db = init_sqlite_rusqlite(Some(path)).unwrap();
        seed(db.as_ref()).await;
        DatabaseGateway::new(db, 2)
    }

    async fn seed(db: &dyn Database) {
        db.exec_raw(
            "CREATE TABLE parking_zone_streets (
                zone_number INTEGER NOT NULL,
                street_name TEXT NOT NULL
            )",
        )
        .await
        .unwrap();
        db.exec_raw(
            "CREATE TABLE parking_bay_history (
                bay_id TEXT NOT NULL,
                zone_number INTEGER NOT NULL,
                status_description TEXT,
                status_timestamp TEXT
            )",
        )
        .await
        .unwrap();
        db.exec_raw(
            "INSERT INTO parking_zone_streets (zone_number, street_name) VALUES
                (7700, 'Collins Street'),
                (7701, 'Flinders Lane'),
                (7800, 'Lonsdale Street')",
        )
        .await
        .unwrap();
        db.exec_raw(
            "INSERT INTO parking_bay_history VALUES
                ('b1', 7700, 'Present', '2019-03-04 09:00:00'),
                ('b2', 7701, 'Unoccupied', '2019-03-04 10:00:00')",
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn ping_reports_live_database() {
        let path = temp_db_path();
        let gateway = seeded_gateway(&path).await;
        assert!(ping(&gateway).await.unwrap());
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn closed_gateway_rejects_queries() {
        let path = temp_db_path();
        let gateway = seeded_gateway(&path).await;
        gateway.close();
        assert!(gateway.is_closed());
        assert!(matches!(ping(&gateway).await, Err(DbError::PoolClosed)));
        let _ = std::fs::remove_file(path);
    }

    async fn select_one(gateway: &DatabaseGateway, sql: &'static str) -> Row {
        let mut rows = gateway.query(&Statement::new(sql)).await.unwrap();
        assert_eq!(rows.len(), 1);
        rows.remove(0)
    }

    #[tokio::test]
    async fn maps_bay_status_rows() {
        let path = temp_db_path();
        let gateway = seeded_gateway(&path).await;

        let row = select_one(
            &gateway,
            "SELECT 'b1' AS bay_id, 7700 AS zone_number,
                    'Present' AS status_description, NULL AS status_timestamp,
                    -37.8136 AS latitude, 144.9631 AS longitude, 'P' AS status_code,
                    'Collins Street' AS streets, NULL AS restrictions",
        )
        .await;
        let bay = bay_status_from_row(&row).unwrap();
        assert_eq!(bay.bay_id, "b1");
        assert_eq!(bay.zone_number, 7700);
        assert_eq!(bay.status_code, BayStatusCode::Present);
        assert_eq!(bay.status_description.as_deref(), Some("Present"));
        assert_eq!(bay.latitude, Some(-37.8136));
        assert_eq!(bay.streets.as_deref(), Some("Collins Street"));
        assert_eq!(bay.restrictions, None);
        assert_eq!(bay.status_timestamp, None);

        let row = select_one(
            &gateway,
            "SELECT 'b2' AS bay_id, 7701 AS zone_number, 'U' AS status_code",
        )
        .await;
        assert_eq!(
            bay_status_from_row(&row).unwrap().status_code,
            BayStatusCode::Unoccupied
        );
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn bay_rows_with_bad_required_columns_are_rejected() {
        let path = temp_db_path();
        let gateway = seeded_gateway(&path).await;

        for sql in [
            "SELECT NULL AS bay_id, 7700 AS zone_number, 'P' AS status_code",
            "SELECT 'b1' AS bay_id, NULL AS zone_number, 'P' AS status_code",
            "SELECT 'b1' AS bay_id, 7700 AS zone_number, 'X' AS status_code",
        ] {
            let row = select_one(&gateway, sql).await;
            assert!(
                matches!(bay_status_from_row(&row), Err(DbError::Conversion { .. })),
                "{sql}"
            );
        }
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn maps_quarterly_index_rows() {
        let path = temp_db_path();
        let gateway = seeded_gateway(&path).await;

        let row = select_one(
            &gateway,
            "SELECT 'Q1-2016' AS quarter_label, 2016 AS year, 1 AS quarter,
                    0 AS est_added_vehicles, 100.0 AS index_val",
        )
        .await;
        assert_eq!(
            quarterly_index_from_row(&row).unwrap(),
            QuarterlyIndexRow {
                quarter_label: "Q1-2016".to_string(),
                year: 2016,
                quarter: 1,
                est_added_vehicles: 0,
                index_val: 100.0,
            }
        );

        let row = select_one(
            &gateway,
            "SELECT 'Q1-2016' AS quarter_label, NULL AS year, 1 AS quarter,
                    0 AS est_added_vehicles, 100.0 AS index_val",
        )
        .await;
        assert!(matches!(
            quarterly_index_from_row(&row),
            Err(DbError::Conversion { .. })
        ));
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn existing_street_checks_linked_history() {
        let path = temp_db_path();
        let gateway = seeded_gateway(&path).await;

        let check = check_existence(&gateway, Some("COLLINS"), None)
            .await
            .unwrap();
        assert_eq!(
            check,
            ExistenceCheck {
                street_exists: true,
                zone_exists: false,
                history_exists: true,
            }
        );

        // Reference street whose zone has no history rows.
        let check = check_existence(&gateway, Some("lonsdale"), None)
            .await
            .unwrap();
        assert!(check.street_exists);
        assert!(!check.history_exists);
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn unknown_street_falls_back_to_zone() {
        let path = temp_db_path();
        let gateway = seeded_gateway(&path).await;

        let check = check_existence(&gateway, Some("Nowhere Rd"), Some(7701))
            .await
            .unwrap();
        assert_eq!(
            check,
            ExistenceCheck {
                street_exists: false,
                zone_exists: true,
                history_exists: true,
            }
        );

        let check = check_existence(&gateway, Some("Nowhere Rd"), Some(9999))
            .await
            .unwrap();
        assert_eq!(check, ExistenceCheck::default());
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn no_inputs_report_nothing() {
        let path = temp_db_path();
        let gateway = seeded_gateway(&path).await;
        let check = check_existence(&gateway, None, None).await.unwrap();
        assert_eq!(check, ExistenceCheck::default());
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn missing_tables_surface_as_database_errors() {
        let path = temp_db_path();
        let db = init_sqlite_rusqlite(Some(path.as_path())).unwrap();
        let gateway = DatabaseGateway::new(db, 1);
        assert!(matches!(
            check_existence(&gateway, None, Some(1)).await,
            Err(DbError::Database(_))
        ));
        let _ = std::fs::remove_file(path);
    }
}
