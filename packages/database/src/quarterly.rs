//! Statement for the quarterly vehicle registration index.
//!
//! The yearly registration deltas are spread across quarters with a fixed
//! seasonal weighting, and the index compounds each quarter's growth factor
//! with a running product (sum of logs, then `EXP`). Quarters without a
//! delta contribute a factor of 1 and no added vehicles.

use crate::statement::{BoundValue, Statement};

/// Region whose year-over-year deltas drive the index.
pub const REGION_CODE: &str = "VIC";

/// First calendar year of the index.
pub const FIRST_YEAR: i32 = 2016;

/// Last calendar year of the index.
pub const LAST_YEAR: i32 = 2021;

/// Share of each year's registrations added in Q1..Q4.
pub const SEASONAL_WEIGHTS: [(i32, [f64; 4]); 5] = [
    (2017, [0.30, 0.23, 0.22, 0.25]),
    (2018, [0.29, 0.23, 0.22, 0.26]),
    (2019, [0.29, 0.23, 0.22, 0.26]),
    (2020, [0.28, 0.18, 0.18, 0.36]),
    (2021, [0.28, 0.26, 0.24, 0.22]),
];

fn calendar_rows() -> String {
    let mut rows = Vec::new();
    for year in FIRST_YEAR..=LAST_YEAR {
        for quarter in 1..=4 {
            rows.push(format!("SELECT {year} AS yr, {quarter} AS qtr"));
        }
    }
    rows.join(" UNION ALL ")
}

fn weight_rows() -> String {
    let mut rows = Vec::new();
    for (year, weights) in SEASONAL_WEIGHTS {
        for (quarter, weight) in (1..=4).zip(weights) {
            rows.push(format!(
                "SELECT {year} AS yr, {quarter} AS qtr, {weight:.2} AS weight"
            ));
        }
    }
    rows.join(" UNION ALL ")
}

/// Calendar left-joined to the region's deltas (`v`) and the seasonal
/// weights (`w`). Binds the region as its only parameter.
fn quarter_source() -> String {
    format!(
        " FROM ({}) q
 LEFT JOIN (SELECT end_year AS yr, delta_number, delta_percent
            FROM vehicle_reg_yoy
            WHERE region_code = ?) v ON v.yr = q.yr
 LEFT JOIN ({}) w ON w.yr = q.yr AND w.qtr = q.qtr",
        calendar_rows(),
        weight_rows(),
    )
}

const INDEX_COLUMNS: &str = "SELECT CONCAT('Q', q.qtr, '-', q.yr) AS quarter_label,
       CAST(q.yr AS SIGNED) AS year,
       CAST(q.qtr AS SIGNED) AS quarter,
       CAST(CASE WHEN v.delta_number IS NULL THEN 0
                 ELSE FLOOR(v.delta_number * COALESCE(w.weight, 0)) END AS SIGNED)
           AS est_added_vehicles,
       CAST(ROUND(100 * EXP(SUM(LOG(
                CASE WHEN v.delta_percent IS NULL THEN 1.0
                     ELSE POW(1 + v.delta_percent / 100, COALESCE(w.weight, 0)) END
            )) OVER (ORDER BY q.yr, q.qtr)), 4) AS DOUBLE) AS index_val";

/// Builds the quarterly index statement. The region is the only bound
/// value; the calendar and weights are compile-time constants.
#[must_use]
pub fn quarterly_index_statement() -> Statement {
    let sql = format!(
        "{INDEX_COLUMNS}{}
 ORDER BY q.yr, q.qtr",
        quarter_source()
    );

    Statement::with_params(sql, vec![BoundValue::Text(REGION_CODE.to_string())])
}
