//! Parameterized SQL statements and composable `WHERE` predicates.
//!
//! A [`Predicate`] owns a fragment of SQL built only from `'static` column
//! expressions and `?` placeholders, together with the values bound to those
//! placeholders. [`Conditions`] joins predicates with `AND` and appends their
//! values in the same order the placeholders appear, so rendered statements
//! stay positionally consistent.

use std::collections::BTreeSet;

use switchy_database::DatabaseValue;

/// A value bound to a `?` placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoundValue {
    /// Integer value.
    Int(i64),
    /// Text value.
    Text(String),
}

impl From<&BoundValue> for DatabaseValue {
    fn from(value: &BoundValue) -> Self {
        match value {
            BoundValue::Int(v) => Self::Int64(*v),
            BoundValue::Text(v) => Self::String(v.clone()),
        }
    }
}

/// SQL text plus its positional parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// SQL with `?` placeholders.
    pub sql: String,
    /// Values for the placeholders, in order.
    pub params: Vec<BoundValue>,
}

impl Statement {
    /// Creates a statement without parameters.
    #[must_use]
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Creates a statement with parameters.
    #[must_use]
    pub fn with_params(sql: impl Into<String>, params: Vec<BoundValue>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// Converts the parameters for `switchy_database`.
    #[must_use]
    pub fn database_values(&self) -> Vec<DatabaseValue> {
        self.params.iter().map(DatabaseValue::from).collect()
    }
}

/// Returns the lowercase `LIKE` pattern matching `needle` anywhere.
#[must_use]
pub fn contains_pattern(needle: &str) -> String {
    format!("%{}%", needle.to_lowercase())
}

/// A named, independently optional `WHERE` clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    name: &'static str,
    sql: String,
    params: Vec<BoundValue>,
}

impl Predicate {
    /// A trusted literal condition with no parameters.
    #[must_use]
    pub fn literal(name: &'static str, sql: &'static str) -> Self {
        Self {
            name,
            sql: sql.to_string(),
            params: Vec::new(),
        }
    }

    /// A fixed template whose `?` placeholders are filled by `params`.
    #[must_use]
    pub fn template(name: &'static str, sql: &'static str, params: Vec<BoundValue>) -> Self {
        debug_assert_eq!(
            sql.matches('?').count(),
            params.len(),
            "placeholder count mismatch in predicate {name}"
        );
        Self {
            name,
            sql: sql.to_string(),
            params,
        }
    }

    /// `expr = ?`
    #[must_use]
    pub fn eq_int(name: &'static str, expr: &'static str, value: i64) -> Self {
        Self {
            name,
            sql: format!("{expr} = ?"),
            params: vec![BoundValue::Int(value)],
        }
    }

    /// `expr IN (?, ?, ...)`, or `None` when there is nothing to match.
    #[must_use]
    pub fn in_ints(name: &'static str, expr: &'static str, values: &BTreeSet<i32>) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let placeholders = vec!["?"; values.len()].join(", ");
        Some(Self {
            name,
            sql: format!("{expr} IN ({placeholders})"),
            params: values.iter().map(|v| BoundValue::Int(i64::from(*v))).collect(),
        })
    }

    /// `LOWER(expr) LIKE ?` matching `needle` as a case-insensitive
    /// substring.
    #[must_use]
    pub fn contains_ci(name: &'static str, expr: &'static str, needle: &str) -> Self {
        Self {
            name,
            sql: format!("LOWER({expr}) LIKE ?"),
            params: vec![BoundValue::Text(contains_pattern(needle))],
        }
    }

    /// Time of day of `expr` at or before `hour:minute`.
    #[must_use]
    pub fn time_at_or_before(name: &'static str, expr: &'static str, hour: i32, minute: i32) -> Self {
        Self {
            name,
            sql: format!("(HOUR({expr}) < ? OR (HOUR({expr}) = ? AND MINUTE({expr}) <= ?))"),
            params: vec![
                BoundValue::Int(i64::from(hour)),
                BoundValue::Int(i64::from(hour)),
                BoundValue::Int(i64::from(minute)),
            ],
        }
    }

    /// Predicate name, used in logs and tests.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Rendered SQL fragment.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Bound values of this predicate.
    #[must_use]
    pub fn params(&self) -> &[BoundValue] {
        &self.params
    }
}

/// An ordered set of predicates joined with `AND`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conditions {
    predicates: Vec<Predicate>,
}

impl Conditions {
    /// Creates an empty condition set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            predicates: Vec::new(),
        }
    }

    /// Adds a predicate.
    pub fn push(&mut self, predicate: Predicate) {
        self.predicates.push(predicate);
    }

    /// Adds a predicate if present.
    pub fn push_opt(&mut self, predicate: Option<Predicate>) {
        if let Some(predicate) = predicate {
            self.predicates.push(predicate);
        }
    }

    /// Whether no predicate has been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Names of the contained predicates, in order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.predicates.iter().map(Predicate::name).collect()
    }

    /// Appends ` WHERE a AND b ...` to `sql` and the bound values to
    /// `params`. Appends nothing when empty.
    pub fn render_where(&self, sql: &mut String, params: &mut Vec<BoundValue>) {
        if self.predicates.is_empty() {
            return;
        }

        sql.push_str(" WHERE ");
        for (i, predicate) in self.predicates.iter().enumerate() {
            if i > 0 {
                sql.push_str(" AND ");
            }
            sql.push_str(&predicate.sql);
            params.extend(predicate.params.iter().cloned());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_list_has_one_placeholder_per_value() {
        let values: BTreeSet<i32> = [2018, 2017].into_iter().collect();
        let predicate = Predicate::in_ints("years", "YEAR(ts)", &values).unwrap();
        assert_eq!(predicate.sql(), "YEAR(ts) IN (?, ?)");
        assert_eq!(
            predicate.params(),
            &[BoundValue::Int(2017), BoundValue::Int(2018)]
        );
    }

    #[test]
    fn empty_in_list_is_skipped() {
        assert!(Predicate::in_ints("years", "YEAR(ts)", &BTreeSet::new()).is_none());
    }

    #[test]
    fn contains_binds_lowercase_pattern() {
        let predicate = Predicate::contains_ci("street", "s.street_name", "Collins ST");
        assert_eq!(predicate.sql(), "LOWER(s.street_name) LIKE ?");
        assert_eq!(
            predicate.params(),
            &[BoundValue::Text("%collins st%".to_string())]
        );
    }

    #[test]
    fn time_ceiling_binds_hour_twice() {
        let predicate = Predicate::time_at_or_before("time", "ts", 9, 30);
        assert_eq!(predicate.sql().matches('?').count(), 3);
        assert_eq!(
            predicate.params(),
            &[BoundValue::Int(9), BoundValue::Int(9), BoundValue::Int(30)]
        );
    }

    #[test]
    fn renders_conditions_in_order() {
        let mut conditions = Conditions::new();
        conditions.push(Predicate::literal("nonzero", "zone <> 0"));
        conditions.push_opt(None);
        conditions.push(Predicate::eq_int("zone", "zone", 7700));

        let mut sql = String::from("SELECT * FROM t");
        let mut params = Vec::new();
        conditions.render_where(&mut sql, &mut params);

        assert_eq!(sql, "SELECT * FROM t WHERE zone <> 0 AND zone = ?");
        assert_eq!(params, vec![BoundValue::Int(7700)]);
        assert_eq!(conditions.names(), vec!["nonzero", "zone"]);
    }

    #[test]
    fn empty_conditions_render_nothing() {
        let mut sql = String::from("SELECT 1");
        let mut params = Vec::new();
        Conditions::new().render_where(&mut sql, &mut params);
        assert_eq!(sql, "SELECT 1");
        assert!(params.is_empty());
    }
}
