//! Query description
//!
//! A [`Query`] is a backend-neutral description of which rows to read or
//! update: a conjunction of filters, an ordering, and a window. Backends
//! translate it to their own dialect; the in-memory backend evaluates it
//! directly with [`Query::apply`].

use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;

use crate::store::Row;

/// A single row predicate. Missing fields compare as `null`.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Field equals value
    Eq { field: String, value: Value },

    /// Field differs from value
    Neq { field: String, value: Value },

    /// Field equals one of the values
    In { field: String, values: Vec<Value> },

    /// Field is absent or null
    IsNull { field: String },
}

impl Filter {
    /// Check whether a row satisfies this predicate.
    pub fn matches(&self, row: &Row) -> bool {
        match self {
            Filter::Eq { field, value } => field_value(row, field) == value,
            Filter::Neq { field, value } => field_value(row, field) != value,
            Filter::In { field, values } => values.contains(field_value(row, field)),
            Filter::IsNull { field } => field_value(row, field).is_null(),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// One ordering key.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub field: String,
    pub direction: Direction,
}

/// Backend-neutral query.
///
/// # Examples
///
/// ```
/// use gymdesk_store::{Direction, Query};
///
/// let query = Query::new()
///     .eq("organization_id", "org-1")
///     .eq("is_active", true)
///     .order_by("joined_at", Direction::Descending)
///     .limit(1);
/// assert_eq!(query.filters.len(), 2);
/// assert_eq!(query.limit, Some(1));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// Filters, all of which must match
    pub filters: Vec<Filter>,

    /// Ordering keys, most significant first
    pub order: Vec<Order>,

    /// Maximum number of rows returned
    pub limit: Option<usize>,

    /// Number of leading rows skipped
    pub offset: usize,
}

impl Query {
    /// Creates a query that matches every row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `field == value`.
    pub fn eq(mut self, field: impl Into<String>, value: impl Serialize) -> Self {
        self.filters.push(Filter::Eq {
            field: field.into(),
            value: to_value(value),
        });
        self
    }

    /// Require `field != value`.
    pub fn neq(mut self, field: impl Into<String>, value: impl Serialize) -> Self {
        self.filters.push(Filter::Neq {
            field: field.into(),
            value: to_value(value),
        });
        self
    }

    /// Require `field` to be one of `values`.
    pub fn in_list<I, V>(mut self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Serialize,
    {
        self.filters.push(Filter::In {
            field: field.into(),
            values: values.into_iter().map(to_value).collect(),
        });
        self
    }

    /// Require `field` to be absent or null.
    pub fn is_null(mut self, field: impl Into<String>) -> Self {
        self.filters.push(Filter::IsNull {
            field: field.into(),
        });
        self
    }

    /// Append an ordering key.
    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order.push(Order {
            field: field.into(),
            direction,
        });
        self
    }

    /// Limit the number of returned rows.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip leading rows.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Check whether a row satisfies every filter.
    pub fn matches(&self, row: &Row) -> bool {
        self.filters.iter().all(|f| f.matches(row))
    }

    /// Evaluate the query over an in-memory row set.
    ///
    /// Filters first, then sorts (stable, so insertion order breaks ties),
    /// then applies offset and limit.
    pub fn apply(&self, rows: impl IntoIterator<Item = Row>) -> Vec<Row> {
        let mut matched: Vec<Row> = rows.into_iter().filter(|r| self.matches(r)).collect();

        if !self.order.is_empty() {
            matched.sort_by(|a, b| self.compare_rows(a, b));
        }

        let window = matched.into_iter().skip(self.offset);
        match self.limit {
            Some(limit) => window.take(limit).collect(),
            None => window.collect(),
        }
    }

    fn compare_rows(&self, a: &Row, b: &Row) -> Ordering {
        for order in &self.order {
            let ord = compare_values(field_value(a, &order.field), field_value(b, &order.field));
            let ord = match order.direction {
                Direction::Ascending => ord,
                Direction::Descending => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

static NULL: Value = Value::Null;

fn field_value<'a>(row: &'a Row, field: &str) -> &'a Value {
    row.get(field).unwrap_or(&NULL)
}

fn to_value(value: impl Serialize) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// Total order over JSON scalars: null < bool < number < string < other.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

fn rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    fn rows() -> Vec<Row> {
        vec![
            row(json!({ "id": 1, "name": "Eastside", "parent_id": null })),
            row(json!({ "id": 2, "name": "Westside", "parent_id": 1 })),
            row(json!({ "id": 3, "name": "Northside", "parent_id": 1 })),
            row(json!({ "id": 4, "name": "Annex" })),
        ]
    }

    #[test]
    fn test_eq_and_neq_filters() {
        let children = Query::new().eq("parent_id", 1).apply(rows());
        assert_eq!(children.len(), 2);

        let others = Query::new().neq("parent_id", 1).apply(rows());
        assert_eq!(others.len(), 2);
    }

    #[test]
    fn test_missing_field_is_null() {
        let roots = Query::new().is_null("parent_id").apply(rows());
        let ids: Vec<_> = roots.iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![json!(1), json!(4)]);
    }

    #[test]
    fn test_in_list() {
        let found = Query::new().in_list("id", [2, 4, 9]).apply(rows());
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_order_offset_limit() {
        let page = Query::new()
            .order_by("name", Direction::Ascending)
            .offset(1)
            .limit(2)
            .apply(rows());
        let names: Vec<_> = page.iter().map(|r| r["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["Eastside", "Northside"]);

        let desc = Query::new()
            .order_by("id", Direction::Descending)
            .limit(1)
            .apply(rows());
        assert_eq!(desc[0]["id"], json!(4));
    }

    #[test]
    fn test_compare_values_ranks_types() {
        assert_eq!(compare_values(&Value::Null, &json!(false)), Ordering::Less);
        assert_eq!(compare_values(&json!(2), &json!(10)), Ordering::Less);
        assert_eq!(compare_values(&json!("b"), &json!("a")), Ordering::Greater);
        assert_eq!(compare_values(&json!(1), &json!("1")), Ordering::Less);
    }
}
