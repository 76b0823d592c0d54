use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::dates::DateRange;
use super::error::DataError;
use super::filter::{Gender, Metric, MetricKey, DEFAULT_AGE};
use super::model::MetricTable;

// ---------------------------------------------------------------------------
// Named accessors – thin wrappers over `MetricTable::series`
// ---------------------------------------------------------------------------

macro_rules! unkeyed {
    ($($(#[$doc:meta])* $name:ident => $metric:ident;)*) => {
        impl MetricTable {
            $(
                $(#[$doc])*
                pub fn $name(&self, start: Option<&str>, end: Option<&str>) -> Result<Vec<f64>, DataError> {
                    self.series(Metric::$metric, MetricKey::None, start, end)
                }
            )*
        }
    };
}

unkeyed! {
    /// Daily views.
    views => Views;
    /// Daily unique visitors.
    visitors => Visitors;
    discussions => Discussions;
    audio => Audio;
    videos => Videos;
    photo_albums => PhotoAlbums;
    likes => Likes;
    comments => Comments;
    /// "Told friends" feedback (reposts).
    told_friends => ToldFriends;
    new_members => NewMembers;
    exited_members => ExitedMembers;
    /// Total reach.
    reach => Reach;
    reach_subscribers => ReachSubscribers;
    reach_viral => ReachViral;
    /// Reach through advertising.
    reach_ads => ReachAds;
}

impl MetricTable {
    /// Visitors in one age bracket, e.g. `"18-21"`.
    pub fn age(&self, key: &str, start: Option<&str>, end: Option<&str>) -> Result<Vec<f64>, DataError> {
        self.series(Metric::Age, MetricKey::Age(key), start, end)
    }

    /// Visitors of one gender, `M` or `F`.
    pub fn gender(&self, key: &str, start: Option<&str>, end: Option<&str>) -> Result<Vec<f64>, DataError> {
        self.series(Metric::Gender, MetricKey::Gender(key), start, end)
    }

    pub fn gender_age(
        &self,
        gender: &str,
        age: &str,
        start: Option<&str>,
        end: Option<&str>,
    ) -> Result<Vec<f64>, DataError> {
        self.series(Metric::GenderAge, MetricKey::GenderAge { gender, age }, start, end)
    }

    /// Visitors from `city`; it must be one of [`MetricTable::available_cities`].
    pub fn city(&self, city: &str, start: Option<&str>, end: Option<&str>) -> Result<Vec<f64>, DataError> {
        self.series(Metric::City, MetricKey::City(city), start, end)
    }

    pub fn country(&self, country: &str, start: Option<&str>, end: Option<&str>) -> Result<Vec<f64>, DataError> {
        self.series(Metric::Country, MetricKey::Country(country), start, end)
    }
}

// ---------------------------------------------------------------------------
// QueryRequest – untyped query input (JSON)
// ---------------------------------------------------------------------------

/// A query as it arrives from text input:
///
/// ```json
/// { "metric": "gender_age", "gender": "F", "age": "18-21",
///   "start": "2020-01-01", "end": null }
/// ```
///
/// `key` carries the sub-key of `age`, `gender`, `city` and `country`.
/// `start`/`end` are left untyped so non-string bounds can be reported.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryRequest {
    pub metric: String,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub age: Option<String>,
    #[serde(default)]
    pub start: JsonValue,
    #[serde(default)]
    pub end: JsonValue,
}

/// Result of a [`QueryRequest`]: the resolved range and the values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResponse {
    pub metric: Metric,
    pub range: DateRange,
    pub values: Vec<f64>,
}

impl QueryRequest {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn run(&self, table: &MetricTable) -> Result<QueryResponse, DataError> {
        let metric: Metric = self.metric.parse()?;
        let key = self.metric_key(metric)?;
        table.check_key(metric, key)?;
        let start = date_arg("start", &self.start)?;
        let end = date_arg("end", &self.end)?;

        let values = table.series(metric, key, start, end)?;
        let range = table.resolve_range(start, end)?;
        Ok(QueryResponse { metric, range, values })
    }

    fn metric_key(&self, metric: Metric) -> Result<MetricKey<'_>, DataError> {
        let key = self.key.as_deref();
        Ok(match metric {
            Metric::Age => MetricKey::Age(key.unwrap_or(DEFAULT_AGE)),
            Metric::Gender => MetricKey::Gender(key.unwrap_or(Gender::default().code())),
            Metric::GenderAge => MetricKey::GenderAge {
                gender: self.gender.as_deref().unwrap_or(Gender::default().code()),
                age: self.age.as_deref().unwrap_or(DEFAULT_AGE),
            },
            Metric::City => MetricKey::City(required_key(metric, key)?),
            Metric::Country => MetricKey::Country(required_key(metric, key)?),
            _ => MetricKey::None,
        })
    }
}

fn required_key(metric: Metric, key: Option<&str>) -> Result<&str, DataError> {
    key.ok_or_else(|| DataError::InvalidKey {
        key: String::new(),
        allowed: format!("a name for {metric}"),
    })
}

/// Null and `""` mean "use the table bound"; any other non-string is a
/// type mismatch.
fn date_arg<'a>(argument: &'static str, value: &'a JsonValue) -> Result<Option<&'a str>, DataError> {
    match value {
        JsonValue::Null => Ok(None),
        JsonValue::String(s) if s.is_empty() => Ok(None),
        JsonValue::String(s) => Ok(Some(s.as_str())),
        other => Err(DataError::TypeMismatch {
            argument,
            found: json_kind(other),
        }),
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::error::RangeError;
    use crate::data::model::RawRow;
    use chrono::NaiveDate;

    fn example_table() -> MetricTable {
        MetricTable::from_rows(vec![
            RawRow::new("2020-01-01", "views", None, None, 100.0),
            RawRow::new("2019-12-01", "visitors", None, None, 50.0),
            RawRow::new("2020-01-02", "views", None, None, 150.0),
            RawRow::new("2020-01-02", "cities", Some("Moscow"), None, 10.0),
        ])
        .unwrap()
    }

    fn month_table() -> MetricTable {
        let mut rows = Vec::new();
        let first = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        for (i, date) in first.iter_days().take(60).enumerate() {
            let date = date.format("%Y-%m-%d").to_string();
            rows.push(RawRow::new(&date, "views", None, None, i as f64));
            rows.push(RawRow::new(&date, "reach_viral", None, None, 2.0 * i as f64));
            rows.push(RawRow::new(&date, "feedback", Some("Комментарии"), None, 1.0));
        }
        MetricTable::from_rows(rows).unwrap()
    }

    #[test]
    fn end_to_end_example() {
        let table = example_table();
        assert_eq!(table.views(None, None).unwrap(), vec![100.0, 150.0]);
        assert!(table.visitors(None, None).unwrap().is_empty());
        assert_eq!(table.city("Moscow", None, None).unwrap(), vec![10.0]);
    }

    #[test]
    fn identical_calls_give_identical_series() {
        let table = month_table();
        let a = table.views(Some("2020-01-01"), Some("2020-02-01")).unwrap();
        let b = table.views(Some("2020-01-01"), Some("2020-02-01")).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn named_wrappers_delegate() {
        let table = month_table();
        assert_eq!(table.reach_viral(Some("2020-01-02"), Some("2020-01-03")).unwrap(), vec![2.0, 4.0]);
        assert_eq!(table.comments(None, Some("2020-01-05")).unwrap().len(), 5);
        assert!(table.likes(None, None).unwrap().is_empty());
    }

    #[test]
    fn single_day_and_reversed_ranges_fail() {
        let table = month_table();
        assert!(matches!(
            table.views(Some("2020-01-10"), Some("2020-01-10")),
            Err(DataError::Range(RangeError::StartNotBeforeEnd { .. }))
        ));
        assert!(matches!(
            table.views(Some("2020-01-11"), Some("2020-01-10")),
            Err(DataError::Range(RangeError::StartNotBeforeEnd { .. }))
        ));
    }

    #[test]
    fn one_day_outside_bounds_fails() {
        let table = month_table();
        assert!(matches!(
            table.views(Some("2019-12-31"), None),
            Err(DataError::Range(RangeError::StartBeforeTableStart { .. }))
        ));
        let after = (table.end_date() + chrono::Days::new(1)).format("%Y-%m-%d").to_string();
        assert!(matches!(
            table.views(None, Some(&after)),
            Err(DataError::Range(RangeError::EndAfterTableEnd { .. }))
        ));
    }

    #[test]
    fn request_runs_with_defaults() {
        let table = example_table();
        let req = QueryRequest::from_json(r#"{"metric": "views"}"#).unwrap();
        let resp = req.run(&table).unwrap();
        assert_eq!(resp.values, vec![100.0, 150.0]);
        assert_eq!(resp.range, table.date_range());
    }

    #[test]
    fn request_rejects_non_string_bounds() {
        let table = example_table();
        let req = QueryRequest::from_json(r#"{"metric": "views", "start": 20200101}"#).unwrap();
        assert!(matches!(
            req.run(&table),
            Err(DataError::TypeMismatch { argument: "start", found: "number" })
        ));
        let req = QueryRequest::from_json(r#"{"metric": "views", "end": ["2020-01-02"]}"#).unwrap();
        assert!(matches!(
            req.run(&table),
            Err(DataError::TypeMismatch { argument: "end", found: "array" })
        ));
    }

    #[test]
    fn request_keys() {
        let table = example_table();
        let req = QueryRequest::from_json(r#"{"metric": "city", "key": "Moscow"}"#).unwrap();
        assert_eq!(req.run(&table).unwrap().values, vec![10.0]);

        let req = QueryRequest::from_json(r#"{"metric": "city"}"#).unwrap();
        assert!(matches!(req.run(&table), Err(DataError::InvalidKey { .. })));

        let req = QueryRequest::from_json(r#"{"metric": "age"}"#).unwrap();
        assert!(req.run(&table).unwrap().values.is_empty());

        let req = QueryRequest::from_json(r#"{"metric": "age", "key": "99+", "start": 5}"#).unwrap();
        assert!(matches!(req.run(&table), Err(DataError::InvalidKey { .. })));

        let req = QueryRequest::from_json(r#"{"metric": "clicks"}"#).unwrap();
        assert!(matches!(req.run(&table), Err(DataError::UnknownMetric(_))));
    }
}
