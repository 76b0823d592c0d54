use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::dates::{parse_date, DateRange};
use super::error::DataError;

// ---------------------------------------------------------------------------
// Category – the metric family tag of a row
// ---------------------------------------------------------------------------

/// Metric family of a row (the export's `Критерий` column).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Category {
    Views,
    Visitors,
    Cities,
    Countries,
    Age,
    Gender,
    GenderAge,
    Sections,
    Feedback,
    Members,
    Reach,
    ReachSubscribers,
    ReachViral,
    ReachAds,
    /// Any tag this crate has no query for. Kept so anchoring and bounds
    /// see the same rows the export contains.
    Other(String),
}

impl Category {
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim() {
            "views" => Category::Views,
            "visitors" => Category::Visitors,
            "cities" => Category::Cities,
            "countries" => Category::Countries,
            "age" => Category::Age,
            "gender" => Category::Gender,
            "gender_age" => Category::GenderAge,
            "sections" => Category::Sections,
            "feedback" => Category::Feedback,
            "members" => Category::Members,
            "reach" => Category::Reach,
            "reach_subscribers" => Category::ReachSubscribers,
            "reach_viral" => Category::ReachViral,
            "reach_ads" => Category::ReachAds,
            other => Category::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Category::Views => "views",
            Category::Visitors => "visitors",
            Category::Cities => "cities",
            Category::Countries => "countries",
            Category::Age => "age",
            Category::Gender => "gender",
            Category::GenderAge => "gender_age",
            Category::Sections => "sections",
            Category::Feedback => "feedback",
            Category::Members => "members",
            Category::Reach => "reach",
            Category::ReachSubscribers => "reach_subscribers",
            Category::ReachViral => "reach_viral",
            Category::ReachAds => "reach_ads",
            Category::Other(tag) => tag,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// RawRow / Row
// ---------------------------------------------------------------------------

/// One input line as a loader yields it: the date is still text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    pub date: String,
    pub category: String,
    pub param1: Option<String>,
    pub param2: Option<String>,
    pub value: f64,
}

impl RawRow {
    pub fn new(date: &str, category: &str, param1: Option<&str>, param2: Option<&str>, value: f64) -> Self {
        RawRow {
            date: date.to_string(),
            category: category.to_string(),
            param1: param1.map(str::to_string),
            param2: param2.map(str::to_string),
            value,
        }
    }
}

/// A validated row of a [`MetricTable`].
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub date: NaiveDate,
    pub category: Category,
    /// Sub-dimension: city, country, age bracket, gender code or label.
    pub param1: Option<String>,
    /// Second sub-dimension, only the age bracket of `gender_age` rows.
    pub param2: Option<String>,
    pub value: f64,
}

impl Row {
    fn from_raw(date: NaiveDate, raw: RawRow) -> Self {
        Row {
            date,
            category: Category::from_tag(&raw.category),
            param1: raw.param1,
            param2: raw.param2,
            value: raw.value,
        }
    }
}

// ---------------------------------------------------------------------------
// MetricTable – the validated, date-sorted export
// ---------------------------------------------------------------------------

/// Immutable table of export rows, sorted by date and trimmed to start on
/// the first day that has `views` data.
#[derive(Debug, Clone)]
pub struct MetricTable {
    rows: Vec<Row>,
    range: DateRange,
    cities: BTreeSet<String>,
    countries: BTreeSet<String>,
}

impl MetricTable {
    /// Validate raw rows and build the table.
    ///
    /// Everything dated before the earliest `views` row is dropped, then the
    /// remaining rows are stably sorted by date. Only retained rows must
    /// carry a valid date; a row whose date text does not parse is placed
    /// by comparing its text with the anchor day's ISO form.
    pub fn from_rows(raw: Vec<RawRow>) -> Result<Self, DataError> {
        let total = raw.len();
        let parsed: Vec<(Option<NaiveDate>, RawRow)> = raw
            .into_iter()
            .map(|r| (parse_date(&r.date).ok(), r))
            .collect();

        let mut views = parsed
            .iter()
            .filter(|(_, r)| Category::from_tag(&r.category) == Category::Views)
            .peekable();
        let first_views = match views.peek() {
            Some((_, r)) => r.date.clone(),
            None => return Err(DataError::NoViewsData),
        };
        let anchor = views
            .filter_map(|(date, _)| *date)
            .min()
            .ok_or(DataError::DateParse { value: first_views })?;
        let anchor_text = anchor.format("%Y-%m-%d").to_string();

        let mut rows = Vec::with_capacity(parsed.len());
        for (date, raw) in parsed {
            match date {
                Some(date) if date >= anchor => rows.push(Row::from_raw(date, raw)),
                Some(_) => {}
                None if raw.date.trim() < anchor_text.as_str() => {}
                None => return Err(DataError::DateParse { value: raw.date }),
            }
        }
        rows.sort_by_key(|r| r.date);

        // Non-empty: the anchoring views row itself is retained.
        let (start, end) = match (rows.first(), rows.last()) {
            (Some(first), Some(last)) => (first.date, last.date),
            _ => return Err(DataError::NoViewsData),
        };

        let cities = distinct_param1(&rows, &Category::Cities);
        let countries = distinct_param1(&rows, &Category::Countries);

        log::debug!(
            "dropped {} of {total} rows dated before the first views row ({anchor})",
            total - rows.len()
        );
        log::info!(
            "metric table: {} rows from {start} to {end}, {} cities, {} countries",
            rows.len(),
            cities.len(),
            countries.len()
        );

        Ok(MetricTable {
            rows,
            range: DateRange { start, end },
            cities,
            countries,
        })
    }

    /// Earliest retained date (the first `views` day).
    pub fn start_date(&self) -> NaiveDate {
        self.range.start
    }

    /// Latest retained date.
    pub fn end_date(&self) -> NaiveDate {
        self.range.end
    }

    pub fn date_range(&self) -> DateRange {
        self.range
    }

    /// Resolve optional query bounds against the table bounds.
    pub fn resolve_range(&self, start: Option<&str>, end: Option<&str>) -> Result<DateRange, DataError> {
        self.range.resolve(start, end)
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Rows whose date lies in `range`, found by binary search on the
    /// sorted row store.
    pub(crate) fn rows_in(&self, range: DateRange) -> &[Row] {
        let lo = self.rows.partition_point(|r| r.date < range.start);
        let hi = self.rows.partition_point(|r| r.date <= range.end);
        &self.rows[lo..hi.max(lo)]
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn available_cities(&self) -> Vec<String> {
        self.cities.iter().cloned().collect()
    }

    pub fn available_countries(&self) -> Vec<String> {
        self.countries.iter().cloned().collect()
    }

    pub(crate) fn knows_city(&self, city: &str) -> bool {
        self.cities.contains(city)
    }

    pub(crate) fn knows_country(&self, country: &str) -> bool {
        self.countries.contains(country)
    }
}

fn distinct_param1(rows: &[Row], category: &Category) -> BTreeSet<String> {
    rows.iter()
        .filter(|r| &r.category == category)
        .filter_map(|r| r.param1.clone())
        .collect()
}
