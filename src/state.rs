use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use vk_stats::chart::{ChartKind, ChartRequest, PreparedChart};
use vk_stats::data::filter::{Gender, DEFAULT_AGE};
use vk_stats::{Metric, MetricKey, MetricTable};

use crate::color::MetricColors;

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Loaded table (None until user loads a file).
    pub table: Option<MetricTable>,
    /// File the table was loaded from.
    pub source: Option<PathBuf>,

    pub metric: Metric,
    pub age: String,
    pub gender: Gender,
    pub city: Option<String>,
    pub country: Option<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub offset: i64,
    pub kind: ChartKind,

    /// Chart for the current selection (cached).
    pub chart: Option<PreparedChart>,
    pub colors: MetricColors,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            table: None,
            source: None,
            metric: Metric::Views,
            age: DEFAULT_AGE.to_string(),
            gender: Gender::default(),
            city: None,
            country: None,
            start: NaiveDate::default(),
            end: NaiveDate::default(),
            offset: 0,
            kind: ChartKind::Line,
            chart: None,
            colors: MetricColors::default(),
            status_message: None,
        }
    }
}

impl AppState {
    /// Ingest a newly loaded table and reset the selection to its bounds.
    pub fn set_table(&mut self, table: MetricTable, path: &Path) {
        self.start = table.start_date();
        self.end = table.end_date();
        self.city = table.available_cities().into_iter().next();
        self.country = table.available_countries().into_iter().next();

        self.table = Some(table);
        self.source = Some(path.to_path_buf());
        self.status_message = None;
        self.refresh();
    }

    /// Switch metric, falling back to a line chart if the current kind is
    /// not drawable for it.
    pub fn set_metric(&mut self, metric: Metric) {
        self.metric = metric;
        if !ChartKind::allowed_for(metric).contains(&self.kind) {
            self.kind = ChartKind::Line;
        }
        self.refresh();
    }

    /// File name of the loaded export, for display.
    pub fn source_name(&self) -> Option<String> {
        self.source
            .as_deref()
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().into_owned())
    }

    fn key(&self) -> MetricKey<'_> {
        match self.metric {
            Metric::Age => MetricKey::Age(&self.age),
            Metric::Gender => MetricKey::Gender(self.gender.code()),
            Metric::GenderAge => MetricKey::GenderAge {
                gender: self.gender.code(),
                age: &self.age,
            },
            Metric::City => MetricKey::City(self.city.as_deref().unwrap_or_default()),
            Metric::Country => MetricKey::Country(self.country.as_deref().unwrap_or_default()),
            _ => MetricKey::None,
        }
    }

    /// Recompute the chart after any selection change. Picked dates are
    /// clamped to the table bounds first.
    pub fn refresh(&mut self) {
        let Some(table) = &self.table else {
            return;
        };
        let (first_day, last_day) = (table.start_date(), table.end_date());
        self.start = self.start.clamp(first_day, last_day);
        self.end = self.end.clamp(first_day, last_day);

        let start = self.start.format("%Y-%m-%d").to_string();
        let end = self.end.format("%Y-%m-%d").to_string();
        let request = ChartRequest {
            start: Some(start.as_str()),
            end: Some(end.as_str()),
            offset: self.offset,
            ..ChartRequest::new(self.metric, self.key())
        };

        match PreparedChart::prepare(table, &request, self.kind) {
            Ok(chart) => {
                self.chart = Some(chart);
                self.status_message = None;
            }
            Err(e) => {
                let e = anyhow::Error::new(e);
                log::error!("cannot chart {}: {e:#}", self.metric);
                self.chart = None;
                self.status_message = Some(format!("{e:#}"));
            }
        }
    }
}
