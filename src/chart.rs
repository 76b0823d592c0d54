//! Chart preparation for the plotting consumer.
//!
//! A chart is a metric series paired with an x axis `[offset, offset + len)`
//! and a chart kind. Nothing here draws; the viewer renders the result.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::error::DataError;
use crate::data::filter::{Metric, MetricKey};
use crate::data::model::MetricTable;

const HISTOGRAM_BINS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Line,
    Bar,
    HorizontalBar,
    Histogram,
}

impl ChartKind {
    pub const ALL: [ChartKind; 4] = [
        ChartKind::Line,
        ChartKind::Bar,
        ChartKind::HorizontalBar,
        ChartKind::Histogram,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ChartKind::Line => "line",
            ChartKind::Bar => "bar",
            ChartKind::HorizontalBar => "horizontal bar",
            ChartKind::Histogram => "histogram",
        }
    }

    /// Kinds a metric can be drawn as.
    pub fn allowed_for(metric: Metric) -> &'static [ChartKind] {
        match metric {
            Metric::Views => &[ChartKind::Line, ChartKind::Bar, ChartKind::HorizontalBar],
            _ => &[ChartKind::Line, ChartKind::Histogram, ChartKind::Bar],
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error)]
pub enum ChartError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error("{kind} charts are not available for {metric}")]
    UnsupportedKind { metric: Metric, kind: ChartKind },
}

/// What to plot: the query half of a chart.
#[derive(Debug, Clone, Copy)]
pub struct ChartRequest<'a> {
    pub metric: Metric,
    pub key: MetricKey<'a>,
    pub start: Option<&'a str>,
    pub end: Option<&'a str>,
    /// First x value; the series occupies `[offset, offset + len)`.
    pub offset: i64,
}

impl<'a> ChartRequest<'a> {
    pub fn new(metric: Metric, key: MetricKey<'a>) -> Self {
        ChartRequest {
            metric,
            key,
            start: None,
            end: None,
            offset: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

impl HistogramBin {
    pub fn center(&self) -> f64 {
        (self.lower + self.upper) / 2.0
    }

    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Chart data ready for rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreparedChart {
    pub metric: Metric,
    pub kind: ChartKind,
    pub x: Vec<f64>,
    pub values: Vec<f64>,
    /// Filled for [`ChartKind::Histogram`] only.
    pub bins: Vec<HistogramBin>,
}

impl PreparedChart {
    /// Query the table, then check the kind is drawable for the metric.
    pub fn prepare(table: &MetricTable, request: &ChartRequest<'_>, kind: ChartKind) -> Result<Self, ChartError> {
        let values = table.series(request.metric, request.key, request.start, request.end)?;

        if !ChartKind::allowed_for(request.metric).contains(&kind) {
            return Err(ChartError::UnsupportedKind {
                metric: request.metric,
                kind,
            });
        }

        let x = (0..values.len() as i64).map(|i| (request.offset + i) as f64).collect();
        let bins = match kind {
            ChartKind::Histogram => histogram(&values, HISTOGRAM_BINS),
            _ => Vec::new(),
        };

        Ok(PreparedChart {
            metric: request.metric,
            kind,
            x,
            values,
            bins,
        })
    }

    /// `(x, value)` pairs for line and bar rendering.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.x.iter().copied().zip(self.values.iter().copied())
    }
}

/// Equal-width bins over `[min, max]`; the last bin is closed. All-equal
/// values land in a single unit-wide bin.
pub fn histogram(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() || bins == 0 {
        return Vec::new();
    }
    let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if (max - min).abs() < f64::EPSILON {
        return vec![HistogramBin {
            lower: min - 0.5,
            upper: min + 0.5,
            count: finite.len(),
        }];
    }

    let width = (max - min) / bins as f64;
    let mut out: Vec<HistogramBin> = (0..bins)
        .map(|i| HistogramBin {
            lower: min + i as f64 * width,
            upper: min + (i + 1) as f64 * width,
            count: 0,
        })
        .collect();
    for v in finite {
        let idx = (((v - min) / width) as usize).min(bins - 1);
        out[idx].count += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::RawRow;

    fn table() -> MetricTable {
        MetricTable::from_rows(vec![
            RawRow::new("2020-01-01", "views", None, None, 100.0),
            RawRow::new("2020-01-02", "views", None, None, 150.0),
            RawRow::new("2020-01-03", "views", None, None, 120.0),
            RawRow::new("2020-01-01", "visitors", None, None, 10.0),
            RawRow::new("2020-01-02", "visitors", None, None, 10.0),
            RawRow::new("2020-01-03", "visitors", None, None, 30.0),
        ])
        .unwrap()
    }

    #[test]
    fn x_axis_starts_at_offset() {
        let request = ChartRequest {
            offset: 5,
            ..ChartRequest::new(Metric::Views, MetricKey::None)
        };
        let chart = PreparedChart::prepare(&table(), &request, ChartKind::Line).unwrap();
        assert_eq!(chart.x, vec![5.0, 6.0, 7.0]);
        assert_eq!(chart.values, vec![100.0, 150.0, 120.0]);
        assert!(chart.bins.is_empty());
        assert_eq!(chart.points().last(), Some((7.0, 120.0)));
    }

    #[test]
    fn kinds_depend_on_metric() {
        let t = table();
        let views = ChartRequest::new(Metric::Views, MetricKey::None);
        assert!(PreparedChart::prepare(&t, &views, ChartKind::HorizontalBar).is_ok());
        assert!(matches!(
            PreparedChart::prepare(&t, &views, ChartKind::Histogram),
            Err(ChartError::UnsupportedKind { .. })
        ));

        let visitors = ChartRequest::new(Metric::Visitors, MetricKey::None);
        assert!(matches!(
            PreparedChart::prepare(&t, &visitors, ChartKind::HorizontalBar),
            Err(ChartError::UnsupportedKind { .. })
        ));
        let hist = PreparedChart::prepare(&t, &visitors, ChartKind::Histogram).unwrap();
        assert_eq!(hist.bins.iter().map(|b| b.count).sum::<usize>(), 3);
        assert_eq!(hist.bins.first().unwrap().count, 2);
        assert_eq!(hist.bins.last().unwrap().count, 1);
    }

    #[test]
    fn query_errors_pass_through() {
        let request = ChartRequest {
            start: Some("2020-01-02"),
            end: Some("2020-01-02"),
            ..ChartRequest::new(Metric::Views, MetricKey::None)
        };
        assert!(matches!(
            PreparedChart::prepare(&table(), &request, ChartKind::Line),
            Err(ChartError::Data(DataError::Range(_)))
        ));
    }

    #[test]
    fn histogram_edge_cases() {
        assert!(histogram(&[], 10).is_empty());
        let single = histogram(&[4.0, 4.0], 10);
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].count, 2);
        assert_eq!(single[0].center(), 4.0);

        let bins = histogram(&[0.0, 5.0, 10.0], 2);
        assert_eq!(bins.len(), 2);
        assert_eq!(bins[0].width(), 5.0);
        assert_eq!(bins[0].count, 1);
        assert_eq!(bins[1].count, 2);
    }
}
