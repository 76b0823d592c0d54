//! Data-access layer for VK community statistics exports.
//!
//! [`data`] loads an export into an immutable [`MetricTable`] and answers
//! per-metric series queries; [`chart`] turns those series into
//! rendering-free chart data for the viewer.

pub mod chart;
pub mod data;

pub use data::error::{DataError, LoadError, RangeError};
pub use data::filter::{Gender, Metric, MetricKey};
pub use data::model::{Category, MetricTable, RawRow, Row};
