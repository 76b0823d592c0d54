/// Data layer: loading, the metric table, and per-metric queries.
///
/// Architecture:
/// ```text
///  .xls / .csv
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Vec<RawRow>
///   └──────────┘
///        │
///        ▼
///   ┌─────────────┐
///   │ MetricTable  │  date-sorted rows, views-anchored bounds,
///   └─────────────┘  known cities / countries
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  metric + key + date range → Vec<f64>
///   └──────────┘
/// ```

pub mod dates;
pub mod error;
pub mod filter;
pub mod loader;
pub mod model;
pub mod query;
