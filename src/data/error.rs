use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

/// Every failure the data layer can report. Errors abort the call that
/// raised them; nothing is downgraded to an empty result.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("failed to load {}", .path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: LoadError,
    },

    #[error("unsupported file {}: expected a .{expected} file", .path.display())]
    UnsupportedExtension {
        path: PathBuf,
        expected: &'static str,
    },

    #[error("no 'views' rows found, the table has no start date")]
    NoViewsData,

    #[error("cannot convert '{value}' to a date")]
    DateParse { value: String },

    #[error("{argument} argument has to be a string (found {found})")]
    TypeMismatch {
        argument: &'static str,
        found: &'static str,
    },

    #[error(transparent)]
    Range(#[from] RangeError),

    #[error("unknown key '{key}', available keys are {allowed}")]
    InvalidKey { key: String, allowed: String },

    #[error("unknown city '{0}', see available_cities()")]
    UnknownCity(String),

    #[error("unknown country '{0}', see available_countries()")]
    UnknownCountry(String),

    #[error("unknown metric '{0}'")]
    UnknownMetric(String),
}

/// Why a resolved date range was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("start {start} is before the table start {table_start}")]
    StartBeforeTableStart {
        start: NaiveDate,
        table_start: NaiveDate,
    },

    #[error("end {end} is after the table end {table_end}")]
    EndAfterTableEnd { end: NaiveDate, table_end: NaiveDate },

    #[error("start {start} is not before end {end}")]
    StartNotBeforeEnd { start: NaiveDate, end: NaiveDate },
}

/// Underlying cause of a [`DataError::Load`].
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Excel(#[from] calamine::XlsError),

    #[error("workbook has no sheet named '{0}'")]
    MissingSheet(String),

    #[error("workbook has no sheets")]
    NoSheets,

    #[error("missing '{0}' column")]
    MissingColumn(&'static str),

    #[error("line {line}: '{text}' is not a number")]
    BadValue { line: usize, text: String },

    #[error("delimiter '{0}' is not an ASCII character")]
    BadDelimiter(char),

    #[error("invalid loader options: {0}")]
    Options(#[from] serde_json::Error),
}
