use chrono::{Days, NaiveDate, NaiveDateTime};
use serde::Serialize;

use super::error::{DataError, RangeError};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%d.%m.%Y %H:%M:%S%.f",
];

/// Parse date text at day granularity. Times are accepted and dropped.
pub fn parse_date(text: &str) -> Result<NaiveDate, DataError> {
    let s = text.trim();
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(date);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.date());
        }
    }
    Err(DataError::DateParse {
        value: text.to_string(),
    })
}

/// Convert a spreadsheet serial day number (1900 date system) to a date.
pub fn from_excel_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    // Serial 60 is the fictitious 1900-02-29, so the epoch sits two days back.
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_days(Days::new(serial.floor() as u64))
}

// ---------------------------------------------------------------------------
// DateRange – an inclusive pair of days
// ---------------------------------------------------------------------------

/// Inclusive `[start, end]` day range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Resolve caller-supplied bounds against this (table) range.
    ///
    /// Omitted or empty bounds fall back to the table's own bounds. Supplied
    /// bounds must parse and stay inside the table range, and the resolved
    /// start must be strictly before the resolved end, so a single-day
    /// range is always rejected.
    pub fn resolve(&self, start: Option<&str>, end: Option<&str>) -> Result<DateRange, DataError> {
        let start = match start.filter(|s| !s.is_empty()) {
            Some(text) => {
                let start = parse_date(text)?;
                if start < self.start {
                    return Err(RangeError::StartBeforeTableStart {
                        start,
                        table_start: self.start,
                    }
                    .into());
                }
                start
            }
            None => self.start,
        };

        let end = match end.filter(|s| !s.is_empty()) {
            Some(text) => {
                let end = parse_date(text)?;
                if end > self.end {
                    return Err(RangeError::EndAfterTableEnd {
                        end,
                        table_end: self.end,
                    }
                    .into());
                }
                end
            }
            None => self.end,
        };

        if start >= end {
            return Err(RangeError::StartNotBeforeEnd { start, end }.into());
        }
        Ok(DateRange { start, end })
    }
}
