use std::path::Path;

use calamine::{open_workbook, Data, Reader, Xls};
use serde::Deserialize;

use super::dates::from_excel_serial;
use super::error::{DataError, LoadError};
use super::model::{MetricTable, RawRow};

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Reader settings, e.g. `{"delimiter": ";", "skip_rows": 2}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// CSV field delimiter; must be ASCII.
    pub delimiter: char,
    /// Whether the first line after `skip_rows` names the columns.
    /// Without headers the columns are taken in export order.
    pub has_headers: bool,
    /// Lines to skip before the header (or first data line).
    pub skip_rows: usize,
    /// Sheet to read from a workbook; the first sheet when unset.
    pub sheet: Option<String>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions {
            delimiter: ',',
            has_headers: true,
            skip_rows: 0,
            sheet: None,
        }
    }
}

impl LoadOptions {
    pub fn from_json(text: &str) -> Result<Self, LoadError> {
        Ok(serde_json::from_str(text)?)
    }

    fn delimiter_byte(&self) -> Result<u8, LoadError> {
        if self.delimiter.is_ascii() {
            Ok(self.delimiter as u8)
        } else {
            Err(LoadError::BadDelimiter(self.delimiter))
        }
    }
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load an export and build the table.  Dispatch by extension.
///
/// Supported formats:
/// * `.xls` – first (or `options.sheet`) worksheet
/// * `.csv` – delimited text
pub fn load_file(path: &Path, options: &LoadOptions) -> Result<MetricTable, DataError> {
    match extension(path).as_str() {
        "xls" => MetricTable::from_excel(path, options),
        "csv" => MetricTable::from_csv(path, options),
        _ => Err(DataError::UnsupportedExtension {
            path: path.to_path_buf(),
            expected: "csv or .xls",
        }),
    }
}

impl MetricTable {
    /// Build a table from a `.csv` export.
    pub fn from_csv(path: impl AsRef<Path>, options: &LoadOptions) -> Result<Self, DataError> {
        MetricTable::from_rows(read_csv_rows(path.as_ref(), options)?)
    }

    /// Build a table from an `.xls` export.
    pub fn from_excel(path: impl AsRef<Path>, options: &LoadOptions) -> Result<Self, DataError> {
        MetricTable::from_rows(read_excel_rows(path.as_ref(), options)?)
    }
}

pub fn read_csv_rows(path: &Path, options: &LoadOptions) -> Result<Vec<RawRow>, DataError> {
    check_extension(path, "csv")?;
    let rows = csv_rows(path, options).map_err(|source| DataError::Load {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!("read {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

pub fn read_excel_rows(path: &Path, options: &LoadOptions) -> Result<Vec<RawRow>, DataError> {
    check_extension(path, "xls")?;
    let rows = excel_rows(path, options).map_err(|source| DataError::Load {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!("read {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

fn check_extension(path: &Path, expected: &'static str) -> Result<(), DataError> {
    if extension(path) == expected {
        Ok(())
    } else {
        Err(DataError::UnsupportedExtension {
            path: path.to_path_buf(),
            expected,
        })
    }
}

// ---------------------------------------------------------------------------
// Column mapping
// ---------------------------------------------------------------------------

/// Positions of the five export columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Columns {
    date: usize,
    category: usize,
    param1: Option<usize>,
    param2: Option<usize>,
    value: usize,
}

impl Columns {
    /// Export order: date, category, param 1, param 2, value.
    const POSITIONAL: Columns = Columns {
        date: 0,
        category: 1,
        param1: Some(2),
        param2: Some(3),
        value: 4,
    };

    /// Headers are matched in the export's Russian form or in English,
    /// ignoring case and whitespace.
    fn from_headers<S: AsRef<str>>(headers: &[S]) -> Result<Self, LoadError> {
        let names: Vec<String> = headers.iter().map(|h| normalize_header(h.as_ref())).collect();
        let find = |aliases: &[&str]| names.iter().position(|n| aliases.contains(&n.as_str()));

        Ok(Columns {
            date: find(&["дата", "date"]).ok_or(LoadError::MissingColumn("date"))?,
            category: find(&["критерий", "category"]).ok_or(LoadError::MissingColumn("category"))?,
            param1: find(&["парам.№1", "param1"]),
            param2: find(&["парам.№2", "param2"]),
            value: find(&["значение", "value"]).ok_or(LoadError::MissingColumn("value"))?,
        })
    }
}

fn normalize_header(header: &str) -> String {
    header
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Turn one line into a row. Fully blank lines yield `None`.
fn build_row<'a>(
    get: impl Fn(usize) -> Option<&'a str>,
    columns: &Columns,
    line: usize,
) -> Result<Option<RawRow>, LoadError> {
    let cell = |idx: usize| get(idx).map(str::trim).unwrap_or("");
    let optional = |idx: Option<usize>| {
        idx.map(&cell)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let date = cell(columns.date);
    let category = cell(columns.category);
    let value = cell(columns.value);
    if date.is_empty() && category.is_empty() && value.is_empty() {
        log::warn!("line {line}: blank, skipped");
        return Ok(None);
    }

    let value = value.parse::<f64>().map_err(|_| LoadError::BadValue {
        line,
        text: value.to_string(),
    })?;

    Ok(Some(RawRow {
        date: date.to_string(),
        category: category.to_string(),
        param1: optional(columns.param1),
        param2: optional(columns.param2),
        value,
    }))
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn csv_rows(path: &Path, options: &LoadOptions) -> Result<Vec<RawRow>, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(options.delimiter_byte()?)
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut records = reader.records().enumerate().skip(options.skip_rows);

    let columns = if options.has_headers {
        match records.next() {
            Some((_, header)) => {
                let header = header?;
                Columns::from_headers(&header.iter().collect::<Vec<_>>())?
            }
            None => return Ok(Vec::new()),
        }
    } else {
        Columns::POSITIONAL
    };

    let mut rows = Vec::new();
    for (idx, result) in records {
        let record = result?;
        let line = record.position().map_or(idx + 1, |p| p.line() as usize);
        if let Some(row) = build_row(|i| record.get(i), &columns, line)? {
            rows.push(row);
        }
    }
    Ok(rows)
}

// ---------------------------------------------------------------------------
// XLS loader
// ---------------------------------------------------------------------------

fn excel_rows(path: &Path, options: &LoadOptions) -> Result<Vec<RawRow>, LoadError> {
    let mut workbook: Xls<_> = open_workbook(path)?;

    let sheet = match &options.sheet {
        Some(name) => {
            if !workbook.sheet_names().contains(name) {
                return Err(LoadError::MissingSheet(name.clone()));
            }
            name.clone()
        }
        None => workbook
            .sheet_names()
            .into_iter()
            .next()
            .ok_or(LoadError::NoSheets)?,
    };
    let range = workbook.worksheet_range(&sheet)?;

    let mut lines = range.rows().enumerate().skip(options.skip_rows);

    let columns = if options.has_headers {
        match lines.next() {
            Some((_, header)) => {
                let names: Vec<String> = header.iter().map(cell_text).collect();
                Columns::from_headers(&names)?
            }
            None => return Ok(Vec::new()),
        }
    } else {
        Columns::POSITIONAL
    };

    let mut rows = Vec::new();
    for (idx, line) in lines {
        let cells: Vec<String> = line
            .iter()
            .enumerate()
            .map(|(col, cell)| {
                if col == columns.date {
                    date_cell_text(cell)
                } else {
                    cell_text(cell)
                }
            })
            .collect();
        if let Some(row) = build_row(|i| cells.get(i).map(String::as_str), &columns, idx + 1)? {
            rows.push(row);
        }
    }
    Ok(rows)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) | Data::DateTimeIso(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        other => other.to_string(),
    }
}

/// Date cells may hold serial day numbers; render those as ISO dates so
/// every loader hands the table the same text form.
fn date_cell_text(cell: &Data) -> String {
    let serial = match cell {
        Data::DateTime(dt) => Some(dt.as_f64()),
        Data::Float(f) => Some(*f),
        Data::Int(i) => Some(*i as f64),
        _ => None,
    };
    match serial {
        Some(serial) => match from_excel_serial(serial) {
            Some(date) => date.format("%Y-%m-%d").to_string(),
            None => serial.to_string(),
        },
        None => cell_text(cell),
    }
}
