//! Reader for search-console exports in CSV or JSON form.
//!
//! Both formats are parsed into an intermediate frame of named columns,
//! validated against [`REQUIRED_COLUMNS`], and normalized into a [`Table`].
//! Numeric cells that cannot be parsed are repaired to `0.0` rather than
//! rejected.

use crate::analyzers::types::{REQUIRED_COLUMNS, Row, Table};
use crate::error::GscError;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::path::Path;
use tracing::{debug, info, warn};

/// Supported export formats, chosen by file extension only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Csv,
    Json,
}

impl Format {
    /// Detects the format from the final extension of `path` (case-sensitive).
    pub fn from_path(path: &Path) -> Result<Self, GscError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("csv") => Ok(Format::Csv),
            Some("json") => Ok(Format::Json),
            _ => Err(GscError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

/// Loads and normalizes an export file into a [`Table`].
///
/// # Errors
///
/// Returns [`GscError::UnsupportedFormat`] for extensions other than `.csv`
/// and `.json`, [`GscError::MissingColumns`] when required headers are
/// absent, and I/O or parse errors when the file cannot be read.
#[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load(path: impl AsRef<Path>) -> Result<Table, GscError> {
    let path = path.as_ref();
    let frame = match Format::from_path(path)? {
        Format::Csv => read_csv(path)?,
        Format::Json => read_json(path)?,
    };
    debug!(columns = ?frame.columns, rows = frame.rows.len(), "Parsed raw frame");

    let table = frame.into_table()?;
    info!(rows = table.len(), "Loaded export");
    Ok(table)
}

static NULL: Value = Value::Null;

/// Rows of loosely typed cells addressed by normalized column name.
#[derive(Debug, Default)]
struct RawFrame {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl RawFrame {
    /// First column whose normalized name equals `name`.
    fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    fn missing_columns(&self) -> Vec<String> {
        let mut missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|c| self.column_index(c).is_none())
            .map(|c| c.to_string())
            .collect();
        missing.sort();
        missing
    }

    fn into_table(self) -> Result<Table, GscError> {
        let missing = self.missing_columns();
        if !missing.is_empty() {
            return Err(GscError::MissingColumns(missing));
        }

        let index = |name: &str| self.column_index(name).unwrap_or(usize::MAX);
        let (query, page) = (index("query"), index("page"));
        let (clicks, impressions) = (index("clicks"), index("impressions"));
        let (ctr, position) = (index("ctr"), index("position"));

        let mut repaired = 0usize;
        let rows = self
            .rows
            .iter()
            .map(|cells| {
                let cell = |i: usize| cells.get(i).unwrap_or(&NULL);
                let mut number = |i: usize| {
                    let value = cell(i);
                    parse_number(value).unwrap_or_else(|| {
                        if !is_blank(value) {
                            repaired += 1;
                        }
                        0.0
                    })
                };
                Row {
                    clicks: number(clicks),
                    impressions: number(impressions),
                    ctr: number(ctr),
                    position: number(position),
                    query: to_text(cell(query)),
                    page: to_text(cell(page)),
                }
            })
            .collect();

        if repaired > 0 {
            warn!(repaired, "Replaced non-numeric cells with 0.0");
        }

        Ok(Table::new(rows))
    }
}

/// Trims whitespace and a leading byte-order mark, then lowercases.
fn normalize_header(header: &str) -> String {
    header.trim_start_matches('\u{feff}').trim().to_lowercase()
}

fn read_csv(path: &Path) -> Result<RawFrame, GscError> {
    let file = File::open(path).map_err(|source| GscError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(file);
    let columns = rdr.headers()?.iter().map(normalize_header).collect();

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let cells = record
            .iter()
            .map(|c| {
                if c.is_empty() {
                    Value::Null
                } else {
                    Value::String(c.to_string())
                }
            })
            .collect();
        rows.push(cells);
    }

    Ok(RawFrame { columns, rows })
}

fn read_json(path: &Path) -> Result<RawFrame, GscError> {
    let content = fs::read_to_string(path).map_err(|source| GscError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    match serde_json::from_str(&content)? {
        Value::Array(items) => frame_from_records(items),
        Value::Object(columns) => frame_from_columns(columns),
        other => Err(GscError::JsonLayout(format!(
            "expected an array of records or an object of columns, found {}",
            json_kind(&other)
        ))),
    }
}

/// `[{"query": .., "clicks": ..}, ..]`
fn frame_from_records(items: Vec<Value>) -> Result<RawFrame, GscError> {
    let mut frame = RawFrame::default();

    for (n, item) in items.into_iter().enumerate() {
        let record = match item {
            Value::Object(record) => record,
            other => {
                return Err(GscError::JsonLayout(format!(
                    "record {n} is {}, expected an object",
                    json_kind(&other)
                )));
            }
        };

        // Keys iterate in byte order, so `Clicks` is seen before `clicks`.
        let mut cells = vec![Value::Null; frame.columns.len()];
        let mut filled = vec![false; frame.columns.len()];
        for (key, value) in record {
            let name = normalize_header(&key);
            let idx = match frame.column_index(&name) {
                Some(idx) => idx,
                None => {
                    frame.columns.push(name);
                    frame.columns.len() - 1
                }
            };
            if cells.len() <= idx {
                cells.resize(idx + 1, Value::Null);
                filled.resize(idx + 1, false);
            }
            if !filled[idx] {
                cells[idx] = value;
                filled[idx] = true;
            }
        }
        frame.rows.push(cells);
    }

    Ok(frame)
}

/// `{"query": [..], ..}` or `{"query": {"0": .., "1": ..}, ..}`
fn frame_from_columns(columns: Map<String, Value>) -> Result<RawFrame, GscError> {
    let mut names = Vec::new();
    let mut series: Vec<HashMap<String, Value>> = Vec::new();

    for (key, value) in columns {
        let entries: HashMap<String, Value> = match value {
            Value::Array(values) => values
                .into_iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v))
                .collect(),
            Value::Object(values) => values.into_iter().collect(),
            other => {
                return Err(GscError::JsonLayout(format!(
                    "column {key:?} is {}, expected an array or object",
                    json_kind(&other)
                )));
            }
        };
        let name = normalize_header(&key);
        if !names.contains(&name) {
            names.push(name);
            series.push(entries);
        }
    }

    let keys: HashSet<&String> = series.iter().flat_map(|entries| entries.keys()).collect();
    let mut index: Vec<String> = keys.into_iter().cloned().collect();
    index.sort_by_cached_key(|k| {
        let numeric = k.parse::<i64>();
        (numeric.is_err(), numeric.unwrap_or(0), k.clone())
    });

    let rows = index
        .iter()
        .map(|key| {
            series
                .iter_mut()
                .map(|entries| entries.remove(key).unwrap_or(Value::Null))
                .collect()
        })
        .collect();

    Ok(RawFrame {
        columns: names,
        rows,
    })
}

/// Coerces a cell to a finite number, or `None` when it cannot be read as one.
fn parse_number(cell: &Value) -> Option<f64> {
    let n = match cell {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };
    n.filter(|v| v.is_finite())
}

fn is_blank(cell: &Value) -> bool {
    match cell {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn to_text(cell: &Value) -> String {
    match cell {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
