//! Tables and their export to CSV, TSV, JSON and LaTeX files.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::prelude::*;
use clap::ValueEnum;
use log::info;
use serde_json::{Map, Number, Value};

use crate::error::Result;
use crate::latex::{LatexOptions, render_latex};

/// Output format for exported tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Csv,
    Tsv,
    Json,
    Latex,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Tsv => "tsv",
            ExportFormat::Json => "json",
            ExportFormat::Latex => "tex",
        }
    }
}

/// A single table value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Empty,
}

impl Cell {
    pub fn is_numeric(&self) -> bool {
        matches!(self, Cell::Int(_) | Cell::Float(_))
    }

    fn to_json(&self) -> Value {
        match self {
            Cell::Text(s) => Value::String(s.clone()),
            Cell::Int(i) => Value::Number((*i).into()),
            Cell::Float(f) => Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
            Cell::Bool(b) => Value::Bool(*b),
            Cell::Empty => Value::Null,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(s) => f.write_str(s),
            Cell::Int(i) => write!(f, "{i}"),
            Cell::Float(x) => write!(f, "{x}"),
            Cell::Bool(b) => f.write_str(if *b { "True" } else { "False" }),
            Cell::Empty => Ok(()),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

impl From<usize> for Cell {
    fn from(n: usize) -> Self {
        Cell::Int(n as i64)
    }
}

impl From<u32> for Cell {
    fn from(n: u32) -> Self {
        Cell::Int(n as i64)
    }
}

impl From<i64> for Cell {
    fn from(n: i64) -> Self {
        Cell::Int(n)
    }
}

impl From<f64> for Cell {
    fn from(x: f64) -> Self {
        if x.is_finite() { Cell::Float(x) } else { Cell::Empty }
    }
}

impl From<bool> for Cell {
    fn from(b: bool) -> Self {
        Cell::Bool(b)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Cell::Empty)
    }
}

/// A named table with a header row.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
    pub latex: LatexOptions,
}

impl Table {
    pub fn new<S: Into<String>>(name: &str, headers: Vec<S>) -> Self {
        Table {
            name: name.to_string(),
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
            latex: LatexOptions::default(),
        }
    }

    pub fn push(&mut self, row: Vec<Cell>) {
        debug_assert_eq!(row.len(), self.headers.len(), "row width of table {}", self.name);
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell of a row by column name.
    pub fn get(&self, row: usize, column: &str) -> Option<&Cell> {
        let idx = self.headers.iter().position(|h| h == column)?;
        self.rows.get(row)?.get(idx)
    }

    /// Rows as JSON objects keyed by header.
    pub fn to_json(&self) -> Value {
        Value::Array(
            self.rows
                .iter()
                .map(|row| {
                    let mut obj = Map::new();
                    for (h, c) in self.headers.iter().zip(row) {
                        obj.insert(h.clone(), c.to_json());
                    }
                    Value::Object(obj)
                })
                .collect(),
        )
    }

    fn to_delimited(&self, delimiter: u8) -> Result<String> {
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_writer(Vec::new());
        wtr.write_record(&self.headers)?;
        for row in &self.rows {
            wtr.write_record(row.iter().map(|c| match c {
                Cell::Text(s) => csv_safe_cell(s.clone()),
                other => other.to_string(),
            }))?;
        }
        let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Serialize the table in the given format.
    pub fn render(&self, format: ExportFormat) -> Result<String> {
        match format {
            ExportFormat::Csv => self.to_delimited(b','),
            ExportFormat::Tsv => self.to_delimited(b'\t'),
            ExportFormat::Json => Ok(serde_json::to_string_pretty(&self.to_json())?),
            ExportFormat::Latex => Ok(render_latex(self)),
        }
    }
}

/// Neutralize cells a spreadsheet would read as a formula by prefixing a
/// single quote. Cells already starting with a quote are left alone.
///
/// # Example
/// ```
/// use community_stats::csv_safe_cell;
/// assert_eq!(csv_safe_cell("=SUM(A1)".to_string()), "'=SUM(A1)");
/// assert_eq!(csv_safe_cell("thanks".to_string()), "thanks");
/// ```
pub fn csv_safe_cell(cell: String) -> String {
    match cell.chars().next() {
        Some('=' | '+' | '-' | '@' | '\t' | '\r') => format!("'{cell}"),
        _ => cell,
    }
}

/// Timestamp shared by all files of one run, e.g. `20240131_142502`.
pub fn run_timestamp() -> String {
    let local: DateTime<Local> = Local::now();
    local.format("%Y%m%d_%H%M%S").to_string()
}

/// Path of an exported table: `<dir>/<stem>_<timestamp>_<table>.<ext>`.
pub fn output_path(dir: &Path, stem: &str, timestamp: &str, table: &str, ext: &str) -> PathBuf {
    dir.join(format!("{stem}_{timestamp}_{table}.{ext}"))
}

/// Write a table to `dir`, creating the directory when needed.
pub fn save_table(
    table: &Table,
    dir: &Path,
    stem: &str,
    timestamp: &str,
    format: ExportFormat,
) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = output_path(dir, stem, timestamp, &table.name, format.extension());
    fs::write(&path, table.render(format)?)?;
    info!("Wrote {} ({} rows)", path.display(), table.len());
    Ok(path)
}

/// Write non-tabular output (e.g. a GML graph) next to the tables.
pub fn save_text(
    content: &str,
    dir: &Path,
    stem: &str,
    timestamp: &str,
    name: &str,
    ext: &str,
) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = output_path(dir, stem, timestamp, name, ext);
    fs::write(&path, content)?;
    info!("Wrote {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        let mut t = Table::new("bus_factor", vec!["project", "bus_factor", "commits"]);
        t.push(vec!["numpy".into(), 0.5.into(), 10usize.into()]);
        t.push(vec!["=evil".into(), Cell::from(None::<f64>), (-3i64).into()]);
        t
    }

    #[test]
    fn csv_quotes_and_sanitizes_text_only() {
        let out = sample().render(ExportFormat::Csv).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "project,bus_factor,commits");
        assert_eq!(lines[1], "numpy,0.5,10");
        assert_eq!(lines[2], "'=evil,,-3");
    }

    #[test]
    fn tsv_uses_tabs() {
        let out = sample().render(ExportFormat::Tsv).unwrap();
        assert!(out.starts_with("project\tbus_factor\tcommits\n"));
    }

    #[test]
    fn json_rows_are_objects() {
        let out = sample().render(ExportFormat::Json).unwrap();
        let v: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v[0]["project"], "numpy");
        assert_eq!(v[0]["commits"], 10);
        assert!(v[1]["bus_factor"].is_null());
    }

    #[test]
    fn non_finite_floats_are_empty() {
        assert_eq!(Cell::from(f64::NAN), Cell::Empty);
        assert_eq!(Cell::from(Some(1.5)), Cell::Float(1.5));
    }

    #[test]
    fn lookup_by_column() {
        let t = sample();
        assert_eq!(t.get(0, "commits"), Some(&Cell::Int(10)));
        assert_eq!(t.get(0, "nope"), None);
        assert_eq!(t.get(5, "commits"), None);
    }

    #[test]
    fn saved_file_name_has_timestamp_and_table() {
        let td = tempfile::tempdir().unwrap();
        let out = td.path().join("nested");
        let p = save_table(&sample(), &out, "numpy", "20240101_120000", ExportFormat::Json).unwrap();
        assert_eq!(
            p.file_name().unwrap().to_string_lossy(),
            "numpy_20240101_120000_bus_factor.json"
        );
        assert!(p.is_file());
    }

    #[test]
    fn already_quoted_cells_unchanged() {
        assert_eq!(csv_safe_cell("'@SAFE".to_string()), "'@SAFE");
        assert_eq!(csv_safe_cell("@bot".to_string()), "'@bot");
        assert_eq!(csv_safe_cell(String::new()), "");
    }
}
