use std::path::Path;

use anyhow::{Context, Result, bail};
use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{DataType, Float64Type};
use calamine::{Data, Reader, open_workbook_auto};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{RawCell, RawSheet, Record, Table};
use super::month::{month_label, parse_date};
use crate::config::LoadConfig;

// ---------------------------------------------------------------------------
// Schema errors
// ---------------------------------------------------------------------------

/// Fatal schema problems.  Both variants carry the normalised column list so
/// the user can see what the file actually contains.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    #[error("'MONTH' column is missing. Found columns: {}", .columns.join(", "))]
    MissingMonth { columns: Vec<String> },

    #[error("'{column}' column is missing. Found columns: {}", .columns.join(", "))]
    MissingColumn { column: String, columns: Vec<String> },
}

impl SchemaError {
    /// Columns actually present in the file.
    pub fn columns(&self) -> &[String] {
        match self {
            SchemaError::MissingMonth { columns } | SchemaError::MissingColumn { columns, .. } => {
                columns
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load the P&L table described by `config`.
///
/// Supported formats (dispatch by extension):
/// * `.xlsx` / `.xlsm` / `.xlsb` / `.xls` / `.ods` – first sheet (or `config.sheet`)
/// * `.csv`     – plain CSV, header at `config.header_row`
/// * `.json`    – `[{ "STORE": "...", "MONTH": "...", ... }, ...]`
/// * `.parquet` – flat columns, one per field
///
/// `header_row` only applies to the grid formats (spreadsheets and CSV).
pub fn load(config: &LoadConfig) -> Result<Table> {
    let raw = read_raw(config)
        .with_context(|| format!("loading {}", config.path.display()))?;
    let table = build_table(raw)?;
    log::info!(
        "Loaded {} rows from {} with columns {:?}",
        table.len(),
        config.path.display(),
        table.columns
    );
    Ok(table)
}

/// Read the file into a raw grid without applying the schema.
pub fn read_raw(config: &LoadConfig) -> Result<RawSheet> {
    let path = config.path.as_path();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => {
            read_spreadsheet(path, config.header_row, config.sheet.as_deref())
        }
        "csv" => read_csv(path, config.header_row),
        "json" => read_json(path),
        "parquet" | "pq" => read_parquet(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

// ---------------------------------------------------------------------------
// Schema application
// ---------------------------------------------------------------------------

/// Trim, upper-case and replace spaces with underscores.  Blank headers get
/// a positional `UNNAMED:_<n>` name.
pub fn normalize_column(name: &str, position: usize) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return format!("UNNAMED:_{position}");
    }
    trimmed.to_uppercase().replace(' ', "_")
}

static EMPTY: RawCell = RawCell::Empty;

const REQUIRED_COLUMNS: [&str; 8] = [
    "STORE",
    "CM_COHORT",
    "EBITDA_CATEGORY",
    "EBITDA_COHORT",
    "REVENUE_COHORT",
    "GROSS_MARGIN",
    "NET_REVENUE",
    "KITCHEN_EBITDA",
];

/// Normalise headers, validate the schema and convert rows into records.
pub fn build_table(raw: RawSheet) -> Result<Table, SchemaError> {
    let columns: Vec<String> = raw
        .headers
        .iter()
        .enumerate()
        .map(|(i, h)| normalize_column(h, i))
        .collect();
    let find = |name: &str| columns.iter().position(|c| c == name);

    let month_idx = find("MONTH").ok_or_else(|| SchemaError::MissingMonth {
        columns: columns.clone(),
    })?;

    let mut idx = [0usize; REQUIRED_COLUMNS.len()];
    for (slot, name) in idx.iter_mut().zip(REQUIRED_COLUMNS) {
        *slot = find(name).ok_or_else(|| SchemaError::MissingColumn {
            column: name.to_string(),
            columns: columns.clone(),
        })?;
    }
    let [store, cm_cohort, ebitda_category, ebitda_cohort, revenue_cohort, gross_margin, net_revenue, kitchen_ebitda] =
        idx;

    let mut records = Vec::with_capacity(raw.rows.len());
    let mut bad_months = 0usize;

    for row in &raw.rows {
        if row.iter().all(|c| *c == RawCell::Empty) {
            continue;
        }
        let cell = |i: usize| row.get(i).unwrap_or(&EMPTY);

        let month_cell = cell(month_idx);
        let month = parse_date(month_cell).map(month_label);
        if month.is_none() && *month_cell != RawCell::Empty {
            bad_months += 1;
        }

        records.push(Record {
            store: cell(store).as_label(),
            cm_cohort: cell(cm_cohort).as_label(),
            ebitda_category: cell(ebitda_category).as_label(),
            ebitda_cohort: cell(ebitda_cohort).as_label(),
            revenue_cohort: cell(revenue_cohort).as_label(),
            month,
            net_revenue: cell(net_revenue).as_f64(),
            gross_margin: cell(gross_margin).as_f64(),
            kitchen_ebitda: cell(kitchen_ebitda).as_f64(),
        });
    }

    if bad_months > 0 {
        log::warn!("{bad_months} MONTH values could not be parsed as dates; treating them as null");
    }

    Ok(Table { columns, records })
}

/// Split a grid at `header_row`: that row becomes the header, rows above it
/// are discarded.  Blank rows are dropped first, so `header_row` counts
/// non-blank rows for every grid format.
fn split_header(mut grid: Vec<Vec<RawCell>>, header_row: usize) -> Result<RawSheet> {
    grid.retain(|row| row.iter().any(|c| *c != RawCell::Empty));
    if header_row >= grid.len() {
        bail!(
            "header row {header_row} is past the end of the sheet ({} non-blank rows)",
            grid.len()
        );
    }
    let rows = grid.split_off(header_row + 1);
    let headers = grid
        .pop()
        .map(|r| r.iter().map(|c| c.to_string()).collect())
        .unwrap_or_default();
    Ok(RawSheet { headers, rows })
}

// ---------------------------------------------------------------------------
// Spreadsheet loader
// ---------------------------------------------------------------------------

fn read_spreadsheet(path: &Path, header_row: usize, sheet: Option<&str>) -> Result<RawSheet> {
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("failed to open workbook: {}", path.display()))?;

    let range = match sheet {
        Some(name) => workbook
            .worksheet_range(name)
            .with_context(|| format!("failed to read sheet: {name}"))?,
        None => workbook
            .worksheet_range_at(0)
            .context("workbook has no sheets")?
            .context("failed to read first sheet")?,
    };

    let grid = range
        .rows()
        .map(|r| r.iter().map(spreadsheet_cell).collect())
        .collect();
    split_header(grid, header_row)
}

fn spreadsheet_cell(cell: &Data) -> RawCell {
    match cell {
        Data::String(s) => RawCell::Text(s.clone()),
        Data::Float(v) => RawCell::Number(*v),
        Data::Int(v) => RawCell::Number(*v as f64),
        Data::Bool(b) => RawCell::Bool(*b),
        Data::DateTime(dt) => dt.as_datetime().map_or(RawCell::Empty, RawCell::Date),
        Data::DateTimeIso(s) | Data::DurationIso(s) => RawCell::Text(s.clone()),
        Data::Error(_) | Data::Empty => RawCell::Empty,
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn read_csv(path: &Path, header_row: usize) -> Result<RawSheet> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .context("opening CSV")?;

    let mut grid = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        grid.push(record.iter().map(guess_cell_type).collect());
    }

    split_header(grid, header_row)
}

fn guess_cell_type(s: &str) -> RawCell {
    let t = s.trim();
    if t.is_empty() {
        return RawCell::Empty;
    }
    if let Ok(f) = t.parse::<f64>() {
        return RawCell::Number(f);
    }
    if t == "true" || t == "false" {
        return RawCell::Bool(t == "true");
    }
    RawCell::Text(s.to_string())
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON, the default `df.to_json(orient='records')`.
/// Columns are the union of keys in first-seen order.
fn read_json(path: &Path) -> Result<RawSheet> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root.as_array().context("Expected top-level JSON array")?;

    let mut headers: Vec<String> = Vec::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        for key in obj.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
    }

    let rows = records
        .iter()
        .filter_map(|rec| rec.as_object())
        .map(|obj| {
            headers
                .iter()
                .map(|h| obj.get(h).map_or(RawCell::Empty, json_cell))
                .collect()
        })
        .collect();

    Ok(RawSheet { headers, rows })
}

fn json_cell(val: &JsonValue) -> RawCell {
    match val {
        JsonValue::String(s) => RawCell::Text(s.clone()),
        JsonValue::Number(n) => n.as_f64().map_or(RawCell::Empty, RawCell::Number),
        JsonValue::Bool(b) => RawCell::Bool(*b),
        JsonValue::Null => RawCell::Empty,
        other => RawCell::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a flat Parquet extract (one column per field).  Works with files
/// written by both **Pandas** and **Polars**.
fn read_parquet(path: &Path) -> Result<RawSheet> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let headers: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut rows = Vec::new();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let columns = batch
            .columns()
            .iter()
            .zip(&headers)
            .map(|(col, name)| {
                column_cells(col).with_context(|| format!("converting column '{name}'"))
            })
            .collect::<Result<Vec<_>>>()?;

        for row in 0..batch.num_rows() {
            rows.push(columns.iter().map(|c| c[row].clone()).collect());
        }
    }

    Ok(RawSheet { headers, rows })
}

/// Convert one Arrow column into raw cells.  Numbers are widened to `f64`;
/// everything else (strings, dates, timestamps) goes through its text form.
fn column_cells(col: &ArrayRef) -> Result<Vec<RawCell>> {
    let dt = col.data_type();
    if *dt == DataType::Boolean {
        let arr = col.as_boolean_opt().context("expected BooleanArray")?;
        return Ok((0..arr.len())
            .map(|i| {
                if arr.is_null(i) {
                    RawCell::Empty
                } else {
                    RawCell::Bool(arr.value(i))
                }
            })
            .collect());
    }
    if dt.is_numeric() {
        let cast = arrow::compute::cast(col.as_ref(), &DataType::Float64)
            .context("casting to Float64")?;
        let arr = cast
            .as_primitive_opt::<Float64Type>()
            .context("expected Float64Array")?;
        return Ok(arr
            .iter()
            .map(|v| v.map_or(RawCell::Empty, RawCell::Number))
            .collect());
    }
    let cast = arrow::compute::cast(col.as_ref(), &DataType::Utf8).context("casting to Utf8")?;
    let arr = cast.as_string_opt::<i32>().context("expected StringArray")?;
    Ok(arr
        .iter()
        .map(|v| v.map_or(RawCell::Empty, |s| RawCell::Text(s.to_string())))
        .collect())
}
