use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use arrow::array::{
    Array, ArrayRef, AsArray, Float32Array, Float64Array, Int32Array, Int64Array, StringArray,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use serde::{Deserialize, Serialize};

use super::model::{round_to_persisted, Column, ColumnKind, Dataset, Record, Value};

// ---------------------------------------------------------------------------
// Format selection
// ---------------------------------------------------------------------------

/// On-disk table formats. Chosen from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    /// Header row plus one row per record; numbers as `%.5f` text.
    Csv,
    /// `{ "columns": [...], "rows": [{ "Particle_Used": "SiO2", ... }, ...] }`
    Json,
    /// Single-sheet workbook, header in the first row.
    Xlsx,
    /// One nullable Utf8/Float64 column per schema column.
    Parquet,
}

impl TableFormat {
    pub fn from_path(path: &Path) -> Option<TableFormat> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        match ext.as_str() {
            "csv" => Some(TableFormat::Csv),
            "json" => Some(TableFormat::Json),
            "xlsx" => Some(TableFormat::Xlsx),
            "parquet" | "pq" => Some(TableFormat::Parquet),
            _ => None,
        }
    }

    /// Extensions accepted by the file dialogs.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            TableFormat::Csv => &["csv"],
            TableFormat::Json => &["json"],
            TableFormat::Xlsx => &["xlsx"],
            TableFormat::Parquet => &["parquet", "pq"],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TableFormat::Csv => "CSV",
            TableFormat::Json => "JSON",
            TableFormat::Xlsx => "Excel",
            TableFormat::Parquet => "Parquet",
        }
    }

    pub const ALL: [TableFormat; 4] = [
        TableFormat::Xlsx,
        TableFormat::Csv,
        TableFormat::Json,
        TableFormat::Parquet,
    ];

    /// Parse an existing file into a dataset.
    pub fn read(self, path: &Path) -> Result<Dataset> {
        match self {
            TableFormat::Csv => read_csv(path),
            TableFormat::Json => read_json(path),
            TableFormat::Xlsx => read_xlsx(path),
            TableFormat::Parquet => read_parquet(path),
        }
    }

    /// Serialize the whole dataset to the bytes of a complete file.
    pub fn encode(self, dataset: &Dataset) -> Result<Vec<u8>> {
        match self {
            TableFormat::Csv => encode_csv(dataset),
            TableFormat::Json => encode_json(dataset),
            TableFormat::Xlsx => encode_xlsx(dataset),
            TableFormat::Parquet => encode_parquet(dataset),
        }
    }
}

// ---------------------------------------------------------------------------
// Shared header / cell handling
// ---------------------------------------------------------------------------

/// Map each header position to a known column.
///
/// Unknown headers and repeats are skipped (first occurrence wins). A table
/// with no recognised headers at all gets the canonical schema.
fn resolve_headers<'a>(headers: impl IntoIterator<Item = &'a str>) -> (Vec<Column>, Vec<Option<Column>>) {
    let mut schema = Vec::new();
    let mut positions = Vec::new();
    let mut saw_header = false;

    for header in headers {
        if header.trim().is_empty() {
            positions.push(None);
            continue;
        }
        saw_header = true;
        match Column::from_header(header) {
            Some(col) if !schema.contains(&col) => {
                schema.push(col);
                positions.push(Some(col));
            }
            Some(col) => {
                log::warn!("Ignoring repeated column '{header}' (already read as {col})");
                positions.push(None);
            }
            None => {
                log::warn!("Ignoring unrecognised column '{header}'");
                positions.push(None);
            }
        }
    }

    if !saw_header {
        schema = Column::CANONICAL.to_vec();
    }
    (schema, positions)
}

/// Interpret a text cell for `column`. Blank cells are null.
fn parse_text_cell(column: Column, raw: &str) -> Result<Option<Value>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    match column.kind() {
        ColumnKind::Text => Ok(Some(Value::Text(trimmed.to_string()))),
        ColumnKind::Numeric => {
            let v: f64 = trimmed
                .parse()
                .with_context(|| format!("{column}: '{trimmed}' is not a number"))?;
            Ok(if v.is_nan() { None } else { Some(Value::Number(v)) })
        }
    }
}

/// Coerce an already-typed cell to the column's kind.
fn coerce(column: Column, value: Value) -> Result<Option<Value>> {
    match (column.kind(), value) {
        (ColumnKind::Text, Value::Text(s)) => parse_text_cell(column, &s),
        (ColumnKind::Text, Value::Number(v)) => Ok(Some(Value::Text(v.to_string()))),
        (ColumnKind::Numeric, Value::Number(v)) if v.is_nan() => Ok(None),
        (ColumnKind::Numeric, Value::Number(v)) => Ok(Some(Value::Number(v))),
        (ColumnKind::Numeric, Value::Text(s)) => parse_text_cell(column, &s),
    }
}

fn set_cell(record: &mut Record, column: Column, value: Option<Value>) -> Result<()> {
    record.set(column, value)?;
    Ok(())
}

fn number_text(v: f64) -> String {
    format!("{v:.5}")
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

fn read_csv(path: &Path) -> Result<Dataset> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .context("opening CSV")?;
    let headers = reader.headers().context("reading CSV headers")?.clone();
    let (schema, positions) = resolve_headers(headers.iter());

    let mut records = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let line = row_no + 2;
        let row = result.with_context(|| format!("CSV line {line}"))?;
        let mut record = Record::default();
        for (idx, raw) in row.iter().enumerate() {
            let Some(column) = positions.get(idx).copied().flatten() else {
                continue;
            };
            let value = parse_text_cell(column, raw).with_context(|| format!("CSV line {line}"))?;
            set_cell(&mut record, column, value)?;
        }
        records.push(record);
    }

    Ok(Dataset::from_parts(schema, records))
}

fn encode_csv(dataset: &Dataset) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(dataset.columns().iter().map(|c| c.header()))
        .context("writing CSV header")?;

    for record in dataset.records() {
        let cells = dataset.columns().iter().map(|col| match record.get(*col) {
            Some(Value::Number(v)) => number_text(v),
            Some(Value::Text(s)) => s,
            None => String::new(),
        });
        writer.write_record(cells).context("writing CSV row")?;
    }

    writer
        .into_inner()
        .map_err(|e| anyhow!("flushing CSV output: {}", e.error()))
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

type JsonRow = serde_json::Map<String, serde_json::Value>;

/// JSON file layouts. Files are written as `Table`; a bare array of row
/// objects is still read.
#[derive(Deserialize)]
#[serde(untagged)]
enum JsonTable {
    Rows(Vec<JsonRow>),
    Table { columns: Vec<String>, rows: Vec<JsonRow> },
}

#[derive(Serialize)]
struct JsonTableOut<'a> {
    columns: Vec<&'a str>,
    rows: Vec<JsonRow>,
}

/// A bare row array takes its schema from the union of keys in first-seen
/// order; the table form carries it in `columns`, so empty tables keep it.
fn read_json(path: &Path) -> Result<Dataset> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let table: JsonTable = serde_json::from_str(&text)
        .context("parsing JSON: expected an array of objects or a {columns, rows} table")?;

    let (keys, rows): (Vec<String>, Vec<JsonRow>) = match table {
        JsonTable::Table { columns, rows } => (columns, rows),
        JsonTable::Rows(rows) => {
            let mut keys: Vec<String> = Vec::new();
            for row in &rows {
                for key in row.keys() {
                    if !keys.contains(key) {
                        keys.push(key.clone());
                    }
                }
            }
            (keys, rows)
        }
    };

    let (schema, positions) = resolve_headers(keys.iter().map(String::as_str));
    let lookup: BTreeMap<&str, Column> = keys
        .iter()
        .zip(positions)
        .filter_map(|(k, col)| col.map(|c| (k.as_str(), c)))
        .collect();

    let mut records = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let mut record = Record::default();
        for (key, raw) in row {
            let Some(&column) = lookup.get(key.as_str()) else {
                continue;
            };
            let cell: Option<Value> = serde_json::from_value(raw.clone())
                .with_context(|| format!("Row {i}, {key}: expected a string, number or null"))?;
            let value = match cell {
                Some(v) => coerce(column, v).with_context(|| format!("Row {i}"))?,
                None => None,
            };
            set_cell(&mut record, column, value)?;
        }
        records.push(record);
    }

    Ok(Dataset::from_parts(schema, records))
}

fn encode_json(dataset: &Dataset) -> Result<Vec<u8>> {
    let rows: Vec<JsonRow> = dataset
        .records()
        .iter()
        .map(|record| {
            dataset
                .columns()
                .iter()
                .map(|col| {
                    let cell = match record.get(*col) {
                        Some(Value::Number(v)) => Some(Value::Number(round_to_persisted(v))),
                        other => other,
                    };
                    let json = serde_json::to_value(cell).unwrap_or(serde_json::Value::Null);
                    (col.header().to_string(), json)
                })
                .collect()
        })
        .collect();

    let table = JsonTableOut {
        columns: dataset.columns().iter().map(|c| c.header()).collect(),
        rows,
    };
    serde_json::to_vec_pretty(&table).context("serializing JSON")
}

// ---------------------------------------------------------------------------
// XLSX
// ---------------------------------------------------------------------------

fn read_xlsx(path: &Path) -> Result<Dataset> {
    use calamine::{open_workbook, Data, Reader, Xlsx};

    let mut workbook: Xlsx<_> = open_workbook(path).context("opening workbook")?;
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .context("workbook has no sheets")?;
    let range = workbook
        .worksheet_range(&sheet_name)
        .with_context(|| format!("reading sheet '{sheet_name}'"))?;

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .map(|row| row.iter().map(|c| c.to_string()).collect())
        .unwrap_or_default();
    let (schema, positions) = resolve_headers(headers.iter().map(String::as_str));

    let mut records = Vec::new();
    for (row_no, row) in rows.enumerate() {
        let mut record = Record::default();
        for (idx, cell) in row.iter().enumerate() {
            let Some(column) = positions.get(idx).copied().flatten() else {
                continue;
            };
            let typed = match cell {
                Data::Empty => None,
                Data::Float(f) => Some(Value::Number(*f)),
                Data::Int(i) => Some(Value::Number(*i as f64)),
                Data::Error(e) => bail!("sheet row {}: {column} holds an error cell ({e:?})", row_no + 2),
                other => Some(Value::Text(other.to_string())),
            };
            let value = match typed {
                Some(v) => coerce(column, v).with_context(|| format!("sheet row {}", row_no + 2))?,
                None => None,
            };
            set_cell(&mut record, column, value)?;
        }
        records.push(record);
    }

    Ok(Dataset::from_parts(schema, records))
}

fn encode_xlsx(dataset: &Dataset) -> Result<Vec<u8>> {
    use rust_xlsxwriter::{Format, Workbook};

    let mut workbook = Workbook::new();
    let number_format = Format::new().set_num_format("0.00000");
    let header_format = Format::new().set_bold();

    let sheet = workbook.add_worksheet();
    for (c, col) in dataset.columns().iter().enumerate() {
        sheet
            .write_string_with_format(0, c as u16, col.header(), &header_format)
            .context("writing header cell")?;
    }

    for (r, record) in dataset.records().iter().enumerate() {
        let row = (r + 1) as u32;
        for (c, col) in dataset.columns().iter().enumerate() {
            match record.get(*col) {
                Some(Value::Number(v)) => {
                    sheet
                        .write_number_with_format(row, c as u16, round_to_persisted(v), &number_format)
                        .with_context(|| format!("writing {col} in row {row}"))?;
                }
                Some(Value::Text(s)) => {
                    sheet
                        .write_string(row, c as u16, &s)
                        .with_context(|| format!("writing {col} in row {row}"))?;
                }
                None => {}
            }
        }
    }

    workbook.save_to_buffer().context("serializing workbook")
}

// ---------------------------------------------------------------------------
// Parquet
// ---------------------------------------------------------------------------

fn read_parquet(path: &Path) -> Result<Dataset> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;

    let arrow_schema = builder.schema().clone();
    let (schema, positions) = resolve_headers(arrow_schema.fields().iter().map(|f| f.name().as_str()));
    let reader = builder.build().context("building parquet reader")?;

    let mut records = Vec::new();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for row in 0..batch.num_rows() {
            let mut record = Record::default();
            for (idx, column) in positions.iter().enumerate() {
                let Some(column) = *column else {
                    continue;
                };
                let typed = extract_value(batch.column(idx), row)
                    .with_context(|| format!("Row {row}: failed to read '{column}'"))?;
                let value = match typed {
                    Some(v) => coerce(column, v)?,
                    None => None,
                };
                set_cell(&mut record, column, value)?;
            }
            records.push(record);
        }
    }

    Ok(Dataset::from_parts(schema, records))
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_value(col: &ArrayRef, row: usize) -> Result<Option<Value>> {
    if col.is_null(row) {
        return Ok(None);
    }
    let value = match col.data_type() {
        DataType::Utf8 => Value::Text(col.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => Value::Text(col.as_string::<i64>().value(row).to_string()),
        DataType::Float64 => {
            let arr = col
                .as_any()
                .downcast_ref::<Float64Array>()
                .context("expected Float64Array")?;
            Value::Number(arr.value(row))
        }
        DataType::Float32 => {
            let arr = col
                .as_any()
                .downcast_ref::<Float32Array>()
                .context("expected Float32Array")?;
            Value::Number(arr.value(row) as f64)
        }
        DataType::Int64 => {
            let arr = col
                .as_any()
                .downcast_ref::<Int64Array>()
                .context("expected Int64Array")?;
            Value::Number(arr.value(row) as f64)
        }
        DataType::Int32 => {
            let arr = col
                .as_any()
                .downcast_ref::<Int32Array>()
                .context("expected Int32Array")?;
            Value::Number(arr.value(row) as f64)
        }
        other => bail!("unsupported column type {other:?}"),
    };
    Ok(Some(value))
}

fn encode_parquet(dataset: &Dataset) -> Result<Vec<u8>> {
    let fields: Vec<Field> = dataset
        .columns()
        .iter()
        .map(|col| {
            let data_type = match col.kind() {
                ColumnKind::Text => DataType::Utf8,
                ColumnKind::Numeric => DataType::Float64,
            };
            Field::new(col.header(), data_type, true)
        })
        .collect();
    let schema = Arc::new(Schema::new(fields));

    let arrays: Vec<ArrayRef> = dataset
        .columns()
        .iter()
        .map(|col| -> ArrayRef {
            let values = dataset.column_values(*col);
            match col.kind() {
                ColumnKind::Text => Arc::new(StringArray::from(
                    values
                        .iter()
                        .map(|v| v.as_ref().and_then(Value::as_str))
                        .collect::<Vec<_>>(),
                )),
                ColumnKind::Numeric => Arc::new(Float64Array::from(
                    values
                        .iter()
                        .map(|v| v.as_ref().and_then(Value::as_f64).map(round_to_persisted))
                        .collect::<Vec<_>>(),
                )),
            }
        })
        .collect();

    let batch = RecordBatch::try_new(schema.clone(), arrays).context("building record batch")?;
    let mut buf = Vec::new();
    let mut writer =
        ArrowWriter::try_new(&mut buf, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("finishing parquet file")?;
    Ok(buf)
}
