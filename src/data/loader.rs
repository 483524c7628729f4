use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{Array, Float32Array, Float64Array, Int32Array, Int64Array};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{Column, MixFeatures, MixRecord};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load raw mix records from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row, one mix per line
/// * `.json`    – `[{ "cement": 540.0, ..., "age": 28, "strength": 79.99 }, ...]`
/// * `.parquet` – flat numeric columns (recommended for large exports)
///
/// Headers may use either the canonical names or the long UCI spreadsheet
/// headers; see [`Column::from_header`].
pub fn load_file(path: &Path) -> Result<Vec<MixRecord>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "parquet" | "pq" => load_parquet(path),
        "json" => load_json(path),
        "csv" => load_csv(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

// ---------------------------------------------------------------------------
// Column resolution
// ---------------------------------------------------------------------------

/// Position of every canonical column among the raw headers.
struct ColumnIndex(BTreeMap<Column, usize>);

impl ColumnIndex {
    fn resolve<'a>(headers: impl IntoIterator<Item = &'a str>) -> Result<Self> {
        let mut found = BTreeMap::new();
        for (idx, header) in headers.into_iter().enumerate() {
            if let Some(col) = Column::from_header(header) {
                if found.insert(col, idx).is_some() {
                    bail!("Column '{col}' appears more than once (header '{}')", header.trim());
                }
            }
        }
        for col in Column::ALL {
            if !found.contains_key(&col) {
                bail!("Missing required column '{col}'");
            }
        }
        Ok(ColumnIndex(found))
    }

    fn get(&self, col: Column) -> usize {
        self.0[&col]
    }
}

/// Assemble a record once every column value of a row is known.
///
/// Every value must be finite; `NaN` and infinities are rejected.
fn build_record(row: usize, mut read: impl FnMut(Column) -> Result<f64>) -> Result<MixRecord> {
    let mut value = |col: Column| -> Result<f64> {
        let v = read(col)?;
        if !v.is_finite() {
            bail!("Row {row}, {col}: {v} is not a finite number");
        }
        Ok(v)
    };
    let features = MixFeatures {
        cement: value(Column::Cement)?,
        slag: value(Column::Slag)?,
        fly_ash: value(Column::FlyAsh)?,
        water: value(Column::Water)?,
        plasticizer: value(Column::Plasticizer)?,
        coarse_aggregate: value(Column::CoarseAggregate)?,
        fine_aggregate: value(Column::FineAggregate)?,
    };
    Ok(MixRecord {
        features,
        age_days: value(Column::Age)?,
        strength: value(Column::Strength)?,
    })
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn load_csv(path: &Path) -> Result<Vec<MixRecord>> {
    let reader = csv::Reader::from_path(path).context("opening CSV")?;
    read_csv(reader)
}

fn read_csv<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Vec<MixRecord>> {
    let headers = reader.headers().context("reading CSV headers")?.clone();
    let index = ColumnIndex::resolve(headers.iter())?;

    let mut records = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let row = result.with_context(|| format!("CSV row {row_no}"))?;
        let record = build_record(row_no, |col| {
            let raw = row.get(index.get(col)).unwrap_or("");
            raw.trim()
                .parse::<f64>()
                .with_context(|| format!("Row {row_no}, {col}: '{raw}' is not a number"))
        })?;
        records.push(record);
    }
    Ok(records)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON, the default `df.to_json(orient='records')`.
fn load_json(path: &Path) -> Result<Vec<MixRecord>> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    parse_json(&text)
}

fn parse_json(text: &str) -> Result<Vec<MixRecord>> {
    let root: JsonValue = serde_json::from_str(text).context("parsing JSON")?;
    let rows = root.as_array().context("Expected top-level JSON array")?;

    let mut records = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let obj = row
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;

        let mut by_column: BTreeMap<Column, f64> = BTreeMap::new();
        for (key, val) in obj {
            let Some(col) = Column::from_header(key) else {
                continue;
            };
            let v = val
                .as_f64()
                .with_context(|| format!("Row {i}, {col}: not a number"))?;
            by_column.insert(col, v);
        }

        let record = build_record(i, |col| {
            by_column
                .get(&col)
                .copied()
                .with_context(|| format!("Row {i}: missing required column '{col}'"))
        })?;
        records.push(record);
    }
    Ok(records)
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with one numeric column per canonical column.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`).
fn load_parquet(path: &Path) -> Result<Vec<MixRecord>> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut records = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();
        let index = ColumnIndex::resolve(schema.fields().iter().map(|f| f.name().as_str()))?;

        for row in 0..batch.num_rows() {
            let record = build_record(row, |col| {
                extract_f64(batch.column(index.get(col)), row)
                    .with_context(|| format!("Row {row}: failed to read '{col}'"))
            })?;
            records.push(record);
        }
    }

    Ok(records)
}

/// Extract one numeric cell as `f64`.
fn extract_f64(col: &Arc<dyn Array>, row: usize) -> Result<f64> {
    if col.is_null(row) {
        bail!("null value in numeric column");
    }
    let any = col.as_any();
    let value = match col.data_type() {
        DataType::Float64 => any.downcast_ref::<Float64Array>().map(|a| a.value(row)),
        DataType::Float32 => any
            .downcast_ref::<Float32Array>()
            .map(|a| a.value(row) as f64),
        DataType::Int64 => any.downcast_ref::<Int64Array>().map(|a| a.value(row) as f64),
        DataType::Int32 => any.downcast_ref::<Int32Array>().map(|a| a.value(row) as f64),
        other => bail!("Expected a numeric column, got {other:?}"),
    };
    value.context("column array does not match its declared type")
}
