use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{Float64Array, Int64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;

/// Headers of the UCI concrete spreadsheet, as written to CSV.
const UCI_HEADERS: [&str; 9] = [
    "Cement (component 1)(kg in a m^3 mixture)",
    "Blast Furnace Slag (component 2)(kg in a m^3 mixture)",
    "Fly Ash (component 3)(kg in a m^3 mixture)",
    "Water  (component 4)(kg in a m^3 mixture)",
    "Superplasticizer (component 5)(kg in a m^3 mixture)",
    "Coarse Aggregate  (component 6)(kg in a m^3 mixture)",
    "Fine Aggregate (component 7)(kg in a m^3 mixture)",
    "Age (day)",
    "Concrete compressive strength(MPa, megapascals) ",
];

/// Canonical column names, used for JSON and Parquet.
const COLUMNS: [&str; 9] = [
    "cement",
    "slag",
    "fly_ash",
    "water",
    "plasticizer",
    "coarse_aggregate",
    "fine_aggregate",
    "age",
    "strength",
];

const AGES: [i64; 5] = [3, 7, 28, 56, 90];

struct Row {
    mix: [f64; 7],
    age: i64,
    strength: f64,
}

/// Box-Muller transform for normal distribution
fn gauss(rng: &mut StdRng, mean: f64, std_dev: f64) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(1e-15);
    let u2: f64 = rng.gen();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    mean + std_dev * z
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn random_mix(rng: &mut StdRng) -> [f64; 7] {
    let cement = rng.gen_range(150.0..520.0);
    let slag = if rng.gen_bool(0.5) { rng.gen_range(0.0..250.0) } else { 0.0 };
    let fly_ash = if rng.gen_bool(0.4) { rng.gen_range(0.0..180.0) } else { 0.0 };
    let water = rng.gen_range(140.0..230.0);
    let plasticizer = if rng.gen_bool(0.6) { rng.gen_range(0.0..18.0) } else { 0.0 };
    let coarse = rng.gen_range(850.0..1120.0);
    let fine = rng.gen_range(600.0..920.0);
    [cement, slag, fly_ash, water, plasticizer, coarse, fine].map(round1)
}

/// Abrams-style strength: falls with water/binder ratio, rises with age.
fn strength(mix: &[f64; 7], age: i64, rng: &mut StdRng) -> f64 {
    let binder = mix[0] + 0.6 * mix[1] + 0.4 * mix[2];
    let wb = mix[3] / binder.max(1.0);
    let at_28 = 96.0 * (-1.6 * wb).exp() + 0.4 * mix[4];
    let maturity = (age as f64).ln() / 28f64.ln();
    let value = at_28 * maturity.clamp(0.35, 1.25) + gauss(rng, 0.0, 2.5);
    round1(value.max(2.0))
}

fn generate(rng: &mut StdRng, n_mixes: usize) -> Vec<Row> {
    let mut rows = Vec::new();
    for _ in 0..n_mixes {
        let mix = random_mix(rng);
        for &age in &AGES {
            if age != 28 && rng.gen_bool(0.5) {
                continue;
            }
            rows.push(Row { mix, age, strength: strength(&mix, age, rng) });
            // repeated casts of the same mix
            if age == 28 && rng.gen_bool(0.1) {
                rows.push(Row { mix, age, strength: strength(&mix, age, rng) });
            }
        }
    }
    rows
}

fn values(row: &Row) -> [f64; 9] {
    let m = row.mix;
    [m[0], m[1], m[2], m[3], m[4], m[5], m[6], row.age as f64, row.strength]
}

fn write_csv(rows: &[Row], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).context("creating CSV")?;
    writer.write_record(UCI_HEADERS)?;
    for row in rows {
        writer.write_record(values(row).iter().map(|v| v.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}

fn write_json(rows: &[Row], path: &Path) -> Result<()> {
    let records: Vec<serde_json::Value> = rows
        .iter()
        .map(|row| {
            let mut obj = serde_json::Map::new();
            for (name, v) in COLUMNS.iter().zip(values(row)) {
                obj.insert(name.to_string(), json!(v));
            }
            obj.insert("age".to_string(), json!(row.age));
            serde_json::Value::Object(obj)
        })
        .collect();
    let text = serde_json::to_string_pretty(&records)?;
    std::fs::write(path, text).context("writing JSON")?;
    Ok(())
}

fn write_parquet(rows: &[Row], path: &Path) -> Result<()> {
    let mut fields: Vec<Field> = COLUMNS[..7]
        .iter()
        .map(|name| Field::new(*name, DataType::Float64, false))
        .collect();
    fields.push(Field::new("age", DataType::Int64, false));
    fields.push(Field::new("strength", DataType::Float64, false));
    let schema = Arc::new(Schema::new(fields));

    let mut columns: Vec<arrow::array::ArrayRef> = (0..7)
        .map(|j| {
            let col: Float64Array = rows.iter().map(|r| r.mix[j]).collect::<Vec<_>>().into();
            Arc::new(col) as arrow::array::ArrayRef
        })
        .collect();
    columns.push(Arc::new(Int64Array::from(
        rows.iter().map(|r| r.age).collect::<Vec<_>>(),
    )));
    columns.push(Arc::new(Float64Array::from(
        rows.iter().map(|r| r.strength).collect::<Vec<_>>(),
    )));

    let batch = RecordBatch::try_new(schema.clone(), columns).context("building record batch")?;
    let file = std::fs::File::create(path).context("creating output file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating writer")?;
    writer.write(&batch).context("writing batch")?;
    writer.close().context("closing writer")?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let output_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("sample_concrete.csv"));

    let mut rng = StdRng::seed_from_u64(42);
    let rows = generate(&mut rng, 220);

    let ext = output_path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "csv" => write_csv(&rows, &output_path)?,
        "json" => write_json(&rows, &output_path)?,
        "parquet" | "pq" => write_parquet(&rows, &output_path)?,
        other => bail!("Unsupported output extension: .{other}"),
    }

    println!(
        "Wrote {} rows ({} at 28 days) to {}",
        rows.len(),
        rows.iter().filter(|r| r.age == 28).count(),
        output_path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

    fn sample_rows() -> Vec<Row> {
        let mut rng = StdRng::seed_from_u64(7);
        generate(&mut rng, 20)
    }

    #[test]
    fn every_mix_has_a_28_day_row() {
        let rows = sample_rows();
        assert!(rows.iter().filter(|r| r.age == 28).count() >= 20);
        assert!(rows.iter().all(|r| r.strength.is_finite() && r.strength > 0.0));
        assert!(rows.iter().all(|r| AGES.contains(&r.age)));
    }

    #[test]
    fn csv_uses_uci_headers() {
        let rows = sample_rows();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.csv");
        write_csv(&rows, &path).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), UCI_HEADERS.to_vec());
        assert_eq!(reader.records().count(), rows.len());
    }

    #[test]
    fn parquet_has_integer_age_column() {
        let rows = sample_rows();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.parquet");
        write_parquet(&rows, &path).unwrap();

        let file = std::fs::File::open(&path).unwrap();
        let builder = ParquetRecordBatchReaderBuilder::try_new(file).unwrap();
        let schema = builder.schema().clone();
        assert_eq!(schema.field_with_name("age").unwrap().data_type(), &DataType::Int64);
        let total: usize = builder.build().unwrap().map(|b| b.unwrap().num_rows()).sum();
        assert_eq!(total, rows.len());
    }

    #[test]
    fn json_records_carry_canonical_names() {
        let rows = sample_rows();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.json");
        write_json(&rows, &path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let records = value.as_array().unwrap();
        assert_eq!(records.len(), rows.len());
        for name in COLUMNS {
            assert!(records[0].get(name).is_some(), "missing {name}");
        }
        assert!(records[0]["age"].is_i64());
    }
}
