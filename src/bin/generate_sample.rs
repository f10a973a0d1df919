//! Write a synthetic kitchen P&L extract for trying the dashboard:
//! `sample_kitchen_pnl.parquet` (header from the schema) and
//! `sample_kitchen_pnl.csv` (title line first, so open it with `--header-row 1`).

use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// One generated row, in column order.
struct Row {
    store: String,
    month: String,
    cm_cohort: &'static str,
    ebitda_category: &'static str,
    ebitda_cohort: &'static str,
    revenue_cohort: &'static str,
    gross_margin: f64,
    net_revenue: f64,
    kitchen_ebitda: f64,
}

const COLUMNS: [&str; 9] = [
    "Store",
    "Month",
    "CM Cohort",
    "EBITDA Category",
    "EBITDA Cohort",
    "Revenue Cohort",
    "Gross Margin",
    "Net Revenue",
    "Kitchen EBITDA",
];

fn cohort(value: f64, cuts: [f64; 2], labels: [&'static str; 3]) -> &'static str {
    if value < cuts[0] {
        labels[0]
    } else if value < cuts[1] {
        labels[1]
    } else {
        labels[2]
    }
}

fn generate(rng: &mut SimpleRng) -> Vec<Row> {
    let mut rows = Vec::new();
    for s in 1..=12 {
        // Each store has its own scale and margin profile.
        let base_revenue = rng.gauss(900_000.0, 250_000.0).max(200_000.0);
        let margin_pct = rng.gauss(0.62, 0.05).clamp(0.4, 0.8);
        let ebitda_pct = rng.gauss(0.08, 0.07);

        for m in 1..=12 {
            let seasonal = 1.0 + 0.1 * ((m as f64 / 12.0) * std::f64::consts::TAU).sin();
            let net_revenue = (base_revenue * seasonal * rng.gauss(1.0, 0.05)).round();
            let gross_margin = (net_revenue * margin_pct).round();
            let kitchen_ebitda = (net_revenue * (ebitda_pct + rng.gauss(0.0, 0.02))).round();
            let cm_pct = gross_margin / net_revenue;
            let ebitda_ratio = kitchen_ebitda / net_revenue;

            rows.push(Row {
                store: format!("Store {s:02}"),
                month: format!("2024-{m:02}-01"),
                cm_cohort: cohort(cm_pct, [0.55, 0.65], ["CM <55%", "CM 55-65%", "CM >65%"]),
                ebitda_category: if kitchen_ebitda >= 0.0 { "Positive" } else { "Negative" },
                ebitda_cohort: cohort(
                    ebitda_ratio,
                    [0.0, 0.1],
                    ["EBITDA <0%", "EBITDA 0-10%", "EBITDA >10%"],
                ),
                revenue_cohort: cohort(
                    net_revenue,
                    [600_000.0, 1_000_000.0],
                    ["<6L", "6-10L", ">10L"],
                ),
                gross_margin,
                net_revenue,
                kitchen_ebitda,
            });
        }
    }
    rows
}

fn write_parquet(rows: &[Row], path: &str) -> Result<()> {
    let text = |f: fn(&Row) -> &str| -> ArrayRef {
        Arc::new(StringArray::from(rows.iter().map(f).collect::<Vec<_>>()))
    };
    let number = |f: fn(&Row) -> f64| -> ArrayRef {
        Arc::new(Float64Array::from(rows.iter().map(f).collect::<Vec<_>>()))
    };

    let fields: Vec<Field> = COLUMNS
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let dt = if i < 6 { DataType::Utf8 } else { DataType::Float64 };
            Field::new(*name, dt, false)
        })
        .collect();
    let schema = Arc::new(Schema::new(fields));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            text(|r| r.store.as_str()),
            text(|r| r.month.as_str()),
            text(|r| r.cm_cohort),
            text(|r| r.ebitda_category),
            text(|r| r.ebitda_cohort),
            text(|r| r.revenue_cohort),
            number(|r| r.gross_margin),
            number(|r| r.net_revenue),
            number(|r| r.kitchen_ebitda),
        ],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path).with_context(|| format!("creating {path}"))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating writer")?;
    writer.write(&batch).context("writing batch")?;
    writer.close().context("closing writer")?;
    Ok(())
}

fn write_csv(rows: &[Row], path: &str) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("creating {path}"))?;
    writer.write_record(["Kitchen P&L - FY2024"])?;
    writer.write_record(COLUMNS)?;
    for r in rows {
        writer.write_record([
            r.store.clone(),
            r.month.clone(),
            r.cm_cohort.to_string(),
            r.ebitda_category.to_string(),
            r.ebitda_cohort.to_string(),
            r.revenue_cohort.to_string(),
            r.gross_margin.to_string(),
            r.net_revenue.to_string(),
            r.kitchen_ebitda.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);
    let rows = generate(&mut rng);

    write_parquet(&rows, "sample_kitchen_pnl.parquet")?;
    write_csv(&rows, "sample_kitchen_pnl.csv")?;

    println!(
        "Wrote {} rows to sample_kitchen_pnl.parquet and sample_kitchen_pnl.csv",
        rows.len()
    );
    Ok(())
}
