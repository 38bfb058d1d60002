use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Date32Array, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Date32Type, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{Days, NaiveDate};
use parquet::arrow::ArrowWriter;

const CLAIM_ROWS: usize = 500;
const SALE_ROWS: usize = 365;

const REGIONS: [&str; 4] = ["North", "South", "East", "West"];
const POLICY_TYPES: [&str; 3] = ["Basic", "Standard", "Premium"];
const VEHICLE_TYPES: [&str; 4] = ["Car", "SUV", "Truck", "Motorcycle"];
const GENDERS: [&str; 2] = ["Female", "Male"];
const STATUSES: [&str; 3] = ["Approved", "Pending", "Denied"];
const PRODUCTS: [&str; 3] = ["Widget", "Gadget", "Gizmo"];

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

    fn below(&mut self, n: u64) -> u64 {
        self.next_u64() % n
    }

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[self.below(items.len() as u64) as usize]
    }
}

struct Claim {
    date: NaiveDate,
    region: &'static str,
    policy_type: &'static str,
    vehicle_type: &'static str,
    gender: &'static str,
    status: &'static str,
    amount: f64,
    customer_age: i64,
    previous_claims: i64,
}

fn generate_claims(rng: &mut SimpleRng, start: NaiveDate) -> Vec<Claim> {
    (0..CLAIM_ROWS)
        .map(|_| {
            let policy_type = rng.pick(&POLICY_TYPES);
            let base = match policy_type {
                "Premium" => 4_000.0,
                "Standard" => 2_500.0,
                _ => 1_500.0,
            };
            let previous_claims = rng.below(5) as i64;
            Claim {
                date: start + Days::new(rng.below(365)),
                region: rng.pick(&REGIONS),
                policy_type,
                vehicle_type: rng.pick(&VEHICLE_TYPES),
                gender: rng.pick(&GENDERS),
                status: rng.pick(&STATUSES),
                amount: round_cents(rng.gauss(base, base * 0.35).max(100.0)),
                customer_age: 18 + rng.below(60) as i64,
                previous_claims,
            }
        })
        .collect()
}

fn round_cents(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn write_claims_csv(path: &Path, claims: &[Claim]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    writer.write_record([
        "Date",
        "Region",
        "Policy Type",
        "Vehicle Type",
        "Gender",
        "Claim Status",
        "Claim Amount",
        "Customer Age",
        "Previous Claims",
    ])?;
    for c in claims {
        writer.write_record([
            c.date.format("%Y-%m-%d").to_string(),
            c.region.to_string(),
            c.policy_type.to_string(),
            c.vehicle_type.to_string(),
            c.gender.to_string(),
            c.status.to_string(),
            format!("{:.2}", c.amount),
            c.customer_age.to_string(),
            c.previous_claims.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_claims_parquet(path: &Path, claims: &[Claim]) -> Result<()> {
    let strings = |f: fn(&Claim) -> &'static str| {
        StringArray::from(claims.iter().map(f).collect::<Vec<_>>())
    };

    let schema = Arc::new(Schema::new(vec![
        Field::new("Date", DataType::Date32, false),
        Field::new("Region", DataType::Utf8, false),
        Field::new("Policy Type", DataType::Utf8, false),
        Field::new("Vehicle Type", DataType::Utf8, false),
        Field::new("Gender", DataType::Utf8, false),
        Field::new("Claim Status", DataType::Utf8, false),
        Field::new("Claim Amount", DataType::Float64, false),
        Field::new("Customer Age", DataType::Int64, false),
        Field::new("Previous Claims", DataType::Int64, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Date32Array::from(
                claims
                    .iter()
                    .map(|c| Date32Type::from_naive_date(c.date))
                    .collect::<Vec<_>>(),
            )),
            Arc::new(strings(|c| c.region)),
            Arc::new(strings(|c| c.policy_type)),
            Arc::new(strings(|c| c.vehicle_type)),
            Arc::new(strings(|c| c.gender)),
            Arc::new(strings(|c| c.status)),
            Arc::new(Float64Array::from(
                claims.iter().map(|c| c.amount).collect::<Vec<_>>(),
            )),
            Arc::new(Int64Array::from(
                claims.iter().map(|c| c.customer_age).collect::<Vec<_>>(),
            )),
            Arc::new(Int64Array::from(
                claims.iter().map(|c| c.previous_claims).collect::<Vec<_>>(),
            )),
        ],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn write_sales_csv(path: &Path, rng: &mut SimpleRng, start: NaiveDate) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    writer.write_record(["Date", "Region", "Product", "Sales Amount"])?;
    for day in 0..SALE_ROWS as u64 {
        let date = start + Days::new(day);
        // Slow upward trend plus noise.
        let amount = rng.gauss(800.0 + day as f64 * 1.5, 150.0).max(50.0);
        writer.write_record([
            date.format("%Y-%m-%d").to_string(),
            rng.pick(&REGIONS).to_string(),
            rng.pick(&PRODUCTS).to_string(),
            format!("{:.2}", amount),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let dir = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;

    let mut rng = SimpleRng::new(42);
    let start = NaiveDate::from_ymd_opt(2023, 1, 1).context("invalid start date")?;

    let claims = generate_claims(&mut rng, start);
    let claims_csv = dir.join("insurance_claims_data.csv");
    write_claims_csv(&claims_csv, &claims)?;
    let claims_parquet = dir.join("insurance_claims_data.parquet");
    write_claims_parquet(&claims_parquet, &claims)?;

    let sales_csv = dir.join("sales_data.csv");
    write_sales_csv(&sales_csv, &mut rng, start)?;

    log::info!("Sample data written to {}", dir.display());
    println!(
        "Wrote {} claims to {} and {}, {} sales to {}",
        claims.len(),
        claims_csv.display(),
        claims_parquet.display(),
        SALE_ROWS,
        sales_csv.display()
    );
    Ok(())
}
