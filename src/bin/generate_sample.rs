use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use yieldscope::config::ColumnMap;
use yieldscope::data::model::YieldType;
use yieldscope::physics::{DetectorProfile, ParametricNrModel, YieldModel};

/// One synthetic experiment: a name, its display label and the drift fields
/// it was measured at.
struct Experiment {
    name: &'static str,
    label: &'static str,
    fields: &'static [f64],
    /// Relative scatter of the measured yield.
    scatter: f64,
}

const EXPERIMENTS: &[Experiment] = &[
    Experiment {
        name: "Synthetic_A",
        label: "Synthetic A 2026",
        fields: &[190.0, 730.0],
        scatter: 0.05,
    },
    Experiment {
        name: "Synthetic_B",
        label: "Synthetic B 2026",
        fields: &[100.0, 500.0, 2000.0],
        scatter: 0.08,
    },
];

/// Long-format rows of one source table.
#[derive(Default)]
struct Table {
    field: Vec<f64>,
    name: Vec<String>,
    energy: Vec<f64>,
    yields: Vec<f64>,
    error: Vec<Option<f64>>,
    corrected: Vec<f64>,
    y_plus: Vec<f64>,
    y_minus: Vec<f64>,
}

fn generate(model: &dyn YieldModel, yield_type: YieldType, rng: &mut SimpleRng) -> Table {
    let energies = [1.5, 3.0, 5.0, 8.0, 12.0, 20.0, 35.0, 60.0];
    let mut t = Table::default();

    for exp in EXPERIMENTS {
        for &field in exp.fields {
            for (i, &e) in energies.iter().enumerate() {
                let q = model.nuclear_recoil(e, field);
                let truth = match yield_type {
                    YieldType::Charge => q.electrons,
                    YieldType::Light => q.photons,
                } / e;
                let sigma = exp.scatter * truth;
                let measured = truth + rng.gauss(0.0, sigma);

                t.field.push(field);
                // The second row of a group carries the display label.
                let name = if i == 1 { exp.label } else { exp.name };
                t.name.push(name.to_string());
                t.energy.push(e);
                t.yields.push(measured);
                // Every fourth sample has no quoted error.
                t.error.push((i % 4 != 3).then_some(sigma));
                t.corrected.push(e * (1.0 + rng.gauss(0.0, 0.01)));
                t.y_plus.push(measured + 1.5 * sigma);
                t.y_minus.push(measured - 1.5 * sigma);
            }
        }
    }
    t
}

fn write_csv(path: &str, cols: &ColumnMap, t: &Table) -> Result<()> {
    let mut w = csv::Writer::from_path(path).with_context(|| format!("creating {path}"))?;
    w.write_record([
        cols.field.as_str(),
        cols.name.as_str(),
        cols.recoil_energy.as_str(),
        cols.charge_yield.as_str(),
        cols.recoil_error.as_str(),
        cols.corrected_energy.as_str(),
        cols.drift_field_error.as_str(),
    ])?;
    for i in 0..t.field.len() {
        w.write_record([
            t.field[i].to_string(),
            t.name[i].clone(),
            t.energy[i].to_string(),
            format!("{:.4}", t.yields[i]),
            t.error[i].map(|e| format!("{e:.4}")).unwrap_or_default(),
            format!("{:.4}", t.corrected[i]),
            format!("{:.1}", 0.05 * t.field[i]),
        ])?;
    }
    w.flush()?;
    Ok(())
}

fn write_parquet(path: &str, cols: &ColumnMap, t: &Table) -> Result<()> {
    let float = |name: &str| Field::new(name, DataType::Float64, false);
    let schema = Arc::new(Schema::new(vec![
        float(&cols.field),
        Field::new(&cols.name, DataType::Utf8, false),
        float(&cols.recoil_energy),
        float(&cols.light_yield),
        Field::new(&cols.recoil_error, DataType::Float64, true),
        float(&cols.corrected_energy),
        float(&cols.max_yield),
        float(&cols.min_yield),
    ]));

    let columns: Vec<ArrayRef> = vec![
        Arc::new(Float64Array::from(t.field.clone())),
        Arc::new(StringArray::from(t.name.clone())),
        Arc::new(Float64Array::from(t.energy.clone())),
        Arc::new(Float64Array::from(t.yields.clone())),
        Arc::new(Float64Array::from(t.error.clone())),
        Arc::new(Float64Array::from(t.corrected.clone())),
        Arc::new(Float64Array::from(t.y_plus.clone())),
        Arc::new(Float64Array::from(t.y_minus.clone())),
    ];
    let batch = RecordBatch::try_new(schema.clone(), columns)?;

    let file = std::fs::File::create(path).with_context(|| format!("creating {path}"))?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

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

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);
    let model = ParametricNrModel::new(DetectorProfile::xenon10());
    let cols = ColumnMap::default();

    let charge = generate(&model, YieldType::Charge, &mut rng);
    write_csv("sample_qy.csv", &cols, &charge)?;
    println!("Wrote {} charge yield rows to sample_qy.csv", charge.field.len());

    let light = generate(&model, YieldType::Light, &mut rng);
    write_parquet("sample_ly.parquet", &cols, &light)?;
    println!("Wrote {} light yield rows to sample_ly.parquet", light.field.len());

    Ok(())
}
