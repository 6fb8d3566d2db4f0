use std::path::PathBuf;

use anyhow::{Context, Result};
use matdash::data::format::TableFormat;
use matdash::data::{Column, Dataset, Record};

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

    /// Leave a cell empty now and then, like hand-entered data.
    fn maybe(&mut self, v: f64) -> Option<f64> {
        (self.next_f64() > 0.1).then_some(v)
    }
}

/// Particle name, mean diameter (nm), aspect ratio.
const PARTICLES: [(&str, f64, f64); 5] = [
    ("SiO2", 50.0, 1.0),
    ("Au nanorod", 40.0, 3.5),
    ("PEG-PLGA", 120.0, 1.1),
    ("Liposome", 150.0, 1.0),
    ("Dextran", 8.0, 1.0),
];

const MESH_SIZES: [f64; 3] = [20.0, 60.0, 200.0];

/// Stokes-Einstein-like diffusivity hindered by the polymer mesh.
fn diffusivity(size_nm: f64, mesh_nm: f64) -> f64 {
    let free = 4.3e-10 / size_nm.max(0.1);
    free * (-(size_nm / mesh_nm)).exp()
}

fn main() -> Result<()> {
    env_logger::init();

    let output_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("sample_data.xlsx"));
    let format = TableFormat::from_path(&output_path)
        .with_context(|| format!("unsupported output file {}", output_path.display()))?;

    let mut rng = SimpleRng::new(42);
    let mut dataset = Dataset::with_columns(Column::CANONICAL);
    dataset.extend_schema(Column::Selectivity);

    for (i, &(name, mean_size, aspect)) in PARTICLES.iter().enumerate() {
        for &mesh in &MESH_SIZES {
            for rep in 0..3 {
                let size = rng.gauss(mean_size, mean_size * 0.1).max(1.0);
                let d = diffusivity(size, mesh);
                let aspect_ratio = rng.gauss(aspect, 0.05 * aspect).max(1.0);
                let specificity = rng.next_f64();
                let selectivity = rng.next_f64();
                let record = Record {
                    particle_used: Some(name.to_string()),
                    particle_size: Some(size),
                    aspect_ratio: rng.maybe(aspect_ratio),
                    // m²/s scaled to µm²/s so five decimals stay meaningful
                    diffusivity: Some(d * 1e12),
                    permeability: rng.maybe((mesh * mesh / 8.0) * 1e-3),
                    polymer_mesh_size: Some(mesh),
                    specificity: rng.maybe(specificity),
                    selectivity: rng.maybe(selectivity),
                    paper_doi: Some(format!("10.5555/sample.{}.{}", i + 1, rep + 1)),
                };
                dataset.push(record).context("sample record outside schema")?;
            }
        }
    }

    let bytes = format.encode(&dataset)?;
    std::fs::write(&output_path, bytes)
        .with_context(|| format!("writing {}", output_path.display()))?;

    println!(
        "Wrote {} records ({} columns) to {}",
        dataset.len(),
        dataset.columns().len(),
        output_path.display()
    );
    Ok(())
}
