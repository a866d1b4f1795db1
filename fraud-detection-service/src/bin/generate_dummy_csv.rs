use anyhow::{Context, Result};
use clap::Parser;
use fraud_model::sample;
use rand::{SeedableRng, rngs::StdRng};
use std::fs::File;
use std::path::PathBuf;

/// Write randomly generated, schema-valid claims to a CSV file.
#[derive(Parser, Debug)]
#[command(name = "generate_dummy_csv")]
struct Args {
    /// Number of claim rows to generate
    #[arg(short, long, default_value_t = 10)]
    rows: usize,

    /// Output CSV path
    #[arg(short, long, default_value = "dummy_data.csv")]
    output: PathBuf,

    /// Seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let claims = sample::generate_claims(&mut rng, args.rows);

    let file = File::create(&args.output)
        .with_context(|| format!("failed to create {}", args.output.display()))?;
    sample::write_csv(file, &claims)?;

    println!("Dummy data created at {}", args.output.display());
    Ok(())
}
