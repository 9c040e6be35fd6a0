use anyhow::{Context, Result};
use clap::Parser;
use lfca::io::write_matrix;
use lfca::simulation::SyntheticField;
use nalgebra::DMatrix;
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "generate_field")]
#[command(about = "Generate synthetic fields with a known slow signal for LFCA testing")]
struct Args {
    /// TOML field configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output directory
    #[arg(short, long, default_value = "data/synthetic")]
    output_dir: PathBuf,

    /// Number of realizations
    #[arg(short = 'n', long, default_value_t = 1)]
    realizations: u32,

    /// Base seed for reproducibility
    #[arg(short, long)]
    seed: Option<u64>,

    /// Time steps (CLI override)
    #[arg(long)]
    time_steps: Option<usize>,

    /// Grid points (CLI override)
    #[arg(long)]
    points: Option<usize>,

    /// Signal period in time steps (CLI override)
    #[arg(long)]
    period: Option<f64>,

    /// Noise standard deviation (CLI override)
    #[arg(long)]
    noise_std: Option<f64>,

    /// Load the signal identically onto every point
    #[arg(long)]
    uniform_loading: bool,

    /// Field delimiter
    #[arg(short, long, default_value_t = ',')]
    delimiter: char,

    /// Output filename prefix
    #[arg(long, default_value = "field")]
    prefix: String,

    /// Generate manifest.json
    #[arg(long)]
    manifest: bool,
}

#[derive(Debug, serde::Serialize)]
struct ManifestEntry {
    file: String,
    signal_file: String,
    realization: u32,
    seed: u64,
}

#[derive(Debug, serde::Serialize)]
struct Manifest {
    time_steps: usize,
    points: usize,
    period: f64,
    amplitude: f64,
    noise_std: f64,
    trend: f64,
    persistence: f64,
    uniform_loading: bool,
    files: Vec<ManifestEntry>,
}

fn load_field_config(path: &PathBuf) -> Result<SyntheticField> {
    let content = fs::read_to_string(path).context("Failed to read config file")?;
    toml::from_str(&content).context("Failed to parse config file")
}

fn build_field(base: &SyntheticField, args: &Args) -> SyntheticField {
    let mut field = base.clone();
    if let Some(time_steps) = args.time_steps {
        field.time_steps = time_steps;
    }
    if let Some(points) = args.points {
        field.points = points;
    }
    if let Some(period) = args.period {
        field.period = period;
    }
    if let Some(noise_std) = args.noise_std {
        field.noise_std = noise_std;
    }
    if args.uniform_loading {
        field.uniform_loading = true;
    }
    field
}

/// Seed of one realization; wraps around instead of overflowing
fn realization_seed(base_seed: u64, realization: u32) -> u64 {
    base_seed.wrapping_add(u64::from(realization))
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    fs::create_dir_all(&args.output_dir).context("Failed to create output directory")?;

    let base = if let Some(ref config_path) = args.config {
        load_field_config(config_path)?
    } else {
        SyntheticField::default()
    };
    let field = build_field(&base, &args);
    let base_seed = args.seed.or(field.seed).unwrap_or(0);

    let mut manifest_entries = Vec::new();
    for realization in 0..args.realizations {
        let seed = realization_seed(base_seed, realization);
        let (x, signal) = field
            .clone()
            .with_seed(seed)
            .generate()
            .context("Failed to generate field")?;

        let filename = format!("{}_r{:03}.csv", args.prefix, realization);
        let signal_filename = format!("{}_r{:03}_signal.csv", args.prefix, realization);
        write_matrix(args.output_dir.join(&filename), &x, args.delimiter)
            .context("Failed to write field")?;
        write_matrix(
            args.output_dir.join(&signal_filename),
            &DMatrix::from_column_slice(signal.len(), 1, &signal),
            args.delimiter,
        )
        .context("Failed to write signal")?;

        manifest_entries.push(ManifestEntry {
            file: filename,
            signal_file: signal_filename,
            realization,
            seed,
        });
        eprint!("\rGenerating: {}/{}", realization + 1, args.realizations);
    }
    eprintln!();

    if args.manifest {
        let manifest = Manifest {
            time_steps: field.time_steps,
            points: field.points,
            period: field.period,
            amplitude: field.amplitude,
            noise_std: field.noise_std,
            trend: field.trend,
            persistence: field.persistence,
            uniform_loading: field.uniform_loading,
            files: manifest_entries,
        };
        let manifest_path = args.output_dir.join("manifest.json");
        let manifest_json =
            serde_json::to_string_pretty(&manifest).context("Failed to serialize manifest")?;
        fs::write(&manifest_path, manifest_json).context("Failed to write manifest")?;
        eprintln!("Manifest written to: {}", manifest_path.display());
    }

    eprintln!(
        "Generated {} fields in {}",
        args.realizations,
        args.output_dir.display()
    );
    Ok(())
}
