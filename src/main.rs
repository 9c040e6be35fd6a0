use anyhow::{Context, Result, bail};
use clap::Parser;
use nalgebra::DMatrix;
use rolling_stats::Stats;
use std::fs;
use std::path::PathBuf;

use lfca::config::{EofMethod, FilterKind, LfcaConfig, PaddingKind};
use lfca::grid::{SpatialMask, area_weights};
use lfca::io::{LfcaReport, read_matrix, read_vector, write_matrix};
use lfca::{Lfca, LowFrequencyResult};

#[derive(Parser, Debug)]
#[command(name = "lfca")]
#[command(about = "Low-frequency component analysis of a gridded time series", long_about = None)]
struct Args {
    /// Data matrix: one row per time step, one column per grid point
    data: PathBuf,

    /// Weight per grid point (single row or column)
    #[arg(short, long, conflicts_with = "latitudes")]
    weights: Option<PathBuf>,

    /// Latitude in degrees per grid row; weights become cos(latitude)
    #[arg(long, requires = "nlon")]
    latitudes: Option<PathBuf>,

    /// Longitudes per grid row, used with --latitudes
    #[arg(long)]
    nlon: Option<usize>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Cutoff period in time steps
    #[arg(long)]
    cutoff: Option<usize>,

    /// Number of EOFs retained
    #[arg(short, long)]
    truncation: Option<usize>,

    /// Low-pass filter family
    #[arg(long, value_enum)]
    filter: Option<FilterKind>,

    /// Edge padding
    #[arg(long, value_enum)]
    padding: Option<PaddingKind>,

    /// Remove a polynomial trend before filtering each component
    #[arg(long)]
    detrend: bool,

    /// Degree of the removed trend
    #[arg(long)]
    detrend_degree: Option<usize>,

    /// EOF solver
    #[arg(long, value_enum)]
    eof_method: Option<EofMethod>,

    /// Field delimiter of the input and output text files
    #[arg(short, long, default_value_t = ',')]
    delimiter: char,

    /// Output directory
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "csv")]
    format: OutputFormat,

    /// Also write the forced response reconstructed from the leading N components
    #[arg(long)]
    forced: Option<usize>,

    /// Increase output verbosity
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Csv,
    Json,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let config = build_config(&args)?;
    log::info!(
        "cutoff {}, truncation {}, filter {} ({} padding), EOF method {}",
        config.cutoff,
        config.truncation,
        config.filter.kind,
        config.filter.padding,
        config.eof_method
    );

    let x = read_matrix(&args.data, args.delimiter)
        .with_context(|| format!("reading data from {}", args.data.display()))?;
    let weights = load_weights(&args, x.ncols())?;

    let mask = SpatialMask::from_matrix(&x);
    if mask.valid_count() < mask.width() {
        log::warn!(
            "Masking {} of {} grid points with missing values",
            mask.width() - mask.valid_count(),
            mask.width()
        );
    }
    if mask.valid_count() == 0 {
        bail!("every grid point has missing values");
    }
    let x_valid = mask.compress(&x)?;
    let weights_valid = mask.compress_weights(&weights)?;

    let engine = Lfca::new(config.clone())?;
    let result = engine
        .analyze(&x_valid, &weights_valid)
        .context("running LFCA")?;

    let lfps = mask.expand(&result.lfps)?;
    let forced = match args.forced {
        Some(n) => Some(
            mask.expand(
                &result
                    .leading_forced_response(n)
                    .context("reconstructing forced response")?,
            )?,
        ),
        None => None,
    };

    fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("creating {}", args.output_dir.display()))?;
    match args.format {
        OutputFormat::Csv => write_csv(&args, &result, &lfps, forced.as_ref())?,
        OutputFormat::Json => {
            let path = args.output_dir.join("lfca.json");
            LfcaReport::new(&config, &result, Some(&lfps), forced.as_ref())
                .write_json(&path)
                .with_context(|| format!("writing {}", path.display()))?;
        }
    }

    print_summary(&result, args.verbose > 0);
    Ok(())
}

/// Defaults, then the TOML file, then command-line flags.
fn build_config(args: &Args) -> Result<LfcaConfig> {
    let mut config = match &args.config {
        Some(path) => LfcaConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => LfcaConfig::default(),
    };

    if let Some(cutoff) = args.cutoff {
        config.cutoff = cutoff;
    }
    if let Some(truncation) = args.truncation {
        config.truncation = truncation;
    }
    if let Some(kind) = args.filter {
        config.filter.kind = kind;
    }
    if let Some(padding) = args.padding {
        config.filter.padding = padding;
    }
    if args.detrend {
        config.filter.detrend = true;
    }
    if let Some(degree) = args.detrend_degree {
        config.filter.detrend_degree = degree;
    }
    if let Some(method) = args.eof_method {
        config.eof_method = method;
    }

    config.validate()?;
    Ok(config)
}

fn load_weights(args: &Args, points: usize) -> Result<Vec<f64>> {
    let weights = if let Some(path) = &args.weights {
        read_vector(path, args.delimiter)
            .with_context(|| format!("reading weights from {}", path.display()))?
    } else if let Some(path) = &args.latitudes {
        let lats = read_vector(path, args.delimiter)
            .with_context(|| format!("reading latitudes from {}", path.display()))?;
        let nlon = args.nlon.context("--latitudes needs --nlon")?;
        area_weights(&lats, nlon)
    } else {
        vec![1.0; points]
    };

    if weights.len() != points {
        bail!(
            "{} weights for {} grid points (columns are flattened latitude-major)",
            weights.len(),
            points
        );
    }
    Ok(weights)
}

fn write_csv(
    args: &Args,
    result: &LowFrequencyResult,
    lfps: &DMatrix<f64>,
    forced: Option<&DMatrix<f64>>,
) -> Result<()> {
    let mut outputs = vec![("lfc.csv", &result.lfcs), ("lfp.csv", lfps)];
    if let Some(forced) = forced {
        outputs.push(("forced.csv", forced));
    }
    for (name, matrix) in outputs {
        let path = args.output_dir.join(name);
        write_matrix(&path, matrix, args.delimiter)
            .with_context(|| format!("writing {}", path.display()))?;
        log::info!("Wrote {}", path.display());
    }
    Ok(())
}

fn print_summary(result: &LowFrequencyResult, verbose: bool) {
    println!(
        "{} components from {} time steps x {} points",
        result.num_components(),
        result.num_time_steps(),
        result.num_points()
    );
    println!("{:>4} {:>10} {:>14}", "LFC", "ratio", "EOF variance");
    for (j, (ratio, variance)) in result.ratios.iter().zip(&result.eof_variances).enumerate() {
        println!("{:>4} {:>10.4} {:>14.4e}", j, ratio, variance);
    }

    if verbose {
        eprintln!();
        for j in 0..result.num_components() {
            let mut stats: Stats<f64> = Stats::new();
            for v in result.lfc(j).iter() {
                stats.update(*v);
            }
            eprintln!(
                "LFC {}: mean {:.3} std {:.3} range [{:.3}, {:.3}]",
                j, stats.mean, stats.std_dev, stats.min, stats.max
            );
        }
    }
}
