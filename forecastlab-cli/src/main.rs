//! ForecastLab CLI: run a forecast pipeline from a TOML config file.
//!
//! Commands:
//! - `run`: evaluate every instrument on CSV or synthetic data and print
//!   summary statistics (or the full JSON summary)
//! - `check`: validate a config file and print its fingerprint

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use forecastlab_core::DataSource;
use forecastlab_runner::{
    config_fingerprint, run_instruments, synthetic_data, ConfigFile, CsvDataSource,
    PipelineBuilder, RunSummary,
};

#[derive(Parser)]
#[command(
    name = "forecastlab",
    about = "ForecastLab CLI: staged forecasting and backtest pipeline"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline for every configured instrument.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Directory of <CODE>_price.csv / <CODE>_carry.csv files.
        #[arg(long, conflicts_with = "synthetic")]
        data_dir: Option<PathBuf>,

        /// Use deterministic synthetic data instead of CSV files.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Restrict the run to these instruments (repeatable).
        #[arg(long = "instrument")]
        instruments: Vec<String>,

        /// Start date (YYYY-MM-DD). Overrides the config file.
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD). Overrides the config file.
        #[arg(long)]
        end: Option<String>,

        /// Evaluate instruments one at a time.
        #[arg(long, default_value_t = false)]
        sequential: bool,

        /// Print the full run summary as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Validate a config file and print its fingerprint.
    Check {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            data_dir,
            synthetic,
            instruments,
            start,
            end,
            sequential,
            json,
        } => run_cmd(RunArgs {
            config,
            data_dir,
            synthetic,
            instruments,
            start,
            end,
            parallel: !sequential,
            json,
        }),
        Commands::Check { config } => check_cmd(config),
    }
}

struct RunArgs {
    config: PathBuf,
    data_dir: Option<PathBuf>,
    synthetic: bool,
    instruments: Vec<String>,
    start: Option<String>,
    end: Option<String>,
    parallel: bool,
    json: bool,
}

fn parse_date(s: Option<&str>, flag: &str) -> Result<Option<NaiveDate>> {
    s.map(|s| {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("{flag} expects YYYY-MM-DD, got '{s}'"))
    })
    .transpose()
}

fn run_cmd(args: RunArgs) -> Result<()> {
    let mut file = ConfigFile::from_file(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    if !args.instruments.is_empty() {
        file.restrict_instruments(&args.instruments);
    }

    let start = parse_date(args.start.as_deref(), "--start")?.or(file.system.start_date);
    let end = parse_date(args.end.as_deref(), "--end")?.or(file.system.end_date);

    let data: Arc<dyn DataSource> = match (args.data_dir, args.synthetic) {
        (Some(dir), false) => {
            if !dir.is_dir() {
                bail!("data directory {} does not exist", dir.display());
            }
            Arc::new(CsvDataSource::new(dir))
        }
        (None, true) => {
            let today = chrono::Local::now().date_naive();
            let end = end.unwrap_or(today);
            let start = start.unwrap_or(end - chrono::Duration::days(365 * 10));
            info!(%start, %end, "generating synthetic data");
            Arc::new(synthetic_data(&file.system.instruments, start, end))
        }
        (Some(_), true) => bail!("--data-dir and --synthetic are mutually exclusive"),
        (None, false) => bail!("one of --data-dir or --synthetic is required"),
    };

    let system = PipelineBuilder::from_config_file(&file)
        .dates(start, end)
        .shared_data(data)
        .build()?;
    let summary = run_instruments(&system, args.parallel)?;

    if args.json {
        println!("{}", summary.to_json()?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

fn check_cmd(config_path: PathBuf) -> Result<()> {
    let file = ConfigFile::from_file(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    let rules: Vec<String> = file.rules.keys().cloned().collect();
    let config = file.into_config()?;

    println!("Config:       {}", config_path.display());
    println!("Instruments:  {}", config.instruments.join(", "));
    println!("Rules:        {}", rules.join(", "));
    println!("Fingerprint:  {}", config_fingerprint(&config));
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!("=== Run Summary ===");
    println!("Data:           {}", summary.data_source);
    println!(
        "Capital:        {:.0} {}",
        summary.capital, summary.base_currency
    );
    println!("Fingerprint:    {}", &summary.config_fingerprint[..16]);
    println!();
    println!(
        "{:<10} {:>10} {:>12} {:>10} {:>8} {:>10} {:>10}",
        "Instrument", "Weight", "Days", "Total %", "Sharpe", "MaxDD %", "Position"
    );
    for inst in &summary.instruments {
        println!(
            "{:<10} {:>10.3} {:>12} {:>10.2} {:>8.3} {:>10.2} {:>10}",
            inst.instrument,
            inst.instrument_weight,
            inst.observations,
            inst.stats.total,
            inst.stats.sharpe,
            inst.stats.max_drawdown,
            inst.final_position
                .map(|p| format!("{p:.2}"))
                .unwrap_or_else(|| "-".into()),
        );
        for (rule, stats) in &inst.rules {
            println!(
                "  {:<20} {:>23.2} {:>8.3} {:>10.2}",
                rule, stats.total, stats.sharpe, stats.max_drawdown
            );
        }
    }
    println!();
    println!("--- Portfolio ---");
    println!("Total Return:   {:.2}%", summary.portfolio.total);
    println!("Ann. Return:    {:.2}%", summary.portfolio.ann_mean);
    println!("Ann. Vol:       {:.2}%", summary.portfolio.ann_std);
    println!("Sharpe:         {:.3}", summary.portfolio.sharpe);
    println!("Max Drawdown:   {:.2}%", summary.portfolio.max_drawdown);
    println!("Hit Rate:       {:.1}%", summary.portfolio.hit_rate * 100.0);
    println!(
        "Cache:          {} entries, {} hits, {} misses",
        summary.cache.entries, summary.cache.hits, summary.cache.misses
    );
    println!();
}
