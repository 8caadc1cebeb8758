//! I/O latency microbenchmark CLI.
//!
//! Glue around the core: argument parsing and validation, test-file
//! provisioning, logging setup, then one measurement pass followed by the
//! summary line on stdout and the raw sample logs on disk. Diagnostics go
//! to stderr so stdout carries exactly one line per invocation.

#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use iolat::config::{Mode, RunConfig, SkipArg, parse_size, parse_skip};
use iolat::measure::device::AlignedBuf;
use iolat::measure::entropy::UrandomSource;
use iolat::{measure, provision, report, stats};

#[derive(Parser)]
#[command(name = "iolat", about = "Raw block-device I/O latency microbenchmark")]
struct Cli {
    /// Access mode: read or write (`r` / `w`)
    #[arg(long, value_enum, default_value = "read")]
    mode: Mode,

    /// Number of runs, each starting at a fresh random offset
    #[arg(long = "nb_run", default_value = "1", value_parser = parse_size)]
    nb_run: u64,

    /// Blocks transferred sequentially within each run
    #[arg(long = "nb_bloc", default_value = "1", value_parser = parse_size)]
    nb_bloc: u64,

    /// Block size in bytes (suffixes: s = 512, k, m, g)
    #[arg(long = "sz_bloc", default_value = "512", value_parser = parse_size)]
    sz_bloc: u64,

    /// Test-file span in bytes (suffixes: s = 512, k, m, g)
    #[arg(long, default_value = "1g", value_parser = parse_size)]
    filesize: u64,

    /// Leading runs excluded from statistics (count or percentage, e.g. 20%)
    #[arg(long, default_value = "0", value_parser = parse_skip)]
    skip: SkipArg,

    /// Path of the test file
    #[arg(long, default_value = "/tmp/test.file")]
    file: PathBuf,

    /// Print the resolved configuration to stderr and exit without any I/O
    #[arg(long)]
    dry: bool,

    /// Output format for the summary statistics
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(ValueEnum, Clone, Copy)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let cfg = RunConfig::new(
        cli.mode, cli.nb_run, cli.nb_bloc, cli.sz_bloc, cli.filesize, cli.skip,
    )?;

    if cli.dry {
        eprintln!("{}", serde_json::to_string(&cfg)?);
        return Ok(());
    }

    provision::ensure_test_file(&cli.file, cfg.filesize)?;

    let mut entropy = UrandomSource::open()
        .with_context(|| format!("cannot open {}", UrandomSource::PATH))?;
    let mut device = measure::open_device(&cfg, &cli.file)?;
    let mut buf = AlignedBuf::new(cfg.sz_bloc as usize);

    let samples = measure::measure(&cfg, &mut device, &mut entropy, &mut buf)?;

    let summary = stats::summarize(&samples.latencies_us, cfg.skip_samples() as usize);
    match cli.format {
        OutputFormat::Text => println!("{}", report::summary_line(&summary)),
        OutputFormat::Json => println!("{}", serde_json::to_string(&summary)?),
    }

    report::write_latencies(Path::new(report::LATENCY_LOG), &samples.latencies_us)
        .context("writing latency log")?;
    report::write_timestamps(Path::new(report::START_LOG), &samples.start_times)
        .context("writing start-timestamp log")?;
    report::write_timestamps(Path::new(report::END_LOG), &samples.end_times)
        .context("writing end-timestamp log")?;

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
