//! Run configuration: immutable benchmark parameters and the argument-value
//! parsing they are built from.
//!
//! A [`RunConfig`] is created once from parsed CLI values, validated, and
//! passed by reference everywhere else. Sizes accept the historical unit
//! suffixes (`s` = sector, `k`, `m`, `g`); the skip argument accepts either
//! an absolute run count or a percentage of the run count.

use clap::ValueEnum;
use serde::Serialize;
use thiserror::Error;

/// Device sector size in bytes. Direct I/O requires offsets, transfer sizes
/// and buffer addresses to be multiples of this.
pub const SECTOR_SIZE: u64 = 512;

/// Errors produced while resolving or validating a run configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be non-zero")]
    ZeroParameter(&'static str),

    #[error("block size {0} is not a multiple of the {SECTOR_SIZE}-byte sector size")]
    UnalignedBlockSize(u64),

    #[error("file size {0} is not a multiple of the {SECTOR_SIZE}-byte sector size")]
    UnalignedFileSize(u64),

    #[error("run span overflows: {nb_bloc} blocks of {sz_bloc} bytes")]
    SpanOverflow { nb_bloc: u64, sz_bloc: u64 },

    #[error("one run spans {span} bytes but the test file only holds {filesize}")]
    RunExceedsFile { span: u64, filesize: u64 },

    #[error("too much skip: {skip}/{runs}")]
    TooMuchSkip { skip: u64, runs: u64 },
}

/// Access mode for the measured operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[value(alias = "r")]
    Read,
    #[value(alias = "w")]
    Write,
}

/// Skip argument as given on the command line, before resolution against the
/// run count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipArg {
    /// Absolute number of leading runs to exclude.
    Count(u64),
    /// Percentage of the run count, truncated.
    Percent(u32),
}

/// Immutable parameters for one benchmark invocation.
#[derive(Debug, Clone, Serialize)]
pub struct RunConfig {
    pub mode: Mode,
    /// Number of runs, each starting at a fresh random offset.
    pub nb_run: u64,
    /// Blocks transferred sequentially within each run.
    pub nb_bloc: u64,
    /// Bytes per block transfer.
    pub sz_bloc: u64,
    /// Span of the test file available for offset draws.
    pub filesize: u64,
    /// Leading runs excluded from summary statistics.
    pub nb_skip: u64,
}

impl RunConfig {
    /// Resolve and validate a configuration.
    ///
    /// Invariants enforced here so no I/O is ever attempted on a bad
    /// configuration: counts and sizes are non-zero, block and file sizes
    /// are sector multiples, one run fits inside the file, and the skip
    /// count is strictly below the run count.
    pub fn new(
        mode: Mode,
        nb_run: u64,
        nb_bloc: u64,
        sz_bloc: u64,
        filesize: u64,
        skip: SkipArg,
    ) -> Result<Self, ConfigError> {
        if nb_run == 0 {
            return Err(ConfigError::ZeroParameter("nb_run"));
        }
        if nb_bloc == 0 {
            return Err(ConfigError::ZeroParameter("nb_bloc"));
        }
        if sz_bloc == 0 {
            return Err(ConfigError::ZeroParameter("sz_bloc"));
        }
        if filesize == 0 {
            return Err(ConfigError::ZeroParameter("filesize"));
        }
        if sz_bloc % SECTOR_SIZE != 0 {
            return Err(ConfigError::UnalignedBlockSize(sz_bloc));
        }
        if filesize % SECTOR_SIZE != 0 {
            return Err(ConfigError::UnalignedFileSize(filesize));
        }

        let span = nb_bloc
            .checked_mul(sz_bloc)
            .ok_or(ConfigError::SpanOverflow { nb_bloc, sz_bloc })?;
        if span > filesize {
            return Err(ConfigError::RunExceedsFile { span, filesize });
        }

        let nb_skip = match skip {
            SkipArg::Count(n) => n,
            SkipArg::Percent(p) => (nb_run as f64 * f64::from(p) / 100.0) as u64,
        };
        if nb_skip >= nb_run {
            return Err(ConfigError::TooMuchSkip {
                skip: nb_skip,
                runs: nb_run,
            });
        }

        Ok(Self {
            mode,
            nb_run,
            nb_bloc,
            sz_bloc,
            filesize,
            nb_skip,
        })
    }

    /// Bytes touched by one run of sequential blocks.
    pub fn run_span(&self) -> u64 {
        self.nb_bloc * self.sz_bloc
    }

    /// Total number of latency samples a full measurement produces.
    pub fn total_samples(&self) -> u64 {
        self.nb_run * self.nb_bloc
    }

    /// Leading samples to drop before computing statistics. Skipping is
    /// applied at run granularity, not per raw sample.
    pub fn skip_samples(&self) -> u64 {
        self.nb_skip * self.nb_bloc
    }
}

/// Parse a size value with an optional unit suffix (`s` = 512, `k` = 2^10,
/// `m` = 2^20, `g` = 2^30), case-insensitive. Used as a clap value parser.
pub fn parse_size(arg: &str) -> Result<u64, String> {
    let arg = arg.trim();
    let digits_end = arg
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(arg.len());
    let (digits, suffix) = arg.split_at(digits_end);
    let value: u64 = digits
        .parse()
        .map_err(|_| format!("invalid size value: {arg:?}"))?;
    let multiplier = match suffix {
        "" => 1,
        "s" | "S" => SECTOR_SIZE,
        "k" | "K" => 1 << 10,
        "m" | "M" => 1 << 20,
        "g" | "G" => 1 << 30,
        _ => {
            return Err(format!(
                "unknown size suffix {suffix:?} (expected s, k, m or g)"
            ));
        }
    };
    value
        .checked_mul(multiplier)
        .ok_or_else(|| format!("size overflows u64: {arg:?}"))
}

/// Parse a skip argument: either a plain count (size suffixes allowed) or a
/// percentage such as `20%`. Used as a clap value parser.
pub fn parse_skip(arg: &str) -> Result<SkipArg, String> {
    let arg = arg.trim();
    if let Some(percent) = arg.strip_suffix('%') {
        let p: u32 = percent
            .parse()
            .map_err(|_| format!("invalid skip percentage: {arg:?}"))?;
        Ok(SkipArg::Percent(p))
    } else {
        parse_size(arg).map(SkipArg::Count)
    }
}
