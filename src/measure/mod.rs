//! The measurement engine: timed, cache-bypassing block transfers.
//!
//! `measure` runs the full per-run / per-block loop described by the run
//! configuration, bracketing every transfer syscall with wall-clock
//! timestamps. Only the transfer itself sits inside the timed region;
//! offset draws, seeks, syncs and cache invalidation happen between
//! samples. Execution is strictly single-threaded and blocking, on purpose:
//! the latency signal is only valid if nothing else competes for the device
//! while a sample is taken.

pub mod device;
pub mod entropy;

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{Mode, RunConfig};

use self::device::{AlignedBuf, BlockDevice, DirectIoDevice};
use self::entropy::{EntropySource, aligned_offset};

/// Errors that abort a measurement. Every variant is fatal and discards the
/// partial sample set; cache invalidation is deliberately absent because it
/// is the sole warn-and-continue condition.
#[derive(Error, Debug)]
pub enum MeasureError {
    #[error("failed to open {}: {source}", .path.display())]
    Open { path: PathBuf, source: io::Error },

    #[error("entropy source failure: {0}")]
    Entropy(#[source] io::Error),

    #[error("seek failed: {0}")]
    Seek(#[source] io::Error),

    #[error("read failed: {0}")]
    Read(#[source] io::Error),

    #[error("write failed: {0}")]
    Write(#[source] io::Error),

    #[error("sync failed: {0}")]
    Sync(#[source] io::Error),
}

/// Per-operation measurements, index-aligned across the three vectors.
///
/// For every index `i`: `end_times[i] >= start_times[i]` and
/// `latencies_us[i]` is the whole-microsecond difference between them.
#[derive(Debug, Clone)]
pub struct SampleSet {
    /// Latency of each operation in microseconds.
    pub latencies_us: Vec<u64>,
    /// Wall-clock instant captured immediately before each transfer.
    pub start_times: Vec<DateTime<Local>>,
    /// Wall-clock instant captured immediately after each transfer.
    pub end_times: Vec<DateTime<Local>>,
}

impl SampleSet {
    fn with_capacity(n: usize) -> Self {
        Self {
            latencies_us: Vec::with_capacity(n),
            start_times: Vec::with_capacity(n),
            end_times: Vec::with_capacity(n),
        }
    }

    pub fn len(&self) -> usize {
        self.latencies_us.len()
    }

    pub fn is_empty(&self) -> bool {
        self.latencies_us.is_empty()
    }

    fn record(&mut self, start: DateTime<Local>, end: DateTime<Local>) {
        let micros = end
            .signed_duration_since(start)
            .num_microseconds()
            .unwrap_or(i64::MAX)
            .max(0) as u64;
        self.latencies_us.push(micros);
        self.start_times.push(start);
        self.end_times.push(end);
    }
}

/// Open the direct-I/O backend matching the configured access mode.
pub fn open_device(cfg: &RunConfig, path: &Path) -> Result<DirectIoDevice, MeasureError> {
    let opened = match cfg.mode {
        Mode::Read => DirectIoDevice::open_read(path),
        Mode::Write => DirectIoDevice::open_write(path),
    };
    opened.map_err(|source| MeasureError::Open {
        path: path.to_path_buf(),
        source,
    })
}

/// Run the full measurement loop and return the populated sample set.
///
/// The buffer must already be sized to `cfg.sz_bloc`; in write mode it is
/// filled once from the entropy source before the timed loop so the written
/// content is not all-zero (filesystem compression or dedup would otherwise
/// skew write latencies on some backends).
pub fn measure<D, E>(
    cfg: &RunConfig,
    device: &mut D,
    entropy: &mut E,
    buf: &mut AlignedBuf,
) -> Result<SampleSet, MeasureError>
where
    D: BlockDevice,
    E: EntropySource,
{
    debug_assert_eq!(buf.len() as u64, cfg.sz_bloc);

    let mut samples = SampleSet::with_capacity(cfg.total_samples() as usize);

    if cfg.mode == Mode::Write {
        entropy
            .fill(buf.as_mut_slice())
            .map_err(MeasureError::Entropy)?;
    }

    info!(
        mode = ?cfg.mode,
        runs = cfg.nb_run,
        blocks_per_run = cfg.nb_bloc,
        block_size = cfg.sz_bloc,
        "starting measurement"
    );

    let mut invalidation_denied = false;

    for run in 0..cfg.nb_run {
        let raw = entropy.next_u64().map_err(MeasureError::Entropy)?;
        let offset = aligned_offset(raw, cfg);
        device.seek_to(offset).map_err(MeasureError::Seek)?;
        debug!(run, offset, "run start");

        for _ in 0..cfg.nb_bloc {
            let start = Local::now();
            match cfg.mode {
                Mode::Read => device
                    .read_block(buf.as_mut_slice())
                    .map_err(MeasureError::Read)?,
                Mode::Write => device
                    .write_block(buf.as_slice())
                    .map_err(MeasureError::Write)?,
            }
            let end = Local::now();
            samples.record(start, end);

            device.sync().map_err(MeasureError::Sync)?;

            // Read mode only: writes are already forced to the device by
            // O_SYNC, reads additionally need the cached pages dropped so
            // the next sample is serviced from the device.
            if cfg.mode == Mode::Read
                && let Err(err) = device.invalidate_cache()
            {
                if invalidation_denied {
                    debug!(error = %err, "cache invalidation still failing");
                } else {
                    warn!(
                        error = %err,
                        "cache invalidation unavailable; reads may be cache-assisted"
                    );
                    invalidation_denied = true;
                }
            }
        }
    }

    Ok(samples)
}
