//! iolat — raw block-device I/O latency microbenchmark.
//!
//! Issues a configurable sequence of fixed-size read or write operations at
//! random, sector-aligned offsets inside a test file, bypassing the page
//! cache with `O_DIRECT | O_SYNC`, and reduces the per-operation latency
//! samples to summary statistics (mean, population stdev, 95% CI
//! half-width, quartiles) while persisting the raw samples and their
//! timestamps to plain-text logs.
//!
//! The measurement engine ([`measure`]) drives the [`BlockDevice`]
//! capability trait, so the direct-I/O backend can be replaced by an
//! in-memory fake in tests without changing the engine's control flow.

#![forbid(unsafe_code)]

pub mod config;
pub mod measure;
pub mod provision;
pub mod report;
pub mod stats;

pub use config::{ConfigError, Mode, RunConfig, SECTOR_SIZE, SkipArg};
pub use measure::device::{AlignedBuf, BlockDevice, DirectIoDevice};
pub use measure::entropy::{EntropySource, UrandomSource, aligned_offset};
pub use measure::{MeasureError, SampleSet, measure, open_device};
pub use stats::{SummaryStats, summarize};
