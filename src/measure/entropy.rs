//! Randomized offset generation backed by the OS entropy source.
//!
//! One offset is drawn per run, not per block: all blocks within a run are
//! transferred sequentially from the drawn position.

use std::fs::File;
use std::io::{self, Read};

use crate::config::{RunConfig, SECTOR_SIZE};

/// Source of random bytes for offset draws and write-buffer content.
///
/// The engine consumes entropy through this trait so tests can substitute a
/// scripted sequence for `/dev/urandom`.
pub trait EntropySource {
    /// Fill `buf` entirely with random bytes.
    fn fill(&mut self, buf: &mut [u8]) -> io::Result<()>;

    /// Draw one random 64-bit value.
    fn next_u64(&mut self) -> io::Result<u64> {
        let mut raw = [0u8; 8];
        self.fill(&mut raw)?;
        Ok(u64::from_ne_bytes(raw))
    }
}

/// `/dev/urandom`-backed entropy source. An unreadable entropy device is a
/// fatal condition; there is no fallback generator.
pub struct UrandomSource {
    file: File,
}

impl UrandomSource {
    pub const PATH: &'static str = "/dev/urandom";

    pub fn open() -> io::Result<Self> {
        Ok(Self {
            file: File::open(Self::PATH)?,
        })
    }
}

impl EntropySource for UrandomSource {
    fn fill(&mut self, buf: &mut [u8]) -> io::Result<()> {
        self.file.read_exact(buf)
    }
}

/// Map one raw entropy draw to a sector-aligned byte offset such that a full
/// run of `nb_bloc` blocks starting there stays inside the file.
///
/// The modulus keeps the last valid slot reachable:
/// `512 * (raw % (filesize/512 + 1 - nb_bloc*sz_bloc/512))`.
pub fn aligned_offset(raw: u64, cfg: &RunConfig) -> u64 {
    let total_sectors = cfg.filesize / SECTOR_SIZE;
    let span_sectors = cfg.run_span() / SECTOR_SIZE;
    SECTOR_SIZE * (raw % (total_sectors + 1 - span_sectors))
}
