//! In-memory backends for deterministic measurement-engine tests.
//!
//! `MemDevice` stands in for the direct-I/O file backend and tracks how the
//! engine drives it (cursor position, sync and invalidation counts).
//! `ScriptedEntropy` replays a fixed offset-draw sequence so tests can pin
//! the exact positions the engine visits.

use std::io;

use iolat::measure::device::BlockDevice;
use iolat::measure::entropy::EntropySource;

/// Byte-addressable in-memory block device.
pub struct MemDevice {
    pub data: Vec<u8>,
    pub pos: usize,
    pub syncs: usize,
    pub invalidations: usize,
    /// When true, `invalidate_cache` fails the way an unprivileged
    /// drop_caches write does.
    pub deny_invalidation: bool,
    /// When set, transfers whose length is not a multiple of this fail,
    /// mimicking a direct-I/O alignment violation.
    pub require_alignment: Option<usize>,
}

impl MemDevice {
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0x5A; size],
            pos: 0,
            syncs: 0,
            invalidations: 0,
            deny_invalidation: false,
            require_alignment: None,
        }
    }

    fn check_alignment(&self, len: usize) -> io::Result<()> {
        if let Some(align) = self.require_alignment
            && len % align != 0
        {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("transfer of {len} bytes violates {align}-byte alignment"),
            ));
        }
        Ok(())
    }

    fn span(&self, len: usize) -> io::Result<std::ops::Range<usize>> {
        let end = self.pos + len;
        if end > self.data.len() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("transfer past end of device: {end} > {}", self.data.len()),
            ));
        }
        Ok(self.pos..end)
    }
}

impl BlockDevice for MemDevice {
    fn seek_to(&mut self, offset: u64) -> io::Result<()> {
        if offset as usize > self.data.len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek past end of device",
            ));
        }
        self.pos = offset as usize;
        Ok(())
    }

    fn read_block(&mut self, buf: &mut [u8]) -> io::Result<()> {
        self.check_alignment(buf.len())?;
        let span = self.span(buf.len())?;
        buf.copy_from_slice(&self.data[span.clone()]);
        self.pos = span.end;
        Ok(())
    }

    fn write_block(&mut self, buf: &[u8]) -> io::Result<()> {
        self.check_alignment(buf.len())?;
        let span = self.span(buf.len())?;
        self.data[span.clone()].copy_from_slice(buf);
        self.pos = span.end;
        Ok(())
    }

    fn sync(&mut self) -> io::Result<()> {
        self.syncs += 1;
        Ok(())
    }

    fn invalidate_cache(&mut self) -> io::Result<()> {
        if self.deny_invalidation {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "drop_caches is not writable, need root",
            ));
        }
        self.invalidations += 1;
        Ok(())
    }
}

/// Entropy source replaying a fixed draw sequence, cycling when exhausted.
/// `fill` writes a deterministic non-zero pattern.
pub struct ScriptedEntropy {
    draws: Vec<u64>,
    next: usize,
}

impl ScriptedEntropy {
    pub fn new(draws: Vec<u64>) -> Self {
        assert!(!draws.is_empty());
        Self { draws, next: 0 }
    }
}

impl EntropySource for ScriptedEntropy {
    fn fill(&mut self, buf: &mut [u8]) -> io::Result<()> {
        for (i, byte) in buf.iter_mut().enumerate() {
            *byte = (i % 251 + 1) as u8;
        }
        Ok(())
    }

    fn next_u64(&mut self) -> io::Result<u64> {
        let draw = self.draws[self.next % self.draws.len()];
        self.next += 1;
        Ok(draw)
    }
}

/// Entropy source whose every operation fails, for fatal-path tests.
pub struct BrokenEntropy;

impl EntropySource for BrokenEntropy {
    fn fill(&mut self, _buf: &mut [u8]) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::BrokenPipe,
            "entropy device unreadable",
        ))
    }
}
