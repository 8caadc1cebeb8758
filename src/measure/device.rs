//! Block transfer backends and the sector-aligned transfer buffer.
//!
//! The real backend opens the test file with `O_DIRECT | O_SYNC` so every
//! transfer is serviced by the device, not the page cache, and is durable
//! before the call returns. The `BlockDevice` trait is the seam that lets
//! tests drive the measurement engine with an in-memory fake instead.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::debug;

use crate::config::SECTOR_SIZE;

/// Linux interface for discarding cached pages.
const DROP_CACHES: &str = "/proc/sys/vm/drop_caches";

/// Minimal capability interface over "aligned block transfer at an offset".
pub trait BlockDevice {
    /// Position the device cursor at `offset` bytes from the start.
    fn seek_to(&mut self, offset: u64) -> io::Result<()>;

    /// Read exactly one block at the current position (auto-advancing).
    /// A short read is an error.
    fn read_block(&mut self, buf: &mut [u8]) -> io::Result<()>;

    /// Write exactly one block at the current position (auto-advancing).
    /// A short write is an error.
    fn write_block(&mut self, buf: &[u8]) -> io::Result<()>;

    /// Flush write-back state to the device.
    fn sync(&mut self) -> io::Result<()>;

    /// Ask the OS to discard cached pages so subsequent reads hit the
    /// device. The only recoverable failure in the whole engine.
    fn invalidate_cache(&mut self) -> io::Result<()>;
}

fn direct_open(path: &Path, read: bool) -> io::Result<File> {
    let mut opts = OpenOptions::new();
    if read {
        opts.read(true);
    } else {
        opts.write(true);
    }
    #[cfg(target_os = "linux")]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.custom_flags(libc::O_DIRECT | libc::O_SYNC);
    }
    #[cfg(all(unix, not(target_os = "linux")))]
    {
        // No O_DIRECT outside Linux; synchronous completion still holds.
        use std::os::unix::fs::OpenOptionsExt;
        opts.custom_flags(libc::O_SYNC);
    }
    opts.open(path)
}

/// Direct-I/O file backend.
pub struct DirectIoDevice {
    file: File,
    drop_caches: Option<File>,
}

impl DirectIoDevice {
    /// Open `path` read-only with cache-bypassing, synchronous semantics.
    ///
    /// Also acquires the drop_caches handle used for per-operation cache
    /// invalidation; without root that open fails and the device degrades
    /// to warn-and-continue invalidation.
    pub fn open_read(path: &Path) -> io::Result<Self> {
        let file = direct_open(path, true)?;
        let drop_caches = match OpenOptions::new().write(true).open(DROP_CACHES) {
            Ok(handle) => Some(handle),
            Err(err) => {
                debug!(error = %err, "cannot open {DROP_CACHES}");
                None
            }
        };
        Ok(Self { file, drop_caches })
    }

    /// Open `path` write-only. Write mode relies on synchronous completion
    /// alone and never invalidates the cache, so no drop_caches handle is
    /// acquired.
    pub fn open_write(path: &Path) -> io::Result<Self> {
        Ok(Self {
            file: direct_open(path, false)?,
            drop_caches: None,
        })
    }
}

impl BlockDevice for DirectIoDevice {
    fn seek_to(&mut self, offset: u64) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(offset)).map(|_| ())
    }

    fn read_block(&mut self, buf: &mut [u8]) -> io::Result<()> {
        // Exactly one syscall per timed operation; read_exact would retry
        // short reads and blur the latency sample.
        let n = self.file.read(buf)?;
        if n != buf.len() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("short read: {n} of {} bytes", buf.len()),
            ));
        }
        Ok(())
    }

    fn write_block(&mut self, buf: &[u8]) -> io::Result<()> {
        let n = self.file.write(buf)?;
        if n != buf.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("short write: {n} of {} bytes", buf.len()),
            ));
        }
        Ok(())
    }

    fn sync(&mut self) -> io::Result<()> {
        self.file.sync_all()
    }

    fn invalidate_cache(&mut self) -> io::Result<()> {
        match self.drop_caches.as_mut() {
            Some(handle) => handle.write_all(b"3"),
            None => Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("{DROP_CACHES} is not writable, need root"),
            )),
        }
    }
}

/// A reusable transfer buffer whose starting address is sector-aligned, as
/// direct I/O requires.
///
/// Over-allocates by one alignment unit and slices at the first aligned
/// byte, which keeps the crate free of unsafe code. Allocated once before
/// the timed loop and reused for every operation.
pub struct AlignedBuf {
    storage: Vec<u8>,
    start: usize,
    len: usize,
}

impl AlignedBuf {
    /// Allocate a zeroed buffer of `len` bytes aligned to [`SECTOR_SIZE`].
    pub fn new(len: usize) -> Self {
        let align = SECTOR_SIZE as usize;
        let storage = vec![0u8; len + align];
        let start = storage.as_ptr().align_offset(align);
        Self { storage, start, len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.storage[self.start..self.start + self.len]
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.storage[self.start..self.start + self.len]
    }
}
