//! Test-file provisioning.
//!
//! Guarantees that a regular file of at least the configured size, filled
//! with non-trivial content, exists before measurement begins. Random fill
//! matters: an all-zero file invites sparse-extent or compression shortcuts
//! that would let reads complete without touching the device.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

const FILL_CHUNK: usize = 1 << 22; // 4 MiB

#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("failed to stat {}: {source}", .path.display())]
    Stat { path: PathBuf, source: io::Error },

    #[error("failed to create {}: {source}", .path.display())]
    Create { path: PathBuf, source: io::Error },

    #[error("entropy source failure while filling {}: {source}", .path.display())]
    Entropy { path: PathBuf, source: io::Error },

    #[error("failed to write {}: {source}", .path.display())]
    Fill { path: PathBuf, source: io::Error },
}

/// Ensure a test file of at least `size` bytes exists at `path`.
///
/// A file that is already large enough is left untouched; anything else is
/// recreated from scratch and filled from `/dev/urandom`, synced, and the
/// page cache dropped (best effort) so the first measured run starts cold.
pub fn ensure_test_file(path: &Path, size: u64) -> Result<(), ProvisionError> {
    match fs::metadata(path) {
        Ok(meta) if meta.len() >= size => {
            debug!(path = %path.display(), len = meta.len(), "test file already provisioned");
            return Ok(());
        }
        Ok(meta) => {
            debug!(path = %path.display(), len = meta.len(), "test file too small, recreating");
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => {
            return Err(ProvisionError::Stat {
                path: path.to_path_buf(),
                source: err,
            });
        }
    }

    info!(path = %path.display(), size, "provisioning test file");

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(|source| ProvisionError::Create {
            path: path.to_path_buf(),
            source,
        })?;
    let mut urandom =
        File::open("/dev/urandom").map_err(|source| ProvisionError::Entropy {
            path: path.to_path_buf(),
            source,
        })?;

    let mut chunk = vec![0u8; FILL_CHUNK];
    let mut written: u64 = 0;
    while written < size {
        let n = FILL_CHUNK.min((size - written) as usize);
        urandom
            .read_exact(&mut chunk[..n])
            .map_err(|source| ProvisionError::Entropy {
                path: path.to_path_buf(),
                source,
            })?;
        file.write_all(&chunk[..n])
            .map_err(|source| ProvisionError::Fill {
                path: path.to_path_buf(),
                source,
            })?;
        written += n as u64;
    }
    file.sync_all().map_err(|source| ProvisionError::Fill {
        path: path.to_path_buf(),
        source,
    })?;

    // Cold cache for the first measured run; best effort, same privilege
    // caveat as the engine's per-operation invalidation.
    if let Err(err) = fs::write("/proc/sys/vm/drop_caches", "3") {
        warn!(error = %err, "cache flush failed, need root");
    }

    Ok(())
}
