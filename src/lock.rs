// Copyright 2025 Jayashankar
// SPDX-License-Identifier: Apache-2.0

use crate::domain::Domain;
use crate::error::{Error, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Delay between attempts while another run holds the lock
const LOCK_RETRY_DELAY_MS: u64 = 100;

/// Attempts before giving up on a held lock (50 * 100ms = 5 seconds)
pub const LOCK_RETRIES: u32 = 50;

/// Exclusive per-domain lock guarding issuance and site writes.
/// The lock is released when this struct is dropped, on every exit path.
pub struct DomainLock {
    #[allow(dead_code)]
    file: File,
    path: PathBuf,
}

impl DomainLock {
    /// Lock file used for `domain` under `root`.
    pub fn lock_path(root: &Path, domain: &Domain) -> PathBuf {
        root.join(format!(".{}.lock", domain))
    }

    /// Single non-blocking attempt.
    pub fn try_acquire(root: &Path, domain: &Domain) -> Result<Self> {
        Self::try_acquire_with_retries(root, domain, 0)
    }

    pub fn try_acquire_with_retries(root: &Path, domain: &Domain, max_retries: u32) -> Result<Self> {
        fs::create_dir_all(root).map_err(|e| Error::CreateDir {
            path: root.to_path_buf(),
            source: e,
        })?;
        let path = Self::lock_path(root, domain);

        let mut attempts = 0;
        loop {
            let file = OpenOptions::new()
                .create(true)
                .truncate(false)
                .write(true)
                .open(&path)
                .map_err(|e| Error::WriteFile {
                    path: path.clone(),
                    source: e,
                })?;

            match file.try_lock_exclusive() {
                Ok(()) => return Ok(DomainLock { file, path }),
                Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                    if attempts >= max_retries {
                        return Err(Error::Locked {
                            domain: domain.to_string(),
                            path,
                        });
                    }
                    attempts += 1;
                    std::thread::sleep(Duration::from_millis(LOCK_RETRY_DELAY_MS));
                }
                Err(e) => {
                    return Err(Error::WriteFile { path, source: e });
                }
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
