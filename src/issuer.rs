// Copyright 2025 Jayashankar
// SPDX-License-Identifier: Apache-2.0

//! Key, CSR and certificate issuance against the local root CA.
//!
//! Issuance is a fixed sequence of steps. The first failing step aborts the
//! run and is reported in [`Error::IssueFailed`]; files written by earlier steps
//! stay on disk until [`BundlePaths::discard`] is called or a later run
//! overwrites them.

use crate::domain::Domain;
use crate::error::{Error, Result};
use crate::expiry::{needs_issuance_at, DEFAULT_RENEW_WITHIN_DAYS};
use crate::fs::{atomic_write, ensure_dir, remove_if_exists, set_mode, CERT_FILE_MODE, KEY_FILE_MODE};
use crate::toolchain::{
    CaPaths, CertToolchain, ExtensionProfile, SignRequest, DEFAULT_CERT_DAYS, DEFAULT_KEY_BITS,
};
use std::fmt;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;

/// One step of the issuance pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueStep {
    ExtensionFile,
    PrivateKey,
    SigningRequest,
    SignedCertificate,
    Permissions,
}

impl IssueStep {
    pub const ALL: [IssueStep; 5] = [
        IssueStep::ExtensionFile,
        IssueStep::PrivateKey,
        IssueStep::SigningRequest,
        IssueStep::SignedCertificate,
        IssueStep::Permissions,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            IssueStep::ExtensionFile => "write extension file",
            IssueStep::PrivateKey => "generate private key",
            IssueStep::SigningRequest => "generate signing request",
            IssueStep::SignedCertificate => "sign certificate",
            IssueStep::Permissions => "set file permissions",
        }
    }
}

impl fmt::Display for IssueStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// File locations of a domain's certificate bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundlePaths {
    pub dir: PathBuf,
    pub key: PathBuf,
    pub csr: PathBuf,
    pub cert: PathBuf,
    pub ext: PathBuf,
}

impl BundlePaths {
    /// `<cert_root>/<domain>/{domain}.key|.csr|.crt|_ext.cnf`
    pub fn new(cert_root: &Path, domain: &Domain) -> Self {
        let dir = cert_root.join(domain.as_str());
        Self {
            key: dir.join(format!("{}.key", domain)),
            csr: dir.join(format!("{}.csr", domain)),
            cert: dir.join(format!("{}.crt", domain)),
            ext: dir.join(format!("{}_ext.cnf", domain)),
            dir,
        }
    }

    pub fn files(&self) -> [&Path; 4] {
        [&self.ext, &self.key, &self.csr, &self.cert]
    }

    /// Remove every bundle file that exists. Returns the removed paths.
    ///
    /// Never called implicitly; used to clean up after a failed issuance.
    pub fn discard(&self) -> Result<Vec<PathBuf>> {
        let mut removed = Vec::new();
        for path in self.files() {
            if remove_if_exists(path)? {
                removed.push(path.to_path_buf());
            }
        }
        Ok(removed)
    }
}

/// Outcome of [`CertIssuer::issue`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Issuance {
    /// The existing certificate is valid beyond the renewal threshold.
    Reused { cert: PathBuf, key: PathBuf },
    /// A new key, CSR and certificate were written.
    Issued { cert: PathBuf, key: PathBuf },
}

impl Issuance {
    pub fn cert_path(&self) -> &Path {
        match self {
            Issuance::Reused { cert, .. } | Issuance::Issued { cert, .. } => cert,
        }
    }

    pub fn key_path(&self) -> &Path {
        match self {
            Issuance::Reused { key, .. } | Issuance::Issued { key, .. } => key,
        }
    }

    pub fn was_issued(&self) -> bool {
        matches!(self, Issuance::Issued { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IssueOptions {
    /// Reissue when fewer whole days than this remain
    pub renew_within_days: u32,
    pub cert_days: u32,
    pub key_bits: u32,
    /// Reissue regardless of the current certificate's expiry
    pub force: bool,
}

impl Default for IssueOptions {
    fn default() -> Self {
        Self {
            renew_within_days: DEFAULT_RENEW_WITHIN_DAYS,
            cert_days: DEFAULT_CERT_DAYS,
            key_bits: DEFAULT_KEY_BITS,
            force: false,
        }
    }
}

pub struct CertIssuer<'a> {
    toolchain: &'a dyn CertToolchain,
    ca: &'a CaPaths,
    cert_root: &'a Path,
    options: IssueOptions,
}

impl<'a> CertIssuer<'a> {
    pub fn new(
        toolchain: &'a dyn CertToolchain,
        ca: &'a CaPaths,
        cert_root: &'a Path,
        options: IssueOptions,
    ) -> Self {
        Self {
            toolchain,
            ca,
            cert_root,
            options,
        }
    }

    pub fn bundle_paths(&self, domain: &Domain) -> BundlePaths {
        BundlePaths::new(self.cert_root, domain)
    }

    pub fn issue(&self, domain: &Domain) -> Result<Issuance> {
        self.issue_at(domain, OffsetDateTime::now_utc())
    }

    /// Issue or reuse the certificate for `domain`, judging expiry at `now`.
    pub fn issue_at(&self, domain: &Domain, now: OffsetDateTime) -> Result<Issuance> {
        let bundle = self.bundle_paths(domain);

        if !self.options.force
            && !needs_issuance_at(&bundle.cert, self.options.renew_within_days, now)?
        {
            return Ok(Issuance::Reused {
                cert: bundle.cert,
                key: bundle.key,
            });
        }

        self.ca.ensure_exists()?;
        ensure_dir(&bundle.dir)?;

        for step in IssueStep::ALL {
            self.run_step(step, domain, &bundle)
                .map_err(|e| Error::IssueFailed {
                    step,
                    source: Box::new(e),
                })?;
        }

        Ok(Issuance::Issued {
            cert: bundle.cert,
            key: bundle.key,
        })
    }

    fn run_step(&self, step: IssueStep, domain: &Domain, bundle: &BundlePaths) -> Result<()> {
        match step {
            IssueStep::ExtensionFile => {
                let profile = ExtensionProfile::for_domain(domain);
                atomic_write(&bundle.ext, profile.render().as_bytes())
            }
            IssueStep::PrivateKey => self
                .toolchain
                .generate_key(&bundle.key, self.options.key_bits),
            IssueStep::SigningRequest => {
                self.toolchain
                    .generate_csr(&bundle.key, &bundle.csr, domain.as_str())
            }
            IssueStep::SignedCertificate => self.toolchain.sign(&SignRequest {
                csr: &bundle.csr,
                ca: self.ca,
                ext_file: &bundle.ext,
                cert_out: &bundle.cert,
                days: self.options.cert_days,
            }),
            IssueStep::Permissions => {
                set_mode(&bundle.key, KEY_FILE_MODE)?;
                set_mode(&bundle.cert, CERT_FILE_MODE)
            }
        }
    }
}
