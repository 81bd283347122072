// Copyright 2025 Jayashankar
// SPDX-License-Identifier: Apache-2.0

//! The provisioning run: certificate, site configuration, hosts entry, restart.

use crate::config::Config;
use crate::domain::Domain;
use crate::error::{Error, Result};
use crate::hosts::{ensure_hosts_entry, HostsMatch, HostsOutcome};
use crate::issuer::{CertIssuer, IssueOptions, Issuance};
use crate::lock::{DomainLock, LOCK_RETRIES};
use crate::server::{apply_and_restart, ServerControl};
use crate::toolchain::CertToolchain;
use crate::vhost::{write_vhost, VhostSpec};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;

/// Progress notifications, emitted in order as each stage completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionEvent {
    CertificateReused { cert: PathBuf },
    CertificateIssued { cert: PathBuf, key: PathBuf },
    BundleDiscarded { files: Vec<PathBuf> },
    VhostWritten { path: PathBuf },
    HostsEntry { outcome: HostsOutcome },
    ServerRestarted { success: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionReport {
    pub issuance: Issuance,
    pub vhost_path: PathBuf,
    pub hosts: HostsOutcome,
    /// Exit status of the restart command (not checked)
    pub restarted: bool,
}

pub struct Provisioner<'a> {
    config: &'a Config,
    toolchain: &'a dyn CertToolchain,
    server: &'a dyn ServerControl,
    options: IssueOptions,
    hosts_match: HostsMatch,
    discard_on_failure: bool,
}

impl<'a> Provisioner<'a> {
    pub fn new(
        config: &'a Config,
        toolchain: &'a dyn CertToolchain,
        server: &'a dyn ServerControl,
    ) -> Self {
        Self {
            config,
            toolchain,
            server,
            options: config.issue_options(),
            hosts_match: config.hosts_match,
            discard_on_failure: false,
        }
    }

    pub fn with_options(mut self, options: IssueOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_hosts_match(mut self, mode: HostsMatch) -> Self {
        self.hosts_match = mode;
        self
    }

    /// Remove a partially written bundle when issuance fails.
    pub fn discard_on_failure(mut self, discard: bool) -> Self {
        self.discard_on_failure = discard;
        self
    }

    pub fn run(&self, domain: &Domain, document_root: &Path) -> Result<ProvisionReport> {
        self.run_at(domain, document_root, OffsetDateTime::now_utc(), &mut |_| {})
    }

    /// Full run with expiry judged at `now`, reporting progress to `on_event`.
    pub fn run_at(
        &self,
        domain: &Domain,
        document_root: &Path,
        now: OffsetDateTime,
        on_event: &mut dyn FnMut(&ProvisionEvent),
    ) -> Result<ProvisionReport> {
        let cert_root = self.config.cert_root()?;
        let ca = self.config.ca_paths();
        let _lock = DomainLock::try_acquire_with_retries(&cert_root, domain, LOCK_RETRIES)?;

        let issuer = CertIssuer::new(self.toolchain, &ca, &cert_root, self.options);
        let issuance = match issuer.issue_at(domain, now) {
            Ok(issuance) => issuance,
            Err(err @ Error::IssueFailed { .. }) if self.discard_on_failure => {
                let files = issuer.bundle_paths(domain).discard()?;
                on_event(&ProvisionEvent::BundleDiscarded { files });
                return Err(err);
            }
            Err(err) => return Err(err),
        };
        on_event(&match &issuance {
            Issuance::Reused { cert, .. } => ProvisionEvent::CertificateReused { cert: cert.clone() },
            Issuance::Issued { cert, key } => ProvisionEvent::CertificateIssued {
                cert: cert.clone(),
                key: key.clone(),
            },
        });

        let vhost_path = write_vhost(
            &self.config.sites_available,
            &VhostSpec {
                domain,
                document_root,
                cert_path: issuance.cert_path(),
                key_path: issuance.key_path(),
                log_dir: &self.config.log_dir,
            },
            self.server,
        )?;
        on_event(&ProvisionEvent::VhostWritten {
            path: vhost_path.clone(),
        });

        let hosts = ensure_hosts_entry(&self.config.hosts_file, domain, self.hosts_match)?;
        on_event(&ProvisionEvent::HostsEntry { outcome: hosts });

        let restarted = apply_and_restart(self.server)?;
        on_event(&ProvisionEvent::ServerRestarted { success: restarted });

        Ok(ProvisionReport {
            issuance,
            vhost_path,
            hosts,
            restarted,
        })
    }
}
