// Copyright 2025 Jayashankar
// SPDX-License-Identifier: Apache-2.0

//! Provision HTTPS local development hosts signed by a private root CA.
//!
//! ```rust,no_run
//! use devhost::{CommandServer, Config, Domain, Provisioner};
//! use std::path::Path;
//!
//! let config = Config::load(&Config::default_path())?;
//! let toolchain = config.toolchain.create(&config.openssl);
//! let server = CommandServer::new(config.server.clone());
//!
//! let domain = Domain::parse("app.local")?;
//! let report = Provisioner::new(&config, toolchain.as_ref(), &server)
//!     .run(&domain, Path::new("/srv/app"))?;
//! println!("certificate: {}", report.issuance.cert_path().display());
//! # Ok::<(), devhost::Error>(())
//! ```

/// Configuration handling.
pub mod config;
/// Domain name validation.
pub mod domain;
/// Error types.
pub mod error;
/// Certificate expiry decisions.
pub mod expiry;
/// Filesystem utilities.
pub mod fs;
/// Hosts file registration.
pub mod hosts;
/// Certificate issuance pipeline.
pub mod issuer;
/// Per-domain run locking.
pub mod lock;
/// Console output helper.
pub mod output;
/// External process execution.
pub mod process;
/// End-to-end provisioning.
pub mod provision;
/// Web server control.
pub mod server;
/// Site enable/disable toggling.
pub mod sites;
/// Key, CSR and signing toolchains.
pub mod toolchain;
/// Virtual-host configuration.
pub mod vhost;
/// X.509 certificate parsing.
pub mod x509;

pub use config::{validate_days, validate_renew_window, CaConfig, Config, MAX_CERT_DAYS};
pub use domain::Domain;
pub use error::{Error, Result};
pub use expiry::{needs_issuance, needs_issuance_at, DEFAULT_RENEW_WITHIN_DAYS};
pub use hosts::{ensure_hosts_entry, parse_hosts, HostsEntry, HostsMatch, HostsOutcome};
pub use issuer::{BundlePaths, CertIssuer, IssueOptions, IssueStep, Issuance};
pub use lock::DomainLock;
pub use output::Output;
pub use provision::{ProvisionEvent, ProvisionReport, Provisioner};
pub use server::{
    apply_and_restart, command_line, CommandServer, ConfigTest, ServerCommands, ServerControl,
};
pub use sites::{
    list_sites, toggle_interactive, Chooser, SiteState, TerminalChooser, ToggleAction,
    ToggleOutcome,
};
pub use toolchain::{
    BuiltinToolchain, CaPaths, CertToolchain, ExtensionProfile, OpenSslToolchain, SignRequest,
    ToolchainKind,
};
pub use vhost::{render_vhost, write_vhost, VhostSpec};
pub use x509::{parse_cert_file, parse_cert_pem, CertInfo};
