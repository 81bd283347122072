// Copyright 2025 Jayashankar
// SPDX-License-Identifier: Apache-2.0

use clap::error::ErrorKind;
use clap::Parser;
use devhost::{
    command_line, parse_cert_file, validate_renew_window, CommandServer, Config, Domain, Error,
    HostsMatch, HostsOutcome, Output, ProvisionEvent, Provisioner, Result,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "devhost")]
#[command(about = "Issue a CA-signed certificate, Apache vhost and hosts entry for a local domain")]
#[command(version)]
#[command(after_help = "\
EXAMPLES:
    sudo devhost app.local /srv/app            # Provision https://app.local
    sudo devhost --force app.local /srv/app    # Reissue the certificate
    devhost-toggle                             # Enable or disable a site")]
struct Cli {
    /// Domain name (e.g., myapp.local)
    domain: String,

    /// Full path to the DocumentRoot (e.g., /home/user/app/public)
    document_root: PathBuf,

    /// Config file (default: $DEVHOST_CONFIG, ~/.config/devhost/config.toml, /etc/devhost/config.toml)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Reissue the certificate even if it is not close to expiry
    #[arg(long, short)]
    force: bool,

    /// Renew when fewer than this many days remain (default from config: 30)
    #[arg(long, value_name = "DAYS")]
    renew_within: Option<u32>,

    /// Remove partially written key/CSR/certificate files if issuance fails
    #[arg(long)]
    discard_on_failure: bool,

    /// Match hosts entries by exact hostname instead of substring
    #[arg(long)]
    exact_hosts: bool,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    /// Show detailed output
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,
}

fn main() {
    // Reset SIGPIPE to default behavior (exit) instead of panic
    #[cfg(unix)]
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);
    }

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            // Usage errors exit with 1, not clap's default of 2
            let _ = e.print();
            std::process::exit(1);
        }
    };

    match run(cli) {
        Ok(()) => {}
        Err(Error::ConfigInvalid { diagnostics }) => {
            eprintln!("Apache config error:");
            eprintln!("{}", diagnostics);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let out = Output::new(cli.quiet, cli.verbose);

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    out.verbose(&format!("Using config {}", config_path.display()));
    let config = Config::load(&config_path)?;

    let domain = Domain::parse(&cli.domain)?;
    if !cli.document_root.is_dir() {
        out.warn(&format!(
            "DocumentRoot {} does not exist yet",
            cli.document_root.display()
        ));
    }

    let mut options = config.issue_options();
    options.force = cli.force;
    if let Some(days) = cli.renew_within {
        validate_renew_window(days, options.cert_days)?;
        options.renew_within_days = days;
    }
    let hosts_match = if cli.exact_hosts {
        HostsMatch::Exact
    } else {
        config.hosts_match
    };

    let toolchain = config.toolchain.create(&config.openssl);
    let server = CommandServer::new(config.server.clone());
    out.verbose(&format!("Certificate toolchain: {}", toolchain.name()));
    out.verbose(&format!(
        "Config test: {}; restart: {}",
        command_line(&config.server.config_test),
        command_line(&config.server.restart)
    ));

    let provisioner = Provisioner::new(&config, toolchain.as_ref(), &server)
        .with_options(options)
        .with_hosts_match(hosts_match)
        .discard_on_failure(cli.discard_on_failure);

    let renew_within = options.renew_within_days;
    provisioner.run_at(
        &domain,
        &cli.document_root,
        time::OffsetDateTime::now_utc(),
        &mut |event| report_event(out, &domain, renew_within, event),
    )?;

    Ok(())
}

fn report_event(out: Output, domain: &Domain, renew_within: u32, event: &ProvisionEvent) {
    match event {
        ProvisionEvent::CertificateReused { cert } => {
            out.print(&format!(
                "Certificate is still valid for at least {} days: {}",
                renew_within,
                cert.display()
            ));
            if let Ok(info) = parse_cert_file(cert) {
                out.verbose(&format!(
                    "  Expires {} ({} days remaining)",
                    info.expiry_string(),
                    info.days_remaining()
                ));
            }
        }
        ProvisionEvent::CertificateIssued { cert, key } => {
            out.print(&format!("CA-signed certificate created: {}", cert.display()));
            out.verbose(&format!("  Private key: {}", key.display()));
        }
        ProvisionEvent::BundleDiscarded { files } => {
            out.print(&format!(
                "Removed {} partially written certificate file(s)",
                files.len()
            ));
            for file in files {
                out.verbose(&format!("  {}", file.display()));
            }
        }
        ProvisionEvent::VhostWritten { path } => {
            out.print(&format!("VHost created (or overwritten): {}", path.display()));
        }
        ProvisionEvent::HostsEntry { outcome } => match outcome {
            HostsOutcome::Added => out.print(&format!("Added to hosts file: 127.0.0.1 {}", domain)),
            HostsOutcome::AlreadyPresent => {
                out.print(&format!("Domain already exists in hosts file: {}", domain))
            }
        },
        ProvisionEvent::ServerRestarted { success } => {
            out.print("Apache config is valid. Restarting Apache...");
            if !success {
                out.warn("restart command reported a failure");
            }
        }
    }
}
