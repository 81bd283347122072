// Copyright 2025 Jayashankar
// SPDX-License-Identifier: Apache-2.0

use clap::Parser;
use devhost::{
    toggle_interactive, CommandServer, Config, Output, Result, TerminalChooser, ToggleAction,
    ToggleOutcome,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "devhost-toggle")]
#[command(about = "Interactively enable or disable an Apache site and reload the server")]
#[command(version)]
struct Cli {
    /// Config file (default: $DEVHOST_CONFIG, ~/.config/devhost/config.toml, /etc/devhost/config.toml)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    #[cfg(unix)]
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);
    }

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let out = Output::new(cli.quiet, false);

    let config = Config::load(&cli.config.unwrap_or_else(Config::default_path))?;
    let server = CommandServer::new(config.server.clone());
    let mut chooser = TerminalChooser::stdio();

    match toggle_interactive(
        &config.sites_available,
        &config.sites_enabled,
        &server,
        &mut chooser,
    )? {
        ToggleOutcome::NoSites => out.print("No available sites found."),
        ToggleOutcome::NoSelection => out.print("No selection made."),
        ToggleOutcome::Toggled {
            site,
            action,
            reloaded,
        } => {
            match action {
                ToggleAction::Enable => out.print(&format!("Enabled {}", site)),
                ToggleAction::Disable => out.print(&format!("Disabled {}", site)),
            }
            if reloaded {
                out.print("Reloaded Apache.");
            } else {
                out.warn("reload command reported a failure");
            }
        }
    }

    Ok(())
}
