// Copyright 2025 Jayashankar
// SPDX-License-Identifier: Apache-2.0

//! Web server control plane: site enable/disable, config test, reload and restart.

use crate::error::{Error, Result};
use crate::process::{describe, failure_text, run_checked, run_command, split_argv};
use serde::{Deserialize, Serialize};
use std::process::ExitStatus;

/// Result of the server's configuration test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigTest {
    pub ok: bool,
    /// Diagnostic output of the test command
    pub diagnostics: String,
}

/// Operations on the web server, addressed by configuration file name.
pub trait ServerControl {
    /// Enable `site` (e.g. `app.local.conf`). A failure is an error.
    fn enable_site(&self, site: &str) -> Result<()>;
    /// Disable `site`. A failure is an error.
    fn disable_site(&self, site: &str) -> Result<()>;
    fn config_test(&self) -> Result<ConfigTest>;
    /// Reload configuration. Returns whether the command reported success;
    /// callers do not treat `false` as an error.
    fn reload(&self) -> Result<bool>;
    /// Full restart. Same contract as [`ServerControl::reload`].
    fn restart(&self) -> Result<bool>;
}

/// Command lines for each control operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerCommands {
    #[serde(default = "default_enable_site")]
    pub enable_site: Vec<String>,
    #[serde(default = "default_disable_site")]
    pub disable_site: Vec<String>,
    #[serde(default = "default_config_test")]
    pub config_test: Vec<String>,
    #[serde(default = "default_reload")]
    pub reload: Vec<String>,
    #[serde(default = "default_restart")]
    pub restart: Vec<String>,
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

fn default_enable_site() -> Vec<String> {
    argv(&["a2ensite"])
}

fn default_disable_site() -> Vec<String> {
    argv(&["a2dissite"])
}

fn default_config_test() -> Vec<String> {
    argv(&["apachectl", "configtest"])
}

fn default_reload() -> Vec<String> {
    argv(&["systemctl", "reload", "apache2"])
}

fn default_restart() -> Vec<String> {
    argv(&["systemctl", "restart", "apache2"])
}

impl Default for ServerCommands {
    fn default() -> Self {
        Self {
            enable_site: default_enable_site(),
            disable_site: default_disable_site(),
            config_test: default_config_test(),
            reload: default_reload(),
            restart: default_restart(),
        }
    }
}

impl ServerCommands {
    pub fn validate(&self) -> Result<()> {
        for (name, command) in [
            ("enable_site", &self.enable_site),
            ("disable_site", &self.disable_site),
            ("config_test", &self.config_test),
            ("reload", &self.reload),
            ("restart", &self.restart),
        ] {
            if command.first().map_or(true, |p| p.is_empty()) {
                return Err(Error::Config(format!("server.{} cannot be empty", name)));
            }
        }
        Ok(())
    }
}

/// [`ServerControl`] backed by external commands.
#[derive(Debug, Clone)]
pub struct CommandServer {
    commands: ServerCommands,
}

impl CommandServer {
    pub fn new(commands: ServerCommands) -> Self {
        Self { commands }
    }

    fn run_with_site(&self, argv: &[String], site: &str) -> Result<()> {
        let (program, args) = split_argv(argv)?;
        let mut args = args.to_vec();
        args.push(site.to_string());
        run_checked(program, &args)?;
        Ok(())
    }

    fn run_unchecked(&self, argv: &[String]) -> Result<ExitStatus> {
        let (program, args) = split_argv(argv)?;
        Ok(run_command(program, args)?.status)
    }
}

impl ServerControl for CommandServer {
    fn enable_site(&self, site: &str) -> Result<()> {
        self.run_with_site(&self.commands.enable_site, site)
    }

    fn disable_site(&self, site: &str) -> Result<()> {
        self.run_with_site(&self.commands.disable_site, site)
    }

    fn config_test(&self) -> Result<ConfigTest> {
        let (program, args) = split_argv(&self.commands.config_test)?;
        let output = run_command(program, args)?;
        let ok = output.status.success();
        let diagnostics = if ok {
            String::from_utf8_lossy(&output.stderr).trim().to_string()
        } else {
            failure_text(&output)
        };
        Ok(ConfigTest { ok, diagnostics })
    }

    fn reload(&self) -> Result<bool> {
        Ok(self.run_unchecked(&self.commands.reload)?.success())
    }

    fn restart(&self) -> Result<bool> {
        Ok(self.run_unchecked(&self.commands.restart)?.success())
    }
}

/// Validate the merged configuration and restart the server.
///
/// The restart's own exit status is returned but not checked. A failed
/// configuration test is [`Error::ConfigInvalid`] carrying the diagnostics.
pub fn apply_and_restart(server: &dyn ServerControl) -> Result<bool> {
    let test = server.config_test()?;
    if !test.ok {
        return Err(Error::ConfigInvalid {
            diagnostics: test.diagnostics,
        });
    }
    server.restart()
}

/// Human readable form of a configured command, for messages.
pub fn command_line(argv: &[String]) -> String {
    match argv.split_first() {
        Some((program, args)) => describe(program, args),
        None => String::new(),
    }
}
