// Copyright 2025 Jayashankar
// SPDX-License-Identifier: Apache-2.0

//! Enable/disable state of site configurations and the interactive toggle.
//!
//! A site is enabled when a file of the same name exists in the enabled
//! directory. Only `*.conf` files count.

use crate::error::{Error, Result};
use crate::server::ServerControl;
use std::collections::BTreeSet;
use std::io::{self, BufRead, Write};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SiteState {
    pub name: String,
    pub enabled: bool,
}

impl SiteState {
    /// `[✓] app.local.conf` or `[ ] app.local.conf`
    pub fn label(&self) -> String {
        format!("[{}] {}", if self.enabled { '✓' } else { ' ' }, self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleAction {
    Enable,
    Disable,
}

impl ToggleAction {
    pub fn for_site(site: &SiteState) -> Self {
        if site.enabled {
            ToggleAction::Disable
        } else {
            ToggleAction::Enable
        }
    }

    pub fn apply(self, server: &dyn ServerControl, site: &str) -> Result<()> {
        match self {
            ToggleAction::Enable => server.enable_site(site),
            ToggleAction::Disable => server.disable_site(site),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    NoSites,
    NoSelection,
    Toggled {
        site: String,
        action: ToggleAction,
        /// Whether the reload command reported success
        reloaded: bool,
    },
}

/// Names of `*.conf` files in `dir`. A missing directory has no sites.
pub fn conf_names(dir: &Path) -> Result<BTreeSet<String>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeSet::new()),
        Err(e) => {
            return Err(Error::ReadDir {
                path: dir.to_path_buf(),
                source: e,
            })
        }
    };

    let mut names = BTreeSet::new();
    for entry_result in entries {
        let entry = match entry_result {
            Ok(e) => e,
            Err(e) => {
                eprintln!(
                    "Warning: Could not read directory entry in {}: {}",
                    dir.display(),
                    e
                );
                continue;
            }
        };
        let path = entry.path();
        if path.extension().map(|e| e == "conf").unwrap_or(false) {
            if let Some(name) = path.file_name() {
                names.insert(name.to_string_lossy().to_string());
            }
        }
    }
    Ok(names)
}

/// Pure state computation: every available site, flagged by membership in `enabled`.
pub fn site_states(available: &BTreeSet<String>, enabled: &BTreeSet<String>) -> Vec<SiteState> {
    available
        .iter()
        .map(|name| SiteState {
            name: name.clone(),
            enabled: enabled.contains(name),
        })
        .collect()
}

/// Available sites sorted by name with their enabled state.
pub fn list_sites(available_dir: &Path, enabled_dir: &Path) -> Result<Vec<SiteState>> {
    Ok(site_states(
        &conf_names(available_dir)?,
        &conf_names(enabled_dir)?,
    ))
}

/// Pick one of N labeled options.
pub trait Chooser {
    /// Index of the chosen option, or `None` if the user chose nothing.
    fn choose(&mut self, prompt: &str, options: &[String]) -> Result<Option<usize>>;
}

/// Numbered-list chooser on a terminal (or any reader/writer pair).
pub struct TerminalChooser<R, W> {
    input: R,
    output: W,
}

impl TerminalChooser<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> TerminalChooser<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn write_menu(&mut self, prompt: &str, options: &[String]) -> io::Result<()> {
        writeln!(self.output, "{}", prompt)?;
        for (i, option) in options.iter().enumerate() {
            writeln!(self.output, "  {:>2}) {}", i + 1, option)?;
        }
        write!(self.output, "Enter a number (empty to cancel): ")?;
        self.output.flush()
    }
}

impl<R: BufRead, W: Write> Chooser for TerminalChooser<R, W> {
    fn choose(&mut self, prompt: &str, options: &[String]) -> Result<Option<usize>> {
        self.write_menu(prompt, options).map_err(Error::Terminal)?;

        loop {
            let mut line = String::new();
            // EOF counts as no selection
            if self.input.read_line(&mut line).map_err(Error::Terminal)? == 0 {
                return Ok(None);
            }
            let line = line.trim();
            if line.is_empty() || line.eq_ignore_ascii_case("q") {
                return Ok(None);
            }
            match line.parse::<usize>() {
                Ok(n) if (1..=options.len()).contains(&n) => return Ok(Some(n - 1)),
                _ => {
                    write!(
                        self.output,
                        "Please enter a number between 1 and {}: ",
                        options.len()
                    )
                    .and_then(|_| self.output.flush())
                    .map_err(Error::Terminal)?;
                }
            }
        }
    }
}

pub const TOGGLE_PROMPT: &str = "Select a site to toggle (enable/disable):";

/// List sites, let the user pick one, flip its state and reload the server.
///
/// Enable/disable failures are errors. The reload is not validated and its
/// status is only reported.
pub fn toggle_interactive(
    available_dir: &Path,
    enabled_dir: &Path,
    server: &dyn ServerControl,
    chooser: &mut dyn Chooser,
) -> Result<ToggleOutcome> {
    let sites = list_sites(available_dir, enabled_dir)?;
    if sites.is_empty() {
        return Ok(ToggleOutcome::NoSites);
    }

    let labels: Vec<String> = sites.iter().map(SiteState::label).collect();
    let site = match chooser.choose(TOGGLE_PROMPT, &labels)? {
        Some(index) => match sites.get(index) {
            Some(site) => site,
            None => return Ok(ToggleOutcome::NoSelection),
        },
        None => return Ok(ToggleOutcome::NoSelection),
    };

    let action = ToggleAction::for_site(site);
    action.apply(server, &site.name)?;
    let reloaded = server.reload()?;

    Ok(ToggleOutcome::Toggled {
        site: site.name.clone(),
        action,
        reloaded,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_site_states_sorted_with_membership() {
        let states = site_states(
            &set(&["b.local.conf", "a.local.conf", "c.local.conf"]),
            &set(&["c.local.conf", "a.local.conf", "orphan.conf"]),
        );
        assert_eq!(
            states,
            vec![
                SiteState { name: "a.local.conf".into(), enabled: true },
                SiteState { name: "b.local.conf".into(), enabled: false },
                SiteState { name: "c.local.conf".into(), enabled: true },
            ]
        );
    }

    #[test]
    fn test_state_independent_of_enumeration_order() {
        let names = ["x.conf", "m.conf", "a.conf", "q.conf"];
        let enabled = ["q.conf", "a.conf"];
        let forward = site_states(&set(&names), &set(&enabled));

        let mut reversed_names = names;
        reversed_names.reverse();
        let mut reversed_enabled = enabled;
        reversed_enabled.reverse();
        let backward = site_states(&set(&reversed_names), &set(&reversed_enabled));

        assert_eq!(forward, backward);
        for state in forward {
            assert_eq!(state.enabled, enabled.contains(&state.name.as_str()));
        }
    }

    #[test]
    fn test_list_sites_reads_directories() {
        let dir = TempDir::new().unwrap();
        let available = dir.path().join("sites-available");
        let enabled = dir.path().join("sites-enabled");
        std::fs::create_dir_all(&available).unwrap();
        std::fs::create_dir_all(&enabled).unwrap();
        for name in ["app.local.conf", "000-default.conf", "notes.txt"] {
            std::fs::write(available.join(name), "").unwrap();
        }
        std::fs::write(enabled.join("000-default.conf"), "").unwrap();

        let sites = list_sites(&available, &enabled).unwrap();
        let labels: Vec<String> = sites.iter().map(SiteState::label).collect();
        assert_eq!(labels, vec!["[✓] 000-default.conf", "[ ] app.local.conf"]);
    }

    #[test]
    fn test_missing_enabled_dir_means_all_disabled() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.conf"), "").unwrap();

        let sites = list_sites(dir.path(), &dir.path().join("absent")).unwrap();
        assert_eq!(sites.len(), 1);
        assert!(!sites[0].enabled);
    }

    #[test]
    fn test_action_for_site() {
        let on = SiteState { name: "a.conf".into(), enabled: true };
        let off = SiteState { name: "a.conf".into(), enabled: false };
        assert_eq!(ToggleAction::for_site(&on), ToggleAction::Disable);
        assert_eq!(ToggleAction::for_site(&off), ToggleAction::Enable);
    }

    #[test]
    fn test_terminal_chooser_picks_number() {
        let mut out = Vec::new();
        let options = vec!["[ ] a.conf".to_string(), "[✓] b.conf".to_string()];
        let choice = TerminalChooser::new(&b"2\n"[..], &mut out)
            .choose("Pick:", &options)
            .unwrap();
        assert_eq!(choice, Some(1));

        let menu = String::from_utf8(out).unwrap();
        assert!(menu.contains(" 1) [ ] a.conf"));
        assert!(menu.contains(" 2) [✓] b.conf"));
    }

    #[test]
    fn test_terminal_chooser_retries_out_of_range() {
        let mut out = Vec::new();
        let options = vec!["a".to_string()];
        let choice = TerminalChooser::new(&b"7\nfoo\n1\n"[..], &mut out)
            .choose("Pick:", &options)
            .unwrap();
        assert_eq!(choice, Some(0));
        assert!(String::from_utf8(out).unwrap().contains("between 1 and 1"));
    }

    struct ClosedInput;

    impl io::Read for ClosedInput {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "stdin closed"))
        }
    }

    #[test]
    fn test_terminal_chooser_read_failure_is_terminal_error() {
        let options = vec!["a".to_string()];
        let err = TerminalChooser::new(io::BufReader::new(ClosedInput), Vec::new())
            .choose("Pick:", &options)
            .unwrap_err();
        assert!(matches!(err, Error::Terminal(_)));
        assert!(err.to_string().contains("stdin closed"));
    }

    #[test]
    fn test_terminal_chooser_cancel() {
        let options = vec!["a".to_string()];
        for input in [&b"\n"[..], &b"q\n"[..], &b""[..]] {
            let choice = TerminalChooser::new(input, Vec::new())
                .choose("Pick:", &options)
                .unwrap();
            assert_eq!(choice, None);
        }
    }
}
