// Copyright 2025 Jayashankar
// SPDX-License-Identifier: Apache-2.0

//! Register domains in the system hosts file.

use crate::domain::Domain;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

pub const LOOPBACK_ADDRESS: &str = "127.0.0.1";

/// How an existing mapping for a domain is detected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostsMatch {
    /// The domain string appears anywhere in the file, comments included.
    /// `app.local` is considered present when only `myapp.local` is mapped.
    #[default]
    Substring,
    /// The domain is one of the hostnames of a non-comment entry.
    Exact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostsOutcome {
    Added,
    AlreadyPresent,
}

/// One address line of a hosts file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostsEntry {
    pub address: String,
    pub hostnames: Vec<String>,
}

/// Parse address lines, dropping comments, blank lines and lines without hostnames.
pub fn parse_hosts(content: &str) -> Vec<HostsEntry> {
    content
        .lines()
        .filter_map(|line| {
            let line = line.split('#').next().unwrap_or_default();
            let mut fields = line.split_whitespace();
            let address = fields.next()?;
            let hostnames: Vec<String> = fields.map(String::from).collect();
            if hostnames.is_empty() {
                return None;
            }
            Some(HostsEntry {
                address: address.to_string(),
                hostnames,
            })
        })
        .collect()
}

pub fn contains_domain(content: &str, domain: &Domain, mode: HostsMatch) -> bool {
    match mode {
        HostsMatch::Substring => content.contains(domain.as_str()),
        HostsMatch::Exact => parse_hosts(content).iter().any(|entry| {
            entry
                .hostnames
                .iter()
                .any(|h| h.eq_ignore_ascii_case(domain.as_str()))
        }),
    }
}

/// Append `127.0.0.1 <domain>` unless the domain is already present.
pub fn ensure_hosts_entry(path: &Path, domain: &Domain, mode: HostsMatch) -> Result<HostsOutcome> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    if contains_domain(&content, domain, mode) {
        return Ok(HostsOutcome::AlreadyPresent);
    }

    let mut entry = String::new();
    if !content.is_empty() && !content.ends_with('\n') {
        entry.push('\n');
    }
    entry.push_str(&format!("{} {}\n", LOOPBACK_ADDRESS, domain));

    let mut file = OpenOptions::new()
        .append(true)
        .open(path)
        .map_err(|e| Error::WriteFile {
            path: path.to_path_buf(),
            source: e,
        })?;
    file.write_all(entry.as_bytes())
        .map_err(|e| Error::WriteFile {
            path: path.to_path_buf(),
            source: e,
        })?;

    Ok(HostsOutcome::Added)
}
