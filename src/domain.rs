// Copyright 2025 Jayashankar
// SPDX-License-Identifier: Apache-2.0

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

/// One or more DNS labels separated by dots.
/// Labels are 1-63 characters, alphanumeric with inner hyphens.
static HOSTNAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?(\.[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*$")
        .expect("invalid hostname regex")
});

/// Maximum DNS name length per RFC 1035
const MAX_DNS_NAME_LENGTH: usize = 253;

/// A validated local hostname.
///
/// The same string becomes the certificate common name, the vhost `ServerName`,
/// the hosts-file key and the base name of every file written for the site, so it
/// must be safe as a file name as well as a DNS name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Domain(String);

impl Domain {
    pub fn parse(domain: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidDomain {
            domain: domain.to_string(),
            reason: reason.to_string(),
        };

        if domain.is_empty() {
            return Err(invalid("domain cannot be empty"));
        }
        if domain.len() > MAX_DNS_NAME_LENGTH {
            return Err(invalid(&format!(
                "DNS name exceeds maximum length of {} characters",
                MAX_DNS_NAME_LENGTH
            )));
        }
        if domain.contains('\0') {
            return Err(invalid("domain contains null byte"));
        }
        if domain.contains('%') {
            return Err(invalid("domain contains percent encoding"));
        }
        if domain.contains("..") {
            return Err(invalid("domain contains path traversal sequence"));
        }
        if domain.contains('/') || domain.contains('\\') {
            return Err(invalid("domain contains path separator"));
        }
        if domain.starts_with('.') || domain.ends_with('.') {
            return Err(invalid("domain cannot start or end with a dot"));
        }
        if !HOSTNAME_REGEX.is_match(domain) {
            return Err(invalid(
                "labels must be 1-63 letters, digits or inner hyphens",
            ));
        }

        Ok(Self(domain.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name of the site configuration for this domain.
    pub fn conf_name(&self) -> String {
        format!("{}.conf", self.0)
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Domain {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
