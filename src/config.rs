// Copyright 2025 Jayashankar
// SPDX-License-Identifier: Apache-2.0

use crate::error::{Error, Result};
use crate::expiry::DEFAULT_RENEW_WITHIN_DAYS;
use crate::hosts::HostsMatch;
use crate::issuer::IssueOptions;
use crate::server::ServerCommands;
use crate::toolchain::{CaPaths, ToolchainKind, DEFAULT_CERT_DAYS, DEFAULT_KEY_BITS};
use crate::vhost::DEFAULT_LOG_DIR;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Current config file version. Increment when making breaking changes.
const CONFIG_VERSION: u32 = 1;

/// Maximum certificate validity period (10 years).
pub const MAX_CERT_DAYS: u32 = 3650;

/// Environment variable pointing at an explicit config file.
pub const CONFIG_ENV: &str = "DEVHOST_CONFIG";

/// System-wide config location, used when no per-user file exists.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/devhost/config.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Config file version for future migration support
    #[serde(default = "default_config_version")]
    pub config_version: u32,
    #[serde(default)]
    pub ca: CaConfig,
    /// Parent of the per-domain certificate directories; the working directory if unset
    #[serde(default)]
    pub cert_root: Option<PathBuf>,
    #[serde(default = "default_sites_available")]
    pub sites_available: PathBuf,
    #[serde(default = "default_sites_enabled")]
    pub sites_enabled: PathBuf,
    #[serde(default = "default_hosts_file")]
    pub hosts_file: PathBuf,
    #[serde(default)]
    pub hosts_match: HostsMatch,
    #[serde(default = "default_renew_within_days")]
    pub renew_within_days: u32,
    #[serde(default = "default_cert_days")]
    pub cert_days: u32,
    #[serde(default = "default_key_bits")]
    pub key_bits: u32,
    #[serde(default)]
    pub toolchain: ToolchainKind,
    /// openssl executable used by the openssl toolchain
    #[serde(default = "default_openssl")]
    pub openssl: String,
    /// Directory expression for ErrorLog/CustomLog in generated vhosts
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default)]
    pub server: ServerCommands,
}

/// Location of the pre-existing root CA.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaConfig {
    #[serde(default = "default_ca_cert")]
    pub cert: PathBuf,
    #[serde(default = "default_ca_key")]
    pub key: PathBuf,
}

impl Default for CaConfig {
    fn default() -> Self {
        Self {
            cert: default_ca_cert(),
            key: default_ca_key(),
        }
    }
}

fn default_config_version() -> u32 {
    CONFIG_VERSION
}

fn default_ca_cert() -> PathBuf {
    PathBuf::from("/etc/devhost/rootCA.pem")
}

fn default_ca_key() -> PathBuf {
    PathBuf::from("/etc/devhost/rootCA.key")
}

fn default_sites_available() -> PathBuf {
    PathBuf::from("/etc/apache2/sites-available")
}

fn default_sites_enabled() -> PathBuf {
    PathBuf::from("/etc/apache2/sites-enabled")
}

fn default_hosts_file() -> PathBuf {
    PathBuf::from("/etc/hosts")
}

fn default_renew_within_days() -> u32 {
    DEFAULT_RENEW_WITHIN_DAYS
}

fn default_cert_days() -> u32 {
    DEFAULT_CERT_DAYS
}

fn default_key_bits() -> u32 {
    DEFAULT_KEY_BITS
}

fn default_openssl() -> String {
    "openssl".to_string()
}

fn default_log_dir() -> String {
    DEFAULT_LOG_DIR.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_version: CONFIG_VERSION,
            ca: CaConfig::default(),
            cert_root: None,
            sites_available: default_sites_available(),
            sites_enabled: default_sites_enabled(),
            hosts_file: default_hosts_file(),
            hosts_match: HostsMatch::default(),
            renew_within_days: default_renew_within_days(),
            cert_days: default_cert_days(),
            key_bits: default_key_bits(),
            toolchain: ToolchainKind::default(),
            openssl: default_openssl(),
            log_dir: default_log_dir(),
            server: ServerCommands::default(),
        }
    }
}

/// Validate that the validity period is within allowed bounds.
pub fn validate_days(days: u32) -> Result<()> {
    if days == 0 {
        return Err(Error::InvalidDays("days cannot be 0".into()));
    }
    if days > MAX_CERT_DAYS {
        return Err(Error::InvalidDays(format!(
            "days cannot exceed {} (10 years)",
            MAX_CERT_DAYS
        )));
    }
    Ok(())
}

/// Reject a renewal window that is not shorter than the validity period.
pub fn validate_renew_window(renew_within_days: u32, cert_days: u32) -> Result<()> {
    if renew_within_days >= cert_days {
        return Err(Error::Config(format!(
            "renew_within_days ({}) must be less than cert_days ({}), \
             otherwise every run reissues the certificate",
            renew_within_days, cert_days
        )));
    }
    Ok(())
}

/// RSA sizes the builtin toolchain can generate.
const BUILTIN_KEY_BITS: [u32; 3] = [2048, 3072, 4096];

impl Config {
    /// Config file to use: `$DEVHOST_CONFIG`, else the per-user file if it
    /// exists, else the system-wide file.
    pub fn default_path() -> PathBuf {
        if let Ok(custom) = std::env::var(CONFIG_ENV) {
            if !custom.is_empty() {
                return PathBuf::from(custom);
            }
        }

        if let Some(proj_dirs) = ProjectDirs::from("", "", "devhost") {
            let user_config = proj_dirs.config_dir().join("config.toml");
            if user_config.exists() {
                return user_config;
            }
        }

        PathBuf::from(SYSTEM_CONFIG_PATH)
    }

    /// Load from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let config: Self = if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|e| Error::ReadFile {
                path: path.to_path_buf(),
                source: e,
            })?;
            toml::from_str(&content).map_err(|e| Error::Config(e.to_string()))?
        } else {
            Self::default()
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.config_version > CONFIG_VERSION {
            eprintln!(
                "Warning: config.toml version {} is newer than supported version {}.",
                self.config_version, CONFIG_VERSION
            );
            eprintln!("         Some settings may not be recognized. Consider upgrading devhost.");
        }

        validate_days(self.cert_days)?;

        validate_renew_window(self.renew_within_days, self.cert_days)?;

        if !(2048..=16384).contains(&self.key_bits) {
            return Err(Error::Config(format!(
                "key_bits must be between 2048 and 16384, got {}",
                self.key_bits
            )));
        }

        if self.toolchain == ToolchainKind::Builtin && !BUILTIN_KEY_BITS.contains(&self.key_bits) {
            return Err(Error::Config(format!(
                "toolchain = \"builtin\" supports key_bits of 2048, 3072 or 4096, got {}",
                self.key_bits
            )));
        }

        if self.openssl.trim().is_empty() {
            return Err(Error::Config("openssl cannot be empty".into()));
        }

        self.server.validate()
    }

    pub fn ca_paths(&self) -> CaPaths {
        CaPaths::new(&self.ca.cert, &self.ca.key)
    }

    /// Directory holding the per-domain certificate directories.
    pub fn cert_root(&self) -> Result<PathBuf> {
        match &self.cert_root {
            Some(root) => Ok(root.clone()),
            None => std::env::current_dir().map_err(|e| {
                Error::Config(format!("Cannot determine current directory: {}", e))
            }),
        }
    }

    pub fn issue_options(&self) -> IssueOptions {
        IssueOptions {
            renew_within_days: self.renew_within_days,
            cert_days: self.cert_days,
            key_bits: self.key_bits,
            force: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn load_str(content: &str) -> Result<Config> {
        let mut file = NamedTempFile::new().expect("temp file should be created");
        write!(file, "{}", content).expect("write config should succeed");
        Config::load(file.path())
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.renew_within_days, 30);
        assert_eq!(config.cert_days, 825);
        assert_eq!(config.key_bits, 2048);
        assert_eq!(config.toolchain, ToolchainKind::OpenSsl);
        assert_eq!(config.hosts_match, HostsMatch::Substring);
        assert_eq!(config.hosts_file, PathBuf::from("/etc/hosts"));
        assert_eq!(config.server.enable_site, vec!["a2ensite".to_string()]);
    }

    #[test]
    fn test_config_load_missing_file() {
        let path = PathBuf::from("/nonexistent/devhost/config.toml");
        let config = Config::load(&path).expect("missing config should fall back to defaults");
        assert_eq!(config.cert_days, 825);
    }

    #[test]
    fn test_config_load_custom_values() {
        let config = load_str(
            r#"
cert_root = "/srv/certs"
sites_available = "/tmp/avail"
hosts_match = "exact"
toolchain = "builtin"
renew_within_days = 10

[ca]
cert = "/opt/ca/rootCA.pem"

[server]
restart = ["service", "apache2", "restart"]
"#,
        )
        .expect("config should load");

        assert_eq!(config.cert_root, Some(PathBuf::from("/srv/certs")));
        assert_eq!(config.sites_available, PathBuf::from("/tmp/avail"));
        assert_eq!(config.sites_enabled, PathBuf::from("/etc/apache2/sites-enabled"));
        assert_eq!(config.hosts_match, HostsMatch::Exact);
        assert_eq!(config.toolchain, ToolchainKind::Builtin);
        assert_eq!(config.renew_within_days, 10);
        assert_eq!(config.ca.cert, PathBuf::from("/opt/ca/rootCA.pem"));
        assert_eq!(config.ca.key, PathBuf::from("/etc/devhost/rootCA.key"));
        assert_eq!(config.server.restart, vec!["service", "apache2", "restart"]);
        assert_eq!(config.server.reload, vec!["systemctl", "reload", "apache2"]);
    }

    #[test]
    fn test_config_invalid_cert_days() {
        assert!(load_str("cert_days = 0").is_err());
        assert!(load_str("cert_days = 999999").is_err());
    }

    #[test]
    fn test_config_renew_window_must_fit_validity() {
        let err = load_str("cert_days = 30\nrenew_within_days = 30").unwrap_err();
        assert!(err.to_string().contains("renew_within_days"));
    }

    #[test]
    fn test_config_invalid_key_bits() {
        assert!(load_str("key_bits = 1024").is_err());
        assert!(load_str("key_bits = 8192").is_ok());
        assert!(load_str("toolchain = \"builtin\"\nkey_bits = 8192").is_err());
        assert!(load_str("toolchain = \"builtin\"\nkey_bits = 3072").is_ok());
    }

    #[test]
    fn test_validate_renew_window() {
        assert!(validate_renew_window(0, 825).is_ok());
        assert!(validate_renew_window(824, 825).is_ok());
        assert!(validate_renew_window(825, 825).is_err());
        assert!(validate_renew_window(900, 825).is_err());
    }

    #[test]
    fn test_config_empty_server_command() {
        assert!(load_str("[server]\nconfig_test = []").is_err());
    }

    #[test]
    fn test_config_unknown_toolchain() {
        assert!(matches!(load_str("toolchain = \"gnutls\""), Err(Error::Config(_))));
    }

    #[test]
    fn test_cert_root_defaults_to_current_dir() {
        let config = Config::default();
        assert_eq!(config.cert_root().unwrap(), std::env::current_dir().unwrap());
    }

    #[test]
    fn test_config_env_override() {
        let original = std::env::var(CONFIG_ENV).ok();
        std::env::set_var(CONFIG_ENV, "/tmp/devhost-test/config.toml");

        assert_eq!(
            Config::default_path(),
            PathBuf::from("/tmp/devhost-test/config.toml")
        );

        match original {
            Some(val) => std::env::set_var(CONFIG_ENV, val),
            None => std::env::remove_var(CONFIG_ENV),
        }
    }
}
