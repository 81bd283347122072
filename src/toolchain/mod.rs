// Copyright 2025 Jayashankar
// SPDX-License-Identifier: Apache-2.0

mod builtin;
mod openssl;

pub use builtin::BuiltinToolchain;
pub use openssl::OpenSslToolchain;

use crate::domain::Domain;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

/// Validity of issued leaf certificates, in days.
pub const DEFAULT_CERT_DAYS: u32 = 825;

/// RSA modulus size for generated keys.
pub const DEFAULT_KEY_BITS: u32 = 2048;

/// The pre-existing root CA used to sign. Read-only apart from its serial file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

impl CaPaths {
    pub fn new(cert: impl Into<PathBuf>, key: impl Into<PathBuf>) -> Self {
        Self {
            cert: cert.into(),
            key: key.into(),
        }
    }

    /// Serial-number tracking file kept alongside the CA certificate
    /// (`rootCA.pem` -> `rootCA.srl`), as `-CAcreateserial` does.
    pub fn serial_path(&self) -> PathBuf {
        self.cert.with_extension("srl")
    }

    pub fn ensure_exists(&self) -> Result<()> {
        if !self.cert.is_file() {
            return Err(Error::CaNotFound {
                what: "certificate",
                path: self.cert.clone(),
            });
        }
        if !self.key.is_file() {
            return Err(Error::CaNotFound {
                what: "private key",
                path: self.key.clone(),
            });
        }
        Ok(())
    }
}

/// Inputs of the CA signing step.
#[derive(Debug, Clone, Copy)]
pub struct SignRequest<'a> {
    pub csr: &'a Path,
    pub ca: &'a CaPaths,
    pub ext_file: &'a Path,
    pub cert_out: &'a Path,
    pub days: u32,
}

/// Key generation, CSR generation and CA signing over files.
///
/// Each method is one step of the issuance pipeline and must either fully
/// succeed or return an error.
pub trait CertToolchain {
    fn generate_key(&self, key_path: &Path, bits: u32) -> Result<()>;
    fn generate_csr(&self, key_path: &Path, csr_path: &Path, common_name: &str) -> Result<()>;
    fn sign(&self, request: &SignRequest<'_>) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// Which toolchain implementation to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolchainKind {
    /// The `openssl` command line tool
    #[default]
    OpenSsl,
    /// In-process signing with rcgen
    Builtin,
}

impl ToolchainKind {
    pub fn create(self, openssl_program: &str) -> Box<dyn CertToolchain> {
        match self {
            ToolchainKind::OpenSsl => Box::new(OpenSslToolchain::new(openssl_program)),
            ToolchainKind::Builtin => Box::new(BuiltinToolchain::new()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyUsage {
    DigitalSignature,
    NonRepudiation,
    KeyEncipherment,
    DataEncipherment,
    KeyAgreement,
}

impl KeyUsage {
    pub fn as_str(self) -> &'static str {
        match self {
            KeyUsage::DigitalSignature => "digitalSignature",
            KeyUsage::NonRepudiation => "nonRepudiation",
            KeyUsage::KeyEncipherment => "keyEncipherment",
            KeyUsage::DataEncipherment => "dataEncipherment",
            KeyUsage::KeyAgreement => "keyAgreement",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "digitalSignature" => KeyUsage::DigitalSignature,
            "nonRepudiation" => KeyUsage::NonRepudiation,
            "keyEncipherment" => KeyUsage::KeyEncipherment,
            "dataEncipherment" => KeyUsage::DataEncipherment,
            "keyAgreement" => KeyUsage::KeyAgreement,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtendedKeyUsage {
    ServerAuth,
    ClientAuth,
}

impl ExtendedKeyUsage {
    pub fn as_str(self) -> &'static str {
        match self {
            ExtendedKeyUsage::ServerAuth => "serverAuth",
            ExtendedKeyUsage::ClientAuth => "clientAuth",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "serverAuth" => Some(ExtendedKeyUsage::ServerAuth),
            "clientAuth" => Some(ExtendedKeyUsage::ClientAuth),
            _ => None,
        }
    }
}

/// X.509v3 extensions applied when the CA signs a leaf certificate.
///
/// Rendered to (and parsed from) the openssl `-extfile` format so both
/// toolchains read the same file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionProfile {
    pub dns_names: Vec<String>,
    pub ip_addresses: Vec<IpAddr>,
    pub is_ca: bool,
    pub key_usage_critical: bool,
    pub key_usages: Vec<KeyUsage>,
    pub extended_key_usages: Vec<ExtendedKeyUsage>,
}

impl ExtensionProfile {
    /// Server profile: the domain plus `localhost` and `127.0.0.1`.
    pub fn for_domain(domain: &Domain) -> Self {
        Self {
            dns_names: vec![domain.to_string(), "localhost".to_string()],
            ip_addresses: vec![IpAddr::V4(Ipv4Addr::LOCALHOST)],
            is_ca: false,
            key_usage_critical: true,
            key_usages: vec![
                KeyUsage::DigitalSignature,
                KeyUsage::KeyEncipherment,
                KeyUsage::DataEncipherment,
            ],
            extended_key_usages: vec![ExtendedKeyUsage::ServerAuth],
        }
    }

    pub fn render(&self) -> String {
        let sans: Vec<String> = self
            .dns_names
            .iter()
            .map(|d| format!("DNS:{}", d))
            .chain(self.ip_addresses.iter().map(|ip| format!("IP:{}", ip)))
            .collect();

        let mut key_usage: Vec<&str> = Vec::new();
        if self.key_usage_critical {
            key_usage.push("critical");
        }
        key_usage.extend(self.key_usages.iter().map(|u| u.as_str()));

        let eku: Vec<&str> = self.extended_key_usages.iter().map(|u| u.as_str()).collect();

        format!(
            "subjectAltName = {}\nbasicConstraints = CA:{}\nkeyUsage = {}\nextendedKeyUsage = {}\n",
            sans.join(", "),
            if self.is_ca { "TRUE" } else { "FALSE" },
            key_usage.join(", "),
            eku.join(", "),
        )
    }

    pub fn parse(content: &str) -> Result<Self> {
        let mut profile = Self {
            dns_names: Vec::new(),
            ip_addresses: Vec::new(),
            is_ca: false,
            key_usage_critical: false,
            key_usages: Vec::new(),
            extended_key_usages: Vec::new(),
        };

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, value) = line
                .split_once('=')
                .ok_or_else(|| Error::ExtensionFile(format!("expected 'key = value': {}", line)))?;
            let items = value.split(',').map(str::trim).filter(|s| !s.is_empty());

            match key.trim() {
                "subjectAltName" => {
                    for item in items {
                        if let Some(dns) = item.strip_prefix("DNS:") {
                            profile.dns_names.push(dns.to_string());
                        } else if let Some(ip) = item.strip_prefix("IP:") {
                            let ip = ip.parse().map_err(|_| {
                                Error::ExtensionFile(format!("invalid IP address: {}", ip))
                            })?;
                            profile.ip_addresses.push(ip);
                        } else {
                            return Err(Error::ExtensionFile(format!(
                                "unsupported subjectAltName entry: {}",
                                item
                            )));
                        }
                    }
                }
                "basicConstraints" => {
                    for item in items {
                        match item {
                            "CA:TRUE" => profile.is_ca = true,
                            "CA:FALSE" => profile.is_ca = false,
                            "critical" => {}
                            other => {
                                return Err(Error::ExtensionFile(format!(
                                    "unsupported basicConstraints value: {}",
                                    other
                                )))
                            }
                        }
                    }
                }
                "keyUsage" => {
                    for item in items {
                        if item == "critical" {
                            profile.key_usage_critical = true;
                            continue;
                        }
                        let usage = KeyUsage::from_name(item).ok_or_else(|| {
                            Error::ExtensionFile(format!("unsupported keyUsage: {}", item))
                        })?;
                        profile.key_usages.push(usage);
                    }
                }
                "extendedKeyUsage" => {
                    for item in items {
                        let usage = ExtendedKeyUsage::from_name(item).ok_or_else(|| {
                            Error::ExtensionFile(format!("unsupported extendedKeyUsage: {}", item))
                        })?;
                        profile.extended_key_usages.push(usage);
                    }
                }
                other => {
                    return Err(Error::ExtensionFile(format!("unsupported extension: {}", other)))
                }
            }
        }

        Ok(profile)
    }
}
