// Copyright 2025 Jayashankar
// SPDX-License-Identifier: Apache-2.0

//! Parse X.509 certificates without shelling out to openssl.

use crate::error::{Error, Result};
use std::path::Path;
use ::time::OffsetDateTime;
use x509_parser::prelude::*;

#[derive(Debug, Clone)]
pub struct CertInfo {
    pub not_after_timestamp: i64,
    pub common_name: Option<String>,
    pub subject_alt_names: Vec<String>,
    pub is_ca: bool,
    /// Extended Key Usage includes TLS server authentication
    pub server_auth: bool,
    /// Dotted OID of the issuer's signature algorithm
    pub signature_algorithm: String,
    /// Modulus size when the subject key is RSA
    pub rsa_key_bits: Option<usize>,
}

/// sha256WithRSAEncryption
pub const OID_SHA256_WITH_RSA: &str = "1.2.840.113549.1.1.11";
/// ecdsa-with-SHA256
pub const OID_ECDSA_WITH_SHA256: &str = "1.2.840.10045.4.3.2";

const SECONDS_PER_DAY: i64 = 86_400;

impl CertInfo {
    pub fn expiry_string(&self) -> String {
        match OffsetDateTime::from_unix_timestamp(self.not_after_timestamp) {
            Ok(dt) => format!("{}-{:02}-{:02}", dt.year(), dt.month() as u8, dt.day()),
            Err(_) => "Invalid date".to_string(),
        }
    }

    /// Whole days between `now` and not-after, rounded down. A certificate
    /// that expired less than a day ago has -1 days left.
    pub fn days_remaining_at(&self, now: OffsetDateTime) -> i64 {
        match OffsetDateTime::from_unix_timestamp(self.not_after_timestamp) {
            Ok(expiry) => (expiry - now).whole_seconds().div_euclid(SECONDS_PER_DAY),
            Err(_) => -1, // Treat invalid timestamps as expired
        }
    }

    pub fn days_remaining(&self) -> i64 {
        self.days_remaining_at(OffsetDateTime::now_utc())
    }

    /// Signed with SHA-256 (RSA or ECDSA).
    pub fn is_sha256_signed(&self) -> bool {
        self.signature_algorithm == OID_SHA256_WITH_RSA
            || self.signature_algorithm == OID_ECDSA_WITH_SHA256
    }
}

pub fn parse_cert_file(path: &Path) -> Result<CertInfo> {
    let pem_data = std::fs::read_to_string(path).map_err(|e| Error::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_cert_pem(&pem_data)
}

pub fn parse_cert_pem(pem_str: &str) -> Result<CertInfo> {
    let pem = ::pem::parse(pem_str)
        .map_err(|e| Error::CertParse(format!("Failed to parse PEM: {}", e)))?;

    if pem.tag() != "CERTIFICATE" {
        return Err(Error::CertParse(format!(
            "Expected CERTIFICATE, got {}",
            pem.tag()
        )));
    }

    let (_, cert) = X509Certificate::from_der(pem.contents())
        .map_err(|e| Error::CertParse(format!("Invalid X.509: {}", e)))?;

    let not_after_timestamp = cert.validity().not_after.timestamp();

    let signature_algorithm = cert.signature_algorithm.algorithm.to_id_string();
    let rsa_key_bits = match cert.public_key().parsed() {
        Ok(x509_parser::public_key::PublicKey::RSA(rsa)) => Some(rsa.key_size()),
        _ => None,
    };

    let common_name = cert
        .subject()
        .iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .map(String::from);

    let mut subject_alt_names = Vec::new();
    let mut is_ca = false;
    let mut server_auth = false;

    for ext in cert.extensions() {
        match ext.parsed_extension() {
            ParsedExtension::SubjectAlternativeName(san) => {
                for name in &san.general_names {
                    match name {
                        GeneralName::DNSName(dns) => subject_alt_names.push(dns.to_string()),
                        GeneralName::IPAddress(ip_bytes) if ip_bytes.len() == 4 => {
                            let ip = std::net::Ipv4Addr::new(
                                ip_bytes[0],
                                ip_bytes[1],
                                ip_bytes[2],
                                ip_bytes[3],
                            );
                            subject_alt_names.push(ip.to_string());
                        }
                        GeneralName::IPAddress(ip_bytes) if ip_bytes.len() == 16 => {
                            if let Ok(bytes) = <[u8; 16]>::try_from(*ip_bytes) {
                                subject_alt_names.push(std::net::Ipv6Addr::from(bytes).to_string());
                            }
                        }
                        _ => {}
                    }
                }
            }
            ParsedExtension::BasicConstraints(bc) => {
                is_ca = bc.ca;
            }
            ParsedExtension::ExtendedKeyUsage(eku) => {
                server_auth = eku.server_auth;
            }
            _ => {}
        }
    }

    Ok(CertInfo {
        not_after_timestamp,
        common_name,
        subject_alt_names,
        is_ca,
        server_auth,
        signature_algorithm,
        rsa_key_bits,
    })
}
