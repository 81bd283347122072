// Copyright 2025 Jayashankar
// SPDX-License-Identifier: Apache-2.0

//! In-process toolchain built on rcgen.
//!
//! Produces the same files as the openssl toolchain (PEM key, PEM CSR, PEM
//! certificate, hex serial file next to the CA) so bundles can be mixed.
//! Keys are RSA with SHA-256 signatures, in the sizes aws-lc supports.

use crate::error::{Error, Result};
use crate::fs::{atomic_write, write_secret_file};
use crate::toolchain::{CertToolchain, ExtendedKeyUsage, ExtensionProfile, KeyUsage, SignRequest};
use rcgen::{
    CertificateParams, CertificateSigningRequestParams, DnType, ExtendedKeyUsagePurpose, IsCa,
    Issuer, KeyPair, KeyUsagePurpose, RsaKeySize, SanType, SerialNumber, PKCS_RSA_SHA256,
};
use std::fs;
use std::path::Path;

/// Length of freshly created serial numbers, in bytes.
const SERIAL_LEN: usize = 16;

#[derive(Debug, Default)]
pub struct BuiltinToolchain;

impl BuiltinToolchain {
    pub fn new() -> Self {
        Self
    }
}

fn rsa_key_size(bits: u32) -> Result<RsaKeySize> {
    match bits {
        2048 => Ok(RsaKeySize::_2048),
        3072 => Ok(RsaKeySize::_3072),
        4096 => Ok(RsaKeySize::_4096),
        _ => Err(Error::Config(format!(
            "the builtin toolchain generates 2048, 3072 or 4096-bit RSA keys, not {}",
            bits
        ))),
    }
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| Error::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })
}

impl CertToolchain for BuiltinToolchain {
    fn generate_key(&self, key_path: &Path, bits: u32) -> Result<()> {
        let key_pair = KeyPair::generate_rsa_for(&PKCS_RSA_SHA256, rsa_key_size(bits)?)?;
        write_secret_file(key_path, key_pair.serialize_pem().as_bytes())
    }

    fn generate_csr(&self, key_path: &Path, csr_path: &Path, common_name: &str) -> Result<()> {
        let key_pair = KeyPair::from_pem(&read(key_path)?)?;

        let mut params = CertificateParams::default();
        params
            .distinguished_name
            .push(DnType::CommonName, common_name);

        let csr = params.serialize_request(&key_pair)?;
        atomic_write(csr_path, csr.pem()?.as_bytes())
    }

    fn sign(&self, request: &SignRequest<'_>) -> Result<()> {
        let csr_params = CertificateSigningRequestParams::from_pem(&read(request.csr)?)
            .map_err(|e| Error::CsrParse(e.to_string()))?;
        let profile = ExtensionProfile::parse(&read(request.ext_file)?)?;

        let ca_key = KeyPair::from_pem(&read(&request.ca.key)?)?;
        let issuer = Issuer::from_ca_cert_pem(&read(&request.ca.cert)?, ca_key)?;

        let mut params = csr_params.params;
        apply_profile(&mut params, &profile)?;

        let now = time::OffsetDateTime::now_utc();
        params.not_before = now;
        params.not_after = now + time::Duration::days(i64::from(request.days));
        params.serial_number = Some(SerialNumber::from_slice(&next_serial(
            &request.ca.serial_path(),
        )?));
        params.use_authority_key_identifier_extension = true;

        let csr_params = CertificateSigningRequestParams {
            params,
            public_key: csr_params.public_key,
        };
        let cert = csr_params.signed_by(&issuer)?;

        atomic_write(request.cert_out, cert.pem().as_bytes())
    }

    fn name(&self) -> &'static str {
        "builtin"
    }
}

fn apply_profile(params: &mut CertificateParams, profile: &ExtensionProfile) -> Result<()> {
    params.subject_alt_names.clear();
    for name in &profile.dns_names {
        let dns = name.clone().try_into().map_err(|_| Error::InvalidDomain {
            domain: name.clone(),
            reason: "Invalid DNS name".into(),
        })?;
        params.subject_alt_names.push(SanType::DnsName(dns));
    }
    for ip in &profile.ip_addresses {
        params.subject_alt_names.push(SanType::IpAddress(*ip));
    }

    if profile.is_ca {
        return Err(Error::ExtensionFile(
            "refusing to sign a leaf certificate with CA:TRUE".into(),
        ));
    }
    params.is_ca = IsCa::ExplicitNoCa;

    params.key_usages = profile
        .key_usages
        .iter()
        .map(|usage| match usage {
            KeyUsage::DigitalSignature => KeyUsagePurpose::DigitalSignature,
            KeyUsage::NonRepudiation => KeyUsagePurpose::ContentCommitment,
            KeyUsage::KeyEncipherment => KeyUsagePurpose::KeyEncipherment,
            KeyUsage::DataEncipherment => KeyUsagePurpose::DataEncipherment,
            KeyUsage::KeyAgreement => KeyUsagePurpose::KeyAgreement,
        })
        .collect();

    params.extended_key_usages = profile
        .extended_key_usages
        .iter()
        .map(|usage| match usage {
            ExtendedKeyUsage::ServerAuth => ExtendedKeyUsagePurpose::ServerAuth,
            ExtendedKeyUsage::ClientAuth => ExtendedKeyUsagePurpose::ClientAuth,
        })
        .collect();

    Ok(())
}

/// Read, increment and persist the CA serial file; creates it with a random
/// positive serial when missing.
fn next_serial(path: &Path) -> Result<Vec<u8>> {
    let serial = if path.exists() {
        let mut serial = decode_hex(read(path)?.trim()).ok_or_else(|| {
            Error::Config(format!("Serial file {} is not valid hex", path.display()))
        })?;
        increment(&mut serial);
        serial
    } else {
        let mut serial: [u8; SERIAL_LEN] = rand::Rng::random(&mut rand::rng());
        // Positive and without a leading zero byte
        serial[0] = (serial[0] & 0x7f) | 0x01;
        serial.to_vec()
    };

    atomic_write(path, format!("{}\n", encode_hex(&serial)).as_bytes())?;
    Ok(serial)
}

fn increment(serial: &mut Vec<u8>) {
    for byte in serial.iter_mut().rev() {
        let (value, overflow) = byte.overflowing_add(1);
        *byte = value;
        if !overflow {
            return;
        }
    }
    serial.insert(0, 1);
}

fn encode_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02X}", b)).collect()
}

fn decode_hex(s: &str) -> Option<Vec<u8>> {
    if s.is_empty() {
        return None;
    }
    // openssl drops a leading zero nibble
    let padded = if s.len() % 2 == 1 {
        format!("0{}", s)
    } else {
        s.to_string()
    };
    (0..padded.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(padded.get(i..i + 2)?, 16).ok())
        .collect()
}
