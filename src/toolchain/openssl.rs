// Copyright 2025 Jayashankar
// SPDX-License-Identifier: Apache-2.0

use crate::error::Result;
use crate::fs::path_to_str;
use crate::process::run_checked;
use crate::toolchain::{CertToolchain, SignRequest};
use std::path::Path;

/// Drives the `openssl` command line tool, one process per step.
pub struct OpenSslToolchain {
    program: String,
}

impl OpenSslToolchain {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub(crate) fn genrsa_args(key_path: &str, bits: u32) -> Vec<String> {
        vec![
            "genrsa".into(),
            "-out".into(),
            key_path.into(),
            bits.to_string(),
        ]
    }

    pub(crate) fn req_args(key_path: &str, csr_path: &str, common_name: &str) -> Vec<String> {
        vec![
            "req".into(),
            "-new".into(),
            "-key".into(),
            key_path.into(),
            "-out".into(),
            csr_path.into(),
            "-subj".into(),
            format!("/CN={}", common_name),
        ]
    }

    pub(crate) fn x509_args(request: &SignRequest<'_>) -> Result<Vec<String>> {
        Ok(vec![
            "x509".into(),
            "-req".into(),
            "-in".into(),
            path_to_str(request.csr)?.into(),
            "-CA".into(),
            path_to_str(&request.ca.cert)?.into(),
            "-CAkey".into(),
            path_to_str(&request.ca.key)?.into(),
            "-CAcreateserial".into(),
            "-out".into(),
            path_to_str(request.cert_out)?.into(),
            "-days".into(),
            request.days.to_string(),
            "-sha256".into(),
            "-extfile".into(),
            path_to_str(request.ext_file)?.into(),
        ])
    }
}

impl Default for OpenSslToolchain {
    fn default() -> Self {
        Self::new("openssl")
    }
}

impl CertToolchain for OpenSslToolchain {
    fn generate_key(&self, key_path: &Path, bits: u32) -> Result<()> {
        run_checked(&self.program, &Self::genrsa_args(path_to_str(key_path)?, bits))?;
        Ok(())
    }

    fn generate_csr(&self, key_path: &Path, csr_path: &Path, common_name: &str) -> Result<()> {
        let args = Self::req_args(path_to_str(key_path)?, path_to_str(csr_path)?, common_name);
        run_checked(&self.program, &args)?;
        Ok(())
    }

    fn sign(&self, request: &SignRequest<'_>) -> Result<()> {
        run_checked(&self.program, &Self::x509_args(request)?)?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "openssl"
    }
}
