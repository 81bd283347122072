// Copyright 2025 Jayashankar
// SPDX-License-Identifier: Apache-2.0

use crate::issuer::IssueStep;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("CA {what} not found at {path}. The root CA must exist before issuing certificates.")]
    CaNotFound { what: &'static str, path: PathBuf },

    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to remove {path}: {source}")]
    Remove {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to read file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to read directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write file {path}: {source}")]
    WriteFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to set permissions on {path}: {source}")]
    Permissions {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Terminal I/O failed: {0}")]
    Terminal(#[source] std::io::Error),

    #[error("Certificate generation failed: {0}")]
    CertGen(#[from] rcgen::Error),

    #[error("Invalid domain '{domain}': {reason}")]
    InvalidDomain { domain: String, reason: String },

    #[error("Invalid validity period: {0}")]
    InvalidDays(String),

    #[error("Invalid path (non-UTF8): {0}")]
    InvalidPath(std::path::PathBuf),

    #[error("Command '{command}' not found.\n{hint}")]
    CommandNotFound { command: String, hint: String },

    #[error("Command failed: {command}\n{stderr}")]
    Command { command: String, stderr: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse certificate: {0}")]
    CertParse(String),

    #[error("Failed to parse CSR: {0}")]
    CsrParse(String),

    #[error("Invalid extension file: {0}")]
    ExtensionFile(String),

    #[error("Certificate issuance failed at step '{step}': {source}")]
    IssueFailed {
        step: IssueStep,
        #[source]
        source: Box<Error>,
    },

    #[error("Another provisioning run holds the lock for '{domain}' ({path})")]
    Locked { domain: String, path: PathBuf },

    #[error("Web server configuration is invalid:\n{diagnostics}")]
    ConfigInvalid { diagnostics: String },
}

impl Error {
    /// The issuance step that failed, if this error came out of the issuance pipeline.
    pub fn failed_step(&self) -> Option<IssueStep> {
        match self {
            Error::IssueFailed { step, .. } => Some(*step),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
