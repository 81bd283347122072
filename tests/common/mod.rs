// Copyright 2025 Jayashankar
// SPDX-License-Identifier: Apache-2.0

//! Shared fixtures: a throwaway root CA, a recording web server and a
//! toolchain that counts invocations.

#![allow(dead_code)]

use devhost::{
    BuiltinToolchain, CaConfig, CertToolchain, Config, ConfigTest, Error, Result, ServerControl,
    SignRequest, ToolchainKind,
};
use rcgen::{BasicConstraints, CertificateParams, DnType, IsCa, KeyPair, KeyUsagePurpose};
use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const SYSTEM_HOSTS: &str = "127.0.0.1 localhost\n::1 localhost ip6-localhost\n";

/// Isolated filesystem layout for one test.
pub struct Sandbox {
    pub dir: TempDir,
    pub config: Config,
}

impl Sandbox {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let root = dir.path();

        let ca_dir = root.join("ca");
        std::fs::create_dir_all(&ca_dir).unwrap();
        let (ca_cert, ca_key) = write_root_ca(&ca_dir);

        for sub in ["sites-available", "sites-enabled", "certs"] {
            std::fs::create_dir_all(root.join(sub)).unwrap();
        }
        std::fs::write(root.join("hosts"), SYSTEM_HOSTS).unwrap();

        let config = Config {
            ca: CaConfig {
                cert: ca_cert,
                key: ca_key,
            },
            cert_root: Some(root.join("certs")),
            sites_available: root.join("sites-available"),
            sites_enabled: root.join("sites-enabled"),
            hosts_file: root.join("hosts"),
            toolchain: ToolchainKind::Builtin,
            ..Config::default()
        };

        Self { dir, config }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn hosts(&self) -> String {
        std::fs::read_to_string(&self.config.hosts_file).unwrap()
    }

    pub fn vhost(&self, domain: &str) -> String {
        std::fs::read_to_string(self.config.sites_available.join(format!("{}.conf", domain)))
            .unwrap()
    }
}

/// Write a self-signed CA as `rootCA.pem` / `rootCA.key` in `dir`.
pub fn write_root_ca(dir: &Path) -> (PathBuf, PathBuf) {
    let mut params = CertificateParams::default();
    params
        .distinguished_name
        .push(DnType::CommonName, "devhost Test Root CA");
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params.key_usages = vec![KeyUsagePurpose::KeyCertSign, KeyUsagePurpose::CrlSign];
    let key = KeyPair::generate().unwrap();
    let cert = params.self_signed(&key).unwrap();

    let cert_path = dir.join("rootCA.pem");
    let key_path = dir.join("rootCA.key");
    std::fs::write(&cert_path, cert.pem()).unwrap();
    std::fs::write(&key_path, key.serialize_pem()).unwrap();
    (cert_path, key_path)
}

/// Web server double that records calls and mimics a2ensite/a2dissite
/// by creating and removing files in the enabled directory.
pub struct FakeServer {
    pub calls: RefCell<Vec<String>>,
    pub config_ok: bool,
    pub enabled_dir: Option<PathBuf>,
    pub fail_enable: bool,
}

impl FakeServer {
    pub fn new() -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            config_ok: true,
            enabled_dir: None,
            fail_enable: false,
        }
    }

    pub fn with_enabled_dir(dir: &Path) -> Self {
        Self {
            enabled_dir: Some(dir.to_path_buf()),
            ..Self::new()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn record(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }
}

impl ServerControl for FakeServer {
    fn enable_site(&self, site: &str) -> Result<()> {
        self.record(format!("enable {}", site));
        if self.fail_enable {
            return Err(Error::Command {
                command: format!("a2ensite {}", site),
                stderr: format!("ERROR: Site {} does not exist!", site),
            });
        }
        if let Some(dir) = &self.enabled_dir {
            std::fs::write(dir.join(site), "").unwrap();
        }
        Ok(())
    }

    fn disable_site(&self, site: &str) -> Result<()> {
        self.record(format!("disable {}", site));
        if let Some(dir) = &self.enabled_dir {
            std::fs::remove_file(dir.join(site)).unwrap();
        }
        Ok(())
    }

    fn config_test(&self) -> Result<ConfigTest> {
        self.record("configtest".to_string());
        Ok(ConfigTest {
            ok: self.config_ok,
            diagnostics: if self.config_ok {
                String::new()
            } else {
                "AH00526: Syntax error on line 12".to_string()
            },
        })
    }

    fn reload(&self) -> Result<bool> {
        self.record("reload".to_string());
        Ok(true)
    }

    fn restart(&self) -> Result<bool> {
        self.record("restart".to_string());
        Ok(true)
    }
}

/// Builtin toolchain that counts calls and can be made to fail at one step.
pub struct CountingToolchain {
    inner: BuiltinToolchain,
    pub calls: Cell<usize>,
    pub fail_on: Option<&'static str>,
}

impl CountingToolchain {
    pub fn new() -> Self {
        Self {
            inner: BuiltinToolchain::new(),
            calls: Cell::new(0),
            fail_on: None,
        }
    }

    pub fn failing_on(step: &'static str) -> Self {
        Self {
            fail_on: Some(step),
            ..Self::new()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    fn enter(&self, step: &'static str) -> Result<()> {
        self.calls.set(self.calls.get() + 1);
        if self.fail_on == Some(step) {
            return Err(Error::Command {
                command: format!("openssl {}", step),
                stderr: "simulated failure".to_string(),
            });
        }
        Ok(())
    }
}

impl CertToolchain for CountingToolchain {
    fn generate_key(&self, key_path: &Path, bits: u32) -> Result<()> {
        self.enter("genrsa")?;
        self.inner.generate_key(key_path, bits)
    }

    fn generate_csr(&self, key_path: &Path, csr_path: &Path, common_name: &str) -> Result<()> {
        self.enter("req")?;
        self.inner.generate_csr(key_path, csr_path, common_name)
    }

    fn sign(&self, request: &SignRequest<'_>) -> Result<()> {
        self.enter("x509")?;
        self.inner.sign(request)
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}
