// Copyright 2025 Jayashankar
// SPDX-License-Identifier: Apache-2.0

//! Apache virtual-host rendering and installation.

use crate::domain::Domain;
use crate::error::Result;
use crate::fs::{atomic_write, ensure_dir};
use crate::server::ServerControl;
use std::path::{Path, PathBuf};

/// Log directory expression used when none is configured.
pub const DEFAULT_LOG_DIR: &str = "${APACHE_LOG_DIR}";

pub const HTTP_PORT: u16 = 80;
pub const HTTPS_PORT: u16 = 443;

/// Everything a site configuration refers to.
#[derive(Debug, Clone)]
pub struct VhostSpec<'a> {
    pub domain: &'a Domain,
    pub document_root: &'a Path,
    pub cert_path: &'a Path,
    pub key_path: &'a Path,
    pub log_dir: &'a str,
}

fn directory_block(out: &mut String, document_root: &str) {
    out.push_str(&format!(
        "    <Directory {}/>\n",
        document_root.trim_end_matches('/')
    ));
    out.push_str("        Options Indexes FollowSymLinks\n");
    out.push_str("        AllowOverride All\n");
    out.push_str("        Require all granted\n");
    out.push_str("    </Directory>\n");
}

/// Render the plain and TLS virtual hosts for one domain.
pub fn render_vhost(spec: &VhostSpec<'_>) -> String {
    let domain = spec.domain.as_str();
    let root = spec.document_root.display().to_string();
    let root = root.trim_end_matches('/');
    let root = if root.is_empty() { "/" } else { root };
    let log_dir = spec.log_dir.trim_end_matches('/');

    let mut out = String::new();

    out.push_str(&format!("<VirtualHost *:{}>\n", HTTP_PORT));
    out.push_str(&format!("    ServerName {}\n", domain));
    out.push_str(&format!("    DocumentRoot {}\n", root));
    directory_block(&mut out, root);
    out.push_str(&format!("    ErrorLog {}/{}.error.log\n", log_dir, domain));
    out.push_str(&format!(
        "    CustomLog {}/{}.access.log combined\n",
        log_dir, domain
    ));
    out.push_str("</VirtualHost>\n\n");

    out.push_str(&format!("<VirtualHost *:{}>\n", HTTPS_PORT));
    out.push_str(&format!("    ServerName {}\n", domain));
    out.push_str(&format!("    DocumentRoot {}\n", root));
    directory_block(&mut out, root);
    out.push('\n');
    out.push_str("    SSLEngine on\n");
    out.push_str(&format!(
        "    SSLCertificateFile {}\n",
        spec.cert_path.display()
    ));
    out.push_str(&format!(
        "    SSLCertificateKeyFile {}\n",
        spec.key_path.display()
    ));
    out.push('\n');
    out.push_str(&format!("    ErrorLog {}/{}.ssl.error.log\n", log_dir, domain));
    out.push_str(&format!(
        "    CustomLog {}/{}.ssl.access.log combined\n",
        log_dir, domain
    ));
    out.push_str("</VirtualHost>\n");

    out
}

/// Path of the site configuration for `domain`.
pub fn vhost_path(sites_available: &Path, domain: &Domain) -> PathBuf {
    sites_available.join(domain.conf_name())
}

/// Overwrite `<sites_available>/<domain>.conf` and enable it.
pub fn write_vhost(
    sites_available: &Path,
    spec: &VhostSpec<'_>,
    server: &dyn ServerControl,
) -> Result<PathBuf> {
    ensure_dir(sites_available)?;
    let path = vhost_path(sites_available, spec.domain);
    atomic_write(&path, render_vhost(spec).as_bytes())?;
    server.enable_site(&spec.domain.conf_name())?;
    Ok(path)
}
