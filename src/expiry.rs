// Copyright 2025 Jayashankar
// SPDX-License-Identifier: Apache-2.0

//! Decide whether a certificate has to be (re)issued.
//!
//! Only the not-after date is consulted. A certificate whose subject or SANs
//! no longer match the domain is still considered usable while it is valid.

use crate::error::Result;
use crate::x509::parse_cert_file;
use std::path::Path;
use time::OffsetDateTime;

/// Renew certificates with fewer than this many whole days left.
pub const DEFAULT_RENEW_WITHIN_DAYS: u32 = 30;

/// `true` if `cert_path` is missing or has fewer than `threshold_days` whole days remaining.
pub fn needs_issuance(cert_path: &Path, threshold_days: u32) -> Result<bool> {
    needs_issuance_at(cert_path, threshold_days, OffsetDateTime::now_utc())
}

/// Same as [`needs_issuance`], evaluated at `now`.
pub fn needs_issuance_at(cert_path: &Path, threshold_days: u32, now: OffsetDateTime) -> Result<bool> {
    if !cert_path.exists() {
        return Ok(true);
    }
    let info = parse_cert_file(cert_path)?;
    Ok(info.days_remaining_at(now) < i64::from(threshold_days))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use rcgen::{CertificateParams, KeyPair};
    use tempfile::TempDir;
    use time::Duration;

    fn write_cert(dir: &TempDir, not_after: OffsetDateTime) -> std::path::PathBuf {
        let mut params = CertificateParams::new(vec!["app.local".to_string()]).unwrap();
        params.not_before = not_after - Duration::days(900);
        params.not_after = not_after;
        let key = KeyPair::generate().unwrap();
        let path = dir.path().join("app.local.crt");
        std::fs::write(&path, params.self_signed(&key).unwrap().pem()).unwrap();
        path
    }

    #[test]
    fn test_missing_certificate_needs_issuance() {
        let dir = TempDir::new().unwrap();
        assert!(needs_issuance(&dir.path().join("missing.crt"), 30).unwrap());
    }

    #[test]
    fn test_threshold_boundary() {
        let dir = TempDir::new().unwrap();
        let now = OffsetDateTime::now_utc();
        // X.509 times have second precision; pad by an hour to stay inside the day
        let path = write_cert(&dir, now + Duration::days(30) + Duration::hours(1));

        // Exactly 30 whole days left: not below the threshold
        assert!(!needs_issuance_at(&path, 30, now).unwrap());
        // One day later only 29 remain
        assert!(needs_issuance_at(&path, 30, now + Duration::days(1)).unwrap());
        assert!(needs_issuance_at(&path, 31, now).unwrap());
    }

    #[test]
    fn test_long_lived_certificate_is_kept() {
        let dir = TempDir::new().unwrap();
        let now = OffsetDateTime::now_utc();
        let path = write_cert(&dir, now + Duration::days(825));

        for threshold in [0, 1, 30, 365, 824] {
            assert!(!needs_issuance_at(&path, threshold, now).unwrap());
        }
        assert!(needs_issuance_at(&path, 826, now).unwrap());
    }

    #[test]
    fn test_expired_certificate_needs_issuance() {
        let dir = TempDir::new().unwrap();
        let now = OffsetDateTime::now_utc();
        let path = write_cert(&dir, now - Duration::days(3));

        assert!(needs_issuance_at(&path, 30, now).unwrap());
        assert!(needs_issuance_at(&path, 0, now).unwrap());
    }

    #[test]
    fn test_recently_expired_certificate_needs_issuance_at_zero_threshold() {
        let dir = TempDir::new().unwrap();
        let now = OffsetDateTime::now_utc();
        let path = write_cert(&dir, now - Duration::hours(12));

        assert!(needs_issuance_at(&path, 0, now).unwrap());
    }

    #[test]
    fn test_unparseable_certificate_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.crt");
        std::fs::write(&path, "garbage").unwrap();

        assert!(matches!(needs_issuance(&path, 30), Err(Error::CertParse(_))));
    }
}
