use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use hyper::StatusCode;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Outcome of one successful check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub url: String,
    pub status_code: u16,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,

    /// Present only when the connection was TLS and the server presented at
    /// least one certificate.
    pub cert_info: Option<CertInfo>,
}

impl CheckResult {
    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }
}

/// Details of the leaf certificate presented by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertInfo {
    pub subject: String,
    pub issuer: String,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
    pub dns_names: Vec<String>,
    pub is_valid: bool,
    pub error: Option<String>,
}

impl CertInfo {
    pub(crate) fn invalid(mut self, error: String) -> Self {
        self.is_valid = false;
        self.error = Some(error);
        self
    }
}

impl fmt::Display for CheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = StatusCode::from_u16(self.status_code)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("");

        writeln!(f, "Website: {}", self.url)?;
        writeln!(f, "Status: {} ({})", self.status_code, reason)?;
        writeln!(f, "Start: {}", self.start.format(TIME_FORMAT))?;
        writeln!(f, "  End: {}", self.end.format(TIME_FORMAT))?;
        writeln!(
            f,
            "Duration: {:?}",
            self.duration().to_std().unwrap_or_default()
        )?;

        if let Some(cert) = &self.cert_info {
            writeln!(f, "Certificate Info:")?;
            writeln!(f, "  Valid: {}", cert.is_valid)?;
            if let Some(error) = &cert.error {
                writeln!(f, "  Error: {}", error)?;
            }
            writeln!(
                f,
                "  From {} to {}",
                cert.valid_from.format(TIME_FORMAT),
                cert.valid_to.format(TIME_FORMAT)
            )?;
        }

        Ok(())
    }
}
