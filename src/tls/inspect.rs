use std::time::Duration;

use chrono::{DateTime, Utc};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use x509_parser::prelude::{GeneralName, X509Certificate, parse_x509_certificate};

use super::verifier::{ChainVerifier, VerifyError};
use crate::monitor::CertInfo;

/// Derives [`CertInfo`] from a peer certificate chain. The first certificate
/// is the leaf; the rest are used as intermediates.
#[derive(Debug, Clone)]
pub struct CertInspector {
    verifier: ChainVerifier,
}

impl CertInspector {
    pub fn new(verifier: ChainVerifier) -> Self {
        Self { verifier }
    }

    pub fn inspect(&self, chain: &[CertificateDer<'_>], host: &str) -> CertInfo {
        self.inspect_at(chain, host, Utc::now())
    }

    /// Checks run in a fixed order and the first failure is reported:
    /// not yet valid, expired, then chain and hostname verification.
    pub fn inspect_at(
        &self,
        chain: &[CertificateDer<'_>],
        host: &str,
        now: DateTime<Utc>,
    ) -> CertInfo {
        let Some((leaf, intermediates)) = chain.split_first() else {
            return CertInfo::default().invalid("no peer certificate presented".to_string());
        };

        let info = match parse_x509_certificate(leaf) {
            Ok((_, cert)) => describe(&cert),
            Err(e) => {
                return CertInfo::default().invalid(format!("failed to parse certificate: {e}"));
            }
        };

        if now < info.valid_from {
            let msg = format!("certificate not yet valid: {}", info.valid_from);
            return info.invalid(msg);
        }
        if now > info.valid_to {
            let msg = format!("certificate has expired: {}", info.valid_to);
            return info.invalid(msg);
        }

        let server_name = match ServerName::try_from(host) {
            Ok(name) => name,
            Err(e) => {
                let msg = format!("invalid verification hostname {host:?}: {e}");
                return info.invalid(msg);
            }
        };

        match self
            .verifier
            .verify(leaf, intermediates, &server_name, unix_time(now))
        {
            Ok(()) => info,
            Err(VerifyError::TrustStore(e)) => {
                info.invalid(format!("error loading system root certificates: {e}"))
            }
            Err(VerifyError::Rejected(e)) => {
                info.invalid(format!("certificate verification failed: {e}"))
            }
        }
    }
}

fn describe(cert: &X509Certificate<'_>) -> CertInfo {
    let validity = cert.validity();

    let dns_names = match cert.subject_alternative_name() {
        Ok(Some(san)) => san
            .value
            .general_names
            .iter()
            .filter_map(|name| match name {
                GeneralName::DNSName(dns) => Some(dns.to_string()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };

    CertInfo {
        subject: cert.subject().to_string(),
        issuer: cert.issuer().to_string(),
        valid_from: to_utc(validity.not_before.timestamp()),
        valid_to: to_utc(validity.not_after.timestamp()),
        dns_names,
        is_valid: true,
        error: None,
    }
}

fn to_utc(timestamp: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(timestamp, 0).unwrap_or_default()
}

fn unix_time(now: DateTime<Utc>) -> UnixTime {
    UnixTime::since_unix_epoch(Duration::from_secs(now.timestamp().max(0) as u64))
}
