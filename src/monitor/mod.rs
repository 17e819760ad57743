pub mod config;
pub mod context;
pub mod result;

pub use config::{MonitorConfig, is_up_status, sanitize_url};
pub use context::CheckContext;
pub use result::{CertInfo, CheckResult};

use std::sync::Arc;

use chrono::Utc;
use hyper::Method;
use hyper::header::{CACHE_CONTROL, EXPIRES, HeaderValue, PRAGMA};
use rustls::pki_types::CertificateDer;
use url::Url;

use crate::error::{CheckError, ConfigError, RequestError};
use crate::tls::anchors::{SystemTrustAnchors, TrustAnchors};
use crate::tls::inspect::CertInspector;
use crate::tls::verifier::ChainVerifier;
use crate::tls::{client_config, crypto_provider};
use crate::transport::{HttpTransport, OutgoingRequest, RedirectPolicy, hostname};
use context::Budget;

/// Query parameter carrying the request timestamp, so caches never match.
pub const NOCACHE_PARAM: &str = "nocache";

/// Checks one endpoint. Built once from a [`MonitorConfig`] and reused for any
/// number of checks, including concurrent ones.
#[derive(Debug, Clone)]
pub struct Monitor {
    transport: HttpTransport,
    inspector: CertInspector,
    config: MonitorConfig,
}

impl Monitor {
    /// Validates `config` and builds a monitor that verifies certificates
    /// against the operating system's trust store.
    pub fn new(config: MonitorConfig) -> Result<Self, ConfigError> {
        Self::with_trust_anchors(config, Arc::new(SystemTrustAnchors))
    }

    /// Like [`Monitor::new`], with `anchors` backing both the handshake
    /// verification and the certificate inspection of every check.
    pub fn with_trust_anchors(
        config: MonitorConfig,
        anchors: Arc<dyn TrustAnchors>,
    ) -> Result<Self, ConfigError> {
        let config = config.normalize()?;
        let timeout = config
            .request_timeout
            .to_std()
            .map_err(|_| ConfigError::NegativeTimeout(config.request_timeout))?;

        let verifier = ChainVerifier::new(anchors, crypto_provider());
        let tls = client_config(&verifier, config.ignore_cert)?;
        let redirect = if config.follow_redirects {
            RedirectPolicy::default()
        } else {
            RedirectPolicy::Stop
        };

        Ok(Self {
            transport: HttpTransport::new(tls, timeout, redirect),
            inspector: CertInspector::new(verifier),
            config,
        })
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }

    pub fn is_up(&self, status_code: u16) -> bool {
        is_up_status(&self.config.up_status_codes, status_code)
    }

    /// Performs one request against the configured URL.
    ///
    /// Either a complete [`CheckResult`] or an error is returned, never a
    /// partial result. Certificate problems are reported inside the result.
    pub async fn check(&self, ctx: &CheckContext) -> Result<CheckResult, CheckError> {
        let url = &self.config.url;
        let request = self.build_request().map_err(|source| CheckError::Request {
            url: url.clone(),
            source,
        })?;

        let budget = Budget::starting_now(self.transport.timeout());
        let start = Utc::now();
        let sent = ctx.run(budget, self.transport.send(request)).await;
        let end = Utc::now();

        let mut exchange = sent.map_err(|source| CheckError::Transport {
            url: url.clone(),
            source,
        })?;

        let read = ctx
            .run(budget, exchange.discard_body())
            .await
            .map_err(|source| CheckError::Body {
                url: url.clone(),
                source,
            })?;
        log::debug!(
            "{} {} -> {} ({} body bytes discarded)",
            self.config.method,
            url,
            exchange.status().as_u16(),
            read
        );

        // the final URL, so redirects are verified against the host that answered
        let cert_info = match (exchange.peer_certificates(), hostname(exchange.url())) {
            (Some(chain), Some(host)) if !chain.is_empty() => {
                Some(self.inspect(chain.to_vec(), host).await)
            }
            _ => None,
        };

        Ok(CheckResult {
            url: url.clone(),
            status_code: exchange.status().as_u16(),
            start,
            end,
            cert_info,
        })
    }

    fn build_request(&self) -> Result<OutgoingRequest, RequestError> {
        let mut url = Url::parse(&self.config.url)?;
        let method = Method::from_bytes(self.config.method.as_bytes())?;

        let mut headers = self.config.headers.clone();
        headers.insert(
            CACHE_CONTROL,
            HeaderValue::from_static("no-cache, no-store, must-revalidate"),
        );
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
        headers.insert(EXPIRES, HeaderValue::from_static("0"));

        let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        url.query_pairs_mut()
            .append_pair(NOCACHE_PARAM, &nanos.to_string());

        Ok(OutgoingRequest {
            method,
            url,
            headers,
        })
    }

    /// Runs on the blocking pool since loading the trust store reads from disk.
    async fn inspect(
        &self,
        chain: Vec<CertificateDer<'static>>,
        host: String,
    ) -> CertInfo {
        let inspector = self.inspector.clone();
        tokio::task::spawn_blocking(move || inspector.inspect(&chain, &host))
            .await
            .unwrap_or_else(|e| {
                CertInfo::default().invalid(format!("certificate inspection aborted: {e}"))
            })
    }
}
