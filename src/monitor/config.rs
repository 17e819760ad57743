use chrono::TimeDelta;
use hyper::HeaderMap;
use url::{Position, Url};

use crate::error::{ConfigError, UrlError};

/// Status codes treated as "up" when none are configured.
pub const DEFAULT_UP_STATUS_CODES: [u16; 2] = [200, 201];

pub fn default_request_timeout() -> TimeDelta {
    TimeDelta::seconds(10)
}

/// Everything needed to check one endpoint.
///
/// The timeout is a signed [`TimeDelta`] so a negative value can be rejected
/// instead of silently wrapping. A zero timeout means "use the default".
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub url: String,
    pub method: String,
    pub request_timeout: TimeDelta,

    /// Skip certificate verification during the TLS handshake. The certificate
    /// is still inspected and reported on.
    pub ignore_cert: bool,

    pub follow_redirects: bool,

    /// Status codes that count as "up". Empty falls back to
    /// [`DEFAULT_UP_STATUS_CODES`].
    pub up_status_codes: Vec<u16>,

    /// Extra headers sent with every check.
    pub headers: HeaderMap,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            method: "GET".to_string(),
            request_timeout: TimeDelta::zero(),
            ignore_cert: false,
            follow_redirects: true,
            up_status_codes: Vec::new(),
            headers: HeaderMap::new(),
        }
    }
}

impl MonitorConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Applies defaults and validates, in this order: timeout default, status
    /// code default, method presence, timeout sign, URL sanitation.
    pub(crate) fn normalize(mut self) -> Result<Self, ConfigError> {
        if self.request_timeout.is_zero() {
            self.request_timeout = default_request_timeout();
        }

        if self.up_status_codes.is_empty() {
            self.up_status_codes = DEFAULT_UP_STATUS_CODES.to_vec();
        }

        if self.method.is_empty() {
            return Err(ConfigError::MissingMethod);
        }

        if self.request_timeout < TimeDelta::zero() {
            return Err(ConfigError::NegativeTimeout(self.request_timeout));
        }

        self.url = sanitize_url(&self.url)?;
        Ok(self)
    }
}

/// Parses `raw` and returns its canonical form.
///
/// A URL given without a path keeps having none, so `https://example.com`
/// round-trips unchanged instead of gaining a trailing `/`.
pub fn sanitize_url(raw: &str) -> Result<String, UrlError> {
    let parsed = Url::parse(raw)?;

    if parsed.scheme().is_empty() {
        return Err(UrlError::MissingScheme(raw.to_string()));
    }

    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(UrlError::MissingHost(raw.to_string()));
    }

    if parsed.path() == "/" && !has_explicit_path(raw) {
        return Ok(format!(
            "{}{}",
            &parsed[..Position::BeforePath],
            &parsed[Position::AfterPath..]
        ));
    }

    Ok(parsed.into())
}

fn has_explicit_path(raw: &str) -> bool {
    let Some((_, rest)) = raw.trim().split_once("://") else {
        return true;
    };
    rest.find(['/', '?', '#'])
        .is_some_and(|i| rest.as_bytes()[i] == b'/')
}

/// Whether `code` counts as "up". An empty set means any 2xx status.
pub fn is_up_status(codes: &[u16], code: u16) -> bool {
    if codes.is_empty() {
        return (200..300).contains(&code);
    }
    codes.contains(&code)
}
