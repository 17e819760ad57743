use std::collections::BTreeMap;

use chrono::TimeDelta;
use hyper::HeaderMap;
use hyper::header::{HeaderName, HeaderValue};
use serde::Deserialize;
use thiserror::Error;

use crate::monitor::MonitorConfig;

#[derive(Debug, Error)]
pub enum HeaderError {
    #[error("invalid header name {0:?}")]
    Name(String),

    #[error("invalid value for header {0:?}")]
    Value(String),
}

/// The checker configuration file.
/// Contains an optional polling interval and the list of targets to check.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckerConfig {
    /// Seconds between two rounds of checks.
    /// When absent every target is checked once and the process exits.
    #[serde(default)]
    pub polling_interval_seconds: Option<u64>,

    /// The endpoints to check.
    pub targets: Vec<TargetConfig>,
}

/// A single endpoint to check.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    /// The URL of the endpoint.
    pub url: String,

    /// Label printed next to results. Defaults to the URL.
    #[serde(default)]
    pub name: Option<String>,

    /// The HTTP method. Defaults to GET.
    #[serde(default = "default_method")]
    pub method: String,

    /// Request timeout in milliseconds. Zero selects the default of 10 seconds.
    #[serde(default)]
    pub timeout_ms: i64,

    /// Skip certificate verification during the handshake.
    /// The certificate is still inspected and reported.
    #[serde(default)]
    pub ignore_cert: bool,

    #[serde(default = "default_follow_redirects")]
    pub follow_redirects: bool,

    /// The status codes that count as "up".
    /// Defaults to 200 and 201 if not specified.
    #[serde(default)]
    pub accepted_status_codes: Vec<u16>,

    /// Extra request headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_follow_redirects() -> bool {
    true
}

impl TargetConfig {
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.url)
    }

    pub fn to_monitor_config(&self) -> Result<MonitorConfig, HeaderError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| HeaderError::Name(name.clone()))?;
            let header_value =
                HeaderValue::from_str(value).map_err(|_| HeaderError::Value(name.clone()))?;
            headers.append(header_name, header_value);
        }

        Ok(MonitorConfig {
            url: self.url.clone(),
            method: self.method.clone(),
            request_timeout: TimeDelta::milliseconds(self.timeout_ms),
            ignore_cert: self.ignore_cert,
            follow_redirects: self.follow_redirects,
            up_status_codes: self.accepted_status_codes.clone(),
            headers,
        })
    }
}
