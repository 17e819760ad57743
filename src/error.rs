use std::fmt::Write;

use chrono::TimeDelta;
use thiserror::Error;

use crate::transport::TransportError;

/// Rejection of a [`MonitorConfig`](crate::MonitorConfig) at construction time.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing HTTP method")]
    MissingMethod,

    #[error("negative timeout: {0}")]
    NegativeTimeout(TimeDelta),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] UrlError),

    #[error("failed to build TLS configuration: {0}")]
    Tls(#[from] rustls::Error),
}

#[derive(Debug, Error)]
pub enum UrlError {
    #[error(transparent)]
    Parse(#[from] url::ParseError),

    #[error("missing scheme {0:?}")]
    MissingScheme(String),

    #[error("missing host {0:?}")]
    MissingHost(String),
}

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("invalid method: {0}")]
    Method(#[from] hyper::http::method::InvalidMethod),
}

/// Failure of a single check. Every variant names the URL that was checked.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("failed to create request for {url:?}: {source}")]
    Request {
        url: String,
        #[source]
        source: RequestError,
    },

    #[error("failed to send request for {url:?}: {source}")]
    Transport {
        url: String,
        #[source]
        source: TransportError,
    },

    #[error("failed to read response body for {url:?}: {source}")]
    Body {
        url: String,
        #[source]
        source: TransportError,
    },
}

impl CheckError {
    pub fn url(&self) -> &str {
        match self {
            CheckError::Request { url, .. }
            | CheckError::Transport { url, .. }
            | CheckError::Body { url, .. } => url,
        }
    }
}

/// Renders an error followed by its chain of causes.
pub fn report(mut err: &(dyn std::error::Error + 'static)) -> String {
    let mut s = format!("{}", err);
    while let Some(src) = err.source() {
        let _ = write!(s, "\n\nCaused by: {}", src);
        err = src;
    }
    s
}
