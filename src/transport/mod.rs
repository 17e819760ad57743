mod connection;

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use http_body_util::{BodyExt, Empty};
use hyper::body::{Bytes, Incoming};
use hyper::header::{
    AUTHORIZATION, COOKIE, HOST, HeaderValue, LOCATION, PROXY_AUTHORIZATION, USER_AGENT,
};
use hyper::{HeaderMap, Method, Request, StatusCode, Version};
use percent_encoding::percent_decode_str;
use rustls::ClientConfig;
use rustls::pki_types::CertificateDer;
use thiserror::Error;
use tokio_rustls::TlsConnector;
use url::{Host, Position, Url};

use connection::{Connection, ConnectionTask, Sender};

pub const DEFAULT_MAX_REDIRECTS: usize = 10;

const DEFAULT_USER_AGENT: &str = concat!("oxycheck/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("unsupported scheme {0:?}")]
    UnsupportedScheme(String),

    #[error("missing host")]
    MissingHost,

    #[error("invalid server name {0:?}")]
    ServerName(String),

    #[error("connection failed: {0}")]
    Connect(#[source] std::io::Error),

    #[error("tls handshake failed: {0}")]
    Tls(#[source] std::io::Error),

    #[error("invalid request: {0}")]
    Request(#[from] hyper::http::Error),

    #[error(transparent)]
    Http(#[from] hyper::Error),

    #[error("stopped after {0} redirects")]
    TooManyRedirects(usize),

    #[error("invalid redirect location {0:?}")]
    InvalidRedirect(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("context deadline exceeded")]
    DeadlineExceeded,

    #[error("context canceled")]
    Cancelled,
}

/// What to do with a 3xx response that carries a `Location` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectPolicy {
    /// Follow redirects until `max` requests have been sent, then fail.
    Follow { max: usize },
    /// Return the redirect response itself.
    Stop,
}

impl Default for RedirectPolicy {
    fn default() -> Self {
        RedirectPolicy::Follow {
            max: DEFAULT_MAX_REDIRECTS,
        }
    }
}

/// A request to be sent by [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct OutgoingRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
}

impl OutgoingRequest {
    /// Moves credentials embedded in the URL into a Basic `Authorization`
    /// header, unless one is already set. The URL is left without userinfo.
    fn take_url_credentials(&mut self) {
        if self.url.username().is_empty() && self.url.password().is_none() {
            return;
        }

        let decode = |raw: &str| percent_decode_str(raw).decode_utf8_lossy().into_owned();
        let username = decode(self.url.username());
        let password = self.url.password().map(decode).unwrap_or_default();
        let _ = self.url.set_password(None);
        let _ = self.url.set_username("");

        if self.headers.contains_key(AUTHORIZATION) {
            return;
        }
        let token = BASE64_STANDARD.encode(format!("{username}:{password}"));
        if let Ok(mut value) = HeaderValue::from_str(&format!("Basic {token}")) {
            value.set_sensitive(true);
            self.headers.insert(AUTHORIZATION, value);
        }
    }

    fn redirected(mut self, status: StatusCode, next: Url) -> Self {
        let rewrites_method = matches!(
            status,
            StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND | StatusCode::SEE_OTHER
        );
        if rewrites_method && self.method != Method::GET && self.method != Method::HEAD {
            self.method = Method::GET;
        }

        if next.host_str() != self.url.host_str() {
            for name in [AUTHORIZATION, PROXY_AUTHORIZATION, COOKIE] {
                self.headers.remove(name);
            }
        }

        self.url = next;
        self
    }

    fn to_request(&self, http2: bool) -> Result<Request<Empty<Bytes>>, TransportError> {
        let mut builder = Request::builder().method(self.method.clone());
        builder = if http2 {
            builder
                .version(Version::HTTP_2)
                .uri(&self.url[..Position::AfterQuery])
        } else {
            builder.uri(&self.url[Position::BeforePath..Position::AfterQuery])
        };

        let mut request = builder.body(Empty::new())?;
        let headers = request.headers_mut();
        *headers = self.headers.clone();
        headers
            .entry(USER_AGENT)
            .or_insert(HeaderValue::from_static(DEFAULT_USER_AGENT));

        if !http2 {
            let authority = &self.url[Position::BeforeHost..Position::AfterPort];
            let host = HeaderValue::from_str(authority).map_err(hyper::http::Error::from)?;
            headers.insert(HOST, host);
        }

        Ok(request)
    }
}

/// Hostname of `url` as used for SNI and certificate verification; IPv6
/// addresses are returned without brackets.
pub fn hostname(url: &Url) -> Option<String> {
    match url.host()? {
        Host::Domain(domain) if domain.is_empty() => None,
        Host::Domain(domain) => Some(domain.to_string()),
        Host::Ipv4(ip) => Some(ip.to_string()),
        Host::Ipv6(ip) => Some(ip.to_string()),
    }
}

/// A response whose body has not been read yet.
pub struct Exchange {
    status: StatusCode,
    headers: HeaderMap,
    url: Url,
    peer_certificates: Option<Vec<CertificateDer<'static>>>,
    body: Incoming,
    _connection: (Sender, ConnectionTask),
}

impl Exchange {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// URL of the request that produced this response, after redirects.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Certificates presented by the server, leaf first. `None` for plain HTTP.
    pub fn peer_certificates(&self) -> Option<&[CertificateDer<'static>]> {
        self.peer_certificates.as_deref()
    }

    /// Reads the body to the end without keeping it; returns the byte count.
    pub async fn discard_body(&mut self) -> Result<u64, TransportError> {
        let mut read = 0;
        while let Some(frame) = self.body.frame().await {
            if let Some(data) = frame?.data_ref() {
                read += data.len() as u64;
            }
        }
        Ok(read)
    }
}

/// An HTTP client that opens a fresh connection for every request, so each
/// HTTPS request observes a full handshake and its certificate chain.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    tls: Arc<ClientConfig>,
    timeout: Duration,
    redirect: RedirectPolicy,
}

impl HttpTransport {
    pub fn new(tls: ClientConfig, timeout: Duration, redirect: RedirectPolicy) -> Self {
        Self {
            tls: Arc::new(tls),
            timeout,
            redirect,
        }
    }

    /// Overall time allowed for one request, body included. Enforced by the
    /// caller of [`HttpTransport::send`].
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn redirect_policy(&self) -> RedirectPolicy {
        self.redirect
    }

    pub async fn send(&self, mut request: OutgoingRequest) -> Result<Exchange, TransportError> {
        let mut redirects = 0;

        loop {
            request.take_url_credentials();
            let exchange = self.round_trip(&request).await?;

            let RedirectPolicy::Follow { max } = self.redirect else {
                return Ok(exchange);
            };
            let Some(location) = redirect_location(&exchange)? else {
                return Ok(exchange);
            };
            if redirects + 1 >= max {
                return Err(TransportError::TooManyRedirects(max));
            }
            redirects += 1;

            let next = request
                .url
                .join(&location)
                .map_err(|_| TransportError::InvalidRedirect(location.clone()))?;
            log::debug!(
                "Following {} redirect from {} to {}",
                exchange.status().as_u16(),
                request.url,
                next
            );
            request = request.redirected(exchange.status(), next);
        }
    }

    async fn round_trip(&self, request: &OutgoingRequest) -> Result<Exchange, TransportError> {
        let connection =
            Connection::open(&request.url, TlsConnector::from(self.tls.clone())).await?;
        let outgoing = request.to_request(connection.is_http2())?;
        let sent = connection.send(outgoing).await?;

        let (parts, body) = sent.response.into_parts();
        Ok(Exchange {
            status: parts.status,
            headers: parts.headers,
            url: request.url.clone(),
            peer_certificates: sent.peer_certificates,
            body,
            _connection: sent.connection,
        })
    }
}

fn redirect_location(exchange: &Exchange) -> Result<Option<String>, TransportError> {
    if !matches!(
        exchange.status(),
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    ) {
        return Ok(None);
    }

    let Some(value) = exchange.headers().get(LOCATION) else {
        return Ok(None);
    };
    value.to_str().map(|s| Some(s.to_string())).map_err(|_| {
        TransportError::InvalidRedirect(String::from_utf8_lossy(value.as_bytes()).into_owned())
    })
}
