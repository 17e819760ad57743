//! Availability checks for HTTP(S) endpoints.
//!
//! A [`Monitor`] is built once from a [`MonitorConfig`] and can then run any
//! number of independent checks, each returning a [`CheckResult`] with the
//! response status, timing and, for HTTPS, details about the server
//! certificate.
//!
//! ```rust,ignore
//! use oxycheck::{CheckContext, Monitor, MonitorConfig};
//!
//! let monitor = Monitor::new(MonitorConfig::new("https://example.com"))?;
//! let result = monitor.check(&CheckContext::background()).await?;
//! println!("{result}");
//! ```

pub mod config;
pub mod error;
pub mod monitor;
pub mod tls;
pub mod transport;

pub use error::{CheckError, ConfigError, RequestError, UrlError, report};
pub use monitor::{
    CertInfo, CheckContext, CheckResult, Monitor, MonitorConfig, is_up_status, sanitize_url,
};
pub use tls::anchors::{StaticTrustAnchors, SystemTrustAnchors, TrustAnchors, TrustStoreError};
pub use transport::{RedirectPolicy, TransportError};
