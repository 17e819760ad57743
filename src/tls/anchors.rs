use std::fmt::Debug;

use rustls::RootCertStore;
use rustls::pki_types::CertificateDer;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrustStoreError {
    #[error("{0}")]
    Native(String),

    #[error("no usable root certificates found")]
    Empty,

    #[error("invalid root certificate: {0}")]
    Invalid(#[from] rustls::Error),
}

/// Source of the root certificates used for chain verification.
///
/// Loaded fresh for every certificate inspection, and once per monitor for
/// handshake verification. Implementations must not cache unless that is
/// what the caller wants.
pub trait TrustAnchors: Debug + Send + Sync {
    fn load(&self) -> Result<RootCertStore, TrustStoreError>;
}

/// The operating system's certificate store.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTrustAnchors;

impl TrustAnchors for SystemTrustAnchors {
    fn load(&self) -> Result<RootCertStore, TrustStoreError> {
        let native = rustls_native_certs::load_native_certs();

        if native.certs.is_empty() {
            return Err(match native.errors.first() {
                Some(err) => TrustStoreError::Native(err.to_string()),
                None => TrustStoreError::Empty,
            });
        }

        for err in &native.errors {
            log::debug!("Skipping unreadable trust store entry: {}", err);
        }

        let mut roots = RootCertStore::empty();
        let (added, ignored) = roots.add_parsable_certificates(native.certs);
        if ignored > 0 {
            log::debug!("Ignored {} unparsable root certificates", ignored);
        }
        if added == 0 {
            return Err(TrustStoreError::Empty);
        }

        Ok(roots)
    }
}

/// A fixed set of roots, for private CAs and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticTrustAnchors {
    roots: Vec<CertificateDer<'static>>,
}

impl StaticTrustAnchors {
    pub fn new(roots: Vec<CertificateDer<'static>>) -> Self {
        Self { roots }
    }
}

impl TrustAnchors for StaticTrustAnchors {
    fn load(&self) -> Result<RootCertStore, TrustStoreError> {
        if self.roots.is_empty() {
            return Err(TrustStoreError::Empty);
        }

        let mut store = RootCertStore::empty();
        for root in &self.roots {
            store.add(root.clone())?;
        }
        Ok(store)
    }
}
