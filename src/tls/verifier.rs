use std::sync::{Arc, OnceLock};

use rustls::client::WebPkiServerVerifier;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{CryptoProvider, verify_tls12_signature, verify_tls13_signature};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, SignatureScheme};
use thiserror::Error;

use super::anchors::{TrustAnchors, TrustStoreError};

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error(transparent)]
    TrustStore(#[from] TrustStoreError),

    #[error(transparent)]
    Rejected(rustls::Error),
}

/// Chain and hostname verification against a [`TrustAnchors`] source.
///
/// The anchors are loaded again for every verification.
#[derive(Debug, Clone)]
pub struct ChainVerifier {
    anchors: Arc<dyn TrustAnchors>,
    provider: Arc<CryptoProvider>,
}

impl ChainVerifier {
    pub fn new(anchors: Arc<dyn TrustAnchors>, provider: Arc<CryptoProvider>) -> Self {
        Self { anchors, provider }
    }

    pub fn provider(&self) -> &Arc<CryptoProvider> {
        &self.provider
    }

    pub fn verify(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        now: UnixTime,
    ) -> Result<(), VerifyError> {
        let webpki = self.webpki()?;
        check(&webpki, end_entity, intermediates, server_name, now)
    }

    /// Loads the anchors and builds a webpki verifier from them.
    fn webpki(&self) -> Result<Arc<WebPkiServerVerifier>, VerifyError> {
        let roots = self.anchors.load()?;
        let verifier =
            WebPkiServerVerifier::builder_with_provider(Arc::new(roots), self.provider.clone())
                .build()
                .map_err(|e| TrustStoreError::Native(e.to_string()))?;
        Ok(verifier)
    }
}

fn check(
    verifier: &WebPkiServerVerifier,
    end_entity: &CertificateDer<'_>,
    intermediates: &[CertificateDer<'_>],
    server_name: &ServerName<'_>,
    now: UnixTime,
) -> Result<(), VerifyError> {
    verifier
        .verify_server_cert(end_entity, intermediates, server_name, &[], now)
        .map(|_| ())
        .map_err(VerifyError::Rejected)
}

/// Handshake verifier that enforces [`ChainVerifier`].
///
/// The anchors are loaded once, when the verifier is built, since handshakes
/// run on the async runtime. A failed load is retried on the next handshake.
#[derive(Debug)]
pub(crate) struct EnforcingVerifier {
    chain: ChainVerifier,
    webpki: OnceLock<Arc<WebPkiServerVerifier>>,
}

impl EnforcingVerifier {
    pub fn new(chain: ChainVerifier) -> Self {
        let webpki = OnceLock::new();
        match chain.webpki() {
            Ok(verifier) => {
                let _ = webpki.set(verifier);
            }
            Err(e) => log::warn!("Failed to load trust anchors, retrying on first handshake: {}", e),
        }
        Self { chain, webpki }
    }

    fn webpki(&self) -> Result<Arc<WebPkiServerVerifier>, VerifyError> {
        if let Some(verifier) = self.webpki.get() {
            return Ok(verifier.clone());
        }
        let verifier = self.chain.webpki()?;
        Ok(self.webpki.get_or_init(|| verifier).clone())
    }
}

impl ServerCertVerifier for EnforcingVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        let verified = self
            .webpki()
            .and_then(|webpki| check(&webpki, end_entity, intermediates, server_name, now));
        match verified {
            Ok(()) => Ok(ServerCertVerified::assertion()),
            Err(VerifyError::Rejected(err)) => Err(err),
            Err(VerifyError::TrustStore(err)) => Err(rustls::Error::General(format!(
                "error loading root certificates: {err}"
            ))),
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.chain.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.chain.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.chain
            .provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

/// Handshake verifier that accepts any certificate chain. Handshake signatures
/// are still checked, so the peer must hold the key of the certificate it sent.
#[derive(Debug)]
pub(crate) struct AcceptAnyCertificate {
    provider: Arc<CryptoProvider>,
}

impl AcceptAnyCertificate {
    pub fn new(provider: Arc<CryptoProvider>) -> Self {
        Self { provider }
    }
}

impl ServerCertVerifier for AcceptAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}
