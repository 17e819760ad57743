pub mod anchors;
pub mod inspect;
pub mod verifier;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use rustls::ClientConfig;
use rustls::client::danger::ServerCertVerifier;
use rustls::crypto::CryptoProvider;

use verifier::{AcceptAnyCertificate, ChainVerifier, EnforcingVerifier};

pub const ALPN_H2: &[u8] = b"h2";
pub const ALPN_HTTP11: &[u8] = b"http/1.1";

/// The crypto provider used for every handshake and verification.
pub fn crypto_provider() -> Arc<CryptoProvider> {
    Arc::new(rustls::crypto::ring::default_provider())
}

/// Client configuration for one transport. With `ignore_cert` the handshake
/// accepts any chain; otherwise it is verified by `chain`.
pub fn client_config(chain: &ChainVerifier, ignore_cert: bool) -> Result<ClientConfig, rustls::Error> {
    let provider = chain.provider().clone();
    let verifier: Arc<dyn ServerCertVerifier> = if ignore_cert {
        Arc::new(AcceptAnyCertificate::new(provider.clone()))
    } else {
        Arc::new(EnforcingVerifier::new(chain.clone()))
    };

    let mut config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .dangerous()
        .with_custom_certificate_verifier(verifier)
        .with_no_client_auth();
    config.alpn_protocols = vec![ALPN_H2.to_vec(), ALPN_HTTP11.to_vec()];

    Ok(config)
}
