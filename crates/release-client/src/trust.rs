//! Trust anchors for server authentication.
//!
//! The client trusts exactly the certificates in its [`TrustStore`]; the
//! platform and webpki root sets are never consulted.

use std::sync::Arc;

use rustls::pki_types::CertificateDer;
use rustls::{ClientConfig, RootCertStore};

use crate::error::{ReleaseError, ReleaseResult};

/// Ordered, immutable set of trusted certificates.
#[derive(Debug, Clone)]
pub struct TrustStore {
    certificates: Arc<[CertificateDer<'static>]>,
}

impl TrustStore {
    /// Trust store over DER-encoded certificates.
    pub fn new(certificates: impl IntoIterator<Item = CertificateDer<'static>>) -> Self {
        Self {
            certificates: certificates.into_iter().collect(),
        }
    }

    /// Trust store over every `CERTIFICATE` block in a PEM bundle.
    ///
    /// A bundle without certificates is rejected: an empty store has to be
    /// asked for explicitly with [`TrustStore::new`].
    pub fn from_pem(pem: &[u8]) -> ReleaseResult<Self> {
        let mut reader = pem;
        let certificates = rustls_pemfile::certs(&mut reader)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ReleaseError::Tls {
                message: format!("malformed PEM certificate: {}", e),
            })?;

        if certificates.is_empty() {
            return Err(ReleaseError::Tls {
                message: "no certificates found in PEM input".to_string(),
            });
        }

        Ok(Self::new(certificates))
    }

    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }

    pub fn certificates(&self) -> &[CertificateDer<'static>] {
        &self.certificates
    }

    /// TLS client configuration anchored on this store only.
    pub fn client_config(&self) -> ReleaseResult<ClientConfig> {
        let mut roots = RootCertStore::empty();
        for certificate in self.certificates.iter() {
            roots.add(certificate.clone())?;
        }

        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let config = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()?
            .with_root_certificates(roots)
            .with_no_client_auth();

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CA_PEM: &[u8] = include_bytes!("../tests/fixtures/ca.pem");
    const OTHER_CA_PEM: &[u8] = include_bytes!("../tests/fixtures/other-ca.pem");

    #[test]
    fn test_from_pem_single_certificate() {
        let store = TrustStore::from_pem(CA_PEM).unwrap();
        assert_eq!(store.len(), 1);
        assert!(!store.is_empty());
    }

    #[test]
    fn test_from_pem_bundle_keeps_order() {
        let bundle = [CA_PEM, OTHER_CA_PEM].concat();
        let store = TrustStore::from_pem(&bundle).unwrap();
        assert_eq!(store.len(), 2);

        let first = TrustStore::from_pem(CA_PEM).unwrap();
        assert_eq!(store.certificates()[0], first.certificates()[0]);
    }

    #[test]
    fn test_from_pem_without_certificates() {
        let result = TrustStore::from_pem(b"not a certificate");
        assert!(matches!(result, Err(ReleaseError::Tls { .. })));
    }

    #[test]
    fn test_from_pem_with_corrupt_block() {
        let pem = b"-----BEGIN CERTIFICATE-----\n!!!!\n-----END CERTIFICATE-----\n";
        let result = TrustStore::from_pem(pem);
        assert!(matches!(result, Err(ReleaseError::Tls { .. })));
    }

    #[test]
    fn test_client_config_from_fixture() {
        let store = TrustStore::from_pem(CA_PEM).unwrap();
        assert!(store.client_config().is_ok());
    }

    #[test]
    fn test_empty_store_builds_config_that_trusts_nothing() {
        let store = TrustStore::new(Vec::new());
        assert!(store.is_empty());
        assert!(store.client_config().is_ok());
    }
}
