//! Connector descriptors for the HTTP-Bind listeners.

use std::sync::Arc;

use axum_server::tls_rustls::RustlsConfig;

use crate::certs::store::CertificateStore;

/// Which side of the transport a connector carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorKind {
    Plain,
    Secure,
}

/// Everything needed to bind one listener: port, optional interface and,
/// for the secure kind, already-materialized TLS configuration.
#[derive(Clone)]
pub struct Connector {
    pub kind: ConnectorKind,
    pub port: u16,
    pub interface: Option<String>,
    pub tls: Option<RustlsConfig>,
}

impl Connector {
    /// Bind target as (host, port); an unset interface means all
    /// interfaces.
    pub fn bind_target(&self) -> (String, u16) {
        (
            self.interface
                .clone()
                .unwrap_or_else(|| "0.0.0.0".to_string()),
            self.port,
        )
    }
}

/// Builds connector descriptors from the current configuration and
/// certificate store state.
pub struct ConnectorFactory {
    certs: Arc<CertificateStore>,
    server_host: String,
    interface: Option<String>,
}

impl ConnectorFactory {
    pub fn new(certs: Arc<CertificateStore>, server_host: &str, interface: Option<String>) -> Self {
        Self {
            certs,
            server_host: server_host.to_string(),
            // An interface configured as whitespace counts as unset.
            interface: interface.filter(|i| !i.trim().is_empty()),
        }
    }

    /// Plaintext connector, or `None` when the port disables it.
    pub fn build_plain(&self, port: i64) -> Option<Connector> {
        let port = usable_port(port)?;
        Some(Connector {
            kind: ConnectorKind::Plain,
            port,
            interface: self.interface.clone(),
            tls: None,
        })
    }

    /// Secure connector, or `None` when the port disables it or no
    /// usable RSA certificate for the server host exists.
    ///
    /// Any failure to look up or load TLS material is logged and yields
    /// `None`: certificate trouble must never take the plaintext
    /// listener down with it.
    pub async fn build_secure(&self, port: i64) -> Option<Connector> {
        let port = usable_port(port)?;
        if !self.certs.has_usable_certificate(&self.server_host) {
            tracing::debug!(
                host = %self.server_host,
                "No usable RSA certificate; secure listener omitted"
            );
            return None;
        }
        let Some(bundle) = self.certs.tls_material(&self.server_host) else {
            tracing::warn!(
                host = %self.server_host,
                "Certificate disappeared during listener build; secure listener omitted"
            );
            return None;
        };
        match bundle.load().await {
            Ok(tls) => Some(Connector {
                kind: ConnectorKind::Secure,
                port,
                interface: self.interface.clone(),
                tls: Some(tls),
            }),
            Err(e) => {
                tracing::error!(
                    host = %self.server_host,
                    error = %e,
                    "Failed to load TLS material; secure listener omitted"
                );
                None
            }
        }
    }
}

fn usable_port(port: i64) -> Option<u16> {
    if port <= 0 {
        return None;
    }
    match u16::try_from(port) {
        Ok(p) => Some(p),
        Err(_) => {
            tracing::warn!(port, "Port out of range; listener omitted");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certs::material::CertBundle;
    use crate::certs::store::KeyAlgorithm;

    fn factory(certs: Arc<CertificateStore>) -> ConnectorFactory {
        ConnectorFactory::new(certs, "chat.example.org", None)
    }

    #[test]
    fn plain_connector_requires_a_positive_port() {
        let f = factory(Arc::new(CertificateStore::new()));
        assert!(f.build_plain(0).is_none());
        assert!(f.build_plain(-1).is_none());
        assert!(f.build_plain(70_000).is_none());

        let c = f.build_plain(8080).unwrap();
        assert_eq!(c.kind, ConnectorKind::Plain);
        assert_eq!(c.bind_target(), ("0.0.0.0".to_string(), 8080));
    }

    #[test]
    fn blank_interface_binds_all_interfaces() {
        let f = ConnectorFactory::new(
            Arc::new(CertificateStore::new()),
            "chat.example.org",
            Some("   ".to_string()),
        );
        let c = f.build_plain(8080).unwrap();
        assert_eq!(c.bind_target().0, "0.0.0.0");
    }

    #[tokio::test]
    async fn secure_connector_requires_an_rsa_certificate() {
        let certs = Arc::new(CertificateStore::new());
        let f = factory(certs.clone());
        assert!(f.build_secure(8483).await.is_none());

        certs
            .install(
                "chat.example.org",
                CertBundle::new("tests/fixtures/ec_cert.pem", "tests/fixtures/ec_key.pem"),
                KeyAlgorithm::Ecdsa,
            )
            .unwrap();
        assert!(f.build_secure(8483).await.is_none());

        certs
            .install(
                "chat.example.org",
                CertBundle::new("tests/fixtures/cert.pem", "tests/fixtures/key.pem"),
                KeyAlgorithm::Rsa,
            )
            .unwrap();
        let c = f.build_secure(8483).await.unwrap();
        assert_eq!(c.kind, ConnectorKind::Secure);
        assert!(c.tls.is_some());
        assert!(f.build_secure(0).await.is_none());
    }
}
