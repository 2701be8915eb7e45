//! TLS material references and loading.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use axum_server::tls_rustls::RustlsConfig;
use thiserror::Error;

/// Error type for certificate material handling.
#[derive(Debug, Error)]
pub enum CertError {
    #[error("failed to read TLS material: {0}")]
    Io(#[from] std::io::Error),
    #[error("no certificate found in {0}")]
    NoCertificate(PathBuf),
    #[error("no private key found in {0}")]
    NoPrivateKey(PathBuf),
}

/// Opaque reference to a certificate/key pair on disk (PEM).
///
/// The lifecycle manager never looks inside; it only hands the bundle to
/// the TLS engine when a secure listener is built.
#[derive(Debug, Clone)]
pub struct CertBundle {
    cert_path: PathBuf,
    key_path: PathBuf,
}

impl CertBundle {
    pub fn new(cert_path: impl Into<PathBuf>, key_path: impl Into<PathBuf>) -> Self {
        Self {
            cert_path: cert_path.into(),
            key_path: key_path.into(),
        }
    }

    /// Check that the files exist and parse as PEM. Run when a bundle is
    /// installed, so broken material is rejected before a listener ever
    /// depends on it.
    pub fn verify(&self) -> Result<(), CertError> {
        let mut reader = BufReader::new(File::open(&self.cert_path)?);
        let certs: Vec<_> = rustls_pemfile::certs(&mut reader).collect::<Result<_, _>>()?;
        if certs.is_empty() {
            return Err(CertError::NoCertificate(self.cert_path.clone()));
        }

        let mut reader = BufReader::new(File::open(&self.key_path)?);
        if rustls_pemfile::private_key(&mut reader)?.is_none() {
            return Err(CertError::NoPrivateKey(self.key_path.clone()));
        }
        Ok(())
    }

    /// Materialize the bundle into a rustls server configuration.
    pub async fn load(&self) -> std::io::Result<RustlsConfig> {
        RustlsConfig::from_pem_file(&self.cert_path, &self.key_path).await
    }
}
