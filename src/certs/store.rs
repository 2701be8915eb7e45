//! Certificate registry and mutation event feed.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::mpsc;

use crate::certs::material::{CertBundle, CertError};

/// Key algorithm of an installed certificate.
///
/// The HTTP-Bind transport sources its TLS material from an RSA key
/// pair, so everything else is reported but never used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAlgorithm {
    Rsa,
    Ecdsa,
    Ed25519,
}

/// Mutation of the certificate store, as seen by subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum CertificateEvent {
    Created {
        host: String,
        algorithm: KeyAlgorithm,
    },
    Signed {
        host: String,
        algorithm: KeyAlgorithm,
    },
    Deleted {
        host: String,
    },
}

struct CertEntry {
    bundle: CertBundle,
    algorithm: KeyAlgorithm,
}

/// Registry of host name → certificate bundle.
///
/// Maintained by the external key-management subsystem through
/// [`install`](Self::install) and [`remove`](Self::remove); the lifecycle
/// manager only queries it and listens to its event feed.
pub struct CertificateStore {
    inner: Mutex<Inner>,
}

struct Inner {
    entries: HashMap<String, CertEntry>,
    subscribers: Vec<mpsc::UnboundedSender<CertificateEvent>>,
}

impl CertificateStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                subscribers: Vec::new(),
            }),
        }
    }

    /// Install a bundle for `host`, verifying the PEM files first, and
    /// announce it to subscribers.
    pub fn install(
        &self,
        host: &str,
        bundle: CertBundle,
        algorithm: KeyAlgorithm,
    ) -> Result<(), CertError> {
        bundle.verify()?;
        let mut inner = self.lock();
        inner
            .entries
            .insert(host.to_string(), CertEntry { bundle, algorithm });
        dispatch(
            &mut inner,
            CertificateEvent::Created {
                host: host.to_string(),
                algorithm,
            },
        );
        Ok(())
    }

    /// Announce that the certificate for `host` was signed by a CA.
    /// Unknown hosts are ignored.
    pub fn notify_signed(&self, host: &str) {
        let mut inner = self.lock();
        let Some(algorithm) = inner.entries.get(host).map(|e| e.algorithm) else {
            return;
        };
        dispatch(
            &mut inner,
            CertificateEvent::Signed {
                host: host.to_string(),
                algorithm,
            },
        );
    }

    /// Remove the bundle for `host` and announce the deletion.
    pub fn remove(&self, host: &str) {
        let mut inner = self.lock();
        if inner.entries.remove(host).is_none() {
            return;
        }
        dispatch(
            &mut inner,
            CertificateEvent::Deleted {
                host: host.to_string(),
            },
        );
    }

    /// Whether a certificate the HTTP-Bind transport can serve with
    /// (RSA-keyed, addressed by `host`) is currently installed.
    pub fn has_usable_certificate(&self, host: &str) -> bool {
        self.lock()
            .entries
            .get(host)
            .map(|e| e.algorithm == KeyAlgorithm::Rsa)
            .unwrap_or(false)
    }

    /// TLS material for `host`, if any is installed.
    pub fn tls_material(&self, host: &str) -> Option<CertBundle> {
        self.lock().entries.get(host).map(|e| e.bundle.clone())
    }

    /// Subscribe to the mutation feed.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<CertificateEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().subscribers.push(tx);
        rx
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for CertificateStore {
    fn default() -> Self {
        Self::new()
    }
}

fn dispatch(inner: &mut Inner, event: CertificateEvent) {
    inner
        .subscribers
        .retain(|tx| tx.send(event.clone()).is_ok());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rsa_bundle() -> CertBundle {
        CertBundle::new("tests/fixtures/cert.pem", "tests/fixtures/key.pem")
    }

    fn ec_bundle() -> CertBundle {
        CertBundle::new("tests/fixtures/ec_cert.pem", "tests/fixtures/ec_key.pem")
    }

    #[test]
    fn only_rsa_entries_are_usable() {
        let store = CertificateStore::new();
        assert!(!store.has_usable_certificate("chat.example.org"));

        store
            .install("chat.example.org", ec_bundle(), KeyAlgorithm::Ecdsa)
            .unwrap();
        assert!(!store.has_usable_certificate("chat.example.org"));

        store
            .install("chat.example.org", rsa_bundle(), KeyAlgorithm::Rsa)
            .unwrap();
        assert!(store.has_usable_certificate("chat.example.org"));
        assert!(!store.has_usable_certificate("other.example.org"));
    }

    #[test]
    fn mutations_reach_subscribers_with_algorithm() {
        let store = CertificateStore::new();
        let mut feed = store.subscribe();

        store
            .install("chat.example.org", rsa_bundle(), KeyAlgorithm::Rsa)
            .unwrap();
        store.notify_signed("chat.example.org");
        store.remove("chat.example.org");
        store.remove("chat.example.org"); // already gone, no event

        assert_eq!(
            feed.try_recv().unwrap(),
            CertificateEvent::Created {
                host: "chat.example.org".to_string(),
                algorithm: KeyAlgorithm::Rsa,
            }
        );
        assert_eq!(
            feed.try_recv().unwrap(),
            CertificateEvent::Signed {
                host: "chat.example.org".to_string(),
                algorithm: KeyAlgorithm::Rsa,
            }
        );
        assert_eq!(
            feed.try_recv().unwrap(),
            CertificateEvent::Deleted {
                host: "chat.example.org".to_string(),
            }
        );
        assert!(feed.try_recv().is_err());
    }

    #[test]
    fn broken_material_is_rejected_at_install() {
        let store = CertificateStore::new();
        let bundle = CertBundle::new("tests/fixtures/cert.pem", "tests/fixtures/missing.pem");
        assert!(store
            .install("chat.example.org", bundle, KeyAlgorithm::Rsa)
            .is_err());
        assert!(!store.has_usable_certificate("chat.example.org"));
    }
}
