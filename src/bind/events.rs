//! Bridge from the two external event feeds to manager operations.
//!
//! One task consumes administrative property changes and certificate
//! store mutations and turns each into the matching lifecycle call.
//! Nothing is ever propagated back into an event source: a failed
//! reconfigure is logged and the feed keeps flowing.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};

use crate::bind::manager::BindManager;
use crate::certs::store::{CertificateEvent, KeyAlgorithm};
use crate::config::schema::{
    HTTP_BIND_ENABLED, HTTP_BIND_ENABLED_DEFAULT, HTTP_BIND_PORT, HTTP_BIND_PORT_DEFAULT,
    HTTP_BIND_SECURE_PORT, HTTP_BIND_SECURE_PORT_DEFAULT,
};
use crate::config::store::{bool_value, int_value, PropertyEvent};
use crate::net::ports;

pub struct EventBridge {
    manager: Arc<BindManager>,
}

impl EventBridge {
    pub fn new(manager: Arc<BindManager>) -> Self {
        Self { manager }
    }

    /// Consume both feeds until the shutdown signal arrives or both
    /// sources close.
    pub fn spawn(
        self,
        mut properties: mpsc::UnboundedReceiver<PropertyEvent>,
        mut certificates: mpsc::UnboundedReceiver<CertificateEvent>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.recv() => {
                        tracing::debug!("Event bridge stopping");
                        break;
                    }
                    Some(event) = properties.recv() => self.on_property_event(event).await,
                    Some(event) = certificates.recv() => self.on_certificate_event(event).await,
                    else => break,
                }
            }
        })
    }

    async fn on_property_event(&self, event: PropertyEvent) {
        match event {
            PropertyEvent::Set { name, value } => match name.as_str() {
                HTTP_BIND_ENABLED => {
                    // A flag that does not read as true disables the
                    // service; garbage never switches listeners on.
                    let enabled = bool_value(&value).unwrap_or(false);
                    self.manager.apply_enabled(enabled).await;
                }
                HTTP_BIND_PORT => match int_value(&value) {
                    Some(port) => self.apply_plain_port(port).await,
                    None => {
                        tracing::warn!(?value, "Unparseable plain port; dropping override");
                        self.manager.settings().delete(HTTP_BIND_PORT);
                    }
                },
                HTTP_BIND_SECURE_PORT => match int_value(&value) {
                    Some(port) => self.apply_secure_port(port).await,
                    None => {
                        tracing::warn!(?value, "Unparseable secure port; dropping override");
                        self.manager.settings().delete(HTTP_BIND_SECURE_PORT);
                    }
                },
                _ => {}
            },
            PropertyEvent::Deleted { name } => match name.as_str() {
                HTTP_BIND_ENABLED => {
                    self.manager.apply_enabled(HTTP_BIND_ENABLED_DEFAULT).await;
                }
                HTTP_BIND_PORT => self.apply_plain_port(HTTP_BIND_PORT_DEFAULT).await,
                HTTP_BIND_SECURE_PORT => {
                    self.apply_secure_port(HTTP_BIND_SECURE_PORT_DEFAULT).await
                }
                _ => {}
            },
        }
    }

    async fn on_certificate_event(&self, event: CertificateEvent) {
        match event {
            // Only an RSA certificate can (re)activate the secure
            // listener; everything else is irrelevant to this transport.
            CertificateEvent::Created { algorithm, .. }
            | CertificateEvent::Signed { algorithm, .. } => {
                if algorithm == KeyAlgorithm::Rsa {
                    self.manager.restart().await;
                } else {
                    tracing::debug!(?algorithm, "Ignoring non-RSA certificate event");
                }
            }
            // A deletion may invalidate the bound secure listener no
            // matter which algorithm the removed certificate used.
            CertificateEvent::Deleted { .. } => self.manager.restart().await,
        }
    }

    async fn apply_plain_port(&self, port: i64) {
        let (applied_plain, _) = self.manager.applied_ports().await;
        if port == applied_plain {
            return;
        }
        let (_, secure) = ports::resolve(self.manager.settings());
        if let Err(e) = self.manager.reconfigure(port, secure).await {
            tracing::error!(error = %e, "Error setting HTTP bind ports");
        }
    }

    async fn apply_secure_port(&self, port: i64) {
        let (_, applied_secure) = self.manager.applied_ports().await;
        if port == applied_secure {
            return;
        }
        let (plain, _) = ports::resolve(self.manager.settings());
        if let Err(e) = self.manager.reconfigure(plain, port).await {
            tracing::error!(error = %e, "Error setting HTTP bind ports");
        }
    }
}
