//! The connector lifecycle manager.
//!
//! # Responsibilities
//! - Own the running listener set and the only path that replaces it
//! - Serialize every configuration transition behind one mutex
//! - Publish a status snapshot for lock-free reads
//! - Register/unregister the event bridge on start/stop

use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::Router;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::bind::events::EventBridge;
use crate::bind::service::{RunningService, HANDLER_MOUNT_POINT};
use crate::bind::BindError;
use crate::certs::store::CertificateStore;
use crate::config::schema::{
    BIND_INTERFACE, HTTP_BIND_ENABLED, HTTP_BIND_ENABLED_DEFAULT, HTTP_BIND_PORT,
    HTTP_BIND_PORT_DEFAULT, HTTP_BIND_SECURE_PORT, HTTP_BIND_SECURE_PORT_DEFAULT,
};
use crate::config::store::PropertyStore;
use crate::net::connector::ConnectorFactory;
use crate::net::ports;

/// Immutable view of the running service, swapped wholesale after every
/// transition. Readers never observe a half-applied configuration.
#[derive(Debug, Clone, Default)]
pub struct ServiceStatus {
    pub running: bool,
    pub plain_port: Option<u16>,
    pub secure_port: Option<u16>,
}

struct ManagerState {
    running: Option<RunningService>,
    bridge: Option<BridgeHandle>,
    /// Ports last handed to a reconfigure, bound or not. The event
    /// bridge compares incoming property values against these to skip
    /// changes that are already applied.
    applied: (i64, i64),
}

struct BridgeHandle {
    shutdown: crate::lifecycle::Shutdown,
    task: JoinHandle<()>,
}

/// Lifecycle manager for the HTTP-Bind listeners.
///
/// One instance exists per process, owned by the composition root. All
/// state-mutating operations serialize on an internal mutex; status
/// queries read an atomic snapshot and never block on a transition in
/// flight.
pub struct BindManager {
    settings: Arc<PropertyStore>,
    certs: Arc<CertificateStore>,
    server_host: String,
    app: Router,
    state: Mutex<ManagerState>,
    status: ArcSwap<ServiceStatus>,
}

impl BindManager {
    /// `app` is the external tunneling-protocol handler; it will be
    /// mounted under [`HANDLER_MOUNT_POINT`] on every listener.
    pub fn new(
        settings: Arc<PropertyStore>,
        certs: Arc<CertificateStore>,
        server_host: &str,
        app: Router,
    ) -> Self {
        let applied = ports::resolve(&settings);
        Self {
            settings,
            certs,
            server_host: server_host.to_string(),
            app,
            state: Mutex::new(ManagerState {
                running: None,
                bridge: None,
                applied,
            }),
            status: ArcSwap::from_pointee(ServiceStatus::default()),
        }
    }

    /// Enter service: subscribe to both event feeds and, if the service
    /// is administratively enabled, bring the listeners up.
    ///
    /// The event registration happens regardless of the enabled flag so
    /// that enabling later can react to certificates that arrived while
    /// disabled. Bind failures are logged, never returned; the hosting
    /// server keeps running without this transport.
    pub async fn start(self: &Arc<Self>) {
        {
            let mut state = self.state.lock().await;
            if state.bridge.is_some() {
                tracing::warn!("HTTP bind service already started");
                return;
            }
            let shutdown = crate::lifecycle::Shutdown::new();
            let task = EventBridge::new(Arc::clone(self)).spawn(
                self.settings.subscribe(),
                self.certs.subscribe(),
                shutdown.subscribe(),
            );
            state.bridge = Some(BridgeHandle { shutdown, task });
        }

        if !self
            .settings
            .get_bool(HTTP_BIND_ENABLED, HTTP_BIND_ENABLED_DEFAULT)
        {
            tracing::info!("HTTP bind service is disabled");
            return;
        }
        let (plain, secure) = ports::resolve(&self.settings);
        if let Err(e) = self.reconfigure(plain, secure).await {
            tracing::error!(error = %e, "Error starting HTTP bind service");
        }
    }

    /// Leave service: unregister from the event feeds and stop the
    /// listener set. Idempotent.
    ///
    /// The bridge is drained first, and outside the lock: an event that
    /// is already in flight gets to finish its reconfigure, and the
    /// listener set it may have rebound is what gets stopped below.
    /// Stopping listeners first would let that same event bring them
    /// back after this method returned.
    pub async fn stop(&self) {
        let bridge = self.state.lock().await.bridge.take();
        if let Some(bridge) = bridge {
            bridge.shutdown.trigger();
            if let Err(e) = bridge.task.await {
                if e.is_panic() {
                    tracing::error!("Event bridge panicked during shutdown");
                }
            }
        }

        let mut state = self.state.lock().await;
        if let Some(service) = state.running.take() {
            service.stop().await;
        }
        self.status.store(Arc::new(ServiceStatus::default()));
    }

    /// Replace the listener set with one built for the given ports.
    ///
    /// The single choke point for every configuration change. Fails
    /// synchronously on an invalid port combination; every other failure
    /// is logged and leaves the service stopped, because event-triggered
    /// callers have nowhere to report it. Zero buildable connectors is a
    /// valid, silent outcome: disabling via ports is not an error.
    pub async fn reconfigure(&self, plain: i64, secure: i64) -> Result<(), BindError> {
        ports::validate(plain, secure)?;

        let mut state = self.state.lock().await;
        state.applied = (plain, secure);

        if let Some(service) = state.running.take() {
            service.stop().await;
        } else {
            tracing::debug!("No running HTTP bind listeners to stop");
        }
        self.status.store(Arc::new(ServiceStatus::default()));

        let factory = ConnectorFactory::new(
            Arc::clone(&self.certs),
            &self.server_host,
            self.settings.get_string(BIND_INTERFACE),
        );
        let mut connectors = Vec::new();
        if let Some(c) = factory.build_plain(plain) {
            connectors.push(c);
        }
        if let Some(c) = factory.build_secure(secure).await {
            connectors.push(c);
        }
        if connectors.is_empty() {
            tracing::info!(plain, secure, "No HTTP bind listeners configured");
            return Ok(());
        }

        match RunningService::launch(connectors, self.app.clone()).await {
            Ok(service) => {
                self.status.store(Arc::new(ServiceStatus {
                    running: true,
                    plain_port: service.plain_port(),
                    secure_port: service.secure_port(),
                }));
                tracing::info!(
                    plain_port = service.plain_port(),
                    secure_port = service.secure_port(),
                    "HTTP bind service started"
                );
                state.running = Some(service);
            }
            Err(e) => {
                tracing::error!(error = %e, "Error starting HTTP bind listeners");
            }
        }
        Ok(())
    }

    /// Administrative port change: validate and apply, then write the
    /// configuration back. A port equal to its compiled-in default is
    /// persisted by deleting the override.
    pub async fn set_ports(&self, plain: i64, secure: i64) -> Result<(), BindError> {
        self.reconfigure(plain, secure).await?;

        if plain == HTTP_BIND_PORT_DEFAULT {
            self.settings.delete(HTTP_BIND_PORT);
        } else {
            self.settings.set(HTTP_BIND_PORT, plain);
        }
        if secure == HTTP_BIND_SECURE_PORT_DEFAULT {
            self.settings.delete(HTTP_BIND_SECURE_PORT);
        } else {
            self.settings.set(HTTP_BIND_SECURE_PORT, secure);
        }
        Ok(())
    }

    /// Administrative enable/disable. Disabling stops the listeners but
    /// keeps the configured ports and the event registration, so a later
    /// enable restores the service exactly.
    pub async fn set_enabled(&self, enabled: bool) {
        self.apply_enabled(enabled).await;
        if enabled == HTTP_BIND_ENABLED_DEFAULT {
            self.settings.delete(HTTP_BIND_ENABLED);
        } else {
            self.settings.set(HTTP_BIND_ENABLED, enabled);
        }
    }

    /// Enable/disable without touching persisted configuration; the
    /// write-back path and the property event path both land here.
    pub(crate) async fn apply_enabled(&self, enabled: bool) {
        if enabled {
            if self.is_enabled() {
                return;
            }
            let (plain, secure) = ports::resolve(&self.settings);
            if let Err(e) = self.reconfigure(plain, secure).await {
                tracing::error!(error = %e, "Error enabling HTTP bind service");
            }
        } else {
            let mut state = self.state.lock().await;
            if let Some(service) = state.running.take() {
                service.stop().await;
                self.status.store(Arc::new(ServiceStatus::default()));
            }
        }
    }

    /// Rebuild the listener set with the currently resolved ports, so a
    /// freshly available certificate can upgrade a plaintext-only
    /// deployment, or a deleted one can downgrade it gracefully.
    ///
    /// Gated on the administrative flag, not on whether listeners are
    /// currently bound: after a bind failure the service sits stopped,
    /// and a certificate event is one of the ways it gets another
    /// attempt. An administratively disabled service stays stopped.
    pub(crate) async fn restart(&self) {
        if !self
            .settings
            .get_bool(HTTP_BIND_ENABLED, HTTP_BIND_ENABLED_DEFAULT)
        {
            return;
        }
        let (plain, secure) = ports::resolve(&self.settings);
        if let Err(e) = self.reconfigure(plain, secure).await {
            tracing::error!(error = %e, "Error restarting HTTP bind service");
        }
    }

    pub(crate) async fn applied_ports(&self) -> (i64, i64) {
        self.state.lock().await.applied
    }

    pub(crate) fn settings(&self) -> &PropertyStore {
        &self.settings
    }

    /// Whether a listener set is currently bound and serving.
    pub fn is_enabled(&self) -> bool {
        self.status.load().running
    }

    /// Port of the bound plaintext listener, if running.
    pub fn plain_port(&self) -> Option<u16> {
        self.status.load().plain_port
    }

    /// Port of the bound secure listener, if running.
    pub fn secure_port(&self) -> Option<u16> {
        self.status.load().secure_port
    }

    /// Configured plaintext port (default applied), bound or not.
    pub fn configured_plain_port(&self) -> i64 {
        ports::resolve(&self.settings).0
    }

    /// Configured secure port (default applied), bound or not.
    pub fn configured_secure_port(&self) -> i64 {
        ports::resolve(&self.settings).1
    }

    /// Public URL of the plaintext endpoint, if running.
    pub fn public_plain_url(&self) -> Option<String> {
        self.plain_port().map(|port| {
            format!(
                "http://{}:{}{}/",
                self.server_host, port, HANDLER_MOUNT_POINT
            )
        })
    }

    /// Public URL of the secure endpoint, if running.
    pub fn public_secure_url(&self) -> Option<String> {
        self.secure_port().map(|port| {
            format!(
                "https://{}:{}{}/",
                self.server_host, port, HANDLER_MOUNT_POINT
            )
        })
    }
}
