//! The running listener set.

use std::time::Duration;

use axum::Router;
use tokio::task::JoinHandle;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::bind::BindError;
use crate::lifecycle::Shutdown;
use crate::net::connector::{Connector, ConnectorKind};

/// Fixed path prefix under which the external tunneling handler is
/// mounted on every listener.
pub const HANDLER_MOUNT_POINT: &str = "/http-bind";

/// A bound and serving listener set.
///
/// Created whole by [`launch`](Self::launch) and destroyed whole by
/// [`stop`](Self::stop); there is no incremental listener update.
pub struct RunningService {
    connectors: Vec<Connector>,
    shutdown: Shutdown,
    secure_handles: Vec<axum_server::Handle>,
    tasks: Vec<JoinHandle<()>>,
}

impl RunningService {
    /// Bind every connector and start serving the handler application.
    ///
    /// Binding is synchronous so that a port conflict surfaces here and
    /// not inside a detached task. If any bind fails, listeners started
    /// so far are torn down before the error is returned.
    pub async fn launch(connectors: Vec<Connector>, app: Router) -> Result<Self, BindError> {
        // Long-poll requests hold for a while, but never forever.
        let app = Router::new()
            .nest_service(HANDLER_MOUNT_POINT, app)
            .layer(TimeoutLayer::new(Duration::from_secs(90)))
            .layer(TraceLayer::new_for_http());

        let mut service = Self {
            connectors: Vec::with_capacity(connectors.len()),
            shutdown: Shutdown::new(),
            secure_handles: Vec::new(),
            tasks: Vec::new(),
        };

        for connector in connectors {
            let started = match connector.kind {
                ConnectorKind::Plain => service.start_plain(&connector, app.clone()).await,
                ConnectorKind::Secure => service.start_secure(&connector, app.clone()),
            };
            match started {
                Ok(()) => service.connectors.push(connector),
                Err(e) => {
                    service.stop().await;
                    return Err(e);
                }
            }
        }
        Ok(service)
    }

    async fn start_plain(&mut self, connector: &Connector, app: Router) -> Result<(), BindError> {
        let listener = tokio::net::TcpListener::bind(connector.bind_target()).await?;
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Plaintext HTTP bind listener bound");

        let mut shutdown_rx = self.shutdown.subscribe();
        self.tasks.push(tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            });
            if let Err(e) = serve.await {
                tracing::error!(error = %e, "Plaintext HTTP bind listener terminated");
            }
        }));
        Ok(())
    }

    fn start_secure(&mut self, connector: &Connector, app: Router) -> Result<(), BindError> {
        let Some(tls) = connector.tls.clone() else {
            // The factory never emits a secure connector without material.
            tracing::warn!(port = connector.port, "Secure connector without TLS material");
            return Ok(());
        };
        let listener = std::net::TcpListener::bind(connector.bind_target())?;
        listener.set_nonblocking(true)?;
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Secure HTTP bind listener bound");

        let handle = axum_server::Handle::new();
        let server = axum_server::from_tcp_rustls(listener, tls).handle(handle.clone());
        self.secure_handles.push(handle);
        self.tasks.push(tokio::spawn(async move {
            if let Err(e) = server.serve(app.into_make_service()).await {
                tracing::error!(error = %e, "Secure HTTP bind listener terminated");
            }
        }));
        Ok(())
    }

    /// Stop the listener set and wait until the sockets are released, so
    /// the same ports can be rebound by a replacement set immediately.
    pub async fn stop(mut self) {
        tracing::info!("Stopping HTTP bind listeners");
        self.shutdown.trigger();
        for handle in &self.secure_handles {
            handle.graceful_shutdown(Some(Duration::from_secs(5)));
        }
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                if e.is_panic() {
                    tracing::error!("HTTP bind listener task panicked during shutdown");
                }
            }
        }
    }

    /// Port of the bound plaintext listener, if one is part of the set.
    pub fn plain_port(&self) -> Option<u16> {
        self.port_of(ConnectorKind::Plain)
    }

    /// Port of the bound secure listener, if one is part of the set.
    pub fn secure_port(&self) -> Option<u16> {
        self.port_of(ConnectorKind::Secure)
    }

    fn port_of(&self, kind: ConnectorKind) -> Option<u16> {
        self.connectors
            .iter()
            .find(|c| c.kind == kind)
            .map(|c| c.port)
    }
}
