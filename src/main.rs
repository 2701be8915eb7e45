//! HTTP-Bind service binary.
//!
//! Composition root: opens the property store, builds the certificate
//! store, constructs the lifecycle manager with a placeholder handler at
//! the mount point, and runs until interrupted. In a full messaging
//! server the stanza-tunneling handler replaces the placeholder.

use std::path::PathBuf;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::routing::any;
use axum::Router;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use http_bind::certs::material::CertBundle;
use http_bind::certs::store::KeyAlgorithm;
use http_bind::config::watcher::PropertyWatcher;
use http_bind::{BindManager, CertificateStore, PropertyStore};

#[derive(Parser)]
#[command(name = "http-bind", about = "HTTP-Bind (BOSH) transport service")]
struct Args {
    /// Property file holding configuration overrides.
    #[arg(long, default_value = "httpbind.toml")]
    properties: PathBuf,

    /// Host name the server advertises in public URLs and under which
    /// its certificate is installed.
    #[arg(long, default_value = "localhost")]
    host: String,

    /// PEM certificate for the secure listener.
    #[arg(long, requires = "key")]
    cert: Option<PathBuf>,

    /// PEM private key for the secure listener.
    #[arg(long, requires = "cert")]
    key: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "http_bind=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    tracing::info!(host = %args.host, properties = ?args.properties, "http-bind starting");

    let settings = Arc::new(PropertyStore::open(&args.properties)?);
    let certs = Arc::new(CertificateStore::new());
    if let (Some(cert), Some(key)) = (&args.cert, &args.key) {
        certs.install(&args.host, CertBundle::new(cert, key), KeyAlgorithm::Rsa)?;
        tracing::info!(cert = ?cert, "Installed RSA certificate");
    }

    // Keep the watcher alive so external property edits are picked up.
    let _watcher = PropertyWatcher::new(settings.clone()).run()?;

    let manager = Arc::new(BindManager::new(
        settings,
        certs,
        &args.host,
        placeholder_app(),
    ));
    manager.start().await;

    if let Some(url) = manager.public_plain_url() {
        tracing::info!(url = %url, "HTTP bind endpoint available");
    }
    if let Some(url) = manager.public_secure_url() {
        tracing::info!(url = %url, "Secure HTTP bind endpoint available");
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");
    manager.stop().await;
    tracing::info!("Shutdown complete");
    Ok(())
}

/// Stand-in for the external tunneling-protocol handler.
fn placeholder_app() -> Router {
    Router::new().route(
        "/",
        any(|| async { (StatusCode::NOT_IMPLEMENTED, "no session handler attached") }),
    )
}
