//! Shared utilities for lifecycle integration tests.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::any;
use axum::Router;
use http_bind::certs::material::CertBundle;
use http_bind::config::schema::{HTTP_BIND_PORT, HTTP_BIND_SECURE_PORT};
use http_bind::{BindManager, CertificateStore, PropertyStore};

/// Host name the test manager advertises; the fixture certificate is
/// issued for it.
pub const HOST: &str = "localhost";

#[allow(dead_code)]
pub fn rsa_bundle() -> CertBundle {
    CertBundle::new("tests/fixtures/cert.pem", "tests/fixtures/key.pem")
}

#[allow(dead_code)]
pub fn ec_bundle() -> CertBundle {
    CertBundle::new("tests/fixtures/ec_cert.pem", "tests/fixtures/ec_key.pem")
}

/// Stand-in for the external tunneling handler: answers "ok" at the
/// mount point.
pub fn handler_app() -> Router {
    Router::new().route("/", any(|| async { "ok" }))
}

pub struct TestService {
    pub manager: Arc<BindManager>,
    pub settings: Arc<PropertyStore>,
    pub certs: Arc<CertificateStore>,
}

/// Manager over an in-memory property store with the given port
/// overrides. Not yet started.
pub fn build(plain: i64, secure: i64) -> TestService {
    let settings = Arc::new(PropertyStore::in_memory());
    settings.set(HTTP_BIND_PORT, plain);
    settings.set(HTTP_BIND_SECURE_PORT, secure);
    let certs = Arc::new(CertificateStore::new());
    let manager = Arc::new(BindManager::new(
        settings.clone(),
        certs.clone(),
        HOST,
        handler_app(),
    ));
    TestService {
        manager,
        settings,
        certs,
    }
}

/// Poll `cond` for up to five seconds. Event-triggered transitions are
/// asynchronous, so assertions on their outcome go through here.
#[allow(dead_code)]
pub async fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}

/// Whether something is accepting connections on the local port.
pub async fn port_open(port: u16) -> bool {
    tokio::net::TcpStream::connect(("127.0.0.1", port))
        .await
        .is_ok()
}
