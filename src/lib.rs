//! HTTP-Bind (BOSH) transport lifecycle for a messaging server.
//!
//! # Architecture Overview
//!
//! ```text
//!   admin API ──────────────┐
//!   property change feed ───┤                ┌──────────────┐
//!                           ▼                │  net         │
//!                   ┌──────────────┐ builds  │  connector   │
//!                   │ bind manager │────────▶│  factory     │
//!                   └──────┬───────┘         └──────┬───────┘
//!                          │ stop + relaunch        │ TLS material
//!                          ▼                        ▼
//!                   ┌──────────────┐         ┌──────────────┐
//!   cert events ───▶│ event bridge │         │ certs store  │
//!                   └──────────────┘         └──────────────┘
//! ```
//!
//! The manager owns the plaintext and TLS listeners that carry the
//! HTTP-Bind tunneling transport. Every configuration change performs a
//! full stop-then-rebuild of the listener set under a single lock; the
//! request-handling application itself is external and simply mounts
//! under the fixed `/http-bind` path.

// Core subsystems
pub mod bind;
pub mod certs;
pub mod config;
pub mod net;

// Cross-cutting concerns
pub mod lifecycle;

pub use bind::manager::BindManager;
pub use bind::BindError;
pub use certs::store::CertificateStore;
pub use config::store::PropertyStore;
pub use lifecycle::Shutdown;
