//! Certificate store collaborator.
//!
//! # Data Flow
//! ```text
//! key-management subsystem
//!     → store.rs install/remove/notify_signed
//!     → CertificateEvent::{Created, Signed, Deleted} to subscribers
//!
//! Secure listener build:
//!     store.has_usable_certificate(host)
//!     → store.tls_material(host) → material.rs → rustls config
//! ```
//!
//! # Design Decisions
//! - The store is a registry of host → PEM bundle; it never interprets
//!   certificate contents beyond "a usable RSA entry exists"
//! - Events carry the key algorithm so consumers can skip certificates
//!   their transport cannot use

pub mod material;
pub mod store;

pub use material::CertBundle;
pub use store::{CertificateEvent, CertificateStore, KeyAlgorithm};
