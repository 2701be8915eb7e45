//! Port policy and listener construction.
//!
//! # Responsibilities
//! - Resolve effective ports from configuration, applying defaults
//! - Validate port combinations before any listener is touched
//! - Build plain/secure connector descriptors, degrading to
//!   plaintext-only when no usable TLS material exists

pub mod connector;
pub mod ports;

pub use connector::{Connector, ConnectorFactory, ConnectorKind};
pub use ports::InvalidConfiguration;
