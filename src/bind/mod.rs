//! HTTP-Bind connector lifecycle core.
//!
//! # Data Flow
//! ```text
//! admin API ──────────────────┐
//! property change feed ───┐   │
//! certificate events ──┐  │   │
//!                      ▼  ▼   ▼
//!                 events.rs → manager.rs
//!                                 │ stop old set, build connectors,
//!                                 ▼ launch, publish status snapshot
//!                            service.rs
//! ```
//!
//! # Design Decisions
//! - One mutex serializes every configuration transition; concurrent
//!   admin and certificate-triggered changes never interleave
//! - Reconfiguration always rebuilds the whole listener set: the server
//!   engine cannot swap a single listener safely while sharing ports
//! - Status reads come from an atomically swapped snapshot, never from
//!   state mid-transition

pub mod events;
pub mod manager;
pub mod service;

use thiserror::Error;

use crate::net::ports::InvalidConfiguration;

/// Error taxonomy of the lifecycle core.
///
/// Only `InvalidConfiguration` ever reaches administrative callers; bind
/// failures are logged and leave the service stopped, because the event
/// sources that trigger most reconfigurations have no caller to report
/// to.
#[derive(Debug, Error)]
pub enum BindError {
    #[error(transparent)]
    InvalidConfiguration(#[from] InvalidConfiguration),
    #[error("failed to start listener: {0}")]
    Bind(#[from] std::io::Error),
}
