//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Open property store → build certificate store → BindManager::start
//!
//! Shutdown (shutdown.rs):
//!     Signal received → event bridge stops → listeners drain → exit
//! ```
//!
//! # Design Decisions
//! - Shutdown is broadcast, never polled: every listener task and the
//!   event bridge hold their own receiver
//! - Stopping waits for the sockets to be released so the same ports can
//!   be rebound immediately afterwards

pub mod shutdown;

pub use shutdown::Shutdown;
