//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! property file (TOML)
//!     → store.rs (flat name → value map, defaults applied on read)
//!     → consumers read named settings
//!
//! On mutation (admin API or external file edit):
//!     store.set / store.delete, or watcher.rs detects an edit
//!     → override map updated, file rewritten with overrides only
//!     → PropertyEvent::{Set, Deleted} dispatched to all subscribers
//! ```
//!
//! # Design Decisions
//! - Defaults are compiled in, never persisted: storing a value equal to
//!   its default is expressed by deleting the override
//! - The change feed is keyed by setting name; subscribers decide which
//!   names they care about
//! - A reload from disk replays only the difference as events

pub mod schema;
pub mod store;
pub mod watcher;

pub use store::{PropertyEvent, PropertyStore};
