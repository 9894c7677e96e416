//! # janken-registry
//!
//! Read side of the connection registry plus the two stores behind it.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `registry` | [`ConnectionRegistry`] trait: list, register, remove |
//! | `memory` | In-process store, insertion ordered |
//! | `sqlite` | `SQLite` table behind an `r2d2` pool |
//!
//! The broadcast path only ever calls [`ConnectionRegistry::list_connections`].
//! `register` and `remove` belong to the connect/disconnect lifecycle and to
//! the optional stale-row cleanup.

#![deny(unsafe_code)]

pub mod errors;
pub mod memory;
pub mod registry;
pub mod sqlite;

pub use errors::{RegistryError, Result};
pub use memory::MemoryRegistry;
pub use registry::ConnectionRegistry;
pub use sqlite::{SqliteConfig, SqliteRegistry};
