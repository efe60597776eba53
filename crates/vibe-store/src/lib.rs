//! # vibe-store
//!
//! Record storage for the vibe matching protocol.
//!
//! [`VibeStore`] is the in-memory index the matching engine reads and writes.
//! Durability is delegated to a [`RecordPersistence`] backend: the SQLite
//! [`Database`] in production, [`MemoryPersistence`] in tests and ephemeral
//! nodes.

pub mod database;
pub mod memory;
pub mod migrations;
pub mod models;
pub mod persistence;
pub mod store;
pub mod vibes;

mod error;

pub use database::Database;
pub use error::{Result, StoreError};
pub use memory::MemoryPersistence;
pub use models::*;
pub use persistence::RecordPersistence;
pub use store::VibeStore;
