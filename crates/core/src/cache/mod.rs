//! SQLite-backed storage for named, versioned cache stores.
//!
//! This module mirrors the platform Cache Storage model on top of SQLite with
//! async access via tokio-rusqlite. It supports:
//!
//! - Named stores that are opened (created) and deleted as a whole
//! - Request/response entries keyed by SHA-256 of method and URL
//! - Atomic multi-entry inserts for seeding
//! - Automatic schema migrations and WAL mode

pub mod connection;
pub mod entries;
pub mod entry;
pub mod hash;
pub mod migrations;
pub mod storage;
pub mod stores;

pub use crate::Error;

pub use connection::CacheDb;
pub use entry::{CachedResponse, Request};
pub use storage::CacheStorage;
pub use stores::StoreInfo;
