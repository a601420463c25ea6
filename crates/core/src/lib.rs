//! Core types and shared functionality for shellcache.
//!
//! This crate provides:
//! - Versioned cache storage with SQLite backend
//! - Unified error types
//! - Configuration structures and the routing strategy

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheDb, CacheStorage, CachedResponse, Request};
pub use config::{AppConfig, Strategy};
pub use error::Error;
