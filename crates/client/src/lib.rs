//! Client code for shellcache.
//!
//! This crate provides the network transport and the caching worker
//! (install, activate and per-request routing) used by the server.

pub mod fetch;
pub mod worker;

pub use fetch::{FetchClient, FetchConfig, Network};
pub use worker::{Gatekeeper, Served, ServiceWorker, WorkerState};
