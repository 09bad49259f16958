//! SQLite-backed named cache stores.
//!
//! This module provides the engine's versioned request/response stores with
//! async access via tokio-rusqlite. It supports:
//!
//! - Named stores whose names embed a deployment version token
//! - Request-identity addressing using SHA-256 hashing
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - Wholesale store deletion for activation-time pruning

pub mod connection;
pub mod entries;
pub mod identity;
pub mod meta;
pub mod migrations;

pub use crate::Error;

pub use connection::StoreDb;
pub use entries::StoredResponse;
pub use identity::request_identity;
