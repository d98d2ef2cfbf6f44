//! Generation storage.
//!
//! A worker writes into named generations through the [`BlobStore`] trait.
//! Two backends are provided:
//!
//! - [`CacheDb`]: persistent, SQLite via tokio-rusqlite, WAL mode, migrations
//! - [`MemoryStore`]: process-local, for tests and throwaway hosts
//!
//! Both key entries by the SHA-256 of method and URL.

pub mod connection;
pub mod entries;
pub mod hash;
pub mod memory;
pub mod migrations;
pub mod store;

pub use crate::Error;

pub use connection::CacheDb;
pub use memory::MemoryStore;
pub use store::BlobStore;
