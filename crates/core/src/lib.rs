//! Core types and shared functionality for swcache.
//!
//! This crate provides:
//! - Request/response model with single-use bodies
//! - The `BlobStore` seam with SQLite and in-memory backends
//! - Generation names and asset manifests
//! - Configuration structures
//! - Unified error types

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod manifest;

pub use cache::{BlobStore, CacheDb, MemoryStore};
pub use config::{AppConfig, ConfigError, StoreBackend, Strategy};
pub use error::Error;
pub use http::{Request, Response, ResponseType};
pub use manifest::{AssetManifest, CacheGeneration};
