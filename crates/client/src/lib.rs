//! Network side of swcache.
//!
//! This crate provides the `Fetcher` seam the worker falls back to (or
//! starts with, depending on strategy) and its reqwest implementation.

pub mod fetch;

pub use fetch::{FetchConfig, Fetcher, HttpFetcher};
