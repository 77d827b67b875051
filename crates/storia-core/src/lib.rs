//! Core library for storia: an offline-resilient client for the Story API.
//!
//! - `cache`: persistent record store and offline views over it
//! - `api`: API client with network-first, cache-fallback fetching
//! - `worker`: request interception worker with its own response caches
//! - `auth`: session persistence
//! - `config`: application configuration
//! - `models`: stories and API payloads

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod utils;
pub mod worker;

pub use error::ErrorKind;
