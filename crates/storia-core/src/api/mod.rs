//! REST API client module for the Story API.
//!
//! This module provides the `ApiClient` for registering, logging in,
//! reading and posting stories, and managing push subscriptions. Every
//! request goes through a `Transport`; responses tagged with a cache key
//! are persisted and served back while the device is offline.
//!
//! The API uses bearer token authentication obtained from `/login`.

pub mod client;
pub mod connectivity;
pub mod error;
pub mod network;
pub mod transport;

pub use client::{ApiClient, DEFAULT_API_BASE_URL, DEFAULT_OFFLINE_NOTICE};
pub use connectivity::{ConnectivityMonitor, ConnectivityProbe};
pub use error::ApiError;
pub use network::{NetworkTransport, DEFAULT_TIMEOUT_SECS};
pub use transport::{
    Body, FormPart, FormValue, Method, Request, RequestMode, Response, Transport, TransportError,
};
