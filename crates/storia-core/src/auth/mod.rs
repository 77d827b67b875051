//! Authentication module for managing the user session.
//!
//! This module provides `Session`: the bearer token returned by `/login`,
//! persisted to disk until logout. Story API tokens carry no expiry we can
//! see, so a stored session stays valid until it is cleared.

pub mod session;

pub use session::{Session, SessionData};
