//! periapi - a thin client for the Periscope private HTTP API
//!
//! Wraps an authenticated [`Session`] with one method per endpoint, plus the
//! small amount of response normalization the endpoints need.

pub mod api;
pub mod config;

pub use api::{ApiError, HttpSession, PeriApi, Session};
pub use config::Config;
