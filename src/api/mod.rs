//! Periscope API integration module
//!
//! Provides session token management, the authenticated HTTP session and
//! the endpoint client for the Periscope private API.

pub mod auth;
pub mod client;
pub mod error;
pub mod models;
pub mod response;
pub mod session;

// Re-export commonly used types
pub use auth::TokenStore;
pub use client::PeriApi;
pub use error::{ApiError, ApiResult};
pub use models::{Endpoint, FormField, WatchPing};
pub use session::{HttpSession, Session};
