//! HTTP companion surface for theme and status control.
//!
//! All routes live under `/api/v1/system` and require a bearer token.

pub mod auth;
pub mod routes;
pub mod server;

use std::sync::Arc;

use quillterm_core::ControlState;

pub use server::HttpApiServer;

/// State shared with the HTTP handlers and the auth middleware.
pub struct ApiState {
    pub control: Arc<ControlState>,
    pub auth_token: String,
}

impl ApiState {
    #[must_use]
    pub fn new(control: Arc<ControlState>, auth_token: String) -> Self {
        Self {
            control,
            auth_token,
        }
    }
}
