// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP surface of the Warden identity server.
//!
//! Exposes login for users and operators, the operator impersonation flow,
//! the admin settings store and the audit log over Axum.

pub mod api;
pub mod auth_middleware;
pub mod error;
pub mod request_audit;
pub mod routes;

pub use api::{build_app_state, create_app_state, create_router, AppState};
pub use error::ServerError;
pub use warden_server_config::ServerConfig;
