// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections. Each section has a resolved type and a `*Layer`
//! with all-optional fields for merging.

mod audit;
mod auth;
mod database;
mod http;
mod logging;
mod secrets;

pub use audit::{AuditConfig, AuditConfigLayer};
pub use auth::{AuthConfig, AuthConfigLayer};
pub use database::{DatabaseConfig, DatabaseConfigLayer};
pub use http::{HttpConfig, HttpConfigLayer};
pub use logging::{LogFormat, LoggingConfig, LoggingConfigLayer};
pub use secrets::{SecretsConfig, SecretsConfigLayer, DEFAULT_KDF_SALT};
