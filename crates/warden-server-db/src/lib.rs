// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SQLite persistence for the Warden identity server.
//!
//! Each table has a `*Store` trait, used by the services above this crate,
//! and a `*Repository` implementing it over a [`sqlx::SqlitePool`].

pub mod audit;
pub mod error;
pub mod impersonation;
pub mod migrations;
pub mod operator;
pub mod pool;
pub mod settings;
pub mod types;
pub mod user;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use audit::{AuditRepository, AuditStore, DEFAULT_AUDIT_PAGE_SIZE, MAX_AUDIT_PAGE_SIZE};
pub use error::{DbError, Result};
pub use impersonation::{ImpersonationRepository, ImpersonationStore};
pub use migrations::run_migrations;
pub use operator::{OperatorRepository, OperatorStore};
pub use pool::create_pool;
pub use settings::{SettingsRepository, SettingsStore};
pub use types::{AuditLogFilter, ImpersonationSession, StoredSetting};
pub use user::{UserRepository, UserStore};

pub use sqlx::SqlitePool;
