// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Embedded schema migrations.

use sqlx::sqlite::SqlitePool;

use crate::error::DbError;

const MIGRATIONS: &[(&str, &str)] = &[
	("001_users", include_str!("../migrations/001_users.sql")),
	("002_operators", include_str!("../migrations/002_operators.sql")),
	(
		"003_impersonation_sessions",
		include_str!("../migrations/003_impersonation_sessions.sql"),
	),
	("004_settings", include_str!("../migrations/004_settings.sql")),
	("005_audit_logs", include_str!("../migrations/005_audit_logs.sql")),
];

/// Run all database migrations (001-005).
///
/// Migrations are idempotent - safe to run multiple times.
#[tracing::instrument(skip(pool))]
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), DbError> {
	for (name, sql) in MIGRATIONS {
		for stmt in sql.split(';').filter(|s| !s.trim().is_empty()) {
			if let Err(e) = sqlx::query(stmt).execute(pool).await {
				let msg = e.to_string();
				if !msg.contains("already exists") && !msg.contains("duplicate column") {
					tracing::error!(migration = name, error = %e, "migration failed");
					return Err(e.into());
				}
			}
		}
		tracing::debug!(migration = name, "migration applied");
	}
	Ok(())
}
