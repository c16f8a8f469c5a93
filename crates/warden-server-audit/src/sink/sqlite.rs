// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::error::AuditSinkError;
use crate::event::AuditEntry;
use crate::sink::AuditSink;

/// Inserts entries into `audit_logs`. The sink only ever inserts.
pub struct SqliteAuditSink {
	pool: SqlitePool,
	name: String,
}

impl SqliteAuditSink {
	pub fn new(pool: SqlitePool) -> Self {
		Self {
			pool,
			name: "sqlite".to_string(),
		}
	}
}

#[async_trait]
impl AuditSink for SqliteAuditSink {
	fn name(&self) -> &str {
		&self.name
	}

	async fn publish(&self, entry: Arc<AuditEntry>) -> Result<(), AuditSinkError> {
		let request_body_json = entry
			.request_body
			.as_ref()
			.map(serde_json::to_string)
			.transpose()
			.map_err(|e| {
				AuditSinkError::Permanent(format!("failed to serialize request_body: {e}"))
			})?;

		let metadata_json = if entry.metadata.is_null() {
			None
		} else {
			Some(serde_json::to_string(&entry.metadata).map_err(|e| {
				AuditSinkError::Permanent(format!("failed to serialize metadata: {e}"))
			})?)
		};

		sqlx::query(
			r#"
			INSERT INTO audit_logs (
				id, category, action, description, user_id, operator_id,
				impersonated_user_id, ip_address, user_agent, method, path,
				request_body, response_status, duration_ms, error_message,
				error_stack, metadata, created_at
			) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(entry.id.to_string())
		.bind(entry.category.as_str())
		.bind(&entry.action)
		.bind(&entry.description)
		.bind(entry.user_id.map(|u| u.to_string()))
		.bind(entry.operator_id.map(|o| o.to_string()))
		.bind(entry.impersonated_user_id.map(|u| u.to_string()))
		.bind(&entry.ip_address)
		.bind(&entry.user_agent)
		.bind(&entry.method)
		.bind(&entry.path)
		.bind(&request_body_json)
		.bind(entry.response_status.map(i64::from))
		.bind(entry.duration_ms)
		.bind(&entry.error_message)
		.bind(&entry.error_stack)
		.bind(&metadata_json)
		.bind(entry.created_at.to_rfc3339())
		.execute(&self.pool)
		.await
		.map_err(|e| {
			if is_transient_error(&e) {
				AuditSinkError::Transient(format!("database error: {e}"))
			} else {
				AuditSinkError::Permanent(format!("database error: {e}"))
			}
		})?;

		Ok(())
	}

	async fn health_check(&self) -> Result<(), AuditSinkError> {
		sqlx::query("SELECT 1")
			.execute(&self.pool)
			.await
			.map_err(|e| AuditSinkError::Transient(format!("health check failed: {e}")))?;
		Ok(())
	}
}

fn is_transient_error(e: &sqlx::Error) -> bool {
	match e {
		sqlx::Error::Io(_) => true,
		sqlx::Error::PoolTimedOut => true,
		sqlx::Error::PoolClosed => true,
		sqlx::Error::Database(db_err) => {
			let msg = db_err.message().to_lowercase();
			msg.contains("busy") || msg.contains("locked") || msg.contains("timeout")
		}
		_ => false,
	}
}

#[cfg(test)]
pub(crate) mod tests {
	use super::*;
	use crate::event::AuditCategory;
	use serde_json::json;
	use sqlx::sqlite::SqlitePoolOptions;
	use sqlx::Row;

	/// Mirrors the `audit_logs` migration in warden-server-db.
	pub(crate) async fn audit_pool() -> SqlitePool {
		let pool = SqlitePoolOptions::new()
			.max_connections(1)
			.connect(":memory:")
			.await
			.unwrap();
		sqlx::query(
			r#"
			CREATE TABLE audit_logs (
				id TEXT PRIMARY KEY,
				category TEXT NOT NULL,
				action TEXT NOT NULL,
				description TEXT,
				user_id TEXT,
				operator_id TEXT,
				impersonated_user_id TEXT,
				ip_address TEXT,
				user_agent TEXT,
				method TEXT,
				path TEXT,
				request_body TEXT,
				response_status INTEGER,
				duration_ms INTEGER,
				error_message TEXT,
				error_stack TEXT,
				metadata TEXT,
				created_at TEXT NOT NULL
			)
			"#,
		)
		.execute(&pool)
		.await
		.unwrap();
		pool
	}

	#[tokio::test]
	async fn publish_inserts_row() {
		let pool = audit_pool().await;
		let sink = SqliteAuditSink::new(pool.clone());

		let entry = AuditEntry::builder(AuditCategory::Api, "api_request")
			.request("GET", "/api/admin/audit-logs")
			.response(200, 3)
			.meta("k", "v")
			.build();
		sink.publish(Arc::new(entry.clone())).await.unwrap();

		let row = sqlx::query("SELECT category, path, response_status, metadata FROM audit_logs WHERE id = ?")
			.bind(entry.id.to_string())
			.fetch_one(&pool)
			.await
			.unwrap();
		assert_eq!(row.get::<String, _>("category"), "api");
		assert_eq!(row.get::<String, _>("path"), "/api/admin/audit-logs");
		assert_eq!(row.get::<i64, _>("response_status"), 200);
		let metadata: serde_json::Value =
			serde_json::from_str(&row.get::<String, _>("metadata")).unwrap();
		assert_eq!(metadata, json!({"k": "v"}));
	}

	#[tokio::test]
	async fn missing_table_is_permanent() {
		let pool = SqlitePoolOptions::new()
			.max_connections(1)
			.connect(":memory:")
			.await
			.unwrap();
		let sink = SqliteAuditSink::new(pool);
		let entry = AuditEntry::builder(AuditCategory::System, "x").build();
		let err = sink.publish(Arc::new(entry)).await.unwrap_err();
		assert!(!err.is_transient());
	}

	#[tokio::test]
	async fn health_check_ok() {
		let sink = SqliteAuditSink::new(audit_pool().await);
		assert_eq!(sink.name(), "sqlite");
		assert!(sink.health_check().await.is_ok());
	}
}
