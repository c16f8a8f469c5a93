// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Read side of the audit log. Writes go through `SqliteAuditSink`.

use async_trait::async_trait;
use sqlx::{sqlite::SqlitePool, QueryBuilder, Row, Sqlite};
use uuid::Uuid;
use warden_server_audit::{AuditCategory, AuditEntry};
use warden_server_auth::{OperatorId, UserId};

use crate::error::DbError;
use crate::types::{parse_datetime, parse_uuid, AuditLogFilter};

pub const DEFAULT_AUDIT_PAGE_SIZE: i64 = 50;
pub const MAX_AUDIT_PAGE_SIZE: i64 = 500;

#[async_trait]
pub trait AuditStore: Send + Sync {
	async fn list_entries(&self, filter: &AuditLogFilter) -> Result<(Vec<AuditEntry>, i64), DbError>;
	async fn get_entry(&self, id: Uuid) -> Result<Option<AuditEntry>, DbError>;
}

#[derive(Clone)]
pub struct AuditRepository {
	pool: SqlitePool,
}

const AUDIT_COLUMNS: &str = "id, category, action, description, user_id, operator_id, \
	impersonated_user_id, ip_address, user_agent, method, path, request_body, response_status, \
	duration_ms, error_message, error_stack, metadata, created_at";

fn push_filters<'a>(builder: &mut QueryBuilder<'a, Sqlite>, filter: &'a AuditLogFilter) {
	builder.push(" WHERE 1 = 1");
	if let Some(category) = &filter.category {
		builder.push(" AND category = ").push_bind(category.as_str());
	}
	if let Some(action) = &filter.action {
		builder.push(" AND action = ").push_bind(action.as_str());
	}
	if let Some(operator_id) = &filter.operator_id {
		builder
			.push(" AND operator_id = ")
			.push_bind(operator_id.to_string());
	}
	if let Some(user_id) = &filter.user_id {
		builder
			.push(" AND (user_id = ")
			.push_bind(user_id.to_string())
			.push(" OR impersonated_user_id = ")
			.push_bind(user_id.to_string())
			.push(")");
	}
	if let Some(from) = &filter.from {
		builder.push(" AND created_at >= ").push_bind(from.to_rfc3339());
	}
	if let Some(to) = &filter.to {
		builder.push(" AND created_at < ").push_bind(to.to_rfc3339());
	}
}

impl AuditRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Newest first. Returns the page and the total matching count.
	#[tracing::instrument(skip(self, filter))]
	pub async fn list_entries(
		&self,
		filter: &AuditLogFilter,
	) -> Result<(Vec<AuditEntry>, i64), DbError> {
		let limit = filter
			.limit
			.unwrap_or(DEFAULT_AUDIT_PAGE_SIZE)
			.clamp(1, MAX_AUDIT_PAGE_SIZE);
		let offset = filter.offset.unwrap_or(0).max(0);

		let mut count_query = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM audit_logs");
		push_filters(&mut count_query, filter);
		let total: i64 = count_query
			.build_query_scalar::<i64>()
			.fetch_one(&self.pool)
			.await?;

		let mut query = QueryBuilder::<Sqlite>::new(format!("SELECT {AUDIT_COLUMNS} FROM audit_logs"));
		push_filters(&mut query, filter);
		query
			.push(" ORDER BY created_at DESC, rowid DESC LIMIT ")
			.push_bind(limit)
			.push(" OFFSET ")
			.push_bind(offset);

		let rows = query.build().fetch_all(&self.pool).await?;
		let entries = rows.iter().map(row_to_entry).collect::<Result<Vec<_>, _>>()?;
		Ok((entries, total))
	}

	#[tracing::instrument(skip(self), fields(audit_id = %id))]
	pub async fn get_entry(&self, id: Uuid) -> Result<Option<AuditEntry>, DbError> {
		let sql = format!("SELECT {AUDIT_COLUMNS} FROM audit_logs WHERE id = ?");
		let row = sqlx::query(&sql)
			.bind(id.to_string())
			.fetch_optional(&self.pool)
			.await?;
		row.map(|r| row_to_entry(&r)).transpose()
	}
}

fn row_to_entry(row: &sqlx::sqlite::SqliteRow) -> Result<AuditEntry, DbError> {
	let id: String = row.get("id");
	let category: String = row.get("category");
	let created_at: String = row.get("created_at");
	let user_id: Option<String> = row.get("user_id");
	let operator_id: Option<String> = row.get("operator_id");
	let impersonated_user_id: Option<String> = row.get("impersonated_user_id");
	let request_body: Option<String> = row.get("request_body");
	let response_status: Option<i64> = row.get("response_status");
	let metadata: Option<String> = row.get("metadata");

	Ok(AuditEntry {
		id: parse_uuid("audit id", &id)?,
		created_at: parse_datetime("created_at", &created_at)?,
		category: category
			.parse::<AuditCategory>()
			.map_err(DbError::Internal)?,
		action: row.get("action"),
		description: row.get("description"),
		user_id: user_id
			.map(|s| parse_uuid("user_id", &s).map(UserId::new))
			.transpose()?,
		operator_id: operator_id
			.map(|s| parse_uuid("operator_id", &s).map(OperatorId::new))
			.transpose()?,
		impersonated_user_id: impersonated_user_id
			.map(|s| parse_uuid("impersonated_user_id", &s).map(UserId::new))
			.transpose()?,
		ip_address: row.get("ip_address"),
		user_agent: row.get("user_agent"),
		method: row.get("method"),
		path: row.get("path"),
		request_body: request_body
			.map(|s| serde_json::from_str(&s))
			.transpose()?,
		response_status: response_status.and_then(|s| u16::try_from(s).ok()),
		duration_ms: row.get("duration_ms"),
		error_message: row.get("error_message"),
		error_stack: row.get("error_stack"),
		metadata: metadata
			.map(|s| serde_json::from_str(&s))
			.transpose()?
			.unwrap_or(serde_json::Value::Null),
	})
}

#[async_trait]
impl AuditStore for AuditRepository {
	async fn list_entries(&self, filter: &AuditLogFilter) -> Result<(Vec<AuditEntry>, i64), DbError> {
		self.list_entries(filter).await
	}

	async fn get_entry(&self, id: Uuid) -> Result<Option<AuditEntry>, DbError> {
		self.get_entry(id).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::create_test_pool;
	use chrono::{Duration, Utc};
	use serde_json::json;
	use std::sync::Arc;
	use warden_server_audit::{actions, AuditSink, SqliteAuditSink};

	async fn seed(pool: &SqlitePool, entries: Vec<AuditEntry>) {
		let sink = SqliteAuditSink::new(pool.clone());
		for entry in entries {
			sink.publish(Arc::new(entry)).await.unwrap();
		}
	}

	#[tokio::test]
	async fn lists_newest_first_with_total() {
		let pool = create_test_pool().await;
		let now = Utc::now();
		let mut entries = Vec::new();
		for i in 0..5 {
			let mut e = AuditEntry::builder(AuditCategory::Api, actions::API_REQUEST)
				.request("GET", format!("/api/admin/settings/k{i}"))
				.build();
			e.created_at = now - Duration::seconds(10 - i);
			entries.push(e);
		}
		seed(&pool, entries).await;

		let repo = AuditRepository::new(pool);
		let (page, total) = repo
			.list_entries(&AuditLogFilter {
				limit: Some(2),
				..Default::default()
			})
			.await
			.unwrap();
		assert_eq!(total, 5);
		assert_eq!(page.len(), 2);
		assert_eq!(page[0].path.as_deref(), Some("/api/admin/settings/k4"));
		assert_eq!(page[1].path.as_deref(), Some("/api/admin/settings/k3"));
	}

	#[tokio::test]
	async fn filters_by_category_action_and_principal() {
		let pool = create_test_pool().await;
		let operator = OperatorId::generate();
		let target = UserId::generate();
		seed(
			&pool,
			vec![
				AuditEntry::builder(AuditCategory::Operator, actions::IMPERSONATION_STARTED)
					.operator(operator)
					.impersonated_user(target)
					.meta("reason", "ticket")
					.build(),
				AuditEntry::builder(AuditCategory::User, actions::LOGIN)
					.user(UserId::generate())
					.build(),
				AuditEntry::builder(AuditCategory::System, actions::SERVER_STARTED).build(),
			],
		)
		.await;

		let repo = AuditRepository::new(pool);
		let (page, total) = repo
			.list_entries(&AuditLogFilter {
				category: Some(AuditCategory::Operator),
				operator_id: Some(operator),
				..Default::default()
			})
			.await
			.unwrap();
		assert_eq!(total, 1);
		assert_eq!(page[0].action, actions::IMPERSONATION_STARTED);
		assert_eq!(page[0].impersonated_user_id, Some(target));
		assert_eq!(page[0].metadata, json!({"reason": "ticket"}));

		let (_, by_user) = repo
			.list_entries(&AuditLogFilter {
				user_id: Some(target),
				..Default::default()
			})
			.await
			.unwrap();
		assert_eq!(by_user, 1);

		let (_, by_action) = repo
			.list_entries(&AuditLogFilter {
				action: Some(actions::SERVER_STARTED.to_string()),
				..Default::default()
			})
			.await
			.unwrap();
		assert_eq!(by_action, 1);
	}

	#[tokio::test]
	async fn get_entry_round_trips_optional_fields() {
		let pool = create_test_pool().await;
		let entry = AuditEntry::builder(AuditCategory::Api, actions::API_REQUEST)
			.request("PUT", "/api/admin/settings/x")
			.request_body(json!({"value": "[REDACTED]"}))
			.response(204, 12)
			.build();
		seed(&pool, vec![entry.clone()]).await;

		let repo = AuditRepository::new(pool);
		let fetched = repo.get_entry(entry.id).await.unwrap().unwrap();
		assert_eq!(fetched.response_status, Some(204));
		assert_eq!(fetched.duration_ms, Some(12));
		assert_eq!(fetched.request_body, Some(json!({"value": "[REDACTED]"})));
		assert!(fetched.metadata.is_null());
		assert!(repo.get_entry(Uuid::new_v4()).await.unwrap().is_none());
	}
}
