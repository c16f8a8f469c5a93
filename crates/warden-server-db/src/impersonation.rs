// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Impersonation session bookkeeping.
//!
//! Rows are created by `start` and closed exactly once by a conditional
//! update. A partial unique index allows one open session per operator, so
//! a second concurrent insert fails with `DbError::Conflict`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePool, Row};
use warden_common_secret::SecretString;
use warden_server_auth::{ImpersonationSessionId, OperatorId, UserId};

use crate::error::DbError;
use crate::types::{parse_datetime, parse_optional_datetime, parse_uuid, ImpersonationSession};

#[async_trait]
pub trait ImpersonationStore: Send + Sync {
	async fn create_session(&self, session: &ImpersonationSession) -> Result<(), DbError>;
	async fn get_session(
		&self,
		id: &ImpersonationSessionId,
	) -> Result<Option<ImpersonationSession>, DbError>;
	async fn latest_open_session(
		&self,
		operator_id: &OperatorId,
	) -> Result<Option<ImpersonationSession>, DbError>;
	async fn count_open_sessions(&self, operator_id: &OperatorId) -> Result<i64, DbError>;
	async fn end_session(
		&self,
		id: &ImpersonationSessionId,
		ended_at: DateTime<Utc>,
	) -> Result<bool, DbError>;
	async fn list_sessions_for_operator(
		&self,
		operator_id: &OperatorId,
		limit: i64,
	) -> Result<Vec<ImpersonationSession>, DbError>;
}

#[derive(Clone)]
pub struct ImpersonationRepository {
	pool: SqlitePool,
}

const SESSION_COLUMNS: &str = "id, operator_id, target_user_id, original_token, ip_address, \
	reason, started_at, ended_at";

impl ImpersonationRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// `DbError::Conflict` if the operator already has an open session.
	#[tracing::instrument(skip(self, session), fields(session_id = %session.id, operator_id = %session.operator_id))]
	pub async fn create_session(&self, session: &ImpersonationSession) -> Result<(), DbError> {
		sqlx::query(
			r#"
			INSERT INTO impersonation_sessions (
				id, operator_id, target_user_id, original_token, ip_address,
				reason, started_at, ended_at
			) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(session.id.to_string())
		.bind(session.operator_id.to_string())
		.bind(session.target_user_id.to_string())
		.bind(session.original_token.expose())
		.bind(&session.ip_address)
		.bind(&session.reason)
		.bind(session.started_at.to_rfc3339())
		.bind(session.ended_at.map(|dt| dt.to_rfc3339()))
		.execute(&self.pool)
		.await
		.map_err(|e| DbError::from_insert(e, "impersonation session"))?;

		tracing::debug!(session_id = %session.id, "impersonation session created");
		Ok(())
	}

	#[tracing::instrument(skip(self), fields(session_id = %id))]
	pub async fn get_session(
		&self,
		id: &ImpersonationSessionId,
	) -> Result<Option<ImpersonationSession>, DbError> {
		let sql = format!("SELECT {SESSION_COLUMNS} FROM impersonation_sessions WHERE id = ?");
		let row = sqlx::query(&sql)
			.bind(id.to_string())
			.fetch_optional(&self.pool)
			.await?;

		row.map(|r| row_to_session(&r)).transpose()
	}

	/// Most recently started open session. `rowid` breaks ties between rows
	/// started in the same instant.
	#[tracing::instrument(skip(self), fields(operator_id = %operator_id))]
	pub async fn latest_open_session(
		&self,
		operator_id: &OperatorId,
	) -> Result<Option<ImpersonationSession>, DbError> {
		let sql = format!(
			"SELECT {SESSION_COLUMNS} FROM impersonation_sessions \
			 WHERE operator_id = ? AND ended_at IS NULL \
			 ORDER BY started_at DESC, rowid DESC LIMIT 1"
		);
		let row = sqlx::query(&sql)
			.bind(operator_id.to_string())
			.fetch_optional(&self.pool)
			.await?;

		row.map(|r| row_to_session(&r)).transpose()
	}

	#[tracing::instrument(skip(self), fields(operator_id = %operator_id))]
	pub async fn count_open_sessions(&self, operator_id: &OperatorId) -> Result<i64, DbError> {
		let count: i64 = sqlx::query_scalar(
			"SELECT COUNT(*) FROM impersonation_sessions WHERE operator_id = ? AND ended_at IS NULL",
		)
		.bind(operator_id.to_string())
		.fetch_one(&self.pool)
		.await?;
		Ok(count)
	}

	/// Close a session. Returns `false` if it was already closed or does not
	/// exist, so concurrent callers cannot both succeed.
	#[tracing::instrument(skip(self), fields(session_id = %id))]
	pub async fn end_session(
		&self,
		id: &ImpersonationSessionId,
		ended_at: DateTime<Utc>,
	) -> Result<bool, DbError> {
		let result = sqlx::query(
			"UPDATE impersonation_sessions SET ended_at = ? WHERE id = ? AND ended_at IS NULL",
		)
		.bind(ended_at.to_rfc3339())
		.bind(id.to_string())
		.execute(&self.pool)
		.await?;

		Ok(result.rows_affected() == 1)
	}

	#[tracing::instrument(skip(self), fields(operator_id = %operator_id))]
	pub async fn list_sessions_for_operator(
		&self,
		operator_id: &OperatorId,
		limit: i64,
	) -> Result<Vec<ImpersonationSession>, DbError> {
		let sql = format!(
			"SELECT {SESSION_COLUMNS} FROM impersonation_sessions \
			 WHERE operator_id = ? ORDER BY started_at DESC, rowid DESC LIMIT ?"
		);
		let rows = sqlx::query(&sql)
			.bind(operator_id.to_string())
			.bind(limit.clamp(1, 1000))
			.fetch_all(&self.pool)
			.await?;

		rows.iter().map(row_to_session).collect()
	}
}

fn row_to_session(row: &sqlx::sqlite::SqliteRow) -> Result<ImpersonationSession, DbError> {
	let id: String = row.get("id");
	let operator_id: String = row.get("operator_id");
	let target_user_id: String = row.get("target_user_id");
	let original_token: String = row.get("original_token");
	let started_at: String = row.get("started_at");

	Ok(ImpersonationSession {
		id: ImpersonationSessionId::new(parse_uuid("session id", &id)?),
		operator_id: OperatorId::new(parse_uuid("operator_id", &operator_id)?),
		target_user_id: UserId::new(parse_uuid("target_user_id", &target_user_id)?),
		original_token: SecretString::new(original_token),
		ip_address: row.get("ip_address"),
		reason: row.get("reason"),
		started_at: parse_datetime("started_at", &started_at)?,
		ended_at: parse_optional_datetime("ended_at", row.get("ended_at"))?,
	})
}

#[async_trait]
impl ImpersonationStore for ImpersonationRepository {
	async fn create_session(&self, session: &ImpersonationSession) -> Result<(), DbError> {
		self.create_session(session).await
	}

	async fn get_session(
		&self,
		id: &ImpersonationSessionId,
	) -> Result<Option<ImpersonationSession>, DbError> {
		self.get_session(id).await
	}

	async fn latest_open_session(
		&self,
		operator_id: &OperatorId,
	) -> Result<Option<ImpersonationSession>, DbError> {
		self.latest_open_session(operator_id).await
	}

	async fn count_open_sessions(&self, operator_id: &OperatorId) -> Result<i64, DbError> {
		self.count_open_sessions(operator_id).await
	}

	async fn end_session(
		&self,
		id: &ImpersonationSessionId,
		ended_at: DateTime<Utc>,
	) -> Result<bool, DbError> {
		self.end_session(id, ended_at).await
	}

	async fn list_sessions_for_operator(
		&self,
		operator_id: &OperatorId,
		limit: i64,
	) -> Result<Vec<ImpersonationSession>, DbError> {
		self.list_sessions_for_operator(operator_id, limit).await
	}
}
