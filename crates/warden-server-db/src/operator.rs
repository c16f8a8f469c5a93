// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Operator repository.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqlitePool, Row};
use warden_server_auth::{Operator, OperatorId, OperatorRole};

use crate::error::DbError;
use crate::types::{parse_datetime, parse_uuid};

#[async_trait]
pub trait OperatorStore: Send + Sync {
	async fn create_operator(
		&self,
		operator: &Operator,
		password_hash: Option<&str>,
	) -> Result<(), DbError>;
	async fn get_operator_by_id(&self, id: &OperatorId) -> Result<Option<Operator>, DbError>;
	async fn get_operator_by_email(&self, email: &str) -> Result<Option<Operator>, DbError>;
	async fn get_operator_password_hash(&self, id: &OperatorId) -> Result<Option<String>, DbError>;
	async fn set_operator_role(&self, id: &OperatorId, role: OperatorRole) -> Result<bool, DbError>;
	async fn deactivate_operator(&self, id: &OperatorId) -> Result<bool, DbError>;
}

#[derive(Clone)]
pub struct OperatorRepository {
	pool: SqlitePool,
}

impl OperatorRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	#[tracing::instrument(skip(self, operator, password_hash), fields(operator_id = %operator.id))]
	pub async fn create_operator(
		&self,
		operator: &Operator,
		password_hash: Option<&str>,
	) -> Result<(), DbError> {
		sqlx::query(
			r#"
			INSERT INTO operators (
				id, email, display_name, role, password_hash, is_active, created_at, updated_at
			) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(operator.id.to_string())
		.bind(&operator.email)
		.bind(&operator.display_name)
		.bind(operator.role.as_str())
		.bind(password_hash)
		.bind(operator.is_active as i32)
		.bind(operator.created_at.to_rfc3339())
		.bind(operator.updated_at.to_rfc3339())
		.execute(&self.pool)
		.await
		.map_err(|e| DbError::from_insert(e, "operator"))?;

		tracing::debug!(operator_id = %operator.id, role = %operator.role, "operator created");
		Ok(())
	}

	/// Returns inactive operators too; callers decide what inactive means.
	#[tracing::instrument(skip(self), fields(operator_id = %id))]
	pub async fn get_operator_by_id(&self, id: &OperatorId) -> Result<Option<Operator>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, email, display_name, role, is_active, created_at, updated_at
			FROM operators
			WHERE id = ?
			"#,
		)
		.bind(id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| row_to_operator(&r)).transpose()
	}

	#[tracing::instrument(skip(self, email))]
	pub async fn get_operator_by_email(&self, email: &str) -> Result<Option<Operator>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, email, display_name, role, is_active, created_at, updated_at
			FROM operators
			WHERE email = ?
			"#,
		)
		.bind(email)
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| row_to_operator(&r)).transpose()
	}

	#[tracing::instrument(skip(self), fields(operator_id = %id))]
	pub async fn get_operator_password_hash(
		&self,
		id: &OperatorId,
	) -> Result<Option<String>, DbError> {
		let hash: Option<Option<String>> =
			sqlx::query_scalar("SELECT password_hash FROM operators WHERE id = ?")
				.bind(id.to_string())
				.fetch_optional(&self.pool)
				.await?;
		Ok(hash.flatten())
	}

	/// Returns `false` if no such operator.
	#[tracing::instrument(skip(self), fields(operator_id = %id, role = %role))]
	pub async fn set_operator_role(
		&self,
		id: &OperatorId,
		role: OperatorRole,
	) -> Result<bool, DbError> {
		let result = sqlx::query("UPDATE operators SET role = ?, updated_at = ? WHERE id = ?")
			.bind(role.as_str())
			.bind(Utc::now().to_rfc3339())
			.bind(id.to_string())
			.execute(&self.pool)
			.await?;

		tracing::info!(operator_id = %id, role = %role, "operator role changed");
		Ok(result.rows_affected() > 0)
	}

	/// Existing tokens stop resolving on the next request.
	#[tracing::instrument(skip(self), fields(operator_id = %id))]
	pub async fn deactivate_operator(&self, id: &OperatorId) -> Result<bool, DbError> {
		let result = sqlx::query("UPDATE operators SET is_active = 0, updated_at = ? WHERE id = ?")
			.bind(Utc::now().to_rfc3339())
			.bind(id.to_string())
			.execute(&self.pool)
			.await?;

		tracing::info!(operator_id = %id, "operator deactivated");
		Ok(result.rows_affected() > 0)
	}
}

fn row_to_operator(row: &sqlx::sqlite::SqliteRow) -> Result<Operator, DbError> {
	let id: String = row.get("id");
	let role: String = row.get("role");
	let is_active: i32 = row.get("is_active");
	let created_at: String = row.get("created_at");
	let updated_at: String = row.get("updated_at");

	Ok(Operator {
		id: OperatorId::new(parse_uuid("operator id", &id)?),
		email: row.get("email"),
		display_name: row.get("display_name"),
		role: role.parse::<OperatorRole>().map_err(DbError::Internal)?,
		is_active: is_active != 0,
		created_at: parse_datetime("created_at", &created_at)?,
		updated_at: parse_datetime("updated_at", &updated_at)?,
	})
}

#[async_trait]
impl OperatorStore for OperatorRepository {
	async fn create_operator(
		&self,
		operator: &Operator,
		password_hash: Option<&str>,
	) -> Result<(), DbError> {
		self.create_operator(operator, password_hash).await
	}

	async fn get_operator_by_id(&self, id: &OperatorId) -> Result<Option<Operator>, DbError> {
		self.get_operator_by_id(id).await
	}

	async fn get_operator_by_email(&self, email: &str) -> Result<Option<Operator>, DbError> {
		self.get_operator_by_email(email).await
	}

	async fn get_operator_password_hash(&self, id: &OperatorId) -> Result<Option<String>, DbError> {
		self.get_operator_password_hash(id).await
	}

	async fn set_operator_role(&self, id: &OperatorId, role: OperatorRole) -> Result<bool, DbError> {
		self.set_operator_role(id, role).await
	}

	async fn deactivate_operator(&self, id: &OperatorId) -> Result<bool, DbError> {
		self.deactivate_operator(id).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{create_test_pool, make_operator};

	#[tokio::test]
	async fn create_and_fetch() {
		let repo = OperatorRepository::new(create_test_pool().await);
		let op = make_operator("ops@example.com", OperatorRole::Elevated);
		repo.create_operator(&op, None).await.unwrap();

		let fetched = repo.get_operator_by_id(&op.id).await.unwrap().unwrap();
		assert_eq!(fetched.role, OperatorRole::Elevated);
		assert!(fetched.is_active);
		assert_eq!(
			repo.get_operator_by_email("ops@example.com")
				.await
				.unwrap()
				.unwrap()
				.id,
			op.id
		);
	}

	#[tokio::test]
	async fn role_change_and_deactivation() {
		let repo = OperatorRepository::new(create_test_pool().await);
		let op = make_operator("role@example.com", OperatorRole::Elevated);
		repo.create_operator(&op, None).await.unwrap();

		assert!(repo.set_operator_role(&op.id, OperatorRole::Limited).await.unwrap());
		assert!(repo.deactivate_operator(&op.id).await.unwrap());

		let fetched = repo.get_operator_by_id(&op.id).await.unwrap().unwrap();
		assert_eq!(fetched.role, OperatorRole::Limited);
		assert!(!fetched.is_active);
	}

	#[tokio::test]
	async fn unknown_operator_updates_affect_nothing() {
		let repo = OperatorRepository::new(create_test_pool().await);
		let id = OperatorId::generate();
		assert!(!repo.set_operator_role(&id, OperatorRole::Standard).await.unwrap());
		assert!(!repo.deactivate_operator(&id).await.unwrap());
	}
}
