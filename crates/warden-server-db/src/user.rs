// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! User repository.
//!
//! Only what the identity layer needs: lookup for live session checks and
//! login, creation for seeding, soft delete for revocation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqlitePool, Row};
use warden_server_auth::{User, UserId};

use crate::error::DbError;
use crate::types::{parse_datetime, parse_optional_datetime, parse_uuid};

#[async_trait]
pub trait UserStore: Send + Sync {
	async fn create_user(&self, user: &User, password_hash: Option<&str>) -> Result<(), DbError>;
	async fn get_user_by_id(&self, id: &UserId) -> Result<Option<User>, DbError>;
	async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DbError>;
	async fn get_user_password_hash(&self, id: &UserId) -> Result<Option<String>, DbError>;
	async fn soft_delete_user(&self, id: &UserId) -> Result<(), DbError>;
	async fn restore_user(&self, id: &UserId) -> Result<(), DbError>;
}

/// All user IDs are UUIDs stored as strings in SQLite.
#[derive(Clone)]
pub struct UserRepository {
	pool: SqlitePool,
}

impl UserRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// # Errors
	/// `DbError::Conflict` if the id or email is taken.
	#[tracing::instrument(skip(self, user, password_hash), fields(user_id = %user.id))]
	pub async fn create_user(&self, user: &User, password_hash: Option<&str>) -> Result<(), DbError> {
		sqlx::query(
			r#"
			INSERT INTO users (
				id, email, display_name, password_hash, created_at, updated_at, deleted_at
			) VALUES (?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(user.id.to_string())
		.bind(&user.email)
		.bind(&user.display_name)
		.bind(password_hash)
		.bind(user.created_at.to_rfc3339())
		.bind(user.updated_at.to_rfc3339())
		.bind(user.deleted_at.map(|dt| dt.to_rfc3339()))
		.execute(&self.pool)
		.await
		.map_err(|e| DbError::from_insert(e, "user"))?;

		tracing::debug!(user_id = %user.id, "user created");
		Ok(())
	}

	/// `None` if no user exists with this ID or if the user is soft-deleted.
	#[tracing::instrument(skip(self), fields(user_id = %id))]
	pub async fn get_user_by_id(&self, id: &UserId) -> Result<Option<User>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, email, display_name, created_at, updated_at, deleted_at
			FROM users
			WHERE id = ? AND deleted_at IS NULL
			"#,
		)
		.bind(id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| row_to_user(&r)).transpose()
	}

	#[tracing::instrument(skip(self, email))]
	pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, email, display_name, created_at, updated_at, deleted_at
			FROM users
			WHERE email = ? AND deleted_at IS NULL
			"#,
		)
		.bind(email)
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| row_to_user(&r)).transpose()
	}

	#[tracing::instrument(skip(self), fields(user_id = %id))]
	pub async fn get_user_password_hash(&self, id: &UserId) -> Result<Option<String>, DbError> {
		let hash: Option<Option<String>> = sqlx::query_scalar(
			"SELECT password_hash FROM users WHERE id = ? AND deleted_at IS NULL",
		)
		.bind(id.to_string())
		.fetch_optional(&self.pool)
		.await?;
		Ok(hash.flatten())
	}

	#[tracing::instrument(skip(self), fields(user_id = %id))]
	pub async fn soft_delete_user(&self, id: &UserId) -> Result<(), DbError> {
		let now = Utc::now().to_rfc3339();
		sqlx::query("UPDATE users SET deleted_at = ?, updated_at = ? WHERE id = ?")
			.bind(&now)
			.bind(&now)
			.bind(id.to_string())
			.execute(&self.pool)
			.await?;

		tracing::debug!(user_id = %id, "user soft-deleted");
		Ok(())
	}

	#[tracing::instrument(skip(self), fields(user_id = %id))]
	pub async fn restore_user(&self, id: &UserId) -> Result<(), DbError> {
		let now = Utc::now().to_rfc3339();
		sqlx::query("UPDATE users SET deleted_at = NULL, updated_at = ? WHERE id = ?")
			.bind(&now)
			.bind(id.to_string())
			.execute(&self.pool)
			.await?;

		tracing::debug!(user_id = %id, "user restored");
		Ok(())
	}
}

fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> Result<User, DbError> {
	let id: String = row.get("id");
	let created_at: String = row.get("created_at");
	let updated_at: String = row.get("updated_at");

	Ok(User {
		id: UserId::new(parse_uuid("user id", &id)?),
		email: row.get("email"),
		display_name: row.get("display_name"),
		created_at: parse_datetime("created_at", &created_at)?,
		updated_at: parse_datetime("updated_at", &updated_at)?,
		deleted_at: parse_optional_datetime("deleted_at", row.get("deleted_at"))?,
	})
}

#[async_trait]
impl UserStore for UserRepository {
	async fn create_user(&self, user: &User, password_hash: Option<&str>) -> Result<(), DbError> {
		self.create_user(user, password_hash).await
	}

	async fn get_user_by_id(&self, id: &UserId) -> Result<Option<User>, DbError> {
		self.get_user_by_id(id).await
	}

	async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DbError> {
		self.get_user_by_email(email).await
	}

	async fn get_user_password_hash(&self, id: &UserId) -> Result<Option<String>, DbError> {
		self.get_user_password_hash(id).await
	}

	async fn soft_delete_user(&self, id: &UserId) -> Result<(), DbError> {
		self.soft_delete_user(id).await
	}

	async fn restore_user(&self, id: &UserId) -> Result<(), DbError> {
		self.restore_user(id).await
	}
}
