// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Settings repository.
//!
//! Stores whatever it is handed. Encryption happens one layer up in
//! warden-server-secrets; this module only records the `is_encrypted` flag.

use async_trait::async_trait;
use sqlx::{sqlite::SqlitePool, Row};

use crate::error::DbError;
use crate::types::{parse_datetime, StoredSetting};

#[async_trait]
pub trait SettingsStore: Send + Sync {
	async fn get_setting(&self, key: &str) -> Result<Option<StoredSetting>, DbError>;
	async fn upsert_setting(&self, setting: &StoredSetting) -> Result<(), DbError>;
	async fn delete_setting(&self, key: &str) -> Result<bool, DbError>;
	async fn list_setting_keys(&self) -> Result<Vec<String>, DbError>;
}

#[derive(Clone)]
pub struct SettingsRepository {
	pool: SqlitePool,
}

impl SettingsRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	#[tracing::instrument(skip(self))]
	pub async fn get_setting(&self, key: &str) -> Result<Option<StoredSetting>, DbError> {
		let row = sqlx::query(
			"SELECT key, value, is_encrypted, updated_at FROM settings WHERE key = ?",
		)
		.bind(key)
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| row_to_setting(&r)).transpose()
	}

	#[tracing::instrument(skip(self, setting), fields(key = %setting.key, encrypted = setting.is_encrypted))]
	pub async fn upsert_setting(&self, setting: &StoredSetting) -> Result<(), DbError> {
		sqlx::query(
			r#"
			INSERT INTO settings (key, value, is_encrypted, updated_at)
			VALUES (?, ?, ?, ?)
			ON CONFLICT(key) DO UPDATE SET
				value = excluded.value,
				is_encrypted = excluded.is_encrypted,
				updated_at = excluded.updated_at
			"#,
		)
		.bind(&setting.key)
		.bind(&setting.value)
		.bind(setting.is_encrypted as i32)
		.bind(setting.updated_at.to_rfc3339())
		.execute(&self.pool)
		.await?;

		tracing::debug!(key = %setting.key, "setting stored");
		Ok(())
	}

	#[tracing::instrument(skip(self))]
	pub async fn delete_setting(&self, key: &str) -> Result<bool, DbError> {
		let result = sqlx::query("DELETE FROM settings WHERE key = ?")
			.bind(key)
			.execute(&self.pool)
			.await?;
		Ok(result.rows_affected() > 0)
	}

	#[tracing::instrument(skip(self))]
	pub async fn list_setting_keys(&self) -> Result<Vec<String>, DbError> {
		let keys: Vec<String> = sqlx::query_scalar("SELECT key FROM settings ORDER BY key")
			.fetch_all(&self.pool)
			.await?;
		Ok(keys)
	}
}

fn row_to_setting(row: &sqlx::sqlite::SqliteRow) -> Result<StoredSetting, DbError> {
	let is_encrypted: i32 = row.get("is_encrypted");
	let updated_at: String = row.get("updated_at");

	Ok(StoredSetting {
		key: row.get("key"),
		value: row.get("value"),
		is_encrypted: is_encrypted != 0,
		updated_at: parse_datetime("updated_at", &updated_at)?,
	})
}

#[async_trait]
impl SettingsStore for SettingsRepository {
	async fn get_setting(&self, key: &str) -> Result<Option<StoredSetting>, DbError> {
		self.get_setting(key).await
	}

	async fn upsert_setting(&self, setting: &StoredSetting) -> Result<(), DbError> {
		self.upsert_setting(setting).await
	}

	async fn delete_setting(&self, key: &str) -> Result<bool, DbError> {
		self.delete_setting(key).await
	}

	async fn list_setting_keys(&self) -> Result<Vec<String>, DbError> {
		self.list_setting_keys().await
	}
}
