// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Row types owned by the store layer.

use chrono::{DateTime, Utc};
use uuid::Uuid;
use warden_common_secret::SecretString;
use warden_server_audit::AuditCategory;
use warden_server_auth::{ImpersonationSessionId, OperatorId, UserId};

use crate::error::DbError;

/// One impersonation, open while `ended_at` is `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImpersonationSession {
	pub id: ImpersonationSessionId,
	pub operator_id: OperatorId,
	pub target_user_id: UserId,
	/// The operator's own bearer token, captured verbatim at start.
	pub original_token: SecretString,
	pub ip_address: Option<String>,
	pub reason: Option<String>,
	pub started_at: DateTime<Utc>,
	pub ended_at: Option<DateTime<Utc>>,
}

impl ImpersonationSession {
	pub fn is_open(&self) -> bool {
		self.ended_at.is_none()
	}
}

/// A `settings` row as stored. `value` is ciphertext when `is_encrypted`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSetting {
	pub key: String,
	pub value: String,
	pub is_encrypted: bool,
	pub updated_at: DateTime<Utc>,
}

/// Filter for listing audit rows, newest first.
#[derive(Debug, Clone, Default)]
pub struct AuditLogFilter {
	pub category: Option<AuditCategory>,
	pub action: Option<String>,
	pub operator_id: Option<OperatorId>,
	pub user_id: Option<UserId>,
	pub from: Option<DateTime<Utc>>,
	pub to: Option<DateTime<Utc>>,
	pub limit: Option<i64>,
	pub offset: Option<i64>,
}

pub(crate) fn parse_datetime(field: &str, value: &str) -> Result<DateTime<Utc>, DbError> {
	DateTime::parse_from_rfc3339(value)
		.map(|dt| dt.with_timezone(&Utc))
		.map_err(|e| DbError::Internal(format!("Invalid {field}: {e}")))
}

pub(crate) fn parse_optional_datetime(
	field: &str,
	value: Option<String>,
) -> Result<Option<DateTime<Utc>>, DbError> {
	value.map(|s| parse_datetime(field, &s)).transpose()
}

pub(crate) fn parse_uuid(field: &str, value: &str) -> Result<Uuid, DbError> {
	Uuid::parse_str(value).map_err(|e| DbError::Internal(format!("Invalid {field}: {e}")))
}
