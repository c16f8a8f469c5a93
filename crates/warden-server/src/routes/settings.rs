// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Admin settings handlers.
//!
//! Responses carry metadata only. A stored value, encrypted or not, never
//! leaves the server through this surface.

use axum::{
	extract::{Path, State},
	http::HeaderMap,
	Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use warden_common_secret::SecretString;
use warden_server_audit::{actions, AuditCategory, AuditEntry};
use warden_server_auth::OperatorRole;
use warden_server_secrets::SettingMetadata;
use warden_server_session::ClientInfo;

use crate::{
	api::AppState,
	auth_middleware::{require_role, RequireOperator},
	error::ServerError,
};

#[derive(Debug, Deserialize)]
pub struct UpdateSettingRequest {
	pub value: SecretString,
	#[serde(default)]
	pub encrypted: bool,
}

#[derive(Debug, Serialize)]
pub struct SettingResponse {
	pub key: String,
	pub is_set: bool,
	pub is_encrypted: bool,
	pub updated_at: Option<DateTime<Utc>>,
}

impl From<SettingMetadata> for SettingResponse {
	fn from(meta: SettingMetadata) -> Self {
		Self {
			key: meta.key,
			is_set: meta.is_set,
			is_encrypted: meta.is_encrypted,
			updated_at: meta.updated_at,
		}
	}
}

/// GET /api/admin/settings/{key}
#[tracing::instrument(skip(state, operator), fields(operator_id = %operator.id))]
pub async fn get_setting(
	State(state): State<AppState>,
	RequireOperator(operator): RequireOperator,
	Path(key): Path<String>,
) -> Result<Json<SettingResponse>, ServerError> {
	let meta = state.settings.metadata(key.trim()).await?;
	Ok(Json(meta.into()))
}

/// PUT /api/admin/settings/{key} - elevated operators only.
#[tracing::instrument(skip(state, operator, headers, payload), fields(operator_id = %operator.id))]
pub async fn update_setting(
	State(state): State<AppState>,
	RequireOperator(operator): RequireOperator,
	Path(key): Path<String>,
	headers: HeaderMap,
	Json(payload): Json<UpdateSettingRequest>,
) -> Result<Json<SettingResponse>, ServerError> {
	require_role(&operator, OperatorRole::Elevated)?;

	let key = key.trim();
	let encrypted = state
		.settings
		.set(key, &payload.value, payload.encrypted)
		.await?;

	let client = ClientInfo::from_headers(&headers);
	state.audit_service.record(
		AuditEntry::builder(AuditCategory::Operator, actions::SETTING_UPDATED)
			.description("setting updated")
			.operator(operator.id)
			.origin(client.ip_address, client.user_agent)
			.meta("setting_key", key)
			.meta("encrypted", encrypted)
			.build(),
	);

	let meta = state.settings.metadata(key).await?;
	Ok(Json(meta.into()))
}
