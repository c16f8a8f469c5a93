// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authentication HTTP handlers.
//!
//! Both login endpoints answer every failure with the same 401, whether the
//! account is unknown, deleted, deactivated, or the password is wrong.

use axum::{
	extract::State,
	http::{HeaderMap, StatusCode},
	response::IntoResponse,
	Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use warden_common_secret::SecretString;
use warden_server_audit::{actions, AuditCategory, AuditEntry};
use warden_server_auth::{Principal, PrincipalKind, TokenPurpose};
use warden_server_session::ClientInfo;

use super::set_cookies;
use crate::{api::AppState, auth_middleware::RequireAuth, error::ServerError};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
	pub email: String,
	pub password: SecretString,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
	pub token: String,
	pub expires_at: DateTime<Utc>,
	pub principal: Principal,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
	pub principal: Principal,
	pub expires_at: DateTime<Utc>,
}

fn login_failed(state: &AppState, kind: PrincipalKind, email: &str, client: &ClientInfo) -> ServerError {
	tracing::warn!(principal_kind = %kind, "login failed");
	let category = match kind {
		PrincipalKind::User => AuditCategory::User,
		PrincipalKind::Operator => AuditCategory::Operator,
	};
	state.audit_service.record(
		AuditEntry::builder(category, actions::LOGIN_FAILED)
			.description("login failed")
			.origin(client.ip_address.clone(), client.user_agent.clone())
			.meta("email", email)
			.build(),
	);
	ServerError::Unauthorized
}

/// POST /auth/login - user email/password login.
#[tracing::instrument(skip(state, headers, payload))]
pub async fn login(
	State(state): State<AppState>,
	headers: HeaderMap,
	Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ServerError> {
	let client = ClientInfo::from_headers(&headers);
	let email = payload.email.trim().to_string();

	let user = match state.user_repo.get_user_by_email(&email).await? {
		Some(user) if !user.is_deleted() => user,
		_ => return Err(login_failed(&state, PrincipalKind::User, &email, &client)),
	};
	let Some(hash) = state.user_repo.get_user_password_hash(&user.id).await? else {
		return Err(login_failed(&state, PrincipalKind::User, &email, &client));
	};
	if !state.credentials.verify_password(payload.password, hash).await {
		return Err(login_failed(&state, PrincipalKind::User, &email, &client));
	}

	let issued = state
		.credentials
		.issue_token(user.id.into_inner(), TokenPurpose::UserSession)?;

	tracing::info!(user_id = %user.id, "user logged in");
	state.audit_service.record(
		AuditEntry::builder(AuditCategory::User, actions::LOGIN)
			.description("user logged in")
			.user(user.id)
			.origin(client.ip_address, client.user_agent)
			.build(),
	);

	let cookies = set_cookies(&[state
		.cookies
		.session_cookie(&issued.token, issued.max_age_secs())])?;
	Ok((
		StatusCode::OK,
		cookies,
		Json(LoginResponse {
			token: issued.token.expose().clone(),
			expires_at: issued.expires_at,
			principal: Principal::User(user),
		}),
	))
}

/// POST /auth/operator/login - operator email/password login.
#[tracing::instrument(skip(state, headers, payload))]
pub async fn operator_login(
	State(state): State<AppState>,
	headers: HeaderMap,
	Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ServerError> {
	let client = ClientInfo::from_headers(&headers);
	let email = payload.email.trim().to_string();

	let operator = match state.operator_repo.get_operator_by_email(&email).await? {
		Some(op) if op.is_active => op,
		_ => return Err(login_failed(&state, PrincipalKind::Operator, &email, &client)),
	};
	let Some(hash) = state.operator_repo.get_operator_password_hash(&operator.id).await? else {
		return Err(login_failed(&state, PrincipalKind::Operator, &email, &client));
	};
	if !state.credentials.verify_password(payload.password, hash).await {
		return Err(login_failed(&state, PrincipalKind::Operator, &email, &client));
	}

	let issued = state
		.credentials
		.issue_token(operator.id.into_inner(), TokenPurpose::OperatorSession)?;

	tracing::info!(operator_id = %operator.id, role = %operator.role, "operator logged in");
	state.audit_service.record(
		AuditEntry::builder(AuditCategory::Operator, actions::LOGIN)
			.description("operator logged in")
			.operator(operator.id)
			.origin(client.ip_address, client.user_agent)
			.metadata(json!({ "role": operator.role.as_str() }))
			.build(),
	);

	let cookies = set_cookies(&[state
		.cookies
		.session_cookie(&issued.token, issued.max_age_secs())])?;
	Ok((
		StatusCode::OK,
		cookies,
		Json(LoginResponse {
			token: issued.token.expose().clone(),
			expires_at: issued.expires_at,
			principal: Principal::Operator(operator),
		}),
	))
}

/// POST /auth/logout - clears the session and indicator cookies.
///
/// Tokens are stateless; the token itself stays valid until expiry.
#[tracing::instrument(skip_all)]
pub async fn logout(
	State(state): State<AppState>,
	RequireAuth(session): RequireAuth,
	headers: HeaderMap,
) -> Result<impl IntoResponse, ServerError> {
	let client = ClientInfo::from_headers(&headers);
	let builder = match &session.principal {
		Principal::User(user) => {
			AuditEntry::builder(AuditCategory::User, actions::LOGOUT).user(user.id)
		}
		Principal::Operator(op) => {
			AuditEntry::builder(AuditCategory::Operator, actions::LOGOUT).operator(op.id)
		}
	};
	state.audit_service.record(
		builder
			.description("logged out")
			.origin(client.ip_address, client.user_agent)
			.build(),
	);

	let cookies = set_cookies(&[
		state.cookies.clear_session_cookie(),
		state.cookies.clear_impersonation_indicator_cookie(),
	])?;
	Ok((StatusCode::OK, cookies, Json(json!({ "success": true }))))
}

/// GET /auth/me - the resolved principal.
pub async fn me(RequireAuth(session): RequireAuth) -> Json<MeResponse> {
	Json(MeResponse {
		expires_at: session.verified.expires_at,
		principal: session.principal,
	})
}
