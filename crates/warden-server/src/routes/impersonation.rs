// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Impersonation HTTP handlers.
//!
//! | Endpoint               | Caller                                   |
//! |------------------------|------------------------------------------|
//! | `start_impersonation`  | elevated operator                        |
//! | `impersonation_status` | anyone (reads the indicator cookie)      |
//! | `stop_impersonation`   | the owning operator or the acting user   |
//!
//! Starting swaps the caller's session cookie for the user token and sets
//! the indicator cookie to the impersonation session id. Stopping restores
//! the operator token captured at start and clears the indicator.

use axum::{
	extract::State,
	http::{HeaderMap, StatusCode},
	response::IntoResponse,
	Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use warden_server_auth::{extract_cookie, ImpersonationSessionId, Principal, UserId};
use warden_server_impersonation::{EndOutcome, ImpersonationStatus, StartImpersonation};
use warden_server_session::{ClientInfo, ResolvedSession};

use super::set_cookies;
use crate::{api::AppState, auth_middleware::RequireAuth, error::ServerError};

#[derive(Debug, Deserialize)]
pub struct ImpersonateRequest {
	pub target_user_id: String,
	#[serde(default)]
	pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ImpersonateResponse {
	pub session_id: ImpersonationSessionId,
	pub target_user_id: UserId,
	pub token: String,
	pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct StopImpersonationResponse {
	pub ended: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub session_id: Option<ImpersonationSessionId>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub target_user_id: Option<UserId>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub duration_secs: Option<i64>,
}

fn indicator(state: &AppState, headers: &HeaderMap) -> Option<String> {
	extract_cookie(headers, &state.cookies.indicator_name)
}

/// POST /api/admin/impersonate
#[tracing::instrument(skip_all)]
pub async fn start_impersonation(
	State(state): State<AppState>,
	RequireAuth(session): RequireAuth,
	headers: HeaderMap,
	Json(payload): Json<ImpersonateRequest>,
) -> Result<impl IntoResponse, ServerError> {
	let Principal::Operator(operator) = &session.principal else {
		tracing::warn!("user principal attempted to start impersonation");
		return Err(ServerError::Forbidden);
	};

	let target_user_id = Uuid::parse_str(payload.target_user_id.trim())
		.map(UserId::new)
		.map_err(|_| ServerError::BadRequest("invalid user id".to_string()))?;
	let reason = payload
		.reason
		.map(|r| r.trim().to_string())
		.filter(|r| !r.is_empty());

	let started = state
		.impersonation
		.start(StartImpersonation {
			operator_id: operator.id,
			operator_token: session.token.clone(),
			target_user_id,
			reason,
			client: ClientInfo::from_headers(&headers),
		})
		.await?;

	let max_age = started.user_token.max_age_secs();
	let cookies = set_cookies(&[
		state.cookies.session_cookie(&started.user_token.token, max_age),
		state
			.cookies
			.impersonation_indicator_cookie(&started.session_id.to_string(), max_age),
	])?;

	Ok((
		StatusCode::OK,
		cookies,
		Json(ImpersonateResponse {
			session_id: started.session_id,
			target_user_id: started.target_user_id,
			token: started.user_token.token.expose().clone(),
			expires_at: started.user_token.expires_at,
		}),
	))
}

/// GET /api/admin/impersonate/status
pub async fn impersonation_status(
	State(state): State<AppState>,
	headers: HeaderMap,
) -> Result<Json<ImpersonationStatus>, ServerError> {
	let indicator = indicator(&state, &headers);
	Ok(Json(state.impersonation.check(indicator.as_deref()).await?))
}

/// A user may only end an impersonation with a token no longer-lived than
/// impersonation tokens, so the real account holder's own session cannot
/// pull the operator token back out.
fn holds_impersonation_token(state: &AppState, session: &ResolvedSession) -> bool {
	let lifetime = session.verified.expires_at - session.verified.issued_at;
	lifetime <= state.credentials.lifetimes().impersonation
}

/// POST /api/admin/impersonate/stop
#[tracing::instrument(skip_all)]
pub async fn stop_impersonation(
	State(state): State<AppState>,
	RequireAuth(session): RequireAuth,
	headers: HeaderMap,
) -> Result<impl IntoResponse, ServerError> {
	let client = ClientInfo::from_headers(&headers);
	let session_id = indicator(&state, &headers)
		.and_then(|v| v.trim().parse::<ImpersonationSessionId>().ok());

	let outcome = match (&session.principal, session_id) {
		(Principal::User(_), _) if !holds_impersonation_token(&state, &session) => {
			tracing::warn!("user session token used to stop an impersonation");
			return Err(ServerError::Forbidden);
		}
		(principal, Some(id)) => {
			state
				.impersonation
				.end_for_session(id, principal, &client)
				.await?
		}
		(Principal::Operator(op), None) => state.impersonation.end(op.id, &client).await?,
		(Principal::User(_), None) => EndOutcome::AlreadyEnded,
	};

	let clear_indicator = state.cookies.clear_impersonation_indicator_cookie();
	match outcome {
		EndOutcome::Ended {
			operator_token,
			session_id,
			target_user_id,
			duration_secs,
			..
		} => {
			// The operator token may have expired while impersonating.
			let restore = match state.credentials.verify_token(operator_token.expose()) {
				Some(verified) => {
					let remaining = (verified.expires_at - state.clock.now()).num_seconds();
					state.cookies.session_cookie(&operator_token, remaining)
				}
				None => {
					tracing::info!(session_id = %session_id, "operator token expired during impersonation");
					state.cookies.clear_session_cookie()
				}
			};
			let cookies = set_cookies(&[restore, clear_indicator])?;
			Ok((
				StatusCode::OK,
				cookies,
				Json(StopImpersonationResponse {
					ended: true,
					session_id: Some(session_id),
					target_user_id: Some(target_user_id),
					duration_secs: Some(duration_secs),
				}),
			))
		}
		EndOutcome::AlreadyEnded => {
			let cookies = set_cookies(&[clear_indicator])?;
			Ok((
				StatusCode::OK,
				cookies,
				Json(StopImpersonationResponse {
					ended: false,
					session_id: None,
					target_user_id: None,
					duration_secs: None,
				}),
			))
		}
	}
}
