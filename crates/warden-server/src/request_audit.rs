// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! `api` category audit entries for traffic through the admin router.
//!
//! Only method, path, status and timing are captured. Request bodies can
//! carry setting values and are never read here.

use std::time::Instant;

use axum::{
	body::Body,
	extract::State,
	http::Request,
	middleware::Next,
	response::Response,
};
use warden_server_audit::{actions, AuditCategory, AuditEntry, AuditEntryBuilder};
use warden_server_auth::{extract_cookie, Principal};
use warden_server_session::ClientInfo;

use crate::{api::AppState, auth_middleware::AuthContext};

pub async fn api_audit_layer(
	State(state): State<AppState>,
	request: Request<Body>,
	next: Next,
) -> Response {
	let started = Instant::now();
	let method = request.method().to_string();
	let path = request.uri().path().to_string();
	let client = ClientInfo::from_headers(request.headers());
	let indicator = extract_cookie(request.headers(), &state.cookies.indicator_name);
	let principal = request
		.extensions()
		.get::<AuthContext>()
		.and_then(|ctx| ctx.principal().cloned());

	let response = next.run(request).await;

	let duration_ms = i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX);
	let status = response.status().as_u16();

	let builder = AuditEntry::builder(AuditCategory::Api, actions::API_REQUEST)
		.request(method, path)
		.response(status, duration_ms)
		.origin(client.ip_address, client.user_agent);
	let entry = attribute(&state, builder, principal, indicator.as_deref())
		.await
		.build();
	state.audit_service.record(entry);

	response
}

/// Attach the acting identity. A user request made under an open
/// impersonation is attributed to the operator as well.
async fn attribute(
	state: &AppState,
	builder: AuditEntryBuilder,
	principal: Option<Principal>,
	indicator: Option<&str>,
) -> AuditEntryBuilder {
	match principal {
		Some(Principal::Operator(op)) => builder.operator(op.id),
		Some(Principal::User(user)) => {
			if indicator.is_some() {
				match state.impersonation.check(indicator).await {
					Ok(status) if status.impersonating && status.target_user_id == Some(user.id) => {
						if let Some(operator_id) = status.operator_id {
							return builder.operator(operator_id).impersonated_user(user.id);
						}
					}
					Ok(_) => {}
					Err(e) => {
						tracing::warn!(error = %e, "impersonation lookup failed while auditing request");
					}
				}
			}
			builder.user(user.id)
		}
		None => builder,
	}
}
