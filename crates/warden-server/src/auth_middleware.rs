// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authentication middleware for Axum.
//!
//! [`auth_layer`] resolves the bearer credential once per request and stores
//! an [`AuthContext`] extension. Handlers pick it up through the extractors:
//!
//! ```ignore
//! async fn handler(RequireOperator(operator): RequireOperator) -> impl IntoResponse {
//!     format!("hello {}", operator.display_name)
//! }
//! ```

use axum::{
	body::Body,
	extract::{FromRequestParts, State},
	http::{request::Parts, Request},
	middleware::Next,
	response::{IntoResponse, Response},
};
use tracing::instrument;
use warden_server_auth::{Operator, OperatorRole, Principal};
use warden_server_session::ResolvedSession;

use crate::{api::AppState, error::ServerError};

/// Outcome of credential resolution for one request.
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
	pub session: Option<ResolvedSession>,
}

impl AuthContext {
	pub fn principal(&self) -> Option<&Principal> {
		self.session.as_ref().map(|s| &s.principal)
	}
}

#[instrument(
	name = "auth_layer",
	skip(state, request, next),
	fields(principal_kind = tracing::field::Empty, principal_id = tracing::field::Empty)
)]
pub async fn auth_layer(
	State(state): State<AppState>,
	mut request: Request<Body>,
	next: Next,
) -> Response {
	let session = state.resolver.resolve(request.headers()).await;

	let span = tracing::Span::current();
	match &session {
		Some(resolved) => {
			span.record("principal_kind", resolved.principal.kind().as_str());
			span.record("principal_id", tracing::field::display(resolved.principal.id()));
		}
		None => {
			span.record("principal_kind", "none");
		}
	}

	request.extensions_mut().insert(AuthContext { session });
	next.run(request).await
}

fn auth_context(parts: &Parts) -> AuthContext {
	parts.extensions.get::<AuthContext>().cloned().unwrap_or_default()
}

/// Any authenticated principal. 401 otherwise.
pub struct RequireAuth(pub ResolvedSession);

impl<S> FromRequestParts<S> for RequireAuth
where
	S: Send + Sync,
{
	type Rejection = Response;

	#[instrument(name = "RequireAuth::from_request_parts", skip_all)]
	async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
		match auth_context(parts).session {
			Some(session) => Ok(RequireAuth(session)),
			None => {
				tracing::debug!("authentication required: no valid credentials");
				Err(ServerError::Unauthorized.into_response())
			}
		}
	}
}

/// An operator principal of any role. 401 without credentials, 403 for a
/// user principal.
pub struct RequireOperator(pub Operator);

impl<S> FromRequestParts<S> for RequireOperator
where
	S: Send + Sync,
{
	type Rejection = Response;

	#[instrument(name = "RequireOperator::from_request_parts", skip_all)]
	async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
		let RequireAuth(session) = RequireAuth::from_request_parts(parts, state).await?;
		match session.principal {
			Principal::Operator(operator) => Ok(RequireOperator(operator)),
			Principal::User(user) => {
				tracing::warn!(user_id = %user.id, "user principal on operator-only route");
				Err(ServerError::Forbidden.into_response())
			}
		}
	}
}

/// 403 unless `operator` holds at least `minimum`.
pub fn require_role(operator: &Operator, minimum: OperatorRole) -> Result<(), ServerError> {
	if operator.role.has_permission_of(&minimum) {
		Ok(())
	} else {
		tracing::warn!(
			operator_id = %operator.id,
			role = %operator.role,
			required = %minimum,
			"operator role insufficient"
		);
		Err(ServerError::Forbidden)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use axum::{http::StatusCode, routing::get, Router};
	use chrono::Utc;
	use tower::ServiceExt;
	use warden_common_secret::SecretString;
	use warden_server_auth::{OperatorId, PrincipalKind, User, UserId, VerifiedToken};

	fn operator(role: OperatorRole) -> Operator {
		Operator {
			id: OperatorId::generate(),
			email: "ops@example.com".to_string(),
			display_name: "Ops".to_string(),
			role,
			is_active: true,
			created_at: Utc::now(),
			updated_at: Utc::now(),
		}
	}

	fn context(principal: Principal) -> AuthContext {
		let kind = principal.kind();
		AuthContext {
			session: Some(ResolvedSession {
				verified: VerifiedToken {
					principal_id: principal.id(),
					principal_kind: kind,
					issued_at: Utc::now(),
					expires_at: Utc::now(),
				},
				principal,
				token: SecretString::new("t".to_string()),
			}),
		}
	}

	async fn operator_only(RequireOperator(op): RequireOperator) -> String {
		op.role.to_string()
	}

	async fn call(ctx: Option<AuthContext>) -> StatusCode {
		let app = Router::new().route("/op", get(operator_only));
		let mut request = Request::builder().uri("/op").body(Body::empty()).unwrap();
		if let Some(ctx) = ctx {
			request.extensions_mut().insert(ctx);
		}
		app.oneshot(request).await.unwrap().status()
	}

	#[tokio::test]
	async fn require_operator_statuses() {
		assert_eq!(call(None).await, StatusCode::UNAUTHORIZED);
		assert_eq!(
			call(Some(AuthContext::default())).await,
			StatusCode::UNAUTHORIZED
		);

		let user = User {
			id: UserId::generate(),
			email: "u@example.com".to_string(),
			display_name: "U".to_string(),
			created_at: Utc::now(),
			updated_at: Utc::now(),
			deleted_at: None,
		};
		assert_eq!(
			call(Some(context(Principal::User(user)))).await,
			StatusCode::FORBIDDEN
		);
		assert_eq!(
			call(Some(context(Principal::Operator(operator(OperatorRole::Limited))))).await,
			StatusCode::OK
		);
	}

	#[test]
	fn role_ladder() {
		assert!(require_role(&operator(OperatorRole::Elevated), OperatorRole::Standard).is_ok());
		assert!(require_role(&operator(OperatorRole::Standard), OperatorRole::Standard).is_ok());
		assert!(matches!(
			require_role(&operator(OperatorRole::Limited), OperatorRole::Standard),
			Err(ServerError::Forbidden)
		));
		assert!(require_role(&operator(OperatorRole::Standard), OperatorRole::Elevated).is_err());
	}

	#[test]
	fn principal_kind_is_exposed() {
		let ctx = context(Principal::Operator(operator(OperatorRole::Standard)));
		assert_eq!(ctx.principal().unwrap().kind(), PrincipalKind::Operator);
	}
}
