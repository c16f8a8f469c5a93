// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Turns the bearer credential on a request into a live principal.
//!
//! A valid signature is not enough. The principal's record is re-read on
//! every call, so a soft-deleted user or a deactivated operator stops
//! resolving immediately, whatever the token's expiry says.

use std::sync::Arc;

use http::HeaderMap;
use tracing::instrument;
use warden_common_secret::SecretString;
use warden_server_auth::{
	extract_credential, CredentialService, OperatorId, Principal, PrincipalKind, UserId,
	VerifiedToken,
};
use warden_server_db::{OperatorStore, UserStore};

use crate::cookies::DEFAULT_SESSION_COOKIE_NAME;

/// A resolved principal plus the raw token it was resolved from.
#[derive(Debug, Clone)]
pub struct ResolvedSession {
	pub principal: Principal,
	pub token: SecretString,
	pub verified: VerifiedToken,
}

#[derive(Clone)]
pub struct SessionResolver {
	credentials: CredentialService,
	users: Arc<dyn UserStore>,
	operators: Arc<dyn OperatorStore>,
	session_cookie_name: String,
}

impl std::fmt::Debug for SessionResolver {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SessionResolver")
			.field("session_cookie_name", &self.session_cookie_name)
			.finish_non_exhaustive()
	}
}

impl SessionResolver {
	pub fn new(
		credentials: CredentialService,
		users: Arc<dyn UserStore>,
		operators: Arc<dyn OperatorStore>,
	) -> Self {
		Self {
			credentials,
			users,
			operators,
			session_cookie_name: DEFAULT_SESSION_COOKIE_NAME.to_string(),
		}
	}

	pub fn with_session_cookie_name(mut self, name: impl Into<String>) -> Self {
		self.session_cookie_name = name.into();
		self
	}

	/// The principal behind this request, or `None`.
	pub async fn current_principal(&self, headers: &HeaderMap) -> Option<Principal> {
		self.resolve(headers).await.map(|s| s.principal)
	}

	/// Bearer header first, then the session cookie.
	#[instrument(level = "debug", skip_all)]
	pub async fn resolve(&self, headers: &HeaderMap) -> Option<ResolvedSession> {
		let token = extract_credential(headers, &self.session_cookie_name)?;
		self.resolve_token(token).await
	}

	/// Verify a token and re-check its principal. Store failures resolve to
	/// `None`.
	#[instrument(level = "debug", skip_all)]
	pub async fn resolve_token(&self, token: SecretString) -> Option<ResolvedSession> {
		let verified = self.credentials.verify_token(token.expose())?;

		let principal = match verified.principal_kind {
			PrincipalKind::User => {
				let id = UserId::new(verified.principal_id);
				match self.users.get_user_by_id(&id).await {
					Ok(Some(user)) if !user.is_deleted() => Principal::User(user),
					Ok(_) => {
						tracing::debug!(user_id = %id, "token for missing or deleted user");
						return None;
					}
					Err(e) => {
						tracing::warn!(user_id = %id, error = %e, "user lookup failed during session resolution");
						return None;
					}
				}
			}
			PrincipalKind::Operator => {
				let id = OperatorId::new(verified.principal_id);
				match self.operators.get_operator_by_id(&id).await {
					Ok(Some(operator)) if operator.is_active => Principal::Operator(operator),
					Ok(Some(_)) => {
						tracing::debug!(operator_id = %id, "token for inactive operator");
						return None;
					}
					Ok(None) => {
						tracing::debug!(operator_id = %id, "token for missing operator");
						return None;
					}
					Err(e) => {
						tracing::warn!(operator_id = %id, error = %e, "operator lookup failed during session resolution");
						return None;
					}
				}
			}
		};

		Some(ResolvedSession {
			principal,
			token,
			verified,
		})
	}
}
