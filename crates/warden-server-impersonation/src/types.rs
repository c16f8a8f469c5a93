// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::{DateTime, Utc};
use serde::Serialize;
use warden_common_secret::SecretString;
use warden_server_auth::{ImpersonationSessionId, IssuedToken, OperatorId, UserId};
use warden_server_session::ClientInfo;

/// Input to [`crate::ImpersonationCoordinator::start`].
#[derive(Debug, Clone)]
pub struct StartImpersonation {
	pub operator_id: OperatorId,
	/// The operator's own bearer token, kept so `end` can hand it back.
	pub operator_token: SecretString,
	pub target_user_id: UserId,
	pub reason: Option<String>,
	pub client: ClientInfo,
}

#[derive(Debug, Clone)]
pub struct StartedImpersonation {
	pub session_id: ImpersonationSessionId,
	pub target_user_id: UserId,
	/// User token with the impersonation lifetime.
	pub user_token: IssuedToken,
}

/// Answer to "is this request inside an impersonation?". Read-only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImpersonationStatus {
	pub impersonating: bool,
	pub operator_id: Option<OperatorId>,
	pub target_user_id: Option<UserId>,
	pub session_id: Option<ImpersonationSessionId>,
	pub started_at: Option<DateTime<Utc>>,
}

impl ImpersonationStatus {
	pub fn inactive() -> Self {
		Self::default()
	}
}

#[derive(Debug, Clone)]
pub enum EndOutcome {
	Ended {
		/// The token captured at start, returned to restore the operator.
		operator_token: SecretString,
		operator_id: OperatorId,
		session_id: ImpersonationSessionId,
		target_user_id: UserId,
		duration_secs: i64,
	},
	/// Nothing was open, or a concurrent `end` closed it first.
	AlreadyEnded,
}

impl EndOutcome {
	pub fn is_ended(&self) -> bool {
		matches!(self, EndOutcome::Ended { .. })
	}
}
