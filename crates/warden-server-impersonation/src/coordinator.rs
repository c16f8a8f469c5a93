// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The impersonation state machine.
//!
//! Per operator: Idle -> Impersonating -> Idle. `start` persists the session
//! row before any token exists; `end` closes the row with a conditional
//! update before handing the operator's original token back, so two racing
//! `end` calls cannot both receive it.

use std::sync::Arc;

use serde_json::json;
use tracing::instrument;
use warden_server_audit::{actions, AuditCategory, AuditEntry, AuditService};
use warden_server_auth::{
	Clock, CredentialService, ImpersonationSessionId, OperatorId, Principal, SystemClock,
	TokenPurpose,
};
use warden_server_db::{DbError, ImpersonationSession, ImpersonationStore, OperatorStore, UserStore};
use warden_server_session::ClientInfo;

use crate::error::{ImpersonationError, ImpersonationResult};
use crate::types::{EndOutcome, ImpersonationStatus, StartImpersonation, StartedImpersonation};

#[derive(Clone)]
pub struct ImpersonationCoordinator {
	users: Arc<dyn UserStore>,
	operators: Arc<dyn OperatorStore>,
	sessions: Arc<dyn ImpersonationStore>,
	credentials: CredentialService,
	audit: AuditService,
	clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for ImpersonationCoordinator {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ImpersonationCoordinator")
			.finish_non_exhaustive()
	}
}

impl ImpersonationCoordinator {
	pub fn new(
		users: Arc<dyn UserStore>,
		operators: Arc<dyn OperatorStore>,
		sessions: Arc<dyn ImpersonationStore>,
		credentials: CredentialService,
		audit: AuditService,
	) -> Self {
		Self {
			users,
			operators,
			sessions,
			credentials,
			audit,
			clock: Arc::new(SystemClock),
		}
	}

	/// Timestamps for session rows. Token times come from the credential
	/// service's own clock.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;
		self
	}

	/// Begin acting as `target_user_id`.
	///
	/// # Errors
	/// - `Forbidden` unless the operator exists, is active and is elevated.
	///   The denial is audited.
	/// - `TargetNotFound` for a missing or deleted user.
	/// - `AlreadyImpersonating` if the operator has an open session.
	#[instrument(
		skip(self, request),
		fields(operator_id = %request.operator_id, target_user_id = %request.target_user_id)
	)]
	pub async fn start(
		&self,
		request: StartImpersonation,
	) -> ImpersonationResult<StartedImpersonation> {
		let operator = self.operators.get_operator_by_id(&request.operator_id).await?;
		let denial = match &operator {
			None => Some("unknown operator"),
			Some(op) if !op.is_active => Some("operator inactive"),
			Some(op) if !op.role.can_impersonate() => Some("insufficient role"),
			Some(_) => None,
		};
		if let Some(why) = denial {
			tracing::warn!(
				operator_id = %request.operator_id,
				target_user_id = %request.target_user_id,
				reason = why,
				"impersonation denied"
			);
			self.audit.record(
				AuditEntry::builder(AuditCategory::Operator, actions::IMPERSONATION_DENIED)
					.description(format!("impersonation denied: {why}"))
					.operator(request.operator_id)
					.origin(request.client.ip_address.clone(), request.client.user_agent.clone())
					.metadata(json!({
						"target_user_id": request.target_user_id.to_string(),
						"role": operator.as_ref().map(|op| op.role.as_str()),
					}))
					.build(),
			);
			return Err(ImpersonationError::Forbidden);
		}

		let target = self
			.users
			.get_user_by_id(&request.target_user_id)
			.await?
			.filter(|u| !u.is_deleted())
			.ok_or(ImpersonationError::TargetNotFound)?;

		if self
			.sessions
			.latest_open_session(&request.operator_id)
			.await?
			.is_some()
		{
			tracing::warn!(operator_id = %request.operator_id, "operator already impersonating");
			return Err(ImpersonationError::AlreadyImpersonating);
		}

		let session = ImpersonationSession {
			id: ImpersonationSessionId::generate(),
			operator_id: request.operator_id,
			target_user_id: target.id,
			original_token: request.operator_token,
			ip_address: request.client.ip_address.clone(),
			reason: request.reason.clone(),
			started_at: self.clock.now(),
			ended_at: None,
		};
		// The store allows one open session per operator; a racing start
		// that passed the check above loses here.
		match self.sessions.create_session(&session).await {
			Ok(()) => {}
			Err(DbError::Conflict(_)) => {
				tracing::warn!(operator_id = %request.operator_id, "concurrent impersonation start rejected");
				return Err(ImpersonationError::AlreadyImpersonating);
			}
			Err(e) => return Err(e.into()),
		}

		let user_token = match self
			.credentials
			.issue_token(target.id.into_inner(), TokenPurpose::Impersonation)
		{
			Ok(token) => token,
			Err(e) => {
				tracing::error!(session_id = %session.id, error = %e, "failed to issue impersonation token; closing session");
				if let Err(close_err) = self.sessions.end_session(&session.id, self.clock.now()).await {
					tracing::error!(session_id = %session.id, error = %close_err, "failed to close orphaned impersonation session");
				}
				return Err(e.into());
			}
		};

		tracing::info!(
			operator_id = %request.operator_id,
			target_user_id = %target.id,
			session_id = %session.id,
			"impersonation started"
		);
		self.audit.record(
			AuditEntry::builder(AuditCategory::Operator, actions::IMPERSONATION_STARTED)
				.description(format!("operator started impersonating {}", target.email))
				.operator(request.operator_id)
				.impersonated_user(target.id)
				.origin(request.client.ip_address, request.client.user_agent)
				.metadata(json!({
					"session_id": session.id.to_string(),
					"reason": request.reason,
					"target_user_id": target.id.to_string(),
				}))
				.build(),
		);

		Ok(StartedImpersonation {
			session_id: session.id,
			target_user_id: target.id,
			user_token,
		})
	}

	/// Interpret the indicator value carried with a request. Never writes
	/// and never audits.
	#[instrument(level = "debug", skip(self))]
	pub async fn check(&self, indicator: Option<&str>) -> ImpersonationResult<ImpersonationStatus> {
		let Some(session_id) = indicator.and_then(|v| v.trim().parse::<ImpersonationSessionId>().ok())
		else {
			return Ok(ImpersonationStatus::inactive());
		};

		match self.sessions.get_session(&session_id).await? {
			Some(session) if session.is_open() => Ok(ImpersonationStatus {
				impersonating: true,
				operator_id: Some(session.operator_id),
				target_user_id: Some(session.target_user_id),
				session_id: Some(session.id),
				started_at: Some(session.started_at),
			}),
			_ => Ok(ImpersonationStatus::inactive()),
		}
	}

	/// Close the operator's most recent open session and return the token
	/// captured at start.
	#[instrument(skip(self, client), fields(operator_id = %operator_id))]
	pub async fn end(
		&self,
		operator_id: OperatorId,
		client: &ClientInfo,
	) -> ImpersonationResult<EndOutcome> {
		let open = self.sessions.count_open_sessions(&operator_id).await?;
		if open > 1 {
			tracing::warn!(
				operator_id = %operator_id,
				open_sessions = open,
				"multiple open impersonation sessions; ending the most recent only"
			);
		}

		let Some(session) = self.sessions.latest_open_session(&operator_id).await? else {
			tracing::debug!(operator_id = %operator_id, "no open impersonation session");
			return Ok(EndOutcome::AlreadyEnded);
		};

		self.close(session, client).await
	}

	/// Close the named session on behalf of whoever holds it: the
	/// impersonated user's token or the owning operator. Other open
	/// sessions of the same operator are left alone.
	#[instrument(skip(self, acting, client), fields(session_id = %session_id))]
	pub async fn end_for_session(
		&self,
		session_id: ImpersonationSessionId,
		acting: &Principal,
		client: &ClientInfo,
	) -> ImpersonationResult<EndOutcome> {
		let session = self
			.sessions
			.get_session(&session_id)
			.await?
			.ok_or(ImpersonationError::SessionNotFound)?;

		let allowed = match acting {
			Principal::User(user) => user.id == session.target_user_id,
			Principal::Operator(op) => op.id == session.operator_id,
		};
		if !allowed {
			tracing::warn!(session_id = %session_id, "principal does not own this impersonation session");
			return Err(ImpersonationError::Forbidden);
		}

		if !session.is_open() {
			return Ok(EndOutcome::AlreadyEnded);
		}

		self.close(session, client).await
	}

	/// Close exactly `session` with a conditional update. Only the caller
	/// whose update lands receives the original token.
	async fn close(
		&self,
		session: ImpersonationSession,
		client: &ClientInfo,
	) -> ImpersonationResult<EndOutcome> {
		let ended_at = self.clock.now();
		if !self.sessions.end_session(&session.id, ended_at).await? {
			tracing::debug!(session_id = %session.id, "impersonation session closed concurrently");
			return Ok(EndOutcome::AlreadyEnded);
		}

		let duration_secs = (ended_at - session.started_at).num_seconds().max(0);
		tracing::info!(
			operator_id = %session.operator_id,
			target_user_id = %session.target_user_id,
			session_id = %session.id,
			duration_secs,
			"impersonation ended"
		);
		self.audit.record(
			AuditEntry::builder(AuditCategory::Operator, actions::IMPERSONATION_ENDED)
				.description("operator stopped impersonating")
				.operator(session.operator_id)
				.impersonated_user(session.target_user_id)
				.origin(client.ip_address.clone(), client.user_agent.clone())
				.metadata(json!({
					"session_id": session.id.to_string(),
					"target_user_id": session.target_user_id.to_string(),
					"duration_secs": duration_secs,
				}))
				.build(),
		);

		Ok(EndOutcome::Ended {
			operator_id: session.operator_id,
			operator_token: session.original_token,
			session_id: session.id,
			target_user_id: session.target_user_id,
			duration_secs,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use chrono::Duration;
	use std::sync::Mutex;
	use warden_common_secret::SecretString;
	use warden_server_audit::{AuditSink, AuditSinkError, TruncationLimits};
	use warden_server_auth::{ManualClock, Operator, OperatorRole, User};
	use warden_server_db::testing::{create_test_pool, insert_operator, insert_user};
	use warden_server_db::{
		ImpersonationRepository, OperatorRepository, SqlitePool, UserRepository,
	};
	use warden_server_session::SessionResolver;

	#[derive(Default)]
	struct CollectingSink {
		entries: Mutex<Vec<AuditEntry>>,
	}

	#[async_trait]
	impl AuditSink for CollectingSink {
		fn name(&self) -> &str {
			"collecting"
		}

		async fn publish(&self, entry: Arc<AuditEntry>) -> Result<(), AuditSinkError> {
			self.entries.lock().unwrap().push((*entry).clone());
			Ok(())
		}
	}

	struct Fixture {
		pool: SqlitePool,
		coordinator: ImpersonationCoordinator,
		credentials: CredentialService,
		resolver: SessionResolver,
		sessions: ImpersonationRepository,
		audit: AuditService,
		sink: Arc<CollectingSink>,
		clock: ManualClock,
		elevated: Operator,
		standard: Operator,
		target: User,
	}

	impl Fixture {
		async fn audit_actions(&self) -> Vec<String> {
			self.audit.flush().await;
			self.sink
				.entries
				.lock()
				.unwrap()
				.iter()
				.map(|e| e.action.clone())
				.collect()
		}

		fn operator_token(&self, op: &Operator) -> SecretString {
			self.credentials
				.issue_token(op.id.into_inner(), TokenPurpose::OperatorSession)
				.unwrap()
				.token
		}

		fn request(&self, op: &Operator, target: &User) -> StartImpersonation {
			StartImpersonation {
				operator_id: op.id,
				operator_token: self.operator_token(op),
				target_user_id: target.id,
				reason: Some("support ticket 4821".to_string()),
				client: ClientInfo {
					ip_address: Some("203.0.113.9".to_string()),
					user_agent: Some("test-agent".to_string()),
				},
			}
		}
	}

	async fn fixture() -> Fixture {
		let pool = create_test_pool().await;
		let elevated = insert_operator(&pool, "root@example.com", OperatorRole::Elevated).await;
		let standard = insert_operator(&pool, "help@example.com", OperatorRole::Standard).await;
		let target = insert_user(&pool, "u1@example.com").await;

		let clock = ManualClock::default();
		let credentials = CredentialService::builder(
			"impersonation-test-signing-key-0123456789".into(),
		)
		.clock(Arc::new(clock.clone()))
		.build();
		let sink = Arc::new(CollectingSink::default());
		let audit = AuditService::new(
			vec![sink.clone() as Arc<dyn AuditSink>],
			64,
			TruncationLimits::default(),
		);
		let users = Arc::new(UserRepository::new(pool.clone()));
		let operators = Arc::new(OperatorRepository::new(pool.clone()));
		let sessions = ImpersonationRepository::new(pool.clone());

		let coordinator = ImpersonationCoordinator::new(
			users.clone(),
			operators.clone(),
			Arc::new(sessions.clone()),
			credentials.clone(),
			audit.clone(),
		)
		.with_clock(Arc::new(clock.clone()));
		let resolver = SessionResolver::new(credentials.clone(), users, operators);

		Fixture {
			pool,
			coordinator,
			credentials,
			resolver,
			sessions,
			audit,
			sink,
			clock,
			elevated,
			standard,
			target,
		}
	}

	#[tokio::test]
	async fn elevated_operator_acts_as_user() {
		let f = fixture().await;
		let request = f.request(&f.elevated, &f.target);
		let operator_token = request.operator_token.clone();

		let started = f.coordinator.start(request).await.unwrap();

		let resolved = f
			.resolver
			.resolve_token(started.user_token.token.clone())
			.await
			.unwrap();
		assert_eq!(resolved.principal.as_user().unwrap().id, f.target.id);
		assert_eq!(started.user_token.max_age_secs(), 2 * 3600);

		let row = f.sessions.get_session(&started.session_id).await.unwrap().unwrap();
		assert!(row.is_open());
		assert_eq!(row.operator_id, f.elevated.id);
		assert_eq!(row.original_token, operator_token);
		assert_eq!(row.ip_address.as_deref(), Some("203.0.113.9"));
		assert_eq!(row.reason.as_deref(), Some("support ticket 4821"));

		assert_eq!(f.audit_actions().await, vec![actions::IMPERSONATION_STARTED]);
		let entries = f.sink.entries.lock().unwrap().clone();
		assert_eq!(entries[0].operator_id, Some(f.elevated.id));
		assert_eq!(entries[0].impersonated_user_id, Some(f.target.id));
		assert_eq!(entries[0].metadata["session_id"], started.session_id.to_string());
		assert_eq!(entries[0].metadata["reason"], "support ticket 4821");
	}

	#[tokio::test]
	async fn standard_operator_is_forbidden_and_leaves_no_trace_but_the_audit() {
		let f = fixture().await;
		let err = f
			.coordinator
			.start(f.request(&f.standard, &f.target))
			.await
			.unwrap_err();
		assert!(matches!(err, ImpersonationError::Forbidden));

		assert!(f
			.sessions
			.list_sessions_for_operator(&f.standard.id, 10)
			.await
			.unwrap()
			.is_empty());
		assert_eq!(f.audit_actions().await, vec![actions::IMPERSONATION_DENIED]);
	}

	#[tokio::test]
	async fn inactive_or_unknown_operator_is_forbidden() {
		let f = fixture().await;
		OperatorRepository::new(f.pool.clone())
			.deactivate_operator(&f.elevated.id)
			.await
			.unwrap();
		let err = f
			.coordinator
			.start(f.request(&f.elevated, &f.target))
			.await
			.unwrap_err();
		assert!(matches!(err, ImpersonationError::Forbidden));

		let mut ghost = f.request(&f.standard, &f.target);
		ghost.operator_id = OperatorId::generate();
		assert!(matches!(
			f.coordinator.start(ghost).await.unwrap_err(),
			ImpersonationError::Forbidden
		));
	}

	#[tokio::test]
	async fn missing_or_deleted_target_is_not_found() {
		let f = fixture().await;
		let mut request = f.request(&f.elevated, &f.target);
		request.target_user_id = warden_server_auth::UserId::generate();
		assert!(matches!(
			f.coordinator.start(request).await.unwrap_err(),
			ImpersonationError::TargetNotFound
		));

		UserRepository::new(f.pool.clone())
			.soft_delete_user(&f.target.id)
			.await
			.unwrap();
		assert!(matches!(
			f.coordinator
				.start(f.request(&f.elevated, &f.target))
				.await
				.unwrap_err(),
			ImpersonationError::TargetNotFound
		));
	}

	#[tokio::test]
	async fn second_start_is_rejected() {
		let f = fixture().await;
		f.coordinator
			.start(f.request(&f.elevated, &f.target))
			.await
			.unwrap();
		let other = insert_user(&f.pool, "u2@example.com").await;
		assert!(matches!(
			f.coordinator
				.start(f.request(&f.elevated, &other))
				.await
				.unwrap_err(),
			ImpersonationError::AlreadyImpersonating
		));
		assert_eq!(f.sessions.count_open_sessions(&f.elevated.id).await.unwrap(), 1);
	}

	#[tokio::test]
	async fn lifecycle_start_check_end_end() {
		let f = fixture().await;
		let request = f.request(&f.elevated, &f.target);
		let operator_token = request.operator_token.clone();
		let started = f.coordinator.start(request).await.unwrap();
		let indicator = started.session_id.to_string();

		let status = f.coordinator.check(Some(&indicator)).await.unwrap();
		assert!(status.impersonating);
		assert_eq!(status.operator_id, Some(f.elevated.id));
		assert_eq!(status.target_user_id, Some(f.target.id));

		f.clock.advance(Duration::minutes(15));
		let client = ClientInfo::default();
		match f.coordinator.end(f.elevated.id, &client).await.unwrap() {
			EndOutcome::Ended {
				operator_token: returned,
				session_id,
				target_user_id,
				duration_secs,
				..
			} => {
				assert_eq!(returned, operator_token);
				assert_eq!(session_id, started.session_id);
				assert_eq!(target_user_id, f.target.id);
				assert_eq!(duration_secs, 15 * 60);
			}
			EndOutcome::AlreadyEnded => panic!("expected Ended"),
		}

		assert!(!f.coordinator.check(Some(&indicator)).await.unwrap().impersonating);
		assert!(matches!(
			f.coordinator.end(f.elevated.id, &client).await.unwrap(),
			EndOutcome::AlreadyEnded
		));

		// check is silent; the second end is a no-op.
		assert_eq!(
			f.audit_actions().await,
			vec![actions::IMPERSONATION_STARTED, actions::IMPERSONATION_ENDED]
		);
		let entries = f.sink.entries.lock().unwrap().clone();
		assert_eq!(entries[1].metadata["duration_secs"], 900);
	}

	#[tokio::test]
	async fn check_ignores_garbage_and_unknown_indicators() {
		let f = fixture().await;
		assert_eq!(f.coordinator.check(None).await.unwrap(), ImpersonationStatus::inactive());
		assert!(!f.coordinator.check(Some("not-a-uuid")).await.unwrap().impersonating);
		let unknown = ImpersonationSessionId::generate().to_string();
		assert!(!f.coordinator.check(Some(&unknown)).await.unwrap().impersonating);
	}

	/// Rows written before the one-open-session index existed can leave an
	/// operator with several open sessions. Recreate that state.
	async fn two_open_sessions(f: &Fixture) -> (ImpersonationSession, ImpersonationSession) {
		sqlx::query("DROP INDEX idx_impersonation_sessions_one_open")
			.execute(&f.pool)
			.await
			.unwrap();
		let other = insert_user(&f.pool, "u2@example.com").await;
		let now = f.clock.now();
		let older = ImpersonationSession {
			id: ImpersonationSessionId::generate(),
			operator_id: f.elevated.id,
			target_user_id: f.target.id,
			original_token: SecretString::new("older-token".to_string()),
			ip_address: None,
			reason: None,
			started_at: now - Duration::minutes(30),
			ended_at: None,
		};
		let newer = ImpersonationSession {
			id: ImpersonationSessionId::generate(),
			target_user_id: other.id,
			original_token: SecretString::new("newer-token".to_string()),
			started_at: now - Duration::minutes(5),
			..older.clone()
		};
		f.sessions.create_session(&older).await.unwrap();
		f.sessions.create_session(&newer).await.unwrap();
		(older, newer)
	}

	#[tokio::test]
	async fn end_targets_most_recent_of_several_open_sessions() {
		let f = fixture().await;
		let (older, newer) = two_open_sessions(&f).await;

		let outcome = f
			.coordinator
			.end(f.elevated.id, &ClientInfo::default())
			.await
			.unwrap();
		match outcome {
			EndOutcome::Ended {
				operator_token,
				session_id,
				..
			} => {
				assert_eq!(session_id, newer.id);
				assert_eq!(operator_token.expose(), "newer-token");
			}
			EndOutcome::AlreadyEnded => panic!("expected Ended"),
		}
		assert!(f.sessions.get_session(&older.id).await.unwrap().unwrap().is_open());
	}

	#[tokio::test]
	async fn end_for_session_closes_exactly_the_named_session() {
		let f = fixture().await;
		let (older, newer) = two_open_sessions(&f).await;
		let acting = Principal::User(f.target.clone());

		let outcome = f
			.coordinator
			.end_for_session(older.id, &acting, &ClientInfo::default())
			.await
			.unwrap();
		match outcome {
			EndOutcome::Ended {
				operator_token,
				session_id,
				target_user_id,
				..
			} => {
				assert_eq!(session_id, older.id);
				assert_eq!(target_user_id, f.target.id);
				assert_eq!(operator_token.expose(), "older-token");
			}
			EndOutcome::AlreadyEnded => panic!("expected Ended"),
		}
		assert!(!f.sessions.get_session(&older.id).await.unwrap().unwrap().is_open());
		assert!(f.sessions.get_session(&newer.id).await.unwrap().unwrap().is_open());

		let entries = {
			f.audit.flush().await;
			f.sink.entries.lock().unwrap().clone()
		};
		let ended = entries
			.iter()
			.find(|e| e.action == actions::IMPERSONATION_ENDED)
			.unwrap();
		assert_eq!(ended.metadata["session_id"], older.id.to_string());
	}

	#[tokio::test]
	async fn concurrent_starts_open_one_session() {
		let f = fixture().await;
		let other = insert_user(&f.pool, "u2@example.com").await;

		let (a, b) = tokio::join!(
			f.coordinator.start(f.request(&f.elevated, &f.target)),
			f.coordinator.start(f.request(&f.elevated, &other))
		);
		let results = [a, b];
		assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
		assert!(results
			.iter()
			.any(|r| matches!(r, Err(ImpersonationError::AlreadyImpersonating))));
		assert_eq!(f.sessions.count_open_sessions(&f.elevated.id).await.unwrap(), 1);

		let started = f
			.audit_actions()
			.await
			.into_iter()
			.filter(|a| a == actions::IMPERSONATION_STARTED)
			.count();
		assert_eq!(started, 1);
	}

	#[tokio::test]
	async fn concurrent_ends_hand_out_the_token_once() {
		let f = fixture().await;
		f.coordinator
			.start(f.request(&f.elevated, &f.target))
			.await
			.unwrap();

		let client = ClientInfo::default();
		let (a, b) = tokio::join!(
			f.coordinator.end(f.elevated.id, &client),
			f.coordinator.end(f.elevated.id, &client)
		);
		let ended = [a.unwrap(), b.unwrap()]
			.iter()
			.filter(|o| o.is_ended())
			.count();
		assert_eq!(ended, 1);
	}

	#[tokio::test]
	async fn end_for_session_by_impersonated_user() {
		let f = fixture().await;
		let started = f
			.coordinator
			.start(f.request(&f.elevated, &f.target))
			.await
			.unwrap();
		let acting = f
			.resolver
			.resolve_token(started.user_token.token.clone())
			.await
			.unwrap()
			.principal;

		let outcome = f
			.coordinator
			.end_for_session(started.session_id, &acting, &ClientInfo::default())
			.await
			.unwrap();
		assert!(outcome.is_ended());

		let again = f
			.coordinator
			.end_for_session(started.session_id, &acting, &ClientInfo::default())
			.await
			.unwrap();
		assert!(matches!(again, EndOutcome::AlreadyEnded));
	}

	#[tokio::test]
	async fn end_for_session_rejects_strangers() {
		let f = fixture().await;
		let started = f
			.coordinator
			.start(f.request(&f.elevated, &f.target))
			.await
			.unwrap();
		let stranger = insert_user(&f.pool, "nosy@example.com").await;

		let err = f
			.coordinator
			.end_for_session(
				started.session_id,
				&Principal::User(stranger),
				&ClientInfo::default(),
			)
			.await
			.unwrap_err();
		assert!(matches!(err, ImpersonationError::Forbidden));

		let err = f
			.coordinator
			.end_for_session(
				started.session_id,
				&Principal::Operator(f.standard.clone()),
				&ClientInfo::default(),
			)
			.await
			.unwrap_err();
		assert!(matches!(err, ImpersonationError::Forbidden));

		let err = f
			.coordinator
			.end_for_session(
				ImpersonationSessionId::generate(),
				&Principal::Operator(f.elevated.clone()),
				&ClientInfo::default(),
			)
			.await
			.unwrap_err();
		assert!(matches!(err, ImpersonationError::SessionNotFound));
	}

	#[tokio::test]
	async fn impersonation_token_expires_within_its_bound() {
		let f = fixture().await;
		let started = f
			.coordinator
			.start(f.request(&f.elevated, &f.target))
			.await
			.unwrap();
		f.clock.advance(Duration::hours(2) + Duration::seconds(10));
		assert!(f
			.resolver
			.resolve_token(started.user_token.token)
			.await
			.is_none());
	}
}
