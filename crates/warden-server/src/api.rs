// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Application state and router construction.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use axum::{
	middleware::from_fn_with_state,
	routing::{get, post},
	Router,
};
use chrono::Duration;
use warden_server_audit::{AuditService, AuditSink, SqliteAuditSink, TracingAuditSink};
use warden_server_auth::{Clock, CredentialService, SystemClock, TokenLifetimes};
use warden_server_config::{validate_config, AuthConfig, ConfigError, ServerConfig};
use warden_server_db::{
	AuditRepository, ImpersonationRepository, OperatorRepository, SettingsRepository, SqlitePool,
	UserRepository,
};
use warden_server_impersonation::ImpersonationCoordinator;
use warden_server_secrets::{KdfParams, SecretCipher, SettingsService};
use warden_server_session::{CookieSettings, SessionResolver};

use crate::{auth_middleware::auth_layer, error::ServerError, request_audit::api_audit_layer, routes};

/// Shared state for all handlers. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
	pub pool: SqlitePool,
	pub user_repo: Arc<UserRepository>,
	pub operator_repo: Arc<OperatorRepository>,
	pub audit_repo: Arc<AuditRepository>,
	pub credentials: CredentialService,
	pub resolver: SessionResolver,
	pub impersonation: ImpersonationCoordinator,
	pub settings: Arc<SettingsService>,
	pub audit_service: AuditService,
	pub cookies: CookieSettings,
	pub clock: Arc<dyn Clock>,
}

fn seconds(value: u64) -> Duration {
	// chrono panics past i64::MAX milliseconds.
	Duration::seconds(value.min(i64::MAX as u64 / 1000) as i64)
}

fn token_lifetimes(auth: &AuthConfig) -> TokenLifetimes {
	TokenLifetimes {
		user: seconds(auth.user_token_ttl_secs),
		operator: seconds(auth.operator_token_ttl_secs),
		impersonation: seconds(auth.impersonation_token_ttl_secs),
	}
}

/// Build the state, deriving the settings key with production KDF cost.
#[tracing::instrument(skip_all)]
pub async fn create_app_state(config: &ServerConfig, pool: SqlitePool) -> Result<AppState, ServerError> {
	validate_config(config)?;
	let master_key = config
		.secrets
		.master_key
		.clone()
		.ok_or_else(|| ConfigError::Missing("WARDEN_SERVER_SECRETS_MASTER_KEY".to_string()))?;

	let cipher = SecretCipher::derive(master_key, config.secrets.kdf_salt.clone(), KdfParams::default()).await?;

	build_app_state(config, pool, Arc::new(cipher), Arc::new(SystemClock))
}

/// Build the state around an already derived cipher and an explicit clock.
pub fn build_app_state(
	config: &ServerConfig,
	pool: SqlitePool,
	cipher: Arc<SecretCipher>,
	clock: Arc<dyn Clock>,
) -> Result<AppState, ServerError> {
	validate_config(config)?;
	let signing_key = config
		.auth
		.token_signing_key
		.clone()
		.ok_or_else(|| ConfigError::Missing("WARDEN_SERVER_TOKEN_SIGNING_KEY".to_string()))?;

	let user_repo = Arc::new(UserRepository::new(pool.clone()));
	let operator_repo = Arc::new(OperatorRepository::new(pool.clone()));
	let audit_repo = Arc::new(AuditRepository::new(pool.clone()));

	let mut sinks: Vec<Arc<dyn AuditSink>> = vec![Arc::new(SqliteAuditSink::new(pool.clone()))];
	if config.audit.tracing_sink {
		sinks.push(Arc::new(TracingAuditSink::new()));
	}
	let audit_service = AuditService::from_config(&config.audit, sinks);

	let credentials = CredentialService::builder(signing_key)
		.clock(Arc::clone(&clock))
		.clock_skew(seconds(config.auth.clock_skew_secs))
		.lifetimes(token_lifetimes(&config.auth))
		.hash_concurrency(config.auth.password_hash_concurrency)
		.build();

	let resolver = SessionResolver::new(
		credentials.clone(),
		user_repo.clone(),
		operator_repo.clone(),
	)
	.with_session_cookie_name(config.auth.session_cookie_name.clone());

	let impersonation = ImpersonationCoordinator::new(
		user_repo.clone(),
		operator_repo.clone(),
		Arc::new(ImpersonationRepository::new(pool.clone())),
		credentials.clone(),
		audit_service.clone(),
	)
	.with_clock(Arc::clone(&clock));

	let settings = Arc::new(SettingsService::new(
		Arc::new(SettingsRepository::new(pool.clone())),
		cipher,
		audit_service.clone(),
		StdDuration::from_secs(config.secrets.cache_ttl_secs),
	));

	tracing::info!(
		sinks = ?audit_service.sink_names(),
		cookie_secure = config.auth.cookie_secure,
		"application state ready"
	);

	Ok(AppState {
		pool,
		user_repo,
		operator_repo,
		audit_repo,
		credentials,
		resolver,
		impersonation,
		settings,
		audit_service,
		cookies: CookieSettings::from(&config.auth),
		clock,
	})
}

pub fn create_router(state: AppState) -> Router {
	let admin = Router::new()
		.route(
			"/api/admin/impersonate",
			post(routes::impersonation::start_impersonation),
		)
		.route(
			"/api/admin/impersonate/status",
			get(routes::impersonation::impersonation_status),
		)
		.route(
			"/api/admin/impersonate/stop",
			post(routes::impersonation::stop_impersonation),
		)
		.route(
			"/api/admin/settings/{key}",
			get(routes::settings::get_setting).put(routes::settings::update_setting),
		)
		.route(
			"/api/admin/audit-logs",
			get(routes::audit_logs::list_audit_logs),
		)
		.layer(from_fn_with_state(state.clone(), api_audit_layer));

	Router::new()
		.route("/health", get(routes::health::health_check))
		.route("/auth/login", post(routes::auth::login))
		.route("/auth/operator/login", post(routes::auth::operator_login))
		.route("/auth/logout", post(routes::auth::logout))
		.route("/auth/me", get(routes::auth::me))
		.merge(admin)
		.layer(from_fn_with_state(state.clone(), auth_layer))
		.with_state(state)
}
