// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration for the Warden identity server.
//!
//! Values are merged from built-in defaults, a TOML file, and `WARDEN_SERVER_*`
//! environment variables (highest precedence). Key material is read with the
//! `VAR` / `VAR_FILE` convention, see [`load_secret_env`].
//!
//! ```ignore
//! let config = warden_server_config::load_config()?;
//! println!("listening on {}", config.socket_addr());
//! ```

pub mod env;
pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use env::{load_secret_env, SecretEnvError};
pub use error::ConfigError;
pub use layer::ServerConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use tracing::{debug, info};

/// Minimum length, in bytes, of the signing key and the master key.
pub const MIN_KEY_LEN: usize = 32;

/// Upper bound on any token lifetime: ten years.
pub const MAX_TOKEN_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Fully resolved server configuration.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
	pub http: HttpConfig,
	pub database: DatabaseConfig,
	pub auth: AuthConfig,
	pub secrets: SecretsConfig,
	pub audit: AuditConfig,
	pub logging: LoggingConfig,
}

impl ServerConfig {
	pub fn socket_addr(&self) -> String {
		format!("{}:{}", self.http.host, self.http.port)
	}
}

/// Load configuration from defaults, `/etc/warden/server.toml`, and the
/// environment.
pub fn load_config() -> Result<ServerConfig, ConfigError> {
	let sources: Vec<Box<dyn ConfigSource>> = vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	];
	load_from_sources(sources)
}

/// Same as [`load_config`] with an explicit config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<ServerConfig, ConfigError> {
	let sources: Vec<Box<dyn ConfigSource>> = vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	];
	load_from_sources(sources)
}

fn load_from_sources(mut sources: Vec<Box<dyn ConfigSource>>) -> Result<ServerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		merged.merge(source.load()?);
	}

	finalize(merged)
}

/// Resolve a merged layer and run cross-field validation.
pub fn finalize(layer: ServerConfigLayer) -> Result<ServerConfig, ConfigError> {
	let config = ServerConfig {
		http: layer.http.unwrap_or_default().finalize(),
		database: layer.database.unwrap_or_default().finalize(),
		auth: layer.auth.unwrap_or_default().finalize(),
		secrets: layer.secrets.unwrap_or_default().finalize(),
		audit: layer.audit.unwrap_or_default().finalize(),
		logging: layer.logging.unwrap_or_default().finalize(),
	};

	validate_config(&config)?;

	info!(
		host = %config.http.host,
		port = config.http.port,
		database = %config.database.url,
		environment = %config.auth.environment,
		cookie_secure = config.auth.cookie_secure,
		settings_cache_ttl_secs = config.secrets.cache_ttl_secs,
		"Server configuration loaded"
	);

	Ok(config)
}

/// Cross-field rules. Both keys are required, long enough, and distinct.
pub fn validate_config(config: &ServerConfig) -> Result<(), ConfigError> {
	let auth = &config.auth;

	if auth.dev_mode && auth.is_production() {
		return Err(ConfigError::Validation(
			"WARDEN_SERVER_AUTH_DEV_MODE=1 is set while WARDEN_SERVER_ENV=production".to_string(),
		));
	}

	let signing_key = auth
		.token_signing_key
		.as_ref()
		.ok_or_else(|| ConfigError::Missing("WARDEN_SERVER_TOKEN_SIGNING_KEY".to_string()))?;
	let master_key = config
		.secrets
		.master_key
		.as_ref()
		.ok_or_else(|| ConfigError::Missing("WARDEN_SERVER_SECRETS_MASTER_KEY".to_string()))?;

	if signing_key.len() < MIN_KEY_LEN {
		return Err(ConfigError::InvalidValue {
			key: "WARDEN_SERVER_TOKEN_SIGNING_KEY".to_string(),
			message: format!("must be at least {MIN_KEY_LEN} bytes"),
		});
	}
	if master_key.len() < MIN_KEY_LEN {
		return Err(ConfigError::InvalidValue {
			key: "WARDEN_SERVER_SECRETS_MASTER_KEY".to_string(),
			message: format!("must be at least {MIN_KEY_LEN} bytes"),
		});
	}
	if signing_key == master_key {
		return Err(ConfigError::Validation(
			"token signing key and settings master key must differ".to_string(),
		));
	}

	for (key, ttl) in [
		("WARDEN_SERVER_USER_TOKEN_TTL_SECS", auth.user_token_ttl_secs),
		("WARDEN_SERVER_OPERATOR_TOKEN_TTL_SECS", auth.operator_token_ttl_secs),
	] {
		if ttl == 0 || ttl > MAX_TOKEN_TTL_SECS {
			return Err(ConfigError::InvalidValue {
				key: key.to_string(),
				message: format!("must be between 1 and {MAX_TOKEN_TTL_SECS} seconds"),
			});
		}
	}

	if auth.impersonation_token_ttl_secs == 0
		|| auth.impersonation_token_ttl_secs > auth.operator_token_ttl_secs
	{
		return Err(ConfigError::InvalidValue {
			key: "WARDEN_SERVER_IMPERSONATION_TOKEN_TTL_SECS".to_string(),
			message: "must be positive and no longer than the operator token lifetime"
				.to_string(),
		});
	}

	// A user may stop an impersonation only with a token no longer-lived than
	// an impersonation token, so real user sessions must outlive those.
	if auth.user_token_ttl_secs <= auth.impersonation_token_ttl_secs {
		return Err(ConfigError::InvalidValue {
			key: "WARDEN_SERVER_USER_TOKEN_TTL_SECS".to_string(),
			message: "must be longer than the impersonation token lifetime".to_string(),
		});
	}

	if auth.session_cookie_name == auth.impersonation_cookie_name {
		return Err(ConfigError::Validation(
			"session and impersonation cookies need different names".to_string(),
		));
	}

	Ok(())
}
