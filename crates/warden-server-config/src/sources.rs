// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: built-in defaults, TOML file, environment variables.

use std::path::PathBuf;

use tracing::{debug, trace};

use crate::env::load_secret_env;
use crate::error::ConfigError;
use crate::layer::ServerConfigLayer;
use crate::sections::{
	AuditConfigLayer, AuthConfigLayer, DatabaseConfigLayer, HttpConfigLayer, LogFormat,
	LoggingConfigLayer, SecretsConfigLayer,
};

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ServerConfigLayer, ConfigError>;
}

pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		Ok(ServerConfigLayer::default())
	}
}

/// TOML file source. A missing file is not an error.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/warden/server.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ServerConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: ServerConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: `WARDEN_SERVER_<SECTION>_<FIELD>`; key material also accepts
/// the `_FILE` suffix.
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		Ok(ServerConfigLayer {
			http: Some(load_http_from_env()?),
			database: Some(load_database_from_env()),
			auth: Some(load_auth_from_env()?),
			secrets: Some(load_secrets_from_env()?),
			audit: Some(load_audit_from_env()?),
			logging: Some(load_logging_from_env()?),
		})
	}
}

fn env_var(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_bool(name: &str) -> Option<bool> {
	env_var(name).map(|v| v.eq_ignore_ascii_case("true") || v == "1")
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>, ConfigError> {
	match env_var(name) {
		Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("cannot parse '{v}' as {}", std::any::type_name::<T>()),
		}),
		None => Ok(None),
	}
}

fn load_http_from_env() -> Result<HttpConfigLayer, ConfigError> {
	Ok(HttpConfigLayer {
		host: env_var("WARDEN_SERVER_HOST"),
		port: env_parse("WARDEN_SERVER_PORT")?,
	})
}

fn load_database_from_env() -> DatabaseConfigLayer {
	DatabaseConfigLayer {
		url: env_var("WARDEN_SERVER_DATABASE_URL"),
	}
}

fn load_auth_from_env() -> Result<AuthConfigLayer, ConfigError> {
	Ok(AuthConfigLayer {
		dev_mode: env_bool("WARDEN_SERVER_AUTH_DEV_MODE"),
		environment: env_var("WARDEN_SERVER_ENV"),
		token_signing_key: load_secret_env("WARDEN_SERVER_TOKEN_SIGNING_KEY")?,
		user_token_ttl_secs: env_parse("WARDEN_SERVER_USER_TOKEN_TTL_SECS")?,
		operator_token_ttl_secs: env_parse("WARDEN_SERVER_OPERATOR_TOKEN_TTL_SECS")?,
		impersonation_token_ttl_secs: env_parse("WARDEN_SERVER_IMPERSONATION_TOKEN_TTL_SECS")?,
		clock_skew_secs: env_parse("WARDEN_SERVER_TOKEN_CLOCK_SKEW_SECS")?,
		session_cookie_name: env_var("WARDEN_SERVER_SESSION_COOKIE_NAME"),
		impersonation_cookie_name: env_var("WARDEN_SERVER_IMPERSONATION_COOKIE_NAME"),
		cookie_secure: env_bool("WARDEN_SERVER_COOKIE_SECURE"),
		password_hash_concurrency: env_parse("WARDEN_SERVER_PASSWORD_HASH_CONCURRENCY")?,
	})
}

fn load_secrets_from_env() -> Result<SecretsConfigLayer, ConfigError> {
	Ok(SecretsConfigLayer {
		master_key: load_secret_env("WARDEN_SERVER_SECRETS_MASTER_KEY")?,
		kdf_salt: env_var("WARDEN_SERVER_SECRETS_KDF_SALT"),
		cache_ttl_secs: env_parse("WARDEN_SERVER_SECRETS_CACHE_TTL_SECS")?,
	})
}

fn load_audit_from_env() -> Result<AuditConfigLayer, ConfigError> {
	Ok(AuditConfigLayer {
		tracing_sink: env_bool("WARDEN_SERVER_AUDIT_TRACING_SINK"),
		queue_capacity: env_parse("WARDEN_SERVER_AUDIT_QUEUE_CAPACITY")?,
		max_user_agent_len: env_parse("WARDEN_SERVER_AUDIT_MAX_USER_AGENT_LEN")?,
		max_stack_trace_len: env_parse("WARDEN_SERVER_AUDIT_MAX_STACK_TRACE_LEN")?,
		max_text_len: env_parse("WARDEN_SERVER_AUDIT_MAX_TEXT_LEN")?,
	})
}

fn load_logging_from_env() -> Result<LoggingConfigLayer, ConfigError> {
	let format = match env_var("WARDEN_SERVER_LOG_FORMAT") {
		Some(v) => Some(LogFormat::parse(&v).ok_or_else(|| ConfigError::InvalidValue {
			key: "WARDEN_SERVER_LOG_FORMAT".to_string(),
			message: format!("unknown log format '{v}' (expected text or json)"),
		})?),
		None => None,
	};

	Ok(LoggingConfigLayer {
		level: env_var("WARDEN_SERVER_LOG_LEVEL"),
		format,
	})
}
