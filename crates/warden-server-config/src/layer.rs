// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration layer for merging from multiple sources.

use serde::Deserialize;

use crate::sections::{
	AuditConfigLayer, AuthConfigLayer, DatabaseConfigLayer, HttpConfigLayer, LoggingConfigLayer,
	SecretsConfigLayer,
};

/// Server configuration layer - all fields are Option for merging.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerConfigLayer {
	#[serde(default)]
	pub http: Option<HttpConfigLayer>,
	#[serde(default)]
	pub database: Option<DatabaseConfigLayer>,
	#[serde(default)]
	pub auth: Option<AuthConfigLayer>,
	#[serde(default)]
	pub secrets: Option<SecretsConfigLayer>,
	#[serde(default)]
	pub audit: Option<AuditConfigLayer>,
	#[serde(default)]
	pub logging: Option<LoggingConfigLayer>,
}

impl ServerConfigLayer {
	/// Merge another layer into this one. Other layer takes precedence.
	pub fn merge(&mut self, other: ServerConfigLayer) {
		merge_option(&mut self.http, other.http, HttpConfigLayer::merge);
		merge_option(
			&mut self.database,
			other.database,
			DatabaseConfigLayer::merge,
		);
		merge_option(&mut self.auth, other.auth, AuthConfigLayer::merge);
		merge_option(&mut self.secrets, other.secrets, SecretsConfigLayer::merge);
		merge_option(&mut self.audit, other.audit, AuditConfigLayer::merge);
		merge_option(&mut self.logging, other.logging, LoggingConfigLayer::merge);
	}
}

fn merge_option<T, F>(target: &mut Option<T>, source: Option<T>, merge_fn: F)
where
	F: FnOnce(&mut T, T),
{
	match (target.as_mut(), source) {
		(Some(t), Some(s)) => merge_fn(t, s),
		(None, Some(s)) => *target = Some(s),
		_ => {}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn merge_adds_missing_sections() {
		let mut base = ServerConfigLayer::default();
		base.merge(ServerConfigLayer {
			database: Some(DatabaseConfigLayer {
				url: Some("sqlite::memory:".to_string()),
			}),
			..Default::default()
		});
		assert_eq!(
			base.database.unwrap().url.as_deref(),
			Some("sqlite::memory:")
		);
	}

	#[test]
	fn merge_overrides_field_by_field() {
		let mut base = ServerConfigLayer {
			auth: Some(AuthConfigLayer {
				environment: Some("staging".to_string()),
				clock_skew_secs: Some(10),
				..Default::default()
			}),
			..Default::default()
		};
		base.merge(ServerConfigLayer {
			auth: Some(AuthConfigLayer {
				clock_skew_secs: Some(2),
				..Default::default()
			}),
			..Default::default()
		});
		let auth = base.auth.unwrap();
		assert_eq!(auth.environment.as_deref(), Some("staging"));
		assert_eq!(auth.clock_skew_secs, Some(2));
	}

	#[test]
	fn parses_toml() {
		let layer: ServerConfigLayer = toml::from_str(
			r#"
			[http]
			port = 9090

			[auth]
			environment = "production"
			impersonation_token_ttl_secs = 3600

			[secrets]
			cache_ttl_secs = 60

			[logging]
			format = "json"
			"#,
		)
		.unwrap();
		assert_eq!(layer.http.unwrap().port, Some(9090));
		assert_eq!(layer.auth.unwrap().impersonation_token_ttl_secs, Some(3600));
		assert_eq!(layer.secrets.unwrap().cache_ttl_secs, Some(60));
		assert!(layer.logging.unwrap().format.is_some());
	}
}
