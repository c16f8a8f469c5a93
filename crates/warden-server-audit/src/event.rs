// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Audit entry model.
//!
//! - [`AuditCategory`]: the five coarse categories entries are filed under
//! - [`AuditEntry`]: one append-only audit row
//! - [`AuditEntryBuilder`]: fluent construction, started with [`AuditEntry::builder`]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use warden_server_auth::{OperatorId, UserId};

/// Action names used by the identity layer itself.
pub mod actions {
	pub const LOGIN: &str = "login";
	pub const LOGIN_FAILED: &str = "login_failed";
	pub const LOGOUT: &str = "logout";
	pub const IMPERSONATION_STARTED: &str = "impersonation_started";
	pub const IMPERSONATION_ENDED: &str = "impersonation_ended";
	pub const IMPERSONATION_DENIED: &str = "impersonation_denied";
	pub const SETTING_UPDATED: &str = "setting_updated";
	pub const SETTING_DECRYPT_FAILED: &str = "setting_decrypt_failed";
	pub const API_REQUEST: &str = "api_request";
	pub const SERVER_STARTED: &str = "server_started";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditCategory {
	/// HTTP traffic through the admin surface.
	Api,
	/// Actions taken by or against an end user.
	User,
	/// Privileged operator actions.
	Operator,
	/// Failures worth keeping, such as a setting that no longer decrypts.
	Error,
	/// Process lifecycle.
	System,
}

impl AuditCategory {
	pub fn all() -> &'static [AuditCategory] {
		&[
			AuditCategory::Api,
			AuditCategory::User,
			AuditCategory::Operator,
			AuditCategory::Error,
			AuditCategory::System,
		]
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			AuditCategory::Api => "api",
			AuditCategory::User => "user",
			AuditCategory::Operator => "operator",
			AuditCategory::Error => "error",
			AuditCategory::System => "system",
		}
	}
}

impl fmt::Display for AuditCategory {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for AuditCategory {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		AuditCategory::all()
			.iter()
			.copied()
			.find(|c| c.as_str() == s)
			.ok_or_else(|| format!("unknown audit category: {s}"))
	}
}

/// An entry in the audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
	pub id: Uuid,
	pub created_at: DateTime<Utc>,
	pub category: AuditCategory,
	pub action: String,
	pub description: Option<String>,

	pub user_id: Option<UserId>,
	pub operator_id: Option<OperatorId>,
	/// Set while an operator acts as this user.
	pub impersonated_user_id: Option<UserId>,

	pub ip_address: Option<String>,
	pub user_agent: Option<String>,

	pub method: Option<String>,
	pub path: Option<String>,
	/// Request body, redacted before it reaches any sink.
	pub request_body: Option<Value>,
	pub response_status: Option<u16>,
	pub duration_ms: Option<i64>,

	pub error_message: Option<String>,
	pub error_stack: Option<String>,

	/// Free-form JSON object, redacted like `request_body`.
	pub metadata: Value,
}

impl AuditEntry {
	pub fn builder(category: AuditCategory, action: impl Into<String>) -> AuditEntryBuilder {
		AuditEntryBuilder::new(category, action)
	}
}

#[derive(Debug, Clone)]
pub struct AuditEntryBuilder {
	entry: AuditEntry,
}

impl AuditEntryBuilder {
	pub fn new(category: AuditCategory, action: impl Into<String>) -> Self {
		Self {
			entry: AuditEntry {
				id: Uuid::new_v4(),
				created_at: Utc::now(),
				category,
				action: action.into(),
				description: None,
				user_id: None,
				operator_id: None,
				impersonated_user_id: None,
				ip_address: None,
				user_agent: None,
				method: None,
				path: None,
				request_body: None,
				response_status: None,
				duration_ms: None,
				error_message: None,
				error_stack: None,
				metadata: Value::Null,
			},
		}
	}

	pub fn description(mut self, description: impl Into<String>) -> Self {
		self.entry.description = Some(description.into());
		self
	}

	pub fn user(mut self, user_id: UserId) -> Self {
		self.entry.user_id = Some(user_id);
		self
	}

	pub fn operator(mut self, operator_id: OperatorId) -> Self {
		self.entry.operator_id = Some(operator_id);
		self
	}

	pub fn impersonated_user(mut self, user_id: UserId) -> Self {
		self.entry.impersonated_user_id = Some(user_id);
		self
	}

	/// Origin IP and user agent, each optional.
	pub fn origin(mut self, ip_address: Option<String>, user_agent: Option<String>) -> Self {
		self.entry.ip_address = ip_address;
		self.entry.user_agent = user_agent;
		self
	}

	pub fn ip_address(mut self, ip: impl Into<String>) -> Self {
		self.entry.ip_address = Some(ip.into());
		self
	}

	pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
		self.entry.user_agent = Some(ua.into());
		self
	}

	pub fn request(mut self, method: impl Into<String>, path: impl Into<String>) -> Self {
		self.entry.method = Some(method.into());
		self.entry.path = Some(path.into());
		self
	}

	pub fn request_body(mut self, body: Value) -> Self {
		self.entry.request_body = Some(body);
		self
	}

	pub fn response(mut self, status: u16, duration_ms: i64) -> Self {
		self.entry.response_status = Some(status);
		self.entry.duration_ms = Some(duration_ms);
		self
	}

	pub fn error(mut self, message: impl Into<String>) -> Self {
		self.entry.error_message = Some(message.into());
		self
	}

	pub fn error_stack(mut self, stack: impl Into<String>) -> Self {
		self.entry.error_stack = Some(stack.into());
		self
	}

	/// Replace the metadata wholesale.
	pub fn metadata(mut self, metadata: Value) -> Self {
		self.entry.metadata = metadata;
		self
	}

	/// Insert one metadata key. A non-object metadata value is replaced by an object.
	pub fn meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		if !self.entry.metadata.is_object() {
			self.entry.metadata = Value::Object(Map::new());
		}
		if let Value::Object(map) = &mut self.entry.metadata {
			map.insert(key.into(), value.into());
		}
		self
	}

	pub fn build(self) -> AuditEntry {
		self.entry
	}
}
