// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use async_trait::async_trait;
use tracing::Level;

use super::{AuditSink, AuditSinkError};
use crate::event::{AuditCategory, AuditEntry};

/// Emits each entry as one structured log line on the `warden_audit` target.
#[derive(Debug, Default)]
pub struct TracingAuditSink;

impl TracingAuditSink {
	pub fn new() -> Self {
		Self
	}
}

pub fn category_to_level(category: AuditCategory) -> Level {
	match category {
		AuditCategory::Error => Level::ERROR,
		AuditCategory::Operator => Level::WARN,
		AuditCategory::Api | AuditCategory::User | AuditCategory::System => Level::INFO,
	}
}

macro_rules! emit {
	($macro:ident, $entry:expr) => {{
		let entry = $entry;
		tracing::$macro!(
			target: "warden_audit",
			id = %entry.id,
			category = entry.category.as_str(),
			action = %entry.action,
			description = entry.description.as_deref(),
			user_id = entry.user_id.map(|u| u.to_string()),
			operator_id = entry.operator_id.map(|o| o.to_string()),
			impersonated_user_id = entry.impersonated_user_id.map(|u| u.to_string()),
			ip_address = entry.ip_address.as_deref(),
			user_agent = entry.user_agent.as_deref(),
			method = entry.method.as_deref(),
			path = entry.path.as_deref(),
			response_status = entry.response_status,
			duration_ms = entry.duration_ms,
			error_message = entry.error_message.as_deref(),
			metadata = (!entry.metadata.is_null()).then(|| entry.metadata.to_string()),
			"audit entry"
		);
	}};
}

#[async_trait]
impl AuditSink for TracingAuditSink {
	fn name(&self) -> &str {
		"tracing"
	}

	async fn publish(&self, entry: Arc<AuditEntry>) -> Result<(), AuditSinkError> {
		let entry = entry.as_ref();
		match category_to_level(entry.category) {
			Level::ERROR => emit!(error, entry),
			Level::WARN => emit!(warn, entry),
			_ => emit!(info, entry),
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn category_to_level_mappings() {
		assert_eq!(category_to_level(AuditCategory::Error), Level::ERROR);
		assert_eq!(category_to_level(AuditCategory::Operator), Level::WARN);
		assert_eq!(category_to_level(AuditCategory::Api), Level::INFO);
		assert_eq!(category_to_level(AuditCategory::System), Level::INFO);
	}

	#[tokio::test]
	async fn publish_never_fails() {
		let sink = TracingAuditSink::new();
		assert_eq!(sink.name(), "tracing");
		let entry = AuditEntry::builder(AuditCategory::Error, "x")
			.error("boom")
			.meta("k", 1)
			.build();
		assert!(sink.publish(Arc::new(entry)).await.is_ok());
	}
}
