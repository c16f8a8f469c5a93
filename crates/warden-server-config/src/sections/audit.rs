// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Audit log configuration.

use serde::Deserialize;

#[derive(Debug, Clone)]
pub struct AuditConfig {
	/// Mirror entries to the `warden_audit` tracing target as well as the database.
	pub tracing_sink: bool,
	pub queue_capacity: usize,
	pub max_user_agent_len: usize,
	pub max_stack_trace_len: usize,
	/// Bound for description and error message.
	pub max_text_len: usize,
}

impl Default for AuditConfig {
	fn default() -> Self {
		AuditConfigLayer::default().finalize()
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditConfigLayer {
	#[serde(default)]
	pub tracing_sink: Option<bool>,
	#[serde(default)]
	pub queue_capacity: Option<usize>,
	#[serde(default)]
	pub max_user_agent_len: Option<usize>,
	#[serde(default)]
	pub max_stack_trace_len: Option<usize>,
	#[serde(default)]
	pub max_text_len: Option<usize>,
}

impl AuditConfigLayer {
	pub fn merge(&mut self, other: AuditConfigLayer) {
		if other.tracing_sink.is_some() {
			self.tracing_sink = other.tracing_sink;
		}
		if other.queue_capacity.is_some() {
			self.queue_capacity = other.queue_capacity;
		}
		if other.max_user_agent_len.is_some() {
			self.max_user_agent_len = other.max_user_agent_len;
		}
		if other.max_stack_trace_len.is_some() {
			self.max_stack_trace_len = other.max_stack_trace_len;
		}
		if other.max_text_len.is_some() {
			self.max_text_len = other.max_text_len;
		}
	}

	pub fn finalize(self) -> AuditConfig {
		AuditConfig {
			tracing_sink: self.tracing_sink.unwrap_or(true),
			queue_capacity: self.queue_capacity.unwrap_or(10_000).max(1),
			max_user_agent_len: self.max_user_agent_len.unwrap_or(512),
			max_stack_trace_len: self.max_stack_trace_len.unwrap_or(8192),
			max_text_len: self.max_text_len.unwrap_or(2048),
		}
	}
}
