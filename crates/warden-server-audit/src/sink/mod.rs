// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use async_trait::async_trait;

pub use crate::error::AuditSinkError;
use crate::event::AuditEntry;

#[async_trait]
pub trait AuditSink: Send + Sync {
	/// Unique name for this sink (used in logs).
	fn name(&self) -> &str;

	/// Publish an already redacted entry.
	async fn publish(&self, entry: Arc<AuditEntry>) -> Result<(), AuditSinkError>;

	/// Health check (optional, default: Ok).
	async fn health_check(&self) -> Result<(), AuditSinkError> {
		Ok(())
	}
}

#[cfg(feature = "sink-sqlite")]
pub mod sqlite;

#[cfg(feature = "sink-tracing")]
pub mod tracing;
