// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Fire-and-forget audit pipeline.
//!
//! [`AuditService::record`] never fails and never blocks: the entry is queued
//! and a background task sanitizes it and hands it to every sink in turn.
//! Anything that cannot be persisted (queue full, queue closed, sink error)
//! goes to the `warden_audit::fallback` tracing target instead.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::instrument;
use warden_server_config::AuditConfig;

use crate::error::{AuditError, AuditSinkError};
use crate::event::AuditEntry;
use crate::redaction::{sanitize_entry, TruncationLimits};
use crate::sink::AuditSink;

pub const FALLBACK_TARGET: &str = "warden_audit::fallback";

enum Command {
	Record(Box<AuditEntry>),
	Flush(oneshot::Sender<()>),
}

/// Health of one sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkHealth {
	pub name: String,
	pub healthy: bool,
	pub error: Option<String>,
}

#[derive(Clone)]
pub struct AuditService {
	tx: mpsc::Sender<Command>,
	sinks: Arc<Vec<Arc<dyn AuditSink>>>,
	limits: TruncationLimits,
}

impl AuditService {
	/// Spawns the background task; must be called inside a Tokio runtime.
	pub fn new(
		sinks: Vec<Arc<dyn AuditSink>>,
		queue_capacity: usize,
		limits: TruncationLimits,
	) -> Self {
		let (tx, rx) = mpsc::channel(queue_capacity.max(1));
		let sinks = Arc::new(sinks);

		tokio::spawn(Self::background_task(rx, Arc::clone(&sinks), limits));

		Self { tx, sinks, limits }
	}

	pub fn from_config(config: &AuditConfig, sinks: Vec<Arc<dyn AuditSink>>) -> Self {
		Self::new(sinks, config.queue_capacity, TruncationLimits::from(config))
	}

	async fn background_task(
		mut rx: mpsc::Receiver<Command>,
		sinks: Arc<Vec<Arc<dyn AuditSink>>>,
		limits: TruncationLimits,
	) {
		while let Some(command) = rx.recv().await {
			match command {
				Command::Record(mut entry) => {
					sanitize_entry(&mut entry, &limits);
					let entry: Arc<AuditEntry> = Arc::from(entry);

					for sink in sinks.iter() {
						if let Err(e) = sink.publish(Arc::clone(&entry)).await {
							report_fallback(
								&entry,
								&AuditError::SinkError {
									sink: sink.name().to_string(),
									source: e,
								},
							);
						}
					}
				}
				Command::Flush(done) => {
					let _ = done.send(());
				}
			}
		}
		tracing::debug!("audit pipeline stopped");
	}

	/// Queue an entry. Never fails; see the module docs for what happens when
	/// the entry cannot be queued.
	#[instrument(level = "trace", skip_all, fields(category = %entry.category, action = %entry.action))]
	pub fn record(&self, entry: AuditEntry) {
		match self.tx.try_send(Command::Record(Box::new(entry))) {
			Ok(()) => {}
			Err(mpsc::error::TrySendError::Full(Command::Record(mut entry))) => {
				sanitize_entry(&mut entry, &self.limits);
				report_fallback(&entry, &AuditError::QueueFull);
			}
			Err(mpsc::error::TrySendError::Closed(Command::Record(mut entry))) => {
				sanitize_entry(&mut entry, &self.limits);
				report_fallback(&entry, &AuditError::Shutdown);
			}
			Err(_) => {}
		}
	}

	/// Wait until every entry recorded before this call has been handed to all
	/// sinks.
	pub async fn flush(&self) {
		let (done_tx, done_rx) = oneshot::channel();
		if self.tx.send(Command::Flush(done_tx)).await.is_err() {
			return;
		}
		let _ = done_rx.await;
	}

	pub async fn health_check(&self) -> Vec<SinkHealth> {
		let mut report = Vec::with_capacity(self.sinks.len());
		for sink in self.sinks.iter() {
			let result: Result<(), AuditSinkError> = sink.health_check().await;
			report.push(SinkHealth {
				name: sink.name().to_string(),
				healthy: result.is_ok(),
				error: result.err().map(|e| e.to_string()),
			});
		}
		report
	}

	pub fn sink_names(&self) -> Vec<String> {
		self.sinks.iter().map(|s| s.name().to_string()).collect()
	}
}

impl std::fmt::Debug for AuditService {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("AuditService")
			.field("sinks", &self.sink_names())
			.field("limits", &self.limits)
			.finish()
	}
}

fn report_fallback(entry: &AuditEntry, reason: &AuditError) {
	let serialized = serde_json::to_string(entry)
		.unwrap_or_else(|e| format!("{{\"serialization_error\":\"{e}\"}}"));
	tracing::error!(
		target: FALLBACK_TARGET,
		reason = %reason,
		entry = %serialized,
		"audit entry not persisted"
	);
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::event::AuditCategory;
	use crate::redaction::REDACTED;
	use async_trait::async_trait;
	use serde_json::json;
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::sync::Mutex;

	#[derive(Default)]
	struct TestSink {
		seen: Mutex<Vec<AuditEntry>>,
	}

	impl TestSink {
		fn count(&self) -> usize {
			self.seen.lock().unwrap().len()
		}
	}

	#[async_trait]
	impl AuditSink for TestSink {
		fn name(&self) -> &str {
			"test"
		}

		async fn publish(&self, entry: Arc<AuditEntry>) -> Result<(), AuditSinkError> {
			self.seen.lock().unwrap().push(entry.as_ref().clone());
			Ok(())
		}
	}

	#[derive(Default)]
	struct FailingSink {
		calls: AtomicUsize,
	}

	#[async_trait]
	impl AuditSink for FailingSink {
		fn name(&self) -> &str {
			"failing"
		}

		async fn publish(&self, _entry: Arc<AuditEntry>) -> Result<(), AuditSinkError> {
			self.calls.fetch_add(1, Ordering::SeqCst);
			Err(AuditSinkError::Transient("test error".to_string()))
		}

		async fn health_check(&self) -> Result<(), AuditSinkError> {
			Err(AuditSinkError::Permanent("down".to_string()))
		}
	}

	fn service(sinks: Vec<Arc<dyn AuditSink>>) -> AuditService {
		AuditService::new(sinks, 100, TruncationLimits::default())
	}

	#[tokio::test]
	async fn record_then_flush_reaches_sink() {
		let sink = Arc::new(TestSink::default());
		let service = service(vec![sink.clone() as Arc<dyn AuditSink>]);

		for _ in 0..5 {
			service.record(AuditEntry::builder(AuditCategory::Api, "api_request").build());
		}
		service.flush().await;
		assert_eq!(sink.count(), 5);
	}

	#[tokio::test]
	async fn entries_are_redacted_before_sinks() {
		let sink = Arc::new(TestSink::default());
		let service = service(vec![sink.clone() as Arc<dyn AuditSink>]);

		service.record(
			AuditEntry::builder(AuditCategory::User, "login")
				.request_body(json!({"email": "u@example.com", "password": "hunter2"}))
				.user_agent("x".repeat(1000))
				.build(),
		);
		service.flush().await;

		let seen = sink.seen.lock().unwrap();
		let body = seen[0].request_body.as_ref().unwrap();
		assert_eq!(body["password"], REDACTED);
		assert!(!serde_json::to_string(&seen[0]).unwrap().contains("hunter2"));
		assert!(seen[0].user_agent.as_ref().unwrap().len() < 1000);
	}

	#[tokio::test]
	async fn failing_sink_does_not_block_others() {
		let failing = Arc::new(FailingSink::default());
		let good = Arc::new(TestSink::default());
		let service = service(vec![
			failing.clone() as Arc<dyn AuditSink>,
			good.clone() as Arc<dyn AuditSink>,
		]);

		service.record(AuditEntry::builder(AuditCategory::System, "x").build());
		service.flush().await;

		assert_eq!(failing.calls.load(Ordering::SeqCst), 1);
		assert_eq!(good.count(), 1);
	}

	#[tokio::test]
	async fn record_does_not_panic_when_queue_is_full() {
		let sink = Arc::new(TestSink::default());
		let service = AuditService::new(vec![sink.clone() as Arc<dyn AuditSink>], 1, TruncationLimits::default());

		for _ in 0..50 {
			service.record(AuditEntry::builder(AuditCategory::Api, "burst").build());
		}
		service.flush().await;
		let delivered = sink.count();
		assert!(delivered >= 1 && delivered <= 50);
	}

	#[tokio::test]
	async fn health_check_reports_each_sink() {
		let service = service(vec![
			Arc::new(TestSink::default()) as Arc<dyn AuditSink>,
			Arc::new(FailingSink::default()) as Arc<dyn AuditSink>,
		]);
		let report = service.health_check().await;
		assert_eq!(report.len(), 2);
		assert!(report[0].healthy);
		assert!(!report[1].healthy);
		assert_eq!(report[1].name, "failing");
	}

	#[tokio::test]
	async fn sqlite_sink_persists_redacted_row() {
		use crate::sink::sqlite::{tests::audit_pool, SqliteAuditSink};
		use sqlx::Row;

		let pool = audit_pool().await;
		let service = service(vec![
			Arc::new(SqliteAuditSink::new(pool.clone())) as Arc<dyn AuditSink>
		]);

		service.record(
			AuditEntry::builder(AuditCategory::User, "password_changed")
				.request_body(json!({"current_password": "old", "new_password": "new"}))
				.build(),
		);
		service.flush().await;

		let body: String = sqlx::query("SELECT request_body FROM audit_logs")
			.fetch_one(&pool)
			.await
			.unwrap()
			.get("request_body");
		assert!(!body.contains("old"));
		assert!(body.contains(REDACTED));
	}
}
