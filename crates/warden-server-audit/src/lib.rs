// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

pub mod error;
pub mod event;
pub mod pipeline;
pub mod redaction;
pub mod sink;

pub use error::{AuditError, AuditResult, AuditSinkError};
pub use event::{actions, AuditCategory, AuditEntry, AuditEntryBuilder};
pub use pipeline::{AuditService, SinkHealth, FALLBACK_TARGET};
pub use redaction::{redact_entry, redact_json_value, TruncationLimits, REDACTED};
pub use sink::AuditSink;

pub use warden_server_config::AuditConfig;

#[cfg(feature = "sink-sqlite")]
pub use sink::sqlite::SqliteAuditSink;

#[cfg(feature = "sink-tracing")]
pub use sink::tracing::TracingAuditSink;
