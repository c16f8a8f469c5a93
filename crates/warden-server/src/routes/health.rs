// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Health HTTP handler.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::api::AppState;

#[derive(Debug, Serialize)]
pub struct ComponentHealth {
	pub name: String,
	pub healthy: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
	pub status: &'static str,
	pub timestamp: String,
	pub duration_ms: u64,
	pub version: &'static str,
	pub database: ComponentHealth,
	pub audit_sinks: Vec<ComponentHealth>,
}

/// GET /health - database and audit sink health. 503 when anything is down.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
	let started = tokio::time::Instant::now();

	let (database, sinks) = tokio::join!(
		sqlx::query("SELECT 1").execute(&state.pool),
		state.audit_service.health_check()
	);

	let database = match database {
		Ok(_) => ComponentHealth {
			name: "sqlite".to_string(),
			healthy: true,
			error: None,
		},
		Err(e) => {
			tracing::error!(error = %e, "health check: database unreachable");
			ComponentHealth {
				name: "sqlite".to_string(),
				healthy: false,
				error: Some("database unreachable".to_string()),
			}
		}
	};

	let audit_sinks: Vec<ComponentHealth> = sinks
		.into_iter()
		.map(|s| {
			if let Some(error) = &s.error {
				tracing::warn!(sink = %s.name, error = %error, "health check: audit sink unhealthy");
			}
			ComponentHealth {
				name: s.name,
				healthy: s.healthy,
				error: s.error,
			}
		})
		.collect();

	let healthy = database.healthy && audit_sinks.iter().all(|s| s.healthy);
	let response = HealthResponse {
		status: if healthy { "healthy" } else { "unhealthy" },
		timestamp: chrono::Utc::now().to_rfc3339(),
		duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
		version: env!("CARGO_PKG_VERSION"),
		database,
		audit_sinks,
	};

	let status = if healthy {
		StatusCode::OK
	} else {
		StatusCode::SERVICE_UNAVAILABLE
	};
	(status, Json(response))
}
