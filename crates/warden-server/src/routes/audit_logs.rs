// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use axum::{
	extract::{Query, State},
	Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use warden_server_audit::{AuditCategory, AuditEntry};
use warden_server_auth::{OperatorId, OperatorRole, UserId};
use warden_server_db::{AuditLogFilter, DEFAULT_AUDIT_PAGE_SIZE, MAX_AUDIT_PAGE_SIZE};

use crate::{
	api::AppState,
	auth_middleware::{require_role, RequireOperator},
	error::ServerError,
};

#[derive(Debug, Default, Deserialize)]
pub struct AuditLogQuery {
	pub category: Option<String>,
	pub action: Option<String>,
	pub operator_id: Option<String>,
	pub user_id: Option<String>,
	pub from: Option<DateTime<Utc>>,
	pub to: Option<DateTime<Utc>>,
	pub limit: Option<i64>,
	pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct AuditLogResponse {
	pub entries: Vec<AuditEntry>,
	pub total: i64,
	pub limit: i64,
	pub offset: i64,
}

fn parse_id(field: &str, value: Option<&str>) -> Result<Option<Uuid>, ServerError> {
	value
		.map(|v| {
			Uuid::parse_str(v.trim()).map_err(|_| ServerError::BadRequest(format!("invalid {field}")))
		})
		.transpose()
}

impl AuditLogQuery {
	fn into_filter(self) -> Result<AuditLogFilter, ServerError> {
		let category = self
			.category
			.as_deref()
			.map(|c| c.parse::<AuditCategory>().map_err(ServerError::BadRequest))
			.transpose()?;
		let operator_id = parse_id("operator_id", self.operator_id.as_deref())?.map(OperatorId::new);
		let user_id = parse_id("user_id", self.user_id.as_deref())?.map(UserId::new);

		Ok(AuditLogFilter {
			category,
			action: self.action.filter(|a| !a.is_empty()),
			operator_id,
			user_id,
			from: self.from,
			to: self.to,
			limit: Some(
				self.limit
					.unwrap_or(DEFAULT_AUDIT_PAGE_SIZE)
					.clamp(1, MAX_AUDIT_PAGE_SIZE),
			),
			offset: Some(self.offset.unwrap_or(0).max(0)),
		})
	}
}

/// GET /api/admin/audit-logs - standard operators and above.
#[tracing::instrument(skip(state, operator, query), fields(operator_id = %operator.id))]
pub async fn list_audit_logs(
	State(state): State<AppState>,
	RequireOperator(operator): RequireOperator,
	Query(query): Query<AuditLogQuery>,
) -> Result<Json<AuditLogResponse>, ServerError> {
	require_role(&operator, OperatorRole::Standard)?;

	let filter = query.into_filter()?;
	let limit = filter.limit.unwrap_or(DEFAULT_AUDIT_PAGE_SIZE);
	let offset = filter.offset.unwrap_or(0);
	let (entries, total) = state.audit_repo.list_entries(&filter).await?;

	Ok(Json(AuditLogResponse {
		entries,
		total,
		limit,
		offset,
	}))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn filter_clamps_paging() {
		let filter = AuditLogQuery {
			limit: Some(10_000),
			offset: Some(-5),
			..Default::default()
		}
		.into_filter()
		.unwrap();
		assert_eq!(filter.limit, Some(MAX_AUDIT_PAGE_SIZE));
		assert_eq!(filter.offset, Some(0));

		let filter = AuditLogQuery::default().into_filter().unwrap();
		assert_eq!(filter.limit, Some(DEFAULT_AUDIT_PAGE_SIZE));
	}

	#[test]
	fn unknown_category_is_bad_request() {
		let err = AuditLogQuery {
			category: Some("billing".to_string()),
			..Default::default()
		}
		.into_filter()
		.unwrap_err();
		assert!(matches!(err, ServerError::BadRequest(_)));

		let filter = AuditLogQuery {
			category: Some("operator".to_string()),
			..Default::default()
		}
		.into_filter()
		.unwrap();
		assert_eq!(filter.category, Some(AuditCategory::Operator));
	}

	#[test]
	fn malformed_ids_are_rejected() {
		let err = AuditLogQuery {
			user_id: Some("not-a-uuid".to_string()),
			..Default::default()
		}
		.into_filter()
		.unwrap_err();
		assert!(matches!(err, ServerError::BadRequest(_)));
	}
}
