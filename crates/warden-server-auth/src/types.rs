// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Principal types.
//!
//! - **ID newtypes**: [`UserId`], [`OperatorId`], [`ImpersonationSessionId`]
//!   wrap UUIDs so an operator id can never be passed where a user id is expected.
//! - **Principals**: [`User`] and [`Operator`] records, unified by [`Principal`].
//! - **Roles**: the fixed three-level [`OperatorRole`] enumeration.
//!
//! A bearer token only names a [`PrincipalKind`] and an id; roles and existence
//! are always re-read from the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// =============================================================================
// ID Newtypes
// =============================================================================

macro_rules! define_id_type {
	($name:ident, $doc:expr) => {
		#[doc = $doc]
		#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
		#[serde(transparent)]
		pub struct $name(Uuid);

		impl $name {
			pub fn new(id: Uuid) -> Self {
				Self(id)
			}

			pub fn generate() -> Self {
				Self(Uuid::new_v4())
			}

			pub fn into_inner(self) -> Uuid {
				self.0
			}

			pub fn as_uuid(&self) -> &Uuid {
				&self.0
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				write!(f, "{}", self.0)
			}
		}

		impl FromStr for $name {
			type Err = uuid::Error;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Uuid::parse_str(s).map(Self)
			}
		}

		impl From<Uuid> for $name {
			fn from(id: Uuid) -> Self {
				Self(id)
			}
		}

		impl From<$name> for Uuid {
			fn from(id: $name) -> Self {
				id.0
			}
		}
	};
}

define_id_type!(UserId, "Unique identifier for an end user.");
define_id_type!(OperatorId, "Unique identifier for an operator (staff) account.");
define_id_type!(
	ImpersonationSessionId,
	"Unique identifier for an impersonation session."
);

// =============================================================================
// Principal kind
// =============================================================================

/// Which table a token subject lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalKind {
	User,
	Operator,
}

impl PrincipalKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			PrincipalKind::User => "user",
			PrincipalKind::Operator => "operator",
		}
	}
}

impl fmt::Display for PrincipalKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

// =============================================================================
// Operator roles
// =============================================================================

/// Operator roles, highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorRole {
	/// May impersonate users and change sensitive settings.
	Elevated,
	/// Day-to-day administration, read access to the audit log.
	Standard,
	/// Read-only views.
	Limited,
}

impl OperatorRole {
	pub fn all() -> &'static [OperatorRole] {
		&[
			OperatorRole::Elevated,
			OperatorRole::Standard,
			OperatorRole::Limited,
		]
	}

	fn rank(&self) -> u8 {
		match self {
			OperatorRole::Elevated => 3,
			OperatorRole::Standard => 2,
			OperatorRole::Limited => 1,
		}
	}

	/// True if this role grants at least the permissions of `other`.
	pub fn has_permission_of(&self, other: &OperatorRole) -> bool {
		self.rank() >= other.rank()
	}

	pub fn can_impersonate(&self) -> bool {
		matches!(self, OperatorRole::Elevated)
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			OperatorRole::Elevated => "elevated",
			OperatorRole::Standard => "standard",
			OperatorRole::Limited => "limited",
		}
	}
}

impl fmt::Display for OperatorRole {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for OperatorRole {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"elevated" => Ok(OperatorRole::Elevated),
			"standard" => Ok(OperatorRole::Standard),
			"limited" => Ok(OperatorRole::Limited),
			other => Err(format!("unknown operator role: {other}")),
		}
	}
}

// =============================================================================
// Principal records
// =============================================================================

/// End user. Profile data beyond email and display name belongs to the CRUD layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
	pub id: UserId,
	pub email: String,
	pub display_name: String,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
	/// Soft delete marker. A deleted user never resolves as a principal.
	pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
	pub fn is_deleted(&self) -> bool {
		self.deleted_at.is_some()
	}
}

/// Staff account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operator {
	pub id: OperatorId,
	pub email: String,
	pub display_name: String,
	pub role: OperatorRole,
	pub is_active: bool,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

/// The identity attached to a request after live resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Principal {
	User(User),
	Operator(Operator),
}

impl Principal {
	pub fn kind(&self) -> PrincipalKind {
		match self {
			Principal::User(_) => PrincipalKind::User,
			Principal::Operator(_) => PrincipalKind::Operator,
		}
	}

	pub fn id(&self) -> Uuid {
		match self {
			Principal::User(u) => u.id.into_inner(),
			Principal::Operator(o) => o.id.into_inner(),
		}
	}

	pub fn email(&self) -> &str {
		match self {
			Principal::User(u) => &u.email,
			Principal::Operator(o) => &o.email,
		}
	}

	pub fn as_user(&self) -> Option<&User> {
		match self {
			Principal::User(u) => Some(u),
			Principal::Operator(_) => None,
		}
	}

	pub fn as_operator(&self) -> Option<&Operator> {
		match self {
			Principal::Operator(o) => Some(o),
			Principal::User(_) => None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	mod ids {
		use super::*;

		#[test]
		fn parse_and_display_roundtrip() {
			let id = OperatorId::generate();
			let parsed: OperatorId = id.to_string().parse().unwrap();
			assert_eq!(id, parsed);
		}

		#[test]
		fn serializes_as_bare_uuid() {
			let uuid = Uuid::new_v4();
			let json = serde_json::to_string(&UserId::new(uuid)).unwrap();
			assert_eq!(json, format!("\"{uuid}\""));
		}

		#[test]
		fn rejects_garbage() {
			assert!("not-a-uuid".parse::<UserId>().is_err());
		}

		proptest! {
			#[test]
			fn user_id_roundtrip_any_uuid(bytes in any::<[u8; 16]>()) {
				let uuid = Uuid::from_bytes(bytes);
				let id = UserId::new(uuid);
				prop_assert_eq!(id.into_inner(), uuid);
				prop_assert_eq!(id.to_string(), uuid.to_string());
			}
		}
	}

	mod roles {
		use super::*;

		#[test]
		fn only_elevated_can_impersonate() {
			assert!(OperatorRole::Elevated.can_impersonate());
			assert!(!OperatorRole::Standard.can_impersonate());
			assert!(!OperatorRole::Limited.can_impersonate());
		}

		#[test]
		fn permission_hierarchy() {
			assert!(OperatorRole::Elevated.has_permission_of(&OperatorRole::Standard));
			assert!(OperatorRole::Standard.has_permission_of(&OperatorRole::Standard));
			assert!(!OperatorRole::Limited.has_permission_of(&OperatorRole::Standard));
		}

		#[test]
		fn string_forms_roundtrip() {
			for role in OperatorRole::all() {
				assert_eq!(role.as_str().parse::<OperatorRole>().unwrap(), *role);
				let json = serde_json::to_string(role).unwrap();
				assert_eq!(json, format!("\"{}\"", role.as_str()));
			}
			assert!("admin".parse::<OperatorRole>().is_err());
		}
	}

	mod principal {
		use super::*;

		#[test]
		fn kind_and_id_follow_variant() {
			let now = Utc::now();
			let user = User {
				id: UserId::generate(),
				email: "u@example.com".to_string(),
				display_name: "U".to_string(),
				created_at: now,
				updated_at: now,
				deleted_at: None,
			};
			let principal = Principal::User(user.clone());
			assert_eq!(principal.kind(), PrincipalKind::User);
			assert_eq!(principal.id(), user.id.into_inner());
			assert!(principal.as_operator().is_none());
			assert_eq!(principal.email(), "u@example.com");
		}
	}
}
