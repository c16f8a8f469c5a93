// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Credential primitives for Warden.
//!
//! - [`types`]: principals, ids, operator roles
//! - [`password`]: Argon2id hashing and the bounded [`PasswordHasher`]
//! - [`token`]: HMAC-SHA256 signed bearer tokens
//! - [`credential`]: [`CredentialService`], the handle the server passes around
//! - [`middleware`]: bearer header and cookie extraction
//!
//! Token verification answers only "who, and what kind". Whether that
//! principal still exists, is active, or holds a role is decided by a live
//! store lookup in the session resolver.

mod argon2_config;
pub mod clock;
pub mod credential;
pub mod error;
pub mod middleware;
pub mod password;
pub mod token;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use credential::{CredentialService, CredentialServiceBuilder, TokenLifetimes, TokenPurpose};
pub use error::AuthError;
pub use middleware::{extract_bearer_token, extract_cookie, extract_credential};
pub use password::{hash_password, verify_password, PasswordHasher};
pub use token::{IssuedToken, TokenSigner, VerifiedToken};
pub use types::{
	ImpersonationSessionId, Operator, OperatorId, OperatorRole, Principal, PrincipalKind, User,
	UserId,
};
