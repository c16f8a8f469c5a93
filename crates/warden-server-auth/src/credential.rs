// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The credential service: token signer, per-purpose lifetimes and the
//! bounded password hasher behind one handle.

use std::sync::Arc;

use chrono::Duration;
use tracing::instrument;
use uuid::Uuid;
use warden_common_secret::SecretString;

use crate::clock::{Clock, SystemClock};
use crate::error::AuthError;
use crate::password::PasswordHasher;
use crate::token::{IssuedToken, TokenSigner, VerifiedToken};
use crate::types::PrincipalKind;

/// What a token is for. Selects the lifetime and the subject kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPurpose {
	UserSession,
	OperatorSession,
	/// A user token handed to an operator acting as that user.
	Impersonation,
}

impl TokenPurpose {
	pub fn principal_kind(&self) -> PrincipalKind {
		match self {
			TokenPurpose::UserSession | TokenPurpose::Impersonation => PrincipalKind::User,
			TokenPurpose::OperatorSession => PrincipalKind::Operator,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenLifetimes {
	pub user: Duration,
	pub operator: Duration,
	pub impersonation: Duration,
}

impl Default for TokenLifetimes {
	fn default() -> Self {
		Self {
			user: Duration::days(30),
			operator: Duration::hours(8),
			impersonation: Duration::hours(2),
		}
	}
}

impl TokenLifetimes {
	pub fn for_purpose(&self, purpose: TokenPurpose) -> Duration {
		match purpose {
			TokenPurpose::UserSession => self.user,
			TokenPurpose::OperatorSession => self.operator,
			TokenPurpose::Impersonation => self.impersonation,
		}
	}
}

#[derive(Debug, Clone)]
pub struct CredentialService {
	signer: Arc<TokenSigner>,
	lifetimes: TokenLifetimes,
	hasher: PasswordHasher,
}

pub struct CredentialServiceBuilder {
	signing_key: SecretString,
	clock: Arc<dyn Clock>,
	clock_skew: Duration,
	lifetimes: TokenLifetimes,
	hash_concurrency: usize,
}

impl CredentialServiceBuilder {
	pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;
		self
	}

	pub fn clock_skew(mut self, skew: Duration) -> Self {
		self.clock_skew = skew;
		self
	}

	pub fn lifetimes(mut self, lifetimes: TokenLifetimes) -> Self {
		self.lifetimes = lifetimes;
		self
	}

	pub fn hash_concurrency(mut self, permits: usize) -> Self {
		self.hash_concurrency = permits;
		self
	}

	pub fn build(self) -> CredentialService {
		CredentialService {
			signer: Arc::new(TokenSigner::new(
				self.signing_key,
				self.clock,
				self.clock_skew,
			)),
			lifetimes: self.lifetimes,
			hasher: PasswordHasher::new(self.hash_concurrency),
		}
	}
}

impl CredentialService {
	/// Defaults: system clock, 5 s skew, 30 d / 8 h / 2 h lifetimes, 4 hash permits.
	pub fn builder(signing_key: SecretString) -> CredentialServiceBuilder {
		CredentialServiceBuilder {
			signing_key,
			clock: Arc::new(SystemClock),
			clock_skew: Duration::seconds(5),
			lifetimes: TokenLifetimes::default(),
			hash_concurrency: 4,
		}
	}

	pub fn lifetimes(&self) -> &TokenLifetimes {
		&self.lifetimes
	}

	/// Sign a token for `principal_id` with the lifetime and kind of `purpose`.
	#[instrument(level = "debug", skip(self), fields(principal_id = %principal_id))]
	pub fn issue_token(
		&self,
		principal_id: Uuid,
		purpose: TokenPurpose,
	) -> Result<IssuedToken, AuthError> {
		self.signer.issue(
			principal_id,
			purpose.principal_kind(),
			self.lifetimes.for_purpose(purpose),
		)
	}

	pub fn verify_token(&self, token: &str) -> Option<VerifiedToken> {
		self.signer.verify(token)
	}

	pub async fn hash_password(&self, plaintext: SecretString) -> Result<String, AuthError> {
		self.hasher.hash(plaintext).await
	}

	pub async fn verify_password(&self, plaintext: SecretString, hash: String) -> bool {
		self.hasher.verify(plaintext, hash).await
	}
}
