// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Signed bearer tokens.
//!
//! Wire format: `base64url(claims_json) "." base64url(hmac_sha256(key, first_part))`,
//! both parts unpadded. Claims carry the subject id, its [`PrincipalKind`],
//! issue and expiry times (unix seconds) and a random token id. No roles or
//! permissions are ever embedded.

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, TimeZone, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{instrument, trace};
use uuid::Uuid;
use warden_common_secret::SecretString;

use crate::clock::Clock;
use crate::error::AuthError;
use crate::types::PrincipalKind;

type HmacSha256 = Hmac<Sha256>;

/// Tokens longer than this are rejected before any decoding work.
pub const MAX_TOKEN_LEN: usize = 2048;

const TOKEN_ID_BYTES: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct TokenClaims {
	sub: Uuid,
	knd: PrincipalKind,
	iat: i64,
	exp: i64,
	jti: String,
}

/// A freshly signed token. The string itself is wrapped so it cannot be logged.
#[derive(Debug, Clone)]
pub struct IssuedToken {
	pub token: SecretString,
	pub issued_at: DateTime<Utc>,
	pub expires_at: DateTime<Utc>,
}

impl IssuedToken {
	/// Seconds until expiry, for cookie `Max-Age`.
	pub fn max_age_secs(&self) -> i64 {
		(self.expires_at - self.issued_at).num_seconds().max(0)
	}
}

/// Result of a successful verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
	pub principal_id: Uuid,
	pub principal_kind: PrincipalKind,
	pub issued_at: DateTime<Utc>,
	pub expires_at: DateTime<Utc>,
}

pub struct TokenSigner {
	key: SecretString,
	clock: Arc<dyn Clock>,
	skew: Duration,
}

impl TokenSigner {
	/// `skew` is the tolerance applied to both expiry and issue time.
	pub fn new(key: SecretString, clock: Arc<dyn Clock>, skew: Duration) -> Self {
		Self { key, clock, skew }
	}

	fn mac(&self) -> Result<HmacSha256, AuthError> {
		HmacSha256::new_from_slice(self.key.expose().as_bytes())
			.map_err(|e| AuthError::Signing(e.to_string()))
	}

	#[instrument(level = "debug", skip(self), fields(principal_id = %principal_id, kind = %kind))]
	pub fn issue(
		&self,
		principal_id: Uuid,
		kind: PrincipalKind,
		lifetime: Duration,
	) -> Result<IssuedToken, AuthError> {
		if lifetime <= Duration::zero() {
			return Err(AuthError::Signing("token lifetime must be positive".to_string()));
		}

		let now = self.clock.now();
		let expires_at = now
			.checked_add_signed(lifetime)
			.ok_or_else(|| AuthError::Signing("token lifetime out of range".to_string()))?;
		let claims = TokenClaims {
			sub: principal_id,
			knd: kind,
			iat: now.timestamp(),
			exp: expires_at.timestamp(),
			jti: URL_SAFE_NO_PAD.encode(rand::random::<[u8; TOKEN_ID_BYTES]>()),
		};

		let json = serde_json::to_vec(&claims).map_err(|e| AuthError::Signing(e.to_string()))?;
		let payload = URL_SAFE_NO_PAD.encode(json);

		let mut mac = self.mac()?;
		mac.update(payload.as_bytes());
		let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

		Ok(IssuedToken {
			token: SecretString::new(format!("{payload}.{signature}")),
			issued_at: timestamp(claims.iat).unwrap_or(now),
			expires_at: timestamp(claims.exp).unwrap_or(expires_at),
		})
	}

	/// Verify signature and lifetime. Every failure is `None`; the reason is
	/// only visible at trace level.
	#[instrument(level = "trace", skip_all)]
	pub fn verify(&self, token: &str) -> Option<VerifiedToken> {
		if token.is_empty() || token.len() > MAX_TOKEN_LEN {
			trace!("token rejected: length");
			return None;
		}

		let (payload, signature) = token.split_once('.')?;
		if signature.contains('.') {
			trace!("token rejected: shape");
			return None;
		}

		let signature = URL_SAFE_NO_PAD.decode(signature).ok()?;
		let mut mac = self.mac().ok()?;
		mac.update(payload.as_bytes());
		if mac.verify_slice(&signature).is_err() {
			trace!("token rejected: signature");
			return None;
		}

		let json = URL_SAFE_NO_PAD.decode(payload).ok()?;
		let claims: TokenClaims = serde_json::from_slice(&json).ok()?;

		let issued_at = timestamp(claims.iat)?;
		let expires_at = timestamp(claims.exp)?;
		if expires_at <= issued_at {
			trace!("token rejected: inverted lifetime");
			return None;
		}

		let now = self.clock.now();
		if now > expires_at.checked_add_signed(self.skew)? {
			trace!("token rejected: expired");
			return None;
		}
		if issued_at > now.checked_add_signed(self.skew)? {
			trace!("token rejected: issued in the future");
			return None;
		}

		Some(VerifiedToken {
			principal_id: claims.sub,
			principal_kind: claims.knd,
			issued_at,
			expires_at,
		})
	}
}

impl std::fmt::Debug for TokenSigner {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("TokenSigner")
			.field("key", &self.key)
			.field("skew", &self.skew)
			.finish()
	}
}

fn timestamp(secs: i64) -> Option<DateTime<Utc>> {
	Utc.timestamp_opt(secs, 0).single()
}
