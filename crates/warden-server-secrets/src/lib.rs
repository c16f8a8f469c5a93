// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Encryption at rest for third-party credentials.
//!
//! [`SecretCipher`] derives an AES-256-GCM key from the master secret once
//! per process. [`SettingsService`] sits on top of the `settings` table and
//! forces encryption for every key [`is_sensitive_setting`] recognises.
//! Token signing does not use this crate.

pub mod cache;
pub mod cipher;
pub mod error;
pub mod service;

pub use cache::SettingsCache;
pub use cipher::{KdfParams, SecretCipher, KEY_SIZE, NONCE_SIZE};
pub use error::{SecretsError, SecretsResult};
pub use service::{is_sensitive_setting, SettingMetadata, SettingsService, SENSITIVE_SETTING_KEYS};
