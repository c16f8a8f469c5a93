// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Short-lived cache of decrypted settings.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use warden_common_secret::SecretString;

#[derive(Clone)]
struct CachedValue {
	value: Option<SecretString>,
	cached_at: Instant,
}

#[derive(Default)]
struct Inner {
	entries: HashMap<String, CachedValue>,
	/// Bumped on every invalidation so a read that raced a write can tell
	/// its value is stale.
	generations: HashMap<String, u64>,
}

/// Caches both present and absent values so a missing setting does not hit
/// the database on every read.
///
/// Readers take a [`generation`](Self::generation) before going to the
/// store and hand it back to [`insert`](Self::insert). An invalidation in
/// between makes the insert a no-op.
pub struct SettingsCache {
	inner: RwLock<Inner>,
	ttl: Duration,
}

impl SettingsCache {
	/// A zero `ttl` disables caching.
	pub fn new(ttl: Duration) -> Self {
		Self {
			inner: RwLock::new(Inner::default()),
			ttl,
		}
	}

	pub fn is_enabled(&self) -> bool {
		!self.ttl.is_zero()
	}

	/// Outer `None` is a miss; inner `None` is a cached absence.
	pub async fn get(&self, key: &str) -> Option<Option<SecretString>> {
		if !self.is_enabled() {
			return None;
		}
		let inner = self.inner.read().await;
		inner
			.entries
			.get(key)
			.filter(|cached| cached.cached_at.elapsed() < self.ttl)
			.map(|cached| cached.value.clone())
	}

	pub async fn generation(&self, key: &str) -> u64 {
		self.inner
			.read()
			.await
			.generations
			.get(key)
			.copied()
			.unwrap_or(0)
	}

	/// Store `value` unless `key` was invalidated since `generation` was read.
	/// Returns whether the value was cached.
	pub async fn insert(&self, key: &str, value: Option<SecretString>, generation: u64) -> bool {
		if !self.is_enabled() {
			return false;
		}
		let mut inner = self.inner.write().await;
		if inner.generations.get(key).copied().unwrap_or(0) != generation {
			return false;
		}
		inner.entries.insert(
			key.to_string(),
			CachedValue {
				value,
				cached_at: Instant::now(),
			},
		);
		true
	}

	pub async fn invalidate(&self, key: &str) {
		let mut inner = self.inner.write().await;
		inner.entries.remove(key);
		let generation = inner.generations.entry(key.to_string()).or_insert(0);
		*generation = generation.wrapping_add(1);
	}

	pub async fn len(&self) -> usize {
		self.inner.read().await.entries.len()
	}
}

impl std::fmt::Debug for SettingsCache {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SettingsCache")
			.field("ttl", &self.ttl)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn secret(v: &str) -> Option<SecretString> {
		Some(SecretString::new(v.to_string()))
	}

	#[tokio::test]
	async fn hit_and_cached_absence() {
		let cache = SettingsCache::new(Duration::from_secs(60));
		assert!(cache.insert("smtp_password", secret("hunter2"), 0).await);
		assert!(cache.insert("missing", None, 0).await);

		assert_eq!(
			cache.get("smtp_password").await.unwrap().unwrap().expose(),
			"hunter2"
		);
		assert_eq!(cache.get("missing").await, Some(None));
		assert_eq!(cache.get("never_seen").await, None);
	}

	#[tokio::test]
	async fn stale_entries_are_ignored() {
		let cache = SettingsCache::new(Duration::from_millis(20));
		cache.insert("k", secret("v"), 0).await;
		tokio::time::sleep(Duration::from_millis(40)).await;
		assert!(cache.get("k").await.is_none());
	}

	#[tokio::test]
	async fn zero_ttl_disables_caching() {
		let cache = SettingsCache::new(Duration::ZERO);
		assert!(!cache.is_enabled());
		assert!(!cache.insert("k", secret("v"), 0).await);
		assert!(cache.get("k").await.is_none());
		assert_eq!(cache.len().await, 0);
	}

	#[tokio::test]
	async fn invalidate_removes_only_that_key() {
		let cache = SettingsCache::new(Duration::from_secs(60));
		cache.insert("a", None, 0).await;
		cache.insert("b", None, 0).await;
		cache.invalidate("a").await;
		assert!(cache.get("a").await.is_none());
		assert_eq!(cache.get("b").await, Some(None));
		assert_eq!(cache.len().await, 1);
	}

	#[tokio::test]
	async fn insert_after_invalidation_is_dropped() {
		let cache = SettingsCache::new(Duration::from_secs(60));
		let before = cache.generation("k").await;
		cache.invalidate("k").await;

		assert!(!cache.insert("k", secret("old"), before).await);
		assert!(cache.get("k").await.is_none());

		let current = cache.generation("k").await;
		assert_ne!(current, before);
		assert!(cache.insert("k", secret("new"), current).await);
		assert_eq!(cache.get("k").await.unwrap().unwrap().expose(), "new");
	}
}
