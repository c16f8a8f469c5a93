// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Argon2 configuration for password hashing.
//!
//! Production parameters target a few hundred milliseconds per hash on
//! commodity hardware:
//! - Algorithm: Argon2id, version 0x13
//! - Memory: 65536 KiB (64 MiB)
//! - Iterations: 3
//! - Parallelism: 1
//!
//! Test builds use a tiny parameter set. Verification reads the parameters
//! embedded in the PHC string, so hashes made under either set verify.

use argon2::{Algorithm, Argon2, Params, Version};

pub(crate) const PRODUCTION_MEMORY_KIB: u32 = 64 * 1024;
pub(crate) const PRODUCTION_ITERATIONS: u32 = 3;

#[inline]
pub(crate) fn argon2_instance() -> Argon2<'static> {
	#[cfg(test)]
	let params = Params::new(1024, 1, 1, None);

	#[cfg(not(test))]
	let params = Params::new(PRODUCTION_MEMORY_KIB, PRODUCTION_ITERATIONS, 1, None);

	match params {
		Ok(params) => Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
		// Constant inputs above are valid; fall back to the crate defaults
		// (still Argon2id) rather than panic.
		Err(_) => Argon2::default(),
	}
}
