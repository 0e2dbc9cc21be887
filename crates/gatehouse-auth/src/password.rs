// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Password hashing and verification.
//!
//! New hashes are always Argon2id in PHC string format with a per-call
//! random salt. Verification additionally accepts legacy unsalted SHA-256
//! hex digests left behind by the previous scheme; those verify through a
//! constant-time comparison and are logged as weak so operators know the
//! record needs rehashing. The legacy scheme is never used for new hashes.
//!
//! # Security Note
//!
//! Production parameters use Argon2id with strong defaults:
//! - Memory: 19456 KiB (~19 MiB)
//! - Iterations: 2
//! - Parallelism: 1
//!
//! Test parameters are intentionally weak and MUST NOT be used in production.

use argon2::{
	password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
	Argon2,
};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::error::{AuthError, AuthResult};

#[cfg(test)]
use argon2::{Algorithm, Params, Version};

/// Returns an Argon2 instance configured appropriately for the build context.
///
/// In production (`#[cfg(not(test))]`), returns `Argon2::default()` with
/// strong security parameters. In tests, returns an instance with minimal
/// parameters for fast test execution.
#[inline]
fn argon2_instance() -> Argon2<'static> {
	#[cfg(test)]
	{
		// Fast, insecure parameters for tests ONLY.
		let params = Params::new(
			1024, // memory_kib: 1 MiB
			1,    // iterations
			1,    // parallelism
			None, // output length = default
		)
		.expect("valid Argon2 params for tests");
		Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
	}

	#[cfg(not(test))]
	{
		Argon2::default()
	}
}

/// Hashes a password with Argon2id and a random salt.
pub fn hash_password(password: &str) -> AuthResult<String> {
	let salt = SaltString::generate(&mut OsRng);

	argon2_instance()
		.hash_password(password.as_bytes(), &salt)
		.map(|hash| hash.to_string())
		.map_err(|_| AuthError::Hash)
}

/// Verifies a candidate password against a stored hash record.
///
/// Dispatches on the record shape: PHC strings verify through Argon2,
/// 64-character hex digests verify as legacy unsalted SHA-256.
pub fn verify_password(candidate: &str, stored: &str) -> AuthResult<bool> {
	if stored.starts_with('$') {
		let parsed = PasswordHash::new(stored).map_err(|_| AuthError::MalformedHash)?;
		return Ok(argon2_instance()
			.verify_password(candidate.as_bytes(), &parsed)
			.is_ok());
	}

	if is_legacy_digest(stored) {
		warn!("verifying against a legacy unsalted digest; record should be rehashed");
		return Ok(verify_legacy_digest(candidate, stored));
	}

	Err(AuthError::MalformedHash)
}

/// A legacy record is the lowercase hex SHA-256 of the raw password.
fn is_legacy_digest(stored: &str) -> bool {
	stored.len() == 64 && stored.bytes().all(|b| b.is_ascii_hexdigit())
}

fn verify_legacy_digest(candidate: &str, stored: &str) -> bool {
	let digest = Sha256::digest(candidate.as_bytes());
	let digest_hex = hex::encode(digest);
	digest_hex
		.as_bytes()
		.ct_eq(stored.to_ascii_lowercase().as_bytes())
		.into()
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn hash_and_verify() {
		let hash = hash_password("abcd").unwrap();
		assert!(hash.starts_with("$argon2"));

		assert!(verify_password("abcd", &hash).unwrap());
		assert!(!verify_password("wxyz", &hash).unwrap());
	}

	#[test]
	fn different_hashes_for_same_password() {
		let hash1 = hash_password("hunter2").unwrap();
		let hash2 = hash_password("hunter2").unwrap();

		// Hashes should be different due to random salt
		assert_ne!(hash1, hash2);

		// But both should verify
		assert!(verify_password("hunter2", &hash1).unwrap());
		assert!(verify_password("hunter2", &hash2).unwrap());
	}

	#[test]
	fn legacy_digest_verifies() {
		// sha256("abcd")
		let legacy = "88d4266fd4e6338d13b845fcf289579d209c897823b9217da3e161936f031589";

		assert!(verify_password("abcd", legacy).unwrap());
		assert!(!verify_password("wxyz", legacy).unwrap());
	}

	#[test]
	fn legacy_digest_is_case_insensitive() {
		let legacy = "88D4266FD4E6338D13B845FCF289579D209C897823B9217DA3E161936F031589";
		assert!(verify_password("abcd", legacy).unwrap());
	}

	#[test]
	fn malformed_record_is_rejected() {
		assert!(matches!(
			verify_password("abcd", "not-a-hash"),
			Err(AuthError::MalformedHash)
		));
		assert!(matches!(
			verify_password("abcd", "$argon2id$garbage"),
			Err(AuthError::MalformedHash)
		));
	}

	proptest! {
		#![proptest_config(ProptestConfig::with_cases(8))]

		#[test]
		fn prop_verify_accepts_own_hash(password in "[ -~]{1,32}") {
			let hash = hash_password(&password).unwrap();
			prop_assert!(verify_password(&password, &hash).unwrap());
		}

		#[test]
		fn prop_verify_rejects_other_password(
			password in "[ -~]{1,32}",
			other in "[ -~]{1,32}",
		) {
			prop_assume!(password != other);
			let hash = hash_password(&password).unwrap();
			prop_assert!(!verify_password(&other, &hash).unwrap());
		}
	}
}
