// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! AES-256-GCM envelopes for JSON secret payloads.
//!
//! An envelope is serialized as three colon-joined base64 fields:
//! `nonce:ciphertext:tag`. Every encryption call draws a fresh 96-bit
//! nonce from the OS RNG; nonces are never cached or derived, so reuse
//! under one key cannot happen structurally.

use aes_gcm::{
	aead::{Aead, KeyInit, OsRng},
	Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::error::{SecretsError, SecretsResult};

/// Size of the cipher key in bytes (256 bits for AES-256).
pub const KEY_SIZE: usize = 32;

/// Size of the AES-GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;

/// Size of the AES-GCM authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// Generate a random nonce.
///
/// Uses 96-bit random nonces from OsRng. For expected volumes of settings
/// encryptions this is cryptographically safe, but the same (key, nonce)
/// pair must never be reused. AES-GCM has a 2^-32 collision probability
/// after approximately 2^32 encryptions with the same key - well beyond
/// expected usage patterns.
fn generate_nonce() -> [u8; NONCE_SIZE] {
	let mut nonce = [0u8; NONCE_SIZE];
	OsRng.fill_bytes(&mut nonce);
	nonce
}

/// Symmetric cipher for JSON secret payloads.
///
/// The key is held in a [`Zeroizing`] buffer and wiped on drop.
pub struct SecretCipher {
	key: Zeroizing<[u8; KEY_SIZE]>,
}

impl SecretCipher {
	/// Create a cipher from raw key material.
	pub fn from_key(key: [u8; KEY_SIZE]) -> Self {
		Self {
			key: Zeroizing::new(key),
		}
	}

	/// Derive the cipher key from an operator-supplied passphrase.
	///
	/// The passphrase is digested with SHA-256 to a full-length key; it is
	/// never used as key material directly.
	pub fn from_passphrase(passphrase: &str) -> Self {
		let digest = Sha256::digest(passphrase.as_bytes());
		let mut key = Zeroizing::new([0u8; KEY_SIZE]);
		key.copy_from_slice(&digest);
		Self { key }
	}

	/// Encrypt a JSON value into an envelope string.
	///
	/// A fresh nonce is generated on every call, so encrypting the same
	/// value twice yields different envelopes.
	pub fn encrypt(&self, value: &serde_json::Value) -> SecretsResult<String> {
		let plaintext = serde_json::to_vec(value)?;

		let key = Key::<Aes256Gcm>::from_slice(self.key.as_ref());
		let cipher = Aes256Gcm::new(key);

		let nonce_bytes = generate_nonce();
		let nonce = Nonce::from_slice(&nonce_bytes);

		let mut ciphertext = cipher
			.encrypt(nonce, plaintext.as_slice())
			.map_err(|e| SecretsError::Encryption(format!("secret encryption failed: {e}")))?;

		// aes-gcm appends the tag to the ciphertext; the envelope carries
		// it as a separate field.
		let tag = ciphertext.split_off(ciphertext.len() - TAG_SIZE);

		Ok(format!(
			"{}:{}:{}",
			BASE64.encode(nonce_bytes),
			BASE64.encode(&ciphertext),
			BASE64.encode(&tag),
		))
	}

	/// Decrypt an envelope string back into a JSON value.
	///
	/// Fails closed: a wrong field count, corrupt base64, bad component
	/// length, or tag mismatch all reject without returning any plaintext.
	pub fn decrypt(&self, envelope: &str) -> SecretsResult<serde_json::Value> {
		let (nonce_bytes, mut ciphertext) = decode_envelope(envelope)?;

		let key = Key::<Aes256Gcm>::from_slice(self.key.as_ref());
		let cipher = Aes256Gcm::new(key);
		let nonce = Nonce::from_slice(&nonce_bytes);

		let plaintext = Zeroizing::new(
			cipher
				.decrypt(nonce, ciphertext.as_slice())
				.map_err(|_| {
					tracing::warn!("envelope failed authentication");
					SecretsError::Integrity
				})?,
		);
		ciphertext.clear();

		Ok(serde_json::from_slice(&plaintext)?)
	}
}

impl std::fmt::Debug for SecretCipher {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SecretCipher").finish_non_exhaustive()
	}
}

/// Parse `nonce:ciphertext:tag` into nonce bytes and ciphertext-with-tag.
fn decode_envelope(envelope: &str) -> SecretsResult<([u8; NONCE_SIZE], Vec<u8>)> {
	let mut parts = envelope.split(':');
	let (nonce_b64, ct_b64, tag_b64) = match (parts.next(), parts.next(), parts.next(), parts.next())
	{
		(Some(nonce), Some(ct), Some(tag), None) => (nonce, ct, tag),
		_ => return Err(SecretsError::MalformedEnvelope("expected three fields")),
	};

	let nonce_vec = BASE64
		.decode(nonce_b64)
		.map_err(|_| SecretsError::MalformedEnvelope("nonce is not valid base64"))?;
	let nonce: [u8; NONCE_SIZE] = nonce_vec
		.try_into()
		.map_err(|_| SecretsError::MalformedEnvelope("nonce has wrong length"))?;

	let mut ciphertext = BASE64
		.decode(ct_b64)
		.map_err(|_| SecretsError::MalformedEnvelope("ciphertext is not valid base64"))?;

	let tag = BASE64
		.decode(tag_b64)
		.map_err(|_| SecretsError::MalformedEnvelope("tag is not valid base64"))?;
	if tag.len() != TAG_SIZE {
		return Err(SecretsError::MalformedEnvelope("tag has wrong length"));
	}

	ciphertext.extend_from_slice(&tag);
	Ok((nonce, ciphertext))
}
