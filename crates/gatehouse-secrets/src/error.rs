// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

pub type SecretsResult<T> = Result<T, SecretsError>;

#[derive(Error, Debug)]
pub enum SecretsError {
	#[error("encryption failed: {0}")]
	Encryption(String),

	/// The envelope failed authentication or was structurally invalid.
	/// Decryption fails closed; no partial plaintext is ever returned.
	#[error("envelope integrity check failed")]
	Integrity,

	#[error("malformed envelope: {0}")]
	MalformedEnvelope(&'static str),

	#[error("secret payload serialization failed: {0}")]
	Serialization(#[from] serde_json::Error),
}
