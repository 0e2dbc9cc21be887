// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for authentication operations.

use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Error, Debug)]
pub enum AuthError {
	/// The credential was well-formed but its lifetime has elapsed.
	#[error("credential is expired")]
	Expired,

	/// The credential is unknown, malformed, or of the wrong kind.
	#[error("credential is invalid")]
	Invalid,

	/// Password hashing failed. The underlying cause is not included in
	/// the message; it may be derived from attacker-controlled input.
	#[error("password hashing failed")]
	Hash,

	/// A stored hash record is neither a PHC string nor a legacy digest.
	#[error("stored hash record is malformed")]
	MalformedHash,

	#[error("session store error: {0}")]
	Store(String),
}

impl From<sqlx::Error> for AuthError {
	fn from(e: sqlx::Error) -> Self {
		AuthError::Store(e.to_string())
	}
}
