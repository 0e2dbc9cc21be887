// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The gateway error taxonomy.
//!
//! Every variant is a distinct, stable signal to the caller except
//! [`GatewayError::Internal`], which is logged with full detail
//! server-side and surfaced as a generic message. Authentication
//! failures are a single uniform `Unauthorized` - the shape never
//! reveals wrong-password vs unknown-account. Nothing here retries
//! automatically; rate limiting is the only backoff mechanism and it is
//! caller-driven.

use thiserror::Error;

pub type GatewayResult<T> = Result<T, GatewayError>;

#[derive(Error, Debug)]
pub enum GatewayError {
	/// No valid gate or session credential, or a failed authentication
	/// attempt. Deliberately carries no detail.
	#[error("unauthorized")]
	Unauthorized,

	/// Authenticated but lacking the capability for this action.
	#[error("forbidden")]
	Forbidden,

	/// Quota exceeded; the client may retry after the window resets.
	#[error("rate limited; retry after {retry_after_secs}s")]
	RateLimited { retry_after_secs: u64 },

	/// Malformed input, e.g. a password below the minimum length.
	#[error("validation failed: {0}")]
	Validation(String),

	/// A cipher envelope failed authentication or was malformed.
	#[error("payload integrity check failed")]
	Integrity,

	/// The system is already installed; the install guard is idempotent.
	#[error("already installed")]
	AlreadyInstalled,

	/// Unknown setting key on read.
	#[error("setting not found: {0}")]
	NotFound(String),

	/// Unexpected failure in a backing store. Detail goes to the log,
	/// not to the caller.
	#[error("internal error")]
	Internal,
}

impl GatewayError {
	/// Log the underlying cause and collapse it to the generic variant.
	pub(crate) fn internal(operation: &'static str, err: impl std::fmt::Display) -> Self {
		tracing::error!(operation, error = %err, "internal gateway error");
		GatewayError::Internal
	}
}

impl From<gatehouse_secrets::SecretsError> for GatewayError {
	fn from(e: gatehouse_secrets::SecretsError) -> Self {
		use gatehouse_secrets::SecretsError;
		match e {
			SecretsError::Integrity | SecretsError::MalformedEnvelope(_) => GatewayError::Integrity,
			other => GatewayError::internal("secrets", other),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn internal_message_is_generic() {
		let err = GatewayError::internal("settings.get", "connection refused");
		assert_eq!(err.to_string(), "internal error");
	}

	#[test]
	fn integrity_errors_map_from_secrets() {
		let err: GatewayError = gatehouse_secrets::SecretsError::Integrity.into();
		assert!(matches!(err, GatewayError::Integrity));

		let err: GatewayError =
			gatehouse_secrets::SecretsError::MalformedEnvelope("expected three fields").into();
		assert!(matches!(err, GatewayError::Integrity));
	}

	#[test]
	fn rate_limited_carries_retry_after() {
		let err = GatewayError::RateLimited {
			retry_after_secs: 42,
		};
		assert!(err.to_string().contains("42"));
	}
}
