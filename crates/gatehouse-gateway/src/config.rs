// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Gateway configuration.
//!
//! The operator secret that keys the settings cipher comes from the
//! environment. In a production posture its absence refuses to start;
//! anywhere else the gateway falls back to a fixed development key and
//! says so loudly in the log - there is no silent fallback.

use chrono::Duration;

/// Environment variable carrying the operator secret.
pub const SECRET_KEY_ENV_VAR: &str = "GATEHOUSE_SECRET_KEY";

/// Environment variable naming the deployment environment.
pub const ENV_ENV_VAR: &str = "GATEHOUSE_ENV";

/// Development-only fallback key used when no operator secret is set.
pub const INSECURE_DEV_KEY: &str = "gatehouse-insecure-dev-key";

/// A per-scope rate quota.
#[derive(Debug, Clone, Copy)]
pub struct RateQuota {
	pub limit: u32,
	pub window_secs: u64,
}

/// Configuration for [`crate::AdminGateway`].
#[derive(Debug, Clone)]
pub struct GatewayConfig {
	/// Operator secret the settings cipher key is derived from.
	pub secret_key: String,

	/// Minimum accepted password length.
	pub min_password_len: usize,

	/// Gate credential lifetime when issued by password unlock.
	pub gate_unlock_ttl: Duration,

	/// Gate credential lifetime when issued by a full install.
	pub install_gate_ttl: Duration,

	/// Session credential lifetime.
	pub session_ttl: Duration,

	/// Quota for gate unlock attempts, keyed by client.
	pub unlock_quota: RateQuota,

	/// Quota for gate password changes, keyed by client.
	pub change_quota: RateQuota,

	/// Quota for authenticated login attempts, keyed by client.
	pub login_quota: RateQuota,

	/// Upper bound on any single storage operation. Timeouts fail
	/// closed: a credential check denies, a settings operation errors.
	pub op_timeout: std::time::Duration,
}

impl Default for GatewayConfig {
	fn default() -> Self {
		Self {
			secret_key: INSECURE_DEV_KEY.to_string(),
			min_password_len: 4,
			gate_unlock_ttl: Duration::hours(24),
			install_gate_ttl: Duration::days(7),
			session_ttl: Duration::hours(24),
			unlock_quota: RateQuota {
				limit: 10,
				window_secs: 300,
			},
			change_quota: RateQuota {
				limit: 5,
				window_secs: 300,
			},
			login_quota: RateQuota {
				limit: 10,
				window_secs: 300,
			},
			op_timeout: std::time::Duration::from_secs(5),
		}
	}
}

impl GatewayConfig {
	/// Create GatewayConfig from environment variables.
	///
	/// Reads `GATEHOUSE_SECRET_KEY` for the operator secret and
	/// `GATEHOUSE_ENV` for the deployment environment.
	///
	/// # Panics
	///
	/// Panics if no secret is set while `GATEHOUSE_ENV=production`; a
	/// production deployment must not run on the development key.
	pub fn from_env() -> Self {
		let secret = std::env::var(SECRET_KEY_ENV_VAR).ok();
		let environment = std::env::var(ENV_ENV_VAR).ok();

		Self {
			secret_key: resolve_secret(secret, environment),
			..Default::default()
		}
	}

	/// Set the operator secret.
	pub fn with_secret_key(mut self, secret: impl Into<String>) -> Self {
		self.secret_key = secret.into();
		self
	}

	/// Set the session lifetime.
	pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
		self.session_ttl = ttl;
		self
	}

	/// Set the login attempt quota.
	pub fn with_login_quota(mut self, quota: RateQuota) -> Self {
		self.login_quota = quota;
		self
	}

	/// Set the gate unlock quota.
	pub fn with_unlock_quota(mut self, quota: RateQuota) -> Self {
		self.unlock_quota = quota;
		self
	}

	/// Set the storage operation timeout.
	pub fn with_op_timeout(mut self, timeout: std::time::Duration) -> Self {
		self.op_timeout = timeout;
		self
	}
}

fn resolve_secret(secret: Option<String>, environment: Option<String>) -> String {
	match secret {
		Some(secret) if !secret.is_empty() => secret,
		_ => {
			let environment = environment.unwrap_or_default();
			if environment.to_lowercase() == "production" {
				panic!(
					"FATAL: {SECRET_KEY_ENV_VAR} is not set while {ENV_ENV_VAR}=production. \
					 The settings cipher MUST NOT run on the development key in production. \
					 Set {SECRET_KEY_ENV_VAR} to operator-controlled key material."
				);
			}

			tracing::warn!(
				"{} is not set; falling back to the INSECURE development key - \
				 encrypted settings are not protected",
				SECRET_KEY_ENV_VAR
			);
			INSECURE_DEV_KEY.to_string()
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn explicit_secret_wins() {
		let secret = resolve_secret(Some("opaque-material".into()), Some("production".into()));
		assert_eq!(secret, "opaque-material");
	}

	#[test]
	fn missing_secret_falls_back_outside_production() {
		assert_eq!(resolve_secret(None, None), INSECURE_DEV_KEY);
		assert_eq!(
			resolve_secret(None, Some("staging".into())),
			INSECURE_DEV_KEY
		);
		assert_eq!(
			resolve_secret(Some(String::new()), Some("dev".into())),
			INSECURE_DEV_KEY
		);
	}

	#[test]
	#[should_panic(expected = "MUST NOT run on the development key")]
	fn missing_secret_refuses_to_start_in_production() {
		resolve_secret(None, Some("production".into()));
	}

	#[test]
	fn default_lifetimes_match_policy() {
		let config = GatewayConfig::default();
		assert_eq!(config.gate_unlock_ttl, Duration::hours(24));
		assert_eq!(config.install_gate_ttl, Duration::days(7));
		assert_eq!(config.session_ttl, Duration::hours(24));
		assert_eq!(config.min_password_len, 4);
	}
}
