// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Well-known settings keys.

/// Gate password record: `{ "hash": "<phc-or-legacy-digest>" }`.
pub const ADMIN_PASSWORD_HASH: &str = "admin_password_hash";

/// Idempotent install marker: `{ "ok": true, "at": "<rfc3339>" }`.
pub const INSTALLED: &str = "installed";

/// Arbitrary site configuration JSON.
pub const SITE_CONFIG: &str = "site_config";

/// Cipher envelope wrapping `{ "providers": ... }`.
pub const RUNTIME_SECRETS: &str = "runtime_secrets";

/// Authenticated admin account: `{ "id", "email", "password_hash" }`.
pub const ADMIN_ACCOUNT: &str = "admin_account";

/// Keys whose values are secret material (hash records or envelopes).
/// These are not served through the generic settings read path.
pub const SENSITIVE_KEYS: &[&str] = &[ADMIN_PASSWORD_HASH, RUNTIME_SECRETS, ADMIN_ACCOUNT];

/// Check if a key holds secret material.
pub fn is_sensitive(key: &str) -> bool {
	SENSITIVE_KEYS.contains(&key)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn sensitive_keys_are_flagged() {
		assert!(is_sensitive(ADMIN_PASSWORD_HASH));
		assert!(is_sensitive(RUNTIME_SECRETS));
		assert!(is_sensitive(ADMIN_ACCOUNT));
		assert!(!is_sensitive(SITE_CONFIG));
		assert!(!is_sensitive(INSTALLED));
		assert!(!is_sensitive("theme"));
	}
}
