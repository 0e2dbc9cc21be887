// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared identity and role vocabulary.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for an admin identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdminId(Uuid);

impl AdminId {
	/// Create a new ID from a UUID.
	pub fn new(id: Uuid) -> Self {
		Self(id)
	}

	/// Generate a new random ID.
	pub fn generate() -> Self {
		Self(Uuid::new_v4())
	}

	/// Get the inner UUID value.
	pub fn into_inner(self) -> Uuid {
		self.0
	}

	/// Get a reference to the inner UUID.
	pub fn as_uuid(&self) -> &Uuid {
		&self.0
	}
}

impl fmt::Display for AdminId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl From<Uuid> for AdminId {
	fn from(id: Uuid) -> Self {
		Self(id)
	}
}

impl From<AdminId> for Uuid {
	fn from(id: AdminId) -> Self {
		id.0
	}
}

impl std::str::FromStr for AdminId {
	type Err = uuid::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(Self(s.parse()?))
	}
}

/// Role bound to a request context.
///
/// The gate-only role is strictly weaker than an authenticated admin: it
/// proves knowledge of the shared unlock secret, not an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
	/// Authenticated admin identity (session credential).
	Admin,
	/// Anonymous holder of the shared gate secret (gate credential).
	GateOnly,
}

impl fmt::Display for Role {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Role::Admin => write!(f, "admin"),
			Role::GateOnly => write!(f, "gate_only"),
		}
	}
}

impl std::str::FromStr for Role {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"admin" => Ok(Role::Admin),
			"gate_only" => Ok(Role::GateOnly),
			other => Err(format!("unknown role: {other}")),
		}
	}
}

/// The kind of credential a token represents.
///
/// Kinds are encoded in the token prefix so a leaked gate token can never
/// be replayed as a session token, or the reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
	/// Gate unlock credential.
	Gate,
	/// Authenticated admin session credential.
	Session,
}

impl TokenKind {
	/// Token string prefix for this kind.
	pub fn prefix(&self) -> &'static str {
		match self {
			TokenKind::Gate => "gk_",
			TokenKind::Session => "gs_",
		}
	}
}

impl fmt::Display for TokenKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			TokenKind::Gate => write!(f, "gate"),
			TokenKind::Session => write!(f, "session"),
		}
	}
}

impl std::str::FromStr for TokenKind {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"gate" => Ok(TokenKind::Gate),
			"session" => Ok(TokenKind::Session),
			other => Err(format!("unknown token kind: {other}")),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn admin_id_display_roundtrip() {
		let id = AdminId::generate();
		let parsed: AdminId = id.to_string().parse().unwrap();
		assert_eq!(id, parsed);
	}

	#[test]
	fn role_serializes_snake_case() {
		assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
		assert_eq!(
			serde_json::to_string(&Role::GateOnly).unwrap(),
			"\"gate_only\""
		);
	}

	#[test]
	fn role_display_roundtrip() {
		for role in [Role::Admin, Role::GateOnly] {
			let parsed: Role = role.to_string().parse().unwrap();
			assert_eq!(role, parsed);
		}
	}

	#[test]
	fn token_kinds_have_distinct_prefixes() {
		assert_ne!(TokenKind::Gate.prefix(), TokenKind::Session.prefix());
	}

	#[test]
	fn token_kind_display_roundtrip() {
		for kind in [TokenKind::Gate, TokenKind::Session] {
			let parsed: TokenKind = kind.to_string().parse().unwrap();
			assert_eq!(kind, parsed);
		}
	}
}
