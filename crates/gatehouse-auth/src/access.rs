// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Capability evaluation for admin requests.
//!
//! [`is_allowed`] is the single policy function: a pure, total mapping
//! from (role, resource, action) to a decision. Anything not explicitly
//! granted is denied. The gate-only role is strictly weaker than an
//! authenticated admin; its grants are enumerated one by one rather than
//! inherited.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::types::{AdminId, Role};

/// Resources subject to capability checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
	/// Site configuration keys in the settings store.
	Settings,
	/// Encrypted provider credentials.
	Secrets,
	/// The shared gate password record.
	GatePassword,
	/// Issued credentials (listing, revocation).
	Sessions,
	/// Admin account records.
	Users,
	/// The audit trail.
	Audit,
}

impl fmt::Display for Resource {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			Resource::Settings => "settings",
			Resource::Secrets => "secrets",
			Resource::GatePassword => "gate_password",
			Resource::Sessions => "sessions",
			Resource::Users => "users",
			Resource::Audit => "audit",
		};
		write!(f, "{s}")
	}
}

/// Operations on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
	Read,
	Write,
	Delete,
}

impl fmt::Display for Action {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			Action::Read => "read",
			Action::Write => "write",
			Action::Delete => "delete",
		};
		write!(f, "{s}")
	}
}

/// Evaluates whether a role may perform an action on a resource.
///
/// Deny-by-default: the match enumerates grants, and every pair that does
/// not appear is denied. The policy is static; there is no per-resource
/// ownership dimension because the admin surface is single-tenant.
pub fn is_allowed(role: Role, resource: Resource, action: Action) -> bool {
	match role {
		Role::Admin => matches!(
			(resource, action),
			(Resource::Settings, _)
				| (Resource::Secrets, Action::Read | Action::Write)
				| (Resource::GatePassword, Action::Write)
				| (Resource::Sessions, Action::Read | Action::Delete)
				| (Resource::Users, Action::Read | Action::Write)
				| (Resource::Audit, Action::Read)
		),
		Role::GateOnly => matches!(
			(resource, action),
			(Resource::Settings, _)
				| (Resource::Secrets, Action::Write)
				| (Resource::GatePassword, Action::Write)
				| (Resource::Users, Action::Write)
		),
	}
}

/// The identity behind a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
	/// An authenticated admin.
	Admin(AdminId),
	/// The anonymous holder of the gate secret.
	Gate,
}

/// Per-request authorization context.
///
/// Built once per request from whichever credential verified, then asked
/// about each capability the handler needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessContext {
	pub actor: Actor,
	pub role: Role,
}

impl AccessContext {
	/// Context for an authenticated admin session.
	pub fn for_admin(id: AdminId) -> Self {
		Self {
			actor: Actor::Admin(id),
			role: Role::Admin,
		}
	}

	/// Context for a request holding only the gate credential.
	pub fn gate_only() -> Self {
		Self {
			actor: Actor::Gate,
			role: Role::GateOnly,
		}
	}

	/// Whether the context carries an authenticated identity.
	pub fn is_authenticated(&self) -> bool {
		matches!(self.actor, Actor::Admin(_))
	}

	/// Evaluate a capability. Denials are logged.
	pub fn can_access(&self, resource: Resource, action: Action) -> bool {
		let allowed = is_allowed(self.role, resource, action);
		if !allowed {
			warn!(
				actor = %self.actor_label(),
				resource = %resource,
				action = %action,
				"access denied"
			);
		}
		allowed
	}

	/// Stable actor label for audit records.
	pub fn actor_label(&self) -> String {
		match self.actor {
			Actor::Admin(id) => format!("admin:{id}"),
			Actor::Gate => "gate".to_string(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	mod deny_by_default {
		use super::*;

		#[test]
		fn users_delete_is_denied_for_every_role() {
			assert!(!is_allowed(Role::Admin, Resource::Users, Action::Delete));
			assert!(!is_allowed(Role::GateOnly, Resource::Users, Action::Delete));
		}

		#[test]
		fn policy_is_total() {
			// Every pair evaluates without panicking; most are denials for
			// the gate-only role.
			let resources = [
				Resource::Settings,
				Resource::Secrets,
				Resource::GatePassword,
				Resource::Sessions,
				Resource::Users,
				Resource::Audit,
			];
			let actions = [Action::Read, Action::Write, Action::Delete];

			for resource in resources {
				for action in actions {
					let _ = is_allowed(Role::Admin, resource, action);
					let _ = is_allowed(Role::GateOnly, resource, action);
				}
			}
		}
	}

	mod gate_only {
		use super::*;

		#[test]
		fn can_manage_settings() {
			assert!(is_allowed(Role::GateOnly, Resource::Settings, Action::Read));
			assert!(is_allowed(Role::GateOnly, Resource::Settings, Action::Write));
			assert!(is_allowed(
				Role::GateOnly,
				Resource::Settings,
				Action::Delete
			));
		}

		#[test]
		fn can_rotate_gate_password_and_secrets() {
			assert!(is_allowed(
				Role::GateOnly,
				Resource::GatePassword,
				Action::Write
			));
			assert!(is_allowed(Role::GateOnly, Resource::Secrets, Action::Write));
		}

		#[test]
		fn cannot_read_secrets_or_audit() {
			assert!(!is_allowed(Role::GateOnly, Resource::Secrets, Action::Read));
			assert!(!is_allowed(Role::GateOnly, Resource::Audit, Action::Read));
		}

		#[test]
		fn can_provision_admin_account() {
			// The setup wizard runs gate-only before any admin exists.
			assert!(is_allowed(Role::GateOnly, Resource::Users, Action::Write));
		}

		#[test]
		fn cannot_touch_sessions_or_read_users() {
			assert!(!is_allowed(Role::GateOnly, Resource::Sessions, Action::Read));
			assert!(!is_allowed(
				Role::GateOnly,
				Resource::Sessions,
				Action::Delete
			));
			assert!(!is_allowed(Role::GateOnly, Resource::Users, Action::Read));
		}

		#[test]
		fn is_strictly_weaker_than_admin() {
			let resources = [
				Resource::Settings,
				Resource::Secrets,
				Resource::GatePassword,
				Resource::Sessions,
				Resource::Users,
				Resource::Audit,
			];
			let actions = [Action::Read, Action::Write, Action::Delete];

			for resource in resources {
				for action in actions {
					if is_allowed(Role::GateOnly, resource, action) {
						assert!(
							is_allowed(Role::Admin, resource, action),
							"gate-only grant {resource}/{action} missing for admin"
						);
					}
				}
			}
		}
	}

	mod context {
		use super::*;

		#[test]
		fn admin_context_is_authenticated() {
			let ctx = AccessContext::for_admin(AdminId::generate());
			assert!(ctx.is_authenticated());
			assert_eq!(ctx.role, Role::Admin);
		}

		#[test]
		fn gate_context_is_anonymous() {
			let ctx = AccessContext::gate_only();
			assert!(!ctx.is_authenticated());
			assert_eq!(ctx.role, Role::GateOnly);
			assert_eq!(ctx.actor_label(), "gate");
		}

		#[test]
		fn can_access_delegates_to_policy() {
			let gate = AccessContext::gate_only();
			assert!(gate.can_access(Resource::Settings, Action::Write));
			assert!(!gate.can_access(Resource::Audit, Action::Read));

			let admin = AccessContext::for_admin(AdminId::generate());
			assert!(admin.can_access(Resource::Audit, Action::Read));
			assert!(!admin.can_access(Resource::Users, Action::Delete));
		}
	}
}
