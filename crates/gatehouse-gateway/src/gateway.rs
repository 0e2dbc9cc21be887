// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The admin gateway: protected operations over the trust boundary.

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use gatehouse_audit::{AuditEventType, AuditLog, AuditRecord, AuditRecordBuilder};
use gatehouse_auth::{
	hash_password, verify_password, AccessContext, Action, AdminId, AuthError, IssuedSession,
	Resource, Role, Session, SessionManager, TokenKind,
};
use gatehouse_ratelimit::RateLimiter;
use gatehouse_secrets::SecretCipher;
use gatehouse_settings::{keys, SettingsStore};

use crate::config::{GatewayConfig, RateQuota};
use crate::error::{GatewayError, GatewayResult};

/// Rate-limit scope for gate unlock attempts.
pub const SCOPE_GATE_UNLOCK: &str = "gate:unlock";

/// Rate-limit scope for gate password changes.
pub const SCOPE_GATE_CHANGE: &str = "gate:change";

/// Rate-limit scope for authenticated login attempts.
pub const SCOPE_AUTH: &str = "auth";

/// The two opaque credentials a request may carry.
///
/// The transport layer extracts them from wherever they travel (cookies,
/// headers) and hands them over as plain strings.
#[derive(Debug, Clone, Default)]
pub struct RequestCredentials {
	pub gate_token: Option<String>,
	pub session_token: Option<String>,
}

impl RequestCredentials {
	/// No credentials at all.
	pub fn none() -> Self {
		Self::default()
	}

	/// Only the gate credential.
	pub fn gate(token: impl Into<String>) -> Self {
		Self {
			gate_token: Some(token.into()),
			session_token: None,
		}
	}

	/// Only the session credential.
	pub fn session(token: impl Into<String>) -> Self {
		Self {
			gate_token: None,
			session_token: Some(token.into()),
		}
	}
}

/// The stored admin account record under the `admin_account` key.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AdminAccount {
	id: AdminId,
	email: String,
	password_hash: String,
}

/// The trust-boundary service for the admin surface.
///
/// Constructed once at process start from explicitly injected parts and
/// handed by reference to request handlers; tests build isolated
/// instances. All operations take credentials as opaque strings and
/// return errors from the taxonomy in [`crate::error`].
pub struct AdminGateway {
	config: GatewayConfig,
	settings: Arc<dyn SettingsStore>,
	sessions: SessionManager,
	limiter: Arc<RateLimiter>,
	cipher: SecretCipher,
	audit: AuditLog,
}

impl AdminGateway {
	pub fn new(
		config: GatewayConfig,
		settings: Arc<dyn SettingsStore>,
		sessions: SessionManager,
		limiter: Arc<RateLimiter>,
		audit: AuditLog,
	) -> Self {
		let cipher = SecretCipher::from_passphrase(&config.secret_key);
		Self {
			config,
			settings,
			sessions,
			limiter,
			cipher,
			audit,
		}
	}

	/// The audit handle, for collaborators that record their own events
	/// (moderation, maintenance runs).
	pub fn audit(&self) -> &AuditLog {
		&self.audit
	}

	// -------------------------------------------------------------------------
	// Install & gate lifecycle
	// -------------------------------------------------------------------------

	/// First-run install: set the gate password and mark the system
	/// installed.
	///
	/// Idempotency guard: a second call fails with `AlreadyInstalled`
	/// and alters nothing. Returns a long-lived gate credential so the
	/// installer lands unlocked.
	#[instrument(skip(self, password))]
	pub async fn install(&self, password: &str, client: &str) -> GatewayResult<IssuedSession> {
		self.validate_password(password)?;

		let installed = self
			.timed("settings.get", self.settings.get(keys::INSTALLED))
			.await?;
		if installed.is_some() {
			return Err(GatewayError::AlreadyInstalled);
		}

		let hash = hash_password(password).map_err(|e| GatewayError::internal("password.hash", e))?;
		self
			.timed(
				"settings.set",
				self.settings.set(keys::ADMIN_PASSWORD_HASH, &password_record(hash)),
			)
			.await?;
		self
			.timed(
				"settings.set",
				self.settings.set(
					keys::INSTALLED,
					&json!({ "ok": true, "at": Utc::now().to_rfc3339() }),
				),
			)
			.await?;

		let issued = self
			.timed(
				"session.issue",
				self
					.sessions
					.issue(None, Role::GateOnly, TokenKind::Gate, self.config.install_gate_ttl),
			)
			.await?;

		self
			.audit
			.record_blocking(
				self
					.record(AuditEventType::Installed, client)
					.actor("gate")
					.build(),
			)
			.await;

		Ok(issued)
	}

	/// Exchange the gate password for a gate credential.
	#[instrument(skip(self, password))]
	pub async fn unlock_gate(&self, password: &str, client: &str) -> GatewayResult<IssuedSession> {
		self.check_quota(SCOPE_GATE_UNLOCK, client, self.config.unlock_quota)?;

		if !self.verify_gate_password(password).await? {
			self
				.audit
				.record(self.record(AuditEventType::GateUnlockFailed, client).build());
			return Err(GatewayError::Unauthorized);
		}

		let issued = self
			.timed(
				"session.issue",
				self
					.sessions
					.issue(None, Role::GateOnly, TokenKind::Gate, self.config.gate_unlock_ttl),
			)
			.await?;

		self
			.audit
			.record_blocking(
				self
					.record(AuditEventType::GateUnlocked, client)
					.actor("gate")
					.build(),
			)
			.await;

		Ok(issued)
	}

	/// Change the gate password.
	///
	/// Requires a valid gate credential and the current password; both
	/// failures surface as the same `Unauthorized`.
	#[instrument(skip(self, credentials, current_password, new_password))]
	pub async fn change_gate_password(
		&self,
		credentials: &RequestCredentials,
		current_password: &str,
		new_password: &str,
		client: &str,
	) -> GatewayResult<()> {
		self.check_quota(SCOPE_GATE_CHANGE, client, self.config.change_quota)?;

		let Some(gate_token) = credentials.gate_token.as_deref() else {
			return Err(GatewayError::Unauthorized);
		};
		self.verify_credential(gate_token, TokenKind::Gate).await?;

		let ctx = AccessContext::gate_only();
		if !ctx.can_access(Resource::GatePassword, Action::Write) {
			return Err(GatewayError::Forbidden);
		}

		self.validate_password(new_password)?;

		if !self.verify_gate_password(current_password).await? {
			self.audit.record(
				self
					.record(AuditEventType::AccessDenied, client)
					.actor(ctx.actor_label())
					.action("gate password change rejected")
					.build(),
			);
			return Err(GatewayError::Unauthorized);
		}

		let hash =
			hash_password(new_password).map_err(|e| GatewayError::internal("password.hash", e))?;
		self
			.timed(
				"settings.set",
				self.settings.set(keys::ADMIN_PASSWORD_HASH, &password_record(hash)),
			)
			.await?;

		self
			.audit
			.record_blocking(
				self
					.record(AuditEventType::GatePasswordChanged, client)
					.actor(ctx.actor_label())
					.build(),
			)
			.await;

		Ok(())
	}

	// -------------------------------------------------------------------------
	// Authenticated sessions
	// -------------------------------------------------------------------------

	/// Provision (or replace) the authenticated admin account.
	///
	/// Gate-protected: the setup flow runs before any admin exists.
	#[instrument(skip(self, credentials, email, password))]
	pub async fn set_admin_account(
		&self,
		credentials: &RequestCredentials,
		email: &str,
		password: &str,
		client: &str,
	) -> GatewayResult<AdminId> {
		let ctx = self
			.resolve(credentials)
			.await
			.ok_or(GatewayError::Unauthorized)?;
		if !ctx.can_access(Resource::Users, Action::Write) {
			return Err(GatewayError::Forbidden);
		}

		if !email.contains('@') {
			return Err(GatewayError::Validation(
				"email address is not valid".to_string(),
			));
		}
		self.validate_password(password)?;

		// Keep the identity stable across password rotations.
		let id = match self.load_admin_account().await? {
			Some(account) => account.id,
			None => AdminId::generate(),
		};

		let hash = hash_password(password).map_err(|e| GatewayError::internal("password.hash", e))?;
		let account = AdminAccount {
			id,
			email: email.to_lowercase(),
			password_hash: hash,
		};
		let value =
			serde_json::to_value(&account).map_err(|e| GatewayError::internal("admin_account", e))?;
		self
			.timed("settings.set", self.settings.set(keys::ADMIN_ACCOUNT, &value))
			.await?;

		self
			.audit
			.record_blocking(
				self
					.record(AuditEventType::AdminAccountUpdated, client)
					.actor(ctx.actor_label())
					.details(json!({ "admin_id": id.to_string() }))
					.build(),
			)
			.await;

		Ok(id)
	}

	/// Authenticated login: email and password for a session credential.
	///
	/// Unknown account and wrong password are indistinguishable to the
	/// caller.
	#[instrument(skip(self, email, password))]
	pub async fn login(
		&self,
		email: &str,
		password: &str,
		client: &str,
	) -> GatewayResult<IssuedSession> {
		self.check_quota(SCOPE_AUTH, client, self.config.login_quota)?;

		let Some(account) = self.load_admin_account().await? else {
			self
				.audit
				.record(self.record(AuditEventType::LoginFailed, client).build());
			return Err(GatewayError::Unauthorized);
		};

		let matched = account.email == email.to_lowercase()
			&& verify_password(password, &account.password_hash)
				.map_err(|e| GatewayError::internal("password.verify", e))?;

		if !matched {
			self
				.audit
				.record(self.record(AuditEventType::LoginFailed, client).build());
			return Err(GatewayError::Unauthorized);
		}

		let issued = self
			.timed(
				"session.issue",
				self.sessions.issue(
					Some(account.id),
					Role::Admin,
					TokenKind::Session,
					self.config.session_ttl,
				),
			)
			.await?;

		self
			.audit
			.record_blocking(
				self
					.record(AuditEventType::Login, client)
					.actor(format!("admin:{}", account.id))
					.build(),
			)
			.await;

		Ok(issued)
	}

	/// Revoke a session credential. Idempotent: an unknown token is not
	/// an error.
	#[instrument(skip(self, session_token))]
	pub async fn logout(&self, session_token: &str, client: &str) -> GatewayResult<()> {
		let session = self.peek_session(session_token).await;

		let revoked = self
			.timed("session.revoke", self.sessions.revoke(session_token))
			.await?;

		if revoked {
			let actor = session
				.and_then(|s| s.admin_id)
				.map(|id| format!("admin:{id}"));
			let mut builder = self.record(AuditEventType::Logout, client);
			if let Some(actor) = actor {
				builder = builder.actor(actor);
			}
			self.audit.record_blocking(builder.build()).await;
		}

		Ok(())
	}

	/// Resolve request credentials into an access context.
	///
	/// A valid session outranks the gate; an expired session with a
	/// valid gate credential degrades to gate-only. Verification
	/// failures of any kind - including store timeouts - resolve to
	/// absent, never to access.
	pub async fn resolve(&self, credentials: &RequestCredentials) -> Option<AccessContext> {
		if let Some(token) = credentials.session_token.as_deref() {
			if let Ok(session) = self.verify_credential(token, TokenKind::Session).await {
				return match session.admin_id {
					Some(id) => Some(AccessContext::for_admin(id)),
					None => Some(AccessContext::gate_only()),
				};
			}
		}

		if let Some(token) = credentials.gate_token.as_deref() {
			if self
				.verify_credential(token, TokenKind::Gate)
				.await
				.is_ok()
			{
				return Some(AccessContext::gate_only());
			}
		}

		None
	}

	/// Purge expired credentials from the session store.
	///
	/// An admin-only maintenance run; the count of removed records lands
	/// in the audit trail.
	#[instrument(skip(self, credentials))]
	pub async fn purge_expired_sessions(
		&self,
		credentials: &RequestCredentials,
		client: &str,
	) -> GatewayResult<u64> {
		let ctx = self
			.resolve(credentials)
			.await
			.ok_or(GatewayError::Unauthorized)?;
		if !ctx.can_access(Resource::Sessions, Action::Delete) {
			return Err(GatewayError::Forbidden);
		}

		let removed = self
			.timed("session.purge", self.sessions.purge_expired())
			.await?;

		self
			.audit
			.record_blocking(
				self
					.record(AuditEventType::MaintenanceRun, client)
					.actor(ctx.actor_label())
					.action("purged expired credentials")
					.details(json!({ "removed": removed }))
					.build(),
			)
			.await;

		Ok(removed)
	}

	// -------------------------------------------------------------------------
	// Settings
	// -------------------------------------------------------------------------

	/// Read a setting. Sensitive keys are never served through this
	/// path, regardless of role.
	#[instrument(skip(self, credentials))]
	pub async fn get_setting(
		&self,
		credentials: &RequestCredentials,
		key: &str,
	) -> GatewayResult<serde_json::Value> {
		let ctx = self
			.resolve(credentials)
			.await
			.ok_or(GatewayError::Unauthorized)?;

		if keys::is_sensitive(key) {
			tracing::warn!(actor = %ctx.actor_label(), key, "read of sensitive key refused");
			return Err(GatewayError::Forbidden);
		}

		if !ctx.can_access(Resource::Settings, Action::Read) {
			return Err(GatewayError::Forbidden);
		}

		self
			.timed("settings.get", self.settings.get(key))
			.await?
			.ok_or_else(|| GatewayError::NotFound(key.to_string()))
	}

	/// Create or overwrite a setting. Requires the gate at minimum.
	#[instrument(skip(self, credentials, value))]
	pub async fn set_setting(
		&self,
		credentials: &RequestCredentials,
		key: &str,
		value: &serde_json::Value,
		client: &str,
	) -> GatewayResult<()> {
		let ctx = self
			.resolve(credentials)
			.await
			.ok_or(GatewayError::Unauthorized)?;

		if keys::is_sensitive(key) {
			return Err(GatewayError::Forbidden);
		}

		if !ctx.can_access(Resource::Settings, Action::Write) {
			return Err(GatewayError::Forbidden);
		}

		self
			.timed("settings.set", self.settings.set(key, value))
			.await?;

		self
			.audit
			.record_blocking(
				self
					.record(AuditEventType::SettingWritten, client)
					.actor(ctx.actor_label())
					.details(json!({ "key": key }))
					.build(),
			)
			.await;

		Ok(())
	}

	/// Delete a setting. Deleting an absent key is an ack, not an error.
	#[instrument(skip(self, credentials))]
	pub async fn delete_setting(
		&self,
		credentials: &RequestCredentials,
		key: &str,
		client: &str,
	) -> GatewayResult<bool> {
		let ctx = self
			.resolve(credentials)
			.await
			.ok_or(GatewayError::Unauthorized)?;

		if keys::is_sensitive(key) {
			return Err(GatewayError::Forbidden);
		}

		if !ctx.can_access(Resource::Settings, Action::Delete) {
			return Err(GatewayError::Forbidden);
		}

		let removed = self
			.timed("settings.delete", self.settings.delete(key))
			.await?;

		if removed {
			self
				.audit
				.record_blocking(
					self
						.record(AuditEventType::SettingDeleted, client)
						.actor(ctx.actor_label())
						.details(json!({ "key": key }))
						.build(),
				)
				.await;
		}

		Ok(removed)
	}

	// -------------------------------------------------------------------------
	// Runtime secrets
	// -------------------------------------------------------------------------

	/// Store provider credentials, encrypted at rest.
	#[instrument(skip(self, credentials, providers))]
	pub async fn put_runtime_secrets(
		&self,
		credentials: &RequestCredentials,
		providers: serde_json::Value,
		client: &str,
	) -> GatewayResult<()> {
		let ctx = self
			.resolve(credentials)
			.await
			.ok_or(GatewayError::Unauthorized)?;
		if !ctx.can_access(Resource::Secrets, Action::Write) {
			return Err(GatewayError::Forbidden);
		}

		let envelope = self.cipher.encrypt(&json!({ "providers": providers }))?;
		self
			.timed(
				"settings.set",
				self
					.settings
					.set(keys::RUNTIME_SECRETS, &serde_json::Value::String(envelope)),
			)
			.await?;

		self
			.audit
			.record_blocking(
				self
					.record(AuditEventType::SecretsUpdated, client)
					.actor(ctx.actor_label())
					.build(),
			)
			.await;

		Ok(())
	}

	/// Decrypt and return the provider credentials.
	///
	/// Admin-only: the gate-only role may rotate secrets but never read
	/// them back.
	#[instrument(skip(self, credentials))]
	pub async fn runtime_secrets(
		&self,
		credentials: &RequestCredentials,
	) -> GatewayResult<serde_json::Value> {
		let ctx = self
			.resolve(credentials)
			.await
			.ok_or(GatewayError::Unauthorized)?;
		if !ctx.can_access(Resource::Secrets, Action::Read) {
			return Err(GatewayError::Forbidden);
		}

		let stored = self
			.timed("settings.get", self.settings.get(keys::RUNTIME_SECRETS))
			.await?
			.ok_or_else(|| GatewayError::NotFound(keys::RUNTIME_SECRETS.to_string()))?;

		let envelope = stored.as_str().ok_or(GatewayError::Integrity)?;
		let payload = self.cipher.decrypt(envelope)?;

		payload
			.get("providers")
			.cloned()
			.ok_or_else(|| GatewayError::internal("runtime_secrets", "missing providers field"))
	}

	// -------------------------------------------------------------------------
	// Internals
	// -------------------------------------------------------------------------

	fn validate_password(&self, password: &str) -> GatewayResult<()> {
		if password.len() < self.config.min_password_len {
			return Err(GatewayError::Validation(format!(
				"password must be at least {} characters",
				self.config.min_password_len
			)));
		}
		Ok(())
	}

	fn check_quota(&self, scope: &str, client: &str, quota: RateQuota) -> GatewayResult<()> {
		let decision = self
			.limiter
			.check(scope, client, quota.limit, quota.window_secs);
		if decision.allowed {
			Ok(())
		} else {
			Err(GatewayError::RateLimited {
				retry_after_secs: decision.retry_after_secs,
			})
		}
	}

	/// Run a storage operation under the configured timeout. Failures
	/// and timeouts collapse to `Internal` with detail in the log.
	async fn timed<T, E: std::fmt::Display>(
		&self,
		operation: &'static str,
		fut: impl Future<Output = Result<T, E>>,
	) -> GatewayResult<T> {
		match tokio::time::timeout(self.config.op_timeout, fut).await {
			Ok(Ok(value)) => Ok(value),
			Ok(Err(e)) => Err(GatewayError::internal(operation, e)),
			Err(_) => Err(GatewayError::internal(operation, "operation timed out")),
		}
	}

	/// Verify a credential, failing closed: expiry, tamper, store
	/// errors, and timeouts all deny.
	async fn verify_credential(&self, token: &str, kind: TokenKind) -> GatewayResult<Session> {
		match tokio::time::timeout(self.config.op_timeout, self.sessions.verify(token, kind)).await {
			Ok(Ok(session)) => Ok(session),
			Ok(Err(AuthError::Expired | AuthError::Invalid)) => Err(GatewayError::Unauthorized),
			Ok(Err(e)) => {
				tracing::error!(error = %e, "credential verification failed; denying");
				Err(GatewayError::Unauthorized)
			}
			Err(_) => {
				tracing::error!("credential verification timed out; denying");
				Err(GatewayError::Unauthorized)
			}
		}
	}

	/// Best-effort session lookup for audit attribution.
	async fn peek_session(&self, token: &str) -> Option<Session> {
		tokio::time::timeout(
			self.config.op_timeout,
			self.sessions.verify(token, TokenKind::Session),
		)
		.await
		.ok()
		.and_then(Result::ok)
	}

	async fn verify_gate_password(&self, candidate: &str) -> GatewayResult<bool> {
		let record = self
			.timed(
				"settings.get",
				self.settings.get(keys::ADMIN_PASSWORD_HASH),
			)
			.await?;

		// Not installed yet: uniform failure, no detail leaked.
		let Some(record) = record else {
			return Ok(false);
		};

		let hash = record
			.get("hash")
			.and_then(|h| h.as_str())
			.ok_or_else(|| GatewayError::internal("password_record", "missing hash field"))?;

		verify_password(candidate, hash).map_err(|e| GatewayError::internal("password.verify", e))
	}

	async fn load_admin_account(&self) -> GatewayResult<Option<AdminAccount>> {
		let value = self
			.timed("settings.get", self.settings.get(keys::ADMIN_ACCOUNT))
			.await?;

		value
			.map(serde_json::from_value)
			.transpose()
			.map_err(|e| GatewayError::internal("admin_account", e))
	}

	fn record(&self, event: AuditEventType, client: &str) -> AuditRecordBuilder {
		AuditRecord::builder(event).ip_address(client)
	}
}

fn password_record(hash: String) -> serde_json::Value {
	json!({ "hash": hash })
}
