// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Opaque credential issuance, verification, and revocation.
//!
//! Tokens are 32 bytes from the OS RNG, hex-encoded behind a kind prefix
//! (`gk_` gate, `gs_` session). The store never sees the token itself,
//! only its SHA-256 digest; presenting a token means recomputing the
//! digest and looking the record up. A record is valid while `now` is
//! before `expires_at` and the kinds match.
//!
//! Storage lives behind [`SessionStore`] so the single-process in-memory
//! map can be swapped for the SQLite store (or a shared store) without
//! touching the issuance logic.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use tracing::instrument;

use crate::error::{AuthError, AuthResult};
use crate::types::{AdminId, Role, TokenKind};

/// Number of random bytes in a token.
const TOKEN_BYTES: usize = 32;

/// A stored credential record.
///
/// `token_digest` is the SHA-256 of the full token string; the token
/// itself is returned once at issuance and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
	pub token_digest: String,
	/// Bound admin identity; gate credentials carry none.
	pub admin_id: Option<AdminId>,
	pub role: Role,
	pub kind: TokenKind,
	pub issued_at: DateTime<Utc>,
	pub expires_at: DateTime<Utc>,
}

/// The result of issuing a credential: the secret token plus its record.
#[derive(Debug, Clone)]
pub struct IssuedSession {
	/// The opaque token. Hand it to the caller; it cannot be recovered
	/// from the store afterwards.
	pub token: String,
	pub session: Session,
}

/// Storage backend for credential records, keyed by token digest.
#[async_trait]
pub trait SessionStore: Send + Sync {
	async fn insert(&self, session: &Session) -> AuthResult<()>;
	async fn get(&self, token_digest: &str) -> AuthResult<Option<Session>>;
	async fn remove(&self, token_digest: &str) -> AuthResult<bool>;
	async fn purge_expired(&self, now: DateTime<Utc>) -> AuthResult<u64>;
}

/// In-process store; the default for a single-node deployment.
#[derive(Default)]
pub struct MemorySessionStore {
	records: RwLock<HashMap<String, Session>>,
}

impl MemorySessionStore {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl SessionStore for MemorySessionStore {
	async fn insert(&self, session: &Session) -> AuthResult<()> {
		let mut records = self
			.records
			.write()
			.unwrap_or_else(PoisonError::into_inner);
		records.insert(session.token_digest.clone(), session.clone());
		Ok(())
	}

	async fn get(&self, token_digest: &str) -> AuthResult<Option<Session>> {
		let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
		Ok(records.get(token_digest).cloned())
	}

	async fn remove(&self, token_digest: &str) -> AuthResult<bool> {
		let mut records = self
			.records
			.write()
			.unwrap_or_else(PoisonError::into_inner);
		Ok(records.remove(token_digest).is_some())
	}

	async fn purge_expired(&self, now: DateTime<Utc>) -> AuthResult<u64> {
		let mut records = self
			.records
			.write()
			.unwrap_or_else(PoisonError::into_inner);
		let before = records.len();
		records.retain(|_, session| session.expires_at > now);
		Ok((before - records.len()) as u64)
	}
}

/// SQLite-backed store for deployments that need credentials to survive
/// a process restart.
#[derive(Clone)]
pub struct SqliteSessionStore {
	pool: SqlitePool,
}

impl SqliteSessionStore {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Create the sessions table if it does not exist.
	pub async fn migrate(&self) -> AuthResult<()> {
		sqlx::query(
			r#"
			CREATE TABLE IF NOT EXISTS sessions (
				token_digest TEXT PRIMARY KEY,
				admin_id TEXT,
				role TEXT NOT NULL,
				kind TEXT NOT NULL,
				issued_at TEXT NOT NULL,
				expires_at TEXT NOT NULL
			)
			"#,
		)
		.execute(&self.pool)
		.await?;

		sqlx::query("CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at)")
			.execute(&self.pool)
			.await?;

		Ok(())
	}
}

#[derive(sqlx::FromRow)]
struct SessionRow {
	token_digest: String,
	admin_id: Option<String>,
	role: String,
	kind: String,
	issued_at: String,
	expires_at: String,
}

impl TryFrom<SessionRow> for Session {
	type Error = AuthError;

	fn try_from(row: SessionRow) -> AuthResult<Self> {
		Ok(Session {
			token_digest: row.token_digest,
			admin_id: row
				.admin_id
				.map(|s| s.parse())
				.transpose()
				.map_err(|_| AuthError::Store("invalid admin_id".into()))?,
			role: row
				.role
				.parse()
				.map_err(|e| AuthError::Store(format!("invalid role: {e}")))?,
			kind: row
				.kind
				.parse()
				.map_err(|e| AuthError::Store(format!("invalid kind: {e}")))?,
			issued_at: DateTime::parse_from_rfc3339(&row.issued_at)
				.map_err(|e| AuthError::Store(format!("invalid issued_at: {e}")))?
				.with_timezone(&Utc),
			expires_at: DateTime::parse_from_rfc3339(&row.expires_at)
				.map_err(|e| AuthError::Store(format!("invalid expires_at: {e}")))?
				.with_timezone(&Utc),
		})
	}
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
	async fn insert(&self, session: &Session) -> AuthResult<()> {
		sqlx::query(
			r#"
			INSERT INTO sessions (token_digest, admin_id, role, kind, issued_at, expires_at)
			VALUES (?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(&session.token_digest)
		.bind(session.admin_id.map(|id| id.to_string()))
		.bind(session.role.to_string())
		.bind(session.kind.to_string())
		.bind(session.issued_at.to_rfc3339())
		.bind(session.expires_at.to_rfc3339())
		.execute(&self.pool)
		.await?;
		Ok(())
	}

	async fn get(&self, token_digest: &str) -> AuthResult<Option<Session>> {
		let row: Option<SessionRow> = sqlx::query_as(
			r#"
			SELECT token_digest, admin_id, role, kind, issued_at, expires_at
			FROM sessions
			WHERE token_digest = ?
			"#,
		)
		.bind(token_digest)
		.fetch_optional(&self.pool)
		.await?;

		row.map(Session::try_from).transpose()
	}

	async fn remove(&self, token_digest: &str) -> AuthResult<bool> {
		let result = sqlx::query("DELETE FROM sessions WHERE token_digest = ?")
			.bind(token_digest)
			.execute(&self.pool)
			.await?;
		Ok(result.rows_affected() > 0)
	}

	async fn purge_expired(&self, now: DateTime<Utc>) -> AuthResult<u64> {
		let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
			.bind(now.to_rfc3339())
			.execute(&self.pool)
			.await?;
		Ok(result.rows_affected())
	}
}

/// Issues, verifies, and revokes gate and session credentials.
#[derive(Clone)]
pub struct SessionManager {
	store: Arc<dyn SessionStore>,
}

impl SessionManager {
	pub fn new(store: Arc<dyn SessionStore>) -> Self {
		Self { store }
	}

	/// Construct a manager over the in-memory store.
	pub fn in_memory() -> Self {
		Self::new(Arc::new(MemorySessionStore::new()))
	}

	/// Issue a fresh credential of the given kind.
	#[instrument(skip(self), fields(kind = %kind, role = %role))]
	pub async fn issue(
		&self,
		admin_id: Option<AdminId>,
		role: Role,
		kind: TokenKind,
		ttl: Duration,
	) -> AuthResult<IssuedSession> {
		let token = mint_token(kind);
		let issued_at = Utc::now();
		let session = Session {
			token_digest: token_digest(&token),
			admin_id,
			role,
			kind,
			issued_at,
			expires_at: issued_at + ttl,
		};

		self.store.insert(&session).await?;
		tracing::debug!(expires_at = %session.expires_at, "credential issued");

		Ok(IssuedSession { token, session })
	}

	/// Verify a presented token against the store.
	///
	/// Read-only and side-effect-free on the success path; an expired
	/// record is opportunistically removed.
	#[instrument(skip(self, token), fields(kind = %kind))]
	pub async fn verify(&self, token: &str, kind: TokenKind) -> AuthResult<Session> {
		if !token.starts_with(kind.prefix()) {
			return Err(AuthError::Invalid);
		}

		let digest = token_digest(token);
		let Some(session) = self.store.get(&digest).await? else {
			return Err(AuthError::Invalid);
		};

		if session.kind != kind {
			return Err(AuthError::Invalid);
		}

		if Utc::now() >= session.expires_at {
			let _ = self.store.remove(&digest).await;
			tracing::debug!("credential expired");
			return Err(AuthError::Expired);
		}

		Ok(session)
	}

	/// Revoke a credential. Returns false if it was not present.
	#[instrument(skip(self, token))]
	pub async fn revoke(&self, token: &str) -> AuthResult<bool> {
		self.store.remove(&token_digest(token)).await
	}

	/// Drop all expired records. Returns the number removed.
	pub async fn purge_expired(&self) -> AuthResult<u64> {
		self.store.purge_expired(Utc::now()).await
	}
}

fn mint_token(kind: TokenKind) -> String {
	let mut bytes = [0u8; TOKEN_BYTES];
	OsRng.fill_bytes(&mut bytes);
	format!("{}{}", kind.prefix(), hex::encode(bytes))
}

fn token_digest(token: &str) -> String {
	hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::create_session_test_pool;

	fn manager() -> SessionManager {
		SessionManager::in_memory()
	}

	mod issuance {
		use super::*;

		#[tokio::test]
		async fn issued_token_carries_kind_prefix() {
			let manager = manager();

			let gate = manager
				.issue(None, Role::GateOnly, TokenKind::Gate, Duration::hours(24))
				.await
				.unwrap();
			assert!(gate.token.starts_with("gk_"));

			let session = manager
				.issue(
					Some(AdminId::generate()),
					Role::Admin,
					TokenKind::Session,
					Duration::hours(24),
				)
				.await
				.unwrap();
			assert!(session.token.starts_with("gs_"));
		}

		#[tokio::test]
		async fn tokens_are_unique() {
			let manager = manager();
			let first = manager
				.issue(None, Role::GateOnly, TokenKind::Gate, Duration::hours(1))
				.await
				.unwrap();
			let second = manager
				.issue(None, Role::GateOnly, TokenKind::Gate, Duration::hours(1))
				.await
				.unwrap();

			assert_ne!(first.token, second.token);
		}

		#[tokio::test]
		async fn expiry_is_after_issuance() {
			let manager = manager();
			let issued = manager
				.issue(None, Role::GateOnly, TokenKind::Gate, Duration::hours(1))
				.await
				.unwrap();

			assert!(issued.session.expires_at > issued.session.issued_at);
		}
	}

	mod verification {
		use super::*;

		#[tokio::test]
		async fn verify_accepts_issued_token() {
			let manager = manager();
			let admin_id = AdminId::generate();
			let issued = manager
				.issue(
					Some(admin_id),
					Role::Admin,
					TokenKind::Session,
					Duration::hours(24),
				)
				.await
				.unwrap();

			let session = manager
				.verify(&issued.token, TokenKind::Session)
				.await
				.unwrap();
			assert_eq!(session.admin_id, Some(admin_id));
			assert_eq!(session.role, Role::Admin);
		}

		#[tokio::test]
		async fn verify_rejects_unknown_token() {
			let manager = manager();
			let result = manager
				.verify("gs_0000000000000000", TokenKind::Session)
				.await;
			assert!(matches!(result, Err(AuthError::Invalid)));
		}

		#[tokio::test]
		async fn verify_rejects_tampered_token() {
			let manager = manager();
			let issued = manager
				.issue(None, Role::GateOnly, TokenKind::Gate, Duration::hours(1))
				.await
				.unwrap();

			let mut tampered = issued.token.clone().into_bytes();
			let last = tampered.len() - 1;
			tampered[last] = if tampered[last] == b'0' { b'1' } else { b'0' };
			let tampered = String::from_utf8(tampered).unwrap();

			let result = manager.verify(&tampered, TokenKind::Gate).await;
			assert!(matches!(result, Err(AuthError::Invalid)));
		}

		#[tokio::test]
		async fn gate_token_is_not_a_session_token() {
			let manager = manager();
			let gate = manager
				.issue(None, Role::GateOnly, TokenKind::Gate, Duration::hours(1))
				.await
				.unwrap();

			let result = manager.verify(&gate.token, TokenKind::Session).await;
			assert!(matches!(result, Err(AuthError::Invalid)));
		}

		#[tokio::test]
		async fn verify_rejects_expired_token() {
			let manager = manager();
			let issued = manager
				.issue(
					Some(AdminId::generate()),
					Role::Admin,
					TokenKind::Session,
					Duration::milliseconds(50),
				)
				.await
				.unwrap();

			assert!(manager
				.verify(&issued.token, TokenKind::Session)
				.await
				.is_ok());

			tokio::time::sleep(std::time::Duration::from_millis(100)).await;

			let result = manager.verify(&issued.token, TokenKind::Session).await;
			assert!(matches!(result, Err(AuthError::Expired)));
		}

		#[tokio::test]
		async fn verify_after_revoke_is_invalid() {
			let manager = manager();
			let issued = manager
				.issue(None, Role::GateOnly, TokenKind::Gate, Duration::hours(1))
				.await
				.unwrap();

			assert!(manager.revoke(&issued.token).await.unwrap());
			let result = manager.verify(&issued.token, TokenKind::Gate).await;
			assert!(matches!(result, Err(AuthError::Invalid)));
		}

		#[tokio::test]
		async fn revoking_unknown_token_returns_false() {
			let manager = manager();
			assert!(!manager.revoke("gs_deadbeef").await.unwrap());
		}
	}

	mod purge {
		use super::*;

		#[tokio::test]
		async fn purge_removes_only_expired_records() {
			let manager = manager();
			manager
				.issue(None, Role::GateOnly, TokenKind::Gate, Duration::milliseconds(10))
				.await
				.unwrap();
			let live = manager
				.issue(None, Role::GateOnly, TokenKind::Gate, Duration::hours(1))
				.await
				.unwrap();

			tokio::time::sleep(std::time::Duration::from_millis(50)).await;

			assert_eq!(manager.purge_expired().await.unwrap(), 1);
			assert!(manager.verify(&live.token, TokenKind::Gate).await.is_ok());
		}
	}

	mod sqlite_store {
		use super::*;

		#[tokio::test]
		async fn roundtrip_through_sqlite() {
			let pool = create_session_test_pool().await;
			let manager = SessionManager::new(Arc::new(SqliteSessionStore::new(pool)));

			let admin_id = AdminId::generate();
			let issued = manager
				.issue(
					Some(admin_id),
					Role::Admin,
					TokenKind::Session,
					Duration::hours(24),
				)
				.await
				.unwrap();

			let session = manager
				.verify(&issued.token, TokenKind::Session)
				.await
				.unwrap();
			assert_eq!(session.admin_id, Some(admin_id));
			assert_eq!(session.kind, TokenKind::Session);
		}

		#[tokio::test]
		async fn revoke_deletes_row() {
			let pool = create_session_test_pool().await;
			let manager = SessionManager::new(Arc::new(SqliteSessionStore::new(pool)));

			let issued = manager
				.issue(None, Role::GateOnly, TokenKind::Gate, Duration::hours(1))
				.await
				.unwrap();

			assert!(manager.revoke(&issued.token).await.unwrap());
			assert!(matches!(
				manager.verify(&issued.token, TokenKind::Gate).await,
				Err(AuthError::Invalid)
			));
		}

		#[tokio::test]
		async fn purge_expired_deletes_rows() {
			let pool = create_session_test_pool().await;
			let manager = SessionManager::new(Arc::new(SqliteSessionStore::new(pool)));

			manager
				.issue(None, Role::GateOnly, TokenKind::Gate, Duration::milliseconds(10))
				.await
				.unwrap();

			tokio::time::sleep(std::time::Duration::from_millis(50)).await;
			assert_eq!(manager.purge_expired().await.unwrap(), 1);
		}
	}
}
