// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Settings repository.
//!
//! A flat key-to-JSON map with upsert semantics: `set` on an existing key
//! overwrites the whole value, never a partial merge. Writers to distinct
//! keys proceed in parallel; concurrent writers to the *same* key race
//! last-write-wins; there is no optimistic locking, and callers must not
//! assume read-after-write consistency across connections beyond what
//! SQLite provides.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePool, Row};
use tracing::instrument;

use crate::error::{SettingsError, SettingsResult};

/// A single settings row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingEntry {
	pub key: String,
	pub value: serde_json::Value,
	pub updated_at: DateTime<Utc>,
}

/// Storage contract for settings.
#[async_trait]
pub trait SettingsStore: Send + Sync {
	/// Read a value. Absent keys return `None`, not an error.
	async fn get(&self, key: &str) -> SettingsResult<Option<serde_json::Value>>;

	/// Read a full entry including its update timestamp.
	async fn get_entry(&self, key: &str) -> SettingsResult<Option<SettingEntry>>;

	/// Create or fully overwrite a value.
	async fn set(&self, key: &str, value: &serde_json::Value) -> SettingsResult<()>;

	/// Delete a key. Returns false if it was not present.
	async fn delete(&self, key: &str) -> SettingsResult<bool>;

	/// List all keys.
	async fn keys(&self) -> SettingsResult<Vec<String>>;
}

/// SQLite implementation of the settings store.
#[derive(Clone)]
pub struct SqliteSettingsStore {
	pool: SqlitePool,
}

impl SqliteSettingsStore {
	/// Create a new settings store over the given pool.
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Create the settings table if it does not exist.
	pub async fn migrate(&self) -> SettingsResult<()> {
		sqlx::query(
			r#"
			CREATE TABLE IF NOT EXISTS settings (
				key TEXT PRIMARY KEY,
				value TEXT NOT NULL,
				updated_at TEXT NOT NULL
			)
			"#,
		)
		.execute(&self.pool)
		.await?;
		Ok(())
	}
}

#[async_trait]
impl SettingsStore for SqliteSettingsStore {
	#[instrument(skip(self))]
	async fn get(&self, key: &str) -> SettingsResult<Option<serde_json::Value>> {
		let row = sqlx::query("SELECT value FROM settings WHERE key = ?")
			.bind(key)
			.fetch_optional(&self.pool)
			.await?;

		match row {
			Some(row) => {
				let raw: String = row.try_get("value")?;
				Ok(Some(serde_json::from_str(&raw)?))
			}
			None => Ok(None),
		}
	}

	#[instrument(skip(self))]
	async fn get_entry(&self, key: &str) -> SettingsResult<Option<SettingEntry>> {
		let row = sqlx::query("SELECT key, value, updated_at FROM settings WHERE key = ?")
			.bind(key)
			.fetch_optional(&self.pool)
			.await?;

		match row {
			Some(row) => {
				let raw: String = row.try_get("value")?;
				let updated_at: String = row.try_get("updated_at")?;
				Ok(Some(SettingEntry {
					key: row.try_get("key")?,
					value: serde_json::from_str(&raw)?,
					updated_at: DateTime::parse_from_rfc3339(&updated_at)
						.map_err(|e| SettingsError::Internal(format!("invalid updated_at: {e}")))?
						.with_timezone(&Utc),
				}))
			}
			None => Ok(None),
		}
	}

	#[instrument(skip(self, value))]
	async fn set(&self, key: &str, value: &serde_json::Value) -> SettingsResult<()> {
		let raw = serde_json::to_string(value)?;
		let now = Utc::now();

		sqlx::query(
			r#"
			INSERT INTO settings (key, value, updated_at)
			VALUES (?, ?, ?)
			ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
			"#,
		)
		.bind(key)
		.bind(&raw)
		.bind(now.to_rfc3339())
		.execute(&self.pool)
		.await?;

		tracing::debug!("setting written");
		Ok(())
	}

	#[instrument(skip(self))]
	async fn delete(&self, key: &str) -> SettingsResult<bool> {
		let result = sqlx::query("DELETE FROM settings WHERE key = ?")
			.bind(key)
			.execute(&self.pool)
			.await?;

		Ok(result.rows_affected() > 0)
	}

	#[instrument(skip(self))]
	async fn keys(&self) -> SettingsResult<Vec<String>> {
		let rows = sqlx::query("SELECT key FROM settings ORDER BY key")
			.fetch_all(&self.pool)
			.await?;

		rows
			.into_iter()
			.map(|row| row.try_get::<String, _>("key").map_err(SettingsError::from))
			.collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::create_settings_test_pool;
	use serde_json::json;

	async fn store() -> SqliteSettingsStore {
		SqliteSettingsStore::new(create_settings_test_pool().await)
	}

	#[tokio::test]
	async fn get_absent_key_returns_none() {
		let store = store().await;
		assert_eq!(store.get("missing").await.unwrap(), None);
	}

	#[tokio::test]
	async fn set_then_get_roundtrips() {
		let store = store().await;
		let value = json!({"title": "Acme", "features": ["chat", "reviews"]});

		store.set("site_config", &value).await.unwrap();
		assert_eq!(store.get("site_config").await.unwrap(), Some(value));
	}

	#[tokio::test]
	async fn set_overwrites_full_value() {
		let store = store().await;

		store
			.set("site_config", &json!({"a": 1, "b": 2}))
			.await
			.unwrap();
		store.set("site_config", &json!({"a": 3})).await.unwrap();

		// No merge: "b" is gone.
		assert_eq!(
			store.get("site_config").await.unwrap(),
			Some(json!({"a": 3}))
		);
	}

	#[tokio::test]
	async fn set_bumps_updated_at() {
		let store = store().await;

		store.set("k", &json!(1)).await.unwrap();
		let first = store.get_entry("k").await.unwrap().unwrap();

		tokio::time::sleep(std::time::Duration::from_millis(10)).await;

		store.set("k", &json!(2)).await.unwrap();
		let second = store.get_entry("k").await.unwrap().unwrap();

		assert!(second.updated_at > first.updated_at);
		assert_eq!(second.value, json!(2));
	}

	#[tokio::test]
	async fn delete_removes_key() {
		let store = store().await;

		store.set("k", &json!("v")).await.unwrap();
		assert!(store.delete("k").await.unwrap());
		assert_eq!(store.get("k").await.unwrap(), None);
	}

	#[tokio::test]
	async fn delete_absent_key_returns_false() {
		let store = store().await;
		assert!(!store.delete("missing").await.unwrap());
	}

	#[tokio::test]
	async fn keys_lists_all_keys_sorted() {
		let store = store().await;

		store.set("b", &json!(2)).await.unwrap();
		store.set("a", &json!(1)).await.unwrap();

		assert_eq!(store.keys().await.unwrap(), vec!["a", "b"]);
	}

	#[tokio::test]
	async fn distinct_keys_write_concurrently() {
		let store = std::sync::Arc::new(store().await);

		let tasks: Vec<_> = (0..8)
			.map(|i| {
				let store = std::sync::Arc::clone(&store);
				tokio::spawn(async move {
					store
						.set(&format!("key_{i}"), &json!({ "n": i }))
						.await
						.unwrap();
				})
			})
			.collect();

		for task in tasks {
			task.await.unwrap();
		}

		assert_eq!(store.keys().await.unwrap().len(), 8);
	}
}
