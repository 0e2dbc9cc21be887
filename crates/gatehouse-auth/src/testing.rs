// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::session::SqliteSessionStore;

/// Single connection: every pooled connection to `:memory:` opens its
/// own database.
pub async fn create_test_pool() -> SqlitePool {
	SqlitePoolOptions::new()
		.max_connections(1)
		.connect(":memory:")
		.await
		.unwrap()
}

pub async fn create_sessions_table(pool: &SqlitePool) {
	SqliteSessionStore::new(pool.clone())
		.migrate()
		.await
		.unwrap();
}

pub async fn create_session_test_pool() -> SqlitePool {
	let pool = create_test_pool().await;
	create_sessions_table(&pool).await;
	pool
}
