// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::sink::SqliteAuditSink;

/// Single connection: every pooled connection to `:memory:` opens its
/// own database.
pub async fn create_test_pool() -> SqlitePool {
	SqlitePoolOptions::new()
		.max_connections(1)
		.connect(":memory:")
		.await
		.unwrap()
}

pub async fn create_audit_table(pool: &SqlitePool) {
	SqliteAuditSink::new(pool.clone()).migrate().await.unwrap();
}

pub async fn create_audit_test_pool() -> SqlitePool {
	let pool = create_test_pool().await;
	create_audit_table(&pool).await;
	pool
}
