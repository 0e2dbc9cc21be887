// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AuditSinkError;
use crate::event::AuditRecord;
use crate::sink::AuditSink;

/// Sink that emits audit records as structured tracing events.
///
/// Useful on its own in development and as a secondary sink in
/// production where logs are shipped anyway.
pub struct TracingAuditSink {
	name: String,
}

impl TracingAuditSink {
	pub fn new() -> Self {
		Self {
			name: "tracing".to_string(),
		}
	}
}

impl Default for TracingAuditSink {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl AuditSink for TracingAuditSink {
	fn name(&self) -> &str {
		&self.name
	}

	async fn publish(&self, record: Arc<AuditRecord>) -> Result<(), AuditSinkError> {
		tracing::info!(
			target: "audit",
			id = %record.id,
			event_type = %record.event_type,
			severity = %record.severity,
			actor = record.actor.as_deref().unwrap_or("-"),
			action = %record.action,
			ip_address = record.ip_address.as_deref().unwrap_or("-"),
			details = %record.details,
			"audit event"
		);
		Ok(())
	}
}
