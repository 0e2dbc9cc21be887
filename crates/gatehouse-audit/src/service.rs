// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Audit queue and sink fan-out.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{instrument, warn};

use crate::event::AuditRecord;
use crate::sink::AuditSink;

/// Default capacity of the audit queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 10_000;

/// Handle for appending to the audit trail.
///
/// Constructed once at process start and cloned into request handlers.
/// Appending never fails the caller: a full queue or a broken sink is
/// reported through `tracing` and the audited action proceeds.
#[derive(Clone)]
pub struct AuditLog {
	tx: mpsc::Sender<AuditRecord>,
}

impl AuditLog {
	pub fn new(queue_capacity: usize, sinks: Vec<Arc<dyn AuditSink>>) -> Self {
		let (tx, rx) = mpsc::channel(queue_capacity);

		tokio::spawn(Self::background_task(rx, sinks));

		Self { tx }
	}

	async fn background_task(mut rx: mpsc::Receiver<AuditRecord>, sinks: Vec<Arc<dyn AuditSink>>) {
		while let Some(record) = rx.recv().await {
			let record = Arc::new(record);

			for sink in &sinks {
				let sink = Arc::clone(sink);
				let record = Arc::clone(&record);

				tokio::spawn(async move {
					if let Err(e) = sink.publish(record).await {
						warn!(sink = sink.name(), error = %e, "audit sink publish failed");
					}
				});
			}
		}
	}

	/// Enqueue a record, dropping it if the queue is full.
	///
	/// Returns `true` if the record was queued.
	#[instrument(skip(self, record), fields(event_type = %record.event_type))]
	pub fn record(&self, record: AuditRecord) -> bool {
		let queued = self.tx.try_send(record).is_ok();
		if !queued {
			warn!("audit queue full, record dropped");
		}
		queued
	}

	/// Enqueue a record, waiting for queue space.
	///
	/// State-changing operations call this before reporting success so
	/// records are only lost if the process dies with the queue drained.
	/// Returns `false` (and logs) if the audit task has shut down.
	#[instrument(skip(self, record), fields(event_type = %record.event_type))]
	pub async fn record_blocking(&self, record: AuditRecord) -> bool {
		let queued = self.tx.send(record).await.is_ok();
		if !queued {
			warn!("audit channel closed, record dropped");
		}
		queued
	}
}
