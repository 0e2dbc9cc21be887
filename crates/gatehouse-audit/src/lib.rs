// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Append-only audit trail of privileged admin actions.
//!
//! Records flow through a bounded queue into one or more sinks. Audit is
//! best-effort relative to the action it describes: a sink failure is
//! reported on the operational error channel and never rolls back or
//! fails the audited operation. State-changing callers use
//! [`AuditLog::record_blocking`] to enqueue before responding success,
//! keeping loss rare.

pub mod error;
pub mod event;
pub mod service;
pub mod sink;
pub mod testing;

pub use error::{AuditError, AuditResult, AuditSinkError};
pub use event::{AuditEventType, AuditRecord, AuditRecordBuilder, AuditSeverity};
pub use service::AuditLog;
pub use sink::{AuditSink, SqliteAuditSink, TracingAuditSink};
