// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core event types for the audit trail.
//!
//! - [`AuditEventType`]: enumeration of auditable admin actions
//! - [`AuditSeverity`]: RFC 5424-compatible severity levels
//! - [`AuditRecord`]: the append-only record
//! - [`AuditRecordBuilder`]: fluent construction

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use uuid::Uuid;

/// Types of events recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
	// Install lifecycle
	Installed,

	// Gate events
	GateUnlocked,
	GateUnlockFailed,
	GatePasswordChanged,

	// Authentication events
	Login,
	LoginFailed,
	Logout,

	// Session events
	SessionRevoked,
	SessionExpired,

	// Settings events
	SettingWritten,
	SettingDeleted,
	SecretsUpdated,
	AdminAccountUpdated,

	// Access control events
	AccessDenied,

	// Operational events
	ContentModerated,
	MaintenanceRun,
}

impl fmt::Display for AuditEventType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			AuditEventType::Installed => "installed",
			AuditEventType::GateUnlocked => "gate_unlocked",
			AuditEventType::GateUnlockFailed => "gate_unlock_failed",
			AuditEventType::GatePasswordChanged => "gate_password_changed",
			AuditEventType::Login => "login",
			AuditEventType::LoginFailed => "login_failed",
			AuditEventType::Logout => "logout",
			AuditEventType::SessionRevoked => "session_revoked",
			AuditEventType::SessionExpired => "session_expired",
			AuditEventType::SettingWritten => "setting_written",
			AuditEventType::SettingDeleted => "setting_deleted",
			AuditEventType::SecretsUpdated => "secrets_updated",
			AuditEventType::AdminAccountUpdated => "admin_account_updated",
			AuditEventType::AccessDenied => "access_denied",
			AuditEventType::ContentModerated => "content_moderated",
			AuditEventType::MaintenanceRun => "maintenance_run",
		};
		write!(f, "{s}")
	}
}

impl AuditEventType {
	/// Returns the default severity for this event type.
	///
	/// Mapping follows RFC 5424 conventions: `Info` for normal
	/// operations, `Warning` for security-relevant failures, `Notice`
	/// for administrative or destructive actions.
	pub fn default_severity(&self) -> AuditSeverity {
		match self {
			AuditEventType::Installed
			| AuditEventType::GateUnlocked
			| AuditEventType::Login
			| AuditEventType::Logout
			| AuditEventType::SettingWritten
			| AuditEventType::MaintenanceRun => AuditSeverity::Info,

			AuditEventType::GateUnlockFailed
			| AuditEventType::LoginFailed
			| AuditEventType::AccessDenied => AuditSeverity::Warning,

			AuditEventType::GatePasswordChanged
			| AuditEventType::SessionRevoked
			| AuditEventType::SessionExpired
			| AuditEventType::SettingDeleted
			| AuditEventType::SecretsUpdated
			| AuditEventType::AdminAccountUpdated
			| AuditEventType::ContentModerated => AuditSeverity::Notice,
		}
	}
}

/// Severity levels for audit events, compatible with RFC 5424 syslog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuditSeverity {
	Debug = 7,
	#[default]
	Info = 6,
	Notice = 5,
	Warning = 4,
	Error = 3,
	Critical = 2,
}

impl AuditSeverity {
	/// Returns the RFC 5424 numeric severity code.
	pub fn as_syslog_code(&self) -> u8 {
		*self as u8
	}
}

impl PartialOrd for AuditSeverity {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for AuditSeverity {
	fn cmp(&self, other: &Self) -> Ordering {
		// Lower numeric value = higher severity (Critical=2 > Debug=7)
		(*other as u8).cmp(&(*self as u8))
	}
}

impl fmt::Display for AuditSeverity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			AuditSeverity::Debug => "debug",
			AuditSeverity::Info => "info",
			AuditSeverity::Notice => "notice",
			AuditSeverity::Warning => "warning",
			AuditSeverity::Error => "error",
			AuditSeverity::Critical => "critical",
		};
		write!(f, "{s}")
	}
}

/// An append-only record of a privileged action.
///
/// Never mutated or deleted by normal operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
	/// Unique identifier for this record.
	pub id: Uuid,
	/// When the event occurred.
	pub timestamp: DateTime<Utc>,
	/// The type of event.
	pub event_type: AuditEventType,
	/// The severity level of this event.
	pub severity: AuditSeverity,
	/// Stable label for who performed the action (`admin:<id>`, `gate`),
	/// if known.
	pub actor: Option<String>,
	/// Human-readable description of the action.
	pub action: String,
	/// Additional event-specific details.
	pub details: serde_json::Value,
	/// IP address of the request origin.
	pub ip_address: Option<String>,
}

impl AuditRecord {
	/// Start building a record of the given type.
	pub fn builder(event_type: AuditEventType) -> AuditRecordBuilder {
		AuditRecordBuilder::new(event_type)
	}
}

/// Fluent builder for [`AuditRecord`].
#[derive(Debug)]
pub struct AuditRecordBuilder {
	event_type: AuditEventType,
	severity: Option<AuditSeverity>,
	actor: Option<String>,
	action: Option<String>,
	details: serde_json::Value,
	ip_address: Option<String>,
}

impl AuditRecordBuilder {
	fn new(event_type: AuditEventType) -> Self {
		Self {
			event_type,
			severity: None,
			actor: None,
			action: None,
			details: serde_json::Value::Null,
			ip_address: None,
		}
	}

	pub fn severity(mut self, severity: AuditSeverity) -> Self {
		self.severity = Some(severity);
		self
	}

	pub fn actor(mut self, actor: impl Into<String>) -> Self {
		self.actor = Some(actor.into());
		self
	}

	pub fn action(mut self, action: impl Into<String>) -> Self {
		self.action = Some(action.into());
		self
	}

	pub fn details(mut self, details: serde_json::Value) -> Self {
		self.details = details;
		self
	}

	pub fn ip_address(mut self, ip: impl Into<String>) -> Self {
		self.ip_address = Some(ip.into());
		self
	}

	pub fn build(self) -> AuditRecord {
		AuditRecord {
			id: Uuid::new_v4(),
			timestamp: Utc::now(),
			severity: self
				.severity
				.unwrap_or_else(|| self.event_type.default_severity()),
			action: self.action.unwrap_or_else(|| self.event_type.to_string()),
			event_type: self.event_type,
			actor: self.actor,
			details: self.details,
			ip_address: self.ip_address,
		}
	}
}
