// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

pub type SettingsResult<T> = Result<T, SettingsError>;

#[derive(Error, Debug)]
pub enum SettingsError {
	#[error("database error: {0}")]
	Database(#[from] sqlx::Error),

	#[error("stored value is not valid JSON: {0}")]
	Serialization(#[from] serde_json::Error),

	#[error("internal error: {0}")]
	Internal(String),
}
