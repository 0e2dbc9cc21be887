// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Durable key-to-JSON settings store.
//!
//! Backs site configuration, the gate password record, the install
//! marker, and the encrypted provider credentials envelope. Values for
//! sensitive keys are hash records or cipher envelopes; plaintext secrets
//! never land here.

pub mod error;
pub mod keys;
pub mod pool;
pub mod store;
pub mod testing;

pub use error::{SettingsError, SettingsResult};
pub use pool::create_pool;
pub use store::{SettingEntry, SettingsStore, SqliteSettingsStore};
