// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authenticated encryption of configuration secrets at rest.
//!
//! Sensitive settings (provider API keys, credentials) are stored as
//! AES-256-GCM envelopes rather than plaintext JSON. The cipher key is
//! derived from an operator-supplied passphrase; the passphrase itself is
//! never used as key material directly.

pub mod cipher;
pub mod error;

pub use cipher::{SecretCipher, KEY_SIZE, NONCE_SIZE, TAG_SIZE};
pub use error::{SecretsError, SecretsResult};
