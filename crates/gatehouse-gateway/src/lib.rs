// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The administrative trust gate.
//!
//! [`AdminGateway`] is the single entry point request handlers call into.
//! It resolves the two opaque credentials (gate, session) into an access
//! context, rate-limits authentication attempts, enforces capabilities,
//! and audits state-changing operations. How credentials travel (cookies,
//! headers) is the transport layer's concern; the gateway only sees
//! strings.
//!
//! # Request Flow
//!
//! ```text
//! Request → RateLimiter → credential verification → AccessContext
//!               │                                        │
//!            reject early                          canAccess(resource,
//!            on abuse                              action) → handler →
//!                                                  AuditLog
//! ```

pub mod config;
pub mod error;
pub mod gateway;

pub use config::{GatewayConfig, RateQuota};
pub use error::{GatewayError, GatewayResult};
pub use gateway::{AdminGateway, RequestCredentials};
