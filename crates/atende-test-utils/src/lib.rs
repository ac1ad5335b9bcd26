// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Atende integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic tests without a transport, an OCR binary or a
//! provisioning upstream.
//!
//! # Components
//!
//! - [`MockChannel`] - Mock transport with event injection, media and capture
//! - [`MockOcr`], [`MockProvisioning`], [`MockAuditSink`] - Collaborator mocks
//! - [`TestHarness`] - A conversation engine wired to all of the above

pub mod harness;
pub mod mock_adapters;
pub mod mock_channel;

pub use harness::{CHAT, DEVICE, TestHarness};
pub use mock_adapters::{MockAuditSink, MockOcr, MockProvisioning};
pub use mock_channel::MockChannel;
