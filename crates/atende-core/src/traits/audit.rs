// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-way interaction audit sink.

use async_trait::async_trait;

use crate::error::AtendeError;
use crate::traits::adapter::PluginAdapter;
use crate::types::AuditEvent;

/// Receives one event per audited interaction.
///
/// Callers log and discard emission errors; they never abort message
/// processing.
#[async_trait]
pub trait AuditSink: PluginAdapter {
    async fn emit(&self, event: AuditEvent) -> Result<(), AtendeError>;
}
