// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Audit trail of conversation events.

use async_trait::async_trait;
use atende_core::types::{AdapterType, AuditEvent, HealthStatus};
use atende_core::{AtendeError, AuditSink, PluginAdapter};
use tracing::{info, warn};

/// Writes audit events as structured `info` logs.
#[derive(Debug, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl PluginAdapter for TracingAuditSink {
    fn name(&self) -> &str {
        "tracing-audit"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Audit
    }

    async fn health_check(&self) -> Result<HealthStatus, AtendeError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn emit(&self, event: AuditEvent) -> Result<(), AtendeError> {
        let error = match &event.error {
            Some(e) => serde_json::to_string(e).map_err(|e| AtendeError::Internal(e.to_string()))?,
            None => String::new(),
        };
        info!(
            device_id = %event.device_id,
            phone = %event.phone,
            name = event.name.as_deref().unwrap_or(""),
            contact_type = %event.contact_type,
            origin = %event.origin,
            event_type = %event.event_type,
            content = %event.content,
            error = %error,
            "audit"
        );
        Ok(())
    }
}

/// Emits `event`, logging instead of propagating a sink failure.
pub async fn emit(sink: &dyn AuditSink, event: AuditEvent) {
    let event_type = event.event_type;
    if let Err(e) = sink.emit(event).await {
        warn!(sink = sink.name(), %event_type, error = %e, "audit emit failed");
    }
}
