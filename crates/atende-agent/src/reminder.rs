// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivers follow-up reminders through the transport.

use std::sync::Arc;

use async_trait::async_trait;
use atende_catalog::{ConfigResolver, render};
use atende_core::types::{AuditEvent, AuditEventType, ContactType, Origin};
use atende_core::{AtendeError, AuditSink};
use atende_followup::{FollowUpRecord, FollowUpSender};

use crate::audit;
use crate::outbox::Outbox;

/// [`FollowUpSender`] that renders the reminder text with the device's
/// catalog variables and sends it through the [`Outbox`].
pub struct ChannelFollowUpSender {
    outbox: Arc<Outbox>,
    resolver: Arc<ConfigResolver>,
    audit: Arc<dyn AuditSink>,
    template: String,
}

impl ChannelFollowUpSender {
    pub fn new(
        outbox: Arc<Outbox>,
        resolver: Arc<ConfigResolver>,
        audit: Arc<dyn AuditSink>,
        template: String,
    ) -> Self {
        Self {
            outbox,
            resolver,
            audit,
            template,
        }
    }
}

#[async_trait]
impl FollowUpSender for ChannelFollowUpSender {
    async fn send_follow_up(&self, record: &FollowUpRecord) -> Result<(), AtendeError> {
        if !self.outbox.channel().is_connected(&record.device_id).await {
            return Err(AtendeError::NotReady {
                session: record.session_name.clone(),
            });
        }
        let mut vars = self.resolver.variables_map(&record.device_id).await;
        vars.insert("name".to_string(), record.client_name.clone());
        let body = render(&self.template, &vars);
        self.outbox
            .send(&record.device_id, &record.chat_id, &body)
            .await?;
        audit::emit(
            self.audit.as_ref(),
            AuditEvent {
                device_id: record.device_id.clone(),
                phone: record.contact_phone.clone(),
                name: Some(record.client_name.clone()),
                contact_type: ContactType::Client,
                origin: Origin::Engine,
                event_type: AuditEventType::FollowUpSent,
                content: body,
                error: None,
            },
        )
        .await;
        Ok(())
    }
}
