// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The single path for messages the engine sends.

use std::sync::Arc;

use atende_core::types::{MessageId, OutboundMessage};
use atende_core::{AtendeError, ChannelAdapter};
use tracing::debug;

use crate::echo::EchoSuppressor;

/// Sends through the transport, fingerprinting every message so its echo
/// is recognized.
pub struct Outbox {
    channel: Arc<dyn ChannelAdapter>,
    echo: Arc<EchoSuppressor>,
}

impl Outbox {
    pub fn new(channel: Arc<dyn ChannelAdapter>, echo: Arc<EchoSuppressor>) -> Self {
        Self { channel, echo }
    }

    pub fn channel(&self) -> &Arc<dyn ChannelAdapter> {
        &self.channel
    }

    pub fn echo(&self) -> &EchoSuppressor {
        &self.echo
    }

    /// Registers the body fingerprint, sends, then registers the message id
    /// when the transport returns one.
    pub async fn send(
        &self,
        device_id: &str,
        channel_id: &str,
        body: &str,
    ) -> Result<Option<MessageId>, AtendeError> {
        self.echo.mark_sent(channel_id, body);
        let id = self
            .channel
            .send(OutboundMessage {
                device_id: device_id.to_string(),
                channel_id: channel_id.to_string(),
                body: body.to_string(),
            })
            .await?;
        if let Some(id) = &id {
            self.echo.mark_sent_id(&id.0);
        }
        debug!(device_id, channel_id, "message sent");
        Ok(id)
    }
}
