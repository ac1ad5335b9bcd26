// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A terminal transport for the shell.
//!
//! Lines typed in the shell become inbound events; engine sends are printed
//! and, like a real transport, reported back as the device's own messages.
//! Media references are file paths.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use atende_core::types::{
    AdapterType, ChannelCapabilities, HealthStatus, InboundMessage, MediaRef, MessageId,
    OutboundMessage, QuotedMessage,
};
use atende_core::{AtendeError, ChannelAdapter, PluginAdapter};
use colored::Colorize;
use tokio::sync::mpsc;

pub struct ConsoleChannel {
    inbound_tx: mpsc::UnboundedSender<InboundMessage>,
    inbound_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<InboundMessage>>,
    photos: Mutex<HashMap<MessageId, QuotedMessage>>,
}

impl ConsoleChannel {
    pub fn new() -> Self {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        Self {
            inbound_tx,
            inbound_rx: tokio::sync::Mutex::new(inbound_rx),
            photos: Mutex::new(HashMap::new()),
        }
    }

    /// Queues a typed message. Photos are remembered so later messages can
    /// quote them.
    pub fn push(&self, msg: InboundMessage) -> Result<(), AtendeError> {
        if let Some(media) = &msg.media
            && let Ok(mut photos) = self.photos.lock()
        {
            photos.insert(
                msg.id.clone(),
                QuotedMessage {
                    id: msg.id.clone(),
                    body: msg.body.clone(),
                    has_media: true,
                    media: Some(media.clone()),
                },
            );
        }
        self.inbound_tx
            .send(msg)
            .map_err(|_| AtendeError::Channel {
                message: "console channel closed".to_string(),
                source: None,
            })
    }
}

impl Default for ConsoleChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for ConsoleChannel {
    fn name(&self) -> &str {
        "console"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, AtendeError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl ChannelAdapter for ConsoleChannel {
    fn capabilities(&self) -> ChannelCapabilities {
        ChannelCapabilities {
            supports_media: true,
            supports_quotes: true,
            returns_message_ids: true,
        }
    }

    async fn connect(&mut self) -> Result<(), AtendeError> {
        Ok(())
    }

    async fn send(&self, msg: OutboundMessage) -> Result<Option<MessageId>, AtendeError> {
        let id = MessageId(uuid::Uuid::new_v4().to_string());
        println!("{} {}", format!("[{}]", msg.device_id).green().bold(), msg.body);

        // The transport reports the device's own sends back.
        let echo = InboundMessage::text(&msg.device_id, &msg.channel_id, &msg.body)
            .with_id(&id.0)
            .from_self();
        self.push(echo)?;
        Ok(Some(id))
    }

    async fn receive(&self) -> Result<InboundMessage, AtendeError> {
        self.inbound_rx
            .lock()
            .await
            .recv()
            .await
            .ok_or_else(|| AtendeError::Channel {
                message: "console channel closed".to_string(),
                source: None,
            })
    }

    async fn download_media(&self, media: &MediaRef) -> Result<Vec<u8>, AtendeError> {
        tokio::fs::read(&media.0)
            .await
            .map_err(|e| AtendeError::MediaDownload {
                message: format!("cannot read `{}`: {e}", media.0),
                source: Some(Box::new(e)),
            })
    }

    async fn quoted_message(&self, id: &MessageId) -> Result<Option<QuotedMessage>, AtendeError> {
        let photos = self
            .photos
            .lock()
            .map_err(|_| AtendeError::Internal("console photo table poisoned".to_string()))?;
        Ok(photos.get(id).cloned())
    }

    async fn is_connected(&self, _device_id: &str) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sends_come_back_as_own_messages() {
        let channel = ConsoleChannel::new();
        let id = channel
            .send(OutboundMessage {
                device_id: "loja".into(),
                channel_id: "5511@c.us".into(),
                body: "Olá!".into(),
            })
            .await
            .unwrap()
            .unwrap();

        let echo = channel.receive().await.unwrap();
        assert!(echo.is_from_self);
        assert_eq!(echo.id, id);
        assert_eq!(echo.body, "Olá!");
    }

    #[tokio::test]
    async fn photos_can_be_quoted() {
        let channel = ConsoleChannel::new();
        channel
            .push(
                InboundMessage::text("loja", "5511@c.us", "")
                    .with_id("p-1")
                    .with_media("/tmp/print.png"),
            )
            .unwrap();

        let quoted = channel
            .quoted_message(&MessageId("p-1".into()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(quoted.media, Some(MediaRef("/tmp/print.png".into())));
    }

    #[tokio::test]
    async fn missing_file_is_a_download_error() {
        let channel = ConsoleChannel::new();
        let err = channel
            .download_media(&MediaRef("/definitely/not/here.png".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, AtendeError::MediaDownload { .. }));
    }
}
