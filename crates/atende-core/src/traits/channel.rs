// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel adapter trait for the chat transport.

use async_trait::async_trait;

use crate::error::AtendeError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    ChannelCapabilities, InboundMessage, MediaRef, MessageId, OutboundMessage, QuotedMessage,
};

/// Adapter for the chat transport that carries every device session.
///
/// Inbound events include messages typed by the device owner and echoes of
/// messages the engine sent itself (`is_from_self`).
#[async_trait]
pub trait ChannelAdapter: PluginAdapter {
    /// Returns the capabilities supported by this transport.
    fn capabilities(&self) -> ChannelCapabilities;

    /// Establishes the transport sessions.
    async fn connect(&mut self) -> Result<(), AtendeError>;

    /// Sends a message. Returns the transport message id when the transport
    /// assigns one synchronously.
    ///
    /// Fails with [`AtendeError::NotReady`] when the device session exists but
    /// is currently disconnected.
    async fn send(&self, msg: OutboundMessage) -> Result<Option<MessageId>, AtendeError>;

    /// Receives the next inbound event from any device session.
    async fn receive(&self) -> Result<InboundMessage, AtendeError>;

    /// Downloads the bytes of an attached media item.
    async fn download_media(&self, media: &MediaRef) -> Result<Vec<u8>, AtendeError>;

    /// Looks up a quoted message by id.
    async fn quoted_message(&self, id: &MessageId) -> Result<Option<QuotedMessage>, AtendeError>;

    /// Whether the session of `device_id` can currently send.
    async fn is_connected(&self, device_id: &str) -> bool;
}
