// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock channel adapter for deterministic testing.
//!
//! `MockChannel` implements `ChannelAdapter` with injectable inbound events,
//! stored media and quoted messages, and captured outbound messages for
//! assertion in tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use atende_core::AtendeError;
use atende_core::traits::adapter::PluginAdapter;
use atende_core::traits::channel::ChannelAdapter;
use atende_core::types::{
    AdapterType, ChannelCapabilities, HealthStatus, InboundMessage, MediaRef, MessageId,
    OutboundMessage, QuotedMessage,
};

/// A mock transport for testing.
///
/// Provides two queues:
/// - **inbound**: events injected via `inject_message()` are returned by `receive()`
/// - **sent**: messages passed to `send()` are captured and retrievable via `sent_messages()`
pub struct MockChannel {
    inbound: Arc<Mutex<VecDeque<InboundMessage>>>,
    sent: Arc<Mutex<Vec<OutboundMessage>>>,
    media: Mutex<HashMap<MediaRef, Vec<u8>>>,
    quoted: Mutex<HashMap<MessageId, QuotedMessage>>,
    notify: Arc<Notify>,
    connected: AtomicBool,
    closed: AtomicBool,
    fail_sends: AtomicBool,
    next_id: AtomicU64,
}

impl MockChannel {
    /// Create a new connected mock channel with empty queues.
    pub fn new() -> Self {
        Self {
            inbound: Arc::new(Mutex::new(VecDeque::new())),
            sent: Arc::new(Mutex::new(Vec::new())),
            media: Mutex::new(HashMap::new()),
            quoted: Mutex::new(HashMap::new()),
            notify: Arc::new(Notify::new()),
            connected: AtomicBool::new(true),
            closed: AtomicBool::new(false),
            fail_sends: AtomicBool::new(false),
            next_id: AtomicU64::new(1),
        }
    }

    /// Inject an inbound event into the receive queue.
    pub async fn inject_message(&self, msg: InboundMessage) {
        self.inbound.lock().await.push_back(msg);
        self.notify.notify_one();
    }

    /// Makes `receive()` fail with a "channel closed" error once the queue
    /// is empty.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    /// Stores downloadable bytes for `media`.
    pub async fn put_media(&self, media: &str, bytes: &[u8]) {
        self.media
            .lock()
            .await
            .insert(MediaRef(media.to_string()), bytes.to_vec());
    }

    /// Stores a message that later events can quote.
    pub async fn put_quoted(&self, message: QuotedMessage) {
        self.quoted.lock().await.insert(message.id.clone(), message);
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Makes every following `send()` fail with a channel error.
    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Get all messages that were sent through `send()`.
    pub async fn sent_messages(&self) -> Vec<OutboundMessage> {
        self.sent.lock().await.clone()
    }

    /// Bodies sent to `channel_id`, in order.
    pub async fn sent_to(&self, channel_id: &str) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|m| m.channel_id == channel_id)
            .map(|m| m.body.clone())
            .collect()
    }

    /// Get the count of sent messages.
    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    /// Clear all sent messages.
    pub async fn clear_sent(&self) {
        self.sent.lock().await.clear();
    }
}

impl Default for MockChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockChannel {
    fn name(&self) -> &str {
        "mock-channel"
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
impl ChannelAdapter for MockChannel {
    fn capabilities(&self) -> ChannelCapabilities {
        ChannelCapabilities {
            supports_media: true,
            supports_quotes: true,
            returns_message_ids: true,
        }
    }

    async fn connect(&mut self) -> Result<(), AtendeError> {
        self.set_connected(true);
        Ok(())
    }

    async fn send(&self, msg: OutboundMessage) -> Result<Option<MessageId>, AtendeError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(AtendeError::NotReady {
                session: msg.device_id,
            });
        }
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(AtendeError::Channel {
                message: "mock send failure".to_string(),
                source: None,
            });
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.sent.lock().await.push(msg);
        Ok(Some(MessageId(format!("mock-msg-{id}"))))
    }

    async fn receive(&self) -> Result<InboundMessage, AtendeError> {
        loop {
            {
                let mut queue = self.inbound.lock().await;
                if let Some(msg) = queue.pop_front() {
                    return Ok(msg);
                }
            }
            if self.closed.load(Ordering::SeqCst) {
                return Err(AtendeError::Channel {
                    message: "channel closed".to_string(),
                    source: None,
                });
            }
            self.notify.notified().await;
        }
    }

    async fn download_media(&self, media: &MediaRef) -> Result<Vec<u8>, AtendeError> {
        self.media
            .lock()
            .await
            .get(media)
            .cloned()
            .ok_or_else(|| AtendeError::MediaDownload {
                message: format!("no media `{}`", media.0),
                source: None,
            })
    }

    async fn quoted_message(&self, id: &MessageId) -> Result<Option<QuotedMessage>, AtendeError> {
        Ok(self.quoted.lock().await.get(id).cloned())
    }

    async fn is_connected(&self, _device_id: &str) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
