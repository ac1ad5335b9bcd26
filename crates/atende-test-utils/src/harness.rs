// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end conversation testing.
//!
//! `TestHarness` assembles a conversation engine with mock adapters, an
//! in-memory catalog and an in-memory follow-up scheduler. It drives the
//! engine directly, one event at a time, the way a device worker does.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use atende_agent::{
    ChannelFollowUpSender, ConversationEngine, ConversationState, EchoSuppressor, EngineContext,
    EngineSettings, Outbox, PendingIdentifierRequest, ProductTable,
};
use atende_catalog::{CatalogSeed, ConfigResolver, MemoryCatalogStore};
use atende_config::AtendeConfig;
use atende_core::AtendeError;
use atende_core::types::{InboundMessage, TrialRequest};
use atende_followup::FollowUpScheduler;

use crate::mock_adapters::{MockAuditSink, MockOcr, MockProvisioning};
use crate::mock_channel::MockChannel;

/// Device every harness engine runs for.
pub const DEVICE: &str = "loja";

/// Chat of the default contact.
pub const CHAT: &str = "5511999990000@c.us";

/// Commands for the built-in products.
const DEFAULT_SEED: &str = r##"
[[commands]]
token = "#ibo"
flow_name = "ibo"

[[commands]]
token = "#assist"
flow_name = "assist"

[[commands]]
token = "#lazer"
flow_name = "lazer"
"##;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    config: AtendeConfig,
    seeds: Vec<String>,
    provisioning_answer: Option<String>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            config: AtendeConfig::default(),
            seeds: vec![DEFAULT_SEED.to_string()],
            provisioning_answer: None,
        }
    }

    /// Adds catalog rows in seed-file TOML.
    pub fn with_catalog(mut self, seed: &str) -> Self {
        self.seeds.push(seed.to_string());
        self
    }

    /// Adjusts the configuration before the engine is built.
    pub fn with_config(mut self, adjust: impl FnOnce(&mut AtendeConfig)) -> Self {
        adjust(&mut self.config);
        self
    }

    /// Answer the provisioning mock gives when nothing is scripted.
    pub fn with_provisioning_answer(mut self, answer: &str) -> Self {
        self.provisioning_answer = Some(answer.to_string());
        self
    }

    /// Build the test harness, seeding the catalog.
    pub async fn build(self) -> Result<TestHarness, AtendeError> {
        let channel = Arc::new(MockChannel::new());
        let ocr = Arc::new(MockOcr::new());
        let provisioning = Arc::new(match &self.provisioning_answer {
            Some(answer) => MockProvisioning::new(answer),
            None => MockProvisioning::default(),
        });
        let audit = Arc::new(MockAuditSink::new());

        // Zero TTL: every lookup sees the latest catalog writes.
        let resolver = Arc::new(ConfigResolver::new(
            Arc::new(MemoryCatalogStore::new()),
            Duration::ZERO,
        ));
        for seed in &self.seeds {
            CatalogSeed::from_toml(seed)?.apply(&resolver).await?;
        }

        let echo = Arc::new(EchoSuppressor::new(Duration::from_secs(
            self.config.echo.fingerprint_ttl_secs,
        )));
        let outbox = Arc::new(Outbox::new(channel.clone(), echo));

        let followups = Arc::new(FollowUpScheduler::in_memory(Duration::from_secs(
            self.config.followup.delay_secs,
        )));
        followups.set_sender(Box::new(ChannelFollowUpSender::new(
            Arc::clone(&outbox),
            Arc::clone(&resolver),
            audit.clone(),
            self.config.followup.message.clone(),
        )));

        let ctx = Arc::new(EngineContext {
            outbox,
            ocr: ocr.clone(),
            provisioning: provisioning.clone(),
            audit: audit.clone(),
            resolver: Arc::clone(&resolver),
            followups: Some(Arc::clone(&followups)),
            products: ProductTable::from_config(&self.config.products),
            settings: EngineSettings::from_config(&self.config),
        });

        Ok(TestHarness {
            engine: ConversationEngine::new(DEVICE, Arc::clone(&ctx)),
            channel,
            ocr,
            provisioning,
            audit,
            resolver,
            followups,
            ctx,
            next_id: AtomicU64::new(1),
        })
    }
}

/// A complete conversation environment with mock adapters.
pub struct TestHarness {
    pub engine: ConversationEngine,
    pub channel: Arc<MockChannel>,
    pub ocr: Arc<MockOcr>,
    pub provisioning: Arc<MockProvisioning>,
    pub audit: Arc<MockAuditSink>,
    pub resolver: Arc<ConfigResolver>,
    pub followups: Arc<FollowUpScheduler>,
    pub ctx: Arc<EngineContext>,
    next_id: AtomicU64,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    fn message_id(&self, prefix: &str) -> String {
        format!("{prefix}-{}", self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Hands one event to the engine.
    pub async fn deliver(&mut self, msg: InboundMessage) -> Result<(), AtendeError> {
        self.engine.handle(msg).await
    }

    /// The default contact sends text.
    pub async fn contact_says(&mut self, body: &str) -> Result<(), AtendeError> {
        let msg = InboundMessage::text(DEVICE, CHAT, body).with_id(&self.message_id("in"));
        self.deliver(msg).await
    }

    /// The default contact sends an image whose OCR text is `ocr_text`.
    pub async fn contact_photo(&mut self, ocr_text: &str) -> Result<(), AtendeError> {
        let id = self.message_id("in");
        let media = format!("media-{id}");
        self.channel.put_media(&media, media.as_bytes()).await;
        self.ocr.set_text(media.as_bytes(), ocr_text).await;
        let msg = InboundMessage::text(DEVICE, CHAT, "")
            .with_id(&id)
            .with_media(&media);
        self.deliver(msg).await
    }

    /// The device owner types `body` in the default chat.
    pub async fn agent_says(&mut self, body: &str) -> Result<(), AtendeError> {
        let msg = InboundMessage::text(DEVICE, CHAT, body)
            .with_id(&self.message_id("out"))
            .from_self();
        self.deliver(msg).await
    }

    /// Feeds every message sent so far back to the engine, the way the
    /// transport reports the device's own sends. Sent ids are not known to
    /// the harness, so echoes are matched by body.
    pub async fn echo_sent(&mut self) -> Result<(), AtendeError> {
        for sent in self.channel.sent_messages().await {
            let msg = InboundMessage::text(&sent.device_id, &sent.channel_id, &sent.body)
                .with_id(&self.message_id("echo"))
                .from_self();
            self.deliver(msg).await?;
        }
        Ok(())
    }

    /// Bodies sent to the default contact, in order.
    pub async fn replies(&self) -> Vec<String> {
        self.channel.sent_to(CHAT).await
    }

    pub async fn trial_requests(&self) -> Vec<TrialRequest> {
        self.provisioning.requests().await
    }

    pub fn state(&mut self) -> ConversationState {
        self.engine.state_of(CHAT)
    }

    pub fn pending(&self) -> Option<&PendingIdentifierRequest> {
        self.engine.pending_for(CHAT)
    }
}
