// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-device conversation engine.
//!
//! [`ConversationEngine`] classifies every event of one device and runs the
//! resulting step: echo suppression, agent commands, instruction phrases,
//! identifier and screen-check walkthroughs, custom flows and quick replies.
//! Collaborator failures end in a fixed fallback message and an audit event;
//! they never reach the transport.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use atende_catalog::{ConfigResolver, render};
use atende_config::AtendeConfig;
use atende_config::model::MessagesConfig;
use atende_core::types::{
    AuditError, AuditEvent, AuditEventType, ContactType, CustomFlowDefinition, FailureReason,
    InboundMessage, MediaRef, OcrOutput, Origin, TrialRequest,
};
use atende_core::{AtendeError, AuditSink, ContactKey, OcrAdapter, ProductMode, ProvisioningAdapter};
use atende_extract::{Extraction, Identifier, TrialDetails, extract_detailed, extract_from_passes};
use atende_followup::{FollowUpRecord, FollowUpScheduler};
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::audit;
use crate::classify::{self, Answer, Phrases};
use crate::flow::{ConfirmStep, FlowEngine, IdentifierStep, ScreenStep, StageStep};
use crate::outbox::Outbox;
use crate::profile::{ProductProfile, ProductTable};
use crate::state::{ConversationState, PendingIdentifierRequest};
use crate::watchdog::watch;

/// Engine settings taken from configuration.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub messages: MessagesConfig,
    pub phrases: Phrases,
    pub state_timeout: Duration,
    pub short_link_hosts: Vec<String>,
    pub label: String,
    pub ocr_warn_after: Duration,
    pub provisioning_warn_after: Duration,
    pub followups_enabled: bool,
}

impl EngineSettings {
    pub fn from_config(config: &AtendeConfig) -> Self {
        Self {
            messages: config.messages.clone(),
            phrases: Phrases::from_config(&config.engine),
            state_timeout: Duration::from_secs(config.engine.confirm_timeout_secs),
            short_link_hosts: config.links.short_link_hosts.clone(),
            label: config.provisioning.label.clone(),
            ocr_warn_after: Duration::from_millis(config.ocr.warn_after_ms),
            provisioning_warn_after: Duration::from_millis(config.provisioning.warn_after_ms),
            followups_enabled: config.followup.enabled,
        }
    }
}

/// Collaborators shared by every device engine.
pub struct EngineContext {
    pub outbox: Arc<Outbox>,
    pub ocr: Arc<dyn OcrAdapter>,
    pub provisioning: Arc<dyn ProvisioningAdapter>,
    pub audit: Arc<dyn AuditSink>,
    pub resolver: Arc<ConfigResolver>,
    pub followups: Option<Arc<FollowUpScheduler>>,
    pub products: ProductTable,
    pub settings: EngineSettings,
}

/// The contact side of an event.
#[derive(Debug, Clone)]
struct Conversation {
    key: ContactKey,
    chat_id: String,
    name: String,
    /// The transport knows the contact by name.
    known: bool,
}

/// Text read from an image, with the identifier found in it.
struct Reading {
    output: OcrOutput,
    extraction: Option<Extraction>,
}

impl Reading {
    fn uncertain(&self) -> bool {
        self.output.used_fallback_pass || self.output.used_rotation
    }
}

/// Runs the conversations of one device. Events must be handed over one at
/// a time, in transport order.
pub struct ConversationEngine {
    device_id: String,
    ctx: Arc<EngineContext>,
    flow: FlowEngine,
    names: HashMap<String, String>,
}

impl ConversationEngine {
    pub fn new(device_id: &str, ctx: Arc<EngineContext>) -> Self {
        let flow = FlowEngine::new(ctx.settings.state_timeout);
        Self {
            device_id: device_id.to_string(),
            ctx,
            flow,
            names: HashMap::new(),
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Current state of the contact behind `chat_id`.
    pub fn state_of(&mut self, chat_id: &str) -> ConversationState {
        self.flow
            .state(&ContactKey::from_channel(&self.device_id, chat_id))
    }

    /// The pending identifier request of `chat_id`, if any.
    pub fn pending_for(&self, chat_id: &str) -> Option<&PendingIdentifierRequest> {
        self.flow.pending(chat_id)
    }

    /// Handles one transport event.
    pub async fn handle(&mut self, msg: InboundMessage) -> Result<(), AtendeError> {
        if msg.device_id != self.device_id {
            return Err(AtendeError::Internal(format!(
                "event for device `{}` routed to engine of `{}`",
                msg.device_id, self.device_id
            )));
        }
        if msg.is_from_self {
            if self.is_echo(&msg) {
                let conv = self.conversation(&msg);
                debug!(chat_id = %conv.chat_id, "own echo suppressed");
                self.audit(&conv, Origin::Engine, AuditEventType::EchoSuppressed, &msg.body, None)
                    .await;
                return Ok(());
            }
            self.handle_agent(msg).await
        } else {
            self.handle_contact(msg).await
        }
    }

    fn is_echo(&self, msg: &InboundMessage) -> bool {
        let echo = self.ctx.outbox.echo();
        if echo.was_sent_id(&msg.id.0) {
            // Drop the body fingerprint of the same send as well.
            echo.was_sent(&msg.channel_id, &msg.body);
            return true;
        }
        echo.was_sent(&msg.channel_id, &msg.body)
    }

    fn conversation(&mut self, msg: &InboundMessage) -> Conversation {
        let key = ContactKey::from_channel(&self.device_id, &msg.channel_id);
        if !msg.is_from_self
            && let Some(name) = msg.sender_name.as_deref().map(str::trim).filter(|n| !n.is_empty())
        {
            self.names.insert(msg.channel_id.clone(), name.to_string());
        }
        let known = self.names.get(&msg.channel_id).cloned();
        Conversation {
            name: known.clone().unwrap_or_else(|| key.phone.clone()),
            known: known.is_some(),
            chat_id: msg.channel_id.clone(),
            key,
        }
    }

    // --- Agent side ---

    async fn handle_agent(&mut self, msg: InboundMessage) -> Result<(), AtendeError> {
        let conv = self.conversation(&msg);

        if let Some((token, rest)) = classify::command(&msg.body) {
            return self.agent_command(&msg, &conv, token, rest).await;
        }

        if self.flow.pending(&conv.chat_id).is_some()
            && let Some(identifier) = self.identifier_from_agent(&msg, &conv, &msg.body).await
        {
            return self.resolve_pending(&conv, identifier).await;
        }

        if let Some(instruction) = self.ctx.settings.phrases.instruction(&msg.body) {
            let Some(product) = self.ctx.products.default_identifier() else {
                debug!("instruction phrase ignored: no identifier product configured");
                return Ok(());
            };
            let keyword = product.keyword.clone();
            if self.flow.begin_instruction(&conv.key, instruction, &keyword)
                && instruction == classify::Instruction::DownloadApp
            {
                let confirmation = self.ctx.settings.messages.app_confirmation.clone();
                self.send_template(&conv, &confirmation, &[]).await;
            }
        }
        Ok(())
    }

    async fn agent_command(
        &mut self,
        msg: &InboundMessage,
        conv: &Conversation,
        token: &str,
        rest: &str,
    ) -> Result<(), AtendeError> {
        let Some(command) = self.ctx.resolver.resolve_command(token, &self.device_id).await else {
            debug!(token, "unknown command");
            return Ok(());
        };
        let Some(profile) = self.ctx.products.get(&command.flow_name).cloned() else {
            warn!(token, flow_name = %command.flow_name, "command points to an unknown product");
            return Ok(());
        };
        info!(
            device_id = %self.device_id,
            chat_id = %conv.chat_id,
            product = %profile.keyword,
            mode = %profile.mode,
            "agent command"
        );

        match profile.mode {
            ProductMode::Identifier => {
                match self.identifier_from_agent(msg, conv, rest).await {
                    Some(identifier) => self.respond_with_trial(conv, &profile, Some(identifier)).await,
                    None => {
                        self.flow.await_identifier(
                            &conv.chat_id,
                            PendingIdentifierRequest {
                                contact: conv.key.clone(),
                                product: profile.keyword.clone(),
                                contact_name: conv.name.clone(),
                                created_at: Utc::now(),
                            },
                        );
                        let request = self.ctx.settings.messages.identifier_request.clone();
                        self.send_template(conv, &request, &[]).await;
                        self.audit(conv, Origin::Agent, AuditEventType::IdentifierRequested, &profile.keyword, None)
                            .await;
                    }
                }
            }
            ProductMode::ScreenCheck => {
                self.flow.set_state(
                    &conv.key,
                    ConversationState::AwaitingPhoto {
                        product: profile.keyword.clone(),
                        reminded: false,
                    },
                );
                let request = self.ctx.settings.messages.screen_request.clone();
                self.send_template(conv, &request, &[]).await;
            }
            ProductMode::Direct => self.respond_with_trial(conv, &profile, None).await,
        }
        Ok(())
    }

    /// Looks for an identifier supplied by a human agent: inline text, an
    /// attached image, or a quoted image, in that order.
    async fn identifier_from_agent(
        &self,
        msg: &InboundMessage,
        conv: &Conversation,
        text: &str,
    ) -> Option<Identifier> {
        if let Some(extraction) = extract_detailed(text) {
            return Some(extraction.identifier);
        }
        let media = match &msg.media {
            Some(media) => Some(media.clone()),
            None => self.quoted_media(msg).await,
        }?;
        match self.read_identifier(&media).await {
            Ok(reading) => reading.extraction.map(|e| e.identifier),
            Err(e) => {
                warn!(chat_id = %conv.chat_id, error = %e, "could not read identifier from agent image");
                let error = AuditError::new(failure_reason(&e), e.to_string());
                self.audit(conv, Origin::Agent, AuditEventType::TrialFailed, "", Some(error))
                    .await;
                None
            }
        }
    }

    async fn quoted_media(&self, msg: &InboundMessage) -> Option<MediaRef> {
        let quoted = msg.quoted.as_ref()?;
        match self.ctx.outbox.channel().quoted_message(quoted).await {
            Ok(Some(q)) if q.has_media => q.media,
            Ok(_) => None,
            Err(e) => {
                warn!(quoted = %quoted.0, error = %e, "quoted message lookup failed");
                None
            }
        }
    }

    async fn resolve_pending(
        &mut self,
        conv: &Conversation,
        identifier: Identifier,
    ) -> Result<(), AtendeError> {
        let Some(request) = self.flow.resolve_pending(&conv.chat_id) else {
            return Ok(());
        };
        let target = Conversation {
            key: request.contact.clone(),
            chat_id: conv.chat_id.clone(),
            name: request.contact_name.clone(),
            known: conv.known,
        };
        self.audit(&target, Origin::Agent, AuditEventType::IdentifierResolved, identifier.as_str(), None)
            .await;
        let Some(profile) = self.ctx.products.get(&request.product).cloned() else {
            warn!(product = %request.product, "pending request for an unknown product dropped");
            return Ok(());
        };
        self.respond_with_trial(&target, &profile, Some(identifier)).await;
        Ok(())
    }

    // --- Contact side ---

    async fn handle_contact(&mut self, msg: InboundMessage) -> Result<(), AtendeError> {
        let conv = self.conversation(&msg);
        let body = msg.body.trim();
        if classify::command(body).is_some() {
            debug!(chat_id = %conv.chat_id, "command-shaped text from contact ignored");
            return Ok(());
        }

        let mut state = self.flow.state(&conv.key);
        if state.is_idle()
            && let Some(pending) = self.flow.pending(&conv.chat_id)
            && (msg.media.is_some() || extract_detailed(body).is_some())
        {
            // The wait expired but the request is still open.
            state = ConversationState::AwaitingIdentifierProof {
                product: pending.product.clone(),
                print_reminder_sent: false,
                confirming: false,
                identifier: None,
                print_requested: true,
            };
            self.flow.set_state(&conv.key, state.clone());
        }

        match state {
            ConversationState::Idle => {}
            ConversationState::CustomFlow {
                flow_id,
                stage_index,
            } => {
                let definition = self.ctx.resolver.flow(flow_id).await;
                match self
                    .flow
                    .advance_custom_flow(&conv.key, stage_index, definition.as_ref())
                {
                    StageStep::Send(stage) => {
                        if let Some(definition) = definition {
                            self.send_stage(&conv, &definition, stage).await;
                        }
                        return Ok(());
                    }
                    StageStep::Reset => {
                        debug!(flow_id, "custom flow gone, contact is idle again");
                        state = ConversationState::Idle;
                    }
                }
            }
            ConversationState::AwaitingIdentifierProof {
                ref product,
                confirming,
                ..
            } => {
                if let Some(media) = &msg.media {
                    self.identifier_photo(&conv, product, media).await;
                    return Ok(());
                }
                if let Some(extraction) = extract_detailed(body) {
                    let step = self.flow.identifier_found(&conv.key, product, extraction, false);
                    self.identifier_step(&conv, product, step).await;
                    return Ok(());
                }
                if confirming {
                    let answer = self.ctx.settings.phrases.answer(body);
                    if answer != Answer::Unclear {
                        self.confirmation(&conv, answer).await;
                        return Ok(());
                    }
                }
            }
            ConversationState::AwaitingPhoto { ref product, .. }
            | ConversationState::AwaitingPlaylistClick { ref product, .. } => {
                if let Some(media) = &msg.media {
                    self.screen_photo(&conv, product, media).await;
                    return Ok(());
                }
            }
        }

        self.free_text(&conv, body, state.is_idle()).await;
        Ok(())
    }

    async fn identifier_photo(&mut self, conv: &Conversation, product: &str, media: &MediaRef) {
        let reading = match self.read_identifier(media).await {
            Ok(reading) => reading,
            Err(e) => {
                let request = self.pending_request(conv, product);
                self.flow.escalate(&conv.chat_id, request);
                self.degrade(conv, product, &e).await;
                return;
            }
        };
        let uncertain = reading.uncertain();
        match reading.extraction {
            Some(extraction) => {
                let step = self
                    .flow
                    .identifier_found(&conv.key, product, extraction, uncertain);
                self.identifier_step(conv, product, step).await;
            }
            None => {
                info!(chat_id = %conv.chat_id, "no identifier in screenshot");
                let request = self.pending_request(conv, product);
                if self.flow.identifier_missing(&conv.key, &conv.chat_id, request) {
                    let retry = self.ctx.settings.messages.print_retry.clone();
                    self.send_template(conv, &retry, &[]).await;
                }
                let error = AuditError::new(FailureReason::NoIdentifier, "no identifier in screenshot")
                    .with_sample(&reading.output.text);
                self.audit(conv, Origin::Contact, AuditEventType::IdentifierRequested, product, Some(error))
                    .await;
            }
        }
    }

    async fn identifier_step(&mut self, conv: &Conversation, product: &str, step: IdentifierStep) {
        match step {
            IdentifierStep::Provision(identifier) => {
                let Some(profile) = self.ctx.products.get(product).cloned() else {
                    warn!(product, "identifier for an unknown product dropped");
                    return;
                };
                self.respond_with_trial(conv, &profile, Some(identifier)).await;
            }
            IdentifierStep::Confirm(identifier) => {
                let question = self.ctx.settings.messages.identifier_confirmation.clone();
                self.send_template(conv, &question, &[("mac", identifier.to_string())])
                    .await;
            }
        }
    }

    async fn confirmation(&mut self, conv: &Conversation, answer: Answer) {
        match self.flow.confirmation_reply(&conv.key, answer) {
            ConfirmStep::Provision {
                product,
                identifier,
            } => {
                if let Some(profile) = self.ctx.products.get(&product).cloned() {
                    self.respond_with_trial(conv, &profile, Some(identifier)).await;
                }
            }
            ConfirmStep::RequestPrint => {
                let request = self.ctx.settings.messages.print_request.clone();
                self.send_template(conv, &request, &[]).await;
            }
            ConfirmStep::Handoff => {
                self.flow.finish(&conv.key, &conv.chat_id);
                let handoff = self.ctx.settings.messages.handoff.clone();
                self.send_template(conv, &handoff, &[]).await;
                self.audit(conv, Origin::Contact, AuditEventType::Handoff, "", None)
                    .await;
            }
            ConfirmStep::Wait => {}
        }
    }

    async fn screen_photo(&mut self, conv: &Conversation, product: &str, media: &MediaRef) {
        let text = match self.read_text(media).await {
            Ok(output) => output.text,
            Err(e) => {
                self.flow.finish(&conv.key, &conv.chat_id);
                self.degrade(conv, product, &e).await;
                return;
            }
        };
        let screen = self.ctx.settings.phrases.screen(&text);
        debug!(chat_id = %conv.chat_id, ?screen, "screen-check screenshot read");
        match self.flow.screen_shot(&conv.key, screen) {
            ScreenStep::Provision { product } => {
                if let Some(profile) = self.ctx.products.get(&product).cloned() {
                    self.respond_with_trial(conv, &profile, None).await;
                }
            }
            ScreenStep::PlaylistHint => {
                let hint = self.ctx.settings.messages.playlist_hint.clone();
                self.send_template(conv, &hint, &[]).await;
            }
            ScreenStep::RepeatRequest => {
                let request = self.ctx.settings.messages.screen_request.clone();
                self.send_template(conv, &request, &[]).await;
            }
            ScreenStep::Wait => {}
        }
    }

    /// Custom flow triggers (idle contacts only), then quick replies.
    async fn free_text(&mut self, conv: &Conversation, body: &str, idle: bool) {
        if body.is_empty() {
            return;
        }
        if idle
            && let Some(flow) = self
                .ctx
                .resolver
                .find_flow_trigger(body, &self.device_id)
                .await
        {
            info!(chat_id = %conv.chat_id, flow = %flow.name, "custom flow started");
            let stage = self.flow.start_custom_flow(&conv.key, &flow);
            self.send_stage(conv, &flow, stage).await;
            return;
        }
        if let Some(reply) = self
            .ctx
            .resolver
            .find_quick_reply(body, &self.device_id)
            .await
        {
            debug!(chat_id = %conv.chat_id, trigger = %reply.trigger, "quick reply matched");
            if self.send_template(conv, &reply.response_template, &[]).await {
                self.audit(conv, Origin::Engine, AuditEventType::QuickReply, &reply.trigger, None)
                    .await;
            }
        }
    }

    async fn send_stage(&mut self, conv: &Conversation, flow: &CustomFlowDefinition, stage: usize) {
        let Some(template) = flow.stages.get(stage) else {
            return;
        };
        if self.send_template(conv, template, &[]).await {
            let content = format!("{}#{stage}", flow.name);
            self.audit(conv, Origin::Engine, AuditEventType::FlowStage, &content, None)
                .await;
        }
    }

    // --- Provisioning ---

    /// Requests a trial for `profile` and answers the contact. Always ends
    /// the conversation's waits, whatever the outcome.
    async fn respond_with_trial(
        &mut self,
        conv: &Conversation,
        profile: &ProductProfile,
        identifier: Option<Identifier>,
    ) {
        let request = TrialRequest {
            product_name: profile.app_name.clone(),
            device_identifier_phone: identifier
                .as_ref()
                .map(Identifier::to_string)
                .unwrap_or_else(|| conv.key.phone.clone()),
            contact_name: conv.name.clone(),
            contact_phone_e164: conv.key.e164(),
            label: self.ctx.settings.label.clone(),
        };
        info!(
            chat_id = %conv.chat_id,
            product = %profile.keyword,
            identifier = identifier.as_ref().map(|i| i.as_str()).unwrap_or(""),
            "requesting trial"
        );
        let result = watch(
            "provisioning",
            self.ctx.settings.provisioning_warn_after,
            self.ctx.provisioning.request_trial(&request),
        )
        .await
        .and_then(|answer| {
            if answer.trim().is_empty() {
                Err(AtendeError::Provisioning {
                    message: "empty answer".to_string(),
                    source: None,
                })
            } else {
                Ok(answer)
            }
        });
        self.flow.finish(&conv.key, &conv.chat_id);

        let answer = match result {
            Ok(answer) => answer,
            Err(e) => {
                self.degrade(conv, &profile.keyword, &e).await;
                return;
            }
        };

        if self.ctx.settings.phrases.limit_reached(&answer) {
            info!(chat_id = %conv.chat_id, product = %profile.keyword, "trial limit reached");
            let limit = self.ctx.settings.messages.limit_reached.clone();
            self.send_template(conv, &limit, &[]).await;
            let error = AuditError::new(FailureReason::Upstream, "limit reached").with_sample(&answer);
            self.audit(conv, Origin::Engine, AuditEventType::LimitReached, &profile.keyword, Some(error))
                .await;
            return;
        }

        let details = TrialDetails::parse(
            &answer,
            &profile.keyword,
            &self.ctx.settings.short_link_hosts,
            profile.fallback_full_text,
        );
        let mut extra = details.template_vars(&profile.default_code);
        extra.push(("display_name".to_string(), profile.display_name.clone()));
        extra.push(("app_name".to_string(), profile.app_name.clone()));
        if let Some(identifier) = &identifier {
            extra.push(("mac".to_string(), identifier.to_string()));
        }
        let template = profile
            .reply_template
            .clone()
            .unwrap_or_else(|| self.ctx.settings.messages.trial_reply.clone());
        let extra: Vec<(&str, String)> = extra.iter().map(|(k, v)| (k.as_str(), v.clone())).collect();
        self.send_template(conv, &template, &extra).await;

        self.schedule_follow_up(conv).await;
        self.audit(conv, Origin::Engine, AuditEventType::TrialIssued, &profile.keyword, None)
            .await;
    }

    async fn schedule_follow_up(&self, conv: &Conversation) {
        if !self.ctx.settings.followups_enabled {
            return;
        }
        let Some(followups) = &self.ctx.followups else {
            return;
        };
        let record = FollowUpRecord::new(
            &self.device_id,
            &self.device_id,
            &conv.chat_id,
            &conv.key.phone,
            &conv.name,
        );
        if let Err(e) = followups.schedule(record).await {
            warn!(chat_id = %conv.chat_id, error = %e, "failed to schedule follow-up");
        }
    }

    /// Fallback for collaborator failures: fixed message plus a typed audit
    /// event.
    async fn degrade(&self, conv: &Conversation, product: &str, err: &AtendeError) {
        warn!(chat_id = %conv.chat_id, product, error = %err, "provisioning step failed");
        let failure = self.ctx.settings.messages.failure.clone();
        self.send_template(conv, &failure, &[]).await;
        let error = AuditError::new(failure_reason(err), err.to_string());
        self.audit(conv, Origin::Engine, AuditEventType::TrialFailed, product, Some(error))
            .await;
    }

    // --- Collaborators ---

    async fn download(&self, media: &MediaRef) -> Result<Vec<u8>, AtendeError> {
        self.ctx
            .outbox
            .channel()
            .download_media(media)
            .await
            .map_err(|e| match e {
                e @ AtendeError::MediaDownload { .. } => e,
                other => AtendeError::MediaDownload {
                    message: other.to_string(),
                    source: Some(Box::new(other)),
                },
            })
    }

    async fn read_text(&self, media: &MediaRef) -> Result<OcrOutput, AtendeError> {
        let image = self.download(media).await?;
        watch(
            "ocr",
            self.ctx.settings.ocr_warn_after,
            self.ctx.ocr.recognize(&image),
        )
        .await
    }

    /// Reads an identifier from the primary OCR pass, then from the
    /// fallback pass when the primary text holds none.
    async fn read_identifier(&self, media: &MediaRef) -> Result<Reading, AtendeError> {
        let image = self.download(media).await?;
        let primary = watch(
            "ocr",
            self.ctx.settings.ocr_warn_after,
            self.ctx.ocr.recognize(&image),
        )
        .await?;
        if let Some(extraction) = extract_detailed(&primary.text) {
            return Ok(Reading {
                output: primary,
                extraction: Some(extraction),
            });
        }
        if primary.used_fallback_pass {
            return Ok(Reading {
                output: primary,
                extraction: None,
            });
        }

        let fallback = watch(
            "ocr fallback",
            self.ctx.settings.ocr_warn_after,
            self.ctx.ocr.recognize_fallback(&image),
        )
        .await;
        let fallback = match fallback {
            Ok(Some(fallback)) => fallback,
            Ok(None) => {
                return Ok(Reading {
                    output: primary,
                    extraction: None,
                });
            }
            Err(e) => {
                warn!(error = %e, "fallback ocr pass failed");
                return Ok(Reading {
                    output: primary,
                    extraction: None,
                });
            }
        };
        debug!("primary ocr text had no identifier, fallback pass read");
        match extract_from_passes(&[&primary.text, &fallback.text]) {
            Some(extraction) => Ok(Reading {
                output: fallback,
                extraction: Some(extraction),
            }),
            None => Ok(Reading {
                output: primary,
                extraction: None,
            }),
        }
    }

    fn pending_request(&self, conv: &Conversation, product: &str) -> PendingIdentifierRequest {
        PendingIdentifierRequest {
            contact: conv.key.clone(),
            product: product.to_string(),
            contact_name: conv.name.clone(),
            created_at: Utc::now(),
        }
    }

    /// Renders `template` with the device variables, the contact name and
    /// `extra`, then sends it. Returns `false` when the send failed; the
    /// failure is logged with the intended text and audited.
    async fn send_template(&self, conv: &Conversation, template: &str, extra: &[(&str, String)]) -> bool {
        let mut vars = self.ctx.resolver.variables_map(&self.device_id).await;
        vars.insert("name".to_string(), conv.name.clone());
        for (name, value) in extra {
            vars.insert((*name).to_string(), value.clone());
        }
        let body = render(template, &vars);
        match self.ctx.outbox.send(&self.device_id, &conv.chat_id, &body).await {
            Ok(_) => true,
            Err(e) => {
                warn!(chat_id = %conv.chat_id, error = %e, content = %body, "send failed");
                let error = AuditError::new(FailureReason::Send, e.to_string());
                self.audit(conv, Origin::Engine, AuditEventType::SendFailed, &body, Some(error))
                    .await;
                false
            }
        }
    }

    async fn audit(
        &self,
        conv: &Conversation,
        origin: Origin,
        event_type: AuditEventType,
        content: &str,
        error: Option<AuditError>,
    ) {
        let event = AuditEvent {
            device_id: self.device_id.clone(),
            phone: conv.key.phone.clone(),
            name: Some(conv.name.clone()),
            contact_type: if conv.known {
                ContactType::Client
            } else {
                ContactType::Unknown
            },
            origin,
            event_type,
            content: content.to_string(),
            error,
        };
        audit::emit(self.ctx.audit.as_ref(), event).await;
    }
}

fn failure_reason(err: &AtendeError) -> FailureReason {
    match err {
        AtendeError::MediaDownload { .. } => FailureReason::MediaDownload,
        AtendeError::Ocr { .. } => FailureReason::Ocr,
        AtendeError::Timeout { .. } => FailureReason::Timeout,
        AtendeError::Channel { .. } | AtendeError::NotReady { .. } => FailureReason::Send,
        _ => FailureReason::Upstream,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_reasons_are_typed() {
        let ocr = AtendeError::Ocr {
            message: "x".into(),
            source: None,
        };
        let upstream = AtendeError::Provisioning {
            message: "502".into(),
            source: None,
        };
        let timeout = AtendeError::Timeout {
            duration: Duration::from_secs(90),
        };
        assert_eq!(failure_reason(&ocr), FailureReason::Ocr);
        assert_eq!(failure_reason(&upstream), FailureReason::Upstream);
        assert_eq!(failure_reason(&timeout), FailureReason::Timeout);
    }

    #[test]
    fn settings_follow_config() {
        let mut config = AtendeConfig::default();
        config.engine.confirm_timeout_secs = 60;
        config.followup.enabled = false;
        let settings = EngineSettings::from_config(&config);
        assert_eq!(settings.state_timeout, Duration::from_secs(60));
        assert!(!settings.followups_enabled);
        assert!(settings.short_link_hosts.iter().any(|h| h == "bit.ly"));
    }
}
