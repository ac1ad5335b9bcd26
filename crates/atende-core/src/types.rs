// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the Atende engine.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Transport-assigned identifier of a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

/// Opaque reference to downloadable media attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaRef(pub String);

/// Identifies one conversation: a contact talking to one device.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContactKey {
    pub device_id: String,
    pub phone: String,
}

impl ContactKey {
    /// Builds the key for the contact behind a transport channel id.
    pub fn from_channel(device_id: &str, channel_id: &str) -> Self {
        Self {
            device_id: device_id.to_string(),
            phone: phone_digits(channel_id),
        }
    }

    /// The contact phone in E.164 form (`+` followed by the digits).
    pub fn e164(&self) -> String {
        format!("+{}", self.phone)
    }
}

impl std::fmt::Display for ContactKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.device_id, self.phone)
    }
}

/// Extracts the phone digits from a channel or sender id
/// (`5511999990000@c.us` -> `5511999990000`).
pub fn phone_digits(raw: &str) -> String {
    let local = raw.split('@').next().unwrap_or(raw);
    local.chars().filter(char::is_ascii_digit).collect()
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Channel,
    Ocr,
    Provisioning,
    Catalog,
    Audit,
}

// --- Channel types ---

/// An event delivered by the transport.
///
/// `is_from_self` is set for messages typed by the device owner (a human
/// agent on the phone) and for echoes of messages the engine itself sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub id: MessageId,
    pub device_id: String,
    pub channel_id: String,
    pub sender_id: String,
    pub sender_name: Option<String>,
    pub body: String,
    pub has_media: bool,
    pub media: Option<MediaRef>,
    pub is_from_self: bool,
    pub quoted: Option<MessageId>,
    pub timestamp: String,
}

impl InboundMessage {
    /// A plain text message from a contact.
    pub fn text(device_id: &str, channel_id: &str, body: &str) -> Self {
        Self {
            id: MessageId(String::new()),
            device_id: device_id.to_string(),
            channel_id: channel_id.to_string(),
            sender_id: channel_id.to_string(),
            sender_name: None,
            body: body.to_string(),
            has_media: false,
            media: None,
            is_from_self: false,
            quoted: None,
            timestamp: String::new(),
        }
    }

    /// Marks the message as typed by the device owner.
    pub fn from_self(mut self) -> Self {
        self.is_from_self = true;
        self
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = MessageId(id.to_string());
        self
    }

    pub fn with_media(mut self, media: &str) -> Self {
        self.has_media = true;
        self.media = Some(MediaRef(media.to_string()));
        self
    }

    pub fn with_quote(mut self, quoted: &str) -> Self {
        self.quoted = Some(MessageId(quoted.to_string()));
        self
    }

    pub fn with_sender_name(mut self, name: &str) -> Self {
        self.sender_name = Some(name.to_string());
        self
    }
}

/// A message the engine wants delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub device_id: String,
    pub channel_id: String,
    pub body: String,
}

/// A message referenced by a quote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotedMessage {
    pub id: MessageId,
    pub body: String,
    pub has_media: bool,
    pub media: Option<MediaRef>,
}

/// Capabilities reported by a channel adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelCapabilities {
    pub supports_media: bool,
    pub supports_quotes: bool,
    /// Whether `send` returns the transport message id synchronously.
    pub returns_message_ids: bool,
}

// --- OCR types ---

/// Raw text recognized in an image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OcrOutput {
    pub text: String,
    /// A second, more permissive recognition pass produced the text.
    pub used_fallback_pass: bool,
    /// The image had to be rotated before recognition succeeded.
    pub used_rotation: bool,
}

// --- Provisioning types ---

/// A request for a trial credential from the provisioning upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialRequest {
    pub product_name: String,
    /// The device identifier for identifier products, the contact phone otherwise.
    pub device_identifier_phone: String,
    pub contact_name: String,
    pub contact_phone_e164: String,
    pub label: String,
}

/// How a product obtains what the upstream needs to issue a trial.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProductMode {
    /// Needs the device identifier (MAC) of the contact's player.
    Identifier,
    /// Needs a screenshot proving the app is installed before issuing.
    ScreenCheck,
    /// Issues immediately with the contact's phone.
    Direct,
}

// --- Audit types ---

/// Who the counterparty of an audited event is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ContactType {
    Client,
    Unknown,
}

/// Who produced the message behind an audited event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Contact,
    Agent,
    Engine,
}

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    QuickReply,
    FlowStage,
    TrialIssued,
    TrialFailed,
    IdentifierRequested,
    IdentifierResolved,
    LimitReached,
    Handoff,
    EchoSuppressed,
    SendFailed,
    FollowUpSent,
}

/// Typed reason attached to failure events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    MediaDownload,
    Ocr,
    NoIdentifier,
    Upstream,
    Timeout,
    Send,
}

/// Maximum number of characters of raw text kept in an audit sample.
pub const AUDIT_SAMPLE_CHARS: usize = 200;

/// Failure details carried by an audit event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditError {
    pub reason: FailureReason,
    pub detail: String,
    /// Capped raw text (e.g. OCR output) for diagnosis.
    pub sample: Option<String>,
}

impl AuditError {
    pub fn new(reason: FailureReason, detail: impl Into<String>) -> Self {
        Self {
            reason,
            detail: detail.into(),
            sample: None,
        }
    }

    /// Attaches at most [`AUDIT_SAMPLE_CHARS`] characters of `raw`.
    pub fn with_sample(mut self, raw: &str) -> Self {
        self.sample = Some(raw.chars().take(AUDIT_SAMPLE_CHARS).collect());
        self
    }
}

/// One interaction record sent to the audit sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub device_id: String,
    pub phone: String,
    pub name: Option<String>,
    pub contact_type: ContactType,
    pub origin: Origin,
    pub event_type: AuditEventType,
    pub content: String,
    pub error: Option<AuditError>,
}

// --- Catalog types ---

/// How a quick reply trigger is compared with a message body.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Exact,
    StartsWith,
    #[default]
    Includes,
}

/// Maps a command token (e.g. `#ibo`) to a product flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandDefinition {
    #[serde(default)]
    pub id: u64,
    pub token: String,
    pub flow_name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub device_id: Option<String>,
}

/// A canned answer sent when a contact message matches a trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickReplyDefinition {
    #[serde(default)]
    pub id: u64,
    pub trigger: String,
    pub response_template: String,
    #[serde(default)]
    pub match_type: MatchType,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub device_id: Option<String>,
}

/// An operator-defined sequence of messages started by a trigger phrase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomFlowDefinition {
    #[serde(default)]
    pub id: u64,
    pub name: String,
    pub triggers: Vec<String>,
    pub stages: Vec<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub device_id: Option<String>,
}

/// A template variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableDefinition {
    #[serde(default)]
    pub id: u64,
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub device_id: Option<String>,
}

fn default_enabled() -> bool {
    true
}

/// Discriminant of a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum CatalogKind {
    Command,
    QuickReply,
    Flow,
    Variable,
}

/// Any row of the operator-managed catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogEntry {
    Command(CommandDefinition),
    QuickReply(QuickReplyDefinition),
    Flow(CustomFlowDefinition),
    Variable(VariableDefinition),
}

impl CatalogEntry {
    pub fn kind(&self) -> CatalogKind {
        match self {
            Self::Command(_) => CatalogKind::Command,
            Self::QuickReply(_) => CatalogKind::QuickReply,
            Self::Flow(_) => CatalogKind::Flow,
            Self::Variable(_) => CatalogKind::Variable,
        }
    }

    pub fn id(&self) -> u64 {
        match self {
            Self::Command(c) => c.id,
            Self::QuickReply(q) => q.id,
            Self::Flow(f) => f.id,
            Self::Variable(v) => v.id,
        }
    }

    pub fn set_id(&mut self, id: u64) {
        match self {
            Self::Command(c) => c.id = id,
            Self::QuickReply(q) => q.id = id,
            Self::Flow(f) => f.id = id,
            Self::Variable(v) => v.id = id,
        }
    }

    pub fn device_id(&self) -> Option<&str> {
        match self {
            Self::Command(c) => c.device_id.as_deref(),
            Self::QuickReply(q) => q.device_id.as_deref(),
            Self::Flow(f) => f.device_id.as_deref(),
            Self::Variable(v) => v.device_id.as_deref(),
        }
    }
}

/// Every catalog row, each list in creation order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogSnapshot {
    pub commands: Vec<CommandDefinition>,
    pub quick_replies: Vec<QuickReplyDefinition>,
    pub flows: Vec<CustomFlowDefinition>,
    pub variables: Vec<VariableDefinition>,
}
