// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation engine and session plumbing for Atende.
//!
//! The [`Dispatcher`] is the central coordinator that:
//! - Receives events from the channel adapter
//! - Routes them to one sequential [`ConversationEngine`] per device
//! - Drains device queues on shutdown
//!
//! Each engine owns the conversation state of its device's contacts and
//! drives the provisioning walkthroughs, custom flows and quick replies.

pub mod audit;
pub mod classify;
pub mod dispatcher;
pub mod echo;
pub mod engine;
pub mod flow;
pub mod outbox;
pub mod profile;
pub mod reminder;
pub mod shutdown;
pub mod state;
pub mod watchdog;

pub use audit::TracingAuditSink;
pub use dispatcher::Dispatcher;
pub use echo::EchoSuppressor;
pub use engine::{ConversationEngine, EngineContext, EngineSettings};
pub use outbox::Outbox;
pub use profile::{ProductProfile, ProductTable};
pub use reminder::ChannelFollowUpSender;
pub use state::{ConversationState, PendingIdentifierRequest};
