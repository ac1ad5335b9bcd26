// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-contact conversation state and pending identifier requests.
//!
//! Both stores belong to one device engine and are only touched from that
//! device's task.

use std::collections::HashMap;
use std::time::Duration;

use atende_core::ContactKey;
use atende_extract::Identifier;
use chrono::{DateTime, Utc};
use tokio::time::Instant;
use tracing::debug;

/// Where a contact stands in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConversationState {
    #[default]
    Idle,
    /// Waiting for something that yields the device identifier of `product`.
    AwaitingIdentifierProof {
        product: String,
        /// The re-ask after an unreadable screenshot was already sent.
        print_reminder_sent: bool,
        /// A yes/no question is open.
        confirming: bool,
        /// Low-confidence identifier awaiting the contact's confirmation.
        identifier: Option<Identifier>,
        /// The contact was already asked for the screenshot.
        print_requested: bool,
    },
    /// A screen-check contact reached the playlist screen.
    AwaitingPlaylistClick { product: String, reminded: bool },
    /// Waiting for a screen-check screenshot.
    AwaitingPhoto { product: String, reminded: bool },
    CustomFlow { flow_id: u64, stage_index: usize },
}

impl ConversationState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Short name for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AwaitingIdentifierProof { .. } => "awaiting_identifier_proof",
            Self::AwaitingPlaylistClick { .. } => "awaiting_playlist_click",
            Self::AwaitingPhoto { .. } => "awaiting_photo",
            Self::CustomFlow { .. } => "custom_flow",
        }
    }
}

#[derive(Debug)]
struct Entry {
    state: ConversationState,
    entered_at: Instant,
}

/// At most one state per contact. Idle contacts have no entry.
#[derive(Debug)]
pub struct StateStore {
    entries: HashMap<ContactKey, Entry>,
    timeout: Duration,
}

impl StateStore {
    /// `timeout` is how long a non-idle state survives without being
    /// re-entered.
    pub fn new(timeout: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            timeout,
        }
    }

    /// Current state of `key`. An expired state is dropped and reported as
    /// idle.
    pub fn get(&mut self, key: &ContactKey) -> ConversationState {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.entered_at.elapsed() >= self.timeout,
            None => return ConversationState::Idle,
        };
        if expired {
            if let Some(entry) = self.entries.remove(key) {
                debug!(contact = %key, state = entry.state.label(), "conversation state expired");
            }
            return ConversationState::Idle;
        }
        self.entries
            .get(key)
            .map(|e| e.state.clone())
            .unwrap_or_default()
    }

    /// Enters `state`, restarting its expiry clock.
    pub fn set(&mut self, key: &ContactKey, state: ConversationState) {
        if state.is_idle() {
            self.entries.remove(key);
            return;
        }
        self.entries.insert(
            key.clone(),
            Entry {
                state,
                entered_at: Instant::now(),
            },
        );
    }

    pub fn clear(&mut self, key: &ContactKey) {
        self.entries.remove(key);
    }

    /// Number of contacts in a non-idle state, expired ones included.
    pub fn active(&self) -> usize {
        self.entries.len()
    }
}

/// A contact waiting for a human agent to supply its device identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingIdentifierRequest {
    pub contact: ContactKey,
    pub product: String,
    pub contact_name: String,
    pub created_at: DateTime<Utc>,
}

/// Pending identifier requests keyed by chat id.
#[derive(Debug, Default)]
pub struct PendingRequests {
    by_chat: HashMap<String, PendingIdentifierRequest>,
}

impl PendingRequests {
    /// Registers a request for `chat_id`. An existing request for the chat
    /// is kept as is. Returns `true` when a new request was created.
    pub fn register(&mut self, chat_id: &str, request: PendingIdentifierRequest) -> bool {
        if self.by_chat.contains_key(chat_id) {
            return false;
        }
        self.by_chat.insert(chat_id.to_string(), request);
        true
    }

    pub fn get(&self, chat_id: &str) -> Option<&PendingIdentifierRequest> {
        self.by_chat.get(chat_id)
    }

    /// Resolves the request for `chat_id`, removing it.
    pub fn take(&mut self, chat_id: &str) -> Option<PendingIdentifierRequest> {
        self.by_chat.remove(chat_id)
    }

    pub fn len(&self) -> usize {
        self.by_chat.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_chat.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> ContactKey {
        ContactKey::from_channel("loja", "5511999990000@c.us")
    }

    fn awaiting() -> ConversationState {
        ConversationState::AwaitingPhoto {
            product: "assist".into(),
            reminded: false,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_contact_is_idle() {
        let mut store = StateStore::new(Duration::from_secs(60));
        assert!(store.get(&key()).is_idle());
        assert_eq!(store.active(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn one_state_per_contact() {
        let mut store = StateStore::new(Duration::from_secs(60));
        store.set(&key(), awaiting());
        store.set(
            &key(),
            ConversationState::CustomFlow {
                flow_id: 3,
                stage_index: 0,
            },
        );
        assert_eq!(store.active(), 1);
        assert_eq!(store.get(&key()).label(), "custom_flow");

        store.set(&key(), ConversationState::Idle);
        assert_eq!(store.active(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn states_expire_after_timeout() {
        let mut store = StateStore::new(Duration::from_secs(1800));
        store.set(&key(), awaiting());
        tokio::time::advance(Duration::from_secs(1799)).await;
        assert_eq!(store.get(&key()), awaiting());
        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(store.get(&key()).is_idle());
        assert_eq!(store.active(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn re_entering_restarts_the_clock() {
        let mut store = StateStore::new(Duration::from_secs(100));
        store.set(&key(), awaiting());
        tokio::time::advance(Duration::from_secs(90)).await;
        store.set(&key(), awaiting());
        tokio::time::advance(Duration::from_secs(90)).await;
        assert!(!store.get(&key()).is_idle());
    }

    #[test]
    fn pending_requests_are_resolved_once() {
        let mut pending = PendingRequests::default();
        let request = PendingIdentifierRequest {
            contact: key(),
            product: "ibo".into(),
            contact_name: "Ana".into(),
            created_at: Utc::now(),
        };
        assert!(pending.register("5511999990000@c.us", request.clone()));
        assert!(!pending.register("5511999990000@c.us", request.clone()));
        assert_eq!(pending.len(), 1);

        assert_eq!(pending.take("5511999990000@c.us"), Some(request));
        assert!(pending.take("5511999990000@c.us").is_none());
        assert!(pending.is_empty());
    }
}
