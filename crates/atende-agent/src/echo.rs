// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recognizes transport echoes of messages the engine sent itself.
//!
//! Every send registers a fingerprint of `(channel, exact body)` before the
//! transport is called, and the transport message id once it is known. The
//! first self event matching either fingerprint is the echo: the entry is
//! consumed and the event dropped. Repeated sends of the same body keep one
//! entry each, so every one of their echoes is recognized.

use std::collections::VecDeque;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;
use tracing::trace;

/// One-shot, short-lived fingerprints of sent messages.
pub struct EchoSuppressor {
    ttl: Duration,
    bodies: DashMap<(String, String), VecDeque<Instant>>,
    ids: DashMap<String, Instant>,
}

impl EchoSuppressor {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            bodies: DashMap::new(),
            ids: DashMap::new(),
        }
    }

    pub fn mark_sent(&self, channel_id: &str, body: &str) {
        self.purge_expired();
        let expires = Instant::now() + self.ttl;
        self.bodies
            .entry((channel_id.to_string(), body.to_string()))
            .or_default()
            .push_back(expires);
    }

    /// Consumes the fingerprint for `(channel_id, body)`. Returns `true` once
    /// per registration while it has not expired.
    pub fn was_sent(&self, channel_id: &str, body: &str) -> bool {
        let key = (channel_id.to_string(), body.to_string());
        let now = Instant::now();
        let Some(mut pending) = self.bodies.get_mut(&key) else {
            return false;
        };
        // Expiry times are pushed in order, so stale ones sit at the front.
        while pending.front().is_some_and(|expires| *expires <= now) {
            pending.pop_front();
            trace!("expired echo fingerprint dropped");
        }
        let hit = pending.pop_front().is_some();
        let drained = pending.is_empty();
        drop(pending);
        if drained {
            self.bodies.remove_if(&key, |_, pending| pending.is_empty());
        }
        hit
    }

    pub fn mark_sent_id(&self, message_id: &str) {
        if message_id.is_empty() {
            return;
        }
        self.ids
            .insert(message_id.to_string(), Instant::now() + self.ttl);
    }

    pub fn was_sent_id(&self, message_id: &str) -> bool {
        if message_id.is_empty() {
            return false;
        }
        match self.ids.remove(message_id) {
            Some((_, expires)) if expires > Instant::now() => true,
            Some(_) => {
                trace!("expired echo fingerprint dropped");
                false
            }
            None => false,
        }
    }

    /// Number of live fingerprints (bodies and ids).
    pub fn len(&self) -> usize {
        self.purge_expired();
        self.bodies.iter().map(|entry| entry.value().len()).sum::<usize>() + self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn purge_expired(&self) {
        let now = Instant::now();
        self.bodies.retain(|_, pending| {
            pending.retain(|expires| *expires > now);
            !pending.is_empty()
        });
        self.ids.retain(|_, expires| *expires > now);
    }
}
