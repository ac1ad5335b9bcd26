// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Follow-up records.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// One pending reminder for a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUpRecord {
    pub id: String,
    pub contact_phone: String,
    pub chat_id: String,
    pub created_at: DateTime<Utc>,
    pub client_name: String,
    pub session_name: String,
    pub device_id: String,
}

impl FollowUpRecord {
    /// A record created now with a fresh id.
    pub fn new(
        device_id: &str,
        session_name: &str,
        chat_id: &str,
        contact_phone: &str,
        client_name: &str,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            contact_phone: contact_phone.to_string(),
            chat_id: chat_id.to_string(),
            created_at: Utc::now(),
            client_name: client_name.to_string(),
            session_name: session_name.to_string(),
            device_id: device_id.to_string(),
        }
    }

    /// Scheduling key: one pending reminder per session and chat.
    pub fn key(&self) -> String {
        format!("{}|{}", self.session_name, self.chat_id)
    }

    pub fn is_due(&self, now: DateTime<Utc>, delay: TimeDelta) -> bool {
        now - self.created_at >= delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_and_due() {
        let mut record = FollowUpRecord::new("loja", "loja-1", "5511@c.us", "+5511", "Ana");
        assert_eq!(record.key(), "loja-1|5511@c.us");

        let created = record.created_at;
        let delay = TimeDelta::minutes(10);
        assert!(!record.is_due(created + TimeDelta::minutes(9), delay));
        assert!(record.is_due(created + delay, delay));

        record.created_at = created - TimeDelta::hours(1);
        assert!(record.is_due(created, delay));
    }

    #[test]
    fn serializes_camel_case() {
        let record = FollowUpRecord::new("loja", "loja-1", "5511@c.us", "+5511", "Ana");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["sessionName"], "loja-1");
        assert_eq!(json["contactPhone"], "+5511");
        assert!(json["createdAt"].is_string());
    }
}
