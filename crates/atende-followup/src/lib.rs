// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delayed, durable, one-shot follow-up reminders.
//!
//! After a trial is issued the engine schedules one reminder per
//! conversation. Records survive restarts in a JSON file that is always
//! replaced atomically, and a reminder is only deleted once its delivery
//! succeeded.

pub mod record;
pub mod scheduler;
pub mod store;

pub use record::FollowUpRecord;
pub use scheduler::{FollowUpScheduler, FollowUpSender, TickReport};
pub use store::FollowUpStore;
