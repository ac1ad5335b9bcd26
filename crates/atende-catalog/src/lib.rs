// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operator catalog for the Atende engine.
//!
//! The catalog holds the commands, quick replies, custom flows and template
//! variables an operator manages. [`ConfigResolver`] is the only way the
//! engine reads it and the only write path: writes are validated
//! ([`validate`]) and checked for conflicts before reaching the
//! [`CatalogStore`](atende_core::CatalogStore).

pub mod resolver;
pub mod seed;
pub mod store;
pub mod template;
pub mod validate;

pub use resolver::{ConfigResolver, DEFAULT_CACHE_TTL};
pub use seed::CatalogSeed;
pub use store::MemoryCatalogStore;
pub use template::render;
pub use validate::{COMMAND_PREFIX, normalize_token};
