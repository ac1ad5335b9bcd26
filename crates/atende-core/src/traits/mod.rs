// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the external collaborators of the engine.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod audit;
pub mod catalog;
pub mod channel;
pub mod ocr;
pub mod provisioning;

pub use adapter::PluginAdapter;
pub use audit::AuditSink;
pub use catalog::CatalogStore;
pub use channel::ChannelAdapter;
pub use ocr::OcrAdapter;
pub use provisioning::ProvisioningAdapter;
