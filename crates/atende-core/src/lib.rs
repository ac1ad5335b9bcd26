// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Atende conversation engine.
//!
//! This crate provides the trait definitions for the engine's external
//! collaborators (transport, OCR, provisioning upstream, catalog store, audit
//! sink), the shared error type, and the common types passed between them.

pub mod error;
pub mod traits;
pub mod types;

pub use error::AtendeError;
pub use types::{AdapterType, ContactKey, HealthStatus, MediaRef, MessageId, ProductMode};

pub use traits::{
    AuditSink, CatalogStore, ChannelAdapter, OcrAdapter, PluginAdapter, ProvisioningAdapter,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapter_type_round_trips_through_display() {
        use std::str::FromStr;

        for variant in [
            AdapterType::Channel,
            AdapterType::Ocr,
            AdapterType::Provisioning,
            AdapterType::Catalog,
            AdapterType::Audit,
        ] {
            let parsed = AdapterType::from_str(&variant.to_string()).expect("should parse back");
            assert_eq!(variant, parsed);
        }
    }

    #[test]
    fn adapter_type_serialization() {
        let json = serde_json::to_string(&AdapterType::Ocr).expect("should serialize");
        let parsed: AdapterType = serde_json::from_str(&json).expect("should deserialize");
        assert_eq!(parsed, AdapterType::Ocr);
    }

    #[test]
    fn all_traits_are_exported() {
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_channel_adapter<T: ChannelAdapter>() {}
        fn _assert_ocr_adapter<T: OcrAdapter>() {}
        fn _assert_provisioning_adapter<T: ProvisioningAdapter>() {}
        fn _assert_catalog_store<T: CatalogStore>() {}
        fn _assert_audit_sink<T: AuditSink>() {}
    }
}
