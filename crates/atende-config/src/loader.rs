// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./atende.toml` > `~/.config/atende/atende.toml` > `/etc/atende/atende.toml`
//! with environment variable overrides via `ATENDE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::diagnostic::SECTIONS;
use crate::model::AtendeConfig;

/// System-wide configuration file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/atende/atende.toml";

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/atende/atende.toml` (system-wide)
/// 3. `~/.config/atende/atende.toml` (user XDG config)
/// 4. `./atende.toml` (local directory)
/// 5. `ATENDE_*` environment variables
pub fn load_config() -> Result<AtendeConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<AtendeConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(AtendeConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<AtendeConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(AtendeConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the layered Figment before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(AtendeConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("atende/atende.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("atende.toml"))
        .merge(env_provider())
}

/// Maps `ATENDE_<SECTION>_<KEY>` to `section.key` for every single table.
/// `[[products]]` entries cannot be set from the environment.
///
/// Only the first underscore after the section name becomes a dot, so
/// `ATENDE_ECHO_FINGERPRINT_TTL_SECS` maps to `echo.fingerprint_ttl_secs`.
fn env_provider() -> Env {
    Env::prefixed("ATENDE_").map(|key| {
        let key_str = key.as_str();
        let mapped = SECTIONS
            .iter()
            .filter(|section| !section.repeated)
            .find_map(|section| {
                key_str
                    .strip_prefix(section.name)
                    .and_then(|rest| rest.strip_prefix('_'))
                    .map(|rest| format!("{}.{rest}", section.name))
            })
            .unwrap_or_else(|| key_str.to_string());
        mapped.into()
    })
}
