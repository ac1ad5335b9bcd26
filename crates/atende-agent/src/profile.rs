// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Product profiles: what each provisionable app needs and how its trial
//! reply is built.

use atende_config::model::ProductConfig;
use atende_core::ProductMode;

/// One provisionable app, selected by the flow name of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductProfile {
    /// Lowercase flow name (`ibo`), also the keyword isolating the product's
    /// block in an upstream answer.
    pub keyword: String,
    /// Product name sent to the upstream.
    pub app_name: String,
    /// Name shown to the contact.
    pub display_name: String,
    pub default_code: String,
    /// Reply with the whole upstream answer instead of the product block.
    pub fallback_full_text: bool,
    pub mode: ProductMode,
    /// Overrides the generic trial reply.
    pub reply_template: Option<String>,
}

impl ProductProfile {
    fn builtin(keyword: &str, app_name: &str, display_name: &str, mode: ProductMode) -> Self {
        Self {
            keyword: keyword.to_string(),
            app_name: app_name.to_string(),
            display_name: display_name.to_string(),
            default_code: String::new(),
            fallback_full_text: false,
            mode,
            reply_template: None,
        }
    }

    fn from_config(config: &ProductConfig) -> Self {
        let keyword = config.keyword.to_lowercase();
        let app_name = config
            .app_name
            .clone()
            .unwrap_or_else(|| keyword.to_uppercase());
        Self {
            display_name: config.display_name.clone().unwrap_or_else(|| app_name.clone()),
            app_name,
            default_code: config.default_code.clone().unwrap_or_default(),
            fallback_full_text: config.fallback_full_text.unwrap_or(false),
            mode: config.mode.unwrap_or(ProductMode::Direct),
            reply_template: config.reply_template.clone(),
            keyword,
        }
    }

    fn apply(&mut self, config: &ProductConfig) {
        if let Some(app_name) = &config.app_name {
            self.app_name = app_name.clone();
        }
        if let Some(display_name) = &config.display_name {
            self.display_name = display_name.clone();
        }
        if let Some(code) = &config.default_code {
            self.default_code = code.clone();
        }
        if let Some(full) = config.fallback_full_text {
            self.fallback_full_text = full;
        }
        if let Some(mode) = config.mode {
            self.mode = mode;
        }
        if config.reply_template.is_some() {
            self.reply_template = config.reply_template.clone();
        }
    }
}

/// Every known product, built-ins first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductTable {
    profiles: Vec<ProductProfile>,
}

impl Default for ProductTable {
    fn default() -> Self {
        let mut playsim =
            ProductProfile::builtin("playsim", "PLAYSIM", "PlaySim", ProductMode::Direct);
        playsim.fallback_full_text = true;
        let mut lazer =
            ProductProfile::builtin("lazer", "LAZER PLAY", "Lazer Play", ProductMode::Direct);
        lazer.default_code = "3093".to_string();
        Self {
            profiles: vec![
                ProductProfile::builtin("ibo", "IBO PLAYER", "IBO Player", ProductMode::Identifier),
                ProductProfile::builtin(
                    "assist",
                    "ASSIST PLUS",
                    "Assist Plus",
                    ProductMode::ScreenCheck,
                ),
                lazer,
                ProductProfile::builtin("fun", "FUN TV", "Fun TV", ProductMode::Direct),
                playsim,
            ],
        }
    }
}

impl ProductTable {
    /// Built-in profiles with `overrides` applied; unknown keywords add new
    /// profiles.
    pub fn from_config(overrides: &[ProductConfig]) -> Self {
        let mut table = Self::default();
        for config in overrides {
            let keyword = config.keyword.to_lowercase();
            match table.profiles.iter_mut().find(|p| p.keyword == keyword) {
                Some(profile) => profile.apply(config),
                None => table.profiles.push(ProductProfile::from_config(config)),
            }
        }
        table
    }

    /// The profile for a command flow name, case-insensitively.
    pub fn get(&self, flow_name: &str) -> Option<&ProductProfile> {
        let flow_name = flow_name.trim().to_lowercase();
        self.profiles.iter().find(|p| p.keyword == flow_name)
    }

    /// The product provisioned when a human agent starts the identifier
    /// walkthrough by hand.
    pub fn default_identifier(&self) -> Option<&ProductProfile> {
        self.profiles.iter().find(|p| p.mode == ProductMode::Identifier)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProductProfile> {
        self.profiles.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(keyword: &str) -> ProductConfig {
        ProductConfig {
            keyword: keyword.to_string(),
            app_name: None,
            display_name: None,
            default_code: None,
            fallback_full_text: None,
            mode: None,
            reply_template: None,
        }
    }

    #[test]
    fn builtins_cover_every_mode() {
        let table = ProductTable::default();
        assert_eq!(table.get("IBO").map(|p| p.mode), Some(ProductMode::Identifier));
        assert_eq!(table.get("assist").map(|p| p.mode), Some(ProductMode::ScreenCheck));
        for keyword in ["lazer", "fun", "playsim"] {
            assert_eq!(table.get(keyword).map(|p| p.mode), Some(ProductMode::Direct));
        }
        assert!(table.get("playsim").is_some_and(|p| p.fallback_full_text));
        assert_eq!(table.default_identifier().map(|p| p.keyword.as_str()), Some("ibo"));
    }

    #[test]
    fn overrides_keep_unset_fields() {
        let mut ibo = product("IBO");
        ibo.display_name = Some("IBO Pro".into());
        ibo.reply_template = Some("{{ username }}".into());
        let table = ProductTable::from_config(&[ibo]);

        let profile = table.get("ibo").expect("ibo");
        assert_eq!(profile.display_name, "IBO Pro");
        assert_eq!(profile.app_name, "IBO PLAYER");
        assert_eq!(profile.mode, ProductMode::Identifier);
        assert_eq!(profile.reply_template.as_deref(), Some("{{ username }}"));
    }

    #[test]
    fn unknown_keywords_add_profiles() {
        let mut smart = product("smart");
        smart.mode = Some(ProductMode::ScreenCheck);
        let table = ProductTable::from_config(&[smart]);

        let profile = table.get("smart").expect("smart");
        assert_eq!(profile.app_name, "SMART");
        assert_eq!(profile.display_name, "SMART");
        assert_eq!(profile.mode, ProductMode::ScreenCheck);
        assert_eq!(table.iter().count(), 6);
    }

    #[test]
    fn unknown_flow_name_has_no_profile() {
        assert!(ProductTable::default().get("netflix").is_none());
    }
}
