// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! TOML catalog seed files.
//!
//! ```toml
//! [[commands]]
//! token = "#ibo"
//! flow_name = "ibo"
//!
//! [[quick_replies]]
//! trigger = "pix"
//! response_template = "Nossa chave pix: {{ pix }}"
//! match_type = "starts_with"
//!
//! [[flows]]
//! name = "boas vindas"
//! triggers = ["oi", "olá"]
//! stages = ["Olá! Tudo bem?", "Quer testar qual aplicativo?"]
//!
//! [[variables]]
//! name = "pix"
//! value = "vendas@example.com"
//! ```

use std::path::Path;

use atende_core::AtendeError;
use atende_core::types::{
    CatalogEntry, CommandDefinition, CustomFlowDefinition, QuickReplyDefinition,
    VariableDefinition,
};
use serde::Deserialize;
use tracing::info;

use crate::resolver::ConfigResolver;

/// Rows read from a seed file, in file order.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogSeed {
    #[serde(default)]
    pub commands: Vec<CommandDefinition>,
    #[serde(default)]
    pub quick_replies: Vec<QuickReplyDefinition>,
    #[serde(default)]
    pub flows: Vec<CustomFlowDefinition>,
    #[serde(default)]
    pub variables: Vec<VariableDefinition>,
}

impl CatalogSeed {
    pub fn from_toml(content: &str) -> Result<Self, AtendeError> {
        toml::from_str(content).map_err(|e| AtendeError::Config(format!("catalog seed: {e}")))
    }

    pub fn from_path(path: &Path) -> Result<Self, AtendeError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AtendeError::Config(format!("cannot read catalog seed {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// All rows as entries, kinds in declaration order.
    pub fn into_entries(self) -> Vec<CatalogEntry> {
        self.commands
            .into_iter()
            .map(CatalogEntry::Command)
            .chain(self.quick_replies.into_iter().map(CatalogEntry::QuickReply))
            .chain(self.flows.into_iter().map(CatalogEntry::Flow))
            .chain(self.variables.into_iter().map(CatalogEntry::Variable))
            .collect()
    }

    /// Creates every row through the validated write path. Stops at the
    /// first rejected row.
    pub async fn apply(self, resolver: &ConfigResolver) -> Result<usize, AtendeError> {
        let entries = self.into_entries();
        let count = entries.len();
        for entry in entries {
            resolver.create(entry).await?;
        }
        info!(rows = count, "catalog seed applied");
        Ok(count)
    }
}
