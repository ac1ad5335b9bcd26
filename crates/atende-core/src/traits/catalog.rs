// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage of the operator-managed catalog (commands, quick replies, flows,
//! variables).

use async_trait::async_trait;

use crate::error::AtendeError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{CatalogEntry, CatalogKind, CatalogSnapshot};

/// Persistence for catalog rows.
///
/// Stores perform no shape validation; writes reach them through the
/// validating resolver in `atende-catalog`.
#[async_trait]
pub trait CatalogStore: PluginAdapter {
    /// Returns every row, each list in creation order.
    async fn snapshot(&self) -> Result<CatalogSnapshot, AtendeError>;

    /// Inserts a row, assigning a fresh id. Returns the stored row.
    async fn insert(&self, entry: CatalogEntry) -> Result<CatalogEntry, AtendeError>;

    /// Replaces the row with the same kind and id.
    async fn update(&self, entry: CatalogEntry) -> Result<(), AtendeError>;

    /// Deletes a row. Returns `false` when no such row existed.
    async fn delete(&self, kind: CatalogKind, id: u64) -> Result<bool, AtendeError>;
}
