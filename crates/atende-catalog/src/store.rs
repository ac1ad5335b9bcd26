// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory catalog store.

use std::sync::Mutex;

use async_trait::async_trait;
use atende_core::types::{AdapterType, CatalogEntry, CatalogKind, CatalogSnapshot, HealthStatus};
use atende_core::{AtendeError, CatalogStore, PluginAdapter};

/// Catalog rows held in process memory, in creation order.
///
/// Ids are assigned from a single counter shared by every kind, so a lower
/// id always means an earlier insert.
#[derive(Debug, Default)]
pub struct MemoryCatalogStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    last_id: u64,
    rows: CatalogSnapshot,
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, AtendeError> {
        self.inner
            .lock()
            .map_err(|_| AtendeError::Internal("catalog store lock poisoned".to_string()))
    }
}

/// Replaces the row with `id` in `rows`. Returns `false` when absent.
fn replace<T>(rows: &mut [T], id: u64, id_of: fn(&T) -> u64, row: T) -> bool {
    match rows.iter_mut().find(|r| id_of(r) == id) {
        Some(slot) => {
            *slot = row;
            true
        }
        None => false,
    }
}

fn remove<T>(rows: &mut Vec<T>, id: u64, id_of: fn(&T) -> u64) -> bool {
    let before = rows.len();
    rows.retain(|r| id_of(r) != id);
    rows.len() != before
}

#[async_trait]
impl PluginAdapter for MemoryCatalogStore {
    fn name(&self) -> &str {
        "memory-catalog"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Catalog
    }

    async fn health_check(&self) -> Result<HealthStatus, AtendeError> {
        Ok(match self.inner.lock() {
            Ok(_) => HealthStatus::Healthy,
            Err(_) => HealthStatus::Unhealthy("lock poisoned".to_string()),
        })
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalogStore {
    async fn snapshot(&self) -> Result<CatalogSnapshot, AtendeError> {
        Ok(self.lock()?.rows.clone())
    }

    async fn insert(&self, mut entry: CatalogEntry) -> Result<CatalogEntry, AtendeError> {
        let mut inner = self.lock()?;
        inner.last_id += 1;
        entry.set_id(inner.last_id);
        match entry.clone() {
            CatalogEntry::Command(c) => inner.rows.commands.push(c),
            CatalogEntry::QuickReply(q) => inner.rows.quick_replies.push(q),
            CatalogEntry::Flow(f) => inner.rows.flows.push(f),
            CatalogEntry::Variable(v) => inner.rows.variables.push(v),
        }
        Ok(entry)
    }

    async fn update(&self, entry: CatalogEntry) -> Result<(), AtendeError> {
        let mut inner = self.lock()?;
        let id = entry.id();
        let kind = entry.kind();
        let rows = &mut inner.rows;
        let found = match entry {
            CatalogEntry::Command(c) => replace(&mut rows.commands, id, |r| r.id, c),
            CatalogEntry::QuickReply(q) => replace(&mut rows.quick_replies, id, |r| r.id, q),
            CatalogEntry::Flow(f) => replace(&mut rows.flows, id, |r| r.id, f),
            CatalogEntry::Variable(v) => replace(&mut rows.variables, id, |r| r.id, v),
        };
        if found {
            Ok(())
        } else {
            Err(AtendeError::NotFound {
                kind: kind.to_string(),
                id,
            })
        }
    }

    async fn delete(&self, kind: CatalogKind, id: u64) -> Result<bool, AtendeError> {
        let mut inner = self.lock()?;
        let rows = &mut inner.rows;
        Ok(match kind {
            CatalogKind::Command => remove(&mut rows.commands, id, |r| r.id),
            CatalogKind::QuickReply => remove(&mut rows.quick_replies, id, |r| r.id),
            CatalogKind::Flow => remove(&mut rows.flows, id, |r| r.id),
            CatalogKind::Variable => remove(&mut rows.variables, id, |r| r.id),
        })
    }
}
