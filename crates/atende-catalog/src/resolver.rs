// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Device-scoped, cached lookups over the catalog store.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use atende_core::types::{
    CatalogEntry, CatalogKind, CatalogSnapshot, CommandDefinition, CustomFlowDefinition,
    MatchType, QuickReplyDefinition,
};
use atende_core::{AtendeError, CatalogStore};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::validate::{check_conflict, normalize_entry, normalize_token};

/// Default lifetime of a resolver snapshot.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5);

struct Cached {
    rows: Arc<CatalogSnapshot>,
    loaded_at: Option<Instant>,
}

/// Read-through cache over a [`CatalogStore`].
///
/// Reads are served from an immutable snapshot that is reloaded when older
/// than the TTL. Writes made through this resolver reload it immediately.
///
/// Staleness: writes made through another resolver (or directly on the
/// store) become visible here only once the current snapshot expires, up
/// to one TTL later.
///
/// Lookups for a device consider that device's rows first and global rows
/// (`device_id = None`) second; within each tier the earlier-created row
/// (lower id) wins. Disabled rows never match.
pub struct ConfigResolver {
    store: Arc<dyn CatalogStore>,
    ttl: Duration,
    cache: ArcSwap<Cached>,
    refresh: Mutex<()>,
}

impl ConfigResolver {
    pub fn new(store: Arc<dyn CatalogStore>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            cache: ArcSwap::from_pointee(Cached {
                rows: Arc::new(CatalogSnapshot::default()),
                loaded_at: None,
            }),
            refresh: Mutex::new(()),
        }
    }

    /// Returns the current snapshot, reloading it when expired.
    ///
    /// A store failure is logged and the previous snapshot keeps serving.
    pub async fn snapshot(&self) -> Arc<CatalogSnapshot> {
        let cached = self.cache.load_full();
        if self.is_fresh(&cached) {
            return Arc::clone(&cached.rows);
        }

        let _guard = self.refresh.lock().await;
        // Another task may have reloaded while we waited.
        let cached = self.cache.load_full();
        if self.is_fresh(&cached) {
            return Arc::clone(&cached.rows);
        }
        match self.reload().await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, "catalog reload failed, serving previous snapshot");
                Arc::clone(&cached.rows)
            }
        }
    }

    fn is_fresh(&self, cached: &Cached) -> bool {
        cached
            .loaded_at
            .is_some_and(|at| at.elapsed() < self.ttl)
    }

    async fn reload(&self) -> Result<Arc<CatalogSnapshot>, AtendeError> {
        let rows = self.store.snapshot().await?;
        debug!(
            commands = rows.commands.len(),
            quick_replies = rows.quick_replies.len(),
            flows = rows.flows.len(),
            variables = rows.variables.len(),
            "catalog snapshot reloaded"
        );
        let rows = Arc::new(rows);
        self.cache.store(Arc::new(Cached {
            rows: Arc::clone(&rows),
            loaded_at: Some(Instant::now()),
        }));
        Ok(rows)
    }

    /// First enabled quick reply matching `text` for `device_id`.
    pub async fn find_quick_reply(&self, text: &str, device_id: &str) -> Option<QuickReplyDefinition> {
        let body = text.trim().to_lowercase();
        if body.is_empty() {
            return None;
        }
        let rows = self.snapshot().await;
        scoped(&rows.quick_replies, device_id, |q| q.device_id.as_deref(), |q| q.id)
            .into_iter()
            .filter(|q| q.enabled)
            .find(|q| {
                let trigger = q.trigger.trim().to_lowercase();
                !trigger.is_empty()
                    && match q.match_type {
                        MatchType::Exact => body == trigger,
                        MatchType::StartsWith => body.starts_with(&trigger),
                        MatchType::Includes => body.contains(&trigger),
                    }
            })
            .cloned()
    }

    /// First enabled custom flow with a trigger contained in `text`.
    pub async fn find_flow_trigger(&self, text: &str, device_id: &str) -> Option<CustomFlowDefinition> {
        let body = text.to_lowercase();
        let rows = self.snapshot().await;
        scoped(&rows.flows, device_id, |f| f.device_id.as_deref(), |f| f.id)
            .into_iter()
            .filter(|f| f.enabled && !f.stages.is_empty())
            .find(|f| {
                f.triggers.iter().any(|t| {
                    let t = t.trim().to_lowercase();
                    !t.is_empty() && body.contains(&t)
                })
            })
            .cloned()
    }

    /// The flow with `id`, if it still exists and is enabled.
    pub async fn flow(&self, id: u64) -> Option<CustomFlowDefinition> {
        let rows = self.snapshot().await;
        rows.flows.iter().find(|f| f.id == id && f.enabled).cloned()
    }

    /// Resolves a command token (any case, prefix optional).
    pub async fn resolve_command(&self, token: &str, device_id: &str) -> Option<CommandDefinition> {
        let token = normalize_token(token).ok()?;
        let rows = self.snapshot().await;
        scoped(&rows.commands, device_id, |c| c.device_id.as_deref(), |c| c.id)
            .into_iter()
            .find(|c| c.enabled && c.token == token)
            .cloned()
    }

    /// Template variables for `device_id`: globals overridden by the
    /// device's own values.
    pub async fn variables_map(&self, device_id: &str) -> HashMap<String, String> {
        let rows = self.snapshot().await;
        let mut vars = HashMap::new();
        // Reverse scope order so higher-precedence rows are inserted last.
        for v in scoped(&rows.variables, device_id, |v| v.device_id.as_deref(), |v| v.id)
            .into_iter()
            .rev()
        {
            vars.insert(v.name.clone(), v.value.clone());
        }
        vars
    }

    /// Validates and stores a new row. Returns the stored row with its id.
    pub async fn create(&self, entry: CatalogEntry) -> Result<CatalogEntry, AtendeError> {
        let mut entry = normalize_entry(entry)?;
        entry.set_id(0);
        let _guard = self.refresh.lock().await;
        check_conflict(&self.store.snapshot().await?, &entry)?;
        let stored = self.store.insert(entry).await?;
        self.reload().await?;
        debug!(kind = %stored.kind(), id = stored.id(), "catalog row created");
        Ok(stored)
    }

    /// Validates and replaces an existing row.
    pub async fn update(&self, entry: CatalogEntry) -> Result<(), AtendeError> {
        let entry = normalize_entry(entry)?;
        let _guard = self.refresh.lock().await;
        check_conflict(&self.store.snapshot().await?, &entry)?;
        self.store.update(entry).await?;
        self.reload().await?;
        Ok(())
    }

    /// Deletes a row. Returns `false` when it did not exist.
    pub async fn delete(&self, kind: CatalogKind, id: u64) -> Result<bool, AtendeError> {
        let _guard = self.refresh.lock().await;
        let deleted = self.store.delete(kind, id).await?;
        self.reload().await?;
        Ok(deleted)
    }
}

/// Rows visible to `device_id`, device tier first, each tier by id.
fn scoped<'a, T>(
    rows: &'a [T],
    device_id: &str,
    device_of: fn(&T) -> Option<&str>,
    id_of: fn(&T) -> u64,
) -> Vec<&'a T> {
    let mut visible: Vec<&T> = rows
        .iter()
        .filter(|r| device_of(r).is_none_or(|d| d == device_id))
        .collect();
    visible.sort_by_key(|r| (device_of(r).is_none(), id_of(r)));
    visible
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryCatalogStore;
    use atende_core::types::VariableDefinition;

    fn resolver(store: &Arc<MemoryCatalogStore>) -> ConfigResolver {
        ConfigResolver::new(store.clone(), DEFAULT_CACHE_TTL)
    }

    fn quick(trigger: &str, response: &str, match_type: MatchType, device: Option<&str>) -> CatalogEntry {
        CatalogEntry::QuickReply(QuickReplyDefinition {
            id: 0,
            trigger: trigger.into(),
            response_template: response.into(),
            match_type,
            enabled: true,
            device_id: device.map(Into::into),
        })
    }

    fn command(token: &str, flow: &str, device: Option<&str>, enabled: bool) -> CatalogEntry {
        CatalogEntry::Command(CommandDefinition {
            id: 0,
            token: token.into(),
            flow_name: flow.into(),
            enabled,
            device_id: device.map(Into::into),
        })
    }

    fn variable(name: &str, value: &str, device: Option<&str>) -> CatalogEntry {
        CatalogEntry::Variable(VariableDefinition {
            id: 0,
            name: name.into(),
            value: value.into(),
            device_id: device.map(Into::into),
        })
    }

    #[tokio::test]
    async fn match_types() {
        let store = Arc::new(MemoryCatalogStore::new());
        let r = resolver(&store);
        r.create(quick("preço", "R$ 30", MatchType::Exact, None)).await.unwrap();
        r.create(quick("pix", "chave", MatchType::StartsWith, None)).await.unwrap();
        r.create(quick("horário", "9h às 18h", MatchType::Includes, None)).await.unwrap();

        let hit = |q: Option<QuickReplyDefinition>| q.map(|q| q.response_template);
        assert_eq!(hit(r.find_quick_reply("  PREÇO ", "d").await).as_deref(), Some("R$ 30"));
        assert_eq!(hit(r.find_quick_reply("qual o preço", "d").await), None);
        assert_eq!(hit(r.find_quick_reply("Pix por favor", "d").await).as_deref(), Some("chave"));
        assert_eq!(hit(r.find_quick_reply("manda o pix", "d").await), None);
        assert_eq!(
            hit(r.find_quick_reply("qual o HORÁRIO de vocês?", "d").await).as_deref(),
            Some("9h às 18h")
        );
    }

    #[tokio::test]
    async fn device_rows_win_over_global_rows() {
        let store = Arc::new(MemoryCatalogStore::new());
        let r = resolver(&store);
        r.create(quick("oi", "global", MatchType::Includes, None)).await.unwrap();
        r.create(quick("oi", "loja", MatchType::Includes, Some("loja"))).await.unwrap();

        let reply = r.find_quick_reply("oi", "loja").await.unwrap();
        assert_eq!(reply.response_template, "loja");
        let reply = r.find_quick_reply("oi", "outra").await.unwrap();
        assert_eq!(reply.response_template, "global");
    }

    #[tokio::test]
    async fn earlier_rows_win_within_a_tier() {
        let store = Arc::new(MemoryCatalogStore::new());
        let r = resolver(&store);
        r.create(quick("teste", "primeiro", MatchType::Includes, None)).await.unwrap();
        r.create(quick("quero teste", "segundo", MatchType::Includes, None)).await.unwrap();
        let reply = r.find_quick_reply("quero teste", "d").await.unwrap();
        assert_eq!(reply.response_template, "primeiro");
    }

    #[tokio::test]
    async fn disabled_rows_never_match() {
        let store = Arc::new(MemoryCatalogStore::new());
        let r = resolver(&store);
        r.create(command("#ibo", "ibo", Some("loja"), false)).await.unwrap();
        assert!(r.resolve_command("#ibo", "loja").await.is_none());

        r.create(command("#ibo", "ibo_global", None, true)).await.unwrap();
        let cmd = r.resolve_command("#IBO", "loja").await.unwrap();
        assert_eq!(cmd.flow_name, "ibo_global");
    }

    #[tokio::test]
    async fn command_tokens_resolve_case_insensitively() {
        let store = Arc::new(MemoryCatalogStore::new());
        let r = resolver(&store);
        r.create(command("#Assist", "assist", None, true)).await.unwrap();
        r.create(command("#assist", "assist_loja", Some("loja"), true)).await.unwrap();
        assert_eq!(r.resolve_command("ASSIST", "x").await.unwrap().flow_name, "assist");
        assert_eq!(r.resolve_command("#assist", "loja").await.unwrap().flow_name, "assist_loja");
        assert!(r.resolve_command("#nope", "loja").await.is_none());
        assert!(r.resolve_command("#bad token", "loja").await.is_none());
    }

    #[tokio::test]
    async fn device_variables_override_globals() {
        let store = Arc::new(MemoryCatalogStore::new());
        let r = resolver(&store);
        r.create(variable("pix", "global@pix", None)).await.unwrap();
        r.create(variable("site", "example.com", None)).await.unwrap();
        r.create(variable("pix", "loja@pix", Some("loja"))).await.unwrap();

        let vars = r.variables_map("loja").await;
        assert_eq!(vars["pix"], "loja@pix");
        assert_eq!(vars["site"], "example.com");
        assert_eq!(r.variables_map("outra").await["pix"], "global@pix");
    }

    #[tokio::test]
    async fn flow_triggers_and_lookup() {
        let store = Arc::new(MemoryCatalogStore::new());
        let r = resolver(&store);
        let flow = r
            .create(CatalogEntry::Flow(CustomFlowDefinition {
                id: 0,
                name: "boas vindas".into(),
                triggers: vec!["Oi".into()],
                stages: vec!["Olá!".into(), "Como posso ajudar?".into()],
                enabled: true,
                device_id: None,
            }))
            .await
            .unwrap();
        let found = r.find_flow_trigger("OI, tudo bem?", "d").await.unwrap();
        assert_eq!(found.id, flow.id());
        assert!(r.find_flow_trigger("bom dia", "d").await.is_none());
        assert!(r.flow(flow.id()).await.is_some());

        assert!(r.delete(CatalogKind::Flow, flow.id()).await.unwrap());
        assert!(r.flow(flow.id()).await.is_none());
    }

    #[tokio::test]
    async fn write_errors_propagate() {
        let store = Arc::new(MemoryCatalogStore::new());
        let r = resolver(&store);
        r.create(command("#ibo", "ibo", None, true)).await.unwrap();
        let err = r.create(command("#IBO", "other", None, true)).await.unwrap_err();
        assert!(matches!(err, AtendeError::Conflict { .. }));
        let err = r.create(command("#i bo", "ibo", None, true)).await.unwrap_err();
        assert!(matches!(err, AtendeError::Validation { .. }));
        assert!(err.is_admin_rejection());
    }

    #[tokio::test(start_paused = true)]
    async fn other_resolvers_see_writes_after_ttl() {
        let store = Arc::new(MemoryCatalogStore::new());
        let writer = resolver(&store);
        let reader = resolver(&store);

        assert!(reader.find_quick_reply("oi", "d").await.is_none());
        writer.create(quick("oi", "olá", MatchType::Includes, None)).await.unwrap();

        // The writer sees its own write at once.
        assert!(writer.find_quick_reply("oi", "d").await.is_some());
        // The reader keeps its snapshot until it expires.
        assert!(reader.find_quick_reply("oi", "d").await.is_none());
        tokio::time::advance(DEFAULT_CACHE_TTL + Duration::from_millis(1)).await;
        assert!(reader.find_quick_reply("oi", "d").await.is_some());
    }
}
