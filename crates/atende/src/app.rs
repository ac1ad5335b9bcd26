// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Assembles the engine context from configuration.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use atende_agent::{
    ChannelFollowUpSender, EchoSuppressor, EngineContext, EngineSettings, Outbox, ProductTable,
    TracingAuditSink,
};
use atende_catalog::{CatalogSeed, ConfigResolver, MemoryCatalogStore};
use atende_config::AtendeConfig;
use atende_core::{AtendeError, AuditSink, ChannelAdapter, ProvisioningAdapter};
use atende_followup::FollowUpScheduler;
use atende_ocr::TesseractOcr;
use atende_upstream::{DisabledProvisioning, HttpProvisioning};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Everything a running engine shares across devices.
pub struct Runtime {
    pub ctx: Arc<EngineContext>,
    pub followups: Option<Arc<FollowUpScheduler>>,
    tick_interval: Duration,
}

impl Runtime {
    /// Starts the follow-up loop, if follow-ups are enabled.
    pub fn spawn_followups(&self, cancel: CancellationToken) -> Option<JoinHandle<()>> {
        let followups = Arc::clone(self.followups.as_ref()?);
        Some(tokio::spawn(followups.run(self.tick_interval, cancel)))
    }
}

/// Builds the catalog resolver and applies the configured seed file.
pub async fn build_resolver(config: &AtendeConfig) -> Result<Arc<ConfigResolver>, AtendeError> {
    let resolver = Arc::new(ConfigResolver::new(
        Arc::new(MemoryCatalogStore::new()),
        Duration::from_secs(config.catalog.cache_ttl_secs),
    ));
    if let Some(path) = &config.catalog.seed_path {
        let rows = CatalogSeed::from_path(Path::new(path))?
            .apply(&resolver)
            .await?;
        info!(path = %path, rows, "catalog seeded");
    }
    Ok(resolver)
}

/// Chooses the provisioning adapter: HTTP when an endpoint is configured.
pub fn build_provisioning(
    config: &AtendeConfig,
) -> Result<Arc<dyn ProvisioningAdapter>, AtendeError> {
    if config.provisioning.endpoint.is_some() {
        Ok(Arc::new(HttpProvisioning::new(&config.provisioning)?))
    } else {
        warn!("provisioning.endpoint not set, every trial request will fall back to a human");
        Ok(Arc::new(DisabledProvisioning))
    }
}

pub async fn build_runtime(
    config: &AtendeConfig,
    channel: Arc<dyn ChannelAdapter>,
) -> Result<Runtime, AtendeError> {
    let resolver = build_resolver(config).await?;
    let echo = Arc::new(EchoSuppressor::new(Duration::from_secs(
        config.echo.fingerprint_ttl_secs,
    )));
    let outbox = Arc::new(Outbox::new(channel, echo));
    let audit: Arc<dyn AuditSink> = Arc::new(TracingAuditSink);

    let followups = if config.followup.enabled {
        let scheduler = Arc::new(FollowUpScheduler::open(
            &config.followup.store_path,
            Duration::from_secs(config.followup.delay_secs),
        )?);
        scheduler.set_sender(Box::new(ChannelFollowUpSender::new(
            Arc::clone(&outbox),
            Arc::clone(&resolver),
            Arc::clone(&audit),
            config.followup.message.clone(),
        )));
        Some(scheduler)
    } else {
        info!("follow-ups disabled by configuration");
        None
    };

    let ctx = Arc::new(EngineContext {
        outbox,
        ocr: Arc::new(TesseractOcr::new(&config.ocr)),
        provisioning: build_provisioning(config)?,
        audit,
        resolver,
        followups: followups.clone(),
        products: ProductTable::from_config(&config.products),
        settings: EngineSettings::from_config(config),
    });

    Ok(Runtime {
        ctx,
        followups,
        tick_interval: Duration::from_secs(config.followup.tick_interval_secs),
    })
}
