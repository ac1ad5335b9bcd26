// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `atende check` command implementation.
//!
//! Validates the configuration and the pieces it points at: the catalog
//! seed, the OCR binary, the provisioning endpoint and the follow-up store.

use std::io::IsTerminal;
use std::path::Path;
use std::time::{Duration, Instant};

use atende_catalog::CatalogSeed;
use atende_config::AtendeConfig;
use atende_core::types::HealthStatus;
use atende_core::{AtendeError, PluginAdapter};
use atende_followup::FollowUpStore;
use atende_ocr::TesseractOcr;

use crate::app;

/// Status of a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

/// Result of a single check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub duration: Duration,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, message: impl Into<String>, start: Instant) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.into(),
            duration: start.elapsed(),
        }
    }
}

/// Runs every check and prints the report. Returns the number of failed
/// checks.
pub async fn run_check(config: &AtendeConfig, plain: bool) -> Result<usize, AtendeError> {
    let use_color = !plain && std::io::stdout().is_terminal();

    let results = vec![
        check_catalog_seed(config).await,
        check_ocr(config).await,
        check_provisioning(config),
        check_followup_store(config),
    ];

    println!();
    println!("  atende check");
    println!("  {}", "-".repeat(50));
    // Reaching this point means the configuration loaded and validated.
    let config_ok = CheckResult::new("Configuration", CheckStatus::Pass, "valid", Instant::now());
    println!("{}", format_line(&config_ok, use_color));
    for result in &results {
        println!("{}", format_line(result, use_color));
    }
    println!();

    let failed = results
        .iter()
        .filter(|r| r.status == CheckStatus::Fail)
        .count();
    let warned = results
        .iter()
        .filter(|r| r.status == CheckStatus::Warn)
        .count();
    if failed + warned > 0 {
        let issues = failed + warned;
        let word = if issues == 1 { "issue" } else { "issues" };
        println!("  {issues} {word} found.");
    } else {
        println!("  All checks passed.");
    }
    println!();

    Ok(failed)
}

fn format_line(result: &CheckResult, use_color: bool) -> String {
    let duration_ms = result.duration.as_millis();
    if use_color {
        use colored::Colorize;
        let (symbol, message) = match result.status {
            CheckStatus::Pass => ("✓".green().to_string(), result.message.normal().to_string()),
            CheckStatus::Warn => ("!".yellow().to_string(), result.message.yellow().to_string()),
            CheckStatus::Fail => ("✗".red().to_string(), result.message.red().to_string()),
        };
        format!("    {symbol} {:<20} {message} ({duration_ms}ms)", result.name)
    } else {
        let tag = match result.status {
            CheckStatus::Pass => "[OK]  ",
            CheckStatus::Warn => "[WARN]",
            CheckStatus::Fail => "[FAIL]",
        };
        format!("    {tag} {:<20} {} ({duration_ms}ms)", result.name, result.message)
    }
}

/// The seed parses and passes the validated write path.
async fn check_catalog_seed(config: &AtendeConfig) -> CheckResult {
    let start = Instant::now();
    let Some(path) = &config.catalog.seed_path else {
        return CheckResult::new("Catalog seed", CheckStatus::Warn, "no seed_path configured", start);
    };
    if let Err(e) = CatalogSeed::from_path(Path::new(path)) {
        return CheckResult::new("Catalog seed", CheckStatus::Fail, e.to_string(), start);
    }
    match app::build_resolver(config).await {
        Ok(resolver) => {
            let rows = resolver.snapshot().await;
            let message = format!(
                "{} commands, {} quick replies, {} flows, {} variables",
                rows.commands.len(),
                rows.quick_replies.len(),
                rows.flows.len(),
                rows.variables.len()
            );
            CheckResult::new("Catalog seed", CheckStatus::Pass, message, start)
        }
        Err(e) => CheckResult::new("Catalog seed", CheckStatus::Fail, e.to_string(), start),
    }
}

async fn check_ocr(config: &AtendeConfig) -> CheckResult {
    let start = Instant::now();
    let ocr = TesseractOcr::new(&config.ocr);
    match ocr.health_check().await {
        Ok(HealthStatus::Healthy) => {
            CheckResult::new("OCR", CheckStatus::Pass, format!("`{}` available", config.ocr.command), start)
        }
        Ok(HealthStatus::Degraded(message)) => CheckResult::new("OCR", CheckStatus::Warn, message, start),
        Ok(HealthStatus::Unhealthy(message)) => CheckResult::new("OCR", CheckStatus::Fail, message, start),
        Err(e) => CheckResult::new("OCR", CheckStatus::Fail, e.to_string(), start),
    }
}

fn check_provisioning(config: &AtendeConfig) -> CheckResult {
    let start = Instant::now();
    match &config.provisioning.endpoint {
        None => CheckResult::new(
            "Provisioning",
            CheckStatus::Warn,
            "no endpoint, trials fall back to a human",
            start,
        ),
        Some(endpoint) => match app::build_provisioning(config) {
            Ok(_) => CheckResult::new("Provisioning", CheckStatus::Pass, endpoint.clone(), start),
            Err(e) => CheckResult::new("Provisioning", CheckStatus::Fail, e.to_string(), start),
        },
    }
}

fn check_followup_store(config: &AtendeConfig) -> CheckResult {
    let start = Instant::now();
    if !config.followup.enabled {
        return CheckResult::new("Follow-up store", CheckStatus::Pass, "follow-ups disabled", start);
    }
    match FollowUpStore::open(&config.followup.store_path) {
        Ok((_, records)) => CheckResult::new(
            "Follow-up store",
            CheckStatus::Pass,
            format!("{} pending", records.len()),
            start,
        ),
        Err(e) => CheckResult::new("Follow-up store", CheckStatus::Fail, e.to_string(), start),
    }
}
