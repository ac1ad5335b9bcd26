// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provisioning upstream that issues trial credentials.

use async_trait::async_trait;

use crate::error::AtendeError;
use crate::traits::adapter::PluginAdapter;
use crate::types::TrialRequest;

/// Requests a trial credential and returns the upstream's free-form answer.
#[async_trait]
pub trait ProvisioningAdapter: PluginAdapter {
    async fn request_trial(&self, request: &TrialRequest) -> Result<String, AtendeError>;
}
