// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP adapter for the trial provisioning upstream.
//!
//! Provides [`HttpProvisioning`], which posts a [`TrialRequest`] as JSON to
//! the configured endpoint and hands back the upstream's free-form answer,
//! and [`DisabledProvisioning`] for deployments without an endpoint.
//!
//! Trial requests are not retried: a repeated request may issue a second
//! credential.

use std::time::Duration;

use async_trait::async_trait;
use atende_config::model::ProvisioningConfig;
use atende_core::types::{AdapterType, HealthStatus, TrialRequest};
use atende_core::{AtendeError, PluginAdapter, ProvisioningAdapter};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use tracing::{debug, warn};

/// Posts trial requests to an HTTP endpoint.
#[derive(Debug, Clone)]
pub struct HttpProvisioning {
    client: reqwest::Client,
    endpoint: url::Url,
    timeout: Duration,
}

impl HttpProvisioning {
    /// Builds the client from configuration. Fails when no endpoint is
    /// configured or the API key is not a valid header value.
    pub fn new(config: &ProvisioningConfig) -> Result<Self, AtendeError> {
        let endpoint = config
            .endpoint
            .as_deref()
            .ok_or_else(|| AtendeError::Config("provisioning.endpoint is not set".to_string()))?;
        let endpoint = url::Url::parse(endpoint).map_err(|e| {
            AtendeError::Config(format!("invalid provisioning endpoint `{endpoint}`: {e}"))
        })?;

        let mut headers = HeaderMap::new();
        if let Some(api_key) = &config.api_key {
            let value = HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(|e| {
                AtendeError::Config(format!("invalid provisioning API key header value: {e}"))
            })?;
            headers.insert(AUTHORIZATION, value);
        }

        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| AtendeError::Provisioning {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            endpoint,
            timeout,
        })
    }

    pub fn endpoint(&self) -> &url::Url {
        &self.endpoint
    }
}

#[async_trait]
impl PluginAdapter for HttpProvisioning {
    fn name(&self) -> &str {
        "http-provisioning"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provisioning
    }

    async fn health_check(&self) -> Result<HealthStatus, AtendeError> {
        // The upstream has no side-effect-free health call; a trial request would
        // issue a credential.
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl ProvisioningAdapter for HttpProvisioning {
    async fn request_trial(&self, request: &TrialRequest) -> Result<String, AtendeError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AtendeError::Timeout {
                        duration: self.timeout,
                    }
                } else {
                    AtendeError::Provisioning {
                        message: format!("HTTP request failed: {e}"),
                        source: Some(Box::new(e)),
                    }
                }
            })?;

        let status = response.status();
        debug!(status = %status, product = %request.product_name, "provisioning response received");

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                AtendeError::Timeout {
                    duration: self.timeout,
                }
            } else {
                AtendeError::Provisioning {
                    message: format!("failed to read response body: {e}"),
                    source: Some(Box::new(e)),
                }
            }
        })?;

        if !status.is_success() {
            warn!(status = %status, body = %body, "provisioning upstream rejected request");
            return Err(AtendeError::Provisioning {
                message: format!("upstream returned {status}: {}", body.trim()),
                source: None,
            });
        }
        Ok(body)
    }
}

/// Stands in when no endpoint is configured: every request fails, so the
/// engine answers with its fallback message.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledProvisioning;

#[async_trait]
impl PluginAdapter for DisabledProvisioning {
    fn name(&self) -> &str {
        "disabled-provisioning"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provisioning
    }

    async fn health_check(&self) -> Result<HealthStatus, AtendeError> {
        Ok(HealthStatus::Degraded(
            "no provisioning endpoint configured".to_string(),
        ))
    }
}

#[async_trait]
impl ProvisioningAdapter for DisabledProvisioning {
    async fn request_trial(&self, _request: &TrialRequest) -> Result<String, AtendeError> {
        Err(AtendeError::Provisioning {
            message: "no provisioning endpoint configured".to_string(),
            source: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(endpoint: &str) -> ProvisioningConfig {
        ProvisioningConfig {
            endpoint: Some(endpoint.to_string()),
            api_key: Some("segredo".to_string()),
            timeout_secs: 5,
            ..ProvisioningConfig::default()
        }
    }

    fn request() -> TrialRequest {
        TrialRequest {
            product_name: "IBO PLAYER".into(),
            device_identifier_phone: "AA:BB:CC:11:22:33".into(),
            contact_name: "Ana".into(),
            contact_phone_e164: "+5511999990000".into(),
            label: "atende".into(),
        }
    }

    #[test]
    fn missing_endpoint_is_a_config_error() {
        let err = HttpProvisioning::new(&ProvisioningConfig::default()).unwrap_err();
        assert!(matches!(err, AtendeError::Config(_)));
    }

    #[tokio::test]
    async fn posts_camel_case_json_with_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/trial"))
            .and(header("authorization", "Bearer segredo"))
            .and(body_json(serde_json::json!({
                "productName": "IBO PLAYER",
                "deviceIdentifierPhone": "AA:BB:CC:11:22:33",
                "contactName": "Ana",
                "contactPhoneE164": "+5511999990000",
                "label": "atende"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string("Usuário: ana\nSenha: 1"))
            .expect(1)
            .mount(&server)
            .await;

        let upstream = HttpProvisioning::new(&config(&format!("{}/trial", server.uri()))).unwrap();
        let answer = upstream.request_trial(&request()).await.unwrap();
        assert_eq!(answer, "Usuário: ana\nSenha: 1");
    }

    #[tokio::test]
    async fn error_status_is_a_provisioning_error_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("manutenção"))
            .expect(1)
            .mount(&server)
            .await;

        let upstream = HttpProvisioning::new(&config(&server.uri())).unwrap();
        let err = upstream.request_trial(&request()).await.unwrap_err();
        assert!(matches!(err, AtendeError::Provisioning { .. }));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn slow_upstream_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let mut cfg = config(&server.uri());
        cfg.timeout_secs = 1;
        let upstream = HttpProvisioning::new(&cfg).unwrap();
        let err = upstream.request_trial(&request()).await.unwrap_err();
        assert!(matches!(err, AtendeError::Timeout { .. }));
    }

    #[tokio::test]
    async fn disabled_provisioning_always_fails() {
        let err = DisabledProvisioning.request_trial(&request()).await.unwrap_err();
        assert!(err.is_infrastructure());
    }
}
