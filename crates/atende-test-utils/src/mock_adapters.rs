// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock OCR, provisioning and audit adapters.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use tokio::sync::Mutex;

use atende_core::AtendeError;
use atende_core::traits::adapter::PluginAdapter;
use atende_core::traits::audit::AuditSink;
use atende_core::traits::ocr::OcrAdapter;
use atende_core::traits::provisioning::ProvisioningAdapter;
use atende_core::types::{
    AdapterType, AuditEvent, AuditEventType, HealthStatus, OcrOutput, TrialRequest,
};

macro_rules! mock_plugin {
    ($ty:ty, $name:literal, $kind:expr) => {
        #[async_trait]
        impl PluginAdapter for $ty {
            fn name(&self) -> &str {
                $name
            }

            fn version(&self) -> semver::Version {
                semver::Version::new(0, 1, 0)
            }

            fn adapter_type(&self) -> AdapterType {
                $kind
            }

            async fn health_check(&self) -> Result<HealthStatus, AtendeError> {
                Ok(HealthStatus::Healthy)
            }
        }
    };
}

/// OCR that "reads" an image by looking its bytes up in a table.
///
/// Unknown images read as empty text. Images registered as failing return
/// an OCR error. A fallback pass exists only for images given a fallback
/// text.
#[derive(Default)]
pub struct MockOcr {
    texts: Mutex<HashMap<Vec<u8>, OcrOutput>>,
    fallbacks: Mutex<HashMap<Vec<u8>, String>>,
    failing: Mutex<Vec<Vec<u8>>>,
    calls: Mutex<usize>,
}

impl MockOcr {
    pub fn new() -> Self {
        Self::default()
    }

    /// `image` reads as `text` in the primary pass.
    pub async fn set_text(&self, image: &[u8], text: &str) {
        self.set_output(
            image,
            OcrOutput {
                text: text.to_string(),
                ..OcrOutput::default()
            },
        )
        .await;
    }

    pub async fn set_output(&self, image: &[u8], output: OcrOutput) {
        self.texts.lock().await.insert(image.to_vec(), output);
    }

    /// `image` reads as `text` in the fallback pass.
    pub async fn set_fallback_text(&self, image: &[u8], text: &str) {
        self.fallbacks
            .lock()
            .await
            .insert(image.to_vec(), text.to_string());
    }

    pub async fn fail_on(&self, image: &[u8]) {
        self.failing.lock().await.push(image.to_vec());
    }

    pub async fn calls(&self) -> usize {
        *self.calls.lock().await
    }
}

mock_plugin!(MockOcr, "mock-ocr", AdapterType::Ocr);

#[async_trait]
impl OcrAdapter for MockOcr {
    async fn recognize(&self, image: &[u8]) -> Result<OcrOutput, AtendeError> {
        self.count_call(image).await?;
        Ok(self
            .texts
            .lock()
            .await
            .get(image)
            .cloned()
            .unwrap_or_default())
    }

    async fn recognize_fallback(&self, image: &[u8]) -> Result<Option<OcrOutput>, AtendeError> {
        let Some(text) = self.fallbacks.lock().await.get(image).cloned() else {
            return Ok(None);
        };
        self.count_call(image).await?;
        Ok(Some(OcrOutput {
            text,
            used_fallback_pass: true,
            used_rotation: false,
        }))
    }
}

impl MockOcr {
    async fn count_call(&self, image: &[u8]) -> Result<(), AtendeError> {
        *self.calls.lock().await += 1;
        if self.failing.lock().await.iter().any(|f| f == image) {
            return Err(AtendeError::Ocr {
                message: "mock ocr failure".to_string(),
                source: None,
            });
        }
        Ok(())
    }
}

/// Provisioning upstream with scripted answers.
///
/// Answers are popped from a FIFO queue; when it is empty the default
/// answer is returned. Every request is recorded.
pub struct MockProvisioning {
    answers: Mutex<VecDeque<Result<String, String>>>,
    default_answer: String,
    requests: Mutex<Vec<TrialRequest>>,
}

impl MockProvisioning {
    pub fn new(default_answer: &str) -> Self {
        Self {
            answers: Mutex::new(VecDeque::new()),
            default_answer: default_answer.to_string(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub async fn push_answer(&self, answer: &str) {
        self.answers.lock().await.push_back(Ok(answer.to_string()));
    }

    /// The next request fails with a provisioning error.
    pub async fn push_failure(&self, message: &str) {
        self.answers.lock().await.push_back(Err(message.to_string()));
    }

    pub async fn requests(&self) -> Vec<TrialRequest> {
        self.requests.lock().await.clone()
    }
}

impl Default for MockProvisioning {
    fn default() -> Self {
        Self::new("Teste liberado!\nUsuário: teste\nSenha: 1234")
    }
}

mock_plugin!(MockProvisioning, "mock-provisioning", AdapterType::Provisioning);

#[async_trait]
impl ProvisioningAdapter for MockProvisioning {
    async fn request_trial(&self, request: &TrialRequest) -> Result<String, AtendeError> {
        self.requests.lock().await.push(request.clone());
        match self.answers.lock().await.pop_front() {
            Some(Ok(answer)) => Ok(answer),
            Some(Err(message)) => Err(AtendeError::Provisioning {
                message,
                source: None,
            }),
            None => Ok(self.default_answer.clone()),
        }
    }
}

/// Audit sink that keeps every event.
#[derive(Default)]
pub struct MockAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MockAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().await.clone()
    }

    pub async fn of_type(&self, event_type: AuditEventType) -> Vec<AuditEvent> {
        self.events
            .lock()
            .await
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect()
    }
}

mock_plugin!(MockAuditSink, "mock-audit", AdapterType::Audit);

#[async_trait]
impl AuditSink for MockAuditSink {
    async fn emit(&self, event: AuditEvent) -> Result<(), AtendeError> {
        self.events.lock().await.push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> TrialRequest {
        TrialRequest {
            product_name: "IBO PLAYER".into(),
            device_identifier_phone: "AA:BB:CC:11:22:33".into(),
            contact_name: "Ana".into(),
            contact_phone_e164: "+5511999990000".into(),
            label: "atende".into(),
        }
    }

    #[tokio::test]
    async fn ocr_reads_registered_images() {
        let ocr = MockOcr::new();
        ocr.set_text(b"img", "MAC: AA:BB:CC:11:22:33").await;
        ocr.fail_on(b"bad").await;

        assert_eq!(ocr.recognize(b"img").await.unwrap().text, "MAC: AA:BB:CC:11:22:33");
        assert_eq!(ocr.recognize(b"other").await.unwrap().text, "");
        assert!(ocr.recognize(b"bad").await.is_err());
        assert_eq!(ocr.calls().await, 3);
    }

    #[tokio::test]
    async fn ocr_fallback_pass_only_for_registered_images() {
        let ocr = MockOcr::new();
        ocr.set_fallback_text(b"img", "MAC AA BB CC 11 22 33").await;

        let fallback = ocr.recognize_fallback(b"img").await.unwrap().unwrap();
        assert!(fallback.used_fallback_pass);
        assert!(ocr.recognize_fallback(b"other").await.unwrap().is_none());
        assert_eq!(ocr.calls().await, 1);
    }

    #[tokio::test]
    async fn provisioning_follows_script_then_default() {
        let upstream = MockProvisioning::new("padrão");
        upstream.push_answer("primeira").await;
        upstream.push_failure("502").await;

        assert_eq!(upstream.request_trial(&request()).await.unwrap(), "primeira");
        assert!(upstream.request_trial(&request()).await.is_err());
        assert_eq!(upstream.request_trial(&request()).await.unwrap(), "padrão");
        assert_eq!(upstream.requests().await.len(), 3);
    }
}
