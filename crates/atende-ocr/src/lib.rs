// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OCR adapter backed by an external `tesseract` process.
//!
//! The image is piped to the process on stdin and the recognized text is
//! read from stdout. A second pass with the fallback arguments (by default a
//! sparse-text page segmentation mode) runs when the primary pass reads
//! nothing, and is offered to callers whose primary text was not usable.

use std::process::Stdio;

use async_trait::async_trait;
use atende_config::model::OcrConfig;
use atende_core::types::{AdapterType, HealthStatus, OcrOutput};
use atende_core::{AtendeError, OcrAdapter, PluginAdapter};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

pub struct TesseractOcr {
    command: String,
    args: Vec<String>,
    fallback_args: Vec<String>,
}

impl TesseractOcr {
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
            fallback_args: config.fallback_args.clone(),
        }
    }

    async fn run(&self, args: &[String], image: &[u8]) -> Result<String, AtendeError> {
        let mut child = Command::new(&self.command)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AtendeError::Ocr {
                message: format!("failed to start `{}`: {e}", self.command),
                source: Some(Box::new(e)),
            })?;

        // Feed stdin concurrently so a chatty process cannot block on a full
        // stdout pipe.
        let writer = child.stdin.take().map(|mut stdin| {
            let image = image.to_vec();
            tokio::spawn(async move {
                let result = stdin.write_all(&image).await;
                drop(stdin);
                result
            })
        });

        let output = child.wait_with_output().await.map_err(|e| AtendeError::Ocr {
            message: format!("`{}` did not finish: {e}", self.command),
            source: Some(Box::new(e)),
        })?;

        if let Some(writer) = writer {
            match writer.await {
                Ok(Ok(())) => {}
                // The process may exit before reading everything.
                Ok(Err(e)) => debug!(error = %e, "ocr stdin closed early"),
                Err(e) => debug!(error = %e, "ocr stdin writer aborted"),
            }
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AtendeError::Ocr {
                message: format!(
                    "`{}` exited with {}: {}",
                    self.command,
                    output.status,
                    stderr.trim()
                ),
                source: None,
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl PluginAdapter for TesseractOcr {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Ocr
    }

    async fn health_check(&self) -> Result<HealthStatus, AtendeError> {
        let status = Command::new(&self.command)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;
        Ok(match status {
            Ok(s) if s.success() => HealthStatus::Healthy,
            Ok(s) => HealthStatus::Degraded(format!("`{} --version` exited with {s}", self.command)),
            Err(e) => HealthStatus::Unhealthy(format!("`{}` unavailable: {e}", self.command)),
        })
    }
}

#[async_trait]
impl OcrAdapter for TesseractOcr {
    async fn recognize(&self, image: &[u8]) -> Result<OcrOutput, AtendeError> {
        if image.is_empty() {
            return Err(AtendeError::Ocr {
                message: "empty image".to_string(),
                source: None,
            });
        }

        let text = self.run(&self.args, image).await?;
        if !text.trim().is_empty() {
            return Ok(OcrOutput {
                text,
                ..OcrOutput::default()
            });
        }

        debug!(bytes = image.len(), "primary ocr pass read nothing, trying fallback");
        let primary = OcrOutput {
            text,
            ..OcrOutput::default()
        };
        Ok(self.recognize_fallback(image).await?.unwrap_or(primary))
    }

    async fn recognize_fallback(&self, image: &[u8]) -> Result<Option<OcrOutput>, AtendeError> {
        if self.fallback_args.is_empty() {
            return Ok(None);
        }
        let text = self.run(&self.fallback_args, image).await?;
        Ok(Some(OcrOutput {
            text,
            used_fallback_pass: true,
            used_rotation: false,
        }))
    }
}
