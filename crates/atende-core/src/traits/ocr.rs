// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Optical text recognition capability.

use async_trait::async_trait;

use crate::error::AtendeError;
use crate::traits::adapter::PluginAdapter;
use crate::types::OcrOutput;

/// Turns image bytes into raw recognized text.
///
/// Empty text is a valid result. Errors are infrastructure failures and must
/// never be reported as "no identifier found".
#[async_trait]
pub trait OcrAdapter: PluginAdapter {
    async fn recognize(&self, image: &[u8]) -> Result<OcrOutput, AtendeError>;

    /// A second, more permissive pass over the same image, used when the
    /// primary text held nothing useful. `None` when the adapter has no
    /// such pass.
    async fn recognize_fallback(&self, _image: &[u8]) -> Result<Option<OcrOutput>, AtendeError> {
        Ok(None)
    }
}
