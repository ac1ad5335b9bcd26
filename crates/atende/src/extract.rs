// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `atende extract` command implementation.
//!
//! Reads a device identifier from an image (through OCR) or from a text
//! file, the same way the engine reads a contact's screenshot.

use std::path::Path;

use atende_config::AtendeConfig;
use atende_core::{AtendeError, OcrAdapter};
use atende_extract::{Extraction, extract_detailed};
use atende_ocr::TesseractOcr;
use tracing::debug;

const TEXT_EXTENSIONS: &[&str] = &["txt", "text", "log"];

fn is_text_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| TEXT_EXTENSIONS.iter().any(|t| t.eq_ignore_ascii_case(e)))
}

/// Reads `path` and looks for an identifier. `Ok(None)` means the text was
/// read but holds no identifier.
pub async fn extract_from_path(
    config: &AtendeConfig,
    path: &Path,
) -> Result<Option<Extraction>, AtendeError> {
    let text = if is_text_file(path) {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AtendeError::Internal(format!("cannot read {}: {e}", path.display())))?
    } else {
        let image = tokio::fs::read(path).await.map_err(|e| AtendeError::MediaDownload {
            message: format!("cannot read {}: {e}", path.display()),
            source: Some(Box::new(e)),
        })?;
        let output = TesseractOcr::new(&config.ocr).recognize(&image).await?;
        debug!(
            fallback = output.used_fallback_pass,
            chars = output.text.len(),
            "image read"
        );
        output.text
    };
    Ok(extract_detailed(&text))
}

/// Runs the command and prints the result. Returns `false` when no
/// identifier was found.
pub async fn run_extract(config: &AtendeConfig, path: &Path) -> Result<bool, AtendeError> {
    match extract_from_path(config, path).await? {
        Some(found) => {
            println!("{}", found.identifier);
            debug!(pass = ?found.pass, score = found.score, "identifier extracted");
            Ok(true)
        }
        None => {
            eprintln!("no identifier found in {}", path.display());
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_files_are_recognized_by_extension() {
        assert!(is_text_file(Path::new("ocr.TXT")));
        assert!(!is_text_file(Path::new("print.png")));
        assert!(!is_text_file(Path::new("README")));
    }

    #[tokio::test]
    async fn identifier_is_read_from_text_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ocr.txt");
        std::fs::write(&path, "IBO Player\nMac Address: aa-bb-cc-11-22-33\n").unwrap();

        let found = extract_from_path(&AtendeConfig::default(), &path)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.identifier.to_string(), "AA:BB:CC:11:22:33");
    }

    #[tokio::test]
    async fn text_without_identifier_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ocr.txt");
        std::fs::write(&path, "Bem-vindo").unwrap();

        let found = extract_from_path(&AtendeConfig::default(), &path).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn missing_image_is_an_error() {
        let result =
            extract_from_path(&AtendeConfig::default(), Path::new("/no/such/print.png")).await;
        assert!(result.is_err());
    }
}
