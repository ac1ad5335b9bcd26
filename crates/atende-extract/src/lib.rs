// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic text extraction for the Atende engine.
//!
//! - [`identifier`]: finds a device identifier (MAC) in OCR output,
//!   tolerating look-alike characters and stray separators.
//! - [`block`]: isolates the part of a free-form upstream answer that
//!   concerns one product and reads labeled credentials out of it.
//! - [`links`]: collects and orders the links of an upstream answer.
//! - [`details`]: bundles the above into the values a reply template uses.
//!
//! Nothing here performs I/O. "Nothing found" is always `None`.

pub mod block;
pub mod details;
pub mod identifier;
pub mod links;

pub use block::{Credentials, extract_credentials, filter_block};
pub use details::TrialDetails;
pub use identifier::{Extraction, Identifier, Pass, extract, extract_detailed, extract_from_passes};
pub use links::extract_links;
