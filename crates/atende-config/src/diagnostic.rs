// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turns Figment errors about `atende.toml` into miette diagnostics.
//!
//! Unknown keys are checked against the [`SECTIONS`] table: a near miss gets
//! a "did you mean" hint, and a key that exists under another table is
//! pointed at its home (`fingerprint_ttl_secs` under `[engine]` belongs in
//! `[echo]`).

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Minimum Jaro-Winkler similarity score to suggest a correction.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// One table of `atende.toml` and the keys it accepts.
#[derive(Debug)]
pub struct Section {
    pub name: &'static str,
    pub keys: &'static [&'static str],
    /// Written as `[[name]]`, once per entry.
    pub repeated: bool,
}

/// Every table of `atende.toml`, in file order.
pub const SECTIONS: &[Section] = &[
    Section {
        name: "agent",
        keys: &["name", "log_level", "device"],
        repeated: false,
    },
    Section {
        name: "engine",
        keys: &[
            "confirm_timeout_secs",
            "download_phrases",
            "screenshot_phrases",
            "affirmative_words",
            "negative_words",
            "code_keywords",
            "playlist_keywords",
            "limit_markers",
        ],
        repeated: false,
    },
    Section {
        name: "messages",
        keys: &[
            "identifier_request",
            "app_confirmation",
            "print_request",
            "print_retry",
            "identifier_confirmation",
            "screen_request",
            "playlist_hint",
            "handoff",
            "failure",
            "limit_reached",
            "trial_reply",
        ],
        repeated: false,
    },
    Section {
        name: "echo",
        keys: &["fingerprint_ttl_secs"],
        repeated: false,
    },
    Section {
        name: "catalog",
        keys: &["cache_ttl_secs", "seed_path"],
        repeated: false,
    },
    Section {
        name: "ocr",
        keys: &["command", "args", "fallback_args", "warn_after_ms"],
        repeated: false,
    },
    Section {
        name: "provisioning",
        keys: &["endpoint", "api_key", "timeout_secs", "label", "warn_after_ms"],
        repeated: false,
    },
    Section {
        name: "links",
        keys: &["short_link_hosts"],
        repeated: false,
    },
    Section {
        name: "followup",
        keys: &[
            "enabled",
            "delay_secs",
            "tick_interval_secs",
            "store_path",
            "message",
        ],
        repeated: false,
    },
    Section {
        name: "products",
        keys: &[
            "keyword",
            "app_name",
            "display_name",
            "default_code",
            "fallback_full_text",
            "mode",
            "reply_template",
        ],
        repeated: true,
    },
];

/// Looks up a table of `atende.toml` by name.
pub fn section(name: &str) -> Option<&'static Section> {
    SECTIONS.iter().find(|s| s.name == name)
}

/// First table other than `current` that accepts `key`.
pub fn home_of(key: &str, current: Option<&str>) -> Option<&'static str> {
    SECTIONS
        .iter()
        .filter(|s| Some(s.name) != current)
        .find(|s| s.keys.contains(&key))
        .map(|s| s.name)
}

fn header(name: &str) -> String {
    match section(name) {
        Some(s) if s.repeated => format!("[[{name}]]"),
        _ => format!("[{name}]"),
    }
}

fn all_headers() -> String {
    SECTIONS
        .iter()
        .map(|s| header(s.name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// A configuration error with rich diagnostic information.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// A key that its table does not accept.
    #[error("unknown key `{key}` in {}", table_label(.section.as_deref()))]
    #[diagnostic(
        code(atende::config::unknown_key),
        help(
            "{}",
            format_unknown_key_help(
                key,
                section.as_deref(),
                suggestion.as_deref(),
                belongs_in.as_deref(),
                valid_keys
            )
        )
    )]
    UnknownKey {
        key: String,
        /// Table holding the key; `None` at the top level.
        section: Option<String>,
        /// Closest key the table does accept.
        suggestion: Option<String>,
        /// Another table that accepts this exact key.
        belongs_in: Option<String>,
        /// Comma-separated keys the table accepts.
        valid_keys: String,
        #[label("not a key of this table")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A table that `atende.toml` does not have.
    #[error("unknown section `[{section}]`")]
    #[diagnostic(
        code(atende::config::unknown_section),
        help("{}", format_unknown_section_help(suggestion.as_deref()))
    )]
    UnknownSection {
        section: String,
        suggestion: Option<String>,
        #[label("not an atende.toml section")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A configuration value has the wrong type.
    #[error("invalid type for key `{key}`: {detail}")]
    #[diagnostic(code(atende::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        key: String,
        detail: String,
        expected: String,
    },

    /// A required configuration key is missing.
    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(atende::config::missing_key),
        help("{}", format_missing_key_help(key, section.as_deref()))
    )]
    MissingKey {
        key: String,
        section: Option<String>,
    },

    /// A validation error for a config value.
    #[error("validation error: {message}")]
    #[diagnostic(code(atende::config::validation))]
    Validation { message: String },

    /// Catch-all for other configuration errors.
    #[error("configuration error: {0}")]
    #[diagnostic(code(atende::config::other))]
    Other(String),
}

fn table_label(section: Option<&str>) -> String {
    match section {
        Some(name) => header(name),
        None => "the top level".to_string(),
    }
}

fn format_unknown_key_help(
    key: &str,
    section: Option<&str>,
    suggestion: Option<&str>,
    belongs_in: Option<&str>,
    valid_keys: &str,
) -> String {
    let table = table_label(section);
    match (suggestion, belongs_in) {
        (Some(s), _) => format!("did you mean `{s}`? {table} accepts: {valid_keys}"),
        (None, Some(home)) => format!("`{key}` belongs in {}", header(home)),
        (None, None) => format!("{table} accepts: {valid_keys}"),
    }
}

fn format_unknown_section_help(suggestion: Option<&str>) -> String {
    match suggestion {
        Some(s) => format!("did you mean {}? Sections: {}", header(s), all_headers()),
        None => format!("atende.toml has these sections: {}", all_headers()),
    }
}

fn format_missing_key_help(key: &str, section: Option<&str>) -> String {
    match section.and_then(self::section) {
        Some(s) if s.repeated => format!("every {} entry needs `{key}`", header(s.name)),
        Some(s) => format!("add `{key} = <value>` under [{}]", s.name),
        None => format!("add `{key} = <value>` to your atende.toml"),
    }
}

/// Convert a `figment::Error` into a list of `ConfigError` diagnostics.
///
/// A figment error may chain several errors; each becomes one diagnostic.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    use figment::error::Kind;

    err.into_iter()
        .map(|error| match &error.kind {
            Kind::UnknownField(field, expected) => {
                unknown_field(&error, field, expected, toml_sources)
            }
            Kind::MissingField(field) => ConfigError::MissingKey {
                key: field.clone().into_owned(),
                section: error.path.first().cloned(),
            },
            Kind::InvalidType(actual, expected) => ConfigError::InvalidType {
                key: error.path.join("."),
                detail: format!("found {actual}, expected {expected}"),
                expected: expected.to_string(),
            },
            _ => ConfigError::Other(error.to_string()),
        })
        .collect()
}

fn unknown_field(
    error: &figment::error::Error,
    field: &str,
    expected: &[&str],
    toml_sources: &[(String, String)],
) -> ConfigError {
    let current = error.path.first().map(String::as_str);
    let belongs_in = home_of(field, current);

    if current.is_none() && belongs_in.is_none() {
        let names: Vec<&str> = SECTIONS.iter().map(|s| s.name).collect();
        let (span, src) = find_source(error, toml_sources)
            .and_then(|(path, content)| {
                find_section_offset(content, field)
                    .map(|offset| (SourceSpan::new(offset.into(), field.len()), path, content))
            })
            .map_or((None, None), |(span, path, content)| {
                (Some(span), Some(NamedSource::new(path, content.clone())))
            });
        return ConfigError::UnknownSection {
            section: field.to_string(),
            suggestion: suggest_key(field, &names),
            span,
            src,
        };
    }

    let keys: Vec<&str> = match current.and_then(section) {
        Some(s) => s.keys.to_vec(),
        None if current.is_none() => SECTIONS.iter().map(|s| s.name).collect(),
        None => expected.to_vec(),
    };
    let suggestion = suggest_key(field, &keys);
    let (span, src) = find_source_span(error, field, toml_sources);
    ConfigError::UnknownKey {
        key: field.to_string(),
        section: current.map(str::to_string),
        belongs_in: if suggestion.is_none() {
            belongs_in.map(str::to_string)
        } else {
            None
        },
        suggestion,
        valid_keys: keys.join(", "),
        span,
        src,
    }
}

fn find_source<'a>(
    error: &figment::error::Error,
    toml_sources: &'a [(String, String)],
) -> Option<&'a (String, String)> {
    let source_path = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|s| match s {
            figment::Source::File(path) => Some(path.display().to_string()),
            _ => None,
        });

    // Inline sources carry no file metadata; fall back to the only source.
    match source_path {
        Some(path) => toml_sources.iter().find(|(p, _)| *p == path),
        None if toml_sources.len() == 1 => toml_sources.first(),
        None => None,
    }
}

fn find_source_span(
    error: &figment::error::Error,
    field: &str,
    toml_sources: &[(String, String)],
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    if let Some((path, content)) = find_source(error, toml_sources)
        && let Some(offset) = find_key_offset(content, &error.path, field)
    {
        let span = SourceSpan::new(offset.into(), field.len());
        return (Some(span), Some(NamedSource::new(path, content.clone())));
    }

    (None, None)
}

/// Byte offset of a section name inside its `[name]` or `[[name]]` header.
pub fn find_section_offset(content: &str, name: &str) -> Option<usize> {
    let mut byte_offset = 0;
    for line in content.split_inclusive('\n') {
        let trimmed = line.trim_start();
        let inner = trimmed
            .strip_prefix("[[")
            .or_else(|| trimmed.strip_prefix('['));
        if let Some(inner) = inner
            && inner.trim_start().starts_with(name)
            && inner.trim_start()[name.len()..].trim_start().starts_with(']')
        {
            let lead = line.len() - inner.trim_start().len();
            return Some(byte_offset + lead);
        }
        byte_offset += line.len();
    }
    None
}

/// Find the byte offset of a key in TOML content, relative to a section path.
///
/// For `path = ["engine"]` and `field = "confirm_timeot_secs"`, finds the
/// `[engine]` header then the key after it. Array tables (`[[products]]`)
/// are matched by their header as well.
pub fn find_key_offset(content: &str, path: &[String], field: &str) -> Option<usize> {
    let search_start = match path.first() {
        None => 0,
        Some(section) => {
            let table = format!("[{section}]");
            let array = format!("[[{section}]]");
            content
                .find(&array)
                .map(|pos| pos + array.len())
                .or_else(|| content.find(&table).map(|pos| pos + table.len()))?
        }
    };

    let remaining = &content[search_start..];
    let mut byte_offset = 0;
    for line in remaining.split_inclusive('\n') {
        let trimmed = line.trim_start();
        if let Some(after) = trimmed.strip_prefix(field)
            && (after.starts_with(' ') || after.starts_with('=') || after.starts_with('\t'))
        {
            return Some(search_start + byte_offset + (line.len() - trimmed.len()));
        }
        byte_offset += line.len();
    }

    None
}

/// Suggest a similar key name using Jaro-Winkler string similarity.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    let mut best_score = SUGGESTION_THRESHOLD;
    let mut best_match = None;

    for &key in valid_keys {
        let score = strsim::jaro_winkler(unknown, key);
        if score > best_score {
            best_score = score;
            best_match = Some(key.to_string());
        }
    }

    best_match
}

/// Render a list of `ConfigError`s to stderr using miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    use miette::GraphicalReportHandler;

    let handler = GraphicalReportHandler::new();
    for error in errors {
        let mut buf = String::new();
        let diagnostic: &dyn Diagnostic = error;
        if handler.render_report(&mut buf, diagnostic).is_ok() {
            eprint!("{buf}");
        } else {
            eprintln!("Error: {error}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggests_close_engine_keys() {
        let engine = section("engine").expect("engine section");
        assert_eq!(
            suggest_key("confirm_timeot_secs", engine.keys),
            Some("confirm_timeout_secs".to_string())
        );
        assert_eq!(suggest_key("zzzzzz", engine.keys), None);
    }

    #[test]
    fn keys_are_traced_to_their_table() {
        assert_eq!(home_of("fingerprint_ttl_secs", Some("engine")), Some("echo"));
        assert_eq!(home_of("keyword", None), Some("products"));
        assert_eq!(home_of("device", Some("agent")), None);
        // Shared names resolve to the first other table that has them.
        assert_eq!(home_of("warn_after_ms", Some("ocr")), Some("provisioning"));
    }

    #[test]
    fn help_text_names_atende_tables() {
        let help = format_unknown_key_help(
            "fingerprint_ttl_secs",
            Some("engine"),
            None,
            Some("echo"),
            "",
        );
        assert_eq!(help, "`fingerprint_ttl_secs` belongs in [echo]");
        assert_eq!(
            format_missing_key_help("keyword", Some("products")),
            "every [[products]] entry needs `keyword`"
        );
        assert!(format_unknown_section_help(Some("followup")).starts_with("did you mean [followup]?"));
    }

    #[test]
    fn find_key_offset_in_section() {
        let content = "[agent]\nname = \"x\"\n\n[engine]\nconfirm_timeot_secs = 5\n";
        let o = find_key_offset(content, &["engine".to_string()], "confirm_timeot_secs")
            .expect("key should be found");
        assert_eq!(&content[o..o + 19], "confirm_timeot_secs");
    }

    #[test]
    fn find_key_offset_in_array_table() {
        let content = "[[products]]\nkeyword = \"ibo\"\ncolour = \"blue\"\n";
        let o = find_key_offset(content, &["products".to_string()], "colour")
            .expect("key should be found");
        assert_eq!(&content[o..o + 6], "colour");
    }

    #[test]
    fn find_section_offset_points_inside_header() {
        let content = "[agent]\ndevice = \"loja\"\n\n[folowup]\nenabled = false\n";
        let o = find_section_offset(content, "folowup").expect("header should be found");
        assert_eq!(&content[o..o + 7], "folowup");
        assert_eq!(find_section_offset(content, "follow"), None);
    }
}
