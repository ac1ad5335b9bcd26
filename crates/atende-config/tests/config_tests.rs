// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Atende configuration system.

use atende_config::diagnostic::{ConfigError, SECTIONS};
use atende_config::{load_and_validate_str, load_config_from_str};
use atende_core::ProductMode;

#[test]
fn full_toml_deserializes() {
    let toml = r#"
[agent]
name = "loja-centro"
log_level = "debug"
device = "loja-1"

[engine]
confirm_timeout_secs = 600
affirmative_words = ["sim", "claro"]

[messages]
failure = "Já já alguém te responde."

[echo]
fingerprint_ttl_secs = 20

[catalog]
cache_ttl_secs = 2
seed_path = "catalog.toml"

[ocr]
command = "/usr/local/bin/tesseract"
warn_after_ms = 3000

[provisioning]
endpoint = "https://painel.example.com/api/trial"
api_key = "secret"
label = "loja-centro"

[links]
short_link_hosts = ["bit.ly"]

[followup]
enabled = false
delay_secs = 120
store_path = "/tmp/followups.json"

[[products]]
keyword = "ibo"
reply_template = "MAC liberado!\n{{ block }}"
"#;

    let config = load_and_validate_str(toml).expect("valid TOML should load");
    assert_eq!(config.agent.name, "loja-centro");
    assert_eq!(config.agent.device, "loja-1");
    assert_eq!(config.engine.confirm_timeout_secs, 600);
    assert_eq!(config.engine.affirmative_words, vec!["sim", "claro"]);
    assert!(!config.engine.negative_words.is_empty());
    assert_eq!(config.messages.failure, "Já já alguém te responde.");
    assert_eq!(config.echo.fingerprint_ttl_secs, 20);
    assert_eq!(config.catalog.seed_path.as_deref(), Some("catalog.toml"));
    assert_eq!(config.ocr.warn_after_ms, 3000);
    assert_eq!(config.ocr.command, "/usr/local/bin/tesseract");
    assert_eq!(config.provisioning.api_key.as_deref(), Some("secret"));
    assert_eq!(config.links.short_link_hosts, vec!["bit.ly"]);
    assert!(!config.followup.enabled);
    assert_eq!(config.followup.delay_secs, 120);
    assert_eq!(config.products.len(), 1);
    assert_eq!(config.products[0].mode, None);
}

#[test]
fn empty_toml_uses_defaults() {
    let config = load_config_from_str("").expect("empty config should load");
    assert_eq!(config.agent.name, "atende");
    assert_eq!(config.engine.confirm_timeout_secs, 1800);
    assert_eq!(config.echo.fingerprint_ttl_secs, 15);
    assert!(config.provisioning.endpoint.is_none());
}

#[test]
fn unknown_key_gets_suggestion_and_span() {
    let toml = "[engine]\nconfirm_timeot_secs = 60\n";
    let errors = load_and_validate_str(toml).expect_err("typo should be rejected");
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        ConfigError::UnknownKey {
            key, suggestion, ..
        } => {
            assert_eq!(key, "confirm_timeot_secs");
            assert_eq!(suggestion.as_deref(), Some("confirm_timeout_secs"));
        }
        other => panic!("expected UnknownKey, got {other:?}"),
    }
}

#[test]
fn unknown_section_is_rejected() {
    let errors = load_and_validate_str("[telegram]\nbot_token = \"x\"\n")
        .expect_err("unknown section should be rejected");
    match &errors[0] {
        ConfigError::UnknownSection {
            section,
            suggestion,
            span,
            ..
        } => {
            assert_eq!(section, "telegram");
            assert_eq!(suggestion, &None);
            assert!(span.is_some());
        }
        other => panic!("expected UnknownSection, got {other:?}"),
    }
}

#[test]
fn misspelled_section_suggests_followup() {
    let errors = load_and_validate_str("[folowup]\nenabled = false\n")
        .expect_err("misspelled section should be rejected");
    assert!(matches!(
        &errors[0],
        ConfigError::UnknownSection { suggestion: Some(s), .. } if s == "followup"
    ));
}

#[test]
fn key_under_wrong_section_points_to_its_table() {
    let errors = load_and_validate_str("[engine]\nfingerprint_ttl_secs = 5\n")
        .expect_err("echo key under engine should be rejected");
    match &errors[0] {
        ConfigError::UnknownKey {
            section,
            suggestion,
            belongs_in,
            ..
        } => {
            assert_eq!(section.as_deref(), Some("engine"));
            assert_eq!(suggestion, &None);
            assert_eq!(belongs_in.as_deref(), Some("echo"));
        }
        other => panic!("expected UnknownKey, got {other:?}"),
    }
}

#[test]
fn product_key_typo_lists_product_keys() {
    let errors = load_and_validate_str("[[products]]\nkeyword = \"ibo\"\ndisplay = \"IBO\"\n")
        .expect_err("typo should be rejected");
    match &errors[0] {
        ConfigError::UnknownKey {
            suggestion,
            valid_keys,
            ..
        } => {
            assert_eq!(suggestion.as_deref(), Some("display_name"));
            assert!(valid_keys.contains("reply_template"));
        }
        other => panic!("expected UnknownKey, got {other:?}"),
    }
}

/// The diagnostic key table must list exactly what the model deserializes.
#[test]
fn section_table_matches_model() {
    fn expected_fields(toml: &str) -> Vec<String> {
        let err = load_config_from_str(toml).expect_err("unknown key should be rejected");
        let mut fields = err
            .into_iter()
            .find_map(|e| match e.kind {
                figment::error::Kind::UnknownField(_, expected) => {
                    Some(expected.iter().map(|f| f.to_string()).collect::<Vec<_>>())
                }
                _ => None,
            })
            .expect("an unknown field error");
        fields.sort();
        fields
    }

    let mut names: Vec<String> = SECTIONS.iter().map(|s| s.name.to_string()).collect();
    names.sort();
    assert_eq!(expected_fields("zz_not_a_key = 1\n"), names);

    for section in SECTIONS {
        let toml = if section.repeated {
            format!("[[{}]]\nkeyword = \"x\"\nzz_not_a_key = 1\n", section.name)
        } else {
            format!("[{}]\nzz_not_a_key = 1\n", section.name)
        };
        let mut keys: Vec<String> = section.keys.iter().map(|k| k.to_string()).collect();
        keys.sort();
        assert_eq!(expected_fields(&toml), keys, "keys of [{}]", section.name);
    }
}

#[test]
fn wrong_type_is_reported() {
    let errors = load_and_validate_str("[echo]\nfingerprint_ttl_secs = \"soon\"\n")
        .expect_err("string for integer should be rejected");
    assert!(matches!(&errors[0], ConfigError::InvalidType { key, .. } if key.contains("fingerprint_ttl_secs")));
}

#[test]
fn product_mode_parses() {
    let config = load_and_validate_str(
        "[[products]]\nkeyword = \"nova\"\nmode = \"direct\"\napp_name = \"Nova\"\n",
    )
    .expect("product should load");
    assert_eq!(config.products[0].mode, Some(ProductMode::Direct));
}

#[test]
fn validation_errors_are_collected() {
    let toml = r#"
[engine]
confirm_timeout_secs = 0

[provisioning]
endpoint = "nope"

[[products]]
keyword = "ibo"

[[products]]
keyword = "ibo"
"#;
    let errors = load_and_validate_str(toml).expect_err("three problems expected");
    assert_eq!(errors.len(), 3, "got: {errors:?}");
    assert!(errors.iter().all(|e| matches!(e, ConfigError::Validation { .. })));
}
