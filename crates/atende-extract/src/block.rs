// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Product blocks and labeled credentials in free-form upstream answers.
//!
//! An upstream answer usually lists several apps, each in a paragraph that
//! ends with a `***` line:
//!
//! ```text
//! ✅ IBO PLAYER
//! Usuário: joao123
//! Senha: 4f9k2
//! ***
//! ✅ LAZER
//! ...
//! ```

use std::sync::LazyLock;

use regex::Regex;

const BLOCK_TERMINATOR: &str = "***";

static CODE_LABEL: LazyLock<Regex> = LazyLock::new(|| label_pattern("code|código|codigo"));

static USERNAME_LABEL: LazyLock<Regex> =
    LazyLock::new(|| label_pattern("usuário|usuario|username|user|login"));

static PASSWORD_LABEL: LazyLock<Regex> = LazyLock::new(|| label_pattern("senha|password|pass"));

/// `key=value&key=value` fragments, standalone or inside a URL.
static QUERY_FRAGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z_]+=[^&\s]+(?:&[A-Za-z_]+=[^&\s]*)+").unwrap()
});

fn label_pattern(labels: &str) -> Regex {
    // Labels may be wrapped in chat markup (`*Senha:*`).
    Regex::new(&format!(
        r"(?i)^(?:{labels})\b[*_]*\s*[:=\-]?[*_]*\s*(.+)$"
    ))
    .unwrap()
}

/// Returns the block of `text` that concerns `keyword`.
///
/// Blocks start at a line containing `keyword` as a whole word
/// (case-insensitive) and run until a line ending with `***` or the end of
/// the text. When several blocks exist, the first one mentioning the keyword
/// at least twice is preferred over the first one found. The terminator is
/// not part of the returned block.
pub fn filter_block(text: &str, keyword: &str) -> Option<String> {
    let keyword = keyword.trim();
    if keyword.is_empty() {
        return None;
    }
    let starts = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(keyword))).ok()?;
    let needle = keyword.to_lowercase();

    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let mut blocks: Vec<Vec<&str>> = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        if !starts.is_match(lines[i]) {
            i += 1;
            continue;
        }
        let mut block = Vec::new();
        while i < lines.len() {
            let line = lines[i];
            i += 1;
            if let Some(body) = line.strip_suffix(BLOCK_TERMINATOR) {
                let body = body.trim_end();
                if !body.is_empty() {
                    block.push(body);
                }
                break;
            }
            block.push(line);
        }
        if !block.is_empty() {
            blocks.push(block);
        }
    }

    let mentions = |block: &[&str]| block.join("\n").to_lowercase().matches(&needle).count();
    let chosen = blocks
        .iter()
        .find(|b| mentions(b) >= 2)
        .or_else(|| blocks.first())?;
    Some(chosen.join("\n"))
}

/// Credentials read out of a product block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
    pub code: Option<String>,
}

impl Credentials {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.password.is_none() && self.code.is_none()
    }
}

/// Reads labeled credentials from `block`.
///
/// Each line is stripped of leading bullets and markup, then tried against
/// the code, username and password labels in that order; the first value
/// found for a field wins. A query-string fragment (`username=x&password=y`)
/// fills a field only when no label provided it.
pub fn extract_credentials(block: &str) -> Credentials {
    let mut creds = Credentials::default();

    for raw in block.lines() {
        let line = raw.trim_start_matches(|c: char| !c.is_alphanumeric()).trim_end();
        if line.is_empty() {
            continue;
        }
        if creds.code.is_none()
            && let Some(value) = labeled_value(&CODE_LABEL, line)
        {
            creds.code = Some(value);
            continue;
        }
        if creds.username.is_none()
            && let Some(value) = labeled_value(&USERNAME_LABEL, line)
        {
            creds.username = Some(value);
            continue;
        }
        if creds.password.is_none()
            && let Some(value) = labeled_value(&PASSWORD_LABEL, line)
        {
            creds.password = Some(value);
        }
    }

    if creds.username.is_none() || creds.password.is_none() {
        for fragment in QUERY_FRAGMENT.find_iter(block) {
            for (key, value) in url::form_urlencoded::parse(fragment.as_str().as_bytes()) {
                let value = value.trim();
                if value.is_empty() {
                    continue;
                }
                match key.to_ascii_lowercase().as_str() {
                    "username" | "user" | "login" | "name" if creds.username.is_none() => {
                        creds.username = Some(value.to_string());
                    }
                    "password" | "pass" | "senha" if creds.password.is_none() => {
                        creds.password = Some(value.to_string());
                    }
                    _ => {}
                }
            }
        }
    }

    creds
}

fn labeled_value(pattern: &Regex, line: &str) -> Option<String> {
    let captured = pattern.captures(line)?.get(1)?.as_str();
    let value = captured.trim_matches(|c: char| c == '*' || c == '_' || c.is_whitespace());
    (!value.is_empty()).then(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ANSWER: &str = "\
Segue seu teste!

✅ IBO PLAYER
Usuário: joao123
Senha: 4f9k2
***
✅ LAZER PLAY
Código: 771204
***
Qualquer dúvida estamos à disposição.";

    #[test]
    fn block_runs_to_terminator() {
        let block = filter_block(ANSWER, "lazer").expect("block");
        assert_eq!(block, "✅ LAZER PLAY\nCódigo: 771204");
    }

    #[test]
    fn missing_keyword_is_none() {
        assert_eq!(filter_block(ANSWER, "assist"), None);
        assert_eq!(filter_block(ANSWER, "  "), None);
    }

    #[test]
    fn keyword_must_be_a_whole_word() {
        assert_eq!(filter_block("IBOPLAYER\nsenha: x\n***", "ibo"), None);
    }

    #[test]
    fn last_block_runs_to_end_of_text() {
        let text = "intro\nFUN TV\nlogin: ana\nsenha: 1";
        assert_eq!(
            filter_block(text, "fun").as_deref(),
            Some("FUN TV\nlogin: ana\nsenha: 1")
        );
    }

    #[test]
    fn block_mentioning_keyword_twice_is_preferred() {
        let text = "\
Planos ASSIST a partir de R$ 20
***
Outros apps
***
ASSIST PLUS
Baixe o ASSIST na loja
Código: 5521
***";
        let block = filter_block(text, "ASSIST").expect("block");
        assert!(block.starts_with("ASSIST PLUS"), "got {block}");
        assert!(block.contains("5521"));
    }

    #[test]
    fn first_block_when_none_repeats_keyword() {
        let text = "IBO um\n***\nIBO dois\n***";
        assert_eq!(filter_block(text, "ibo").as_deref(), Some("IBO um"));
    }

    #[test]
    fn credentials_from_labels() {
        let block = filter_block(ANSWER, "ibo").expect("block");
        let creds = extract_credentials(&block);
        assert_eq!(creds.username.as_deref(), Some("joao123"));
        assert_eq!(creds.password.as_deref(), Some("4f9k2"));
        assert_eq!(creds.code, None);
    }

    #[test]
    fn credentials_with_markup_and_bullets() {
        let creds = extract_credentials("• *Usuário:* maria\n- *SENHA* = abc*\n> code - 99");
        assert_eq!(creds.username.as_deref(), Some("maria"));
        assert_eq!(creds.password.as_deref(), Some("abc"));
        assert_eq!(creds.code.as_deref(), Some("99"));
    }

    #[test]
    fn first_match_per_field_wins() {
        let creds = extract_credentials("user: a\nuser: b\npassword: 1\npass: 2");
        assert_eq!(creds.username.as_deref(), Some("a"));
        assert_eq!(creds.password.as_deref(), Some("1"));
    }

    #[test]
    fn query_string_fills_missing_fields() {
        let creds = extract_credentials(
            "Lista: http://srv.example.com/get.php?username=pedro&password=xyz&type=m3u",
        );
        assert_eq!(creds.username.as_deref(), Some("pedro"));
        assert_eq!(creds.password.as_deref(), Some("xyz"));
    }

    #[test]
    fn labels_beat_query_string() {
        let creds = extract_credentials("Usuário: rafa\nuser=outro&pass=123");
        assert_eq!(creds.username.as_deref(), Some("rafa"));
        assert_eq!(creds.password.as_deref(), Some("123"));
    }

    #[test]
    fn empty_block_has_no_credentials() {
        assert!(extract_credentials("").is_empty());
        assert!(extract_credentials("Obrigado pela preferência").is_empty());
    }
}
