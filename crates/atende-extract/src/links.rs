// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Link collection from upstream answers.

use std::sync::LazyLock;

use regex::Regex;

static LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)https?://[^\s<>"'()\[\]]+"#).unwrap());

/// Characters that end a sentence rather than a link.
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', '*', '_', '~'];

/// Collects every `http(s)://` link of `text`, deduplicated in first-seen
/// order, with links on a short-link host (or one of its subdomains) moved
/// to the front. The relative order inside each group is kept.
pub fn extract_links(text: &str, short_link_hosts: &[String]) -> Vec<String> {
    let mut links: Vec<String> = Vec::new();
    for m in LINK.find_iter(text) {
        let link = m.as_str().trim_end_matches(TRAILING_PUNCTUATION);
        if !links.iter().any(|l| l == link) {
            links.push(link.to_string());
        }
    }
    links.sort_by_key(|link| !is_short_link(link, short_link_hosts));
    links
}

fn is_short_link(link: &str, short_link_hosts: &[String]) -> bool {
    let Ok(url) = url::Url::parse(link) else {
        return false;
    };
    let Some(host) = url.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();
    short_link_hosts.iter().any(|allowed| {
        let allowed = allowed.to_ascii_lowercase();
        host == allowed || host.ends_with(&format!(".{allowed}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hosts() -> Vec<String> {
        vec!["bit.ly".to_string(), "cutt.ly".to_string()]
    }

    #[test]
    fn links_are_trimmed_and_deduplicated() {
        let text = "Acesse https://painel.example.com/app. Ou https://painel.example.com/app!\n\
                    Lista: http://srv.example.com:8080/get.php?u=1&p=2*";
        assert_eq!(
            extract_links(text, &[]),
            vec![
                "https://painel.example.com/app",
                "http://srv.example.com:8080/get.php?u=1&p=2",
            ]
        );
    }

    #[test]
    fn short_links_come_first_in_stable_order() {
        let text = "http://a.example.com https://bit.ly/x1 http://b.example.com https://go.cutt.ly/y2";
        assert_eq!(
            extract_links(text, &hosts()),
            vec![
                "https://bit.ly/x1",
                "https://go.cutt.ly/y2",
                "http://a.example.com",
                "http://b.example.com",
            ]
        );
    }

    #[test]
    fn lookalike_host_is_not_a_short_link() {
        let text = "http://a.example.com http://notbit.ly/z";
        assert_eq!(
            extract_links(text, &hosts()),
            vec!["http://a.example.com", "http://notbit.ly/z"]
        );
    }

    #[test]
    fn no_links() {
        assert!(extract_links("sem links aqui", &hosts()).is_empty());
    }
}
