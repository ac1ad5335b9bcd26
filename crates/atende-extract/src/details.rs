// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Template values derived from an upstream trial answer.

use crate::block::{Credentials, extract_credentials, filter_block};
use crate::links::extract_links;

/// What a reply template can use from an upstream answer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrialDetails {
    /// The product block, or the full answer when no block was found or the
    /// product asks for the full text.
    pub block: String,
    pub credentials: Credentials,
    /// Every link of the full answer, short links first.
    pub links: Vec<String>,
}

impl TrialDetails {
    pub fn parse(
        answer: &str,
        keyword: &str,
        short_link_hosts: &[String],
        full_text: bool,
    ) -> Self {
        let block = if full_text {
            None
        } else {
            filter_block(answer, keyword)
        };
        let block = block.unwrap_or_else(|| answer.trim().to_string());
        let mut credentials = extract_credentials(&block);
        if credentials.is_empty() {
            credentials = extract_credentials(answer);
        }
        Self {
            credentials,
            links: extract_links(answer, short_link_hosts),
            block,
        }
    }

    /// Template variables: `block`, `username`, `password`, `code`, `link1`,
    /// `link2`. Missing values render as empty strings.
    pub fn template_vars(&self, default_code: &str) -> Vec<(String, String)> {
        let link = |n: usize| self.links.get(n).cloned().unwrap_or_default();
        vec![
            ("block".to_string(), self.block.clone()),
            (
                "username".to_string(),
                self.credentials.username.clone().unwrap_or_default(),
            ),
            (
                "password".to_string(),
                self.credentials.password.clone().unwrap_or_default(),
            ),
            (
                "code".to_string(),
                self.credentials
                    .code
                    .clone()
                    .unwrap_or_else(|| default_code.to_string()),
            ),
            ("link1".to_string(), link(0)),
            ("link2".to_string(), link(1)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ANSWER: &str = "\
Teste liberado por 4 horas
IBO PLAYER
Usuário: ze
Senha: 123
***
FUN
Código: 42
https://bit.ly/fun42
***
Painel: https://painel.example.com";

    fn vars(details: &TrialDetails, default_code: &str) -> std::collections::HashMap<String, String> {
        details.template_vars(default_code).into_iter().collect()
    }

    #[test]
    fn product_block_and_all_links() {
        let details = TrialDetails::parse(ANSWER, "ibo", &["bit.ly".to_string()], false);
        assert_eq!(details.block, "IBO PLAYER\nUsuário: ze\nSenha: 123");
        assert_eq!(details.credentials.username.as_deref(), Some("ze"));
        let vars = vars(&details, "0000");
        assert_eq!(vars["code"], "0000");
        assert_eq!(vars["link1"], "https://bit.ly/fun42");
        assert_eq!(vars["link2"], "https://painel.example.com");
    }

    #[test]
    fn full_text_keeps_the_whole_answer() {
        let details = TrialDetails::parse(ANSWER, "fun", &[], true);
        assert_eq!(details.block, ANSWER.trim());
        assert_eq!(details.credentials.username.as_deref(), Some("ze"));
    }

    #[test]
    fn missing_block_falls_back_to_answer() {
        let details = TrialDetails::parse("Código: 9\n", "lazer", &[], false);
        assert_eq!(details.block, "Código: 9");
        assert_eq!(vars(&details, "1")["code"], "9");
        assert_eq!(vars(&details, "1")["link1"], "");
    }
}
