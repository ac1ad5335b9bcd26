// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rule-based classification of message bodies.

use atende_catalog::COMMAND_PREFIX;
use atende_config::model::EngineConfig;

/// Which instruction a human agent gave the contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// "Download/open the app": the engine asks whether it worked.
    DownloadApp,
    /// "Send a screenshot once opened": the agent already asked for it.
    SendScreenshot,
}

/// A contact's answer to a yes/no question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Yes,
    No,
    Unclear,
}

/// What an OCR'd screen-check screenshot shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// The activation code is visible.
    Code,
    Playlist,
    Other,
}

/// Phrase and keyword lists, lowercased once.
#[derive(Debug, Clone)]
pub struct Phrases {
    download: Vec<String>,
    screenshot: Vec<String>,
    affirmative: Vec<String>,
    negative: Vec<String>,
    code: Vec<String>,
    playlist: Vec<String>,
    limit: Vec<String>,
}

impl Phrases {
    pub fn from_config(config: &EngineConfig) -> Self {
        let lower = |items: &[String]| -> Vec<String> {
            items
                .iter()
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect()
        };
        Self {
            download: lower(&config.download_phrases),
            screenshot: lower(&config.screenshot_phrases),
            affirmative: lower(&config.affirmative_words),
            negative: lower(&config.negative_words),
            code: lower(&config.code_keywords),
            playlist: lower(&config.playlist_keywords),
            limit: lower(&config.limit_markers),
        }
    }

    /// The instruction phrase contained in an agent message, if any.
    /// Screenshot phrases win when both occur.
    pub fn instruction(&self, body: &str) -> Option<Instruction> {
        let body = body.to_lowercase();
        if contains_any(&body, &self.screenshot) {
            Some(Instruction::SendScreenshot)
        } else if contains_any(&body, &self.download) {
            Some(Instruction::DownloadApp)
        } else {
            None
        }
    }

    /// Classifies a reply by its words. A message with both kinds of words
    /// is unclear.
    pub fn answer(&self, body: &str) -> Answer {
        let lower = body.to_lowercase();
        let words: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        let yes = words.iter().any(|w| self.affirmative.iter().any(|a| a == w));
        let no = words.iter().any(|w| self.negative.iter().any(|n| n == w));
        match (yes, no) {
            (true, false) => Answer::Yes,
            (false, true) => Answer::No,
            _ => Answer::Unclear,
        }
    }

    pub fn screen(&self, ocr_text: &str) -> Screen {
        let text = ocr_text.to_lowercase();
        if contains_any(&text, &self.code) {
            Screen::Code
        } else if contains_any(&text, &self.playlist) {
            Screen::Playlist
        } else {
            Screen::Other
        }
    }

    /// Whether an upstream answer says the contact already used a trial.
    pub fn limit_reached(&self, answer: &str) -> bool {
        contains_any(&answer.to_lowercase(), &self.limit)
    }
}

/// Splits an agent command into its token and the rest of the body.
pub fn command(body: &str) -> Option<(&str, &str)> {
    let body = body.trim_start();
    if !body.starts_with(COMMAND_PREFIX) {
        return None;
    }
    let end = body.find(char::is_whitespace).unwrap_or(body.len());
    Some((&body[..end], body[end..].trim()))
}

fn contains_any(haystack: &str, needles: &[String]) -> bool {
    needles.iter().any(|n| haystack.contains(n.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phrases() -> Phrases {
        Phrases::from_config(&EngineConfig::default())
    }

    #[test]
    fn instruction_phrases() {
        let p = phrases();
        assert_eq!(
            p.instruction("Beleza! Baixe o aplicativo IBO na sua TV"),
            Some(Instruction::DownloadApp)
        );
        assert_eq!(
            p.instruction("Abra o aplicativo e ME ENVIE UM PRINT da tela"),
            Some(Instruction::SendScreenshot)
        );
        assert_eq!(p.instruction("bom dia!"), None);
    }

    #[test]
    fn answers_match_whole_words() {
        let p = phrases();
        assert_eq!(p.answer("Sim, já baixei"), Answer::Yes);
        assert_eq!(p.answer("não consegui"), Answer::No);
        assert_eq!(p.answer("simples"), Answer::Unclear);
        assert_eq!(p.answer("sim e não"), Answer::Unclear);
        assert_eq!(p.answer("ok!"), Answer::Yes);
    }

    #[test]
    fn screen_classification_prefers_code() {
        let p = phrases();
        assert_eq!(p.screen("PLAYLIST\nCódigo de ativação: 1234"), Screen::Code);
        assert_eq!(p.screen("Minha Playlist"), Screen::Playlist);
        assert_eq!(p.screen("Configurações"), Screen::Other);
    }

    #[test]
    fn limit_marker() {
        let p = phrases();
        assert!(p.limit_reached("Erro: LIMITE ATINGIDO para este número"));
        assert!(!p.limit_reached("Usuário: ana"));
    }

    #[test]
    fn command_split() {
        assert_eq!(command("#IBO"), Some(("#IBO", "")));
        assert_eq!(
            command("  #ibo AA:BB:CC:11:22:33 "),
            Some(("#ibo", "AA:BB:CC:11:22:33"))
        );
        assert_eq!(command("oi #ibo"), None);
    }
}
