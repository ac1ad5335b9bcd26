// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Device identifier (MAC) extraction from recognized text.
//!
//! OCR output is noisy: labels sit next to the value, `0` reads as `O`,
//! separators get lost or doubled. Extraction runs in two passes over a
//! label-blanked copy of the text:
//!
//! 1. a conservative pass mapping only `O`/`o` to `0`;
//! 2. an aggressive pass, tried only when the first finds nothing, that
//!    also maps `I i l |` to `1`, `Z` to `2`, `S` to `5`, `G` to `6` and
//!    `T` to `7`.
//!
//! Every substitution is ASCII for ASCII and labels are blanked with the
//! same number of bytes, so match offsets in the normalized text are valid
//! offsets into the original.

use std::sync::LazyLock;

use regex::Regex;

/// Literal identifier labels, with an optional trailing separator.
static LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:endere[çc]o\s+mac|mac\s+address|mac)\b\s*[:=\-]?").unwrap()
});

/// Six hex pairs joined by single separators.
static STRICT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[0-9a-f]{2}(?:[:.\-][0-9a-f]{2}){5}").unwrap());

/// Six hex pairs with one to three stray characters between them.
///
/// Stray characters are punctuation or blanks only: a letter between two
/// pairs ends the shape, so words are never bridged. Six hex-looking pairs
/// split by blanks (`de 12 de 03 de 20`) still match; OCR often reads the
/// colons of a MAC as spaces, and a match that is not in canonical form
/// scores low against a labelled one.
static LOOSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[0-9a-f]{2}(?:[^0-9A-Za-z\n]{1,3}[0-9a-f]{2}){5}").unwrap()
});

/// A contiguous run of 12 to 14 hex characters.
static BARE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\b[0-9a-f]{12,14}\b").unwrap());

static CANONICAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9A-F]{2}(?::[0-9A-F]{2}){5}$").unwrap());

/// Length of the canonical `XX:XX:XX:XX:XX:XX` form.
const CANONICAL_LEN: usize = 17;

/// Distance (in bytes) beyond which a label no longer adds to a score.
const PROXIMITY_RANGE: f64 = 200.0;

/// A device identifier in canonical form (`AA:BB:CC:11:22:33`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(String);

impl Identifier {
    /// Accepts only the canonical six-pair colon form, in either case.
    pub fn parse(raw: &str) -> Option<Self> {
        let upper = raw.trim().to_ascii_uppercase();
        CANONICAL.is_match(&upper).then_some(Self(upper))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalization pass that produced an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    Conservative,
    /// High-risk look-alikes were substituted; the result deserves a
    /// confirmation from the contact.
    Aggressive,
}

impl Pass {
    fn normalize(self, text: &str) -> String {
        text.chars()
            .map(|c| match (self, c) {
                (_, 'O' | 'o') => '0',
                (Pass::Aggressive, 'I' | 'i' | 'l' | '|') => '1',
                (Pass::Aggressive, 'Z') => '2',
                (Pass::Aggressive, 'S') => '5',
                (Pass::Aggressive, 'G') => '6',
                (Pass::Aggressive, 'T') => '7',
                _ => c,
            })
            .collect()
    }
}

/// A successful extraction with the evidence behind it.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub identifier: Identifier,
    pub pass: Pass,
    pub score: f64,
}

#[derive(Debug)]
struct Candidate {
    identifier: Identifier,
    start: usize,
    end: usize,
    raw_len: usize,
}

/// Extracts the most likely identifier from recognized text.
pub fn extract(text: &str) -> Option<Identifier> {
    extract_detailed(text).map(|e| e.identifier)
}

/// Tries the texts of several OCR passes in order and returns the first
/// extraction.
pub fn extract_from_passes<S: AsRef<str>>(texts: &[S]) -> Option<Extraction> {
    texts.iter().find_map(|t| extract_detailed(t.as_ref()))
}

/// Like [`extract`], reporting which pass matched and the winning score.
pub fn extract_detailed(text: &str) -> Option<Extraction> {
    let labels: Vec<(usize, usize)> = LABEL
        .find_iter(text)
        .map(|m| (m.start(), m.end()))
        .collect();
    let blanked = blank_ranges(text, &labels);
    let upper = text.to_uppercase();

    for pass in [Pass::Conservative, Pass::Aggressive] {
        let candidates = scan(&pass.normalize(&blanked));
        let mut best: Option<(f64, Candidate)> = None;
        for candidate in candidates {
            let score = score(&candidate, &upper, &labels);
            // Strictly greater: ties keep the first found.
            if best.as_ref().is_none_or(|(top, _)| score > *top) {
                best = Some((score, candidate));
            }
        }
        if let Some((score, candidate)) = best {
            tracing::debug!(
                identifier = %candidate.identifier,
                ?pass,
                score,
                "identifier extracted"
            );
            return Some(Extraction {
                identifier: candidate.identifier,
                pass,
                score,
            });
        }
    }

    None
}

fn blank_ranges(text: &str, ranges: &[(usize, usize)]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for &(start, end) in ranges {
        out.push_str(&text[cursor..start]);
        out.extend(std::iter::repeat_n(' ', end - start));
        cursor = end;
    }
    out.push_str(&text[cursor..]);
    out
}

fn scan(normalized: &str) -> Vec<Candidate> {
    let mut found: Vec<Candidate> = Vec::new();
    for shape in [&*STRICT, &*LOOSE, &*BARE] {
        for m in shape.find_iter(normalized) {
            let Some(identifier) = canonicalize(m.as_str()) else {
                continue;
            };
            if found.iter().any(|c| c.identifier == identifier) {
                continue;
            }
            found.push(Candidate {
                identifier,
                start: m.start(),
                end: m.end(),
                raw_len: m.len(),
            });
        }
    }
    found
}

fn canonicalize(raw: &str) -> Option<Identifier> {
    let hex: Vec<char> = raw
        .chars()
        .filter(char::is_ascii_hexdigit)
        .map(|c| c.to_ascii_uppercase())
        .collect();
    if hex.len() < 12 {
        return None;
    }
    let joined = hex[..12]
        .chunks(2)
        .map(|pair| pair.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join(":");
    Identifier::parse(&joined)
}

fn score(candidate: &Candidate, upper_original: &str, labels: &[(usize, usize)]) -> f64 {
    let mut score = 0.0;
    if upper_original.contains(candidate.identifier.as_str()) {
        score += 1.0;
    }
    if candidate.raw_len == CANONICAL_LEN {
        score += 3.0;
    }
    let nearest = labels
        .iter()
        .map(|&(label_start, label_end)| {
            if candidate.start >= label_end {
                candidate.start - label_end
            } else {
                label_start.saturating_sub(candidate.end)
            }
        })
        .min();
    if let Some(distance) = nearest {
        let d = (distance as f64).min(PROXIMITY_RANGE);
        score += 5.0 * (1.0 - d / PROXIMITY_RANGE);
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn id(s: &str) -> Identifier {
        Identifier::parse(s).expect("canonical identifier")
    }

    #[test]
    fn labeled_canonical_form() {
        assert_eq!(extract("MAC: AA:BB:CC:11:22:33"), Some(id("AA:BB:CC:11:22:33")));
    }

    #[test]
    fn bare_run_is_reassembled() {
        assert_eq!(
            extract("Mac Address aabbcc112233"),
            Some(id("AA:BB:CC:11:22:33"))
        );
    }

    #[test]
    fn fourteen_hex_run_is_truncated() {
        assert_eq!(extract("ID 0123456789ABCD"), Some(id("01:23:45:67:89:AB")));
    }

    #[test]
    fn dash_separated_lowercase() {
        assert_eq!(extract("aa-bb-cc-dd-ee-ff"), Some(id("AA:BB:CC:DD:EE:FF")));
    }

    #[test]
    fn stray_characters_between_groups() {
        let found = extract_detailed("MAC AA : BB : CC ;DD, EE.:FF").expect("loose match");
        assert_eq!(found.identifier, id("AA:BB:CC:DD:EE:FF"));
        assert_eq!(found.pass, Pass::Conservative);
    }

    #[test]
    fn letters_between_pairs_are_not_bridged() {
        assert_eq!(extract("ab x cd x ef x 12 x 34 x 56"), None);
        assert_eq!(extract("cafe de 12 h, fade 03 h"), None);
    }

    #[test]
    fn blank_separated_pairs_are_accepted() {
        assert_eq!(extract("AA BB CC 11 22 33"), Some(id("AA:BB:CC:11:22:33")));
    }

    #[test]
    fn label_with_accent_is_blanked() {
        assert_eq!(
            extract("Endereço MAC: 00:1A:2B:3C:4D:5E"),
            Some(id("00:1A:2B:3C:4D:5E"))
        );
    }

    #[test]
    fn letter_o_is_read_as_zero_conservatively() {
        let found = extract_detailed("MAC: AA:BB:CC:1O:22:33").expect("found");
        assert_eq!(found.identifier, id("AA:BB:CC:10:22:33"));
        assert_eq!(found.pass, Pass::Conservative);
    }

    #[test]
    fn high_risk_lookalikes_need_the_aggressive_pass() {
        let found = extract_detailed("MAC: AA:BB:CC:1I:22:3S").expect("found");
        assert_eq!(found.identifier, id("AA:BB:CC:11:22:35"));
        assert_eq!(found.pass, Pass::Aggressive);
    }

    #[test]
    fn candidate_near_label_wins() {
        let filler = "x ".repeat(150);
        let text = format!("Serial 11:22:33:44:55:66 {filler} MAC: AA:BB:CC:DD:EE:FF");
        let found = extract_detailed(&text).expect("found");
        assert_eq!(found.identifier, id("AA:BB:CC:DD:EE:FF"));
        assert!(found.score > 8.0);
    }

    #[test]
    fn ties_keep_first_found() {
        assert_eq!(
            extract("AA:BB:CC:DD:EE:FF ou 11:22:33:44:55:66"),
            Some(id("AA:BB:CC:DD:EE:FF"))
        );
    }

    #[test]
    fn delimited_form_outscores_bare_run() {
        assert_eq!(
            extract("112233445566 e AA:BB:CC:DD:EE:FF"),
            Some(id("AA:BB:CC:DD:EE:FF"))
        );
    }

    #[test]
    fn plain_text_is_not_found() {
        assert_eq!(extract("Olá, tudo bem? Já instalei o app."), None);
        assert_eq!(extract(""), None);
    }

    #[test]
    fn passes_are_tried_in_order() {
        let found = extract_from_passes(&["", "nada aqui", "MAC 001122334455"]).expect("found");
        assert_eq!(found.identifier, id("00:11:22:33:44:55"));
        assert!(extract_from_passes::<&str>(&[]).is_none());
    }

    #[test]
    fn parse_rejects_non_canonical() {
        assert!(Identifier::parse("AABBCC112233").is_none());
        assert!(Identifier::parse("AA-BB-CC-11-22-33").is_none());
        assert_eq!(id("aa:bb:cc:11:22:33").as_str(), "AA:BB:CC:11:22:33");
    }

    proptest! {
        #[test]
        fn canonical_identifier_round_trips(
            bytes in proptest::array::uniform6(any::<u8>()),
            prefix in "[ghjkmnp-z ]{0,20}",
            suffix in "[ghjkmnp-z ]{0,20}",
        ) {
            let canonical = bytes
                .iter()
                .map(|b| format!("{b:02X}"))
                .collect::<Vec<_>>()
                .join(":");
            let text = format!("{prefix} {canonical} {suffix}");
            prop_assert_eq!(extract(&text), Some(id(&canonical)));
        }

        #[test]
        fn short_hex_runs_split_by_words_are_not_found(
            parts in proptest::collection::vec(
                ("[0-9a-f]{1,4}", "[ ,.]?[ghjkmnpqruvwxy][ ,.]?"),
                0..30,
            ),
        ) {
            let text: String = parts.iter().map(|(hex, word)| format!("{hex}{word}")).collect();
            prop_assert_eq!(extract(&text), None);
        }

        #[test]
        fn short_digit_runs_are_not_found(digits in "[0-9]{1,11}") {
            prop_assert_eq!(extract(&digits), None);
        }
    }
}
