// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Atende conversation engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use atende_core::ProductMode;
use serde::{Deserialize, Serialize};

/// Top-level Atende configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to sensible
/// values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AtendeConfig {
    /// Process identity and logging.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Conversation state machine behavior and phrase lists.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Fixed texts sent by the engine.
    #[serde(default)]
    pub messages: MessagesConfig,

    /// Echo suppression settings.
    #[serde(default)]
    pub echo: EchoConfig,

    /// Operator catalog cache and seed file.
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// External OCR engine settings.
    #[serde(default)]
    pub ocr: OcrConfig,

    /// Trial provisioning upstream settings.
    #[serde(default)]
    pub provisioning: ProvisioningConfig,

    /// Link extraction settings.
    #[serde(default)]
    pub links: LinksConfig,

    /// Delayed follow-up reminder settings.
    #[serde(default)]
    pub followup: FollowUpConfig,

    /// Product profile overrides and additions, matched by `keyword`.
    #[serde(default)]
    pub products: Vec<ProductConfig>,
}

/// Process identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Label sent to the provisioning upstream and shown in logs.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Device id used by the console shell.
    #[serde(default = "default_device")]
    pub device: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
            device: default_device(),
        }
    }
}

fn default_agent_name() -> String {
    "atende".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_device() -> String {
    "default".to_string()
}

/// Conversation state machine configuration.
///
/// Phrase lists are matched case-insensitively as substrings of the message
/// body, except the affirmative/negative lists which are matched as whole
/// words.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Seconds a confirmation question stays open before silently resetting.
    #[serde(default = "default_confirm_timeout_secs")]
    pub confirm_timeout_secs: u64,

    /// Agent phrases asking the contact to download or open the app.
    #[serde(default = "default_download_phrases")]
    pub download_phrases: Vec<String>,

    /// Agent phrases asking the contact for a screenshot of the opened app.
    #[serde(default = "default_screenshot_phrases")]
    pub screenshot_phrases: Vec<String>,

    /// Words accepted as "yes" to a confirmation question.
    #[serde(default = "default_affirmative_words")]
    pub affirmative_words: Vec<String>,

    /// Words accepted as "no" to a confirmation question.
    #[serde(default = "default_negative_words")]
    pub negative_words: Vec<String>,

    /// Keywords in a screenshot proving the app reached its activation screen.
    #[serde(default = "default_code_keywords")]
    pub code_keywords: Vec<String>,

    /// Keywords in a screenshot showing the playlist screen.
    #[serde(default = "default_playlist_keywords")]
    pub playlist_keywords: Vec<String>,

    /// Marker in an upstream answer meaning the contact already used a trial.
    #[serde(default = "default_limit_markers")]
    pub limit_markers: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            confirm_timeout_secs: default_confirm_timeout_secs(),
            download_phrases: default_download_phrases(),
            screenshot_phrases: default_screenshot_phrases(),
            affirmative_words: default_affirmative_words(),
            negative_words: default_negative_words(),
            code_keywords: default_code_keywords(),
            playlist_keywords: default_playlist_keywords(),
            limit_markers: default_limit_markers(),
        }
    }
}

fn default_confirm_timeout_secs() -> u64 {
    1800
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

fn default_download_phrases() -> Vec<String> {
    strings(&[
        "baixe o aplicativo",
        "baixar o aplicativo",
        "instale o aplicativo",
        "abra o aplicativo",
    ])
}

fn default_screenshot_phrases() -> Vec<String> {
    strings(&[
        "me envie um print",
        "mande um print",
        "envie uma foto da tela",
        "tire um print",
    ])
}

fn default_affirmative_words() -> Vec<String> {
    strings(&["sim", "s", "ok", "isso", "certo", "pronto", "já", "ja", "yes"])
}

fn default_negative_words() -> Vec<String> {
    strings(&["não", "nao", "n", "no", "errado"])
}

fn default_code_keywords() -> Vec<String> {
    strings(&["código", "codigo", "code", "ativação", "ativacao"])
}

fn default_playlist_keywords() -> Vec<String> {
    strings(&["playlist", "lista"])
}

fn default_limit_markers() -> Vec<String> {
    strings(&["limite atingido", "limit reached"])
}

/// Fixed texts sent by the engine. Every text is a template and may use
/// catalog variables (`{{ name }}`).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MessagesConfig {
    /// Asked when an identifier command arrives without a usable identifier.
    #[serde(default = "default_identifier_request")]
    pub identifier_request: String,

    /// Asks the contact to confirm the app is installed and open.
    #[serde(default = "default_app_confirmation")]
    pub app_confirmation: String,

    /// Asks the contact for a screenshot showing the identifier.
    #[serde(default = "default_print_request")]
    pub print_request: String,

    /// Sent once when a screenshot had no readable identifier.
    #[serde(default = "default_print_retry")]
    pub print_retry: String,

    /// Asks the contact to confirm a low-confidence identifier (`{{ mac }}`).
    #[serde(default = "default_identifier_confirmation")]
    pub identifier_confirmation: String,

    /// Asks a screen-check contact for a screenshot of the app.
    #[serde(default = "default_screen_request")]
    pub screen_request: String,

    /// Guides a screen-check contact from the playlist screen to the code.
    #[serde(default = "default_playlist_hint")]
    pub playlist_hint: String,

    /// Sent when the contact declines a confirmation.
    #[serde(default = "default_handoff")]
    pub handoff: String,

    /// Sent when provisioning fails for any infrastructure reason.
    #[serde(default = "default_failure")]
    pub failure: String,

    /// Sent when the upstream reports the contact already had a trial.
    #[serde(default = "default_limit_reached")]
    pub limit_reached: String,

    /// Reply used for profiles without their own template.
    #[serde(default = "default_trial_reply")]
    pub trial_reply: String,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            identifier_request: default_identifier_request(),
            app_confirmation: default_app_confirmation(),
            print_request: default_print_request(),
            print_retry: default_print_retry(),
            identifier_confirmation: default_identifier_confirmation(),
            screen_request: default_screen_request(),
            playlist_hint: default_playlist_hint(),
            handoff: default_handoff(),
            failure: default_failure(),
            limit_reached: default_limit_reached(),
            trial_reply: default_trial_reply(),
        }
    }
}

fn default_identifier_request() -> String {
    "Me envie o MAC do aparelho ou a imagem com o MAC marcado, por favor.".to_string()
}

fn default_app_confirmation() -> String {
    "Você já conseguiu baixar e abrir o aplicativo? Responda sim ou não.".to_string()
}

fn default_print_request() -> String {
    "Ótimo! Agora me envie um print da tela inicial do aplicativo, onde aparece o MAC."
        .to_string()
}

fn default_print_retry() -> String {
    "Não consegui ler o MAC nessa imagem. Pode enviar outro print, mais de perto?".to_string()
}

fn default_identifier_confirmation() -> String {
    "O MAC do seu aparelho é {{ mac }}? Responda sim ou não.".to_string()
}

fn default_screen_request() -> String {
    "Abra o aplicativo e me envie um print da tela, por favor.".to_string()
}

fn default_playlist_hint() -> String {
    "Agora toque em playlist e me envie um print da tela com o código.".to_string()
}

fn default_handoff() -> String {
    "Sem problemas! Um atendente vai continuar com você.".to_string()
}

fn default_failure() -> String {
    "Um atendente vai te ajudar em instantes.".to_string()
}

fn default_limit_reached() -> String {
    "Você já utilizou seu teste. Um atendente vai te atender em instantes.".to_string()
}

fn default_trial_reply() -> String {
    "Seu teste do {{ display_name }} está pronto!\n{{ block }}".to_string()
}

/// Echo suppression configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EchoConfig {
    /// Seconds a sent-message fingerprint stays valid.
    #[serde(default = "default_fingerprint_ttl_secs")]
    pub fingerprint_ttl_secs: u64,
}

impl Default for EchoConfig {
    fn default() -> Self {
        Self {
            fingerprint_ttl_secs: default_fingerprint_ttl_secs(),
        }
    }
}

fn default_fingerprint_ttl_secs() -> u64 {
    15
}

/// Operator catalog configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogConfig {
    /// Seconds a resolver serves reads from its snapshot before refreshing.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Optional TOML file with `[[commands]]`, `[[quick_replies]]`,
    /// `[[flows]]` and `[[variables]]` loaded at startup.
    #[serde(default)]
    pub seed_path: Option<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl_secs(),
            seed_path: None,
        }
    }
}

fn default_cache_ttl_secs() -> u64 {
    5
}

/// External OCR engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OcrConfig {
    /// Executable to run.
    #[serde(default = "default_ocr_command")]
    pub command: String,

    /// Arguments of the first recognition pass. The image is piped on stdin.
    #[serde(default = "default_ocr_args")]
    pub args: Vec<String>,

    /// Arguments of the second pass, run when the first yields no text.
    #[serde(default = "default_ocr_fallback_args")]
    pub fallback_args: Vec<String>,

    /// Milliseconds after which a still-running recognition logs a warning.
    #[serde(default = "default_ocr_warn_after_ms")]
    pub warn_after_ms: u64,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            command: default_ocr_command(),
            args: default_ocr_args(),
            fallback_args: default_ocr_fallback_args(),
            warn_after_ms: default_ocr_warn_after_ms(),
        }
    }
}

fn default_ocr_command() -> String {
    "tesseract".to_string()
}

fn default_ocr_args() -> Vec<String> {
    strings(&["stdin", "stdout", "-l", "eng"])
}

fn default_ocr_fallback_args() -> Vec<String> {
    strings(&["stdin", "stdout", "-l", "eng", "--psm", "11"])
}

fn default_ocr_warn_after_ms() -> u64 {
    8_000
}

/// Trial provisioning upstream configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProvisioningConfig {
    /// Endpoint receiving the trial request as JSON. `None` disables provisioning.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Bearer token sent to the endpoint.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Seconds before the request is abandoned.
    #[serde(default = "default_provisioning_timeout_secs")]
    pub timeout_secs: u64,

    /// Label attached to every trial request.
    #[serde(default = "default_agent_name")]
    pub label: String,

    /// Milliseconds after which a pending request logs a warning.
    #[serde(default = "default_provisioning_warn_after_ms")]
    pub warn_after_ms: u64,
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            timeout_secs: default_provisioning_timeout_secs(),
            label: default_agent_name(),
            warn_after_ms: default_provisioning_warn_after_ms(),
        }
    }
}

fn default_provisioning_timeout_secs() -> u64 {
    90
}

fn default_provisioning_warn_after_ms() -> u64 {
    20_000
}

/// Link extraction configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LinksConfig {
    /// Hosts (and their subdomains) whose links are listed first.
    #[serde(default = "default_short_link_hosts")]
    pub short_link_hosts: Vec<String>,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            short_link_hosts: default_short_link_hosts(),
        }
    }
}

fn default_short_link_hosts() -> Vec<String> {
    strings(&["bit.ly", "tinyurl.com", "cutt.ly", "is.gd", "encurtador.com.br"])
}

/// Delayed follow-up reminder configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FollowUpConfig {
    /// Schedule a reminder after every issued trial.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Seconds between the trial and the reminder.
    #[serde(default = "default_followup_delay_secs")]
    pub delay_secs: u64,

    /// Seconds between two scans for due reminders.
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,

    /// JSON file holding pending reminders.
    #[serde(default = "default_store_path")]
    pub store_path: String,

    /// Reminder text; `{{ name }}` is the contact's display name.
    #[serde(default = "default_followup_message")]
    pub message: String,
}

impl Default for FollowUpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            delay_secs: default_followup_delay_secs(),
            tick_interval_secs: default_tick_interval_secs(),
            store_path: default_store_path(),
            message: default_followup_message(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_followup_delay_secs() -> u64 {
    3 * 60 * 60
}

fn default_tick_interval_secs() -> u64 {
    60
}

fn default_store_path() -> String {
    dirs::data_local_dir()
        .map(|d| d.join("atende/followups.json").display().to_string())
        .unwrap_or_else(|| "followups.json".to_string())
}

fn default_followup_message() -> String {
    "Oi {{ name }}! Conseguiu testar? Se gostou, posso te passar os planos.".to_string()
}

/// Overrides or adds a product profile. Unset fields keep the built-in
/// value for known keywords.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ProductConfig {
    /// Flow name of the commands that select this product (e.g. `ibo`).
    pub keyword: String,

    #[serde(default)]
    pub app_name: Option<String>,

    #[serde(default)]
    pub display_name: Option<String>,

    /// Code used when the upstream answer carries none.
    #[serde(default)]
    pub default_code: Option<String>,

    /// Send the whole upstream answer instead of the product block.
    #[serde(default)]
    pub fallback_full_text: Option<bool>,

    #[serde(default)]
    pub mode: Option<ProductMode>,

    #[serde(default)]
    pub reply_template: Option<String>,
}
