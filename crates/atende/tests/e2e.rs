// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end conversations: configuration text in, chat transcript out.

use atende_agent::ConversationState;
use atende_config::AtendeConfig;
use atende_core::types::AuditEventType;
use atende_test_utils::TestHarness;

const MAC: &str = "AA:BB:CC:11:22:33";

const CONFIG: &str = r#"
[agent]
device = "loja"

[messages]
identifier_request = "Me manda o MAC da TV, por favor."
"#;

const CATALOG: &str = r#"
[[flows]]
name = "boas vindas"
triggers = ["oi"]
stages = ["Olá! Tudo bem?", "Quer testar qual aplicativo?"]

[[quick_replies]]
trigger = "pix"
response_template = "A chave pix é {{ pix }}"

[[variables]]
name = "pix"
value = "vendas@example.com"
"#;

fn config() -> AtendeConfig {
    atende_config::load_and_validate_str(CONFIG).expect("test config should be valid")
}

async fn harness() -> TestHarness {
    let config = config();
    TestHarness::builder()
        .with_config(move |c| *c = config)
        .with_catalog(CATALOG)
        .build()
        .await
        .unwrap()
}

#[tokio::test]
async fn agent_supplies_identifier_after_command() {
    let mut h = harness().await;

    h.agent_says("#IBO").await.unwrap();
    assert!(h.pending().is_some());
    assert_eq!(h.replies().await, vec!["Me manda o MAC da TV, por favor."]);

    h.agent_says(MAC).await.unwrap();
    let requests = h.trial_requests().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].device_identifier_phone, MAC);
    assert!(h.pending().is_none());
}

#[tokio::test]
async fn unreadable_print_gets_one_reminder() {
    let mut h = harness().await;

    h.agent_says("#ibo").await.unwrap();
    h.contact_photo("Bem-vindo\nConfigurações").await.unwrap();

    match h.state() {
        ConversationState::AwaitingIdentifierProof {
            print_reminder_sent,
            ..
        } => assert!(print_reminder_sent),
        other => panic!("unexpected state {other:?}"),
    }
    assert!(h.pending().is_some());
    let retry = config().messages.print_retry;
    let reminders = h.replies().await.into_iter().filter(|r| *r == retry).count();
    assert_eq!(reminders, 1);
}

#[tokio::test]
async fn greeting_flow_walks_its_stages() {
    let mut h = harness().await;

    h.contact_says("oi").await.unwrap();
    h.contact_says("quero testar").await.unwrap();

    assert_eq!(
        h.replies().await,
        vec!["Olá! Tudo bem?", "Quer testar qual aplicativo?"]
    );
    assert!(h.state().is_idle());
}

#[tokio::test]
async fn full_sale_from_greeting_to_follow_up() {
    let mut h = harness().await;

    h.contact_says("oi").await.unwrap();
    h.contact_says("quero testar").await.unwrap();
    h.agent_says("#ibo").await.unwrap();
    h.contact_photo(&format!("IBO Player\nMac Address: {MAC}"))
        .await
        .unwrap();
    h.contact_says("qual o pix?").await.unwrap();

    let replies = h.replies().await;
    assert_eq!(replies.len(), 5);
    assert!(replies[3].contains("Usuário: teste"));
    assert_eq!(replies[4], "A chave pix é vendas@example.com");

    assert_eq!(h.trial_requests().await.len(), 1);
    assert!(h.pending().is_none());
    assert!(h.state().is_idle());
    assert_eq!(h.followups.pending().await.len(), 1);

    // The transport reports every send back; none of them is an instruction.
    h.echo_sent().await.unwrap();
    assert_eq!(h.replies().await.len(), 5);
    assert_eq!(h.audit.of_type(AuditEventType::EchoSuppressed).await.len(), 5);
}
