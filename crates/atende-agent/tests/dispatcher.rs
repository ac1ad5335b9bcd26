// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::time::Duration;

use atende_agent::Dispatcher;
use atende_core::types::InboundMessage;
use atende_test_utils::{CHAT, TestHarness};
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn dispatcher_routes_each_device_and_drains_on_close() {
    let h = TestHarness::builder().build().await.unwrap();
    for device in ["loja", "filial"] {
        h.channel
            .inject_message(
                InboundMessage::text(device, CHAT, "#lazer")
                    .with_id(&format!("{device}-1"))
                    .from_self(),
            )
            .await;
    }
    h.channel.close();

    let dispatcher = Dispatcher::new(h.channel.clone(), h.ctx.clone());
    dispatcher.run(CancellationToken::new()).await.unwrap();

    let requests = h.trial_requests().await;
    assert_eq!(requests.len(), 2);
    let devices: Vec<String> = h
        .channel
        .sent_messages()
        .await
        .into_iter()
        .map(|m| m.device_id)
        .collect();
    assert!(devices.contains(&"loja".to_string()));
    assert!(devices.contains(&"filial".to_string()));
}

#[tokio::test]
async fn dispatcher_keeps_device_order() {
    let h = TestHarness::builder().build().await.unwrap();
    h.channel
        .inject_message(InboundMessage::text("loja", CHAT, "#assist").with_id("a-1").from_self())
        .await;
    h.channel.put_media("shot", b"shot").await;
    h.ocr.set_text(b"shot", "código de ativação 1234").await;
    h.channel
        .inject_message(InboundMessage::text("loja", CHAT, "").with_id("c-1").with_media("shot"))
        .await;
    h.channel.close();

    Dispatcher::new(h.channel.clone(), h.ctx.clone())
        .run(CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(h.trial_requests().await.len(), 1);
}

#[tokio::test]
async fn dispatcher_stops_on_cancel() {
    let h = TestHarness::builder().build().await.unwrap();
    let cancel = CancellationToken::new();
    let dispatcher = Dispatcher::new(h.channel.clone(), h.ctx.clone());
    let handle = tokio::spawn(dispatcher.run(cancel.clone()));

    cancel.cancel();
    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("dispatcher stopped")
        .expect("task joined");
    assert!(result.is_ok());
}
