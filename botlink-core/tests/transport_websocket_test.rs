mod common;

use botlink_core::models::Envelope;
use botlink_core::transport::{BotChannel, ChannelClient, ChannelOptions};
use botlink_core::BridgeError;
use common::{answers, MockBot, Reply};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

fn fast_reconnect() -> ChannelOptions {
    ChannelOptions {
        reconnect_interval: Duration::from_millis(100),
    }
}

#[tokio::test]
async fn call_resolves_with_bot_response() {
    let mut bot = MockBot::start(answers(&[("credentials", json!("ready"))])).await;
    let client = ChannelClient::new(&bot.url(), fast_reconnect()).expect("client");

    let response = client
        .call(
            "credentials",
            json!({"clientId": "1", "token": "t"}),
            Some(Duration::from_secs(5)),
        )
        .await
        .expect("call failed");
    assert_eq!(response, json!("ready"));

    let frame = bot.next_frame().await;
    assert_eq!(frame.kind, "credentials");
    assert!(frame.id.is_some());
    assert_eq!(frame.data["clientId"], "1");
    assert_eq!(client.pending_calls(), 0);

    client.shutdown();
    bot.stop();
}

#[tokio::test]
async fn overlapping_calls_of_same_type_get_their_own_response() {
    // The first request is answered last
    let bot = MockBot::start(Arc::new(|envelope: &Envelope| {
        let n = envelope.data["n"].as_u64().unwrap_or(0);
        let delay = if n == 1 { 300 } else { 0 };
        Some(Reply::after(
            json!({ "echo": n }),
            Duration::from_millis(delay),
        ))
    }))
    .await;
    let client = ChannelClient::new(&bot.url(), fast_reconnect()).expect("client");

    let limit = Some(Duration::from_secs(5));
    let (first, second) = tokio::join!(
        client.call("list:channels", json!({"n": 1}), limit),
        client.call("list:channels", json!({"n": 2}), limit),
    );

    assert_eq!(first.expect("first call"), json!({"echo": 1}));
    assert_eq!(second.expect("second call"), json!({"echo": 2}));
    assert_eq!(client.pending_calls(), 0);

    client.shutdown();
    bot.stop();
}

#[tokio::test]
async fn reply_without_id_resolves_only_the_oldest_call() {
    let bot = MockBot::start(Arc::new(|envelope: &Envelope| {
        if envelope.data["n"] == json!(1) {
            Some(Reply::without_id(json!("already")))
        } else {
            None
        }
    }))
    .await;
    let client = Arc::new(ChannelClient::new(&bot.url(), fast_reconnect()).expect("client"));

    let first = client.call(
        "credentials",
        json!({"n": 1}),
        Some(Duration::from_secs(5)),
    );
    let second = client.call(
        "credentials",
        json!({"n": 2}),
        Some(Duration::from_millis(600)),
    );
    let (first, second) = tokio::join!(first, second);

    assert_eq!(first.expect("oldest call"), json!("already"));
    assert_eq!(second.unwrap_err(), BridgeError::Timeout);
    assert_eq!(client.pending_calls(), 0);

    client.shutdown();
    bot.stop();
}

#[tokio::test]
async fn timed_out_call_is_deregistered() {
    let bot = MockBot::start(answers(&[])).await;
    let client = ChannelClient::new(&bot.url(), fast_reconnect()).expect("client");

    let err = client
        .call("list:roles", Value::Null, Some(Duration::from_millis(200)))
        .await
        .unwrap_err();

    assert_eq!(err, BridgeError::Timeout);
    assert_eq!(err.to_string(), "timeout");
    assert_eq!(client.pending_calls(), 0);

    client.shutdown();
    bot.stop();
}

#[tokio::test]
async fn notify_sends_frame_without_id() {
    let mut bot = MockBot::start(answers(&[])).await;
    let client = ChannelClient::new(&bot.url(), fast_reconnect()).expect("client");

    client
        .notify("trigger", json!({"webhookId": "hook", "active": false}))
        .expect("notify");

    let frame = bot.next_frame().await;
    assert_eq!(frame.kind, "trigger");
    assert!(frame.id.is_none());
    assert_eq!(frame.data["active"], false);
    assert_eq!(client.pending_calls(), 0);

    client.shutdown();
    bot.stop();
}

#[tokio::test]
async fn call_waits_for_bot_to_come_up() {
    // Reserve a free port, then release it so the first connect attempts fail
    let addr = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind")
        .local_addr()
        .expect("addr");
    let client = Arc::new(
        ChannelClient::new(&format!("ws://{}", addr), fast_reconnect()).expect("client"),
    );

    let pending = {
        let client = Arc::clone(&client);
        tokio::spawn(async move {
            client
                .call("list:roles", Value::Null, Some(Duration::from_secs(5)))
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(350)).await;
    let bot = MockBot::start_on(addr, answers(&[("list:roles", json!([]))])).await;

    let response = pending.await.expect("task panicked").expect("call failed");
    assert_eq!(response, json!([]));

    client.shutdown();
    bot.stop();
}

#[tokio::test]
async fn shutdown_fails_waiting_calls() {
    let bot = MockBot::start(answers(&[])).await;
    let client = Arc::new(ChannelClient::new(&bot.url(), fast_reconnect()).expect("client"));

    let pending = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.call("execution", json!({}), None).await })
    };
    tokio::time::sleep(Duration::from_millis(200)).await;
    client.shutdown();

    let result = pending.await.expect("task panicked");
    assert_eq!(result.unwrap_err(), BridgeError::Closed);
    assert_eq!(client.pending_calls(), 0);

    bot.stop();
}

async fn free_addr() -> std::net::SocketAddr {
    TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind")
        .local_addr()
        .expect("addr")
}

#[tokio::test]
async fn timed_out_call_is_not_sent_once_bot_comes_up() {
    let addr = free_addr().await;
    let client = ChannelClient::new(&format!("ws://{}", addr), fast_reconnect()).expect("client");

    let err = client
        .call(
            "credentials",
            json!({"clientId": "1", "token": "t"}),
            Some(Duration::from_millis(150)),
        )
        .await
        .unwrap_err();
    assert_eq!(err, BridgeError::Timeout);

    let mut bot = MockBot::start_on(addr, answers(&[("list:roles", json!([]))])).await;
    let response = client
        .call("list:roles", Value::Null, Some(Duration::from_secs(5)))
        .await
        .expect("call failed");
    assert_eq!(response, json!([]));

    // The abandoned login would have been queued ahead of the list query
    let first = bot.next_frame().await;
    assert_eq!(first.kind, "list:roles");

    client.shutdown();
    bot.stop();
}

#[tokio::test]
async fn abandoned_calls_do_not_pile_up_while_bot_is_down() {
    let addr = free_addr().await;
    let client = ChannelClient::new(&format!("ws://{}", addr), fast_reconnect()).expect("client");

    for _ in 0..3 {
        let err = client
            .call("execution", json!({}), Some(Duration::from_millis(50)))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }

    // Nothing live is queued, so there is nothing left to write
    client
        .flush(Duration::from_secs(2))
        .await
        .expect("stale frames were not discarded");
    assert_eq!(client.pending_calls(), 0);

    client.shutdown();
}

#[tokio::test]
async fn flush_waits_until_notification_is_written() {
    let mut bot = MockBot::start(answers(&[])).await;
    let client = ChannelClient::new(&bot.url(), fast_reconnect()).expect("client");

    client
        .notify("trigger", json!({"webhookId": "hook", "active": false}))
        .expect("notify");
    client
        .flush(Duration::from_secs(5))
        .await
        .expect("flush failed");
    client.shutdown();

    let frame = bot.next_frame().await;
    assert_eq!(frame.kind, "trigger");
    assert_eq!(frame.data["webhookId"], "hook");

    bot.stop();
}

#[tokio::test]
async fn flush_times_out_while_bot_is_down() {
    let addr = free_addr().await;
    let client = ChannelClient::new(&format!("ws://{}", addr), fast_reconnect()).expect("client");

    // Nothing queued yet
    client
        .flush(Duration::from_millis(10))
        .await
        .expect("empty flush");

    client.notify("trigger", json!({})).expect("notify");
    let err = client
        .flush(Duration::from_millis(300))
        .await
        .unwrap_err();
    assert_eq!(err, BridgeError::Timeout);

    client.shutdown();
    assert_eq!(
        client.flush(Duration::from_millis(10)).await.unwrap_err(),
        BridgeError::Closed
    );
}
