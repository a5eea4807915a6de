#![allow(
    clippy::unwrap_used,
    clippy::panic,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    missing_debug_implementations,
    unreachable_pub,
    clippy::print_stderr
)]

mod common;

use common::{TestApp, TestUser};
use futures::{SinkExt, StreamExt};
use reqwest::StatusCode;
use serde_json::json;
use std::time::Duration;
use tokio_tungstenite::tungstenite::protocol::Message;
use uuid::Uuid;

async fn open_conversation(app: &TestApp, a: &TestUser, b: &TestUser) -> Uuid {
    let resp = app
        .authed(app.client.post(format!("{}/conversations/create", app.server_url)), a)
        .json(&json!({ "user1Id": a.id, "user2Id": b.id }))
        .send()
        .await
        .unwrap();
    assert!(resp.status() == StatusCode::CREATED || resp.status() == StatusCode::OK);
    let body: serde_json::Value = resp.json().await.unwrap();
    body["conversation_id"].as_str().unwrap().parse().unwrap()
}

async fn send_message(app: &TestApp, user: &TestUser, conversation_id: Uuid, text: &str) -> serde_json::Value {
    let resp = app
        .authed(
            app.client.post(format!("{}/conversations/{conversation_id}/messages", app.server_url)),
            user,
        )
        .json(&json!({ "message_text": text }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    resp.json().await.unwrap()
}

#[tokio::test]
async fn create_or_get_is_idempotent_per_pair() {
    let Some(app) = TestApp::try_spawn().await else { return };
    let alice = app.register_user("company").await;
    let bob = app.register_user("worker").await;

    let resp = app
        .authed(app.client.post(format!("{}/conversations/create", app.server_url)), &alice)
        .json(&json!({ "user1Id": alice.id, "user2Id": bob.id }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let first: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(first["created"], json!(true));

    // Same pair from the other side: no new conversation
    let resp = app
        .authed(app.client.post(format!("{}/conversations/create", app.server_url)), &bob)
        .json(&json!({ "user1Id": bob.id, "user2Id": alice.id }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let second: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(second["created"], json!(false));
    assert_eq!(second["conversation_id"], first["conversation_id"]);
}

#[tokio::test]
async fn conversation_with_yourself_is_rejected() {
    let Some(app) = TestApp::try_spawn().await else { return };
    let alice = app.register_user("worker").await;

    let resp = app
        .authed(app.client.post(format!("{}/conversations/create", app.server_url)), &alice)
        .json(&json!({ "user1Id": alice.id, "user2Id": alice.id }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn conversation_with_unknown_user_is_not_found() {
    let Some(app) = TestApp::try_spawn().await else { return };
    let alice = app.register_user("worker").await;

    let resp = app
        .authed(app.client.post(format!("{}/conversations/create", app.server_url)), &alice)
        .json(&json!({ "user1Id": alice.id, "user2Id": Uuid::new_v4() }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn conversations_cannot_be_opened_or_listed_for_other_users() {
    let Some(app) = TestApp::try_spawn().await else { return };
    let alice = app.register_user("company").await;
    let bob = app.register_user("worker").await;
    let mallory = app.register_user("worker").await;

    let resp = app
        .authed(app.client.post(format!("{}/conversations/create", app.server_url)), &mallory)
        .json(&json!({ "user1Id": alice.id, "user2Id": bob.id }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = app
        .authed(app.client.get(format!("{}/conversations/user/{}", app.server_url, alice.id)), &mallory)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn messages_round_trip_with_attachment_token() {
    let Some(app) = TestApp::try_spawn().await else { return };
    let alice = app.register_user("company").await;
    let bob = app.register_user("worker").await;
    let conversation_id = open_conversation(&app, &alice, &bob).await;

    let sent = send_message(
        &app,
        &alice,
        conversation_id,
        "contract attached [[FILE:https://files.local/contract.pdf|contract.pdf|application/pdf]]",
    )
    .await;
    assert_eq!(sent["status"], json!("delivered"));
    assert_eq!(sent["attachments"][0]["name"], json!("contract.pdf"));
    assert!(sent["delivered_at"].is_string());

    send_message(&app, &bob, conversation_id, "got it, thanks").await;

    let resp = app
        .authed(
            app.client.get(format!("{}/conversations/{conversation_id}/messages", app.server_url)),
            &bob,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let messages: serde_json::Value = resp.json().await.unwrap();
    let messages = messages.as_array().unwrap();
    assert_eq!(messages.len(), 2);
    // Oldest first within the page
    assert_eq!(messages[0]["sender_id"].as_str().unwrap(), alice.id.to_string());
    assert_eq!(messages[1]["message_text"], json!("got it, thanks"));
}

#[tokio::test]
async fn empty_message_text_is_rejected() {
    let Some(app) = TestApp::try_spawn().await else { return };
    let alice = app.register_user("company").await;
    let bob = app.register_user("worker").await;
    let conversation_id = open_conversation(&app, &alice, &bob).await;

    let resp = app
        .authed(
            app.client.post(format!("{}/conversations/{conversation_id}/messages", app.server_url)),
            &alice,
        )
        .json(&json!({ "message_text": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn non_participants_are_forbidden() {
    let Some(app) = TestApp::try_spawn().await else { return };
    let alice = app.register_user("company").await;
    let bob = app.register_user("worker").await;
    let mallory = app.register_user("worker").await;
    let conversation_id = open_conversation(&app, &alice, &bob).await;

    let resp = app
        .authed(
            app.client.get(format!("{}/conversations/{conversation_id}/messages", app.server_url)),
            &mallory,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn read_receipts_follow_the_recipient_only_rule() {
    let Some(app) = TestApp::try_spawn().await else { return };
    let alice = app.register_user("company").await;
    let bob = app.register_user("worker").await;
    let conversation_id = open_conversation(&app, &alice, &bob).await;

    let sent = send_message(&app, &alice, conversation_id, "please confirm").await;
    let message_id = sent["id"].as_str().unwrap();

    // The sender cannot acknowledge their own message
    let read_url = format!("{}/conversations/{conversation_id}/messages/{message_id}/read", app.server_url);
    let resp = app.authed(app.client.put(&read_url), &alice).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // The recipient can, and repeats are harmless
    let resp = app.authed(app.client.put(&read_url), &bob).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["success"], json!(true));
    let resp = app.authed(app.client.put(&read_url), &bob).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .authed(
            app.client.get(format!("{}/conversations/{conversation_id}/messages", app.server_url)),
            &bob,
        )
        .send()
        .await
        .unwrap();
    let messages: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(messages[0]["status"], json!("read"));
    assert!(messages[0]["read_at"].is_string());
}

#[tokio::test]
async fn only_the_sender_may_delete_a_message() {
    let Some(app) = TestApp::try_spawn().await else { return };
    let alice = app.register_user("company").await;
    let bob = app.register_user("worker").await;
    let conversation_id = open_conversation(&app, &alice, &bob).await;

    let sent = send_message(&app, &alice, conversation_id, "oops, wrong chat").await;
    let message_id = sent["id"].as_str().unwrap();
    let url = format!("{}/conversations/{conversation_id}/messages/{message_id}", app.server_url);

    // Recipient: the message exists but is not theirs
    let resp = app.authed(app.client.delete(&url), &bob).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // Sender succeeds
    let resp = app.authed(app.client.delete(&url), &alice).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    // Gone now
    let resp = app.authed(app.client.delete(&url), &alice).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleting_the_last_message_clears_the_preview() {
    let Some(app) = TestApp::try_spawn().await else { return };
    let alice = app.register_user("company").await;
    let bob = app.register_user("worker").await;
    let conversation_id = open_conversation(&app, &alice, &bob).await;

    send_message(&app, &alice, conversation_id, "first").await;
    let last = send_message(&app, &alice, conversation_id, "second").await;
    let last_id = last["id"].as_str().unwrap();

    let resp = app
        .authed(
            app.client.delete(format!("{}/conversations/{conversation_id}/messages/{last_id}", app.server_url)),
            &alice,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = app
        .authed(app.client.get(format!("{}/conversations/user/{}", app.server_url, alice.id)), &alice)
        .send()
        .await
        .unwrap();
    let summaries: serde_json::Value = resp.json().await.unwrap();
    let summary = summaries
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["conversation_id"].as_str().unwrap() == conversation_id.to_string())
        .unwrap();
    assert_eq!(summary["last_message"], json!("first"));
}

#[tokio::test]
async fn deleting_a_conversation_removes_everything() {
    let Some(app) = TestApp::try_spawn().await else { return };
    let alice = app.register_user("company").await;
    let bob = app.register_user("worker").await;
    let conversation_id = open_conversation(&app, &alice, &bob).await;

    send_message(&app, &alice, conversation_id, "hello [[FILE:https://x/a.png|a.png|image/png]]").await;

    let resp = app
        .authed(app.client.delete(format!("{}/conversations/{conversation_id}", app.server_url)), &bob)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = app
        .authed(
            app.client.get(format!("{}/conversations/{conversation_id}/messages", app.server_url)),
            &alice,
        )
        .send()
        .await
        .unwrap();
    // Membership rows are gone with the conversation
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn gateway_delivers_messages_to_joined_subscribers() {
    let Some(app) = TestApp::try_spawn().await else { return };
    let alice = app.register_user("company").await;
    let bob = app.register_user("worker").await;
    let conversation_id = open_conversation(&app, &alice, &bob).await;

    let url = format!("{}?token={}", app.ws_url, bob.token);
    let (ws_stream, _) = tokio_tungstenite::connect_async(url).await.expect("Failed to connect");
    let (mut sink, mut stream) = ws_stream.split();

    sink.send(Message::Text(
        json!({ "action": "join_conversation", "conversation_id": conversation_id }).to_string().into(),
    ))
    .await
    .unwrap();

    // Give the join frame time to land before producing the event
    tokio::time::sleep(Duration::from_millis(200)).await;
    send_message(&app, &alice, conversation_id, "realtime hello").await;

    let frame = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(msg) = stream.next().await {
            if let Ok(Message::Text(text)) = msg {
                return Some(text.to_string());
            }
        }
        None
    })
    .await
    .expect("Timed out waiting for gateway event")
    .expect("Gateway closed before delivering the event");

    let event: serde_json::Value = serde_json::from_str(&frame).unwrap();
    assert_eq!(event["event"], json!("message_received"));
    assert_eq!(event["message_text"], json!("realtime hello"));
    assert_eq!(event["sender_id"].as_str().unwrap(), alice.id.to_string());
}

#[tokio::test]
async fn gateway_rejects_bad_tokens_at_handshake() {
    let Some(app) = TestApp::try_spawn().await else { return };

    let url = format!("{}?token=not-a-jwt", app.ws_url);
    let result = tokio_tungstenite::connect_async(url).await;
    assert!(result.is_err(), "Handshake should fail with an invalid token");
}
