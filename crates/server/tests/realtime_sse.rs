//! Integration tests for the SSE endpoints.
//!
//! The handlers never end on their own, so these tests read the body frame
//! by frame with a timeout instead of collecting it.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, BodyDataStream};
use axum::http::{Request, StatusCode};
use axum::Router;
use futures_util::StreamExt;
use tower::ServiceExt;

use agencydesk_core::{LocalObjectStore, MessageDraft};
use agencydesk_db::{Database, NewClient, NewProfile};
use agencydesk_server::{create_app, create_app_full, AppState};

async fn test_db() -> Database {
    Database::new_in_memory().await.expect("in-memory DB for tests")
}

/// Frames SSE events out of a response body. One chunk may carry several
/// events or only part of one, so unread text is kept between calls.
struct SseReader {
    stream: BodyDataStream,
    buffer: String,
}

impl SseReader {
    /// Read until one complete SSE event arrives and return (event_name, data).
    async fn next_event(&mut self) -> (String, serde_json::Value) {
        loop {
            if let Some(end) = self.buffer.find("\n\n") {
                let frame: String = self.buffer.drain(..end + 2).collect();
                return parse_frame(&frame);
            }
            let chunk = tokio::time::timeout(Duration::from_secs(5), self.stream.next())
                .await
                .expect("timed out waiting for an SSE event")
                .expect("stream ended")
                .expect("body error");
            self.buffer.push_str(&String::from_utf8_lossy(&chunk));
        }
    }

    /// Skip heartbeats until the next event with another name.
    async fn next_non_heartbeat(&mut self) -> (String, serde_json::Value) {
        loop {
            let (name, data) = self.next_event().await;
            if name != "heartbeat" {
                return (name, data);
            }
        }
    }
}

fn parse_frame(frame: &str) -> (String, serde_json::Value) {
    let mut name = String::new();
    let mut data = String::new();
    for line in frame.lines() {
        if let Some(event_name) = line.strip_prefix("event: ") {
            name = event_name.trim().to_string();
        } else if let Some(payload) = line.strip_prefix("data: ") {
            data.push_str(payload.trim());
        }
    }
    let json = serde_json::from_str(&data).unwrap_or(serde_json::Value::Null);
    (name, json)
}

async fn open_on(app: Router, uri: &str) -> (StatusCode, SseReader) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let reader = SseReader {
        stream: response.into_body().into_data_stream(),
        buffer: String::new(),
    };
    (status, reader)
}

async fn open_stream(db: &Database, storage: &std::path::Path, uri: &str) -> (StatusCode, SseReader) {
    open_on(create_app(db.clone(), storage), uri).await
}

async fn profile(db: &Database, email: &str) -> String {
    db.create_profile(NewProfile {
        email: email.into(),
        ..Default::default()
    })
    .await
    .unwrap()
    .id
}

#[tokio::test]
async fn test_conversation_stream_refetches_after_send() {
    let db = test_db().await;
    let storage = tempfile::tempdir().unwrap();
    let alice = profile(&db, "alice@agency.io").await;
    let bob = profile(&db, "bob@client.io").await;
    let conversation = db.find_or_create_direct_conversation(&alice, &bob).await.unwrap();
    db.send_message(&conversation.id, &bob, MessageDraft::text("first"))
        .await
        .unwrap();

    let uri = format!("/api/conversations/{}/stream?viewer={alice}", conversation.id);
    let (status, mut stream) = open_stream(&db, storage.path(), &uri).await;
    assert_eq!(status, StatusCode::OK);

    let (name, data) = stream.next_event().await;
    assert_eq!(name, "messages");
    assert_eq!(data.as_array().unwrap().len(), 1);

    // Opening the stream marked the conversation read.
    let inbox = db.list_conversations_for_profile(&alice).await.unwrap();
    assert_eq!(inbox[0].unread_count, 0);

    db.send_message(&conversation.id, &bob, MessageDraft::text("second"))
        .await
        .unwrap();
    let (name, data) = stream.next_event().await;
    assert_eq!(name, "messages");
    let contents: Vec<&str> = data
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, vec!["first", "second"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_conversation_stream_delivers_every_send_between_heartbeats() {
    let db = test_db().await;
    let storage = tempfile::tempdir().unwrap();
    let alice = profile(&db, "alice@agency.io").await;
    let bob = profile(&db, "bob@client.io").await;
    let conversation = db.find_or_create_direct_conversation(&alice, &bob).await.unwrap();

    // A 1 ms heartbeat keeps ticks landing while re-fetches are in flight.
    let store = Arc::new(LocalObjectStore::new(storage.path(), ""));
    let state = AppState::new(db.clone(), store).with_heartbeat(Duration::from_millis(1));
    let app = create_app_full(state, Some(storage.path().to_path_buf()));

    let uri = format!("/api/conversations/{}/stream?viewer={alice}", conversation.id);
    let (status, mut stream) = open_on(app, &uri).await;
    assert_eq!(status, StatusCode::OK);
    let (name, data) = stream.next_non_heartbeat().await;
    assert_eq!(name, "messages");
    assert!(data.as_array().unwrap().is_empty());

    for sent in 1..=20 {
        db.send_message(&conversation.id, &bob, MessageDraft::text(format!("update {sent}")))
            .await
            .unwrap();
        // Heartbeats alone keep the body busy, so bound the whole wait.
        let delivered = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let (name, data) = stream.next_non_heartbeat().await;
                assert_eq!(name, "messages");
                if data.as_array().unwrap().len() == sent {
                    return;
                }
            }
        })
        .await;
        assert!(delivered.is_ok(), "message {sent} never reached the stream");
    }
}

#[tokio::test]
async fn test_conversation_stream_rejects_outsider() {
    let db = test_db().await;
    let storage = tempfile::tempdir().unwrap();
    let alice = profile(&db, "alice@agency.io").await;
    let bob = profile(&db, "bob@client.io").await;
    let eve = profile(&db, "eve@else.io").await;
    let conversation = db.find_or_create_direct_conversation(&alice, &bob).await.unwrap();

    let uri = format!("/api/conversations/{}/stream?viewer={eve}", conversation.id);
    let (status, _) = open_stream(&db, storage.path(), &uri).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = open_stream(&db, storage.path(), "/api/conversations/nope/stream?viewer=x").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_table_stream_forwards_only_its_table() {
    let db = test_db().await;
    let storage = tempfile::tempdir().unwrap();
    let (status, mut stream) = open_stream(&db, storage.path(), "/api/realtime/clients").await;
    assert_eq!(status, StatusCode::OK);

    profile(&db, "noise@agency.io").await;
    let client = db
        .create_client(NewClient {
            name: "Acme".into(),
            ..Default::default()
        })
        .await
        .unwrap();

    let (name, data) = stream.next_event().await;
    assert_eq!(name, "change");
    assert_eq!(data["table"], "clients");
    assert_eq!(data["op"], "INSERT");
    assert_eq!(data["id"], client.id.as_str());
}

#[tokio::test]
async fn test_table_stream_unknown_table() {
    let db = test_db().await;
    let storage = tempfile::tempdir().unwrap();
    let (status, _) = open_stream(&db, storage.path(), "/api/realtime/secrets").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
