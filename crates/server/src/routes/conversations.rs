// crates/server/src/routes/conversations.rs
//! Messaging endpoints (REST + SSE).
//!
//! - `POST /api/conversations`                     -- start a conversation
//! - `POST /api/conversations/direct`              -- find or start a two-person conversation
//! - `GET  /api/conversations/{id}`
//! - `GET  /api/conversations/{id}/participants`
//! - `GET  /api/conversations/{id}/messages`       -- oldest first
//! - `POST /api/conversations/{id}/messages`       -- send as `senderId`
//! - `POST /api/conversations/{id}/read`           -- move a participant's read marker
//! - `POST /api/conversations/{id}/attachments`    -- upload a file to attach to a message
//! - `GET  /api/conversations/{id}/stream?viewer=` -- SSE: full message list on every change
//! - `GET  /api/profiles/{id}/conversations`       -- inbox with unread counts

use std::convert::Infallible;
use std::sync::Arc;

use agencydesk_core::MessageDraft;
use agencydesk_db::{
    Conversation, ConversationFeed, ConversationSummary, Message, NewConversation, OrEmpty,
    Participant,
};
use agencydesk_types::{Attachment, Bucket};
use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::sse::{Event, Sse},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use super::storage::{store, UploadForm};
use crate::error::{ApiError, ApiJson, ApiResult};
use crate::metrics::SubscriberGauge;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/conversations", post(create_conversation))
        .route("/conversations/direct", post(direct_conversation))
        .route("/conversations/{id}", get(get_conversation))
        .route("/conversations/{id}/participants", get(list_participants))
        .route(
            "/conversations/{id}/messages",
            get(list_messages).post(send_message),
        )
        .route("/conversations/{id}/read", post(mark_read))
        .route("/conversations/{id}/attachments", post(upload_attachment))
        .route("/conversations/{id}/stream", get(conversation_stream))
        .route("/profiles/{id}/conversations", get(list_inbox))
}

async fn create_conversation(
    State(state): State<Arc<AppState>>,
    ApiJson(input): ApiJson<NewConversation>,
) -> ApiResult<(StatusCode, Json<Conversation>)> {
    let conversation = state.db.create_conversation(input).await?;
    Ok((StatusCode::CREATED, Json(conversation)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DirectRequest {
    profile_id: String,
    other_profile_id: String,
}

async fn direct_conversation(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<DirectRequest>,
) -> ApiResult<Json<Conversation>> {
    let conversation = state
        .db
        .find_or_create_direct_conversation(&body.profile_id, &body.other_profile_id)
        .await?;
    Ok(Json(conversation))
}

async fn get_conversation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Conversation>> {
    Ok(Json(state.db.get_conversation(&id).await?))
}

async fn list_participants(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Json<Vec<Participant>> {
    Json(state.db.list_participants(&id).await.or_empty("participants"))
}

async fn list_inbox(
    State(state): State<Arc<AppState>>,
    Path(profile_id): Path<String>,
) -> Json<Vec<ConversationSummary>> {
    Json(
        state
            .db
            .list_conversations_for_profile(&profile_id)
            .await
            .or_empty("conversations"),
    )
}

#[derive(Debug, Deserialize)]
struct ViewerQuery {
    viewer: Option<String>,
}

/// With `?viewer=`, only participants may read.
async fn list_messages(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<ViewerQuery>,
) -> ApiResult<Json<Vec<Message>>> {
    if let Some(viewer) = query.viewer.as_deref() {
        if !state.db.is_participant(&id, viewer).await? {
            state.db.get_conversation(&id).await?;
            return Err(ApiError::Forbidden(format!(
                "{viewer} is not a participant of conversation {id}"
            )));
        }
    }
    Ok(Json(state.db.get_messages(&id).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendRequest {
    sender_id: String,
    #[serde(flatten)]
    draft: MessageDraft,
}

async fn send_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<SendRequest>,
) -> ApiResult<(StatusCode, Json<Message>)> {
    let message = state.db.send_message(&id, &body.sender_id, body.draft).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReadRequest {
    profile_id: String,
}

async fn mark_read(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<ReadRequest>,
) -> ApiResult<StatusCode> {
    state.db.mark_conversation_read(&id, &body.profile_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Stores the file in `chat-attachments` and returns the descriptor to put
/// in a message's `attachments`. The uploader must be a participant.
async fn upload_attachment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Attachment>)> {
    let mut form = UploadForm::read(multipart).await?;
    let uploader = form
        .field("profileId")
        .ok_or_else(|| ApiError::BadRequest("profileId is required".into()))?;
    if !state.db.is_participant(&id, &uploader).await? {
        state.db.get_conversation(&id).await?;
        return Err(ApiError::Forbidden(format!(
            "{uploader} is not a participant of conversation {id}"
        )));
    }
    let file = form.take_file()?;
    let stored = store(&state, Bucket::ChatAttachments, &file).await?;
    Ok((
        StatusCode::CREATED,
        Json(Attachment {
            name: file.file_name,
            url: stored.url,
            mime_type: stored.content_type,
            size: stored.size,
        }),
    ))
}

#[derive(Debug, Deserialize)]
struct StreamQuery {
    viewer: String,
}

fn messages_event(messages: &[Message]) -> Event {
    Event::default()
        .event("messages")
        .data(serde_json::to_string(messages).unwrap_or_default())
}

/// GET /api/conversations/{id}/stream?viewer={profile_id}
///
/// | Event name  | When emitted                                      |
/// |-------------|---------------------------------------------------|
/// | `messages`  | On connect, then after every change to the thread |
/// | `heartbeat` | Every 15 seconds by default                       |
///
/// Opening the stream marks the conversation read for the viewer. A
/// non-participant gets 403 before the stream opens.
async fn conversation_stream(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<StreamQuery>,
) -> ApiResult<Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>>> {
    let mut feed = ConversationFeed::new(state.db.clone(), query.viewer);
    feed.select(&id).await?;
    tracing::debug!(conversation = %id, viewer = %feed.viewer_id(), "Conversation stream opened");
    let heartbeat_every = state.heartbeat;

    let stream = async_stream::stream! {
        let _open = SubscriberGauge::open();
        yield Ok(messages_event(feed.messages()));

        let mut heartbeat = tokio::time::interval(heartbeat_every);
        heartbeat.tick().await;
        loop {
            // Only the cancel-safe wait races the heartbeat; the re-fetch
            // runs outside the select so a tick can never interrupt it.
            let woke = tokio::select! {
                changed = feed.changed() => Some(changed),
                _ = heartbeat.tick() => None,
            };
            match woke {
                None => {
                    yield Ok(Event::default().event("heartbeat").data("{}"));
                }
                Some(false) => break,
                Some(true) => match feed.refresh().await {
                    Ok(()) => {
                        yield Ok(messages_event(feed.messages()));
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Conversation re-fetch failed, closing stream");
                        break;
                    }
                },
            }
        }
    };

    Ok(Sse::new(stream))
}
