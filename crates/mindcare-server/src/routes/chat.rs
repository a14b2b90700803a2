use axum::extract::{Path, State};
use axum::Json;
use mindcare_core::appointment::{Appointment, ChatMessage};
use mindcare_core::chat::{self, PostChatForm};
use serde::Deserialize;
use uuid::Uuid;

use super::blocking;
use crate::auth::CurrentActor;
use crate::error::AppError;
use crate::state::AppState;

/// GET /api/appointments/{id}/chat
pub async fn list_messages(
    State(app): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ChatMessage>>, AppError> {
    let store = app.store.clone();
    let messages = blocking(move || chat::list_messages(&store, &actor, id)).await?;
    Ok(Json(messages))
}

#[derive(Deserialize)]
pub struct MessageBody {
    pub content: String,
}

/// POST /api/appointments/{id}/chat
pub async fn send_message(
    State(app): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
    Json(body): Json<MessageBody>,
) -> Result<Json<ChatMessage>, AppError> {
    let store = app.store.clone();
    let message = blocking(move || chat::send_message(&store, &actor, id, body.content)).await?;
    app.notify();
    Ok(Json(message))
}

/// POST /api/appointments/{id}/chat/end — the student closes the chat.
pub async fn end_chat(
    State(app): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<Json<Appointment>, AppError> {
    let store = app.store.clone();
    let appt = blocking(move || chat::end_chat(&store, &actor, id)).await?;
    app.notify();
    Ok(Json(appt))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PostChatBody {
    pub session_notes: Option<String>,
    pub diagnosis: Option<String>,
    pub follow_up: Option<String>,
}

/// POST /api/appointments/{id}/post-chat-form
pub async fn submit_post_chat_form(
    State(app): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
    Json(body): Json<PostChatBody>,
) -> Result<Json<Appointment>, AppError> {
    let store = app.store.clone();
    let form = PostChatForm {
        session_notes: body.session_notes,
        diagnosis: body.diagnosis,
        follow_up: body.follow_up,
    };
    let appt = blocking(move || chat::submit_post_chat_form(&store, &actor, id, form)).await?;
    app.notify();
    Ok(Json(appt))
}
