use std::collections::HashMap;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    App,
    error::AppError,
    identity::AuthUser,
    schema::{messages, users},
    utils::clean_content,
};

use super::models::{Correspondent, InboxEntry, Message, NewMessage, latest_per_partner};

pub fn route() -> Router<App> {
    Router::<App>::new()
        .route("/messages", post(send_message))
        .route("/messages/inbox", get(get_inbox))
        .route("/messages/all/{username}", get(get_conversation))
}

async fn get_inbox(
    State(ctx): State<App>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<InboxEntry>>, AppError> {
    let mut conn = ctx.diesel.get().await?;

    let all = messages::table
        .filter(
            messages::sender_id
                .eq(user.id)
                .or(messages::receiver_id.eq(user.id)),
        )
        .order((messages::created_at.desc(), messages::id.desc()))
        .select(Message::as_select())
        .load::<Message>(&mut conn)
        .await?;

    let latest = latest_per_partner(all, user.id);
    if latest.is_empty() {
        return Ok(Json(vec![]));
    }

    let mut ids: Vec<i32> = latest.iter().map(|m| m.partner_of(user.id)).collect();
    ids.push(user.id);

    let people: HashMap<i32, Correspondent> = users::table
        .filter(users::id.eq_any(ids))
        .select((users::id, users::username, users::avatar))
        .load::<(i32, String, Option<String>)>(&mut conn)
        .await?
        .into_iter()
        .map(|(id, username, avatar)| (id, Correspondent { username, avatar }))
        .collect();

    let correspondent = |id: i32| -> Result<Correspondent, AppError> {
        people
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::Unhandled(format!("message references missing user {id}")))
    };

    let mut inbox = Vec::with_capacity(latest.len());
    for m in latest {
        inbox.push(InboxEntry {
            sender: correspondent(m.sender_id)?,
            receiver: correspondent(m.receiver_id)?,
            latest_from_user: m.sender_id == user.id,
            message_id: m.id,
            content: m.content,
            created_at: m.created_at,
            seen: m.seen,
        });
    }

    Ok(Json(inbox))
}

async fn find_user_id(
    conn: &mut diesel_async::AsyncPgConnection,
    username: &str,
) -> Result<i32, AppError> {
    users::table
        .filter(users::username.eq(username))
        .select(users::id)
        .first::<i32>(conn)
        .await
        .optional()?
        .ok_or(("User not found", StatusCode::NOT_FOUND).into())
}

async fn get_conversation(
    State(ctx): State<App>,
    AuthUser(user): AuthUser,
    Path(username): Path<String>,
) -> Result<Json<Vec<Message>>, AppError> {
    let mut conn = ctx.diesel.get().await?;

    let partner_id = find_user_id(&mut conn, &username).await?;

    let conversation = messages::table
        .filter(
            (messages::sender_id.eq(user.id).and(messages::receiver_id.eq(partner_id))).or(
                messages::sender_id
                    .eq(partner_id)
                    .and(messages::receiver_id.eq(user.id)),
            ),
        )
        .order((messages::created_at.asc(), messages::id.asc()))
        .select(Message::as_select())
        .load::<Message>(&mut conn)
        .await?;

    let marked = diesel::update(
        messages::table
            .filter(messages::sender_id.eq(partner_id))
            .filter(messages::receiver_id.eq(user.id))
            .filter(messages::seen.eq(false)),
    )
    .set(messages::seen.eq(true))
    .execute(&mut conn)
    .await?;

    if marked > 0 {
        tracing::debug!(user_id = user.id, partner_id, marked, "Marked messages as seen");
    }

    Ok(Json(conversation))
}

#[derive(Deserialize, Debug)]
pub struct MessageSubmission {
    receiver: String,
    content: String,
}

async fn send_message(
    State(ctx): State<App>,
    AuthUser(user): AuthUser,
    crate::json::Json(submission): crate::json::Json<MessageSubmission>,
) -> Result<Json<Value>, AppError> {
    let content = clean_content(&submission.content).map_err(|e| (e, StatusCode::BAD_REQUEST))?;

    if submission.receiver == user.username {
        return Err(("Cannot message yourself", StatusCode::BAD_REQUEST))?;
    }

    let mut conn = ctx.diesel.get().await?;

    let receiver_id = find_user_id(&mut conn, &submission.receiver).await?;

    let message = diesel::insert_into(messages::table)
        .values(&NewMessage {
            sender_id: user.id,
            receiver_id,
            content,
        })
        .returning(Message::as_returning())
        .get_result::<Message>(&mut conn)
        .await?;

    Ok(Json(json!({ "message": "Message sent", "new_message": message })))
}
