use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    App,
    error::AppError,
    identity::AuthUser,
    schema::{comments, reactions},
};

use super::models::NewReaction;

#[derive(Deserialize)]
pub struct Vote {
    comment_id: i32,
    is_upvote: bool,
}

/// Casts or flips the user's vote on a comment.
pub async fn vote_comment(
    State(ctx): State<App>,
    AuthUser(user): AuthUser,
    crate::json::Json(vote): crate::json::Json<Vote>,
) -> Result<Json<Value>, AppError> {
    let mut conn = ctx.diesel.get().await?;

    let exists = comments::table
        .find(vote.comment_id)
        .select(comments::id)
        .first::<i32>(&mut conn)
        .await
        .optional()?;

    if exists.is_none() {
        return Err(("Comment not found", StatusCode::NOT_FOUND))?;
    }

    diesel::insert_into(reactions::table)
        .values(&NewReaction {
            user_id: user.id,
            comment_id: vote.comment_id,
            is_upvote: vote.is_upvote,
        })
        .on_conflict((reactions::user_id, reactions::comment_id))
        .do_update()
        .set(reactions::is_upvote.eq(vote.is_upvote))
        .execute(&mut conn)
        .await?;

    Ok(Json(json!({ "message": "Reaction added" })))
}

pub async fn remove_vote(
    State(ctx): State<App>,
    Path(comment_id): Path<i32>,
    AuthUser(user): AuthUser,
) -> Result<Json<Value>, AppError> {
    let mut conn = ctx.diesel.get().await?;

    let removed = diesel::delete(
        reactions::table
            .filter(reactions::user_id.eq(user.id))
            .filter(reactions::comment_id.eq(comment_id)),
    )
    .execute(&mut conn)
    .await?;

    if removed == 0 {
        return Err(("Invalid Reaction", StatusCode::BAD_REQUEST))?;
    }

    Ok(Json(json!({ "message": "Reaction removed" })))
}
