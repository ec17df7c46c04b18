use axum::{
    Json, debug_handler,
    extract::{Path, State},
    http::StatusCode,
};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde_json::{Value, json};

use crate::{
    App,
    error::AppError,
    identity::{AuthUser, models::role::Grants},
    schema::{comments, posts},
};

/// Owners can always delete their comments, moderators only within their
/// subpost. Replies go with their parent.
#[debug_handler]
pub async fn delete_comment(
    State(ctx): State<App>,
    Path(id): Path<i32>,
    AuthUser(user): AuthUser,
) -> Result<Json<Value>, AppError> {
    let mut conn = ctx.diesel.get().await?;

    let (owner, subpost_id) = comments::table
        .inner_join(posts::table)
        .filter(comments::id.eq(id))
        .select((comments::user_id, posts::subpost_id))
        .first::<(i32, i32)>(&mut conn)
        .await
        .optional()?
        .ok_or(("Comment not found", StatusCode::NOT_FOUND))?;

    if owner != user.id {
        let grants = Grants::load(&mut conn, user.id).await?;
        if !grants.can_moderate(subpost_id) {
            return Err((
                "You are not allowed to delete this comment",
                StatusCode::FORBIDDEN,
            ))?;
        }

        tracing::info!(
            comment_id = id,
            subpost_id,
            moderator = user.id,
            "Comment removed by moderator"
        );
    }

    diesel::delete(comments::table.find(id))
        .execute(&mut conn)
        .await?;

    Ok(Json(json!({ "message": "Comment deleted" })))
}
