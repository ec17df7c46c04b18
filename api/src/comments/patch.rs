use axum::{
    Json, debug_handler,
    extract::{Path, State},
    http::StatusCode,
};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::{Deserialize, Serialize};

use crate::{
    App,
    error::AppError,
    identity::AuthUser,
    schema::{comment_info, comments},
    utils::clean_content,
};

use super::{
    models::{CommentInfo, CommentView, CommentViewer},
    tree::CommentRecord,
};

#[derive(Deserialize)]
pub struct CommentPatch {
    content: String,
}

#[derive(Serialize)]
pub struct PatchedComment {
    message: &'static str,
    comment: CommentView,
}

#[debug_handler]
pub async fn patch_comment(
    State(ctx): State<App>,
    Path(id): Path<i32>,
    AuthUser(user): AuthUser,
    crate::json::Json(patch): crate::json::Json<CommentPatch>,
) -> Result<Json<PatchedComment>, AppError> {
    let content = clean_content(&patch.content).map_err(|e| (e, StatusCode::BAD_REQUEST))?;

    let mut conn = ctx.diesel.get().await?;

    let owner = comments::table
        .find(id)
        .select(comments::user_id)
        .first::<i32>(&mut conn)
        .await
        .optional()?
        .ok_or(("Comment not found", StatusCode::NOT_FOUND))?;

    if owner != user.id {
        return Err((
            "You are not the owner of this comment",
            StatusCode::FORBIDDEN,
        ))?;
    }

    diesel::update(comments::table.find(id))
        .set((comments::content.eq(&content), comments::is_edited.eq(true)))
        .execute(&mut conn)
        .await?;

    let updated = comment_info::table
        .find(id)
        .select(CommentInfo::as_select())
        .first::<CommentInfo>(&mut conn)
        .await?;

    let viewer = CommentViewer::load(&mut conn, user.id, std::slice::from_ref(&updated)).await?;

    Ok(Json(PatchedComment {
        message: "Comment edited",
        comment: updated.serialize(Some(&viewer)),
    }))
}
