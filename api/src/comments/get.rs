use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::Serialize;

use crate::{
    App,
    error::AppError,
    identity::MaybeAuthUser,
    schema::{comment_info, posts},
};

use super::{
    models::{CommentInfo, CommentView, CommentViewer},
    tree::{CommentNode, build_tree},
};

#[derive(Serialize)]
pub struct PostComments {
    post_id: i32,
    comment_info: Vec<CommentNode<CommentView>>,
}

pub async fn get_comments(
    State(ctx): State<App>,
    Path(post_id): Path<i32>,
    auth_user: MaybeAuthUser,
) -> Result<Json<PostComments>, AppError> {
    let mut conn = ctx.diesel.get().await?;

    // Creation order puts every parent before its replies
    let rows = comment_info::table
        .filter(comment_info::post_id.eq(post_id))
        .order((comment_info::created_at.asc(), comment_info::comment_id.asc()))
        .select(CommentInfo::as_select())
        .load::<CommentInfo>(&mut conn)
        .await?;

    if rows.is_empty() {
        let post = posts::table
            .find(post_id)
            .select(posts::id)
            .first::<i32>(&mut conn)
            .await
            .optional()?;

        if post.is_none() {
            return Err(("Post not found", StatusCode::NOT_FOUND))?;
        }
    }

    let viewer = match auth_user.user() {
        Some(user) => Some(CommentViewer::load(&mut conn, user.id, &rows).await?),
        None => None,
    };

    let comment_info = build_tree(&rows, viewer.as_ref());

    let placed: usize = comment_info.iter().map(CommentNode::count).sum();
    tracing::debug!(
        post_id,
        placed,
        depth = comment_info.iter().map(CommentNode::depth).max().unwrap_or(0),
        "Built comment tree"
    );

    if placed < rows.len() {
        tracing::warn!(
            post_id,
            rows = rows.len(),
            placed,
            "Some comments could not be attached to a parent and were left out"
        );
    }

    Ok(Json(PostComments {
        post_id,
        comment_info,
    }))
}
