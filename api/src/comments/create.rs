use axum::{Json, debug_handler, extract::State, http::StatusCode};
use diesel::{
    prelude::*,
    sql_types::{Integer, Nullable},
};
use diesel_async::RunQueryDsl;
use serde::{Deserialize, Serialize};

use crate::{
    App,
    error::AppError,
    identity::AuthUser,
    schema::{comment_info, comments, posts},
    utils::clean_content,
};

use super::{
    models::{CommentInfo, CommentView, CommentViewer, NewComment},
    tree::{CommentNode, CommentRecord},
};

/// Replies can't be nested deeper than this. Building, serializing and
/// dropping a comment tree all recurse once per level.
pub const MAX_REPLY_DEPTH: i32 = 200;

#[derive(QueryableByName, Debug)]
struct ThreadDepth {
    #[diesel(sql_type = Nullable<Integer>)]
    depth: Option<i32>,
}

// `parent_depth` counts the comments from the thread's root down to the parent
fn check_reply_depth(parent_depth: i32) -> Result<(), &'static str> {
    if parent_depth >= MAX_REPLY_DEPTH {
        return Err("This thread is too deep to reply to");
    }
    Ok(())
}

#[derive(Serialize)]
pub struct CreatedComment {
    new_comment: CommentNode<CommentView>,
}

#[debug_handler]
pub async fn create_comment(
    State(ctx): State<App>,
    AuthUser(user): AuthUser,
    crate::json::Json(submission): crate::json::Json<CommentSubmission>,
) -> Result<Json<CreatedComment>, AppError> {
    let new_comment = submission
        .validate(user.id)
        .map_err(|e| (e, StatusCode::BAD_REQUEST))?;

    let mut conn = ctx.diesel.get().await?;

    let post = posts::table
        .find(new_comment.post_id)
        .select(posts::id)
        .first::<i32>(&mut conn)
        .await
        .optional()?;

    if post.is_none() {
        return Err(("Post not found", StatusCode::NOT_FOUND))?;
    }

    // check if the parent comment actually belongs to the post
    if let Some(parent_id) = new_comment.parent_id {
        let parent = comments::table
            .filter(comments::id.eq(parent_id))
            .filter(comments::post_id.eq(new_comment.post_id))
            .select(comments::id)
            .first::<i32>(&mut conn)
            .await
            .optional()?;

        if parent.is_none() {
            return Err((
                "You're replying to a comment that does not belong to this post",
                StatusCode::BAD_REQUEST,
            ))?;
        }

        let thread_depth = diesel::sql_query(
            "
            WITH RECURSIVE ancestors (id, parent_id, depth) AS (
                SELECT id, parent_id, 1 FROM comments WHERE id = $1
                UNION ALL
                SELECT c.id, c.parent_id, a.depth + 1
                FROM comments c
                JOIN ancestors a ON c.id = a.parent_id
                WHERE a.depth <= $2
            )
            SELECT MAX(depth) AS depth FROM ancestors
            ",
        )
        .bind::<Integer, _>(parent_id)
        .bind::<Integer, _>(MAX_REPLY_DEPTH)
        .get_result::<ThreadDepth>(&mut conn)
        .await?;

        check_reply_depth(thread_depth.depth.unwrap_or(0))
            .map_err(|e| (e, StatusCode::BAD_REQUEST))?;
    }

    let id = diesel::insert_into(comments::table)
        .values(&new_comment)
        .returning(comments::id)
        .get_result::<i32>(&mut conn)
        .await?;

    let created = comment_info::table
        .find(id)
        .select(CommentInfo::as_select())
        .first::<CommentInfo>(&mut conn)
        .await?;

    tracing::info!(
        comment_id = id,
        post_id = new_comment.post_id,
        user_id = user.id,
        "Comment created"
    );

    Ok(Json(CreatedComment {
        new_comment: CommentNode::leaf(created.serialize(Some(&CommentViewer::new(user.id)))),
    }))
}

#[derive(Deserialize, Debug)]
pub struct CommentSubmission {
    post_id: i32,
    content: String,
    parent_id: Option<i32>,
}

impl CommentSubmission {
    fn validate(self, user_id: i32) -> Result<NewComment, &'static str> {
        Ok(NewComment {
            user_id,
            post_id: self.post_id,
            parent_id: self.parent_id,
            has_parent: self.parent_id.is_some(),
            content: clean_content(&self.content)?,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::comments::tree::build_tree;

    fn submission(content: &str, parent_id: Option<i32>) -> CommentSubmission {
        CommentSubmission {
            post_id: 3,
            content: content.into(),
            parent_id,
        }
    }

    #[test]
    fn reply_has_parent() {
        let c = submission(" hi ", Some(9)).validate(1).unwrap();
        assert!(c.has_parent);
        assert_eq!(c.parent_id, Some(9));
        assert_eq!(c.content, "hi");
        assert_eq!(c.user_id, 1);
    }

    #[test]
    fn top_level_comment_has_no_parent() {
        let c = submission("hello", None).validate(1).unwrap();
        assert!(!c.has_parent);
        assert_eq!(c.post_id, 3);
    }

    #[test]
    fn empty_content_is_rejected() {
        assert!(submission("  ", None).validate(1).is_err());
    }

    #[test]
    fn replies_past_the_depth_cap_are_rejected() {
        assert_eq!(check_reply_depth(0), Ok(()));
        assert_eq!(check_reply_depth(MAX_REPLY_DEPTH - 1), Ok(()));
        assert_eq!(
            check_reply_depth(MAX_REPLY_DEPTH),
            Err("This thread is too deep to reply to")
        );
        assert!(check_reply_depth(MAX_REPLY_DEPTH + 500).is_err());
    }

    // The deepest thread replies allow must survive a worker-sized stack
    #[test]
    fn deepest_thread_fits_on_a_small_stack() {
        let handle = std::thread::Builder::new()
            .stack_size(2 * 1024 * 1024)
            .spawn(|| {
                let rows: Vec<CommentInfo> = (1..=MAX_REPLY_DEPTH + 1)
                    .map(|id| CommentInfo {
                        comment_id: id,
                        user_id: 1,
                        username: "user1".into(),
                        user_avatar: None,
                        post_id: 1,
                        content: format!("reply {id}"),
                        parent_id: (id > 1).then_some(id - 1),
                        has_parent: id > 1,
                        is_edited: false,
                        created_at: chrono::Utc::now(),
                        comment_karma: 0,
                    })
                    .collect();

                let tree = build_tree(&rows, Some(&CommentViewer::new(1)));
                let json = serde_json::to_string(&tree).unwrap();
                (tree[0].depth(), json.is_empty())
            })
            .unwrap();

        let (depth, empty) = handle.join().unwrap();
        assert_eq!(depth, MAX_REPLY_DEPTH as usize);
        assert!(!empty);
    }

    #[test]
    fn accepts_client_payload() {
        let s: CommentSubmission =
            serde_json::from_str(r#"{"post_id": 4, "content": "x", "parent_id": null}"#).unwrap();
        assert_eq!(s.post_id, 4);
        assert_eq!(s.parent_id, None);

        let s: CommentSubmission =
            serde_json::from_str(r#"{"post_id": 4, "content": "x"}"#).unwrap();
        assert_eq!(s.parent_id, None);
    }
}
