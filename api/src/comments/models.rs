use std::collections::HashMap;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::Serialize;

use crate::{identity::models::user::PublicUser, schema::reactions};

use super::tree::CommentRecord;

// One row of the `comment_info` view
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::comment_info)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CommentInfo {
    pub comment_id: i32,
    pub user_id: i32,
    pub username: String,
    pub user_avatar: Option<String>,
    pub post_id: i32,
    pub content: String,
    pub parent_id: Option<i32>,
    pub has_parent: bool,
    pub is_edited: bool,
    pub created_at: DateTime<Utc>,
    pub comment_karma: i64,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::comments)]
pub struct NewComment {
    pub user_id: i32,
    pub post_id: i32,
    pub parent_id: Option<i32>,
    pub has_parent: bool,
    pub content: String,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::reactions)]
pub struct NewReaction {
    pub user_id: i32,
    pub comment_id: i32,
    pub is_upvote: bool,
}

/// The logged in user looking at a comment thread, along with the votes they
/// cast on it.
#[derive(Debug, Clone, Default)]
pub struct CommentViewer {
    pub user_id: i32,
    pub votes: HashMap<i32, bool>,
}

impl CommentViewer {
    pub fn new(user_id: i32) -> Self {
        CommentViewer {
            user_id,
            votes: HashMap::new(),
        }
    }

    /// Loads the viewer's votes on `comments`.
    pub async fn load(
        conn: &mut AsyncPgConnection,
        user_id: i32,
        comments: &[CommentInfo],
    ) -> QueryResult<Self> {
        if comments.is_empty() {
            return Ok(Self::new(user_id));
        }

        let ids: Vec<i32> = comments.iter().map(|c| c.comment_id).collect();

        let votes = reactions::table
            .filter(reactions::user_id.eq(user_id))
            .filter(reactions::comment_id.eq_any(ids))
            .select((reactions::comment_id, reactions::is_upvote))
            .load::<(i32, bool)>(conn)
            .await?
            .into_iter()
            .collect();

        Ok(CommentViewer { user_id, votes })
    }
}

// The model that will be returned to the client
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct CommentView {
    pub comment_info: CommentInfoView,
    pub user_info: PublicUser,
    pub current_user: CurrentUserView,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct CommentInfoView {
    pub id: i32,
    pub post_id: i32,
    pub content: String,
    pub parent_id: Option<i32>,
    pub has_parent: bool,
    pub is_edited: bool,
    pub created_at: DateTime<Utc>,
    pub comment_karma: i64,
}

#[derive(Debug, Serialize, Clone, PartialEq, Default)]
pub struct CurrentUserView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_upvoted: Option<bool>,
    pub is_comment_owner: bool,
}

impl CommentRecord for CommentInfo {
    type Id = i32;
    type Viewer = CommentViewer;
    type Output = CommentView;

    fn comment_id(&self) -> i32 {
        self.comment_id
    }

    fn parent_id(&self) -> Option<i32> {
        self.parent_id
    }

    fn has_parent(&self) -> bool {
        self.has_parent
    }

    fn serialize(&self, viewer: Option<&CommentViewer>) -> CommentView {
        CommentView {
            comment_info: CommentInfoView {
                id: self.comment_id,
                post_id: self.post_id,
                content: self.content.clone(),
                parent_id: self.parent_id,
                has_parent: self.has_parent,
                is_edited: self.is_edited,
                created_at: self.created_at,
                comment_karma: self.comment_karma,
            },
            user_info: PublicUser {
                id: self.user_id,
                username: self.username.clone(),
                avatar: self.user_avatar.clone(),
            },
            current_user: match viewer {
                Some(viewer) => CurrentUserView {
                    has_upvoted: viewer.votes.get(&self.comment_id).copied(),
                    is_comment_owner: viewer.user_id == self.user_id,
                },
                None => CurrentUserView::default(),
            },
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::comments::tree::build_tree;
    use chrono::TimeZone;

    fn comment_info(comment_id: i32, parent_id: Option<i32>, user_id: i32) -> CommentInfo {
        CommentInfo {
            comment_id,
            user_id,
            username: format!("user{user_id}"),
            user_avatar: None,
            post_id: 1,
            content: format!("Content for comment {comment_id}"),
            parent_id,
            has_parent: parent_id.is_some(),
            is_edited: false,
            created_at: Utc
                .with_ymd_and_hms(2024, 1, 1, 0, 0, comment_id as u32 % 60)
                .unwrap(),
            comment_karma: 0,
        }
    }

    #[test]
    fn anonymous_viewer_sees_no_votes() {
        let view = comment_info(1, None, 7).serialize(None);

        assert_eq!(view.current_user, CurrentUserView::default());
        assert_eq!(view.user_info.username, "user7");
    }

    #[test]
    fn viewer_votes_and_ownership() {
        let mut viewer = CommentViewer::new(7);
        viewer.votes.insert(2, false);

        let rows = vec![comment_info(1, None, 7), comment_info(2, Some(1), 8)];
        let tree = build_tree(&rows, Some(&viewer));

        let root = &tree[0].comment.current_user;
        assert_eq!(root.has_upvoted, None);
        assert!(root.is_comment_owner);

        let reply = &tree[0].children[0].comment.current_user;
        assert_eq!(reply.has_upvoted, Some(false));
        assert!(!reply.is_comment_owner);
    }

    #[test]
    fn json_shape_matches_client() {
        let rows = vec![comment_info(1, None, 7)];
        let tree = build_tree(&rows, None);
        let value = serde_json::to_value(&tree).unwrap();

        let node = &value[0];
        assert_eq!(node["comment"]["comment_info"]["id"], 1);
        assert_eq!(node["comment"]["comment_info"]["has_parent"], false);
        assert_eq!(node["comment"]["user_info"]["username"], "user7");
        assert!(node["comment"]["current_user"].get("has_upvoted").is_none());
        assert_eq!(node["children"], serde_json::json!([]));
    }
}
