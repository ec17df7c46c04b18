use axum::{
    Router,
    routing::{delete, get, patch, post},
};

use crate::App;

use super::{
    create::create_comment,
    delete::delete_comment,
    get::get_comments,
    patch::patch_comment,
    vote::{remove_vote, vote_comment},
};

pub fn route() -> Router<App> {
    Router::<App>::new()
        .route("/posts/{post_id}/comments", get(get_comments))
        .route("/comments", post(create_comment))
        .route(
            "/comments/{id}",
            patch(patch_comment).delete(delete_comment),
        )
        .route("/reactions/comment", post(vote_comment))
        .route("/reactions/comment/{comment_id}", delete(remove_vote))
}
