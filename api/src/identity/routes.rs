use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::Serialize;

use crate::{
    App,
    error::AppError,
    identity::models::{
        role::Grants,
        user::{User, UserKarma},
    },
    schema::{subposts, user_info, users},
};

use super::AuthUser;

pub fn route() -> Router<App> {
    Router::<App>::new()
        .route("/me", get(handle_whoami))
        .route("/{username}", get(get_profile))
}

#[derive(Serialize)]
pub struct WhoamiResponse {
    id: i32,
    username: String,
    email: String,
    avatar: Option<String>,
    roles: Vec<String>,
    mod_in: Vec<String>,
}

async fn handle_whoami(
    State(ctx): State<App>,
    AuthUser(user): AuthUser,
) -> Result<Json<WhoamiResponse>, AppError> {
    let mut conn = ctx.diesel.get().await?;

    let grants = Grants::load(&mut conn, user.id).await?;

    let mod_in = subposts::table
        .filter(subposts::id.eq_any(grants.moderated_subposts()))
        .order(subposts::name)
        .select(subposts::name)
        .load::<String>(&mut conn)
        .await?;

    Ok(Json(WhoamiResponse {
        id: user.id,
        username: user.username,
        email: user.email,
        avatar: user.avatar,
        roles: grants.slugs(),
        mod_in,
    }))
}

#[derive(Serialize)]
pub struct ProfileResponse {
    username: String,
    avatar: Option<String>,
    bio: Option<String>,
    #[serde(rename = "registrationDate")]
    registration_date: DateTime<Utc>,
    karma: UserKarma,
}

async fn get_profile(
    State(ctx): State<App>,
    Path(username): Path<String>,
) -> Result<Json<ProfileResponse>, AppError> {
    let mut conn = ctx.diesel.get().await?;

    let user = users::table
        .filter(users::username.eq(&username))
        .select(User::as_select())
        .first::<User>(&mut conn)
        .await
        .optional()?
        .ok_or(("User not found", StatusCode::NOT_FOUND))?;

    let karma = user_info::table
        .filter(user_info::user_id.eq(user.id))
        .select(UserKarma::as_select())
        .first::<UserKarma>(&mut conn)
        .await
        .optional()?
        .unwrap_or_default();

    Ok(Json(ProfileResponse {
        username: user.username,
        avatar: user.avatar,
        bio: user.bio,
        registration_date: user.registration_date,
        karma,
    }))
}
