use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post, put},
};
use diesel::{
    prelude::*,
    result::{DatabaseErrorKind, Error as DieselError},
};
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{
    App,
    error::AppError,
    identity::{AuthUser, MaybeAuthUser},
    schema::{subpost_info, subposts, subscriptions},
    utils::Pagination,
};

use super::{
    models::{
        NewSubpost, Subpost, SubpostCounts, SubpostInfo, SubpostPatch, SubpostSummary,
        SubpostView, is_valid_name, stored_name,
    },
    moderation::{add_moderator, delete_mod, new_mod, require_moderator},
    subscription::{subscribe, unsubscribe},
};

pub fn route() -> Router<App> {
    Router::<App>::new()
        .route("/subposts", get(get_subposts))
        .route("/subposts/search", get(search_subposts))
        .route("/subposts/get/all", get(get_all_subposts))
        .route("/subposts/{name}", get(get_subpost_by_name))
        .route(
            "/subposts/subscription/{id}",
            post(subscribe).delete(unsubscribe),
        )
        .route("/subpost", post(create_subpost))
        .route("/subpost/{id}", patch(update_subpost))
        .route("/subpost/mod/{id}/{username}", put(new_mod).delete(delete_mod))
}

#[derive(Serialize)]
pub struct SubpostListing {
    subscribed: Vec<SubpostView>,
    all: Vec<SubpostSummary>,
    popular: Vec<SubpostSummary>,
}

async fn get_subposts(
    State(ctx): State<App>,
    Query(page): Query<Pagination>,
    auth_user: MaybeAuthUser,
) -> Result<Json<SubpostListing>, AppError> {
    let page = page.clamped();
    let mut conn = ctx.diesel.get().await?;

    let mut subscribed = vec![];
    if let Some(user) = auth_user.user() {
        let rows = subscriptions::table
            .inner_join(subposts::table)
            .filter(subscriptions::user_id.eq(user.id))
            .order(subscriptions::created_at.desc())
            .select(Subpost::as_select())
            .limit(page.limit)
            .offset(page.offset)
            .load::<Subpost>(&mut conn)
            .await?;

        for subpost in rows {
            subscribed.push(subpost.view(&mut conn, Some(user.id)).await?);
        }
    }

    let all = subpost_info::table
        .filter(subpost_info::members_count.is_not_null())
        .order((subpost_info::members_count.desc(), subpost_info::id.asc()))
        .select(SubpostInfo::as_select())
        .limit(page.limit)
        .offset(page.offset)
        .load::<SubpostInfo>(&mut conn)
        .await?;

    let popular = subpost_info::table
        .filter(subpost_info::posts_count.is_not_null())
        .order((subpost_info::posts_count.desc(), subpost_info::id.asc()))
        .select(SubpostInfo::as_select())
        .limit(page.limit)
        .offset(page.offset)
        .load::<SubpostInfo>(&mut conn)
        .await?;

    Ok(Json(SubpostListing {
        subscribed,
        all: all.into_iter().map(SubpostSummary::from).collect(),
        popular: popular.into_iter().map(SubpostSummary::from).collect(),
    }))
}

#[derive(Deserialize)]
struct SearchQuery {
    #[serde(default)]
    name: String,
}

// `%` and `_` in user input are matched literally
fn like_pattern(name: &str) -> String {
    let mut escaped = String::with_capacity(name.len() + 2);
    escaped.push('%');
    for c in name.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

async fn search_subposts(
    State(ctx): State<App>,
    Query(q): Query<SearchQuery>,
) -> Result<Json<Vec<SubpostSummary>>, AppError> {
    let mut conn = ctx.diesel.get().await?;

    let found = subpost_info::table
        .filter(subpost_info::name.ilike(like_pattern(q.name.trim())))
        .order(subpost_info::name)
        .select(SubpostInfo::as_select())
        .load::<SubpostInfo>(&mut conn)
        .await?;

    Ok(Json(found.into_iter().map(SubpostSummary::from).collect()))
}

#[derive(Serialize)]
struct SubpostBasic {
    id: i32,
    name: String,
    logo: Option<String>,
    description: Option<String>,
}

async fn get_all_subposts(State(ctx): State<App>) -> Result<Json<Vec<SubpostBasic>>, AppError> {
    let mut conn = ctx.diesel.get().await?;

    let all = subposts::table
        .order(subposts::name)
        .select(Subpost::as_select())
        .load::<Subpost>(&mut conn)
        .await?;

    Ok(Json(
        all.into_iter()
            .map(|s| SubpostBasic {
                id: s.id,
                name: s.name,
                logo: s.logo,
                description: s.description,
            })
            .collect(),
    ))
}

#[derive(Serialize)]
pub struct PostData {
    #[serde(flatten)]
    subpost: SubpostView,
    #[serde(flatten)]
    counts: SubpostCounts,
}

#[derive(Serialize)]
pub struct PostDataResponse {
    #[serde(rename = "postData")]
    post_data: PostData,
}

async fn post_data(
    conn: &mut AsyncPgConnection,
    subpost: Subpost,
    viewer: Option<i32>,
) -> Result<PostData, AppError> {
    let counts = subpost_info::table
        .find(subpost.id)
        .select(SubpostInfo::as_select())
        .first::<SubpostInfo>(conn)
        .await
        .optional()?
        .ok_or(("Post not found", StatusCode::NOT_FOUND))?
        .counts();

    Ok(PostData {
        subpost: subpost.view(conn, viewer).await?,
        counts,
    })
}

async fn get_subpost_by_name(
    State(ctx): State<App>,
    Path(name): Path<String>,
    auth_user: MaybeAuthUser,
) -> Result<Json<PostDataResponse>, AppError> {
    let mut conn = ctx.diesel.get().await?;

    let subpost = subposts::table
        .filter(subposts::name.eq(stored_name(&name)))
        .select(Subpost::as_select())
        .first::<Subpost>(&mut conn)
        .await
        .optional()?
        .ok_or(("Post not found", StatusCode::NOT_FOUND))?;

    let viewer = auth_user.user().map(|u| u.id);

    Ok(Json(PostDataResponse {
        post_data: post_data(&mut conn, subpost, viewer).await?,
    }))
}

#[derive(Deserialize, Debug)]
pub struct SubpostSubmission {
    name: String,
    description: Option<String>,
    logo: Option<String>,
}

impl SubpostSubmission {
    fn validate(self, created_by: i32) -> Result<NewSubpost, &'static str> {
        let name = self.name.trim();
        if !is_valid_name(name) {
            return Err("Post name is required");
        }

        Ok(NewSubpost {
            name: stored_name(name),
            description: self
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            logo: self.logo.filter(|l| !l.trim().is_empty()),
            created_by,
        })
    }
}

async fn create_subpost(
    State(ctx): State<App>,
    AuthUser(user): AuthUser,
    crate::json::Json(submission): crate::json::Json<SubpostSubmission>,
) -> Result<Json<Value>, AppError> {
    let new_subpost = submission
        .validate(user.id)
        .map_err(|e| (e, StatusCode::BAD_REQUEST))?;

    let mut conn = ctx.diesel.get().await?;

    let taken = diesel::select(diesel::dsl::exists(
        subposts::table.filter(subposts::name.eq(&new_subpost.name)),
    ))
    .get_result::<bool>(&mut conn)
    .await?;

    if taken {
        return Err(("Post already exists", StatusCode::CONFLICT))?;
    }

    let user_id = user.id;
    let subpost_id = conn
        .transaction(|conn| {
            Box::pin(async move {
                let subpost_id = diesel::insert_into(subposts::table)
                    .values(&new_subpost)
                    .returning(subposts::id)
                    .get_result::<i32>(conn)
                    .await
                    .map_err(name_taken_as_conflict)?;

                // the creator moderates what they created
                add_moderator(conn, user_id, subpost_id).await?;

                Ok::<_, AppError>(subpost_id)
            })
        })
        .await?;

    tracing::info!(subpost_id, user_id, "Subpost created");

    Ok(Json(json!({ "message": "Post has been created" })))
}

// Another request may claim the name between the check and the insert
fn name_taken_as_conflict(e: DieselError) -> AppError {
    match e {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            ("Post already exists", StatusCode::CONFLICT).into()
        }
        e => e.into(),
    }
}

async fn update_subpost(
    State(ctx): State<App>,
    Path(id): Path<i32>,
    AuthUser(user): AuthUser,
    crate::json::Json(patch): crate::json::Json<SubpostPatch>,
) -> Result<Json<Value>, AppError> {
    let mut conn = ctx.diesel.get().await?;

    require_moderator(&mut conn, &user, id).await?;

    let exists = subposts::table
        .find(id)
        .select(subposts::id)
        .first::<i32>(&mut conn)
        .await
        .optional()?;

    if exists.is_none() {
        return Err(("Invalid Post", StatusCode::BAD_REQUEST))?;
    }

    if !patch.is_empty() {
        diesel::update(subposts::table.find(id))
            .set(&patch)
            .execute(&mut conn)
            .await?;
    }

    let subpost = subposts::table
        .find(id)
        .select(Subpost::as_select())
        .first::<Subpost>(&mut conn)
        .await?;

    let post_data = post_data(&mut conn, subpost, Some(user.id)).await?;

    Ok(Json(json!({
        "message": "Post updated",
        "new_data": { "postData": post_data },
    })))
}
