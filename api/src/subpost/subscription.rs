use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde_json::{Value, json};

use crate::{
    App,
    error::AppError,
    identity::AuthUser,
    schema::{subposts, subscriptions},
};

use super::models::NewSubscription;

pub async fn subscribe(
    State(ctx): State<App>,
    Path(subpost_id): Path<i32>,
    AuthUser(user): AuthUser,
) -> Result<Json<Value>, AppError> {
    let mut conn = ctx.diesel.get().await?;

    let exists = subposts::table
        .find(subpost_id)
        .select(subposts::id)
        .first::<i32>(&mut conn)
        .await
        .optional()?;

    if exists.is_none() {
        return Err(("Invalid Post", StatusCode::BAD_REQUEST))?;
    }

    // subscribing twice is not an error
    diesel::insert_into(subscriptions::table)
        .values(&NewSubscription {
            user_id: user.id,
            subpost_id,
        })
        .on_conflict_do_nothing()
        .execute(&mut conn)
        .await?;

    Ok(Json(json!({ "message": "Subscribed" })))
}

pub async fn unsubscribe(
    State(ctx): State<App>,
    Path(subpost_id): Path<i32>,
    AuthUser(user): AuthUser,
) -> Result<Json<Value>, AppError> {
    let mut conn = ctx.diesel.get().await?;

    let removed = diesel::delete(
        subscriptions::table
            .filter(subscriptions::user_id.eq(user.id))
            .filter(subscriptions::subpost_id.eq(subpost_id)),
    )
    .execute(&mut conn)
    .await?;

    if removed == 0 {
        return Err(("Invalid Subscription", StatusCode::BAD_REQUEST))?;
    }

    Ok(Json(json!({ "message": "UnSubscribed" })))
}
