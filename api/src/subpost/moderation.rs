use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde_json::{Value, json};

use crate::{
    App,
    error::AppError,
    identity::{
        AuthUser,
        models::{
            role::{Grants, MOD_ROLE_ID, NewUserRole},
            user::User,
        },
    },
    schema::{subposts, user_roles, users},
};

/// Fails with 403 unless `user` is an admin or moderates `subpost_id`.
pub async fn require_moderator(
    conn: &mut AsyncPgConnection,
    user: &User,
    subpost_id: i32,
) -> Result<Grants, AppError> {
    let grants = Grants::load(conn, user.id).await?;

    if !grants.can_moderate(subpost_id) {
        tracing::debug!(user_id = user.id, subpost_id, "Moderation denied");
        return Err(("You don't have permission to do that", StatusCode::FORBIDDEN))?;
    }

    Ok(grants)
}

async fn find_user_id(conn: &mut AsyncPgConnection, username: &str) -> Result<i32, AppError> {
    users::table
        .filter(users::username.eq(username))
        .select(users::id)
        .first::<i32>(conn)
        .await
        .optional()?
        .ok_or(("Invalid User", StatusCode::BAD_REQUEST).into())
}

pub async fn add_moderator(
    conn: &mut AsyncPgConnection,
    user_id: i32,
    subpost_id: i32,
) -> Result<(), AppError> {
    let already_mod = diesel::select(diesel::dsl::exists(
        user_roles::table
            .filter(user_roles::user_id.eq(user_id))
            .filter(user_roles::subpost_id.eq(subpost_id))
            .filter(user_roles::role_id.eq(MOD_ROLE_ID)),
    ))
    .get_result::<bool>(conn)
    .await?;

    if already_mod {
        return Err(("Mod already exists", StatusCode::BAD_REQUEST))?;
    }

    diesel::insert_into(user_roles::table)
        .values(&NewUserRole::moderator(user_id, subpost_id))
        .execute(conn)
        .await?;

    Ok(())
}

pub async fn new_mod(
    State(ctx): State<App>,
    Path((subpost_id, username)): Path<(i32, String)>,
    AuthUser(user): AuthUser,
) -> Result<Json<Value>, AppError> {
    let mut conn = ctx.diesel.get().await?;

    require_moderator(&mut conn, &user, subpost_id).await?;

    let target = find_user_id(&mut conn, &username).await?;
    add_moderator(&mut conn, target, subpost_id).await?;

    tracing::info!(subpost_id, target, by = user.id, "Moderator added");

    Ok(Json(json!({ "message": "Moderator added" })))
}

/// Whether `remover` may strip the subpost creator of their roles.
fn may_remove(creator: i32, target: i32, remover: &Grants) -> bool {
    creator != target || remover.is_admin()
}

pub async fn delete_mod(
    State(ctx): State<App>,
    Path((subpost_id, username)): Path<(i32, String)>,
    AuthUser(user): AuthUser,
) -> Result<Json<Value>, AppError> {
    let mut conn = ctx.diesel.get().await?;

    let grants = require_moderator(&mut conn, &user, subpost_id).await?;

    let target = find_user_id(&mut conn, &username).await?;

    let creator = subposts::table
        .find(subpost_id)
        .select(subposts::created_by)
        .first::<i32>(&mut conn)
        .await
        .optional()?
        .ok_or(("Invalid User", StatusCode::BAD_REQUEST))?;

    if !may_remove(creator, target, &grants) {
        return Err(("Cannot Remove Post Creator", StatusCode::BAD_REQUEST))?;
    }

    diesel::delete(
        user_roles::table
            .filter(user_roles::user_id.eq(target))
            .filter(user_roles::subpost_id.eq(subpost_id)),
    )
    .execute(&mut conn)
    .await?;

    tracing::info!(subpost_id, target, by = user.id, "Moderator removed");

    Ok(Json(json!({ "message": "Moderator deleted" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::models::role::{ADMIN_SLUG, Grant, MOD_SLUG};

    #[test]
    fn creator_is_protected_from_mods() {
        let mods = Grants(vec![Grant {
            slug: MOD_SLUG.into(),
            subpost_id: Some(1),
        }]);

        assert!(!may_remove(10, 10, &mods));
        assert!(may_remove(10, 11, &mods));
    }

    #[test]
    fn admins_can_remove_the_creator() {
        let admin = Grants(vec![Grant {
            slug: ADMIN_SLUG.into(),
            subpost_id: None,
        }]);

        assert!(may_remove(10, 10, &admin));
    }
}
