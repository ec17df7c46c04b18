use axum::{extract::FromRequestParts, http::request::Parts};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::{
    App,
    error::{ApiRequestError, AppError},
    schema::{sessions, users},
};

use self::models::{session::Session, user::User};

pub mod models;
pub mod routes;

pub const COOKIE_NAME: &str = "auth_token";

#[derive(thiserror::Error, Debug)]
pub enum AuthenticationError {
    #[error("Authentication required, but no cookie `{COOKIE_NAME}` found in headers.")]
    NoCookie,

    #[error(
        "Unauthorized, please check if you're logged in by refreshing the \
         page. This could be due to an expired session or token has became invalid."
    )]
    Unauthorized,
}

impl ApiRequestError for AuthenticationError {
    fn status_code(&self) -> axum::http::StatusCode {
        axum::http::StatusCode::UNAUTHORIZED
    }
}

/// The user behind the session cookie, if there is one.
pub struct MaybeAuthUser(pub Result<User, AuthenticationError>);

impl MaybeAuthUser {
    pub fn user(&self) -> Option<&User> {
        self.0.as_ref().ok()
    }
}

impl FromRequestParts<App> for MaybeAuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &App) -> Result<Self, Self::Rejection> {
        let jar = axum_extra::extract::cookie::CookieJar::from_headers(&parts.headers);

        let session_token = if let Some(t) = jar.get(COOKIE_NAME) {
            t.value().to_owned()
        } else {
            return Ok(MaybeAuthUser(Err(AuthenticationError::NoCookie)));
        };

        let mut conn = state.diesel.get().await?;

        let found = sessions::table
            .inner_join(users::table)
            .filter(sessions::token.eq(&session_token))
            .select((Session::as_select(), User::as_select()))
            .first::<(Session, User)>(&mut conn)
            .await
            .optional()?;

        let now = chrono::Utc::now().naive_utc();

        Ok(MaybeAuthUser(match found {
            Some((session, user)) if session.is_valid_at(now) => Ok(user),
            Some(_) => {
                tracing::debug!("Rejected inactive or expired session");
                Err(AuthenticationError::Unauthorized)
            }
            None => Err(AuthenticationError::Unauthorized),
        }))
    }
}

/// Like [`MaybeAuthUser`], but rejects the request when nobody is logged in.
pub struct AuthUser(pub User);

impl FromRequestParts<App> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &App) -> Result<Self, Self::Rejection> {
        let MaybeAuthUser(auth_user) = MaybeAuthUser::from_request_parts(parts, state).await?;

        Ok(AuthUser(auth_user?))
    }
}
