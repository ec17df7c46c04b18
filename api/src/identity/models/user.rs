use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;

#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub avatar: Option<String>,
    pub bio: Option<String>,
    pub registration_date: DateTime<Utc>,
}

/// What other users get to see about someone.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct PublicUser {
    pub id: i32,
    pub username: String,
    pub avatar: Option<String>,
}

// Users without posts or comments have no `user_info` row yet
#[derive(Queryable, Selectable, Debug, Clone, Default, Serialize)]
#[diesel(table_name = crate::schema::user_info)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserKarma {
    pub user_karma: i64,
    pub posts_count: i64,
    pub posts_karma: i64,
    pub comments_count: i64,
    pub comments_karma: i64,
}
