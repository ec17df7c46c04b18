use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::schema::{subscriptions, user_roles, users};

use crate::identity::models::role::MOD_ROLE_ID;

/// Stored subpost names carry this prefix, URLs don't.
pub const NAME_PREFIX: &str = "t/";

static NAME_REGEX: OnceLock<Regex> = OnceLock::new();

pub fn is_valid_name(name: &str) -> bool {
    NAME_REGEX
        .get_or_init(|| Regex::new(r"^\w{3,}$").expect("subpost name regex is valid"))
        .is_match(name)
}

pub fn stored_name(name: &str) -> String {
    format!("{NAME_PREFIX}{name}")
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = crate::schema::subposts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Subpost {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub logo: Option<String>,
    pub created_by: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::subposts)]
pub struct NewSubpost {
    pub name: String,
    pub description: Option<String>,
    pub logo: Option<String>,
    pub created_by: i32,
}

/// Fields a moderator may change. Missing fields are left untouched.
#[derive(AsChangeset, Deserialize, Debug, Default)]
#[diesel(table_name = crate::schema::subposts)]
pub struct SubpostPatch {
    pub description: Option<String>,
    pub logo: Option<String>,
}

impl SubpostPatch {
    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.logo.is_none()
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::subscriptions)]
pub struct NewSubscription {
    pub user_id: i32,
    pub subpost_id: i32,
}

// One row of the `subpost_info` view
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::subpost_info)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SubpostInfo {
    pub id: i32,
    pub name: String,
    pub logo: Option<String>,
    pub members_count: Option<i64>,
    pub posts_count: Option<i64>,
    pub comments_count: Option<i64>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SubpostCounts {
    #[serde(rename = "subscriberCount")]
    pub subscriber_count: i64,
    #[serde(rename = "PostsCount")]
    pub posts_count: i64,
    #[serde(rename = "CommentsCount")]
    pub comments_count: i64,
}

#[derive(Serialize, Debug, Clone)]
pub struct SubpostSummary {
    pub id: i32,
    pub name: String,
    pub logo: Option<String>,
    #[serde(flatten)]
    pub counts: SubpostCounts,
}

impl SubpostInfo {
    pub fn counts(&self) -> SubpostCounts {
        SubpostCounts {
            subscriber_count: self.members_count.unwrap_or(0),
            posts_count: self.posts_count.unwrap_or(0),
            comments_count: self.comments_count.unwrap_or(0),
        }
    }
}

impl From<SubpostInfo> for SubpostSummary {
    fn from(info: SubpostInfo) -> Self {
        SubpostSummary {
            counts: info.counts(),
            id: info.id,
            name: info.name,
            logo: info.logo,
        }
    }
}

/// A subpost as seen by one (possibly anonymous) user.
#[derive(Serialize, Debug, Clone)]
pub struct SubpostView {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub logo: Option<String>,
    pub created_at: DateTime<Utc>,
    pub created_by: i32,
    pub has_subscribed: bool,
    #[serde(rename = "modList")]
    pub mod_list: Vec<String>,
}

impl Subpost {
    pub async fn view(
        self,
        conn: &mut AsyncPgConnection,
        viewer: Option<i32>,
    ) -> QueryResult<SubpostView> {
        let has_subscribed = match viewer {
            Some(user_id) => diesel::select(diesel::dsl::exists(
                subscriptions::table
                    .filter(subscriptions::user_id.eq(user_id))
                    .filter(subscriptions::subpost_id.eq(self.id)),
            ))
            .get_result::<bool>(conn)
            .await?,
            None => false,
        };

        let mod_list = user_roles::table
            .inner_join(users::table)
            .filter(user_roles::subpost_id.eq(self.id))
            .filter(user_roles::role_id.eq(MOD_ROLE_ID))
            .order(users::username)
            .select(users::username)
            .distinct()
            .load::<String>(conn)
            .await?;

        Ok(SubpostView {
            id: self.id,
            name: self.name,
            description: self.description,
            logo: self.logo,
            created_at: self.created_at,
            created_by: self.created_by,
            has_subscribed,
            mod_list,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names() {
        assert!(is_valid_name("rust"));
        assert!(is_valid_name("abc_123"));
        assert!(!is_valid_name("ab"));
        assert!(!is_valid_name("has space"));
        assert!(!is_valid_name("t/rust"));
        assert!(!is_valid_name(""));
    }

    #[test]
    fn stored_names_are_prefixed() {
        assert_eq!(stored_name("rust"), "t/rust");
    }

    #[test]
    fn missing_counts_are_zero() {
        let info = SubpostInfo {
            id: 1,
            name: "t/rust".into(),
            logo: None,
            members_count: Some(3),
            posts_count: None,
            comments_count: None,
        };

        let value = serde_json::to_value(SubpostSummary::from(info)).unwrap();
        assert_eq!(value["subscriberCount"], 3);
        assert_eq!(value["PostsCount"], 0);
        assert_eq!(value["CommentsCount"], 0);
        assert_eq!(value["name"], "t/rust");
    }

    #[test]
    fn empty_patch() {
        assert!(SubpostPatch::default().is_empty());
        let patch: SubpostPatch = serde_json::from_str(r#"{"description": "hi"}"#).unwrap();
        assert!(!patch.is_empty());
    }
}
