use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::Serialize;

use crate::schema::{roles, user_roles};

/// Row id of the `mod` role seeded by the migrations.
pub const MOD_ROLE_ID: i32 = 1;

pub const ADMIN_SLUG: &str = "admin";
pub const MOD_SLUG: &str = "mod";

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::user_roles)]
pub struct NewUserRole {
    pub user_id: i32,
    pub role_id: i32,
    pub subpost_id: Option<i32>,
}

impl NewUserRole {
    pub fn moderator(user_id: i32, subpost_id: i32) -> Self {
        NewUserRole {
            user_id,
            role_id: MOD_ROLE_ID,
            subpost_id: Some(subpost_id),
        }
    }
}

/// A role a user holds, optionally scoped to one subpost.
#[derive(Queryable, Debug, Clone, PartialEq, Serialize)]
pub struct Grant {
    pub slug: String,
    pub subpost_id: Option<i32>,
}

/// Every role held by a user.
#[derive(Debug, Clone, Default)]
pub struct Grants(pub Vec<Grant>);

impl Grants {
    pub async fn load(conn: &mut AsyncPgConnection, user_id: i32) -> QueryResult<Self> {
        let grants = user_roles::table
            .inner_join(roles::table)
            .filter(user_roles::user_id.eq(user_id))
            .select((roles::slug, user_roles::subpost_id))
            .load::<Grant>(conn)
            .await?;

        Ok(Grants(grants))
    }

    /// Admins are global, whatever subpost the grant row points at.
    pub fn is_admin(&self) -> bool {
        self.0.iter().any(|g| g.slug == ADMIN_SLUG)
    }

    pub fn is_mod_of(&self, subpost_id: i32) -> bool {
        self.0
            .iter()
            .any(|g| g.slug == MOD_SLUG && g.subpost_id == Some(subpost_id))
    }

    pub fn can_moderate(&self, subpost_id: i32) -> bool {
        self.is_admin() || self.is_mod_of(subpost_id)
    }

    /// Ids of the subposts this user moderates.
    pub fn moderated_subposts(&self) -> Vec<i32> {
        let mut ids: Vec<i32> = self
            .0
            .iter()
            .filter(|g| g.slug == MOD_SLUG)
            .filter_map(|g| g.subpost_id)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    pub fn slugs(&self) -> Vec<String> {
        let mut slugs: Vec<String> = self.0.iter().map(|g| g.slug.clone()).collect();
        slugs.sort_unstable();
        slugs.dedup();
        slugs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grant(slug: &str, subpost_id: Option<i32>) -> Grant {
        Grant {
            slug: slug.into(),
            subpost_id,
        }
    }

    #[test]
    fn mods_are_scoped_to_their_subpost() {
        let grants = Grants(vec![grant(MOD_SLUG, Some(3))]);

        assert!(grants.can_moderate(3));
        assert!(!grants.can_moderate(4));
        assert!(!grants.is_admin());
    }

    #[test]
    fn admins_moderate_everything() {
        let grants = Grants(vec![grant(ADMIN_SLUG, None)]);

        assert!(grants.can_moderate(3));
        assert!(grants.can_moderate(42));
        assert!(!grants.is_mod_of(3));
    }

    #[test]
    fn no_grants_no_rights() {
        let grants = Grants::default();
        assert!(!grants.can_moderate(1));
        assert!(grants.moderated_subposts().is_empty());
    }

    #[test]
    fn summaries_are_deduplicated() {
        let grants = Grants(vec![
            grant(MOD_SLUG, Some(5)),
            grant(MOD_SLUG, Some(2)),
            grant(MOD_SLUG, Some(5)),
            grant(ADMIN_SLUG, None),
        ]);

        assert_eq!(grants.moderated_subposts(), vec![2, 5]);
        assert_eq!(grants.slugs(), vec!["admin".to_string(), "mod".to_string()]);
    }
}
