use diesel::prelude::*;

// Sessions are issued by the login flow; this service only reads them.
#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = crate::schema::sessions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Session {
    pub active: bool,
    pub issued_at: chrono::NaiveDateTime,
    pub expires_at: chrono::NaiveDateTime,
}

impl Session {
    pub fn is_valid_at(&self, now: chrono::NaiveDateTime) -> bool {
        self.active && self.issued_at <= now && now < self.expires_at
    }
}
