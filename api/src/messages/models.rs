use std::collections::HashSet;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;

#[derive(Queryable, Selectable, Debug, Clone, Serialize)]
#[diesel(table_name = crate::schema::messages)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Message {
    pub id: i32,
    pub sender_id: i32,
    pub receiver_id: i32,
    pub content: String,
    pub seen: bool,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// The other side of the conversation, as seen by `user_id`.
    pub fn partner_of(&self, user_id: i32) -> i32 {
        if self.sender_id == user_id {
            self.receiver_id
        } else {
            self.sender_id
        }
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::messages)]
pub struct NewMessage {
    pub sender_id: i32,
    pub receiver_id: i32,
    pub content: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Correspondent {
    pub username: String,
    pub avatar: Option<String>,
}

#[derive(Serialize, Debug)]
pub struct InboxEntry {
    pub message_id: i32,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub sender: Correspondent,
    pub receiver: Correspondent,
    pub latest_from_user: bool,
    pub seen: bool,
}

/// Keeps the newest message of each conversation `user_id` takes part in.
///
/// `messages` must already be sorted newest first, the output keeps that
/// order.
pub fn latest_per_partner(messages: Vec<Message>, user_id: i32) -> Vec<Message> {
    let mut seen_partners = HashSet::new();

    messages
        .into_iter()
        .filter(|m| seen_partners.insert(m.partner_of(user_id)))
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::TimeZone;

    fn message(id: i32, sender_id: i32, receiver_id: i32) -> Message {
        Message {
            id,
            sender_id,
            receiver_id,
            content: format!("message {id}"),
            seen: false,
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, id as u32).unwrap(),
        }
    }

    #[test]
    fn partner_is_the_other_side() {
        let m = message(1, 3, 9);
        assert_eq!(m.partner_of(3), 9);
        assert_eq!(m.partner_of(9), 3);
    }

    #[test]
    fn one_entry_per_partner() {
        // newest first
        let rows = vec![
            message(6, 2, 1),
            message(5, 1, 3),
            message(4, 1, 2),
            message(3, 3, 1),
            message(2, 4, 1),
            message(1, 1, 2),
        ];

        let latest: Vec<i32> = latest_per_partner(rows, 1).iter().map(|m| m.id).collect();
        assert_eq!(latest, vec![6, 5, 2]);
    }

    #[test]
    fn empty_inbox() {
        assert!(latest_per_partner(vec![], 1).is_empty());
    }
}
