use serde::{Deserialize, Serialize};

use super::UserId;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: Option<String>,
    pub is_banned: bool,
}

/// Profile data captured from Telegram on first contact.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewUser {
    pub id: UserId,
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: Option<String>,
}

impl User {
    pub fn register(new: NewUser) -> Self {
        Self {
            id: new.id,
            username: new.username,
            first_name: new.first_name,
            last_name: new.last_name,
            is_banned: false,
        }
    }

    /// Copy changed profile fields from `new`. Returns whether anything changed.
    pub fn refresh_profile(&mut self, new: &NewUser) -> bool {
        let changed = self.username != new.username
            || self.first_name != new.first_name
            || self.last_name != new.last_name;
        if changed {
            self.username = new.username.clone();
            self.first_name = new.first_name.clone();
            self.last_name = new.last_name.clone();
        }
        changed
    }
}
