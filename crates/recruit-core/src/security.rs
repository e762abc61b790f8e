use crate::domain::UserId;

/// Admin gate for review commands.
pub fn is_admin(user_id: Option<UserId>, admin_ids: &[i64]) -> bool {
    let Some(user_id) = user_id else {
        return false;
    };
    admin_ids.contains(&user_id.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_listed_users_are_admins() {
        assert!(is_admin(Some(UserId(5)), &[1, 5]));
        assert!(!is_admin(Some(UserId(6)), &[1, 5]));
        assert!(!is_admin(None, &[1, 5]));
        assert!(!is_admin(Some(UserId(1)), &[]));
    }
}
