use teloxide::types::User;

use recruit_core::domain::UserId;

use crate::router::AppState;

/// New members of the clan chat: revoke the single-use invite they came through.
pub async fn handle_new_members(joined: &[User], state: &AppState) {
    for user in joined.iter().filter(|u| !u.is_bot) {
        let user_id = UserId(user.id.0 as i64);
        match state.services.invites.revoke_on_join(user_id).await {
            Ok(true) => tracing::debug!(user = user_id.0, "invite revoked after join"),
            Ok(false) => {}
            Err(e) => tracing::error!(user = user_id.0, error = %e, "failed to revoke invite"),
        }
    }
}
