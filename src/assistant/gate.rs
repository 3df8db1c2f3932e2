//! Channel-subscription check.

use tracing::{debug, warn};

use crate::assistant::platform::{MemberStatus, Platform};

impl MemberStatus {
    /// Only full members count. Restricted users are treated as not subscribed.
    pub fn is_subscribed(self) -> bool {
        matches!(
            self,
            MemberStatus::Member | MemberStatus::Administrator | MemberStatus::Creator
        )
    }
}

/// Is `user_id` currently subscribed to `channel_id`? Lookup failures count as "no".
pub async fn is_member(platform: &dyn Platform, channel_id: i64, user_id: i64) -> bool {
    match platform.member_status(channel_id, user_id).await {
        Ok(status) => {
            debug!("Membership of {} in {}: {:?}", user_id, channel_id, status);
            status.is_subscribed()
        }
        Err(e) => {
            warn!("Membership check for {} failed, treating as unsubscribed: {e}", user_id);
            false
        }
    }
}
