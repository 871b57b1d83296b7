use serde::{Deserialize, Serialize};

use crate::team;

id_type!(ChannelId);

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Channel {
    pub id: ChannelId,
    pub create_at: i64,
    pub update_at: i64,
    pub delete_at: i64,
    pub team_id: team::TeamId,
    #[serde(rename = "type")]
    pub type_: String,
    pub display_name: String,
    pub name: String,
    pub header: String,
    pub purpose: String,
    pub last_post_at: i64,
    pub total_msg_count: i64,
    // extra_update_at: integer <int64>
    // Deprecated in Mattermost 5.0 release
    pub creator_id: String,
}

impl Channel {
    /// Archived channels keep a non-zero `delete_at`.
    pub fn is_archived(&self) -> bool {
        self.delete_at != 0
    }
}
