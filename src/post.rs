use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::channel::ChannelId;
use crate::reactions::Reaction;
use crate::user::UserId;

use std::cmp::Ordering;
use std::collections::HashMap;

id_type!(PostId);
id_type!(FileId);

pub type PostTable = HashMap<PostId, Post>;

pub const EMBED_TYPE_OPENGRAPH: &str = "opengraph";

/// A page of posts as returned by the server.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct PostList {
    #[serde(default)]
    pub order: Vec<PostId>,
    #[serde(default)]
    pub posts: HashMap<PostId, Post>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Post {
    pub id: PostId,
    pub create_at: i64,
    pub update_at: i64,
    pub edit_at: i64,
    pub delete_at: i64,
    pub user_id: UserId,
    pub channel_id: ChannelId,
    #[serde(with = "empty_string_as_none")]
    pub root_id: Option<PostId>,
    #[serde(with = "empty_string_as_none")]
    pub original_id: Option<PostId>,
    #[serde(with = "empty_string_as_none")]
    pub pending_post_id: Option<PostId>,
    pub message: String,
    #[serde(rename = "type")]
    pub type_: PostType,
    pub props: Map<String, Value>,
    pub hashtags: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub file_ids: Vec<FileId>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub has_reactions: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub failed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<PostState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<PostMetadata>,
    /// Raw ids folded into a combined activity post, newest first.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub system_post_ids: Vec<PostId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub user_activity_posts: Vec<Post>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostState {
    #[serde(rename = "DELETED")]
    Deleted,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct PostMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emojis: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reactions: Option<Vec<Reaction>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embeds: Option<Vec<PostEmbed>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct PostEmbed {
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl PostEmbed {
    pub fn is_open_graph(&self) -> bool {
        self.type_ == EMBED_TYPE_OPENGRAPH
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(from = "String", into = "String")]
pub enum PostType {
    Normal,
    AddRemove,
    AddToChannel,
    AddToTeam,
    ChannelDeleted,
    CombinedUserActivity,
    ConvertChannel,
    DisplaynameChange,
    Ephemeral,
    EphemeralAddToChannel,
    HeaderChange,
    JoinChannel,
    JoinLeave,
    JoinTeam,
    LeaveChannel,
    LeaveTeam,
    PurposeChange,
    RemoveFromChannel,
    RemoveFromTeam,
    /// Plugin and integration types the client has no special handling for.
    Other(String),
}

const SYSTEM_MESSAGE_PREFIX: &str = "system_";

impl PostType {
    pub fn as_str(&self) -> &str {
        match self {
            PostType::Normal => "",
            PostType::AddRemove => "system_add_remove",
            PostType::AddToChannel => "system_add_to_channel",
            PostType::AddToTeam => "system_add_to_team",
            PostType::ChannelDeleted => "system_channel_deleted",
            PostType::CombinedUserActivity => "system_combined_user_activity",
            PostType::ConvertChannel => "system_convert_channel",
            PostType::DisplaynameChange => "system_displayname_change",
            PostType::Ephemeral => "system_ephemeral",
            PostType::EphemeralAddToChannel => "system_ephemeral_add_to_channel",
            PostType::HeaderChange => "system_header_change",
            PostType::JoinChannel => "system_join_channel",
            PostType::JoinLeave => "system_join_leave",
            PostType::JoinTeam => "system_join_team",
            PostType::LeaveChannel => "system_leave_channel",
            PostType::LeaveTeam => "system_leave_team",
            PostType::PurposeChange => "system_purpose_change",
            PostType::RemoveFromChannel => "system_remove_from_channel",
            PostType::RemoveFromTeam => "system_remove_from_team",
            PostType::Other(ref type_) => type_.as_str(),
        }
    }

    pub fn is_system(&self) -> bool {
        self.as_str().starts_with(SYSTEM_MESSAGE_PREFIX)
    }

    /// Membership changes that the combiner folds together.
    pub fn is_user_activity(&self) -> bool {
        match self {
            PostType::AddToChannel
            | PostType::AddToTeam
            | PostType::JoinChannel
            | PostType::JoinTeam
            | PostType::LeaveChannel
            | PostType::LeaveTeam
            | PostType::RemoveFromChannel
            | PostType::RemoveFromTeam => true,
            _ => false,
        }
    }

    pub fn is_join_leave(&self) -> bool {
        match self {
            PostType::JoinLeave
            | PostType::JoinChannel
            | PostType::LeaveChannel
            | PostType::AddRemove
            | PostType::AddToChannel
            | PostType::RemoveFromChannel
            | PostType::JoinTeam
            | PostType::LeaveTeam
            | PostType::AddToTeam
            | PostType::RemoveFromTeam
            | PostType::CombinedUserActivity => true,
            _ => false,
        }
    }

    /// Types where someone acts on another user, so activity is grouped per actor.
    pub fn has_actor(&self) -> bool {
        match self {
            PostType::AddToChannel | PostType::AddToTeam | PostType::RemoveFromChannel => true,
            _ => false,
        }
    }

    /// Display order of activity groups; lower sorts first.
    pub fn priority(&self) -> u8 {
        match self {
            PostType::JoinTeam => 0,
            PostType::AddToTeam => 1,
            PostType::LeaveTeam => 2,
            PostType::RemoveFromTeam => 3,
            PostType::JoinChannel => 4,
            PostType::AddToChannel => 5,
            PostType::LeaveChannel => 6,
            PostType::RemoveFromChannel => 7,
            PostType::PurposeChange => 8,
            PostType::HeaderChange => 9,
            PostType::JoinLeave => 10,
            PostType::DisplaynameChange => 11,
            PostType::ConvertChannel => 12,
            PostType::ChannelDeleted => 13,
            PostType::AddRemove => 14,
            PostType::Ephemeral => 15,
            _ => u8::MAX,
        }
    }
}

impl Default for PostType {
    fn default() -> Self {
        PostType::Normal
    }
}

impl From<String> for PostType {
    fn from(type_: String) -> Self {
        match type_.as_str() {
            "" => PostType::Normal,
            "system_add_remove" => PostType::AddRemove,
            "system_add_to_channel" => PostType::AddToChannel,
            "system_add_to_team" => PostType::AddToTeam,
            "system_channel_deleted" => PostType::ChannelDeleted,
            "system_combined_user_activity" => PostType::CombinedUserActivity,
            "system_convert_channel" => PostType::ConvertChannel,
            "system_displayname_change" => PostType::DisplaynameChange,
            "system_ephemeral" => PostType::Ephemeral,
            "system_ephemeral_add_to_channel" => PostType::EphemeralAddToChannel,
            "system_header_change" => PostType::HeaderChange,
            "system_join_channel" => PostType::JoinChannel,
            "system_join_leave" => PostType::JoinLeave,
            "system_join_team" => PostType::JoinTeam,
            "system_leave_channel" => PostType::LeaveChannel,
            "system_leave_team" => PostType::LeaveTeam,
            "system_purpose_change" => PostType::PurposeChange,
            "system_remove_from_channel" => PostType::RemoveFromChannel,
            "system_remove_from_team" => PostType::RemoveFromTeam,
            _ => PostType::Other(type_),
        }
    }
}

impl From<&str> for PostType {
    fn from(type_: &str) -> Self {
        PostType::from(type_.to_string())
    }
}

impl From<PostType> for String {
    fn from(type_: PostType) -> Self {
        match type_ {
            PostType::Other(type_) => type_,
            known => known.as_str().to_string(),
        }
    }
}

impl Post {
    pub fn is_system_message(&self) -> bool {
        self.type_.is_system()
    }

    pub fn is_combined(&self) -> bool {
        self.type_ == PostType::CombinedUserActivity
    }

    pub fn is_deleted(&self) -> bool {
        self.delete_at != 0 || self.state == Some(PostState::Deleted)
    }

    /// An optimistic post that is still sending or failed to send.
    pub fn is_pending_or_failed(&self) -> bool {
        match self.pending_post_id {
            Some(ref pending_id) => *pending_id == self.id || self.failed,
            None => false,
        }
    }

    /// String property, with empty strings treated as absent.
    pub fn prop_str(&self, key: &str) -> Option<&str> {
        self.props
            .get(key)
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
    }

    pub fn is_from_webhook(&self) -> bool {
        match self.props.get("from_webhook") {
            Some(Value::Bool(from_webhook)) => *from_webhook,
            Some(Value::String(from_webhook)) => from_webhook == "true",
            _ => false,
        }
    }

    pub fn reactions(&self) -> Option<&[Reaction]> {
        self.metadata
            .as_ref()
            .and_then(|metadata| metadata.reactions.as_ref())
            .map(Vec::as_slice)
    }

    pub fn embeds(&self) -> &[PostEmbed] {
        self.metadata
            .as_ref()
            .and_then(|metadata| metadata.embeds.as_ref())
            .map_or(&[][..], Vec::as_slice)
    }
}

/// Channel list order: pending and failed posts on top, then newest first.
pub fn compare_posts(a: &Post, b: &Post) -> Ordering {
    match (a.is_pending_or_failed(), b.is_pending_or_failed()) {
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        _ => {}
    }

    b.create_at
        .cmp(&a.create_at)
        .then_with(|| b.id.cmp(&a.id))
}

/// Whether a join/leave style post should be hidden from the current user.
pub fn should_filter_join_leave_post(
    post: &Post,
    show_join_leave: bool,
    current_username: Option<&str>,
) -> bool {
    if show_join_leave || !post.type_.is_join_leave() {
        return false;
    }

    if post.is_combined() && !post.user_activity_posts.is_empty() {
        return post
            .user_activity_posts
            .iter()
            .all(|activity| should_filter_join_leave_post(activity, false, current_username));
    }

    let current_username = match current_username {
        Some(username) if !username.is_empty() => username,
        _ => return true,
    };

    let mentions_current_user = ["username", "addedUsername", "removedUsername"]
        .iter()
        .any(|key| post.prop_str(key) == Some(current_username));

    !mentions_current_user
}

mod empty_string_as_none {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::PostId;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<PostId>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let id = Option::<String>::deserialize(deserializer)?;
        Ok(id.filter(|id| !id.is_empty()).map(PostId::from))
    }

    pub fn serialize<S>(id: &Option<PostId>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match id {
            Some(id) => serializer.serialize_str(id.as_str()),
            None => serializer.serialize_str(""),
        }
    }
}
