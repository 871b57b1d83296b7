use serde_json::Value;

use crate::channel::{Channel, ChannelId};
use crate::history::HistoryKind;
use crate::post::{Post, PostId, PostList};
use crate::reactions::Reaction;

/// Every update the post store understands.
#[derive(Debug, Clone, PartialEq)]
pub enum PostEvent {
    /// Full replacement of a single post.
    ReceivedPost(Post),
    /// A post created locally or pushed by the server.
    ReceivedNewPost(Post),
    ReceivedPosts {
        channel_id: Option<ChannelId>,
        posts: PostList,
        skip_add_to_channel: bool,
    },
    ReceivedEditPost(Post),
    PostDeleted(Post),
    RemovePost(Post),
    RemovePendingPost {
        id: PostId,
        channel_id: Option<ChannelId>,
    },
    CreatePostFailure {
        pending_post_id: PostId,
    },
    ReceivedFocusedPost(Option<PostId>),
    ReceivedPostSelected(Option<PostId>),
    ReceivedReaction(Reaction),
    ReceivedReactions {
        post_id: PostId,
        reactions: Vec<Reaction>,
    },
    ReactionDeleted(Reaction),
    ReceivedOpenGraphMetadata {
        url: String,
        data: Value,
    },
    AddMessageIntoHistory(String),
    ResetHistoryIndex(HistoryKind),
    MoveHistoryIndexBack(HistoryKind),
    MoveHistoryIndexForward(HistoryKind),
    ClearChannelPosts {
        channel_id: ChannelId,
    },
    AddChannelPostIds {
        channel_id: ChannelId,
        post_ids: Vec<PostId>,
    },
    BackupChannelPostIds {
        channel_id: ChannelId,
    },
    RestoreChannelPostIds {
        channel_id: ChannelId,
    },
    ChannelDeleted {
        channel_id: ChannelId,
        view_archived_channels: bool,
    },
    LogoutSuccess,
}

impl PostEvent {
    pub fn channel_deleted(channel: &Channel, view_archived_channels: bool) -> PostEvent {
        PostEvent::ChannelDeleted {
            channel_id: channel.id.clone(),
            view_archived_channels,
        }
    }
}
