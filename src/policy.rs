use crate::channel::ChannelId;
use crate::post::Post;
use crate::team::TeamId;
use crate::user::{CommentsNotify, UserId, UserNotifyProps};

use std::convert::TryFrom;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    EditPost,
    EditOthersPosts,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::EditPost => "edit_post",
            Permission::EditOthersPosts => "edit_others_posts",
        }
    }
}

/// Role evaluation done by the host, typically against the server's roles.
pub trait PermissionChecker {
    fn has_channel_permission(&self, team_id: &TeamId, channel_id: &ChannelId, permission: Permission) -> bool;
}

impl<F> PermissionChecker for F
where
    F: Fn(&TeamId, &ChannelId, Permission) -> bool,
{
    fn has_channel_permission(&self, team_id: &TeamId, channel_id: &ChannelId, permission: Permission) -> bool {
        self(team_id, channel_id, permission)
    }
}

/// `AllowEditPost` of servers without the permission system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowEditPost {
    Always,
    Never,
    TimeLimit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditPolicy {
    pub is_licensed: bool,
    /// Servers from 4.9 on evaluate edit rights through roles.
    pub has_permission_system: bool,
    pub allow_edit_post: AllowEditPost,
    /// Seconds after creation during which a post stays editable.
    pub post_edit_time_limit: Option<u64>,
}

impl Default for EditPolicy {
    fn default() -> Self {
        EditPolicy {
            is_licensed: false,
            has_permission_system: true,
            allow_edit_post: AllowEditPost::Always,
            post_edit_time_limit: None,
        }
    }
}

impl EditPolicy {
    /// Reads the server's `PostEditTimeLimit`, where -1 means unlimited.
    pub fn with_time_limit(mut self, post_edit_time_limit: i64) -> Self {
        self.post_edit_time_limit = if post_edit_time_limit > 0 {
            Some(post_edit_time_limit as u64)
        } else {
            None
        };
        self
    }

    fn within_time_limit(&self, post: &Post, now: i64) -> bool {
        let expires_at = self
            .post_edit_time_limit
            .and_then(|limit| i64::try_from(limit).ok())
            .and_then(|limit| limit.checked_mul(1000))
            .and_then(|limit| post.create_at.checked_add(limit));

        // Limits too large to represent never expire
        match expires_at {
            Some(expires_at) => expires_at > now,
            None => true,
        }
    }
}

/// Whether `user_id` may edit `post` at `now` (milliseconds since the epoch).
pub fn can_edit_post<P>(
    policy: &EditPolicy,
    permissions: &P,
    team_id: &TeamId,
    channel_id: &ChannelId,
    user_id: &UserId,
    post: Option<&Post>,
    now: i64,
) -> bool
where
    P: PermissionChecker + ?Sized,
{
    let post = match post {
        Some(post) if !post.is_system_message() => post,
        _ => return false,
    };
    let is_owner = post.user_id == *user_id;

    if policy.has_permission_system {
        let mut can_edit = permissions.has_channel_permission(team_id, channel_id, Permission::EditPost);
        if !is_owner {
            can_edit = can_edit
                && permissions.has_channel_permission(team_id, channel_id, Permission::EditOthersPosts);
        }
        if can_edit && policy.is_licensed {
            can_edit = policy.within_time_limit(post, now);
        }
        return can_edit;
    }

    if !is_owner {
        return false;
    }
    if !policy.is_licensed {
        return true;
    }
    match policy.allow_edit_post {
        AllowEditPost::Always => true,
        AllowEditPost::Never => false,
        AllowEditPost::TimeLimit => policy.within_time_limit(post, now),
    }
}

/// Whether a reply should notify the current user as a mention.
pub fn is_post_comment_mention(
    post: &Post,
    root_post: Option<&Post>,
    current_user_id: &UserId,
    notify_props: &UserNotifyProps,
    thread_replied_to_by_current_user: bool,
) -> bool {
    let root_post = match root_post {
        Some(root_post) => root_post,
        None => return false,
    };

    let own_post = post.user_id == *current_user_id && !post.is_from_webhook();
    if own_post {
        return false;
    }

    let thread_created_by_current_user = root_post.user_id == *current_user_id;
    match notify_props.comments {
        CommentsNotify::Any => thread_created_by_current_user || thread_replied_to_by_current_user,
        CommentsNotify::Root => thread_created_by_current_user,
        CommentsNotify::Never => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::post::{PostId, PostType};
    use serde_json::json;

    const NOW: i64 = 1_000_000_000;

    fn post(user_id: &str, type_: &str, create_at: i64) -> Post {
        Post {
            id: PostId::from("post_id"),
            user_id: UserId::from(user_id),
            type_: PostType::from(type_),
            create_at,
            ..Post::default()
        }
    }

    fn allowing(allowed: &'static [Permission]) -> impl Fn(&TeamId, &ChannelId, Permission) -> bool {
        move |_: &TeamId, _: &ChannelId, permission: Permission| allowed.contains(&permission)
    }

    fn can_edit<P: PermissionChecker>(policy: &EditPolicy, permissions: &P, user_id: &str, post: Option<&Post>) -> bool {
        can_edit_post(
            policy,
            permissions,
            &TeamId::from("team_id"),
            &ChannelId::from("channel_id"),
            &UserId::from(user_id),
            post,
            NOW,
        )
    }

    #[test]
    fn legacy_server_without_license() {
        let policy = EditPolicy {
            has_permission_system: false,
            ..EditPolicy::default()
        };
        let nobody = allowing(&[]);

        assert!(can_edit(&policy, &nobody, "user", Some(&post("user", "normal", NOW))));
        assert!(!can_edit(&policy, &nobody, "user", Some(&post("other", "normal", NOW))));
        assert!(!can_edit(&policy, &nobody, "user", Some(&post("user", "system_test", NOW))));
        assert!(!can_edit(&policy, &nobody, "user", None));
    }

    #[test]
    fn legacy_server_with_license() {
        let nobody = allowing(&[]);
        let own = post("user", "normal", NOW - 100_000);

        let never = EditPolicy {
            is_licensed: true,
            has_permission_system: false,
            allow_edit_post: AllowEditPost::Never,
            post_edit_time_limit: None,
        };
        assert!(!can_edit(&never, &nobody, "user", Some(&own)));

        let always = EditPolicy {
            allow_edit_post: AllowEditPost::Always,
            ..never.clone()
        };
        assert!(can_edit(&always, &nobody, "user", Some(&own)));
        assert!(!can_edit(&always, &nobody, "user", Some(&post("other", "normal", NOW))));

        let limited = EditPolicy {
            allow_edit_post: AllowEditPost::TimeLimit,
            ..never.clone()
        }
        .with_time_limit(300);
        assert!(can_edit(&limited, &nobody, "user", Some(&own)));
        assert!(!can_edit(&limited, &nobody, "user", Some(&post("user", "normal", NOW - 600_000))));
    }

    #[test]
    fn permission_system_without_license() {
        let policy = EditPolicy::default().with_time_limit(-1);
        let own = post("user", "normal", NOW);
        let others = post("other", "normal", NOW);

        let edit_post = allowing(&[Permission::EditPost]);
        assert!(can_edit(&policy, &edit_post, "user", Some(&own)));
        assert!(!can_edit(&policy, &edit_post, "user", Some(&others)));

        let edit_others_only = allowing(&[Permission::EditOthersPosts]);
        assert!(!can_edit(&policy, &edit_others_only, "user", Some(&own)));
        assert!(!can_edit(&policy, &edit_others_only, "user", Some(&others)));

        let both = allowing(&[Permission::EditPost, Permission::EditOthersPosts]);
        assert!(can_edit(&policy, &both, "user", Some(&own)));
        assert!(can_edit(&policy, &both, "user", Some(&others)));
        assert!(!can_edit(&policy, &both, "user", Some(&post("user", "system_test", NOW))));
    }

    #[test]
    fn permission_system_with_license_and_time_limit() {
        let policy = EditPolicy {
            is_licensed: true,
            ..EditPolicy::default()
        }
        .with_time_limit(300);
        let both = allowing(&[Permission::EditPost, Permission::EditOthersPosts]);

        assert!(can_edit(&policy, &both, "user", Some(&post("user", "normal", NOW - 100_000))));
        assert!(can_edit(&policy, &both, "user", Some(&post("other", "normal", NOW - 100_000))));
        assert!(!can_edit(&policy, &both, "user", Some(&post("user", "normal", NOW - 300_000))));

        let unlimited = policy.clone().with_time_limit(-1);
        assert!(can_edit(&unlimited, &both, "user", Some(&post("user", "normal", 0))));
    }

    #[test]
    fn huge_time_limit_never_expires() {
        let policy = EditPolicy {
            is_licensed: true,
            ..EditPolicy::default()
        }
        .with_time_limit(i64::MAX);
        let both = allowing(&[Permission::EditPost, Permission::EditOthersPosts]);

        assert!(can_edit(&policy, &both, "user", Some(&post("user", "normal", NOW))));
        assert!(can_edit(&policy, &both, "user", Some(&post("user", "normal", 0))));

        let legacy = EditPolicy {
            has_permission_system: false,
            allow_edit_post: AllowEditPost::TimeLimit,
            ..policy
        };
        assert!(can_edit(&legacy, &both, "user", Some(&post("user", "normal", NOW))));
    }

    fn notify(comments: CommentsNotify) -> UserNotifyProps {
        UserNotifyProps {
            comments,
            ..UserNotifyProps::default()
        }
    }

    #[test]
    fn comment_mentions() {
        let me = UserId::from("me");
        let my_root = post("me", "", 1);
        let their_root = post("other", "", 1);
        let reply = post("other", "", 2);

        assert!(!is_post_comment_mention(&reply, None, &me, &notify(CommentsNotify::Any), true));

        assert!(is_post_comment_mention(&reply, Some(&my_root), &me, &notify(CommentsNotify::Any), false));
        assert!(is_post_comment_mention(&reply, Some(&their_root), &me, &notify(CommentsNotify::Any), true));
        assert!(!is_post_comment_mention(&reply, Some(&their_root), &me, &notify(CommentsNotify::Any), false));

        assert!(is_post_comment_mention(&reply, Some(&my_root), &me, &notify(CommentsNotify::Root), false));
        assert!(!is_post_comment_mention(&reply, Some(&their_root), &me, &notify(CommentsNotify::Root), true));

        assert!(!is_post_comment_mention(&reply, Some(&my_root), &me, &notify(CommentsNotify::Never), true));
    }

    #[test]
    fn own_comments_only_mention_from_webhooks() {
        let me = UserId::from("me");
        let my_root = post("me", "", 1);
        let mut reply = post("me", "", 2);

        assert!(!is_post_comment_mention(&reply, Some(&my_root), &me, &notify(CommentsNotify::Any), true));

        reply.props.insert("from_webhook".to_string(), json!("true"));
        assert!(is_post_comment_mention(&reply, Some(&my_root), &me, &notify(CommentsNotify::Any), true));
    }
}
