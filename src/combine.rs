//! Folding runs of membership system messages into combined activity posts.

use log::trace;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::channel::ChannelId;
use crate::post::{Post, PostId, PostTable, PostType};
use crate::user::UserId;

use std::collections::HashSet;
use std::hash::Hash;

/// Upper bound on raw posts folded into one combined post.
pub const MAX_COMBINED_SYSTEM_POSTS: usize = 100;

const COMBINED_POST_ID_PREFIX: &str = "user-activity-";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CombinedPosts {
    /// The channel's ids with each run replaced by its combined post id.
    pub posts_for_channel: Vec<PostId>,
    /// The input table plus every combined post referenced above.
    pub next_posts: PostTable,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserActivity {
    pub all_user_ids: Vec<UserId>,
    pub all_usernames: Vec<String>,
    pub message_data: Vec<ActivityGroup>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityGroup {
    pub post_type: PostType,
    /// Affected users; legacy posts only know usernames, which come first.
    pub user_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<UserId>,
}

#[derive(Debug, Error, PartialEq)]
pub enum OrderError {
    #[error("post {0} is not in the post table")]
    MissingPost(PostId),
    #[error("post {newer} is listed after older post {older}")]
    Unsorted { older: PostId, newer: PostId },
}

/// Id of a combined post synthesized from a run whose newest post is `newest`.
pub fn combined_post_id(newest: &PostId) -> PostId {
    PostId::from(format!("{}{}", COMBINED_POST_ID_PREFIX, newest))
}

/// Checks that every id resolves and that `create_at` never increases.
pub fn validate_post_order(post_ids: &[PostId], posts: &PostTable) -> Result<(), OrderError> {
    let mut previous: Option<&Post> = None;
    for id in post_ids {
        let post = posts
            .get(id)
            .ok_or_else(|| OrderError::MissingPost(id.clone()))?;

        if let Some(previous) = previous {
            if post.create_at > previous.create_at {
                return Err(OrderError::Unsorted {
                    older: previous.id.clone(),
                    newer: post.id.clone(),
                });
            }
        }
        previous = Some(post);
    }
    Ok(())
}

fn is_combinable(post: &Post) -> bool {
    !post.is_deleted() && (post.type_.is_user_activity() || post.is_combined())
}

fn raw_post_count(post: &Post) -> usize {
    if post.is_combined() {
        post.system_post_ids.len().max(1)
    } else {
        1
    }
}

/// Replaces runs of consecutive membership messages with combined posts.
///
/// `post_ids` must be ordered newest first. Ids missing from `posts`,
/// deleted posts and every other post type pass through unchanged and end
/// the current run.
pub fn combine_system_posts(
    post_ids: &[PostId],
    posts: &PostTable,
    channel_id: Option<&ChannelId>,
) -> CombinedPosts {
    let mut combined = CombinedPosts {
        posts_for_channel: Vec::with_capacity(post_ids.len()),
        next_posts: posts.clone(),
    };
    let mut run: Vec<&Post> = Vec::new();
    let mut run_size = 0;

    for id in post_ids {
        match posts.get(id) {
            Some(post) if is_combinable(post) => {
                let size = raw_post_count(post);
                if !run.is_empty() && run_size + size > MAX_COMBINED_SYSTEM_POSTS {
                    flush_run(&mut run, channel_id, &mut combined);
                    run_size = 0;
                }
                run.push(post);
                run_size += size;
            }
            _ => {
                flush_run(&mut run, channel_id, &mut combined);
                run_size = 0;
                combined.posts_for_channel.push(id.clone());
            }
        }
    }
    flush_run(&mut run, channel_id, &mut combined);

    combined
}

fn flush_run(run: &mut Vec<&Post>, channel_id: Option<&ChannelId>, combined: &mut CombinedPosts) {
    match run.as_slice() {
        [] => {}
        [single] if !single.is_combined() => combined.posts_for_channel.push(single.id.clone()),
        posts => {
            let post = build_combined_post(posts, channel_id);
            trace!("combined {} system posts into {}", post.system_post_ids.len(), post.id);
            combined.posts_for_channel.push(post.id.clone());
            combined.next_posts.insert(post.id.clone(), post);
        }
    }
    run.clear();
}

fn build_combined_post(run: &[&Post], channel_id: Option<&ChannelId>) -> Post {
    let newest = run[0];

    let mut system_post_ids = Vec::new();
    let mut user_activity_posts: Vec<Post> = Vec::new();
    let mut messages = Vec::new();
    for post in run {
        if post.is_combined() {
            system_post_ids.extend(post.system_post_ids.iter().cloned());
            user_activity_posts.extend(post.user_activity_posts.iter().cloned());
            messages.extend(combined_messages(post));
        } else {
            system_post_ids.push(post.id.clone());
            user_activity_posts.push((*post).clone());
            messages.push(post.message.clone());
        }
    }

    // The newest pre-existing combined post keeps its id across recombination.
    let id = run
        .iter()
        .rev()
        .filter(|post| post.is_combined())
        .max_by_key(|post| post.create_at)
        .map(|post| post.id.clone())
        .unwrap_or_else(|| combined_post_id(&newest.id));

    let user_activity = combine_user_activity_system_post(&user_activity_posts).unwrap_or_default();
    let mut props = Map::new();
    props.insert("messages".to_string(), Value::from(messages.clone()));
    props.insert(
        "user_activity".to_string(),
        serde_json::to_value(&user_activity).unwrap_or_default(),
    );

    Post {
        id,
        create_at: run.iter().map(|post| post.create_at).min().unwrap_or(newest.create_at),
        update_at: run.iter().map(|post| post.update_at).max().unwrap_or(newest.update_at),
        user_id: newest.user_id.clone(),
        channel_id: channel_id.cloned().unwrap_or_else(|| newest.channel_id.clone()),
        message: messages.join("\n"),
        type_: PostType::CombinedUserActivity,
        props,
        system_post_ids,
        user_activity_posts,
        ..Post::default()
    }
}

fn combined_messages(post: &Post) -> Vec<String> {
    match post.props.get("messages").and_then(Value::as_array) {
        Some(messages) => messages
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        None => post
            .user_activity_posts
            .iter()
            .map(|activity| activity.message.clone())
            .collect(),
    }
}

/// Reads back the summary stored on a combined post.
pub fn user_activity(post: &Post) -> Option<UserActivity> {
    post.props
        .get("user_activity")
        .and_then(|value| serde_json::from_value(value.clone()).ok())
}

enum Subjects {
    Users(Vec<UserId>),
    ByActor(Vec<ActorSubjects>),
}

struct ActorSubjects {
    actor: UserId,
    user_ids: Vec<String>,
    usernames: Vec<String>,
}

/// Summarizes membership posts, given newest first.
pub fn combine_user_activity_system_post(posts: &[Post]) -> Option<UserActivity> {
    if posts.is_empty() {
        return None;
    }

    let mut by_type: Vec<(PostType, Subjects)> = Vec::new();
    for post in posts {
        let slot = match by_type.iter().position(|(type_, _)| *type_ == post.type_) {
            Some(slot) => slot,
            None => {
                let subjects = if post.type_.has_actor() {
                    Subjects::ByActor(Vec::new())
                } else {
                    Subjects::Users(Vec::new())
                };
                by_type.push((post.type_.clone(), subjects));
                by_type.len() - 1
            }
        };

        match by_type[slot].1 {
            Subjects::Users(ref mut user_ids) => push_unique(user_ids, post.user_id.clone()),
            Subjects::ByActor(ref mut actors) => {
                let index = match actors.iter().position(|subjects| subjects.actor == post.user_id) {
                    Some(index) => index,
                    None => {
                        actors.push(ActorSubjects {
                            actor: post.user_id.clone(),
                            user_ids: Vec::new(),
                            usernames: Vec::new(),
                        });
                        actors.len() - 1
                    }
                };
                let subjects = &mut actors[index];

                let user_id = post
                    .prop_str("addedUserId")
                    .or_else(|| post.prop_str("removedUserId"));
                let username = post
                    .prop_str("addedUsername")
                    .or_else(|| post.prop_str("removedUsername"));
                match (user_id, username) {
                    (Some(user_id), _) => push_unique(&mut subjects.user_ids, user_id.to_string()),
                    (None, Some(username)) => push_unique(&mut subjects.usernames, username.to_string()),
                    (None, None) => {}
                }
            }
        }
    }

    let mut message_data = Vec::new();
    let mut all_user_ids = Vec::new();
    let mut all_usernames = Vec::new();
    for (post_type, subjects) in by_type {
        match subjects {
            Subjects::Users(user_ids) => {
                all_user_ids.extend(user_ids.iter().cloned());
                message_data.push(ActivityGroup {
                    post_type,
                    user_ids: user_ids.iter().map(|id| id.to_string()).collect(),
                    actor_id: None,
                });
            }
            Subjects::ByActor(actors) => {
                for subjects in actors {
                    all_user_ids.extend(subjects.user_ids.iter().map(|id| UserId::from(id.as_str())));
                    all_usernames.extend(subjects.usernames.iter().cloned());
                    all_user_ids.push(subjects.actor.clone());

                    let mut user_ids = subjects.usernames;
                    user_ids.extend(subjects.user_ids);
                    message_data.push(ActivityGroup {
                        post_type: post_type.clone(),
                        user_ids,
                        actor_id: Some(subjects.actor),
                    });
                }
            }
        }
    }

    message_data.sort_by_key(|group| group.post_type.priority());

    Some(UserActivity {
        all_user_ids: unique(all_user_ids),
        all_usernames: unique(all_usernames),
        message_data,
    })
}

fn push_unique<T: PartialEq>(items: &mut Vec<T>, item: T) {
    if !items.contains(&item) {
        items.push(item);
    }
}

fn unique<T: Clone + Eq + Hash>(items: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

fn first_raw_id(post: &Post) -> &PostId {
    if post.is_combined() {
        post.system_post_ids.first().unwrap_or(&post.id)
    } else {
        &post.id
    }
}

/// Id of the oldest post in a newest-first sequence.
///
/// A combined post at the end stands for its first folded id.
pub fn oldest_post_id_from_posts(posts: &[Post]) -> Option<&PostId> {
    posts.last().map(first_raw_id)
}

/// Newest raw id of a newest-first sequence, looking inside combined posts.
pub fn newest_post_id_from_posts(posts: &[Post]) -> Option<&PostId> {
    posts.first().map(first_raw_id)
}
