//! The normalized post store.
//!
//! [`PostsState`] is an immutable value: [`PostsState::reduce`] folds one
//! event into a new state. Each slice is shared behind an `Arc` and only the
//! slices an event touches are copied, so unchanged slices stay pointer-equal
//! across transitions.

use log::{debug, trace};
use serde_json::Value;

use crate::channel::ChannelId;
use crate::combine::{combine_system_posts, CombinedPosts};
use crate::event::PostEvent;
use crate::history::MessageHistory;
use crate::metadata::remove_unneeded_metadata;
use crate::open_graph::{self, OpenGraphIndex};
use crate::pending;
use crate::post::{compare_posts, Post, PostId, PostList, PostState, PostTable};
use crate::reactions::{self, ReactionIndex, ReactionsForPost};

use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::Arc;

pub type PostIdsByChannel = HashMap<ChannelId, Vec<PostId>>;
pub type PostIdsByThread = HashMap<PostId, Vec<PostId>>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostsState {
    pub posts: Arc<PostTable>,
    /// Newest first, with pending posts on top.
    pub posts_in_channel: Arc<PostIdsByChannel>,
    /// Replies keyed by their root post id.
    pub posts_in_thread: Arc<PostIdsByThread>,
    pub posts_in_channel_backup: Arc<PostIdsByChannel>,
    pub pending_post_ids: Arc<Vec<PostId>>,
    pub sending_post_ids: Arc<Vec<PostId>>,
    pub reactions: Arc<ReactionIndex>,
    pub open_graph: Arc<OpenGraphIndex>,
    pub current_focused_post_id: Option<PostId>,
    pub selected_post_id: Option<PostId>,
    pub messages_history: MessageHistory,
}

impl PostsState {
    pub fn post(&self, id: &PostId) -> Option<&Post> {
        self.posts.get(id)
    }

    pub fn post_ids_in_channel(&self, channel_id: &ChannelId) -> &[PostId] {
        self.posts_in_channel
            .get(channel_id)
            .map_or(&[][..], Vec::as_slice)
    }

    pub fn post_ids_in_thread(&self, root_id: &PostId) -> &[PostId] {
        self.posts_in_thread
            .get(root_id)
            .map_or(&[][..], Vec::as_slice)
    }

    pub fn pending_post_ids(&self) -> &[PostId] {
        &self.pending_post_ids
    }

    pub fn sending_post_ids(&self) -> &[PostId] {
        &self.sending_post_ids
    }

    pub fn current_focused_post_id(&self) -> Option<&PostId> {
        self.current_focused_post_id.as_ref()
    }

    pub fn selected_post_id(&self) -> Option<&PostId> {
        self.selected_post_id.as_ref()
    }

    pub fn messages_history(&self) -> &MessageHistory {
        &self.messages_history
    }

    pub fn reactions_for_post(&self, post_id: &PostId) -> Option<&ReactionsForPost> {
        self.reactions.get(post_id)
    }

    pub fn open_graph_for_url(&self, url: &str) -> Option<&Value> {
        self.open_graph.get(url)
    }

    /// The channel's posts with runs of membership messages combined.
    pub fn combined_posts_for_channel(&self, channel_id: &ChannelId) -> CombinedPosts {
        combine_system_posts(
            self.post_ids_in_channel(channel_id),
            &self.posts,
            Some(channel_id),
        )
    }

    pub fn reduce(&self, event: &PostEvent) -> PostsState {
        let reactions = reactions::reduce(&self.reactions, event);
        let (posts, posts_in_channel) = self.reduce_posts(event, &reactions);
        let posts_in_thread = self.reduce_posts_in_thread(event, &posts);

        PostsState {
            posts_in_channel_backup: self.reduce_backup(event),
            pending_post_ids: pending::pending_post_ids(&self.pending_post_ids, event),
            sending_post_ids: pending::sending_post_ids(&self.sending_post_ids, event),
            open_graph: open_graph::reduce(&self.open_graph, event),
            current_focused_post_id: self.reduce_focused(event),
            selected_post_id: self.reduce_selected(event),
            messages_history: self.messages_history.reduce(event),
            posts,
            posts_in_channel,
            posts_in_thread,
            reactions,
        }
    }

    fn reduce_posts(
        &self,
        event: &PostEvent,
        next_reactions: &ReactionIndex,
    ) -> (Arc<PostTable>, Arc<PostIdsByChannel>) {
        let mut posts = Arc::clone(&self.posts);
        let mut in_channel = Arc::clone(&self.posts_in_channel);

        match event {
            PostEvent::ReceivedPost(post) => {
                supersede_pending(&mut posts, &mut in_channel, post);
                let normalized = remove_unneeded_metadata(post).into_owned();
                Arc::make_mut(&mut posts).insert(post.id.clone(), normalized);
            }
            PostEvent::ReceivedNewPost(post) => {
                let listed = in_channel
                    .get(&post.channel_id)
                    .map_or(false, |ids| ids.contains(&post.id));
                if !listed {
                    Arc::make_mut(&mut in_channel)
                        .entry(post.channel_id.clone())
                        .or_default()
                        .insert(0, post.id.clone());
                }
                supersede_pending(&mut posts, &mut in_channel, post);
                let normalized = remove_unneeded_metadata(post).into_owned();
                Arc::make_mut(&mut posts).insert(post.id.clone(), normalized);
            }
            PostEvent::ReceivedPosts {
                channel_id,
                posts: list,
                skip_add_to_channel,
            } => {
                let target = channel_id.as_ref().filter(|_| !*skip_add_to_channel);
                receive_posts(&mut posts, &mut in_channel, list, target);
            }
            PostEvent::ReceivedEditPost(post) => match self.posts.get(&post.id) {
                Some(existing) => {
                    let edited = keep_omitted_metadata(existing, remove_unneeded_metadata(post).into_owned());
                    Arc::make_mut(&mut posts).insert(post.id.clone(), edited);
                }
                None => debug!("ignoring edit of unknown post {}", post.id),
            },
            PostEvent::PostDeleted(post) => match self.posts.get(&post.id) {
                Some(existing) => {
                    let mut deleted = mark_deleted(existing.clone());
                    if post.delete_at != 0 {
                        deleted.delete_at = post.delete_at;
                    }
                    let replies = self.reply_ids(&post.id);

                    let table = Arc::make_mut(&mut posts);
                    table.insert(post.id.clone(), deleted);
                    for reply in &replies {
                        table.remove(reply);
                    }
                    in_channel = without_ids(&in_channel, &replies);
                }
                None => debug!("ignoring deletion of unknown post {}", post.id),
            },
            PostEvent::RemovePost(post) => {
                if self.posts.contains_key(&post.id) {
                    let mut removed = self.reply_ids(&post.id);
                    removed.insert(post.id.clone());

                    let table = Arc::make_mut(&mut posts);
                    for id in &removed {
                        table.remove(id);
                    }
                    in_channel = without_ids(&in_channel, &removed);
                } else {
                    debug!("ignoring removal of unknown post {}", post.id);
                }
            }
            PostEvent::RemovePendingPost { id, channel_id } => {
                if posts.contains_key(id) {
                    Arc::make_mut(&mut posts).remove(id);
                }
                if let Some(channel_id) = channel_id {
                    let listed = in_channel
                        .get(channel_id)
                        .map_or(false, |ids| ids.contains(id));
                    if listed {
                        if let Some(ids) = Arc::make_mut(&mut in_channel).get_mut(channel_id) {
                            ids.retain(|listed_id| listed_id != id);
                        }
                    }
                }
            }
            PostEvent::CreatePostFailure { pending_post_id } => {
                let needs_marking = posts
                    .get(pending_post_id)
                    .map_or(false, |post| !post.failed);
                if needs_marking {
                    if let Some(post) = Arc::make_mut(&mut posts).get_mut(pending_post_id) {
                        post.failed = true;
                    }
                }
            }
            PostEvent::ReceivedReaction(reaction) => {
                set_has_reactions(&mut posts, &reaction.post_id, true);
            }
            PostEvent::ReceivedReactions { post_id, reactions } => {
                set_has_reactions(&mut posts, post_id, !reactions.is_empty());
            }
            PostEvent::ReactionDeleted(reaction) => {
                let has_reactions = next_reactions
                    .get(&reaction.post_id)
                    .map_or(false, |for_post| !for_post.is_empty());
                set_has_reactions(&mut posts, &reaction.post_id, has_reactions);
            }
            PostEvent::ClearChannelPosts { channel_id } => {
                let has_posts = in_channel
                    .get(channel_id)
                    .map_or(false, |ids| !ids.is_empty());
                if has_posts {
                    Arc::make_mut(&mut in_channel).insert(channel_id.clone(), Vec::new());
                }
            }
            PostEvent::AddChannelPostIds {
                channel_id,
                post_ids,
            } => {
                let current = in_channel.get(channel_id).map_or(&[][..], Vec::as_slice);
                let mut missing: Vec<PostId> = Vec::new();
                for id in post_ids {
                    if !current.contains(id) && !missing.contains(id) {
                        missing.push(id.clone());
                    }
                }
                if !missing.is_empty() {
                    Arc::make_mut(&mut in_channel)
                        .entry(channel_id.clone())
                        .or_default()
                        .extend(missing);
                }
            }
            PostEvent::RestoreChannelPostIds { channel_id } => {
                if let Some(backup) = self.posts_in_channel_backup.get(channel_id) {
                    Arc::make_mut(&mut in_channel).insert(channel_id.clone(), backup.clone());
                }
            }
            PostEvent::ChannelDeleted {
                channel_id,
                view_archived_channels: false,
            } => {
                let purged = self.post_ids_for_channel(channel_id);
                if !purged.is_empty() {
                    Arc::make_mut(&mut posts).retain(|id, _| !purged.contains(id));
                }
                if in_channel.contains_key(channel_id) {
                    Arc::make_mut(&mut in_channel).remove(channel_id);
                }
            }
            PostEvent::LogoutSuccess => {
                if !posts.is_empty() {
                    posts = Arc::default();
                }
                if !in_channel.is_empty() {
                    in_channel = Arc::default();
                }
            }
            PostEvent::ReceivedFocusedPost(_)
            | PostEvent::ReceivedPostSelected(_)
            | PostEvent::ReceivedOpenGraphMetadata { .. }
            | PostEvent::AddMessageIntoHistory(_)
            | PostEvent::ResetHistoryIndex(_)
            | PostEvent::MoveHistoryIndexBack(_)
            | PostEvent::MoveHistoryIndexForward(_)
            | PostEvent::BackupChannelPostIds { .. }
            | PostEvent::ChannelDeleted {
                view_archived_channels: true,
                ..
            } => {}
        }

        (posts, in_channel)
    }

    fn reduce_posts_in_thread(&self, event: &PostEvent, next_posts: &PostTable) -> Arc<PostIdsByThread> {
        let mut threads = Arc::clone(&self.posts_in_thread);

        match event {
            PostEvent::ReceivedPost(post) | PostEvent::ReceivedNewPost(post) => {
                add_to_thread(&mut threads, post);
            }
            PostEvent::ReceivedPosts { posts, .. } => {
                for id in ordered_ids(posts) {
                    if let Some(post) = next_posts.get(id) {
                        if !post.is_deleted() {
                            add_to_thread(&mut threads, post);
                        }
                    }
                }
            }
            PostEvent::PostDeleted(post) => {
                if self.posts.contains_key(&post.id) {
                    let replies = self.reply_ids(&post.id);
                    threads = without_ids(&threads, &replies);
                    if threads.contains_key(&post.id) {
                        Arc::make_mut(&mut threads).remove(&post.id);
                    }
                }
            }
            PostEvent::RemovePost(post) => {
                if self.posts.contains_key(&post.id) {
                    let mut removed = self.reply_ids(&post.id);
                    removed.insert(post.id.clone());
                    threads = without_ids(&threads, &removed);
                    if threads.contains_key(&post.id) {
                        Arc::make_mut(&mut threads).remove(&post.id);
                    }
                }
            }
            PostEvent::RemovePendingPost { id, .. } => {
                let mut removed = HashSet::new();
                removed.insert(id.clone());
                threads = without_ids(&threads, &removed);
            }
            PostEvent::ChannelDeleted {
                channel_id,
                view_archived_channels: false,
            } => {
                let purged = self.post_ids_for_channel(channel_id);
                let rooted_in_channel = threads.keys().any(|root| purged.contains(root));
                if rooted_in_channel {
                    Arc::make_mut(&mut threads).retain(|root, _| !purged.contains(root));
                }
                threads = without_ids(&threads, &purged);
            }
            PostEvent::LogoutSuccess => {
                if !threads.is_empty() {
                    threads = Arc::default();
                }
            }
            _ => {}
        }

        threads
    }

    fn reduce_backup(&self, event: &PostEvent) -> Arc<PostIdsByChannel> {
        let mut backup = Arc::clone(&self.posts_in_channel_backup);

        match event {
            PostEvent::BackupChannelPostIds { channel_id } => match self.posts_in_channel.get(channel_id) {
                Some(ids) => {
                    Arc::make_mut(&mut backup).insert(channel_id.clone(), ids.clone());
                }
                None => trace!("no posts to back up for channel {}", channel_id),
            },
            PostEvent::RestoreChannelPostIds { channel_id }
            | PostEvent::ChannelDeleted {
                channel_id,
                view_archived_channels: false,
            } => {
                if backup.contains_key(channel_id) {
                    Arc::make_mut(&mut backup).remove(channel_id);
                }
            }
            PostEvent::RemovePendingPost {
                id,
                channel_id: Some(channel_id),
            } => {
                let listed = backup.get(channel_id).map_or(false, |ids| ids.contains(id));
                if listed {
                    if let Some(ids) = Arc::make_mut(&mut backup).get_mut(channel_id) {
                        ids.retain(|listed_id| listed_id != id);
                    }
                }
            }
            PostEvent::LogoutSuccess => {
                if !backup.is_empty() {
                    backup = Arc::default();
                }
            }
            _ => {}
        }

        backup
    }

    fn reduce_focused(&self, event: &PostEvent) -> Option<PostId> {
        match event {
            PostEvent::ReceivedFocusedPost(id) => id.clone(),
            _ => self.reduce_session_post_id(event, &self.current_focused_post_id),
        }
    }

    fn reduce_selected(&self, event: &PostEvent) -> Option<PostId> {
        match event {
            PostEvent::ReceivedPostSelected(id) => id.clone(),
            _ => self.reduce_session_post_id(event, &self.selected_post_id),
        }
    }

    /// Focus and selection are cleared when the post they point at goes away.
    fn reduce_session_post_id(&self, event: &PostEvent, current: &Option<PostId>) -> Option<PostId> {
        let id = current.as_ref()?;

        let cleared = match event {
            PostEvent::ChannelDeleted {
                view_archived_channels: true,
                ..
            }
            | PostEvent::LogoutSuccess => true,
            PostEvent::ChannelDeleted {
                channel_id,
                view_archived_channels: false,
            } => self
                .posts
                .get(id)
                .map_or(false, |post| post.channel_id == *channel_id),
            PostEvent::RemovePost(post) => post.id == *id || self.reply_ids(&post.id).contains(id),
            PostEvent::RemovePendingPost { id: removed, .. } => removed == id,
            _ => false,
        };

        if cleared {
            None
        } else {
            current.clone()
        }
    }

    fn reply_ids(&self, root_id: &PostId) -> HashSet<PostId> {
        self.posts
            .values()
            .filter(|post| post.root_id.as_ref() == Some(root_id))
            .map(|post| post.id.clone())
            .collect()
    }

    fn post_ids_for_channel(&self, channel_id: &ChannelId) -> HashSet<PostId> {
        self.posts
            .values()
            .filter(|post| post.channel_id == *channel_id)
            .map(|post| post.id.clone())
            .collect()
    }
}

/// Bulk ingestion of a page of posts, optionally listing them in a channel.
fn receive_posts(
    posts: &mut Arc<PostTable>,
    in_channel: &mut Arc<PostIdsByChannel>,
    list: &PostList,
    target: Option<&ChannelId>,
) {
    for id in ordered_ids(list) {
        let incoming = match list.posts.get(id) {
            Some(post) => post,
            None => continue,
        };

        if incoming.delete_at != 0 && !posts.contains_key(&incoming.id) {
            trace!("skipping deleted post {} that was never loaded", incoming.id);
            continue;
        }

        store_received_post(posts, incoming);

        if let Some(channel_id) = target {
            let listed = in_channel
                .get(channel_id)
                .map_or(false, |ids| ids.contains(&incoming.id));
            if !listed {
                Arc::make_mut(in_channel)
                    .entry(channel_id.clone())
                    .or_default()
                    .push(incoming.id.clone());
            }
        }

        supersede_pending(posts, in_channel, incoming);
    }

    if let Some(channel_id) = target {
        let resorted = in_channel.get(channel_id).and_then(|ids| {
            let mut sorted = ids.clone();
            sort_post_ids(&mut sorted, posts);
            if sorted == *ids {
                None
            } else {
                Some(sorted)
            }
        });
        if let Some(sorted) = resorted {
            Arc::make_mut(in_channel).insert(channel_id.clone(), sorted);
        }
    }
}

fn store_received_post(posts: &mut Arc<PostTable>, incoming: &Post) {
    let normalized = remove_unneeded_metadata(incoming).into_owned();

    let next = match posts.get(&incoming.id) {
        Some(_) if incoming.delete_at != 0 => mark_deleted(normalized),
        Some(existing) if existing.update_at >= incoming.update_at => {
            trace!("keeping newer copy of post {}", incoming.id);
            return;
        }
        Some(existing) => keep_omitted_metadata(existing, normalized),
        None => normalized,
    };

    Arc::make_mut(posts).insert(incoming.id.clone(), next);
}

/// Replaces the optimistic post an incoming post was created from.
///
/// The pending id takes over the confirmed post's slot in its channel list,
/// or is dropped when the confirmed id is already listed.
fn supersede_pending(posts: &mut Arc<PostTable>, in_channel: &mut Arc<PostIdsByChannel>, post: &Post) {
    let pending_id = match post.pending_post_id {
        Some(ref pending_id) if *pending_id != post.id => pending_id,
        _ => return,
    };

    let channel_id = match posts.get(pending_id) {
        Some(pending) => pending.channel_id.clone(),
        None => return,
    };
    Arc::make_mut(posts).remove(pending_id);

    let (position, confirmed_listed) = match in_channel.get(&channel_id) {
        Some(ids) => (
            ids.iter().position(|id| id == pending_id),
            ids.contains(&post.id),
        ),
        None => return,
    };

    if let Some(index) = position {
        if let Some(ids) = Arc::make_mut(in_channel).get_mut(&channel_id) {
            if confirmed_listed {
                ids.remove(index);
            } else {
                ids[index] = post.id.clone();
            }
        }
    }
}

fn add_to_thread(threads: &mut Arc<PostIdsByThread>, post: &Post) {
    let root_id = match post.root_id {
        Some(ref root_id) => root_id,
        None => return,
    };

    let superseded = post
        .pending_post_id
        .as_ref()
        .filter(|pending_id| **pending_id != post.id);

    let (listed, stale) = match threads.get(root_id) {
        Some(ids) => (
            ids.contains(&post.id),
            superseded.map_or(false, |pending_id| ids.contains(pending_id)),
        ),
        None => (false, false),
    };
    if listed && !stale {
        return;
    }

    let ids = Arc::make_mut(threads).entry(root_id.clone()).or_default();
    if let Some(pending_id) = superseded {
        ids.retain(|id| id != pending_id);
    }
    if !ids.contains(&post.id) {
        ids.push(post.id.clone());
    }
}

/// Ids in the page's order, followed by any posts the order omitted.
fn ordered_ids(list: &PostList) -> Vec<&PostId> {
    let mut ids: Vec<&PostId> = list
        .order
        .iter()
        .filter(|id| list.posts.contains_key(*id))
        .collect();

    let ordered: HashSet<&PostId> = ids.iter().cloned().collect();
    let mut unordered: Vec<&PostId> = list
        .posts
        .keys()
        .filter(|id| !ordered.contains(id))
        .collect();
    unordered.sort();
    ids.extend(unordered);
    ids
}

fn sort_post_ids(ids: &mut Vec<PostId>, posts: &PostTable) {
    ids.sort_by(|a, b| match (posts.get(a), posts.get(b)) {
        (Some(a), Some(b)) => compare_posts(a, b),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => b.cmp(a),
    });
}

fn mark_deleted(mut post: Post) -> Post {
    post.state = Some(PostState::Deleted);
    post.file_ids.clear();
    post.has_reactions = false;
    post
}

/// Metadata fields the server left out keep their stored values.
fn keep_omitted_metadata(existing: &Post, mut incoming: Post) -> Post {
    let stored = match existing.metadata {
        Some(ref stored) => stored,
        None => return incoming,
    };

    match incoming.metadata {
        None => incoming.metadata = Some(stored.clone()),
        Some(ref mut metadata) => {
            if metadata.embeds.is_none() {
                metadata.embeds = stored.embeds.clone();
            }
        }
    }
    incoming
}

fn set_has_reactions(posts: &mut Arc<PostTable>, post_id: &PostId, has_reactions: bool) {
    let needs_update = posts
        .get(post_id)
        .map_or(false, |post| post.has_reactions != has_reactions);
    if needs_update {
        if let Some(post) = Arc::make_mut(posts).get_mut(post_id) {
            post.has_reactions = has_reactions;
        }
    }
}

/// Removes `ids` from every list, keeping the original map if none are listed.
fn without_ids<K>(lists: &Arc<HashMap<K, Vec<PostId>>>, ids: &HashSet<PostId>) -> Arc<HashMap<K, Vec<PostId>>>
where
    K: Clone + Eq + Hash,
{
    let listed = lists
        .values()
        .any(|list| list.iter().any(|id| ids.contains(id)));
    if !listed {
        return Arc::clone(lists);
    }

    let mut next = Arc::clone(lists);
    for list in Arc::make_mut(&mut next).values_mut() {
        list.retain(|id| !ids.contains(id));
    }
    next
}
