//! Bookkeeping for optimistically created posts.
//!
//! A post created locally carries `pending_post_id == id` until the server
//! echoes it back under its real id. The sending list tracks in-flight
//! requests; the pending list tracks every post the server has not confirmed.

use crate::event::PostEvent;
use crate::post::{Post, PostId};

use std::collections::HashSet;
use std::sync::Arc;

pub fn sending_post_ids(ids: &Arc<Vec<PostId>>, event: &PostEvent) -> Arc<Vec<PostId>> {
    match event {
        PostEvent::ReceivedNewPost(post) => append_optimistic(ids, post),
        PostEvent::ReceivedPost(post) => without_received(ids, Some(post)),
        PostEvent::ReceivedPosts { posts, .. } => without_received(ids, posts.posts.values()),
        PostEvent::CreatePostFailure { pending_post_id } => {
            retain(ids, |id| id != pending_post_id)
        }
        PostEvent::RemovePendingPost { id: removed, .. } => retain(ids, |id| id != removed),
        PostEvent::LogoutSuccess => retain(ids, |_| false),
        _ => Arc::clone(ids),
    }
}

pub fn pending_post_ids(ids: &Arc<Vec<PostId>>, event: &PostEvent) -> Arc<Vec<PostId>> {
    match event {
        PostEvent::ReceivedNewPost(post) => append_optimistic(ids, post),
        PostEvent::ReceivedPost(post) => without_confirmed(ids, Some(post)),
        PostEvent::ReceivedPosts { posts, .. } => without_confirmed(ids, posts.posts.values()),
        PostEvent::RemovePendingPost { id: removed, .. } => retain(ids, |id| id != removed),
        PostEvent::LogoutSuccess => retain(ids, |_| false),
        _ => Arc::clone(ids),
    }
}

fn optimistic_id(post: &Post) -> Option<&PostId> {
    post.pending_post_id
        .as_ref()
        .filter(|pending_id| **pending_id == post.id)
}

fn append_optimistic(ids: &Arc<Vec<PostId>>, post: &Post) -> Arc<Vec<PostId>> {
    match optimistic_id(post) {
        Some(id) if !ids.contains(id) => {
            let mut next = Arc::clone(ids);
            Arc::make_mut(&mut next).push(id.clone());
            next
        }
        _ => Arc::clone(ids),
    }
}

/// Drops ids matching a received post's id or its pending id.
fn without_received<'a, I>(ids: &Arc<Vec<PostId>>, posts: I) -> Arc<Vec<PostId>>
where
    I: IntoIterator<Item = &'a Post>,
{
    let received: HashSet<&PostId> = posts
        .into_iter()
        .flat_map(|post| Some(&post.id).into_iter().chain(post.pending_post_id.as_ref()))
        .collect();
    retain(ids, |id| !received.contains(id))
}

/// Drops ids whose post came back from the server under a real id.
fn without_confirmed<'a, I>(ids: &Arc<Vec<PostId>>, posts: I) -> Arc<Vec<PostId>>
where
    I: IntoIterator<Item = &'a Post>,
{
    let confirmed: HashSet<&PostId> = posts
        .into_iter()
        .filter_map(|post| post.pending_post_id.as_ref().filter(|id| **id != post.id))
        .collect();
    retain(ids, |id| !confirmed.contains(id))
}

fn retain<F>(ids: &Arc<Vec<PostId>>, keep: F) -> Arc<Vec<PostId>>
where
    F: Fn(&PostId) -> bool,
{
    if ids.iter().all(|id| keep(id)) {
        return Arc::clone(ids);
    }
    Arc::new(ids.iter().filter(|id| keep(*id)).cloned().collect())
}
