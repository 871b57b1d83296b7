use serde_json::Value;

use crate::event::PostEvent;
use crate::post::Post;

use std::collections::HashMap;
use std::sync::Arc;

/// Link previews keyed by url.
pub type OpenGraphIndex = HashMap<String, Value>;

pub fn store_open_graph_for_post(index: &Arc<OpenGraphIndex>, post: &Post) -> Arc<OpenGraphIndex> {
    store_open_graph_for_posts(index, Some(post))
}

pub fn store_open_graph_for_posts<'a, I>(index: &Arc<OpenGraphIndex>, posts: I) -> Arc<OpenGraphIndex>
where
    I: IntoIterator<Item = &'a Post>,
{
    let mut next = Arc::clone(index);
    for post in posts {
        for embed in post.embeds().iter().filter(|embed| embed.is_open_graph()) {
            if let Some(ref url) = embed.url {
                let data = embed.data.clone().unwrap_or(Value::Null);
                Arc::make_mut(&mut next).insert(url.clone(), data);
            }
        }
    }
    next
}

pub fn reduce(index: &Arc<OpenGraphIndex>, event: &PostEvent) -> Arc<OpenGraphIndex> {
    match event {
        PostEvent::ReceivedPost(post) | PostEvent::ReceivedNewPost(post) => {
            store_open_graph_for_post(index, post)
        }
        PostEvent::ReceivedPosts { posts, .. } => {
            store_open_graph_for_posts(index, posts.posts.values())
        }
        PostEvent::ReceivedOpenGraphMetadata { url, data } => {
            let mut next = Arc::clone(index);
            Arc::make_mut(&mut next).insert(url.clone(), data.clone());
            next
        }
        PostEvent::LogoutSuccess => {
            if index.is_empty() {
                Arc::clone(index)
            } else {
                Arc::default()
            }
        }
        _ => Arc::clone(index),
    }
}
