use serde::{Deserialize, Serialize};

use crate::event::PostEvent;
use crate::post::{Post, PostId};
use crate::user::UserId;

use std::collections::HashMap;
use std::sync::Arc;

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Reaction {
    pub user_id: UserId,
    pub post_id: PostId,
    pub emoji_name: String,
    pub create_at: i64,
}

impl Reaction {
    /// A user can react to a post once per emoji.
    pub fn key(&self) -> String {
        format!("{}-{}", self.user_id, self.emoji_name)
    }
}

pub type ReactionsForPost = HashMap<String, Reaction>;
pub type ReactionIndex = HashMap<PostId, ReactionsForPost>;

pub fn store_reactions_for_post(index: &Arc<ReactionIndex>, post: &Post) -> Arc<ReactionIndex> {
    store_reactions_for_posts(index, Some(post))
}

pub fn store_reactions_for_posts<'a, I>(index: &Arc<ReactionIndex>, posts: I) -> Arc<ReactionIndex>
where
    I: IntoIterator<Item = &'a Post>,
{
    let mut next = Arc::clone(index);
    for post in posts {
        if let Some(reactions) = post.reactions() {
            let entry = Arc::make_mut(&mut next).entry(post.id.clone()).or_default();
            for reaction in reactions {
                entry.insert(reaction.key(), reaction.clone());
            }
        }
    }
    next
}

pub fn reduce(index: &Arc<ReactionIndex>, event: &PostEvent) -> Arc<ReactionIndex> {
    match event {
        PostEvent::ReceivedPost(post) | PostEvent::ReceivedNewPost(post) => {
            store_reactions_for_post(index, post)
        }
        PostEvent::ReceivedPosts { posts, .. } => {
            store_reactions_for_posts(index, posts.posts.values())
        }
        PostEvent::ReceivedReaction(reaction) => {
            let mut next = Arc::clone(index);
            Arc::make_mut(&mut next)
                .entry(reaction.post_id.clone())
                .or_default()
                .insert(reaction.key(), reaction.clone());
            next
        }
        PostEvent::ReceivedReactions { post_id, reactions } => {
            let for_post = reactions
                .iter()
                .map(|reaction| (reaction.key(), reaction.clone()))
                .collect();
            let mut next = Arc::clone(index);
            Arc::make_mut(&mut next).insert(post_id.clone(), for_post);
            next
        }
        PostEvent::ReactionDeleted(reaction) => {
            let key = reaction.key();
            let present = index
                .get(&reaction.post_id)
                .map_or(false, |for_post| for_post.contains_key(&key));
            if !present {
                return Arc::clone(index);
            }

            let mut next = Arc::clone(index);
            if let Some(for_post) = Arc::make_mut(&mut next).get_mut(&reaction.post_id) {
                for_post.remove(&key);
            }
            next
        }
        PostEvent::PostDeleted(post) | PostEvent::RemovePost(post) => {
            if !index.contains_key(&post.id) {
                return Arc::clone(index);
            }

            let mut next = Arc::clone(index);
            Arc::make_mut(&mut next).remove(&post.id);
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::post::PostList;
    use serde_json::json;

    fn post(value: serde_json::Value) -> Post {
        serde_json::from_value(value).unwrap()
    }

    fn reaction(user_id: &str, post_id: &str, emoji_name: &str) -> Reaction {
        Reaction {
            user_id: UserId::from(user_id),
            post_id: PostId::from(post_id),
            emoji_name: emoji_name.to_string(),
            create_at: 0,
        }
    }

    #[test]
    fn post_without_metadata_keeps_index() {
        let index = Arc::new(ReactionIndex::new());
        let next = store_reactions_for_post(&index, &post(json!({"id": "post"})));

        assert!(Arc::ptr_eq(&index, &next));
    }

    #[test]
    fn metadata_without_reactions_keeps_index() {
        let index = Arc::new(ReactionIndex::new());
        let next = store_reactions_for_post(
            &index,
            &post(json!({"id": "post", "metadata": {"emojis": []}})),
        );

        assert!(Arc::ptr_eq(&index, &next));
    }

    #[test]
    fn stores_reactions_by_user_and_emoji() {
        let index = Arc::new(ReactionIndex::new());
        let next = store_reactions_for_post(
            &index,
            &post(json!({
                "id": "post",
                "metadata": {
                    "reactions": [
                        {"user_id": "abcd", "emoji_name": "+1", "post_id": "post"},
                        {"user_id": "efgh", "emoji_name": "+1", "post_id": "post"},
                        {"user_id": "abcd", "emoji_name": "-1", "post_id": "post"}
                    ]
                }
            })),
        );

        let for_post = &next["post"];
        assert_eq!(for_post.len(), 3);
        assert_eq!(for_post["abcd-+1"].user_id.as_str(), "abcd");
        assert_eq!(for_post["efgh-+1"].emoji_name, "+1");
        assert_eq!(for_post["abcd--1"].emoji_name, "-1");
        assert!(index.is_empty());
    }

    #[test]
    fn empty_reaction_list_creates_empty_entry() {
        let index = Arc::new(ReactionIndex::new());
        let next = store_reactions_for_post(
            &index,
            &post(json!({"id": "post", "metadata": {"reactions": []}})),
        );

        assert_eq!(next.get("post"), Some(&ReactionsForPost::new()));
    }

    #[test]
    fn batch_without_reactions_keeps_index() {
        let index = Arc::new(ReactionIndex::new());
        let posts = vec![post(json!({"id": "a"})), post(json!({"id": "b", "metadata": {}}))];

        assert!(Arc::ptr_eq(&index, &store_reactions_for_posts(&index, &posts)));
    }

    #[test]
    fn received_posts_store_each_post() {
        let index = Arc::new(ReactionIndex::new());
        let mut list = PostList::default();
        for id in &["a", "b"] {
            list.posts.insert(
                PostId::from(*id),
                post(json!({
                    "id": id,
                    "metadata": {"reactions": [{"user_id": "abcd", "emoji_name": "+1", "post_id": id}]}
                })),
            );
        }

        let next = reduce(
            &index,
            &PostEvent::ReceivedPosts {
                channel_id: None,
                posts: list,
                skip_add_to_channel: false,
            },
        );

        assert_eq!(next.len(), 2);
        assert!(next["a"].contains_key("abcd-+1"));
    }

    #[test]
    fn received_reaction_and_deletion() {
        let index = Arc::new(ReactionIndex::new());
        let added = reduce(&index, &PostEvent::ReceivedReaction(reaction("abcd", "post", "+1")));
        assert_eq!(added["post"].len(), 1);

        let removed = reduce(&added, &PostEvent::ReactionDeleted(reaction("abcd", "post", "+1")));
        assert_eq!(removed.get("post"), Some(&ReactionsForPost::new()));

        let unchanged = reduce(&removed, &PostEvent::ReactionDeleted(reaction("abcd", "post", "+1")));
        assert!(Arc::ptr_eq(&removed, &unchanged));
    }

    #[test]
    fn received_reactions_replace_entry() {
        let index = reduce(
            &Arc::new(ReactionIndex::new()),
            &PostEvent::ReceivedReaction(reaction("abcd", "post", "+1")),
        );

        let next = reduce(
            &index,
            &PostEvent::ReceivedReactions {
                post_id: PostId::from("post"),
                reactions: vec![reaction("efgh", "post", "smile")],
            },
        );

        let keys: Vec<&String> = next["post"].keys().collect();
        assert_eq!(keys, vec!["efgh-smile"]);
    }

    #[test]
    fn deleted_post_drops_entry() {
        let index = reduce(
            &Arc::new(ReactionIndex::new()),
            &PostEvent::ReceivedReaction(reaction("abcd", "post", "+1")),
        );

        let next = reduce(&index, &PostEvent::PostDeleted(post(json!({"id": "post"}))));
        assert!(next.is_empty());

        let unrelated = reduce(&next, &PostEvent::RemovePost(post(json!({"id": "other"}))));
        assert!(Arc::ptr_eq(&next, &unrelated));
    }
}
