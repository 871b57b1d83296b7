use std::borrow::Cow;

use crate::post::{Post, PostEmbed, PostMetadata};

/// Strips the parts of a post's metadata that live in their own indexes.
///
/// Emojis, files and reactions are dropped, and open graph embeds keep only
/// their type and url. A post with nothing to strip is returned borrowed.
pub fn remove_unneeded_metadata(post: &Post) -> Cow<'_, Post> {
    let metadata = match post.metadata {
        Some(ref metadata) if needs_trimming(metadata) => metadata,
        _ => return Cow::Borrowed(post),
    };

    let embeds = metadata
        .embeds
        .as_ref()
        .map(|embeds| embeds.iter().map(trim_embed).collect());

    let mut trimmed = post.clone();
    trimmed.metadata = Some(PostMetadata {
        embeds,
        ..PostMetadata::default()
    });
    Cow::Owned(trimmed)
}

fn needs_trimming(metadata: &PostMetadata) -> bool {
    metadata.emojis.is_some()
        || metadata.files.is_some()
        || metadata.reactions.is_some()
        || metadata.embeds.as_ref().map_or(false, |embeds| {
            embeds
                .iter()
                .any(|embed| embed.is_open_graph() && embed.data.is_some())
        })
}

fn trim_embed(embed: &PostEmbed) -> PostEmbed {
    if embed.is_open_graph() {
        PostEmbed {
            type_: embed.type_.clone(),
            url: embed.url.clone(),
            data: None,
        }
    } else {
        embed.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn post(value: serde_json::Value) -> Post {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn post_without_metadata_is_borrowed() {
        let post = post(json!({"id": "post"}));

        let normalized = remove_unneeded_metadata(&post);
        assert!(matches!(normalized, Cow::Borrowed(p) if std::ptr::eq(p, &post)));
    }

    #[test]
    fn empty_metadata_is_borrowed() {
        let post = post(json!({"id": "post", "metadata": {}}));

        assert!(matches!(remove_unneeded_metadata(&post), Cow::Borrowed(_)));
    }

    #[test]
    fn non_open_graph_embeds_are_borrowed() {
        let post = post(json!({
            "id": "post",
            "metadata": {
                "embeds": [{"type": "image", "url": "https://example.com/a.png"}]
            }
        }));

        assert!(matches!(remove_unneeded_metadata(&post), Cow::Borrowed(_)));
    }

    #[test]
    fn removes_emojis() {
        let post = post(json!({
            "id": "post",
            "metadata": {"emojis": [{"name": "emoji"}]}
        }));

        let normalized = remove_unneeded_metadata(&post);
        assert_eq!(normalized.metadata, Some(PostMetadata::default()));
        assert!(post.metadata.as_ref().unwrap().emojis.is_some());
    }

    #[test]
    fn removes_files_and_reactions() {
        let post = post(json!({
            "id": "post",
            "metadata": {
                "files": [{"id": "file"}],
                "reactions": [{"user_id": "abcd", "emoji_name": "+1"}]
            }
        }));

        let normalized = remove_unneeded_metadata(&post);
        assert_eq!(normalized.metadata, Some(PostMetadata::default()));
    }

    #[test]
    fn trims_open_graph_data_and_keeps_other_embeds() {
        let post = post(json!({
            "id": "post",
            "metadata": {
                "embeds": [
                    {"type": "opengraph", "url": "https://example.com", "data": {"title": "Example"}},
                    {"type": "image", "url": "https://example.com/a.png", "data": {"width": 10}}
                ]
            }
        }));

        let normalized = remove_unneeded_metadata(&post);
        assert_eq!(
            serde_json::to_value(normalized.metadata.as_ref().unwrap()).unwrap(),
            json!({
                "embeds": [
                    {"type": "opengraph", "url": "https://example.com"},
                    {"type": "image", "url": "https://example.com/a.png", "data": {"width": 10}}
                ]
            })
        );
    }
}
