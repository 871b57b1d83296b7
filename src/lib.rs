//! Client-side normalized post store for Mattermost.
//!
//! Server events are folded into a [`PostsState`] one [`PostEvent`] at a time,
//! and [`combine_system_posts`] groups the join/leave noise of a channel into
//! combined activity posts for display.

/// Declares a string-backed identifier newtype.
macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            serde::Serialize,
            serde::Deserialize,
            Debug,
            Clone,
            Default,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
        )]
        pub struct $name(String);

        impl $name {
            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                $name(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                $name(id)
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                self.0.as_str()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

pub mod channel;
pub mod client;
pub mod combine;
pub mod config;
pub mod event;
pub mod history;
pub mod metadata;
pub mod open_graph;
pub mod pending;
pub mod policy;
pub mod post;
pub mod preferences;
pub mod reactions;
pub mod store;
pub mod team;
pub mod user;

pub use crate::client::Client;
pub use crate::client::Error;
pub use crate::client::UnauthenticatedClient;
pub use crate::combine::{combine_system_posts, CombinedPosts};
pub use crate::event::PostEvent;
pub use crate::post::{Post, PostId, PostList, PostType};
pub use crate::store::PostsState;
