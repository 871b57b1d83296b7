extern crate mattermost_store as mattermost;

use std::error::Error as StdError;

use dotenv::dotenv;
use log::{info, warn};

use mattermost::config::Config;
use mattermost::post::should_filter_join_leave_post;
use mattermost::{PostEvent, PostsState, UnauthenticatedClient};

fn main() -> Result<(), Box<dyn StdError>> {
    dotenv().ok();
    env_logger::init();

    let config = Config::from_env()?;
    let client = UnauthenticatedClient::new(config.url.clone())?;

    let mut rt = tokio::runtime::Runtime::new()?;

    let client = client.authenticate(config.login_id.clone(), config.password.clone(), None);
    let client = rt.block_on(client)?;
    info!("logged in as {}", client.user().username);

    let channel_id = match config.channel_id {
        Some(ref channel_id) => channel_id,
        None => {
            warn!("MATTERMOST_CHANNEL not set, nothing to show");
            eprintln!("Client = {:?}", client);
            return Ok(());
        }
    };

    let posts = rt.block_on(client.get_posts_for_channel(channel_id, 0, config.per_page))?;
    info!("received {} posts", posts.order.len());

    let state = PostsState::default().reduce(&PostEvent::ReceivedPosts {
        channel_id: Some(channel_id.clone()),
        posts,
        skip_add_to_channel: false,
    });

    let combined = state.combined_posts_for_channel(channel_id);
    let username = client.user().username.as_str();
    // Oldest first, like a chat window
    for post_id in combined.posts_for_channel.iter().rev() {
        let post = match combined.next_posts.get(post_id) {
            Some(post) => post,
            None => continue,
        };
        if should_filter_join_leave_post(post, config.show_join_leave, Some(username)) {
            continue;
        }
        if post.is_combined() {
            println!("{} [{} membership changes]", post.create_at, post.system_post_ids.len());
        } else {
            println!("{} {}: {}", post.create_at, post.user_id, post.message);
        }
    }

    Ok(())
}
