use thiserror::Error;
use url::Url;

use crate::channel::ChannelId;

use std::env;

pub const DEFAULT_PER_PAGE: u32 = 60;

const URL_VAR: &str = "MATTERMOST_URL";
const USER_VAR: &str = "MATTERMOST_USER";
const PASS_VAR: &str = "MATTERMOST_PASS";
const CHANNEL_VAR: &str = "MATTERMOST_CHANNEL";
const PER_PAGE_VAR: &str = "MATTERMOST_PER_PAGE";
const SHOW_JOIN_LEAVE_VAR: &str = "MATTERMOST_SHOW_JOIN_LEAVE";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("MATTERMOST_URL is not a valid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("{name} must be a number, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub url: Url,
    pub login_id: String,
    pub password: String,
    pub channel_id: Option<ChannelId>,
    pub per_page: u32,
    pub show_join_leave: bool,
}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        Config::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| lookup(name).ok_or(ConfigError::Missing(name));

        let url = Url::parse(&required(URL_VAR)?)?;
        let login_id = required(USER_VAR)?;
        let password = required(PASS_VAR)?;
        let channel_id = lookup(CHANNEL_VAR)
            .filter(|id| !id.is_empty())
            .map(ChannelId::from);
        let per_page = match lookup(PER_PAGE_VAR) {
            Some(value) => value.parse().map_err(|_| ConfigError::InvalidNumber {
                name: PER_PAGE_VAR,
                value,
            })?,
            None => DEFAULT_PER_PAGE,
        };
        let show_join_leave = lookup(SHOW_JOIN_LEAVE_VAR).map_or(true, |value| value != "false");

        Ok(Config {
            url,
            login_id,
            password,
            channel_id,
            per_page,
            show_join_leave,
        })
    }
}
