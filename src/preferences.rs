use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::team::TeamId;
use crate::user::UserId;

use std::collections::HashMap;
use std::sync::Arc;

pub const CATEGORY_DIRECT_CHANNEL_SHOW: &str = "direct_channel_show";
pub const CATEGORY_GROUP_CHANNEL_SHOW: &str = "group_channel_show";
pub const CATEGORY_FAVORITE_CHANNEL: &str = "favorite_channel";
pub const CATEGORY_DISPLAY_SETTINGS: &str = "display_settings";
pub const CATEGORY_THEME: &str = "theme";
pub const NAME_NAME_FORMAT: &str = "name_format";

pub const TEAMMATE_NAME_DISPLAY_USERNAME: &str = "username";
pub const TEAMMATE_NAME_DISPLAY_NICKNAME_FULLNAME: &str = "nickname_full_name";
pub const TEAMMATE_NAME_DISPLAY_FULLNAME: &str = "full_name";

pub type Theme = Map<String, Value>;

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct PreferenceType {
    pub user_id: UserId,
    pub category: String,
    pub name: String,
    pub value: String,
}

pub fn preference_key(category: &str, name: &str) -> String {
    format!("{}--{}", category, name)
}

/// The current user's preferences keyed by [`preference_key`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreferencesState {
    pub my_preferences: HashMap<String, PreferenceType>,
}

impl PreferencesState {
    pub fn from_preferences<I>(preferences: I) -> Self
    where
        I: IntoIterator<Item = PreferenceType>,
    {
        let my_preferences = preferences
            .into_iter()
            .map(|preference| (preference_key(&preference.category, &preference.name), preference))
            .collect();
        PreferencesState { my_preferences }
    }

    pub fn get(&self, category: &str, name: &str) -> Option<&str> {
        self.my_preferences
            .get(&preference_key(category, name))
            .map(|preference| preference.value.as_str())
    }

    pub fn get_bool(&self, category: &str, name: &str, default: bool) -> bool {
        match self.get(category, name) {
            Some(value) => value == "true",
            None => default,
        }
    }

    pub fn get_int(&self, category: &str, name: &str, default: i64) -> i64 {
        self.get(category, name)
            .and_then(|value| value.parse().ok())
            .unwrap_or(default)
    }

    /// Every preference stored under `category`, ordered by name.
    pub fn category(&self, category: &str) -> Vec<&PreferenceType> {
        let prefix = preference_key(category, "");
        let mut preferences: Vec<&PreferenceType> = self
            .my_preferences
            .iter()
            .filter(|(key, _)| key.starts_with(&prefix))
            .map(|(_, preference)| preference)
            .collect();
        preferences.sort_by(|a, b| a.name.cmp(&b.name));
        preferences
    }

    pub fn direct_show_preferences(&self) -> Vec<&PreferenceType> {
        self.category(CATEGORY_DIRECT_CHANNEL_SHOW)
    }

    pub fn group_show_preferences(&self) -> Vec<&PreferenceType> {
        self.category(CATEGORY_GROUP_CHANNEL_SHOW)
    }

    pub fn favorites_preferences(&self) -> Vec<&str> {
        enabled_names(self.category(CATEGORY_FAVORITE_CHANNEL))
    }

    pub fn visible_teammates(&self) -> Vec<&str> {
        enabled_names(self.direct_show_preferences())
    }

    pub fn visible_group_ids(&self) -> Vec<&str> {
        enabled_names(self.group_show_preferences())
    }

    /// The server's `TeammateNameDisplay` wins over the user's own choice.
    pub fn teammate_name_display_setting<'a>(&'a self, configured: Option<&'a str>) -> &'a str {
        configured
            .filter(|setting| !setting.is_empty())
            .or_else(|| self.get(CATEGORY_DISPLAY_SETTINGS, NAME_NAME_FORMAT))
            .unwrap_or(TEAMMATE_NAME_DISPLAY_USERNAME)
    }

    pub fn theme(&self, current_team_id: Option<&TeamId>) -> Theme {
        match self.theme_source(current_team_id) {
            Some(source) => parse_theme(source),
            None => default_theme(),
        }
    }

    fn theme_source(&self, current_team_id: Option<&TeamId>) -> Option<&str> {
        let team_theme = current_team_id.and_then(|team_id| self.get(CATEGORY_THEME, team_id.as_str()));
        team_theme
            .filter(|source| !source.is_empty())
            .or_else(|| self.get(CATEGORY_THEME, ""))
            .filter(|source| !source.is_empty())
    }
}

fn enabled_names(preferences: Vec<&PreferenceType>) -> Vec<&str> {
    preferences
        .into_iter()
        .filter(|preference| preference.value == "true")
        .map(|preference| preference.name.as_str())
        .collect()
}

/// Resolves the theme once per distinct source value.
#[derive(Debug, Default)]
pub struct ThemeSelector {
    cached: Option<(Option<String>, Arc<Theme>)>,
}

impl ThemeSelector {
    pub fn new() -> Self {
        ThemeSelector::default()
    }

    pub fn select(&mut self, preferences: &PreferencesState, current_team_id: Option<&TeamId>) -> Arc<Theme> {
        let source = preferences.theme_source(current_team_id);
        if let Some((ref cached_source, ref theme)) = self.cached {
            if cached_source.as_ref().map(String::as_str) == source {
                return Arc::clone(theme);
            }
        }

        let theme = Arc::new(match source {
            Some(source) => parse_theme(source),
            None => default_theme(),
        });
        self.cached = Some((source.map(str::to_string), Arc::clone(&theme)));
        theme
    }

    pub fn style_from_theme<S, F>(&mut self, preferences: &PreferencesState, current_team_id: Option<&TeamId>, style: F) -> S
    where
        F: FnOnce(&Theme) -> S,
    {
        let theme = self.select(preferences, current_team_id);
        style(&theme)
    }
}

fn parse_theme(source: &str) -> Theme {
    let mut theme: Theme = match serde_json::from_str(source) {
        Ok(theme) => theme,
        Err(err) => {
            warn!("ignoring malformed theme preference: {}", err);
            return default_theme();
        }
    };

    let built_in = theme
        .get("type")
        .and_then(Value::as_str)
        .and_then(built_in_theme);
    if let Some(built_in) = built_in {
        for (key, value) in built_in {
            theme.entry(key).or_insert(value);
        }
    }
    theme
}

fn built_in_theme(name: &str) -> Option<Theme> {
    let theme = match name {
        "Mattermost" => json!({
            "type": "Mattermost",
            "sidebarBg": "#145dbf",
            "sidebarText": "#ffffff",
            "sidebarUnreadText": "#ffffff",
            "sidebarTextHoverBg": "#4578bf",
            "sidebarTextActiveBorder": "#579eff",
            "sidebarTextActiveColor": "#ffffff",
            "sidebarHeaderBg": "#1153ab",
            "sidebarHeaderTextColor": "#ffffff",
            "onlineIndicator": "#06d6a0",
            "awayIndicator": "#ffbc42",
            "dndIndicator": "#f74343",
            "mentionBg": "#ffffff",
            "mentionColor": "#145dbf",
            "centerChannelBg": "#ffffff",
            "centerChannelColor": "#3d3c40",
            "newMessageSeparator": "#ff8800",
            "linkColor": "#2389d7",
            "buttonBg": "#166de0",
            "buttonColor": "#ffffff",
            "errorTextColor": "#fd5960",
            "mentionHighlightBg": "#ffe577",
            "mentionHighlightLink": "#166de0",
            "codeTheme": "github"
        }),
        "Organization" => json!({
            "type": "Organization",
            "sidebarBg": "#2071a7",
            "sidebarText": "#ffffff",
            "sidebarUnreadText": "#ffffff",
            "sidebarTextHoverBg": "#136197",
            "sidebarTextActiveBorder": "#7ab0d6",
            "sidebarTextActiveColor": "#ffffff",
            "sidebarHeaderBg": "#2f81b7",
            "sidebarHeaderTextColor": "#ffffff",
            "onlineIndicator": "#7dbe00",
            "awayIndicator": "#dcbd4e",
            "dndIndicator": "#ff6a6a",
            "mentionBg": "#fbfbfb",
            "mentionColor": "#2071f7",
            "centerChannelBg": "#f2f4f8",
            "centerChannelColor": "#333333",
            "newMessageSeparator": "#ff8800",
            "linkColor": "#2f81b7",
            "buttonBg": "#1dacfc",
            "buttonColor": "#ffffff",
            "errorTextColor": "#a94442",
            "mentionHighlightBg": "#f3e197",
            "mentionHighlightLink": "#2f81b7",
            "codeTheme": "github"
        }),
        "Mattermost Dark" => json!({
            "type": "Mattermost Dark",
            "sidebarBg": "#1b2c3e",
            "sidebarText": "#ffffff",
            "sidebarUnreadText": "#ffffff",
            "sidebarTextHoverBg": "#4a5664",
            "sidebarTextActiveBorder": "#66b9a7",
            "sidebarTextActiveColor": "#ffffff",
            "sidebarHeaderBg": "#1b2c3e",
            "sidebarHeaderTextColor": "#ffffff",
            "onlineIndicator": "#65dcc8",
            "awayIndicator": "#c1b966",
            "dndIndicator": "#e81023",
            "mentionBg": "#b74a4a",
            "mentionColor": "#ffffff",
            "centerChannelBg": "#2f3e4e",
            "centerChannelColor": "#dddddd",
            "newMessageSeparator": "#5de5da",
            "linkColor": "#a4ffeb",
            "buttonBg": "#4cbba4",
            "buttonColor": "#ffffff",
            "errorTextColor": "#ff6461",
            "mentionHighlightBg": "#984063",
            "mentionHighlightLink": "#a4ffeb",
            "codeTheme": "solarized-dark"
        }),
        _ => return None,
    };

    match theme {
        Value::Object(theme) => Some(theme),
        _ => None,
    }
}

pub fn default_theme() -> Theme {
    built_in_theme("Mattermost").unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn preference(category: &str, name: &str, value: &str) -> PreferenceType {
        PreferenceType {
            user_id: UserId::from("current_user_id"),
            category: category.to_string(),
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    fn test_state() -> PreferencesState {
        PreferencesState::from_preferences(vec![
            preference("testcategory1", "testname1", "true"),
            preference(CATEGORY_DIRECT_CHANNEL_SHOW, "teammate1", "true"),
            preference(CATEGORY_DIRECT_CHANNEL_SHOW, "teammate2", "false"),
            preference(CATEGORY_GROUP_CHANNEL_SHOW, "group1", "true"),
            preference(CATEGORY_GROUP_CHANNEL_SHOW, "group2", "false"),
            preference(CATEGORY_FAVORITE_CHANNEL, "favorite1", "true"),
            preference(CATEGORY_FAVORITE_CHANNEL, "favorite2", "false"),
        ])
    }

    fn theme_state(themes: &[(&str, &str)]) -> PreferencesState {
        PreferencesState::from_preferences(
            themes
                .iter()
                .map(|(name, value)| preference(CATEGORY_THEME, name, value)),
        )
    }

    #[test]
    fn keys_join_category_and_name() {
        assert_eq!(preference_key("theme", ""), "theme--");
        assert_eq!(preference_key("display_settings", "name_format"), "display_settings--name_format");
    }

    #[test]
    fn get_preference() {
        let state = test_state();

        assert_eq!(state.get("testcategory1", "testname1"), Some("true"));
        assert_eq!(state.get("testcategory1", "missing"), None);
        assert!(state.get_bool("testcategory1", "testname1", false));
        assert!(state.get_bool("testcategory1", "missing", true));
        assert_eq!(state.get_int("testcategory1", "testname1", 7), 7);
    }

    #[test]
    fn get_int_parses_values() {
        let state = PreferencesState::from_preferences(vec![preference("advanced", "send_on_ctrl_enter", "42")]);

        assert_eq!(state.get_int("advanced", "send_on_ctrl_enter", 0), 42);
    }

    #[test]
    fn preferences_by_category() {
        let state = test_state();

        let names: Vec<&str> = state
            .direct_show_preferences()
            .iter()
            .map(|preference| preference.name.as_str())
            .collect();
        assert_eq!(names, vec!["teammate1", "teammate2"]);
        assert_eq!(state.group_show_preferences().len(), 2);
        assert_eq!(state.category("testcategory1").len(), 1);
    }

    #[test]
    fn enabled_names_by_category() {
        let state = test_state();

        assert_eq!(state.favorites_preferences(), vec!["favorite1"]);
        assert_eq!(state.visible_teammates(), vec!["teammate1"]);
        assert_eq!(state.visible_group_ids(), vec!["group1"]);
    }

    #[test]
    fn teammate_name_display_setting() {
        let preference_only = PreferencesState::from_preferences(vec![preference(
            CATEGORY_DISPLAY_SETTINGS,
            NAME_NAME_FORMAT,
            TEAMMATE_NAME_DISPLAY_FULLNAME,
        )]);
        assert_eq!(
            preference_only.teammate_name_display_setting(None),
            TEAMMATE_NAME_DISPLAY_FULLNAME
        );
        assert_eq!(
            preference_only.teammate_name_display_setting(Some(TEAMMATE_NAME_DISPLAY_NICKNAME_FULLNAME)),
            TEAMMATE_NAME_DISPLAY_NICKNAME_FULLNAME
        );

        let empty = PreferencesState::default();
        assert_eq!(
            empty.teammate_name_display_setting(Some(TEAMMATE_NAME_DISPLAY_NICKNAME_FULLNAME)),
            TEAMMATE_NAME_DISPLAY_NICKNAME_FULLNAME
        );
        assert_eq!(empty.teammate_name_display_setting(None), TEAMMATE_NAME_DISPLAY_USERNAME);
    }

    #[test]
    fn default_theme_without_preference() {
        let theme = PreferencesState::default().theme(Some(&TeamId::from("team_id")));

        assert_eq!(theme, default_theme());
        assert_eq!(theme["sidebarBg"], json!("#145dbf"));
        assert_eq!(theme["type"], json!("Mattermost"));
    }

    #[test]
    fn custom_theme() {
        let state = theme_state(&[("", r##"{"sidebarBg":"#ff0000"}"##)]);

        let theme = state.theme(Some(&TeamId::from("team_id")));
        assert_eq!(Value::Object(theme), json!({"sidebarBg": "#ff0000"}));
    }

    #[test]
    fn team_specific_theme() {
        let state = theme_state(&[
            ("", "{}"),
            ("team_id", r##"{"sidebarBg":"#ff0000"}"##),
            ("other_team_id", "{}"),
        ]);

        let theme = state.theme(Some(&TeamId::from("team_id")));
        assert_eq!(Value::Object(theme), json!({"sidebarBg": "#ff0000"}));
        assert!(state.theme(Some(&TeamId::from("other_team_id"))).is_empty());
    }

    #[test]
    fn built_in_theme_fills_missing_keys() {
        let state = theme_state(&[("", r##"{"type":"Mattermost Dark","sidebarBg":"#000000"}"##)]);

        let theme = state.theme(None);
        assert_eq!(theme["sidebarBg"], json!("#000000"));
        assert_eq!(theme["codeTheme"], json!("solarized-dark"));
    }

    #[test]
    fn malformed_theme_falls_back_to_default() {
        let state = theme_state(&[("", "not json")]);

        assert_eq!(state.theme(None), default_theme());
    }

    #[test]
    fn theme_selector_memoizes() {
        let team_id = TeamId::from("team_id");
        let mut selector = ThemeSelector::new();
        let mut state = theme_state(&[
            ("", "{}"),
            ("team_id", r##"{"sidebarBg":"#ff0000"}"##),
            ("other_team_id", "{}"),
        ]);

        let before = selector.select(&state, Some(&team_id));
        assert!(Arc::ptr_eq(&before, &selector.select(&state, Some(&team_id))));

        let unrelated = preference("other_category", "name", "value");
        state
            .my_preferences
            .insert(preference_key(&unrelated.category, &unrelated.name), unrelated);
        assert!(Arc::ptr_eq(&before, &selector.select(&state, Some(&team_id))));

        let changed = preference(CATEGORY_THEME, "team_id", r##"{"sidebarBg":"#0000ff"}"##);
        state
            .my_preferences
            .insert(preference_key(&changed.category, &changed.name), changed);
        let after = selector.select(&state, Some(&team_id));
        assert!(!Arc::ptr_eq(&before, &after));
        assert_ne!(*before, *after);
    }

    #[test]
    fn style_from_theme() {
        let state = theme_state(&[("", r##"{"themeColor":"#ffffff"}"##)]);
        let mut selector = ThemeSelector::new();

        let background = selector.style_from_theme(&state, None, |theme| {
            theme
                .get("themeColor")
                .and_then(Value::as_str)
                .map(str::to_string)
        });
        assert_eq!(background, Some("#ffffff".to_string()));
    }
}
