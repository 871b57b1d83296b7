use serde::{Deserialize, Serialize};

id_type!(UserId);

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub create_at: i64,
    pub update_at: i64,
    pub delete_at: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub nickname: String,
    pub email: String,
    pub email_verified: bool,
    pub auth_service: String,
    pub roles: String,
    pub locale: String,
    #[serde(default)]
    pub notify_props: UserNotifyProps,
    //pub props: object,
    pub last_password_update: i64,
    pub last_picture_update: i64,
    pub failed_attempts: Option<i64>,
    pub mfa_active: Option<bool>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotifyOption {
    All,
    Mention,
    None,
}

impl Default for NotifyOption {
    fn default() -> Self {
        NotifyOption::Mention
    }
}

/// Which replies count as mentions of the user.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CommentsNotify {
    /// Threads the user started or replied to.
    Any,
    /// Only threads the user started.
    Root,
    Never,
}

impl Default for CommentsNotify {
    fn default() -> Self {
        CommentsNotify::Never
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct UserNotifyProps {
    #[serde(with = "string_boolean")]
    pub email: bool,
    pub push: NotifyOption,
    pub desktop: NotifyOption,
    #[serde(with = "string_boolean")]
    pub desktop_sound: bool,
    pub mention_keys: String,
    #[serde(with = "string_boolean")]
    pub channel: bool,
    #[serde(with = "string_boolean")]
    pub first_name: bool,
    pub comments: CommentsNotify,
}

mod string_boolean {
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize, Debug)]
    #[serde(rename_all = "snake_case")]
    enum StringBoolean {
        True,
        False,
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        match StringBoolean::deserialize(deserializer)? {
            StringBoolean::True => Ok(true),
            StringBoolean::False => Ok(false),
        }
    }

    pub fn serialize<S>(is_true: &bool, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if *is_true {
            serializer.serialize_str("true")
        } else {
            serializer.serialize_str("false")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn notify_props_read_string_booleans() {
        let props: UserNotifyProps = serde_json::from_value(json!({
            "email": "true",
            "push": "mention",
            "desktop": "all",
            "desktop_sound": "false",
            "mention_keys": "wes,@wes",
            "channel": "true",
            "first_name": "false",
            "comments": "root"
        }))
        .unwrap();

        assert!(props.email);
        assert!(!props.desktop_sound);
        assert_eq!(props.desktop, NotifyOption::All);
        assert_eq!(props.comments, CommentsNotify::Root);
    }

    #[test]
    fn missing_notify_props_use_defaults() {
        let props: UserNotifyProps = serde_json::from_value(json!({"email": "true"})).unwrap();

        assert!(props.email);
        assert_eq!(props.push, NotifyOption::Mention);
        assert_eq!(props.comments, CommentsNotify::Never);
        assert_eq!(
            serde_json::to_value(&props).unwrap()["channel"],
            json!("false")
        );
    }
}
