use serde::{Deserialize, Deserializer, Serialize};

/// Lightweight projection of a person who authored, commented on, or liked
/// something. One row per `user_id`, regardless of blog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderUser {
    #[serde(alias = "ID")]
    pub user_id: i64,
    #[serde(default, alias = "site_ID", deserialize_with = "null_as_zero")]
    pub blog_id: i64,
    #[serde(default, alias = "login", alias = "username", deserialize_with = "null_as_empty")]
    pub user_name: String,
    #[serde(default, alias = "name", deserialize_with = "null_as_empty")]
    pub display_name: String,
    #[serde(default, alias = "URL", deserialize_with = "null_as_empty")]
    pub url: String,
    #[serde(default, alias = "profile_URL", deserialize_with = "null_as_empty")]
    pub profile_url: String,
    #[serde(default, alias = "avatar_URL", deserialize_with = "null_as_empty")]
    pub avatar_url: String,
}

impl ReaderUser {
    /// Decode a user object as returned by the REST API (`ID`, `site_ID`,
    /// `login`, `name`, `URL`, `profile_URL`, `avatar_URL`).
    pub fn from_json(value: serde_json::Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }

    pub fn has_avatar(&self) -> bool {
        !self.avatar_url.is_empty()
    }
}

// The API sends `null` for missing strings and site ids.
fn null_as_empty<'de, D>(d: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
}

fn null_as_zero<'de, D>(d: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<i64>::deserialize(d)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_api_json() {
        let user = ReaderUser::from_json(json!({
            "ID": 42,
            "site_ID": 7,
            "login": "ada",
            "name": "Ada Lovelace",
            "URL": "https://ada.example",
            "profile_URL": "https://en.gravatar.com/ada",
            "avatar_URL": "https://0.gravatar.com/avatar/abc?s=96"
        }))
        .unwrap();

        assert_eq!(user.user_id, 42);
        assert_eq!(user.blog_id, 7);
        assert_eq!(user.user_name, "ada");
        assert_eq!(user.display_name, "Ada Lovelace");
        assert!(user.has_avatar());
    }

    #[test]
    fn test_nulls_and_missing_fields() {
        let user = ReaderUser::from_json(json!({
            "ID": 5,
            "site_ID": null,
            "name": null
        }))
        .unwrap();

        assert_eq!(user.blog_id, 0);
        assert_eq!(user.display_name, "");
        assert_eq!(user.url, "");
        assert!(!user.has_avatar());
    }

    #[test]
    fn test_missing_id_is_rejected() {
        assert!(ReaderUser::from_json(json!({ "name": "nobody" })).is_err());
    }
}
