//! Domain records decoded from the Conduit API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The authenticated user.
///
/// On the wire the fields are always wrapped in a single-key envelope,
/// `{"user": {"token": ..., "username": ..., "image": ...}}`, both when the
/// server sends it and when the credential store persists it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "UserEnvelope", into = "UserEnvelope")]
pub struct User {
    pub token: String,
    pub username: String,
    pub image: Option<String>,
}

impl User {
    pub fn new(token: impl Into<String>, username: impl Into<String>, image: Option<String>) -> Self {
        Self {
            token: token.into(),
            username: username.into(),
            image,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct UserEnvelope {
    user: UserFields,
}

#[derive(Serialize, Deserialize)]
struct UserFields {
    token: String,
    username: String,
    image: Option<String>,
}

impl From<UserEnvelope> for User {
    fn from(envelope: UserEnvelope) -> Self {
        let UserFields {
            token,
            username,
            image,
        } = envelope.user;
        Self {
            token,
            username,
            image,
        }
    }
}

impl From<User> for UserEnvelope {
    fn from(user: User) -> Self {
        Self {
            user: UserFields {
                token: user.token,
                username: user.username,
                image: user.image,
            },
        }
    }
}

/// Stable identity of an article
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slug(String);

impl Slug {
    pub fn new(slug: impl Into<String>) -> Self {
        Self(slug.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Slug {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Slug {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for Slug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub slug: Slug,
    pub title: String,
    pub description: String,
    pub body: String,
    pub tag_list: Vec<String>,
    #[serde(with = "conduit_date")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "conduit_date")]
    pub updated_at: DateTime<Utc>,
    pub favorited: bool,
    pub favorites_count: i64,
    pub author: Author,
}

impl Article {
    pub fn id(&self) -> &Slug {
        &self.slug
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub username: String,
    pub bio: Option<String>,
    pub image: String,
    pub following: bool,
}

/// `GET /api/articles` response body
#[derive(Debug, Clone, Deserialize)]
pub struct ArticlesEnvelope {
    pub articles: Vec<Article>,
}

/// `POST /api/users/login` request body
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub user: LoginCredentials,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: LoginCredentials {
                email: email.into(),
                password: password.into(),
            },
        }
    }
}

/// Timestamps in the fixed API format `yyyy-MM-dd'T'HH:mm:ss.SSS` plus a UTC
/// offset (`Z` or `+HH:MM`). Values are always normalised to UTC.
pub mod conduit_date {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    const LOCAL_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";
    const OFFSET_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%:z";

    pub fn parse(raw: &str) -> Result<DateTime<Utc>, String> {
        let parsed = match raw.strip_suffix('Z') {
            Some(local) => NaiveDateTime::parse_from_str(local, LOCAL_FORMAT).map(|naive| naive.and_utc()),
            None => DateTime::parse_from_str(raw, OFFSET_FORMAT).map(|dt| dt.with_timezone(&Utc)),
        };
        parsed.map_err(|e| format!("invalid timestamp '{}': {}", raw, e))
    }

    pub fn format(value: &DateTime<Utc>) -> String {
        value.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(de::Error::custom)
    }
}
