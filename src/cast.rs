use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Errors raised while building or decoding cast records.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CastError {
    /// Author username was empty or whitespace.
    EmptyUsername,
    /// Feed payload could not be decoded.
    Json(String),
}

impl core::fmt::Display for CastError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::EmptyUsername => write!(f, "cast author username is empty"),
            Self::Json(msg) => write!(f, "invalid cast payload: {}", msg),
        }
    }
}

impl std::error::Error for CastError {}

impl From<serde_json::Error> for CastError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value.to_string())
    }
}

/// Post author.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawAuthor", rename_all = "camelCase")]
pub struct Author {
    username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAuthor {
    username: String,
    #[serde(default)]
    display_name: Option<String>,
}

impl TryFrom<RawAuthor> for Author {
    type Error = CastError;

    fn try_from(raw: RawAuthor) -> Result<Self, Self::Error> {
        Self::new(raw.username, raw.display_name)
    }
}

impl Author {
    /// Build an author, rejecting an empty username.
    pub fn new(
        username: impl Into<String>,
        display_name: Option<String>,
    ) -> Result<Self, CastError> {
        let username = username.into();
        if username.trim().is_empty() {
            return Err(CastError::EmptyUsername);
        }
        Ok(Self {
            username,
            display_name,
        })
    }

    /// Handle without the leading `@`.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Display name, or `None` when absent or blank.
    pub fn display_name(&self) -> Option<&str> {
        self.display_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
    }
}

/// A single social-media post.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cast {
    /// Post body; may contain `\n` forced breaks.
    #[serde(default)]
    pub text: String,
    /// Opaque post identifier.
    #[serde(default)]
    pub hash: String,
    pub author: Author,
    #[serde(alias = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Cast {
    pub fn new(
        text: impl Into<String>,
        hash: impl Into<String>,
        author: Author,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            text: text.into(),
            hash: hash.into(),
            author,
            created_at,
        }
    }
}
