use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Response wrappers
// ---------------------------------------------------------------------------

/// `{ "data": ... }` envelope used by the stats endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataResponse<T> {
    pub data: T,
}

/// `GET /search` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub statuses: Vec<Post>,
}

// ---------------------------------------------------------------------------
// Post
// ---------------------------------------------------------------------------

/// A timeline post as served by the backend.
///
/// Retweets and quotes embed another full [`Post`], so a post is a small tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    #[serde(rename = "id_str")]
    pub id: String,
    #[serde(default, with = "created_at_format")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub full_text: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub user: Option<PostAuthor>,
    #[serde(default)]
    pub in_reply_to_status_id_str: Option<String>,
    #[serde(default)]
    pub in_reply_to_screen_name: Option<String>,
    #[serde(default)]
    pub is_quote_status: bool,
    #[serde(default)]
    pub retweeted_status: Option<Box<Post>>,
    #[serde(default)]
    pub quoted_status: Option<Box<Post>>,
    #[serde(default)]
    pub retweet_count: u64,
    #[serde(default)]
    pub favorite_count: u64,
    #[serde(default)]
    pub entities: Option<PostEntities>,
    #[serde(default)]
    pub extended_entities: Option<PostEntities>,
}

impl Post {
    pub fn is_quote(&self) -> bool {
        self.is_quote_status && self.quoted_status.is_some()
    }

    pub fn is_retweet(&self) -> bool {
        self.retweeted_status.is_some() && !self.is_quote()
    }

    pub fn is_reply(&self) -> bool {
        self.in_reply_to_status_id_str.is_some()
    }

    /// Body text, preferring the untruncated `full_text`.
    pub fn body(&self) -> &str {
        self.full_text
            .as_deref()
            .or(self.text.as_deref())
            .unwrap_or_default()
    }

    pub fn screen_name(&self) -> &str {
        self.user
            .as_ref()
            .map(|u| u.screen_name.as_str())
            .unwrap_or("unknown")
    }

    /// Numeric value of the id, used for ordering and pagination cursors.
    pub fn numeric_id(&self) -> Option<u64> {
        self.id.parse().ok()
    }

    /// Media attachments. `extended_entities` carries the complete list when
    /// present; plain `entities` only ever holds the first item.
    pub fn media(&self) -> &[MediaEntity] {
        self.extended_entities
            .as_ref()
            .filter(|e| !e.media.is_empty())
            .or(self.entities.as_ref())
            .map(|e| e.media.as_slice())
            .unwrap_or_default()
    }

    pub fn permalink(&self) -> String {
        format!(
            "https://twitter.com/{}/status/{}",
            self.screen_name(),
            self.id
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostAuthor {
    pub screen_name: String,
    #[serde(default)]
    pub name: String,
}

// ---------------------------------------------------------------------------
// Post entities (code-point `indices` pairs)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostEntities {
    #[serde(default)]
    pub hashtags: Vec<HashtagEntity>,
    #[serde(default)]
    pub urls: Vec<UrlEntity>,
    #[serde(default)]
    pub user_mentions: Vec<MentionEntity>,
    #[serde(default)]
    pub media: Vec<MediaEntity>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashtagEntity {
    #[serde(default)]
    pub indices: Option<Vec<i64>>,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlEntity {
    #[serde(default)]
    pub indices: Option<Vec<i64>>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub expanded_url: Option<String>,
    #[serde(default)]
    pub display_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MentionEntity {
    #[serde(default)]
    pub indices: Option<Vec<i64>>,
    #[serde(default)]
    pub screen_name: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaEntity {
    #[serde(default)]
    pub indices: Option<Vec<i64>>,
    #[serde(rename = "type", default)]
    pub type_: Option<String>,
    #[serde(default)]
    pub media_url_https: Option<String>,
    #[serde(default)]
    pub expanded_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Engagement metrics feed (`/trends`)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricTweet {
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub public_metrics: Option<TweetMetrics>,
    #[serde(default)]
    pub entities: MetricEntities,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TweetMetrics {
    #[serde(default)]
    pub retweet_count: u64,
    #[serde(default)]
    pub reply_count: u64,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub quote_count: u64,
    #[serde(default)]
    pub impression_count: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricEntities {
    #[serde(default)]
    pub hashtags: Vec<TagSpan>,
    #[serde(default)]
    pub urls: Vec<UrlSpan>,
    #[serde(default)]
    pub mentions: Vec<MentionSpan>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagSpan {
    #[serde(default)]
    pub start: Option<i64>,
    #[serde(default)]
    pub end: Option<i64>,
    #[serde(default)]
    pub tag: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlSpan {
    #[serde(default)]
    pub start: Option<i64>,
    #[serde(default)]
    pub end: Option<i64>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub display_url: Option<String>,
    #[serde(default)]
    pub expanded_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MentionSpan {
    #[serde(default)]
    pub start: Option<i64>,
    #[serde(default)]
    pub end: Option<i64>,
    #[serde(default)]
    pub username: String,
}

// ---------------------------------------------------------------------------
// Users (`/followers`, `/self`)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub public_metrics: Option<UserMetrics>,
    #[serde(default)]
    pub entities: UserEntities,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserMetrics {
    #[serde(default)]
    pub followers_count: u64,
    #[serde(default)]
    pub following_count: u64,
    #[serde(default)]
    pub tweet_count: u64,
    #[serde(default)]
    pub listed_count: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserEntities {
    #[serde(default)]
    pub url: Option<UrlList>,
    #[serde(default)]
    pub description: Option<UrlList>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UrlList {
    #[serde(default)]
    pub urls: Vec<UrlSpan>,
}

/// `GET /self` payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelfSummary {
    #[serde(default)]
    pub public_metrics: UserMetrics,
}

// ---------------------------------------------------------------------------
// created_at: "Wed Oct 10 20:19:24 +0000 2018"
// ---------------------------------------------------------------------------

mod created_at_format {
    use super::*;
    use serde::Serializer;

    const FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(dt) => serializer.serialize_str(&dt.format(FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let Some(raw) = Option::<String>::deserialize(deserializer)? else {
            return Ok(None);
        };
        // Tolerate RFC 3339 as well; some backends re-serialize dates.
        let parsed =
            DateTime::parse_from_str(&raw, FORMAT).or_else(|_| DateTime::parse_from_rfc3339(&raw));
        match parsed {
            Ok(dt) => Ok(Some(dt.with_timezone(&Utc))),
            Err(e) => {
                tracing::warn!(created_at = %raw, "unparseable created_at, ignoring: {e}");
                Ok(None)
            }
        }
    }
}
