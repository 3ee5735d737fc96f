use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::api::types::Post;
use crate::store::channels::{ChannelCollection, ChannelKey};

/// Reserved query that selects the home timeline. Never produced from user
/// text matching; only an exact query equal to it counts.
pub const HOME_TIMELINE: &str = "home_timeline";

static REPLY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bre:(\d+)\b").expect("valid reply pattern"));
static CONVERSATION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bconv:(\d+)\b").expect("valid conversation pattern"));

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// A named query, saved or typed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub name: String,
    pub query: String,
}

impl Channel {
    pub fn new(name: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            query: query.into(),
        }
    }

    /// Transient channel for a typed query; never stored.
    pub fn adhoc(query: &str) -> Self {
        Self::new(query, query)
    }

    pub fn retrieval(&self) -> Retrieval {
        Retrieval::resolve(&self.query)
    }

    /// Request for the first page of this channel.
    pub fn request(&self) -> FetchRequest {
        FetchRequest {
            retrieval: self.retrieval(),
            max: None,
        }
    }

    /// Request for results older than (and including) `max`.
    pub fn request_older(&self, max: impl Into<String>) -> FetchRequest {
        FetchRequest {
            retrieval: self.retrieval(),
            max: Some(max.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Retrieval modes
// ---------------------------------------------------------------------------

/// Which backend endpoint a query maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Retrieval {
    HomeTimeline,
    /// Direct replies to `tweet_id`, plus the tweet itself.
    Reply { tweet_id: String },
    /// The whole conversation containing `tweet_id`.
    Conversation { tweet_id: String },
    Search { query: String },
}

impl Retrieval {
    /// Map a query string to a retrieval mode. First match wins:
    /// the home sentinel, then `re:<id>`, then `conv:<id>`, then search.
    ///
    /// The id patterns match anywhere in the query, so `foo re:1 bar` is a
    /// reply lookup and the surrounding words are ignored.
    pub fn resolve(query: &str) -> Self {
        if query == HOME_TIMELINE {
            return Retrieval::HomeTimeline;
        }
        if let Some(caps) = REPLY_PATTERN.captures(query) {
            return Retrieval::Reply {
                tweet_id: caps[1].to_string(),
            };
        }
        if let Some(caps) = CONVERSATION_PATTERN.captures(query) {
            return Retrieval::Conversation {
                tweet_id: caps[1].to_string(),
            };
        }
        Retrieval::Search {
            query: query.to_string(),
        }
    }

    /// Client-side filter applied to the raw endpoint result.
    pub fn filter(&self, posts: Vec<Post>) -> Vec<Post> {
        match self {
            Retrieval::Reply { tweet_id } => posts
                .into_iter()
                .filter(|p| {
                    p.id == *tweet_id
                        || p.in_reply_to_status_id_str.as_deref() == Some(tweet_id.as_str())
                })
                .collect(),
            _ => posts,
        }
    }

    pub fn label(&self) -> Cow<'_, str> {
        match self {
            Retrieval::HomeTimeline => "home".into(),
            Retrieval::Reply { tweet_id } => format!("replies to {tweet_id}").into(),
            Retrieval::Conversation { tweet_id } => format!("conversation {tweet_id}").into(),
            Retrieval::Search { query } => format!("search \"{query}\"").into(),
        }
    }
}

/// A resolved retrieval plus optional upper-bound cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub retrieval: Retrieval,
    pub max: Option<String>,
}

// ---------------------------------------------------------------------------
// Active selection
// ---------------------------------------------------------------------------

/// Snapshot of what the timeline should show.
///
/// A non-empty `query` always wins over `channel`. The snapshot is replaced
/// whole on every change, never edited in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveSelection {
    pub query: String,
    pub channel: Option<ChannelKey>,
}

impl ActiveSelection {
    pub fn saved(key: ChannelKey) -> Self {
        Self {
            query: String::new(),
            channel: Some(key),
        }
    }

    /// Typed query, keeping `fallback` as the channel to return to on clear.
    pub fn adhoc(query: impl Into<String>, fallback: Option<ChannelKey>) -> Self {
        Self {
            query: query.into(),
            channel: fallback,
        }
    }

    pub fn is_adhoc(&self) -> bool {
        !self.query.is_empty()
    }

    /// The channel currently driving retrieval, if any.
    pub fn effective_channel<'a>(&self, channels: &'a ChannelCollection) -> Option<Cow<'a, Channel>> {
        if !self.query.is_empty() {
            return Some(Cow::Owned(Channel::adhoc(&self.query)));
        }
        self.channel
            .and_then(|key| channels.get(key))
            .map(Cow::Borrowed)
    }
}

// ---------------------------------------------------------------------------
// Deep links
// ---------------------------------------------------------------------------

/// Extract the `q` parameter from a deep link.
///
/// Accepts a full URL (`https://host/?q=...`), a bare query string
/// (`?q=...` or `q=...`). Returns `None` when no `q` is present.
pub fn deep_link_query(link: &str) -> Option<String> {
    let link = link.trim();
    let parsed = url::Url::parse(link).or_else(|_| {
        let rest = link.trim_start_matches('?');
        url::Url::parse(&format!("lucerne://local/?{rest}"))
    });
    let parsed = parsed.ok()?;
    parsed
        .query_pairs()
        .find(|(k, _)| k == "q")
        .map(|(_, v)| v.into_owned())
}

/// Selection for a deep link: the saved channel whose query equals `q`,
/// else an ad-hoc query, else the first saved channel.
pub fn resolve_deep_link(q: Option<&str>, channels: &ChannelCollection) -> ActiveSelection {
    match q.filter(|q| !q.is_empty()) {
        Some(q) => match channels.find_by_query(q) {
            Some(key) => ActiveSelection::saved(key),
            None => ActiveSelection::adhoc(q, channels.first_key()),
        },
        None => ActiveSelection {
            query: String::new(),
            channel: channels.first_key(),
        },
    }
}

/// Selection once the channel list arrives. The launch link applies only if
/// nothing was picked meanwhile; otherwise the current pick is kept, with a
/// typed query given the first channel as its fallback.
pub fn selection_after_load(
    current: &ActiveSelection,
    launch: Option<&str>,
    channels: &ChannelCollection,
) -> ActiveSelection {
    if *current == ActiveSelection::default() {
        return resolve_deep_link(launch, channels);
    }
    let channel = current
        .channel
        .filter(|key| channels.get(*key).is_some())
        .or_else(|| channels.first_key());
    ActiveSelection {
        query: current.query.clone(),
        channel,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn post(id: &str, reply_to: Option<&str>) -> Post {
        let mut json = serde_json::json!({ "id_str": id });
        if let Some(parent) = reply_to {
            json["in_reply_to_status_id_str"] = parent.into();
        }
        serde_json::from_value(json).unwrap()
    }

    fn collection(entries: &[(&str, &str)]) -> ChannelCollection {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut channels = ChannelCollection::new(tx);
        channels.reset(entries.iter().map(|(n, q)| Channel::new(*n, *q)).collect());
        channels
    }

    #[test]
    fn home_sentinel_resolves_to_home() {
        assert_eq!(Retrieval::resolve("home_timeline"), Retrieval::HomeTimeline);
        // Only the exact sentinel counts.
        assert_eq!(
            Retrieval::resolve("home_timeline cats"),
            Retrieval::Search {
                query: "home_timeline cats".into()
            }
        );
    }

    #[test]
    fn reply_and_conversation_patterns() {
        assert_eq!(
            Retrieval::resolve("re:42"),
            Retrieval::Reply {
                tweet_id: "42".into()
            }
        );
        assert_eq!(
            Retrieval::resolve("conv:42"),
            Retrieval::Conversation {
                tweet_id: "42".into()
            }
        );
    }

    #[test]
    fn reply_wins_when_both_patterns_appear() {
        assert_eq!(
            Retrieval::resolve("conv:1 re:2"),
            Retrieval::Reply {
                tweet_id: "2".into()
            }
        );
    }

    #[test]
    fn pattern_matches_inside_longer_query() {
        assert_eq!(
            Retrieval::resolve("foo re:123 bar"),
            Retrieval::Reply {
                tweet_id: "123".into()
            }
        );
        // Word boundary: "pre:5" is not a reply lookup.
        assert_eq!(
            Retrieval::resolve("pre:5"),
            Retrieval::Search {
                query: "pre:5".into()
            }
        );
    }

    #[test]
    fn anything_else_is_a_literal_search() {
        assert_eq!(
            Retrieval::resolve("has:thesephist.com"),
            Retrieval::Search {
                query: "has:thesephist.com".into()
            }
        );
    }

    #[test]
    fn reply_filter_keeps_replies_and_root() {
        let retrieval = Retrieval::resolve("re:42");
        let posts = vec![
            post("42", None),
            post("43", Some("42")),
            post("44", Some("43")),
            post("45", None),
        ];
        let ids: Vec<String> = retrieval.filter(posts).into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["42", "43"]);
    }

    #[test]
    fn conversation_is_unfiltered() {
        let retrieval = Retrieval::resolve("conv:42");
        let posts = vec![post("42", None), post("44", Some("43"))];
        assert_eq!(retrieval.filter(posts).len(), 2);
    }

    #[test]
    fn request_carries_cursor() {
        let req = Channel::adhoc("rust").request_older("99");
        assert_eq!(req.max.as_deref(), Some("99"));
        assert_eq!(
            req.retrieval,
            Retrieval::Search {
                query: "rust".into()
            }
        );
    }

    #[test]
    fn typed_query_takes_precedence() {
        let channels = collection(&[("home", HOME_TIMELINE)]);
        let key = channels.first_key().unwrap();
        let selection = ActiveSelection::adhoc("cats", Some(key));
        let effective = selection.effective_channel(&channels).unwrap();
        assert_eq!(effective.name, "cats");
        assert_eq!(effective.query, "cats");

        let saved = ActiveSelection::saved(key);
        assert_eq!(saved.effective_channel(&channels).unwrap().query, HOME_TIMELINE);
    }

    #[test]
    fn deep_link_parsing() {
        assert_eq!(
            deep_link_query("https://lucerne.example/?q=re%3A42").as_deref(),
            Some("re:42")
        );
        assert_eq!(deep_link_query("?q=rust+lang").as_deref(), Some("rust lang"));
        assert_eq!(deep_link_query("q=cats").as_deref(), Some("cats"));
        assert_eq!(deep_link_query("https://lucerne.example/"), None);
    }

    #[test]
    fn deep_link_resolution_order() {
        let channels = collection(&[("home", HOME_TIMELINE), ("rust", "#rustlang")]);
        let keys: Vec<ChannelKey> = channels.iter().map(|(k, _)| k).collect();

        assert_eq!(
            resolve_deep_link(Some("#rustlang"), &channels),
            ActiveSelection::saved(keys[1])
        );

        let adhoc = resolve_deep_link(Some("cats"), &channels);
        assert_eq!(adhoc.query, "cats");

        assert_eq!(
            resolve_deep_link(None, &channels),
            ActiveSelection::saved(keys[0])
        );
    }

    #[test]
    fn selection_after_load_applies_launch_link_when_untouched() {
        let channels = collection(&[("home", HOME_TIMELINE), ("rust", "#rustlang")]);
        let selection =
            selection_after_load(&ActiveSelection::default(), Some("#rustlang"), &channels);
        assert_eq!(selection, ActiveSelection::saved(channels.key_at(1).unwrap()));
    }

    #[test]
    fn selection_after_load_keeps_query_typed_before_load() {
        let channels = collection(&[("home", HOME_TIMELINE)]);
        let typed = ActiveSelection::adhoc("conv:9", None);
        let selection = selection_after_load(&typed, Some("#rustlang"), &channels);
        assert_eq!(selection.query, "conv:9");
        assert_eq!(selection.channel, channels.first_key());
    }
}
