//! Fetch orchestration for the main timeline.
//!
//! The orchestrator never performs I/O. It hands out [`FetchTicket`]s for the
//! event loop to execute and later decides, from the ticket's generation,
//! whether a result may still touch the [`TweetStore`].

use crate::api::types::Post;
use crate::channel::{ActiveSelection, FetchRequest};
use crate::store::channels::ChannelCollection;
use crate::store::tweets::TweetStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    /// First page; replaces the store.
    Refresh,
    /// Older page; merged into the store.
    Older,
}

/// One request the event loop should run, tagged with the generation its
/// result must match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub generation: u64,
    pub kind: FetchKind,
    pub query: String,
    pub request: FetchRequest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Phase {
    Idle,
    Loading {
        generation: u64,
        kind: FetchKind,
        query: String,
    },
}

/// What happened to a completed fetch.
#[derive(Debug, PartialEq, Eq)]
pub enum Completion<E> {
    /// The store was replaced with this many posts.
    Replaced(usize),
    /// This many new posts were merged in.
    Merged(usize),
    /// The selection moved on while the request was out; result dropped.
    Stale,
    /// Current request failed. Store untouched.
    Failed(E),
}

#[derive(Debug)]
pub struct FeedOrchestrator {
    generation: u64,
    phase: Phase,
    /// Query whose results the store currently holds.
    applied: Option<String>,
}

impl Default for FeedOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedOrchestrator {
    pub fn new() -> Self {
        Self {
            generation: 0,
            phase: Phase::Idle,
            applied: None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.phase, Phase::Loading { .. })
    }

    /// Query the displayed posts belong to.
    pub fn applied_query(&self) -> Option<&str> {
        self.applied.as_deref()
    }

    /// React to a (possibly unchanged) selection. Returns a ticket when a
    /// new first-page fetch is needed.
    pub fn sync(
        &mut self,
        selection: &ActiveSelection,
        channels: &ChannelCollection,
    ) -> Option<FetchTicket> {
        let Some(channel) = selection.effective_channel(channels) else {
            self.abandon("no effective channel");
            return None;
        };
        let query = channel.query.as_str();

        let displayed = self.applied.as_deref() == Some(query);
        if let Phase::Loading {
            query: in_flight,
            kind,
            ..
        } = &self.phase
            && in_flight == query
            && (*kind == FetchKind::Refresh || displayed)
        {
            return None;
        }
        if displayed {
            // Already on screen. Anything still in flight belongs to a
            // selection the user has left.
            self.abandon("selection returned to displayed query");
            return None;
        }

        let request = channel.request();
        Some(self.issue(FetchKind::Refresh, query.to_string(), request))
    }

    /// Ticket for the page older than everything on display. Only issued
    /// while idle and while the store matches the current selection.
    pub fn load_more(
        &mut self,
        selection: &ActiveSelection,
        channels: &ChannelCollection,
        tweets: &TweetStore,
    ) -> Option<FetchTicket> {
        if self.is_loading() {
            return None;
        }
        let channel = selection.effective_channel(channels)?;
        if self.applied.as_deref() != Some(channel.query.as_str()) {
            return None;
        }
        let cursor = tweets.min_id()?;
        let request = channel.request_older(cursor);
        Some(self.issue(FetchKind::Older, channel.query.clone(), request))
    }

    /// Forget what is displayed so the next [`sync`](Self::sync) refetches.
    pub fn invalidate(&mut self) {
        self.applied = None;
    }

    /// Apply or discard the result for `generation`.
    pub fn complete<E>(
        &mut self,
        generation: u64,
        result: Result<Vec<Post>, E>,
        tweets: &mut TweetStore,
    ) -> Completion<E> {
        match &self.phase {
            Phase::Loading {
                generation: current,
                ..
            } if *current == generation => {}
            Phase::Loading {
                generation: current,
                ..
            } => {
                tracing::debug!(generation, current, "dropping stale result");
                return Completion::Stale;
            }
            Phase::Idle => {
                tracing::debug!(generation, "dropping result, nothing in flight");
                return Completion::Stale;
            }
        }
        let Phase::Loading { kind, query, .. } = std::mem::replace(&mut self.phase, Phase::Idle)
        else {
            return Completion::Stale;
        };

        match (result, kind) {
            (Ok(posts), FetchKind::Refresh) => {
                tweets.reset(posts);
                tracing::info!(query = %query, count = tweets.len(), "timeline replaced");
                self.applied = Some(query);
                Completion::Replaced(tweets.len())
            }
            (Ok(posts), FetchKind::Older) => {
                let added = tweets.merge(posts);
                tracing::info!(query = %query, added, "older posts merged");
                Completion::Merged(added)
            }
            (Err(e), _) => Completion::Failed(e),
        }
    }

    fn issue(&mut self, kind: FetchKind, query: String, request: FetchRequest) -> FetchTicket {
        self.generation += 1;
        tracing::debug!(generation = self.generation, ?kind, query = %query, "issuing fetch");
        self.phase = Phase::Loading {
            generation: self.generation,
            kind,
            query: query.clone(),
        };
        FetchTicket {
            generation: self.generation,
            kind,
            query,
            request,
        }
    }

    fn abandon(&mut self, reason: &str) {
        if self.is_loading() {
            tracing::debug!(reason, "abandoning in-flight fetch");
            self.generation += 1;
            self.phase = Phase::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{Channel, HOME_TIMELINE, Retrieval};
    use tokio::sync::mpsc;

    fn post(id: &str) -> Post {
        serde_json::from_value(serde_json::json!({
            "id_str": id,
            "created_at": "Mon Jan 01 10:00:00 +0000 2024",
        }))
        .unwrap()
    }

    fn posts(ids: &[&str]) -> Vec<Post> {
        ids.iter().map(|id| post(id)).collect()
    }

    fn ids(store: &TweetStore) -> Vec<&str> {
        store.posts().iter().map(|p| p.id.as_str()).collect()
    }

    fn channels() -> ChannelCollection {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut channels = ChannelCollection::new(tx);
        channels.reset(vec![
            Channel::new("home", HOME_TIMELINE),
            Channel::new("rust", "#rustlang"),
            Channel::new("rust again", "#rustlang"),
        ]);
        channels
    }

    fn select(channels: &ChannelCollection, index: usize) -> ActiveSelection {
        ActiveSelection::saved(channels.key_at(index).unwrap())
    }

    #[test]
    fn first_sync_issues_refresh_for_effective_channel() {
        let channels = channels();
        let mut feed = FeedOrchestrator::new();
        let ticket = feed.sync(&select(&channels, 0), &channels).unwrap();
        assert_eq!(ticket.kind, FetchKind::Refresh);
        assert_eq!(ticket.request.retrieval, Retrieval::HomeTimeline);
        assert_eq!(ticket.request.max, None);
        assert!(feed.is_loading());
    }

    #[test]
    fn repeated_sync_is_deduplicated() {
        let channels = channels();
        let mut feed = FeedOrchestrator::new();
        let mut tweets = TweetStore::new();
        let rust = select(&channels, 1);

        let ticket = feed.sync(&rust, &channels).unwrap();
        // Redundant trigger while loading.
        assert!(feed.sync(&rust, &channels).is_none());

        feed.complete::<()>(ticket.generation, Ok(posts(&["1"])), &mut tweets);
        // Redundant trigger after loading.
        assert!(feed.sync(&rust, &channels).is_none());
        // A different channel with the same query shows the same posts.
        assert!(feed.sync(&select(&channels, 2), &channels).is_none());
    }

    #[test]
    fn response_for_previous_selection_is_discarded() {
        let channels = channels();
        let mut feed = FeedOrchestrator::new();
        let mut tweets = TweetStore::new();

        let a = feed.sync(&select(&channels, 0), &channels).unwrap();
        let b = feed.sync(&select(&channels, 1), &channels).unwrap();
        assert_ne!(a.generation, b.generation);

        let late = feed.complete::<()>(a.generation, Ok(posts(&["1", "2"])), &mut tweets);
        assert_eq!(late, Completion::Stale);
        assert!(tweets.is_empty());
        assert!(feed.is_loading());

        let fresh = feed.complete::<()>(b.generation, Ok(posts(&["7"])), &mut tweets);
        assert_eq!(fresh, Completion::Replaced(1));
        assert_eq!(ids(&tweets), vec!["7"]);
        assert_eq!(feed.applied_query(), Some("#rustlang"));
    }

    #[test]
    fn same_query_reselected_after_switch_gets_new_generation() {
        let channels = channels();
        let mut feed = FeedOrchestrator::new();
        let mut tweets = TweetStore::new();

        let first = feed.sync(&select(&channels, 1), &channels).unwrap();
        let _other = feed.sync(&select(&channels, 0), &channels).unwrap();
        let again = feed.sync(&select(&channels, 2), &channels).unwrap();
        assert_eq!(first.query, again.query);

        // Query text matches, generation does not.
        assert_eq!(
            feed.complete::<()>(first.generation, Ok(posts(&["1"])), &mut tweets),
            Completion::Stale
        );
        assert_eq!(
            feed.complete::<()>(again.generation, Ok(posts(&["2"])), &mut tweets),
            Completion::Replaced(1)
        );
    }

    #[test]
    fn returning_to_displayed_query_abandons_in_flight_fetch() {
        let channels = channels();
        let mut feed = FeedOrchestrator::new();
        let mut tweets = TweetStore::new();
        let home = select(&channels, 0);

        let t = feed.sync(&home, &channels).unwrap();
        feed.complete::<()>(t.generation, Ok(posts(&["1"])), &mut tweets);

        let away = feed.sync(&select(&channels, 1), &channels).unwrap();
        assert!(feed.sync(&home, &channels).is_none());
        assert!(!feed.is_loading());

        assert_eq!(
            feed.complete::<()>(away.generation, Ok(posts(&["9"])), &mut tweets),
            Completion::Stale
        );
        assert_eq!(ids(&tweets), vec!["1"]);
    }

    #[test]
    fn failure_leaves_store_and_allows_retry() {
        let channels = channels();
        let mut feed = FeedOrchestrator::new();
        let mut tweets = TweetStore::new();
        tweets.reset(posts(&["3"]));
        let rust = select(&channels, 1);

        let t = feed.sync(&rust, &channels).unwrap();
        let outcome = feed.complete(t.generation, Err("boom"), &mut tweets);
        assert_eq!(outcome, Completion::Failed("boom"));
        assert_eq!(ids(&tweets), vec!["3"]);
        assert!(!feed.is_loading());

        // Not marked as fetched, so the same selection retries.
        assert!(feed.sync(&rust, &channels).is_some());
    }

    #[test]
    fn typed_query_overrides_saved_channel() {
        let channels = channels();
        let mut feed = FeedOrchestrator::new();
        let selection = ActiveSelection::adhoc("conv:42", channels.first_key());
        let ticket = feed.sync(&selection, &channels).unwrap();
        assert_eq!(
            ticket.request.retrieval,
            Retrieval::Conversation {
                tweet_id: "42".into()
            }
        );
    }

    #[test]
    fn load_more_uses_min_id_and_merges() {
        let channels = channels();
        let mut feed = FeedOrchestrator::new();
        let mut tweets = TweetStore::new();
        let rust = select(&channels, 1);

        let t = feed.sync(&rust, &channels).unwrap();
        feed.complete::<()>(t.generation, Ok(posts(&["30", "20"])), &mut tweets);

        let more = feed.load_more(&rust, &channels, &tweets).unwrap();
        assert_eq!(more.kind, FetchKind::Older);
        assert_eq!(more.request.max.as_deref(), Some("20"));
        // Pagination and refresh never overlap.
        assert!(feed.load_more(&rust, &channels, &tweets).is_none());

        // Overlapping page: "20" is already present.
        let outcome = feed.complete::<()>(more.generation, Ok(posts(&["20", "10"])), &mut tweets);
        assert_eq!(outcome, Completion::Merged(1));
        assert_eq!(tweets.len(), 3);
    }

    #[test]
    fn load_more_is_stale_after_selection_change() {
        let channels = channels();
        let mut feed = FeedOrchestrator::new();
        let mut tweets = TweetStore::new();
        let rust = select(&channels, 1);

        let t = feed.sync(&rust, &channels).unwrap();
        feed.complete::<()>(t.generation, Ok(posts(&["30"])), &mut tweets);
        let more = feed.load_more(&rust, &channels, &tweets).unwrap();

        let home = feed.sync(&select(&channels, 0), &channels).unwrap();
        assert_eq!(
            feed.complete::<()>(more.generation, Ok(posts(&["5"])), &mut tweets),
            Completion::Stale
        );
        assert!(!tweets.contains("5"));
        assert_eq!(home.kind, FetchKind::Refresh);
    }

    #[test]
    fn load_more_needs_displayed_content() {
        let channels = channels();
        let mut feed = FeedOrchestrator::new();
        let tweets = TweetStore::new();
        assert!(feed.load_more(&select(&channels, 1), &channels, &tweets).is_none());
    }

    #[test]
    fn invalidate_forces_refetch() {
        let channels = channels();
        let mut feed = FeedOrchestrator::new();
        let mut tweets = TweetStore::new();
        let home = select(&channels, 0);

        let t = feed.sync(&home, &channels).unwrap();
        feed.complete::<()>(t.generation, Ok(posts(&["1"])), &mut tweets);
        feed.invalidate();
        assert!(feed.sync(&home, &channels).is_some());
    }

    #[test]
    fn refresh_supersedes_older_page_for_same_query() {
        let channels = channels();
        let mut feed = FeedOrchestrator::new();
        let mut tweets = TweetStore::new();
        let rust = select(&channels, 1);

        let t = feed.sync(&rust, &channels).unwrap();
        feed.complete::<()>(t.generation, Ok(posts(&["30"])), &mut tweets);
        let more = feed.load_more(&rust, &channels, &tweets).unwrap();

        // Reselecting keeps the page request alive.
        assert!(feed.sync(&rust, &channels).is_none());
        assert!(feed.is_loading());

        // A refresh does not.
        feed.invalidate();
        let refresh = feed.sync(&rust, &channels).unwrap();
        assert_eq!(refresh.kind, FetchKind::Refresh);
        assert_eq!(
            feed.complete::<()>(more.generation, Ok(posts(&["5"])), &mut tweets),
            Completion::Stale
        );
    }
}
