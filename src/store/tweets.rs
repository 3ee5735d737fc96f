use std::cmp::Ordering;
use std::collections::HashSet;

use crate::api::types::Post;

/// Posts on display, deduplicated by id and always newest first.
///
/// Ordering is maintained on every insert rather than by a one-off sort, so
/// pages merged out of order still land in the right place.
#[derive(Debug, Default)]
pub struct TweetStore {
    posts: Vec<Post>,
    ids: HashSet<String>,
}

impl TweetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn get(&self, index: usize) -> Option<&Post> {
        self.posts.get(index)
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Replace everything with `posts`.
    pub fn reset(&mut self, posts: Vec<Post>) {
        self.posts.clear();
        self.ids.clear();
        self.merge(posts);
    }

    /// Insert one post in recency order. Returns `false` if its id is
    /// already present.
    pub fn add(&mut self, post: Post) -> bool {
        if self.ids.contains(&post.id) {
            return false;
        }
        let at = self
            .posts
            .partition_point(|existing| newest_first(existing, &post) == Ordering::Less);
        self.ids.insert(post.id.clone());
        self.posts.insert(at, post);
        true
    }

    /// Add every post not already present; returns how many were new.
    pub fn merge(&mut self, posts: Vec<Post>) -> usize {
        let mut added = 0;
        for post in posts {
            if self.add(post) {
                added += 1;
            }
        }
        added
    }

    /// Smallest id on display, used as the cursor for older pages.
    pub fn min_id(&self) -> Option<&str> {
        self.posts
            .iter()
            .min_by(|a, b| compare_ids(a, b))
            .map(|p| p.id.as_str())
    }
}

/// `Less` when `a` should be listed before `b`.
fn newest_first(a: &Post, b: &Post) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| compare_ids(b, a))
}

fn compare_ids(a: &Post, b: &Post) -> Ordering {
    match (a.numeric_id(), b.numeric_id()) {
        (Some(x), Some(y)) => x.cmp(&y),
        _ => a.id.cmp(&b.id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(id: &str, created_at: &str) -> Post {
        serde_json::from_value(serde_json::json!({
            "id_str": id,
            "created_at": created_at,
        }))
        .unwrap()
    }

    fn ids(store: &TweetStore) -> Vec<&str> {
        store.posts().iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn reset_sorts_newest_first() {
        let mut store = TweetStore::new();
        store.reset(vec![
            post("1", "Mon Jan 01 10:00:00 +0000 2024"),
            post("3", "Mon Jan 01 12:00:00 +0000 2024"),
            post("2", "Mon Jan 01 11:00:00 +0000 2024"),
        ]);
        assert_eq!(ids(&store), vec!["3", "2", "1"]);
    }

    #[test]
    fn merge_keeps_order_for_late_arrivals() {
        let mut store = TweetStore::new();
        store.reset(vec![post("30", "Mon Jan 01 12:00:00 +0000 2024")]);
        let added = store.merge(vec![
            post("10", "Mon Jan 01 10:00:00 +0000 2024"),
            post("40", "Mon Jan 01 13:00:00 +0000 2024"),
            post("20", "Mon Jan 01 11:00:00 +0000 2024"),
        ]);
        assert_eq!(added, 3);
        assert_eq!(ids(&store), vec!["40", "30", "20", "10"]);
    }

    #[test]
    fn merging_known_id_is_a_noop() {
        let mut store = TweetStore::new();
        store.reset(vec![
            post("5", "Mon Jan 01 10:00:00 +0000 2024"),
            post("6", "Mon Jan 01 11:00:00 +0000 2024"),
        ]);
        let added = store.merge(vec![post("5", "Mon Jan 01 10:00:00 +0000 2024")]);
        assert_eq!(added, 0);
        assert_eq!(store.len(), 2);
        assert!(!store.add(post("6", "Mon Jan 01 11:00:00 +0000 2024")));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn reset_deduplicates_within_a_page() {
        let mut store = TweetStore::new();
        store.reset(vec![
            post("5", "Mon Jan 01 10:00:00 +0000 2024"),
            post("5", "Mon Jan 01 10:00:00 +0000 2024"),
        ]);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn same_timestamp_orders_by_numeric_id() {
        let mut store = TweetStore::new();
        store.reset(vec![
            post("9", "Mon Jan 01 10:00:00 +0000 2024"),
            post("10", "Mon Jan 01 10:00:00 +0000 2024"),
        ]);
        assert_eq!(ids(&store), vec!["10", "9"]);
    }

    #[test]
    fn min_id_compares_numerically() {
        let mut store = TweetStore::new();
        assert_eq!(store.min_id(), None);
        store.reset(vec![
            post("100", "Mon Jan 01 10:00:00 +0000 2024"),
            post("99", "Mon Jan 01 09:00:00 +0000 2024"),
        ]);
        assert_eq!(store.min_id(), Some("99"));
    }
}
