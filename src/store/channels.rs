use tokio::sync::mpsc;

use crate::channel::Channel;

/// Slot identity of a stored channel. Assigned on insert, never reused and
/// never sent to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelKey(u64);

/// Sender half of the persistence queue; each message is a full snapshot to
/// be written with `PUT /channels`.
pub type PersistQueue = mpsc::UnboundedSender<Vec<Channel>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// Ordered list of saved channels.
///
/// Every effective mutation (create, rename, move, delete) queues exactly one
/// snapshot of the whole list. Loading with [`ChannelCollection::reset`] does
/// not.
///
/// Mutations are refused until the first successful load. A snapshot taken
/// before that would overwrite the saved list with a partial one.
#[derive(Debug)]
pub struct ChannelCollection {
    entries: Vec<(ChannelKey, Channel)>,
    next_key: u64,
    persist: PersistQueue,
    loaded: bool,
}

impl ChannelCollection {
    pub fn new(persist: PersistQueue) -> Self {
        Self {
            entries: Vec::new(),
            next_key: 0,
            persist,
            loaded: false,
        }
    }

    /// Replace the contents with channels loaded from the backend. Channels
    /// with an empty query are dropped.
    pub fn reset(&mut self, channels: Vec<Channel>) {
        self.entries.clear();
        for channel in channels {
            if channel.query.trim().is_empty() {
                tracing::warn!(name = %channel.name, "ignoring saved channel with empty query");
                continue;
            }
            let key = self.mint_key();
            self.entries.push((key, channel));
        }
        self.loaded = true;
    }

    /// Whether the backend list has been loaded, so mutations are accepted.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ChannelKey, &Channel)> {
        self.entries.iter().map(|(k, c)| (*k, c))
    }

    pub fn get(&self, key: ChannelKey) -> Option<&Channel> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, c)| c)
    }

    pub fn position(&self, key: ChannelKey) -> Option<usize> {
        self.entries.iter().position(|(k, _)| *k == key)
    }

    pub fn key_at(&self, index: usize) -> Option<ChannelKey> {
        self.entries.get(index).map(|(k, _)| *k)
    }

    pub fn first_key(&self) -> Option<ChannelKey> {
        self.key_at(0)
    }

    /// First channel whose query equals `query` exactly.
    pub fn find_by_query(&self, query: &str) -> Option<ChannelKey> {
        self.entries
            .iter()
            .find(|(_, c)| c.query == query)
            .map(|(k, _)| *k)
    }

    /// Append a channel. Returns `None` (and persists nothing) when the query
    /// is blank. A blank name falls back to the query.
    pub fn create(&mut self, name: &str, query: &str) -> Option<ChannelKey> {
        let query = query.trim();
        if query.is_empty() || !self.writable() {
            return None;
        }
        let name = match name.trim() {
            "" => query,
            n => n,
        };
        let key = self.mint_key();
        self.entries.push((key, Channel::new(name, query)));
        tracing::debug!(name, query, "channel created");
        self.queue_persist();
        Some(key)
    }

    pub fn rename(&mut self, key: ChannelKey, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() || !self.writable() {
            return false;
        }
        let Some((_, channel)) = self.entries.iter_mut().find(|(k, _)| *k == key) else {
            return false;
        };
        if channel.name == name {
            return false;
        }
        channel.name = name.to_string();
        self.queue_persist();
        true
    }

    /// Swap the channel with its neighbour. No-op at either end.
    pub fn move_by(&mut self, key: ChannelKey, direction: Direction) -> bool {
        if !self.writable() {
            return false;
        }
        let Some(idx) = self.position(key) else {
            return false;
        };
        let target = match direction {
            Direction::Up if idx > 0 => idx - 1,
            Direction::Down if idx + 1 < self.entries.len() => idx + 1,
            _ => return false,
        };
        self.entries.swap(idx, target);
        self.queue_persist();
        true
    }

    pub fn delete(&mut self, key: ChannelKey) -> Option<Channel> {
        if !self.writable() {
            return None;
        }
        let idx = self.position(key)?;
        let (_, removed) = self.entries.remove(idx);
        self.queue_persist();
        Some(removed)
    }

    /// Plain data for serialization.
    pub fn snapshot(&self) -> Vec<Channel> {
        self.entries.iter().map(|(_, c)| c.clone()).collect()
    }

    fn mint_key(&mut self) -> ChannelKey {
        let key = ChannelKey(self.next_key);
        self.next_key += 1;
        key
    }

    fn writable(&self) -> bool {
        if !self.loaded {
            tracing::warn!("channel list not loaded; refusing change");
        }
        self.loaded
    }

    fn queue_persist(&self) {
        if self.persist.send(self.snapshot()).is_err() {
            tracing::warn!("channel persistence queue closed; change kept locally only");
        }
    }
}
