use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::DefaultTerminal;
use tokio::sync::mpsc;

use crate::api::LucerneClient;
use crate::api::types::{MetricTweet, Post, SelfSummary, User};
use crate::channel::{self, ActiveSelection, Channel, HOME_TIMELINE};
use crate::command::{self, Command};
use crate::config::AppConfig;
use crate::event::{self, ApiResult, AppEvent, Event, EventHandler};
use crate::feed::{Completion, FeedOrchestrator, FetchKind, FetchTicket};
use crate::store::channels::{ChannelCollection, Direction};
use crate::store::tweets::TweetStore;
use crate::ui;

// ---------------------------------------------------------------------------
// Stats pane state
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct StatsState {
    pub summary: Option<SelfSummary>,
    pub trends: Vec<MetricTweet>,
    pub followers: Vec<User>,
    /// Requests still out (self, trends, followers).
    pub pending: u8,
}

// ---------------------------------------------------------------------------
// App mode
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppMode {
    Normal,
    Command,
    Query,
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

pub struct App {
    pub running: bool,
    pub events: EventHandler,
    pub config: AppConfig,
    pub mode: AppMode,
    pub show_help: bool,
    pub show_stats: bool,

    // Timeline state
    pub channels: ChannelCollection,
    pub selection: ActiveSelection,
    pub feed: FeedOrchestrator,
    pub tweets: TweetStore,
    pub selected_index: usize,
    pub channels_loaded: bool,

    pub stats: StatsState,

    // Input state
    pub command_input: String,
    pub query_input: String,

    pub client: LucerneClient,
    persist_rx: Option<mpsc::UnboundedReceiver<Vec<Channel>>>,
    /// `q` from the launch deep link, applied once channels are loaded.
    initial_query: Option<String>,

    // Status
    pub status_message: Option<String>,
    pub error_detail: Option<String>,
}

impl App {
    pub fn new(config: AppConfig, client: LucerneClient, initial_query: Option<String>) -> Self {
        let (persist_tx, persist_rx) = mpsc::unbounded_channel();
        Self {
            running: true,
            events: EventHandler::new(config.tick_rate_fps),
            show_stats: config.show_stats,
            config,
            mode: AppMode::Normal,
            show_help: false,
            channels: ChannelCollection::new(persist_tx),
            selection: ActiveSelection::default(),
            feed: FeedOrchestrator::new(),
            tweets: TweetStore::new(),
            selected_index: 0,
            channels_loaded: false,
            stats: StatsState::default(),
            command_input: String::new(),
            query_input: String::new(),
            client,
            persist_rx: Some(persist_rx),
            initial_query,
            status_message: None,
            error_detail: None,
        }
    }

    // -- Main event loop ----------------------------------------------------

    pub async fn run(mut self, mut terminal: DefaultTerminal) -> color_eyre::Result<()> {
        if let Some(rx) = self.persist_rx.take() {
            tokio::spawn(persist_channels(self.client.clone(), rx, self.events.sender()));
        }
        self.events.send(AppEvent::LoadChannels);
        if self.show_stats {
            self.events.send(AppEvent::LoadStats);
        }

        while self.running {
            terminal.draw(|frame| ui::draw(frame, &self))?;
            match self.events.next().await? {
                Event::Tick => {}
                Event::Crossterm(event) => {
                    if let crossterm::event::Event::Key(key) = event
                        && key.kind == crossterm::event::KeyEventKind::Press
                    {
                        self.handle_key_event(key);
                    }
                }
                Event::App(app_event) => self.handle_app_event(*app_event),
            }
        }
        Ok(())
    }

    // -- Selection ----------------------------------------------------------

    /// Replace the selection snapshot and bring the timeline in line with it.
    fn select(&mut self, selection: ActiveSelection) {
        self.selection = selection;
        self.sync_feed();
    }

    fn sync_feed(&mut self) {
        if let Some(ticket) = self.feed.sync(&self.selection, &self.channels) {
            self.events.send(AppEvent::Fetch(ticket));
        }
    }

    fn select_channel_at(&mut self, index: usize) {
        if let Some(key) = self.channels.key_at(index) {
            self.select(ActiveSelection::saved(key));
        }
    }

    fn cycle_channel(&mut self, forward: bool) {
        let len = self.channels.len();
        if len == 0 {
            return;
        }
        let current = self
            .selection
            .channel
            .filter(|_| !self.selection.is_adhoc())
            .and_then(|key| self.channels.position(key));
        let next = match (current, forward) {
            (Some(i), true) => (i + 1) % len,
            (Some(i), false) => (i + len - 1) % len,
            (None, _) => 0,
        };
        self.select_channel_at(next);
    }

    /// Title for the timeline pane.
    pub fn selection_label(&self) -> String {
        match self.selection.effective_channel(&self.channels) {
            Some(channel) if self.selection.is_adhoc() => {
                format!("{} ({})", channel.query, channel.retrieval().label())
            }
            Some(channel) => channel.name.clone(),
            None if self.channels_loaded => "no channel".to_string(),
            None => "loading channels".to_string(),
        }
    }

    pub fn selected_post(&self) -> Option<&Post> {
        self.tweets.get(self.selected_index)
    }

    // -- Key event routing --------------------------------------------------

    fn handle_key_event(&mut self, key: KeyEvent) {
        // Ctrl-C always quits.
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c' | 'C'))
        {
            self.events.send(AppEvent::Quit);
            return;
        }

        // The error popup blocks everything until dismissed.
        if self.error_detail.is_some() {
            if matches!(key.code, KeyCode::Esc | KeyCode::Enter) {
                self.error_detail = None;
            }
            return;
        }

        match self.mode {
            AppMode::Normal => self.handle_normal_key(key),
            AppMode::Command => self.handle_command_key(key),
            AppMode::Query => self.handle_query_key(key),
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) {
        if self.show_help {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('q' | '?')) {
                self.show_help = false;
            }
            return;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.events.send(AppEvent::Quit);
            }
            KeyCode::Char('j') | KeyCode::Down => {
                if self.selected_index + 1 < self.tweets.len() {
                    self.selected_index += 1;
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.selected_index = self.selected_index.saturating_sub(1);
            }
            KeyCode::Char('g') | KeyCode::Home => {
                self.selected_index = 0;
            }
            KeyCode::Char('G') | KeyCode::End => {
                self.selected_index = self.tweets.len().saturating_sub(1);
            }
            KeyCode::Char(c @ '1'..='9') => {
                self.select_channel_at(c as usize - '1' as usize);
            }
            KeyCode::Tab => self.cycle_channel(true),
            KeyCode::BackTab => self.cycle_channel(false),
            KeyCode::Char('J') => self.move_active_channel(Direction::Down),
            KeyCode::Char('K') => self.move_active_channel(Direction::Up),
            KeyCode::Char('/') => {
                self.mode = AppMode::Query;
                self.query_input = self.selection.query.clone();
            }
            KeyCode::Char(':') => {
                self.mode = AppMode::Command;
                self.command_input.clear();
            }
            KeyCode::Char('?') => {
                self.show_help = true;
            }
            KeyCode::Char('n') => self.load_more(),
            KeyCode::Char('r') => self.refresh(),
            KeyCode::Char('s') => {
                self.show_stats = !self.show_stats;
                if self.show_stats && self.stats.summary.is_none() {
                    self.events.send(AppEvent::LoadStats);
                }
            }
            KeyCode::Enter => {
                if let Some(id) = self.selected_post().map(|p| p.id.clone()) {
                    self.select(ActiveSelection::adhoc(
                        format!("conv:{id}"),
                        self.selection.channel,
                    ));
                }
            }
            KeyCode::Char('R') => {
                if let Some(id) = self.selected_post().map(|p| p.id.clone()) {
                    self.select(ActiveSelection::adhoc(
                        format!("re:{id}"),
                        self.selection.channel,
                    ));
                }
            }
            KeyCode::Char('o') => self.open_selected_in_browser(),
            _ => {}
        }
    }

    fn handle_command_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.mode = AppMode::Normal;
                self.command_input.clear();
            }
            KeyCode::Enter => {
                self.mode = AppMode::Normal;
                self.execute_command();
            }
            KeyCode::Backspace => {
                self.command_input.pop();
            }
            KeyCode::Char(c) => {
                self.command_input.push(c);
            }
            _ => {}
        }
    }

    fn handle_query_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.mode = AppMode::Normal;
                self.query_input.clear();
            }
            KeyCode::Enter => {
                self.mode = AppMode::Normal;
                let query = std::mem::take(&mut self.query_input);
                self.apply_typed_query(query.trim());
            }
            KeyCode::Backspace => {
                self.query_input.pop();
            }
            KeyCode::Char(c) => {
                self.query_input.push(c);
            }
            _ => {}
        }
    }

    /// Empty text returns to the saved channel behind the query.
    fn apply_typed_query(&mut self, query: &str) {
        let fallback = self
            .selection
            .channel
            .filter(|key| self.channels.get(*key).is_some())
            .or_else(|| self.channels.first_key());
        if query.is_empty() {
            self.select(ActiveSelection {
                query: String::new(),
                channel: fallback,
            });
        } else {
            self.select(ActiveSelection::adhoc(query, fallback));
        }
    }

    // -- Command execution --------------------------------------------------

    fn execute_command(&mut self) {
        let input = std::mem::take(&mut self.command_input);
        match command::parse_command(&input) {
            Some(Command::NewChannel(name)) => self.save_current_query(name.as_deref()),
            Some(Command::Rename(name)) => self.rename_active_channel(&name),
            Some(Command::Delete) => self.delete_active_channel(),
            Some(Command::Query(query)) => self.apply_typed_query(&query),
            Some(Command::Open(link)) => {
                let q = channel::deep_link_query(&link);
                let selection = channel::resolve_deep_link(q.as_deref(), &self.channels);
                self.select(selection);
            }
            Some(Command::Home) => {
                let selection = match self.channels.find_by_query(HOME_TIMELINE) {
                    Some(key) => ActiveSelection::saved(key),
                    None => ActiveSelection::adhoc(HOME_TIMELINE, self.selection.channel),
                };
                self.select(selection);
            }
            Some(Command::Refresh) => self.refresh(),
            Some(Command::Help) => {
                self.show_help = true;
            }
            Some(Command::Quit) => {
                self.events.send(AppEvent::Quit);
            }
            None => {
                self.status_message = Some(format!("Unknown command: {input}"));
            }
        }
    }

    // -- Channel management -------------------------------------------------

    /// Key of the selected channel when no typed query overrides it.
    fn active_saved_channel(&self) -> Option<crate::store::channels::ChannelKey> {
        if self.selection.is_adhoc() {
            return None;
        }
        self.selection.channel
    }

    fn ensure_channels_writable(&mut self) -> bool {
        if !self.channels.is_loaded() {
            self.status_message =
                Some("Channels not loaded; press r to retry before editing".to_string());
        }
        self.channels.is_loaded()
    }

    /// Promote the effective query to a saved channel and select it.
    fn save_current_query(&mut self, name: Option<&str>) {
        if !self.ensure_channels_writable() {
            return;
        }
        let Some(current) = self
            .selection
            .effective_channel(&self.channels)
            .map(|c| c.into_owned())
        else {
            self.status_message = Some("Nothing to save".to_string());
            return;
        };
        let name = name.unwrap_or(&current.name);
        match self.channels.create(name, &current.query) {
            Some(key) => {
                self.status_message = Some(format!("Saved channel {name}"));
                self.select(ActiveSelection::saved(key));
            }
            None => {
                self.status_message = Some("Cannot save an empty query".to_string());
            }
        }
    }

    fn rename_active_channel(&mut self, name: &str) {
        if !self.ensure_channels_writable() {
            return;
        }
        match self.active_saved_channel() {
            Some(key) => {
                if self.channels.rename(key, name) {
                    self.status_message = Some(format!("Renamed channel to {name}"));
                }
            }
            None => {
                self.status_message = Some("No saved channel selected".to_string());
            }
        }
    }

    fn delete_active_channel(&mut self) {
        if !self.ensure_channels_writable() {
            return;
        }
        let Some(key) = self.active_saved_channel() else {
            self.status_message = Some("No saved channel selected".to_string());
            return;
        };
        if let Some(removed) = self.channels.delete(key) {
            self.status_message = Some(format!("Deleted channel {}", removed.name));
            // The old key now dangles; fall back to the first channel.
            self.select(ActiveSelection {
                query: String::new(),
                channel: self.channels.first_key(),
            });
        }
    }

    fn move_active_channel(&mut self, direction: Direction) {
        if !self.ensure_channels_writable() {
            return;
        }
        if let Some(key) = self.active_saved_channel() {
            self.channels.move_by(key, direction);
        }
    }

    // -- Timeline actions ---------------------------------------------------

    fn load_more(&mut self) {
        match self
            .feed
            .load_more(&self.selection, &self.channels, &self.tweets)
        {
            Some(ticket) => self.events.send(AppEvent::Fetch(ticket)),
            None if self.feed.is_loading() => {
                self.status_message = Some("Still loading".to_string());
            }
            None => {}
        }
    }

    fn refresh(&mut self) {
        if self.channels_loaded && !self.channels.is_loaded() {
            self.status_message = Some("Retrying channel load".to_string());
            self.events.send(AppEvent::LoadChannels);
        }
        self.feed.invalidate();
        self.sync_feed();
        if self.show_stats {
            self.events.send(AppEvent::LoadStats);
        }
    }

    fn open_selected_in_browser(&mut self) {
        let Some(link) = self.selected_post().map(Post::permalink) else {
            return;
        };
        if let Err(e) = open::that(&link) {
            tracing::warn!(%link, "failed to open browser: {e}");
            self.status_message = Some(format!("Could not open {link}"));
        }
    }

    // -- App event handling -------------------------------------------------

    fn handle_app_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Quit => {
                self.running = false;
            }

            // Request triggers -> spawned tasks.
            AppEvent::LoadChannels => self.dispatch_load_channels(),
            AppEvent::Fetch(ticket) => self.dispatch_fetch(ticket),
            AppEvent::LoadStats => self.dispatch_stats(),

            // Responses
            AppEvent::ChannelsLoaded(result) => {
                self.channels_loaded = true;
                match result {
                    Ok(list) if list.is_empty() => {
                        self.channels
                            .reset(vec![Channel::new("home", HOME_TIMELINE)]);
                    }
                    Ok(list) => self.channels.reset(list),
                    Err(e) => {
                        self.error_detail = Some(format!(
                            "Could not load channels: {e}\n\nPress r to retry."
                        ));
                    }
                }
                let q = self.initial_query.take();
                let selection =
                    channel::selection_after_load(&self.selection, q.as_deref(), &self.channels);
                self.select(selection);
            }
            AppEvent::ChannelsPersisted(result) => match result {
                Ok(count) => tracing::debug!(count, "channels saved"),
                Err(e) => {
                    self.status_message = Some(format!("Error saving channels: {e}"));
                }
            },
            AppEvent::FeedLoaded { generation, result } => {
                match self.feed.complete(generation, result, &mut self.tweets) {
                    Completion::Replaced(count) => {
                        self.selected_index = 0;
                        self.status_message = Some(format!("{count} posts"));
                    }
                    Completion::Merged(added) => {
                        self.status_message = Some(format!("{added} older posts"));
                    }
                    Completion::Stale => {}
                    Completion::Failed(e) => {
                        self.error_detail =
                            Some(format!("Could not load {}: {e}", self.selection_label()));
                    }
                }
                self.selected_index = self
                    .selected_index
                    .min(self.tweets.len().saturating_sub(1));
            }
            AppEvent::TrendsLoaded(result) => {
                self.stats.pending = self.stats.pending.saturating_sub(1);
                match result {
                    Ok(trends) => self.stats.trends = trends,
                    Err(e) => self.status_message = Some(format!("Error loading trends: {e}")),
                }
            }
            AppEvent::FollowersLoaded(result) => {
                self.stats.pending = self.stats.pending.saturating_sub(1);
                match result {
                    Ok(followers) => self.stats.followers = followers,
                    Err(e) => {
                        self.status_message = Some(format!("Error loading followers: {e}"));
                    }
                }
            }
            AppEvent::SelfLoaded(result) => {
                self.stats.pending = self.stats.pending.saturating_sub(1);
                match result {
                    Ok(summary) => self.stats.summary = Some(summary),
                    Err(e) => self.status_message = Some(format!("Error loading account: {e}")),
                }
            }
        }
    }

    // -- API dispatch -------------------------------------------------------

    fn dispatch_load_channels(&self) {
        let client = self.client.clone();
        let sender = self.events.sender();
        tokio::spawn(async move {
            let result = client.get_channels().await.map_err(into_api_error);
            event::emit(&sender, AppEvent::ChannelsLoaded(result));
        });
    }

    fn dispatch_fetch(&self, ticket: FetchTicket) {
        let client = self.client.clone();
        let sender = self.events.sender();
        tracing::info!(
            generation = ticket.generation,
            older = ticket.kind == FetchKind::Older,
            mode = %ticket.request.retrieval.label(),
            "fetching"
        );
        tokio::spawn(async move {
            let result = client
                .fetch_posts(&ticket.request)
                .await
                .map_err(into_api_error);
            event::emit(
                &sender,
                AppEvent::FeedLoaded {
                    generation: ticket.generation,
                    result,
                },
            );
        });
    }

    /// Stats requests are independent of each other and of the timeline.
    fn dispatch_stats(&mut self) {
        self.stats.pending = 3;

        let (client, sender) = (self.client.clone(), self.events.sender());
        tokio::spawn(async move {
            let result = client.get_self().await.map_err(into_api_error);
            event::emit(&sender, AppEvent::SelfLoaded(result));
        });

        let (client, sender) = (self.client.clone(), self.events.sender());
        tokio::spawn(async move {
            let result = client.get_trends().await.map_err(into_api_error);
            event::emit(&sender, AppEvent::TrendsLoaded(result));
        });

        let (client, sender) = (self.client.clone(), self.events.sender());
        tokio::spawn(async move {
            let result = client.get_followers().await.map_err(into_api_error);
            event::emit(&sender, AppEvent::FollowersLoaded(result));
        });
    }
}

fn into_api_error(e: crate::api::ApiClientError) -> Arc<String> {
    Arc::new(e.to_string())
}

/// Drain channel snapshots in order, writing each with `PUT /channels`.
async fn persist_channels(
    client: LucerneClient,
    mut rx: mpsc::UnboundedReceiver<Vec<Channel>>,
    sender: mpsc::UnboundedSender<Event>,
) {
    while let Some(snapshot) = rx.recv().await {
        let result: ApiResult<usize> = client
            .put_channels(&snapshot)
            .await
            .map(|()| snapshot.len())
            .map_err(into_api_error);
        event::emit(&sender, AppEvent::ChannelsPersisted(result));
    }
}
