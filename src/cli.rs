use clap::{Parser, Subcommand};
use color_eyre::eyre::{self, eyre};

use crate::api::LucerneClient;
use crate::api::types::Post;
use crate::channel::{self, Channel};
use crate::config::load_config;
use crate::richtext::spans;

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "lucerne", about = "Terminal client for a social feed backend")]
pub struct Cli {
    /// Deep link or bare `q` value to open on launch (e.g. `?q=conv:123`)
    #[arg(short, long, global = true)]
    pub q: Option<String>,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

impl Cli {
    /// The launch query: the `q` of a link, or the raw value when it has none.
    pub fn initial_query(&self) -> Option<String> {
        let raw = self.q.as_deref()?.trim();
        if raw.is_empty() {
            return None;
        }
        match channel::deep_link_query(raw) {
            Some(q) => (!q.trim().is_empty()).then_some(q),
            None => Some(raw.to_string()),
        }
    }
}

#[derive(Subcommand)]
pub enum CliCommand {
    /// Launch the interactive TUI (default)
    Tui,
    /// List saved channels (JSONL)
    Channels,
    /// Resolve a query and fetch its posts (JSONL)
    Fetch {
        /// Channel query: `home_timeline`, `re:<id>`, `conv:<id>` or search text
        query: String,
        /// Only return posts at or older than this id
        #[arg(long)]
        max: Option<String>,
    },
    /// Engagement metrics for recent tweets (JSONL)
    Trends,
    /// Followers list (JSONL)
    Followers,
    /// Own account summary (JSONL)
    Me,
}

// ---------------------------------------------------------------------------
// Output helpers
// ---------------------------------------------------------------------------

/// Self-contained JSON line for a post, with its stitched text flattened.
fn post_line(post: &Post) -> serde_json::Value {
    serde_json::json!({
        "post": post,
        "text": spans::plain(&spans::post_text(post)),
        "permalink": post.permalink(),
    })
}

fn print_line(value: &impl serde::Serialize) -> eyre::Result<()> {
    let line = serde_json::to_string(value)?;
    println!("{line}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Command execution
// ---------------------------------------------------------------------------

pub fn build_api_client() -> LucerneClient {
    let config = load_config();
    LucerneClient::new(&config.server_url)
}

pub async fn run_command(cmd: CliCommand) -> eyre::Result<()> {
    let client = build_api_client();

    match cmd {
        CliCommand::Tui => unreachable!("tui is handled in main"),

        CliCommand::Channels => {
            let channels = client.get_channels().await.map_err(|e| eyre!("{e}"))?;
            for channel in &channels {
                print_line(channel)?;
            }
        }

        CliCommand::Fetch { query, max } => {
            let query = query.trim();
            if query.is_empty() {
                return Err(eyre!("query must not be empty"));
            }
            let channel = Channel::adhoc(query);
            let request = match max {
                Some(max) => channel.request_older(max),
                None => channel.request(),
            };
            tracing::info!(mode = %request.retrieval.label(), "fetching");
            let posts = client.fetch_posts(&request).await.map_err(|e| eyre!("{e}"))?;
            for post in &posts {
                print_line(&post_line(post))?;
            }
        }

        CliCommand::Trends => {
            let trends = client.get_trends().await.map_err(|e| eyre!("{e}"))?;
            for tweet in &trends {
                print_line(&serde_json::json!({
                    "tweet": tweet,
                    "text": spans::plain(&spans::metric_text(tweet)),
                }))?;
            }
        }

        CliCommand::Followers => {
            let followers = client.get_followers().await.map_err(|e| eyre!("{e}"))?;
            for user in &followers {
                print_line(&serde_json::json!({ "user": user }))?;
            }
        }

        CliCommand::Me => {
            let summary = client.get_self().await.map_err(|e| eyre!("{e}"))?;
            print_line(&summary)?;
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
