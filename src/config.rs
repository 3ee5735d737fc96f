use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Overrides `server_url` from the config file.
pub const SERVER_URL_ENV: &str = "LUCERNE_SERVER_URL";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_server_url")]
    pub server_url: String,
    #[serde(default = "default_tick_rate")]
    pub tick_rate_fps: f64,
    #[serde(default = "default_show_stats")]
    pub show_stats: bool,
    /// Where TUI logs go when `RUST_LOG` is set.
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

fn default_server_url() -> String {
    "http://localhost:7238".to_string()
}

fn default_tick_rate() -> f64 {
    30.0
}

fn default_show_stats() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            tick_rate_fps: default_tick_rate(),
            show_stats: default_show_stats(),
            log_file: None,
        }
    }
}

impl AppConfig {
    /// Log file path, falling back to `~/.config/lucerne/lucerne.log`.
    pub fn log_path(&self) -> Option<PathBuf> {
        self.log_file
            .clone()
            .or_else(|| config_dir().map(|dir| dir.join("lucerne.log")))
    }
}

fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config/lucerne"))
}

fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Load `.env` files. Earlier files win because dotenvy never overwrites a
/// variable that is already set.
pub fn load_env_files() {
    let mut paths = Vec::new();
    if let Some(dir) = config_dir() {
        paths.push(dir.join(".env"));
    }
    paths.push(PathBuf::from(".env"));

    for path in paths {
        if path.exists()
            && let Err(e) = dotenvy::from_path(&path)
        {
            tracing::warn!(path = %path.display(), "failed to load env file: {e}");
        }
    }
}

pub fn load_config() -> AppConfig {
    load_env_files();
    let mut config = read_config_file().unwrap_or_default();
    apply_env(&mut config, std::env::var(SERVER_URL_ENV).ok());
    config
}

fn read_config_file() -> Option<AppConfig> {
    let path = config_path()?;
    let contents = fs::read_to_string(&path).ok()?;
    match toml::from_str(&contents) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(path = %path.display(), "invalid config, using defaults: {e}");
            None
        }
    }
}

fn apply_env(config: &mut AppConfig, server_url: Option<String>) {
    if let Some(url) = server_url.filter(|u| !u.trim().is_empty()) {
        config.server_url = url;
    }
}
