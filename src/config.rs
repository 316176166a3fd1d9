use crate::error::FeedError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_USER_AGENTS: &[&str] = &[
    "Amazon.com/30.4.0.100 (Android/14/Pixel 8a)",
    "Mozilla/5.0 (Linux; Android 14; Pixel 8a) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/128.0.6613.127 Mobile Safari/537.36",
    "Mozilla/5.0 (Linux; Android 13; SM-S911B) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/128.0.6613.88 Mobile Safari/537.36",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_6 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.6 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (Android 14; Mobile; rv:130.0) Gecko/130.0 Firefox/130.0",
];

/// How keyword searches reach the site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// GET the search results page and scrape its markup.
    Html,
    /// POST to the streaming query endpoint.
    Stream,
}

/// Where id lookups read price and availability from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemSource {
    /// The product-variant ("dimension") JSON endpoint.
    Dimension,
    /// The full product page.
    Page,
}

impl SearchMode {
    fn parse(s: &str) -> Result<Self, FeedError> {
        match s.trim().to_lowercase().as_str() {
            "html" => Ok(SearchMode::Html),
            "stream" => Ok(SearchMode::Stream),
            other => Err(FeedError::Config(format!(
                "Unknown search mode '{}'. Use html or stream",
                other
            ))),
        }
    }
}

impl ItemSource {
    fn parse(s: &str) -> Result<Self, FeedError> {
        match s.trim().to_lowercase().as_str() {
            "dimension" => Ok(ItemSource::Dimension),
            "page" => Ok(ItemSource::Page),
            other => Err(FeedError::Config(format!(
                "Unknown item source '{}'. Use dimension or page",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub country: String,
    pub no_cache: bool,
    pub debug: bool,
    pub timeout_secs: u64,
    pub cache_ttl_secs: u64,
    pub item_attempts: u32,
    pub retry_delay_ms: u64,
    pub search_mode: SearchMode,
    pub item_source: ItemSource,
    pub user_agents: Vec<String>,
    /// Replaces `https://{locale domain}` as the request root.
    pub base_url: Option<String>,
    pub bind_addr: String,
}

#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    defaults: ConfigDefaults,
}

#[derive(Debug, Deserialize, Default)]
struct ConfigDefaults {
    country: Option<String>,
    timeout_secs: Option<u64>,
    cache_ttl_secs: Option<u64>,
    item_attempts: Option<u32>,
    retry_delay_ms: Option<u64>,
    search_mode: Option<SearchMode>,
    item_source: Option<ItemSource>,
    user_agents: Option<Vec<String>>,
    base_url: Option<String>,
    bind_addr: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            country: "US".to_string(),
            no_cache: false,
            debug: false,
            timeout_secs: 30,
            cache_ttl_secs: 60,
            item_attempts: 3,
            retry_delay_ms: 2000,
            search_mode: SearchMode::Html,
            item_source: ItemSource::Dimension,
            user_agents: DEFAULT_USER_AGENTS.iter().map(|s| s.to_string()).collect(),
            base_url: None,
            bind_addr: "0.0.0.0:8000".to_string(),
        }
    }
}

impl AppConfig {
    pub fn load(
        country: Option<String>,
        no_cache: bool,
        debug: bool,
        bind_addr: Option<String>,
    ) -> Result<Self, FeedError> {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("amazon-feed");

        let file_config = load_config_file(&config_dir);

        Self::resolve(country, no_cache, debug, bind_addr, &file_config.defaults, |key| {
            std::env::var(key).ok()
        })
    }

    // Priority: CLI flags → env vars → config file → defaults
    fn resolve(
        country: Option<String>,
        no_cache: bool,
        debug: bool,
        bind_addr: Option<String>,
        file: &ConfigDefaults,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, FeedError> {
        let defaults = AppConfig::default();

        let country = country
            .or_else(|| env("AMAZON_FEED_COUNTRY"))
            .or_else(|| file.country.clone())
            .unwrap_or(defaults.country);

        let timeout_secs = parse_env_number(&env, "AMAZON_FEED_TIMEOUT_SECS")?
            .or(file.timeout_secs)
            .unwrap_or(defaults.timeout_secs);

        let cache_ttl_secs = parse_env_number(&env, "AMAZON_FEED_CACHE_TTL_SECS")?
            .or(file.cache_ttl_secs)
            .unwrap_or(defaults.cache_ttl_secs);

        let item_attempts = parse_env_number(&env, "AMAZON_FEED_ITEM_ATTEMPTS")?
            .map(|n| n as u32)
            .or(file.item_attempts)
            .unwrap_or(defaults.item_attempts);

        let retry_delay_ms = parse_env_number(&env, "AMAZON_FEED_RETRY_DELAY_MS")?
            .or(file.retry_delay_ms)
            .unwrap_or(defaults.retry_delay_ms);

        let search_mode = match env("AMAZON_FEED_SEARCH_MODE") {
            Some(mode) => SearchMode::parse(&mode)?,
            None => file.search_mode.unwrap_or(defaults.search_mode),
        };

        let item_source = match env("AMAZON_FEED_ITEM_SOURCE") {
            Some(source) => ItemSource::parse(&source)?,
            None => file.item_source.unwrap_or(defaults.item_source),
        };

        let user_agents = file
            .user_agents
            .clone()
            .filter(|agents| !agents.is_empty())
            .unwrap_or(defaults.user_agents);

        let base_url = env("AMAZON_FEED_BASE_URL")
            .or_else(|| file.base_url.clone())
            .map(|u| u.trim_end_matches('/').to_string());

        let bind_addr = bind_addr
            .or_else(|| env("AMAZON_FEED_BIND"))
            .or_else(|| file.bind_addr.clone())
            .unwrap_or(defaults.bind_addr);

        if item_attempts == 0 {
            return Err(FeedError::Config(
                "item_attempts must be at least 1".to_string(),
            ));
        }

        Ok(AppConfig {
            country,
            no_cache,
            debug,
            timeout_secs,
            cache_ttl_secs,
            item_attempts,
            retry_delay_ms,
            search_mode,
            item_source,
            user_agents,
            base_url,
            bind_addr,
        })
    }

    /// Effective cache lifetime; zero disables the response cache.
    pub fn cache_ttl(&self) -> std::time::Duration {
        if self.no_cache {
            std::time::Duration::ZERO
        } else {
            std::time::Duration::from_secs(self.cache_ttl_secs)
        }
    }
}

fn parse_env_number(
    env: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<u64>, FeedError> {
    match env(key) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| FeedError::Config(format!("{} must be a whole number, got '{}'", key, raw))),
        None => Ok(None),
    }
}

fn load_config_file(config_dir: &Path) -> ConfigFile {
    let config_path = config_dir.join("config.toml");
    if config_path.exists() {
        match std::fs::read_to_string(&config_path) {
            Ok(content) => toml::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring malformed {}: {}", config_path.display(), e);
                ConfigFile::default()
            }),
            Err(_) => ConfigFile::default(),
        }
    } else {
        ConfigFile::default()
    }
}
