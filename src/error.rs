use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Errors found: {}", .0.join(", "))]
    Validation(Vec<String>),

    #[error("Bot detection triggered while fetching {url}")]
    BotBlocked { url: String },

    #[error("Request to {url} failed: {source}")]
    Transient {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP status {status} from {url}")]
    Source { status: u16, url: String },

    #[error("Could not parse response from {url}: {reason}")]
    Parse { url: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Could not render output: {0}")]
    Render(#[from] serde_json::Error),
}

impl FeedError {
    /// HTTP-equivalent classification surfaced to callers.
    pub fn status_code(&self) -> u16 {
        match self {
            FeedError::Validation(_) => 400,
            FeedError::BotBlocked { .. } => 429,
            FeedError::Transient { .. }
            | FeedError::Source { .. }
            | FeedError::Parse { .. }
            | FeedError::Config(_)
            | FeedError::Render(_) => 500,
        }
    }
}
