use crate::http::urls::Endpoints;
use crate::model::{FeedDocument, FeedItem};
use crate::query::Query;

pub const JSONFEED_VERSION_URL: &str = "https://jsonfeed.org/version/1.1";

/// Wrap feed items in the top-level document for `query`.
pub fn assemble(
    query: &Query,
    endpoints: &Endpoints,
    home_page_url: &str,
    items: Vec<FeedItem>,
) -> FeedDocument {
    FeedDocument {
        version: JSONFEED_VERSION_URL.to_string(),
        title: feed_title(query),
        home_page_url: home_page_url.to_string(),
        favicon: endpoints.favicon_url(),
        items,
    }
}

/// `domain - query`, plus `filtered by ...` when any filter is active.
pub fn feed_title(query: &Query) -> String {
    let mut parts = vec![query.locale.domain.to_string(), query.text.clone()];

    let mut filters = Vec::new();
    if query.is_strict() {
        filters.push("strict".to_string());
    }
    if let Some(min) = &query.min_price {
        filters.push(format!("min {}{}", query.locale.currency_sign, min.raw));
    }
    if let Some(max) = &query.max_price {
        filters.push(format!("max {}{}", query.locale.currency_sign, max.raw));
    }
    if !filters.is_empty() {
        parts.push(format!("filtered by {}", filters.join(", ")));
    }

    parts.join(" - ")
}
