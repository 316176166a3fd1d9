use crate::error::FeedError;
use crate::http::session::Session;
use crate::http::{Method, PageRequest, RawResponse};
use crate::query::Query;
use regex::Regex;
use reqwest::header::CONTENT_TYPE;
use std::sync::LazyLock;

/// Phrases the site uses on block and challenge pages.
static BOT_PATTERNS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)captcha|automated access|robot check|bot detection|challenge|blocked|verify you are")
        .expect("valid bot pattern regex")
});

/// Returns `true` if a status/body pair looks like the site defending itself.
pub fn is_bot_block(status: u16, body: &str) -> bool {
    status == 503 || looks_like_bot_challenge(body)
}

pub fn looks_like_bot_challenge(body: &str) -> bool {
    BOT_PATTERNS.is_match(body)
}

/// Issue one request through the shared session and classify the outcome.
///
/// On success the response is returned (from cache when possible). Transport
/// failures and bot blocks reset the session; other error statuses leave it
/// alone. No retry happens here.
///
/// # Errors
///
/// - [`FeedError::Transient`] on DNS, connect, timeout or body read failures.
/// - [`FeedError::BotBlocked`] on HTTP 503 or a block page.
/// - [`FeedError::Source`] on any other non-2xx status.
pub async fn fetch(
    session: &Session,
    request: &PageRequest,
    query: &Query,
) -> Result<RawResponse, FeedError> {
    if let Some(cached) = session.cache().get(request.method, &request.url) {
        tracing::debug!("\"{}\" - served from cache: {}", query.text, request.url);
        return Ok(cached);
    }

    let (client, headers) = session.snapshot(query).await;
    tracing::debug!("\"{}\" - querying: {} {}", query.text, request.method, request.url);

    let mut builder = match request.method {
        Method::Get => client.get(&request.url),
        Method::Post => client.post(&request.url),
    }
    .headers(headers);
    if let Some(body) = &request.body {
        builder = builder.json(body);
    }

    let response = match builder.send().await {
        Ok(response) => response,
        Err(e) => return Err(transport_failure(session, query, &request.url, e).await),
    };

    let status = response.status();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => return Err(transport_failure(session, query, &request.url, e).await),
    };

    if !status.is_success() {
        tracing::debug!("\"{}\" - response text: {}", query.text, body);

        if is_bot_block(status.as_u16(), &body) {
            session.reset_for(&request.url).await;
            tracing::warn!(
                "\"{}\" - paywall or bot detection (HTTP {})",
                query.text,
                status.as_u16()
            );
            return Err(FeedError::BotBlocked {
                url: request.url.clone(),
            });
        }

        tracing::error!("\"{}\" - HTTP error: {}", query.text, status.as_u16());
        return Err(FeedError::Source {
            status: status.as_u16(),
            url: request.url.clone(),
        });
    }

    let raw = RawResponse {
        url: request.url.clone(),
        status: status.as_u16(),
        body,
        content_type,
        from_cache: false,
    };
    session.cache().put(request.method, &request.url, &raw);
    Ok(raw)
}

async fn transport_failure(
    session: &Session,
    query: &Query,
    url: &str,
    source: reqwest::Error,
) -> FeedError {
    session.reset_for(url).await;
    tracing::error!("\"{}\" - request error: {}", query.text, source);
    FeedError::Transient {
        url: url.to_string(),
        source,
    }
}
