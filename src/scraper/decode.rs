use crate::error::FeedError;
use crate::http::fetch::looks_like_bot_challenge;
use crate::http::RawResponse;
use scraper::Html;
use serde_json::{Map, Value};

/// Separator between JSON arrays in a streamed search response.
pub const STREAM_DELIMITER: &str = "&&&";

const STREAMING_CONTENT_TYPE: &str = "json-amazonui-streaming";

/// Markers of the captcha form served with a 200 status.
const CAPTCHA_MARKERS: &[&str] = &["captchacharacters", "/errors/validateCaptcha"];

/// A successful response decoded according to its wire shape.
///
/// `Html` holds a parsed DOM, which is not `Send`; decode and extract in one
/// synchronous step and keep only the owned results across an `.await`.
#[derive(Debug)]
pub enum Payload {
    /// Slot key to payload, in stream order.
    Stream(Map<String, Value>),
    Json(Value),
    Html(Html),
    /// Nothing in the body. Valid, zero results.
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Stream,
    Json,
    Html,
}

/// Decode a 2xx response.
///
/// # Errors
///
/// - [`FeedError::BotBlocked`] when a challenge page came back with a 2xx status.
/// - [`FeedError::Parse`] when the body does not match its declared shape.
pub fn decode(response: &RawResponse) -> Result<Payload, FeedError> {
    let body = response.body.trim();
    if body.is_empty() {
        tracing::debug!("Empty body from {}", response.url);
        return Ok(Payload::Empty);
    }

    match detect_shape(response.content_type.as_deref(), body) {
        Shape::Stream => decode_stream(body).map(Payload::Stream).map_err(|reason| {
            tracing::debug!("Undecodable stream from {}: {}", response.url, response.body);
            FeedError::Parse {
                url: response.url.clone(),
                reason,
            }
        }),
        Shape::Json => match serde_json::from_str::<Value>(body) {
            Ok(value) => Ok(Payload::Json(value)),
            Err(e) => {
                tracing::debug!("Undecodable JSON from {}: {}", response.url, response.body);
                if looks_like_bot_challenge(body) {
                    Err(FeedError::BotBlocked {
                        url: response.url.clone(),
                    })
                } else {
                    Err(FeedError::Parse {
                        url: response.url.clone(),
                        reason: e.to_string(),
                    })
                }
            }
        },
        Shape::Html => {
            if CAPTCHA_MARKERS.iter().any(|marker| body.contains(marker)) {
                tracing::debug!("Captcha page from {}: {}", response.url, response.body);
                return Err(FeedError::BotBlocked {
                    url: response.url.clone(),
                });
            }
            Ok(Payload::Html(Html::parse_document(body)))
        }
    }
}

fn detect_shape(content_type: Option<&str>, body: &str) -> Shape {
    let content_type = content_type.unwrap_or("").to_ascii_lowercase();
    if content_type.contains(STREAMING_CONTENT_TYPE)
        || (body.starts_with('[') && body.contains(STREAM_DELIMITER))
    {
        Shape::Stream
    } else if content_type.contains("json") || body.starts_with('{') {
        Shape::Json
    } else {
        Shape::Html
    }
}

/// Split a streamed body into `[tag, slot, payload]` triples keyed by slot.
///
/// Segments that are not such triples are skipped; it is an error only when
/// there was something to decode and none of it was usable.
pub fn decode_stream(body: &str) -> Result<Map<String, Value>, String> {
    let mut slots = Map::new();
    let mut skipped = 0usize;

    for segment in body.split(STREAM_DELIMITER) {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        match parse_triple(segment) {
            Ok((slot, payload)) => {
                slots.insert(slot, payload);
            }
            Err(reason) => {
                skipped += 1;
                tracing::debug!("Skipping stream segment: {}", reason);
            }
        }
    }

    if slots.is_empty() && skipped > 0 {
        return Err(format!("none of {} stream segments decoded", skipped));
    }
    Ok(slots)
}

fn parse_triple(segment: &str) -> Result<(String, Value), String> {
    let value: Value = serde_json::from_str(segment).map_err(|e| e.to_string())?;
    match value {
        Value::Array(items) if items.len() == 3 => {
            let mut items = items.into_iter();
            let _tag = items.next();
            let slot = match items.next() {
                Some(Value::String(slot)) => slot,
                _ => return Err("slot key is not a string".to_string()),
            };
            let payload = items.next().unwrap_or(Value::Null);
            Ok((slot, payload))
        }
        _ => Err("segment is not a 3-element array".to_string()),
    }
}
