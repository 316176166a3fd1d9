pub mod fetch;
pub mod session;
pub mod urls;

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One outbound request, fully described before it is sent.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<serde_json::Value>,
}

impl PageRequest {
    pub fn get(url: String) -> Self {
        Self {
            method: Method::Get,
            url,
            body: None,
        }
    }

    pub fn post_json(url: String, body: serde_json::Value) -> Self {
        Self {
            method: Method::Post,
            url,
            body: Some(body),
        }
    }
}

/// A successful response as read off the wire (or replayed from cache).
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub url: String,
    pub status: u16,
    pub body: String,
    pub content_type: Option<String>,
    pub from_cache: bool,
}
