use crate::cache::ResponseCache;
use crate::config::AppConfig;
use crate::error::FeedError;
use crate::query::Query;
use rand::seq::IndexedRandom;
use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, REFERER, USER_AGENT};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Headers sent with every request, mimicking the shopping app's web view.
const STATIC_HEADERS: &[(&str, &str)] = &[
    ("accept", "text/html,*/*"),
    ("accept-language", "en-US,en;q=0.5"),
    ("x-requested-with", "XMLHttpRequest"),
    ("device-memory", "8"),
    ("downlink", "9.3"),
    ("dpr", "2"),
    ("ect", "4g"),
    ("rtt", "0"),
    ("sec-ch-device-memory", "8"),
    ("sec-ch-dpr", "2"),
    (
        "sec-ch-ua",
        "\"Chromium\";v=\"128\", \"Not;A=Brand\";v=\"24\", \"Android WebView\";v=\"128\"",
    ),
    ("sec-ch-ua-mobile", "?1"),
    ("sec-ch-ua-platform", "\"Android\""),
    ("sec-ch-ua-platform-version", "\"\""),
    ("sec-ch-viewport-width", "393"),
    ("sec-fetch-dest", "empty"),
    ("sec-fetch-mode", "cors"),
    ("sec-fetch-site", "same-origin"),
    ("viewport-width", "393"),
];

/// The process-wide HTTP session: one client with a cookie jar, a sticky
/// user agent and a short-lived response cache.
///
/// Mutable state sits behind a single mutex. Requests copy what they need
/// (client handle and headers) while holding it, so a reset only affects
/// requests that start afterwards.
pub struct Session {
    state: Mutex<SessionState>,
    cache: ResponseCache,
    user_agents: Vec<String>,
    timeout: Duration,
}

struct SessionState {
    client: Client,
    jar: Arc<Jar>,
    user_agent: Option<String>,
}

impl Session {
    pub fn new(config: &AppConfig) -> Result<Self, FeedError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let (client, jar) = build_client(timeout)?;

        Ok(Session {
            state: Mutex::new(SessionState {
                client,
                jar,
                user_agent: None,
            }),
            cache: ResponseCache::new(config.cache_ttl()),
            user_agents: config.user_agents.clone(),
            timeout,
        })
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Static headers merged with the session user agent and the query's
    /// locale referer.
    #[cfg(test)]
    pub(crate) async fn current_headers(&self, query: &Query) -> HeaderMap {
        let mut state = self.state.lock().await;
        self.headers_locked(&mut state, query)
    }

    /// Client handle and headers for one request, taken atomically.
    pub(crate) async fn snapshot(&self, query: &Query) -> (Client, HeaderMap) {
        let mut state = self.state.lock().await;
        let headers = self.headers_locked(&mut state, query);
        (state.client.clone(), headers)
    }

    /// Drop all cookies and forget the user agent; a new one is picked on the
    /// next request. Either everything is replaced or nothing is.
    pub async fn reset(&self) {
        let fresh = build_client(self.timeout);
        let mut state = self.state.lock().await;
        match fresh {
            Ok((client, jar)) => {
                state.client = client;
                state.jar = jar;
                state.user_agent = None;
                tracing::debug!("Session reset: cookies cleared, user agent released");
            }
            Err(e) => {
                tracing::error!("Session reset failed, keeping current session: {}", e);
            }
        }
    }

    /// Reset the session and forget any cached response for `url`.
    pub async fn reset_for(&self, url: &str) {
        self.reset().await;
        self.cache.invalidate(url);
    }

    fn headers_locked(&self, state: &mut SessionState, query: &Query) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for &(name, value) in STATIC_HEADERS {
            headers.insert(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            );
        }

        if state.user_agent.is_none() {
            state.user_agent = self.user_agents.choose(&mut rand::rng()).cloned();
            if let Some(agent) = &state.user_agent {
                tracing::debug!("\"{}\" - using user agent: \"{}\"", query.text, agent);
            }
        }
        if let Some(agent) = &state.user_agent {
            match HeaderValue::from_str(agent) {
                Ok(value) => {
                    headers.insert(USER_AGENT, value);
                }
                Err(_) => tracing::warn!("Skipping unusable user agent: {:?}", agent),
            }
        }

        let referer = format!("https://{}/", query.locale.domain);
        if let Ok(value) = HeaderValue::from_str(&referer) {
            headers.insert(REFERER, value);
        }

        headers
    }

    #[cfg(test)]
    pub(crate) async fn current_user_agent(&self) -> Option<String> {
        self.state.lock().await.user_agent.clone()
    }

    #[cfg(test)]
    pub(crate) async fn cookie_header(&self, url: &str) -> Option<String> {
        use reqwest::cookie::CookieStore;
        let url = url::Url::parse(url).ok()?;
        let state = self.state.lock().await;
        state
            .jar
            .cookies(&url)
            .and_then(|v| v.to_str().ok().map(str::to_string))
    }
}

fn build_client(timeout: Duration) -> Result<(Client, Arc<Jar>), FeedError> {
    let jar = Arc::new(Jar::default());
    let client = Client::builder()
        .cookie_provider(Arc::clone(&jar))
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .build()
        .map_err(|e| FeedError::Config(format!("Failed to build HTTP client: {}", e)))?;
    Ok((client, jar))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{resolve, QueryTarget, RawParams};
    use wiremock::matchers::{header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn keyword_query(country: &str) -> Query {
        resolve(
            QueryTarget::Keyword,
            &RawParams {
                query: Some("wireless mouse".to_string()),
                country: Some(country.to_string()),
                ..RawParams::default()
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn headers_carry_locale_referer_and_sticky_agent() {
        let session = Session::new(&AppConfig::default()).unwrap();
        let query = keyword_query("de");

        let first = session.current_headers(&query).await;
        let second = session.current_headers(&query).await;

        assert_eq!(first.get(REFERER).unwrap(), "https://www.amazon.de/");
        assert_eq!(first.get("sec-ch-ua-mobile").unwrap(), "?1");
        assert!(first.get(USER_AGENT).is_some());
        assert_eq!(first.get(USER_AGENT), second.get(USER_AGENT));
    }

    #[tokio::test]
    async fn reset_releases_agent_and_cookies() {
        let session = Session::new(&AppConfig::default()).unwrap();
        let query = keyword_query("us");
        let url = "https://www.amazon.com/";

        session.current_headers(&query).await;
        {
            let state = session.state.lock().await;
            let parsed = url::Url::parse(url).unwrap();
            state.jar.add_cookie_str("session-id=123; Path=/", &parsed);
        }
        assert!(session.current_user_agent().await.is_some());
        assert!(session.cookie_header(url).await.is_some());

        session.reset().await;

        assert!(session.current_user_agent().await.is_none());
        assert!(session.cookie_header(url).await.is_none());

        let headers = session.current_headers(&query).await;
        assert!(headers.get(USER_AGENT).is_some());
    }

    #[tokio::test]
    async fn configured_agents_are_used() {
        let config = AppConfig {
            user_agents: vec!["test-agent/1.0".to_string()],
            ..AppConfig::default()
        };
        let session = Session::new(&config).unwrap();
        let headers = session.current_headers(&keyword_query("us")).await;
        assert_eq!(headers.get(USER_AGENT).unwrap(), "test-agent/1.0");
    }

    #[tokio::test]
    async fn reset_leaves_a_taken_snapshot_untouched() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("cookie", "session-id=123"))
            .and(header("user-agent", "agent-a"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let config = AppConfig {
            user_agents: vec!["agent-a".to_string()],
            ..AppConfig::default()
        };
        let session = Session::new(&config).unwrap();
        let query = keyword_query("us");
        {
            let state = session.state.lock().await;
            let parsed = url::Url::parse(&server.uri()).unwrap();
            state.jar.add_cookie_str("session-id=123; Path=/", &parsed);
        }

        let (client_a, headers_a) = session.snapshot(&query).await;
        session.reset().await;
        assert!(session.current_user_agent().await.is_none());
        assert!(session.cookie_header(&server.uri()).await.is_none());

        let (client_b, headers_b) = session.snapshot(&query).await;
        assert_eq!(headers_a.get(USER_AGENT).unwrap(), "agent-a");
        assert!(headers_b.get(USER_AGENT).is_some());
        assert!(session.current_user_agent().await.is_some());

        let a = client_a.get(server.uri()).headers(headers_a).send().await.unwrap();
        assert_eq!(a.status().as_u16(), 200, "request A keeps its cookies and agent");
        let b = client_b.get(server.uri()).headers(headers_b).send().await.unwrap();
        assert_eq!(b.status().as_u16(), 204, "request B starts from an empty jar");
    }
}
