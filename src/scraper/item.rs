use super::candidates_from;
use crate::config::AppConfig;
use crate::error::FeedError;
use crate::feed::filter::filter_candidates;
use crate::http::fetch::fetch;
use crate::http::session::Session;
use crate::http::urls::RequestPlan;
use crate::model::CandidateItem;
use crate::query::Query;
use std::time::Duration;

/// What one lookup attempt produced.
#[derive(Debug)]
enum Attempt {
    Found(Vec<CandidateItem>),
    /// Nothing usable yet; worth asking again.
    Empty,
    Transient(FeedError),
}

/// Item lookup with a bounded retry loop.
///
/// Empty or unparseable payloads and transport failures are retried up to
/// `config.item_attempts` times, with the cache entry dropped and a fixed
/// pause before each new attempt. Running out after an empty payload gives
/// an empty list; running out after a transport failure returns that error.
/// Bot blocks and source errors end the loop at once.
pub async fn lookup_items(
    session: &Session,
    config: &AppConfig,
    query: &Query,
    plan: &RequestPlan,
) -> Result<Vec<CandidateItem>, FeedError> {
    let attempts = config.item_attempts.max(1);
    let delay = Duration::from_millis(config.retry_delay_ms);
    let mut last = Attempt::Empty;

    for attempt in 1..=attempts {
        match try_once(session, query, plan).await? {
            Attempt::Found(candidates) => {
                return Ok(filter_candidates(candidates, query));
            }
            outcome => last = outcome,
        }

        if attempt < attempts {
            tracing::warn!(
                "\"{}\" - attempt {}/{} unsuccessful, retrying in {:?}",
                query.text,
                attempt,
                attempts,
                delay
            );
            session.cache().invalidate(&plan.request.url);
            tokio::time::sleep(delay).await;
        }
    }

    match last {
        Attempt::Transient(e) => Err(e),
        _ => {
            tracing::info!("\"{}\" - not found after {} attempts", query.text, attempts);
            Ok(Vec::new())
        }
    }
}

async fn try_once(session: &Session, query: &Query, plan: &RequestPlan) -> Result<Attempt, FeedError> {
    let raw = match fetch(session, &plan.request, query).await {
        Ok(raw) => raw,
        Err(e @ FeedError::Transient { .. }) => return Ok(Attempt::Transient(e)),
        Err(e) => return Err(e),
    };

    match candidates_from(&raw, query) {
        Ok(candidates) if candidates.is_empty() => Ok(Attempt::Empty),
        Ok(candidates) => Ok(Attempt::Found(candidates)),
        Err(FeedError::Parse { reason, .. }) => {
            tracing::error!("\"{}\" - parsing error: {}", query.text, reason);
            Ok(Attempt::Empty)
        }
        Err(e @ FeedError::BotBlocked { .. }) => {
            session.reset_for(&plan.request.url).await;
            tracing::warn!("\"{}\" - captcha triggered", query.text);
            Err(e)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ItemSource;
    use crate::http::urls::{plan, Endpoints};
    use crate::query::{resolve, QueryTarget, RawParams};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const DIMENSION_PATH: &str = "/gp/product/ajax/twisterDimensionSlotsDefault";

    fn config(base_url: String) -> AppConfig {
        AppConfig {
            base_url: Some(base_url),
            cache_ttl_secs: 60,
            timeout_secs: 5,
            item_attempts: 3,
            retry_delay_ms: 10,
            ..AppConfig::default()
        }
    }

    fn lookup(max_price: Option<&str>) -> Query {
        resolve(
            QueryTarget::ItemId,
            &RawParams {
                query: Some("B07PGL2ZSL".to_string()),
                max_price: max_price.map(str::to_string),
                ..RawParams::default()
            },
        )
        .unwrap()
    }

    async fn run(config: &AppConfig, query: &Query) -> (Session, Result<Vec<CandidateItem>, FeedError>) {
        let session = Session::new(config).unwrap();
        let endpoints = Endpoints::for_query(query, config);
        let plan = plan(query, &endpoints, config);
        let result = lookup_items(&session, config, query, &plan).await;
        (session, result)
    }

    fn json(body: serde_json::Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(body)
    }

    #[tokio::test]
    async fn found_on_first_attempt() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(DIMENSION_PATH))
            .and(query_param("asin", "B07PGL2ZSL"))
            .respond_with(json(serde_json::json!({
                "Value": {"content": {"twisterSlotJson": {"price": 24.99}}}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (_, result) = run(&config(server.uri()), &lookup(None)).await;
        let items = result.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "B07PGL2ZSL");
        assert_eq!(items[0].price.as_ref().map(|p| p.text.as_str()), Some("$24.99"));
    }

    #[tokio::test]
    async fn empty_payloads_exhaust_retries_into_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(DIMENSION_PATH))
            .respond_with(json(serde_json::json!({"Value": {"content": {}}})))
            .expect(3)
            .mount(&server)
            .await;

        let (_, result) = run(&config(server.uri()), &lookup(None)).await;
        assert!(result.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unparseable_payloads_are_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("{\"Value\": ", "application/json"),
            )
            .expect(3)
            .mount(&server)
            .await;

        let (_, result) = run(&config(server.uri()), &lookup(None)).await;
        assert!(result.unwrap().is_empty());
    }

    #[tokio::test]
    async fn second_attempt_can_succeed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(json(serde_json::json!({"Value": {"content": {}}})))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(json(serde_json::json!({
                "Value": {"content": {"twisterSlotJson": {"price": 12}}}
            })))
            .with_priority(2)
            .mount(&server)
            .await;

        let (_, result) = run(&config(server.uri()), &lookup(None)).await;
        assert_eq!(result.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn bot_block_aborts_without_retrying() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let (session, result) = run(&config(server.uri()), &lookup(None)).await;
        let err = result.unwrap_err();
        assert!(matches!(err, FeedError::BotBlocked { .. }));
        assert_eq!(err.status_code(), 429);
        assert!(session.current_user_agent().await.is_none());
    }

    #[tokio::test]
    async fn source_error_aborts_without_retrying() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let (_, result) = run(&config(server.uri()), &lookup(None)).await;
        assert!(matches!(result.unwrap_err(), FeedError::Source { status: 404, .. }));
    }

    #[tokio::test]
    async fn price_above_bound_is_filtered_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(json(serde_json::json!({
                "Value": {"content": {"twisterSlotJson": {"price": 150}}}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (_, result) = run(&config(server.uri()), &lookup(Some("100"))).await;
        assert!(result.unwrap().is_empty());
    }

    #[tokio::test]
    async fn product_page_source() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gp/product/B07PGL2ZSL"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(
                        r#"<html><body><span id="productTitle">Echo Dot</span><span id="price_inside_buybox">$49.99</span></body></html>"#,
                        "text/html",
                    ),
            )
            .mount(&server)
            .await;

        let config = AppConfig {
            item_source: ItemSource::Page,
            ..config(server.uri())
        };
        let (_, result) = run(&config, &lookup(None)).await;
        let items = result.unwrap();
        assert_eq!(items[0].title.as_deref(), Some("Echo Dot"));
        assert_eq!(items[0].price.as_ref().map(|p| p.text.as_str()), Some("$49.99"));
    }

    #[tokio::test]
    async fn transport_failures_exhaust_into_transient_error() {
        let config = AppConfig {
            item_attempts: 2,
            timeout_secs: 1,
            ..config("http://127.0.0.1:9".to_string())
        };
        let (_, result) = run(&config, &lookup(None)).await;
        assert!(matches!(result.unwrap_err(), FeedError::Transient { .. }));
    }
}
