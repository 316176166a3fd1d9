use crate::config::AppConfig;
use crate::error::FeedError;
use crate::http::session::Session;
use crate::feed::linked_data::linked_data_page;
use crate::query::{resolve, QueryTarget, RawParams};
use crate::scraper::{generate_feed, generate_linked_data};
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

/// Shared by every request: one session for the whole process.
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<Session>,
    pub config: Arc<AppConfig>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for FeedError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(search))
        .route("/search", get(search))
        .route("/query", get(search))
        .route("/item", get(item))
        .route("/asin", get(item))
        .route("/healthcheck", get(healthcheck))
        .with_state(state)
}

pub async fn serve(state: AppState) -> anyhow::Result<()> {
    let bind_addr = state.config.bind_addr.clone();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Listening on {}", bind_addr);
    axum::serve(listener, build_app(state)).await?;
    Ok(())
}

async fn search(
    State(state): State<AppState>,
    params: Result<Query<RawParams>, QueryRejection>,
) -> Result<Response, FeedError> {
    let params = with_default_country(query_params(params)?, &state.config);
    respond(&state, QueryTarget::Keyword, &params).await
}

async fn item(
    State(state): State<AppState>,
    params: Result<Query<RawParams>, QueryRejection>,
) -> Result<Response, FeedError> {
    let params = RawParams {
        strict: None,
        ..with_default_country(query_params(params)?, &state.config)
    };
    respond(&state, QueryTarget::ItemId, &params).await
}

/// A JSON feed, or an HTML page of linked data when `jsonld` is set.
async fn respond(state: &AppState, target: QueryTarget, params: &RawParams) -> Result<Response, FeedError> {
    let query = resolve(target, params)?;
    if query.linked_data {
        let products = generate_linked_data(&state.session, &state.config, &query).await?;
        let page = linked_data_page(&products)?;
        return Ok(Html(page).into_response());
    }
    let feed = generate_feed(&state.session, &state.config, &query).await?;
    Ok(Json(feed).into_response())
}

async fn healthcheck() -> &'static str {
    "OK"
}

/// Unreadable query strings (repeated keys, a name and its alias together)
/// are reported like any other validation problem.
fn query_params(params: Result<Query<RawParams>, QueryRejection>) -> Result<RawParams, FeedError> {
    params
        .map(|Query(params)| params)
        .map_err(|rejection| FeedError::Validation(vec![format!("Invalid parameters: {}", rejection.body_text())]))
}

fn with_default_country(params: RawParams, config: &AppConfig) -> RawParams {
    RawParams {
        country: params.country.or_else(|| Some(config.country.clone())),
        ..params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn app(config: AppConfig) -> Router {
        let session = Session::new(&config).expect("session");
        build_app(AppState {
            session: Arc::new(session),
            config: Arc::new(config),
        })
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).expect("request"))
            .await
            .expect("response");
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        (status, serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null))
    }

    #[tokio::test]
    async fn healthcheck_answers() {
        let response = app(AppConfig::default())
            .oneshot(Request::builder().uri("/healthcheck").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        assert_eq!(&body[..], b"OK");
    }

    #[tokio::test]
    async fn validation_errors_are_400_with_every_message() {
        let (status, json) =
            get_json(app(AppConfig::default()), "/search?q=&max_price=cheap").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Errors found: Invalid query, Invalid max price");
    }

    #[tokio::test]
    async fn conflicting_parameters_are_a_json_400() {
        for uri in ["/search?q=a&query=b", "/item?id=B07PGL2ZSL&id=B000000000"] {
            let (status, json) = get_json(app(AppConfig::default()), uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
            let message = json["error"].as_str().unwrap_or("");
            assert!(message.starts_with("Errors found: Invalid parameters"), "{}: {}", uri, message);
        }
    }

    #[tokio::test]
    async fn malformed_item_id_is_400() {
        let (status, json) = get_json(app(AppConfig::default()), "/item?id=nope").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Errors found: Invalid id (ASIN)");
    }

    #[tokio::test]
    async fn bot_block_is_429() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let config = AppConfig {
            base_url: Some(server.uri()),
            cache_ttl_secs: 0,
            ..AppConfig::default()
        };
        let (status, json) = get_json(app(config), "/?q=mouse").await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert!(json["error"].as_str().unwrap_or("").contains("Bot detection"));
    }

    #[tokio::test]
    async fn item_feed_is_served() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gp/product/ajax/twisterDimensionSlotsDefault"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "Value": {"content": {"twisterSlotJson": {"price": 19.99}}}
            })))
            .mount(&server)
            .await;

        let config = AppConfig {
            base_url: Some(server.uri()),
            country: "uk".to_string(),
            ..AppConfig::default()
        };
        let (status, json) = get_json(app(config), "/item?id=B07PGL2ZSL&max_price=20").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["version"], "https://jsonfeed.org/version/1.1");
        assert_eq!(
            json["title"],
            "www.amazon.co.uk - B07PGL2ZSL - filtered by max £20"
        );
        assert_eq!(json["items"][0]["title"], "[£19.99] B07PGL2ZSL");
    }

    #[tokio::test]
    async fn jsonld_item_is_an_html_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "Value": {"content": {"twisterSlotJson": {"price": 19.99}}}
            })))
            .mount(&server)
            .await;

        let config = AppConfig {
            base_url: Some(server.uri()),
            ..AppConfig::default()
        };
        let response = app(config)
            .oneshot(
                Request::builder()
                    .uri("/asin?id=B07PGL2ZSL&jsonld=yes")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/html"));
        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let page = String::from_utf8(body.to_vec()).unwrap();
        assert!(page.contains(r#"<script type="application/ld+json">"#));
        assert!(page.contains(r#""priceCurrency":"USD","price":"19.99""#));
    }
}
