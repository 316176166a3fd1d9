use crate::config::{AppConfig, ItemSource, SearchMode};
use crate::http::PageRequest;
use crate::locale::Locale;
use crate::query::{PriceBound, Query, QueryKind};
use url::Url;

const ITEM_QUANTITY: u32 = 1;

/// URL builders for one storefront root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    root: String,
}

/// Everything a request needs, decided once from the query variant.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestPlan {
    pub request: PageRequest,
    pub home_page_url: String,
}

impl Endpoints {
    /// `base_url` replaces the locale's `https://{domain}` root when set.
    pub fn new(locale: &Locale, base_url: Option<&str>) -> Self {
        let root = match base_url {
            Some(base) => base.trim_end_matches('/').to_string(),
            None => locale.site_root(),
        };
        Self { root }
    }

    pub fn for_query(query: &Query, config: &AppConfig) -> Self {
        Self::new(query.locale, config.base_url.as_deref())
    }

    pub fn search_url(&self, query: &Query) -> String {
        self.with_params("/s", &search_params(query))
    }

    pub fn stream_search_url(&self, query: &Query) -> String {
        self.with_params("/s/query", &search_params(query))
    }

    pub fn item_url(&self, item_id: &str) -> String {
        format!("{}/gp/product/{}", self.root, item_id)
    }

    pub fn dimension_url(&self, item_id: &str) -> String {
        self.with_params(
            "/gp/product/ajax/twisterDimensionSlotsDefault",
            &[
                ("asinList", item_id.to_string()),
                ("asin", item_id.to_string()),
                ("deviceType", "mobile".to_string()),
            ],
        )
    }

    pub fn cart_url(&self, item_id: &str) -> String {
        format!(
            "{}/gp/aws/cart/add.html?ASIN.1={}&Quantity.1={}",
            self.root, item_id, ITEM_QUANTITY
        )
    }

    pub fn favicon_url(&self) -> String {
        format!("{}/favicon.ico", self.root)
    }

    fn with_params(&self, path: &str, params: &[(&str, String)]) -> String {
        let base = format!("{}{}", self.root, path);
        match Url::parse_with_params(&base, params) {
            Ok(url) => url.to_string(),
            Err(e) => {
                tracing::warn!("Request root {} is not a valid URL base: {}", self.root, e);
                let query: Vec<String> = params.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
                format!("{}?{}", base, query.join("&"))
            }
        }
    }
}

/// Pick the request and home page for a query, matching on its variant once.
pub fn plan(query: &Query, endpoints: &Endpoints, config: &AppConfig) -> RequestPlan {
    match query.kind {
        QueryKind::Keyword { .. } => {
            let home_page_url = endpoints.search_url(query);
            let request = match config.search_mode {
                SearchMode::Html => PageRequest::get(home_page_url.clone()),
                SearchMode::Stream => PageRequest::post_json(
                    endpoints.stream_search_url(query),
                    serde_json::json!({ "customer-action": "query" }),
                ),
            };
            RequestPlan {
                request,
                home_page_url,
            }
        }
        QueryKind::ItemId => {
            let home_page_url = endpoints.item_url(&query.text);
            let request = match config.item_source {
                ItemSource::Dimension => PageRequest::get(endpoints.dimension_url(&query.text)),
                ItemSource::Page => PageRequest::get(home_page_url.clone()),
            };
            RequestPlan {
                request,
                home_page_url,
            }
        }
    }
}

fn search_params(query: &Query) -> Vec<(&'static str, String)> {
    let mut params = vec![("k", query.text.clone())];
    if query.has_price_bounds() {
        // The site's price refinement is expressed in cents.
        params.push((
            "rh",
            format!(
                "p_36:{}-{}",
                cents(query.min_price.as_ref()),
                cents(query.max_price.as_ref())
            ),
        ));
    }
    params
}

fn cents(bound: Option<&PriceBound>) -> String {
    bound.map(|b| b.cents.to_string()).unwrap_or_default()
}
