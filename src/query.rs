use crate::error::FeedError;
use crate::locale::Locale;
use regex::Regex;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::LazyLock;

static ITEM_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(B[0-9A-Z]{9}|[0-9]{9}[0-9X])$").expect("valid item id regex"));

static PRICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+(\.[0-9]+)?$").expect("valid price regex"));

const TRUTHY: &[&str] = &["yes", "true"];

/// Free-form parameters as they arrive from the CLI or an HTTP request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawParams {
    #[serde(alias = "q", alias = "id")]
    pub query: Option<String>,
    pub country: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub strict: Option<String>,
    pub jsonld: Option<String>,
}

/// Which kind of lookup the caller asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryTarget {
    Keyword,
    ItemId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Keyword { strict: bool },
    ItemId,
}

/// A validated price bound. `raw` is what the user typed, kept for display;
/// `cents` is the whole-cent value the site's price refinement expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceBound {
    pub amount: Decimal,
    pub cents: Decimal,
    pub raw: String,
}

/// A fully validated query. Only [`resolve`] constructs one.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub text: String,
    pub locale: &'static Locale,
    pub min_price: Option<PriceBound>,
    pub max_price: Option<PriceBound>,
    pub kind: QueryKind,
    /// Render schema.org linked data instead of a feed.
    pub linked_data: bool,
}

/// Every problem found in a set of raw parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(pub Vec<String>);

impl From<ValidationErrors> for FeedError {
    fn from(errors: ValidationErrors) -> Self {
        FeedError::Validation(errors.0)
    }
}

impl Query {
    pub fn is_strict(&self) -> bool {
        matches!(self.kind, QueryKind::Keyword { strict: true })
    }

    pub fn is_item_lookup(&self) -> bool {
        self.kind == QueryKind::ItemId
    }

    pub fn has_price_bounds(&self) -> bool {
        self.min_price.is_some() || self.max_price.is_some()
    }
}

/// Validate raw parameters into a [`Query`]. All checks run, so the error
/// carries every problem at once.
pub fn resolve(target: QueryTarget, raw: &RawParams) -> Result<Query, ValidationErrors> {
    let mut errors = Vec::new();

    let text = raw.query.as_deref().unwrap_or("").trim().to_string();
    if text.is_empty() {
        errors.push("Invalid query".to_string());
    } else if target == QueryTarget::ItemId && !is_valid_item_id(&text) {
        errors.push("Invalid id (ASIN)".to_string());
    }

    let locale = resolve_locale(raw.country.as_deref());

    let min_price = parse_bound(raw.min_price.as_deref()).unwrap_or_else(|()| {
        errors.push("Invalid min price".to_string());
        None
    });
    let max_price = parse_bound(raw.max_price.as_deref()).unwrap_or_else(|()| {
        errors.push("Invalid max price".to_string());
        None
    });

    let kind = match target {
        QueryTarget::Keyword => QueryKind::Keyword {
            strict: parse_truthy(raw.strict.as_deref()),
        },
        QueryTarget::ItemId => QueryKind::ItemId,
    };

    if !errors.is_empty() {
        tracing::debug!("\"{}\" - rejected: {}", text, errors.join(", "));
        return Err(ValidationErrors(errors));
    }

    Ok(Query {
        text,
        locale,
        min_price,
        max_price,
        kind,
        linked_data: parse_truthy(raw.jsonld.as_deref()),
    })
}

pub fn is_valid_item_id(id: &str) -> bool {
    ITEM_ID_RE.is_match(id)
}

/// Map a country code onto the locale table. Anything unusable falls back to
/// the default locale; that is logged but never an error.
pub fn resolve_locale(country: Option<&str>) -> &'static Locale {
    let code = country.map(str::trim).unwrap_or("");
    if code.is_empty() {
        return Locale::default_locale();
    }

    if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        tracing::warn!("Malformed country code '{}', using default locale", code);
        return Locale::default_locale();
    }

    let code = code.to_ascii_uppercase();
    match Locale::find(&code) {
        Some(locale) => locale,
        None => {
            tracing::warn!("Unknown country code '{}', using default locale", code);
            Locale::default_locale()
        }
    }
}

fn parse_bound(raw: Option<&str>) -> Result<Option<PriceBound>, ()> {
    let raw = match raw.map(str::trim) {
        Some(s) if !s.is_empty() => s,
        _ => return Ok(None),
    };
    if !PRICE_RE.is_match(raw) {
        return Err(());
    }
    let amount = raw.parse::<Decimal>().map_err(|_| ())?;
    let cents = amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .ok_or(())?
        .trunc()
        .normalize();
    Ok(Some(PriceBound {
        amount,
        cents,
        raw: raw.to_string(),
    }))
}

fn parse_truthy(raw: Option<&str>) -> bool {
    raw.map(|s| s.trim().to_lowercase())
        .map(|s| TRUTHY.contains(&s.as_str()))
        .unwrap_or(false)
}
