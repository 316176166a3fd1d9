use super::sanitize::sanitize_html;
use crate::http::urls::Endpoints;
use crate::model::{CandidateItem, FeedItem};
use crate::query::Query;
use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt;

/// Why a candidate did not make it into the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    StrictMismatch,
    PriceMissing,
    PriceBelowMin,
    PriceExceeded,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Rejection::StrictMismatch => "strict-mismatch",
            Rejection::PriceMissing => "price-missing",
            Rejection::PriceBelowMin => "price-below-min",
            Rejection::PriceExceeded => "price-exceeded",
        })
    }
}

/// Apply the query's strict and price filters, keeping survivors in order.
pub fn filter_candidates(candidates: Vec<CandidateItem>, query: &Query) -> Vec<CandidateItem> {
    let found = candidates.len();
    let kept: Vec<CandidateItem> = candidates
        .into_iter()
        .filter(|candidate| match check(candidate, query) {
            Ok(()) => true,
            Err(reason) => {
                tracing::debug!(
                    "\"{}\" - {} - removed {} \"{}\"",
                    query.text,
                    reason,
                    candidate.id,
                    candidate.display_title()
                );
                false
            }
        })
        .collect();

    tracing::info!("\"{}\" - found {} - published {}", query.text, found, kept.len());
    kept
}

/// Turn filtered candidates into feed items stamped with `now`.
pub fn format_items(candidates: &[CandidateItem], endpoints: &Endpoints, now: DateTime<Utc>) -> Vec<FeedItem> {
    candidates
        .iter()
        .map(|candidate| format_item(candidate, endpoints, now))
        .collect()
}

/// Decide whether one candidate passes the strict and price filters.
pub fn check(candidate: &CandidateItem, query: &Query) -> Result<(), Rejection> {
    if query.is_strict() && !matches_terms(candidate, &query.text) {
        return Err(Rejection::StrictMismatch);
    }

    if !query.has_price_bounds() {
        return Ok(());
    }
    let price = candidate.price.as_ref().ok_or(Rejection::PriceMissing)?;
    if let Some(min) = &query.min_price {
        if price.amount < min.amount {
            return Err(Rejection::PriceBelowMin);
        }
    }
    if let Some(max) = &query.max_price {
        if price.amount > max.amount {
            return Err(Rejection::PriceExceeded);
        }
    }
    Ok(())
}

/// Every lowercase term of the query must appear somewhere in the title,
/// unless the candidate's id is the query itself.
fn matches_terms(candidate: &CandidateItem, query_text: &str) -> bool {
    if candidate.id == query_text {
        return true;
    }
    let title = candidate.title.as_deref().unwrap_or("").to_lowercase();
    query_text
        .to_lowercase()
        .split_whitespace()
        .all(|term| title.contains(term))
}

fn format_item(candidate: &CandidateItem, endpoints: &Endpoints, now: DateTime<Utc>) -> FeedItem {
    let item_url = endpoints.item_url(&candidate.id);
    let cart_url = endpoints.cart_url(&candidate.id);
    let timestamp = now.to_rfc3339_opts(SecondsFormat::Millis, true);

    let price_text = candidate
        .price
        .as_ref()
        .map(|p| p.text.as_str())
        .unwrap_or("N/A");
    let title = match &candidate.availability {
        Some(note) => format!("[{}] {} {}", price_text, note, candidate.display_title()),
        None => format!("[{}] {}", price_text, candidate.display_title()),
    };

    let mut body = String::new();
    if let Some(image) = &candidate.thumbnail {
        body.push_str(&format!("<img src=\"{}\" />", image));
    }
    body.push_str(&format!("<p><a href=\"{}\">Product Link</a></p>", item_url));
    body.push_str(&format!("<p><a href=\"{}\">Add to Cart</a></p>", cart_url));

    FeedItem {
        id: format!("{}@{}", candidate.id, timestamp),
        url: item_url,
        title,
        content_html: sanitize_html(&body),
        image: candidate.thumbnail.clone(),
        date_published: timestamp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Price;
    use crate::query::{resolve, QueryTarget, RawParams};
    use chrono::TimeZone;
    use rust_decimal::Decimal;

    fn keyword(text: &str, strict: bool, min: Option<&str>, max: Option<&str>) -> Query {
        resolve(
            QueryTarget::Keyword,
            &RawParams {
                query: Some(text.to_string()),
                country: None,
                min_price: min.map(str::to_string),
                max_price: max.map(str::to_string),
                strict: strict.then(|| "yes".to_string()),
                jsonld: None,
            },
        )
        .unwrap()
    }

    fn candidate(id: &str, title: &str, price: Option<(i64, u32)>) -> CandidateItem {
        CandidateItem {
            title: Some(title.to_string()),
            price: price.map(|(num, scale)| {
                let amount = Decimal::new(num, scale);
                Price {
                    amount,
                    text: format!("${}", amount),
                }
            }),
            ..CandidateItem::new(id)
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 12, 30, 0).unwrap()
    }

    #[test]
    fn strict_mode_is_substring_containment() {
        let item = candidate("B000000001", "Wireless Mouse Black", Some((1999, 2)));
        assert_eq!(check(&item, &keyword("wireless mouse", true, None, None)), Ok(()));
        assert_eq!(check(&item, &keyword("WIRE mou", true, None, None)), Ok(()));
        assert_eq!(
            check(&item, &keyword("wireless keyboard", true, None, None)),
            Err(Rejection::StrictMismatch)
        );
        assert_eq!(check(&item, &keyword("wireless keyboard", false, None, None)), Ok(()));
    }

    #[test]
    fn strict_mode_accepts_id_equal_to_query() {
        let item = candidate("B000000001", "Wireless Mouse Black", Some((1999, 2)));
        assert_eq!(check(&item, &keyword("B000000001", true, None, None)), Ok(()));
    }

    #[test]
    fn max_price_is_inclusive() {
        let query = keyword("mouse", false, None, Some("100"));
        assert_eq!(
            check(&candidate("B1", "Mouse", Some((10500, 2))), &query),
            Err(Rejection::PriceExceeded)
        );
        assert_eq!(check(&candidate("B2", "Mouse", Some((10000, 2))), &query), Ok(()));
    }

    #[test]
    fn min_price_is_inclusive() {
        let query = keyword("mouse", false, Some("10"), None);
        assert_eq!(
            check(&candidate("B1", "Mouse", Some((999, 2))), &query),
            Err(Rejection::PriceBelowMin)
        );
        assert_eq!(check(&candidate("B2", "Mouse", Some((1000, 2))), &query), Ok(()));
    }

    #[test]
    fn priceless_candidates_fail_any_bound() {
        let query = keyword("mouse", false, None, Some("100"));
        assert_eq!(
            check(&candidate("B1", "Mouse", None), &query),
            Err(Rejection::PriceMissing)
        );
        assert_eq!(check(&candidate("B1", "Mouse", None), &keyword("mouse", false, None, None)), Ok(()));
    }

    #[test]
    fn filtering_keeps_survivors_in_order() {
        let query = keyword("mouse", false, None, Some("20"));
        let kept = filter_candidates(
            vec![
                candidate("B1", "Mouse One", Some((1500, 2))),
                candidate("B2", "Mouse Two", Some((2500, 2))),
                candidate("B3", "Mouse Three", None),
                candidate("B4", "Mouse Four", Some((2000, 2))),
            ],
            &query,
        );
        let ids: Vec<&str> = kept.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["B1", "B4"]);
    }

    #[test]
    fn feed_item_layout() {
        let query = keyword("mouse", false, None, None);
        let endpoints = Endpoints::new(query.locale, None);
        let mut item = candidate("B07PGL2ZSL", "Wireless Mouse", Some((1299, 2)));
        item.thumbnail = Some("https://m.media-amazon.com/images/I/mouse.jpg".to_string());

        let items = format_items(&filter_candidates(vec![item], &query), &endpoints, now());
        assert_eq!(items.len(), 1);
        let feed_item = &items[0];
        assert_eq!(feed_item.id, "B07PGL2ZSL@2026-10-19T12:30:00.000Z");
        assert_eq!(feed_item.date_published, "2026-10-19T12:30:00.000Z");
        assert_eq!(feed_item.url, "https://www.amazon.com/gp/product/B07PGL2ZSL");
        assert_eq!(feed_item.title, "[$12.99] Wireless Mouse");
        assert_eq!(
            feed_item.content_html,
            "<img src=\"https://m.media-amazon.com/images/I/mouse.jpg\">\
             <p><a href=\"https://www.amazon.com/gp/product/B07PGL2ZSL\">Product Link</a></p>\
             <p><a href=\"https://www.amazon.com/gp/aws/cart/add.html?ASIN.1=B07PGL2ZSL&Quantity.1=1\">Add to Cart</a></p>"
        );
    }

    #[test]
    fn title_falls_back_to_id_and_carries_annotation() {
        let query = keyword("mouse", false, None, None);
        let endpoints = Endpoints::new(query.locale, None);
        let item = CandidateItem {
            availability: Some("Save 10%".to_string()),
            ..CandidateItem::new("B07PGL2ZSL")
        };
        let items = format_items(&filter_candidates(vec![item], &query), &endpoints, now());
        assert_eq!(items[0].title, "[N/A] Save 10% B07PGL2ZSL");
        assert_eq!(items[0].image, None);
    }

    #[test]
    fn hostile_thumbnail_cannot_inject_markup() {
        let query = keyword("mouse", false, None, None);
        let endpoints = Endpoints::new(query.locale, None);
        let item = CandidateItem {
            thumbnail: Some("x.jpg\" onerror=\"alert(1)".to_string()),
            ..candidate("B07PGL2ZSL", "Mouse", Some((100, 0)))
        };
        let items = format_items(&filter_candidates(vec![item], &query), &endpoints, now());
        assert!(!items[0].content_html.contains("onerror"));
    }
}
