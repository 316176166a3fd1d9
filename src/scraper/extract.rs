use super::decode::Payload;
use super::helpers::has_element;
use super::record::Record;
use crate::model::CandidateItem;
use crate::query::Query;
use scraper::{ElementRef, Html, Selector};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::LazyLock;

static RESULT_CARDS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div.s-result-item[data-asin]:not(.AdHolder)").expect("valid result card selector")
});

/// Markup that only a real product page carries.
const PRODUCT_PAGE_MARKERS: &str =
    "span#productTitle, span#price_inside_buybox, #corePrice_feature_div, div#outOfStock, div#unqualifiedBuyBox";

const DIMENSION_POINTER: &str = "/Value/content/twisterSlotJson";

/// Walk a decoded payload and pull out one candidate per product id.
///
/// Ids are unique in the result, first occurrence wins. Candidates with
/// nothing to report (no price and no availability) are dropped; an id
/// lookup still lists a titled product without a price.
pub fn extract(payload: &Payload, query: &Query) -> Vec<CandidateItem> {
    let candidates = match payload {
        Payload::Empty => Vec::new(),
        Payload::Html(doc) if query.is_item_lookup() => product_page(doc, query),
        Payload::Html(doc) => search_cards(doc.root_element()),
        Payload::Json(value) if query.is_item_lookup() => dimension_slot(value, query),
        Payload::Json(value) => json_listing(value, query),
        Payload::Stream(slots) => stream_slots(slots, query),
    };

    let found = candidates.len();
    let mut seen = HashSet::new();
    let kept: Vec<CandidateItem> = candidates
        .into_iter()
        .filter(|item| seen.insert(item.id.clone()))
        .filter(|item| {
            let listable = item.price.is_some()
                || item.availability.is_some()
                || (query.is_item_lookup() && item.title.is_some());
            if !listable {
                tracing::debug!("\"{}\" - no price or availability, skipping {}", query.text, item.id);
            }
            listable
        })
        .collect();

    tracing::debug!("\"{}\" - extracted {} of {} records", query.text, kept.len(), found);
    kept
}

fn search_cards(root: ElementRef) -> Vec<CandidateItem> {
    root.select(&RESULT_CARDS)
        .filter_map(|card| {
            let id = card.value().attr("data-asin")?.trim();
            if id.is_empty() {
                return None;
            }
            Some(Record::html(id, card).to_candidate())
        })
        .collect()
}

fn product_page(doc: &Html, query: &Query) -> Vec<CandidateItem> {
    let root = doc.root_element();
    if !has_element(&root, PRODUCT_PAGE_MARKERS) {
        tracing::debug!("\"{}\" - no product markup on page", query.text);
        return Vec::new();
    }
    vec![Record::html(query.text.as_str(), root).to_candidate()]
}

fn dimension_slot(value: &Value, query: &Query) -> Vec<CandidateItem> {
    match value.pointer(DIMENSION_POINTER) {
        Some(slot) if slot.is_object() => {
            vec![Record::json(query.text.as_str(), slot, query.locale).to_candidate()]
        }
        _ => {
            tracing::debug!("\"{}\" - no dimension data in response", query.text);
            Vec::new()
        }
    }
}

fn json_listing(value: &Value, query: &Query) -> Vec<CandidateItem> {
    let entries: Vec<&Value> = match value {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => match map.get("results") {
            Some(Value::Array(items)) => items.iter().collect(),
            _ => vec![value],
        },
        _ => Vec::new(),
    };
    entries
        .into_iter()
        .filter_map(|entry| json_candidate(entry, query))
        .collect()
}

fn stream_slots(slots: &Map<String, Value>, query: &Query) -> Vec<CandidateItem> {
    let mut candidates = Vec::new();
    for (slot, payload) in slots {
        if let Some(markup) = payload.get("html").and_then(Value::as_str) {
            let fragment = Html::parse_fragment(markup);
            let cards = search_cards(fragment.root_element());
            if !cards.is_empty() {
                tracing::debug!("\"{}\" - slot {} carried {} results", query.text, slot, cards.len());
            }
            candidates.extend(cards);
        } else if let Some(candidate) = json_candidate(payload, query) {
            candidates.push(candidate);
        }
    }
    candidates
}

fn json_candidate(entry: &Value, query: &Query) -> Option<CandidateItem> {
    let id = entry.get("asin").and_then(Value::as_str)?.trim();
    if id.is_empty() {
        return None;
    }
    Some(Record::json(id, entry, query.locale).to_candidate())
}
