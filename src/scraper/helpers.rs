use rust_decimal::Decimal;
use scraper::{ElementRef, Selector};
use std::str::FromStr;

/// Image attributes in order of preference, highest resolution first.
pub const THUMBNAIL_ATTRS: &[&str] = &["data-old-hires", "data-a-hires", "data-src", "src"];

/// Parse a price string by extracting digits, periods, and commas, then
/// determine the decimal separator based on position and context.
/// Handles both US format (1,234.56) and European format (1.234,56).
pub fn parse_price_str(s: &str) -> Option<Decimal> {
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();

    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let normalized = match (cleaned.rfind('.'), cleaned.rfind(',')) {
        // Both present: the last one is the decimal separator
        (Some(last_dot), Some(last_comma)) if last_comma > last_dot => {
            cleaned.replace('.', "").replacen(',', ".", 1)
        }
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (None, Some(last_comma)) => {
            let after_comma = &cleaned[last_comma + 1..];
            if after_comma.len() == 3 && after_comma.chars().all(|c| c.is_ascii_digit()) {
                // "1,000"
                cleaned.replace(',', "")
            } else {
                // "23,99"
                cleaned.replacen(',', ".", 1)
            }
        }
        _ => cleaned,
    };

    let normalized = normalized.trim_matches('.');
    Decimal::from_str(normalized).ok()
}

/// Parse a JSON price field, which may be a number or a display string.
pub fn parse_price_value(value: &serde_json::Value) -> Option<Decimal> {
    match value {
        serde_json::Value::Number(n) => {
            let text = n.to_string();
            Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .ok()
        }
        serde_json::Value::String(s) => parse_price_str(s),
        _ => None,
    }
}

/// Rebuild a price the site renders as separate currency, whole and fraction
/// nodes, e.g. `["$", "12", "99"]` becomes `$12.99`.
pub fn join_split_price(currency: &str, whole: &str, fraction: &str) -> Option<String> {
    let whole = whole.trim().trim_end_matches(['.', ',']);
    let fraction = fraction.trim();
    if whole.is_empty() || !whole.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    let currency = currency.trim();
    if fraction.is_empty() {
        Some(format!("{}{}", currency, whole))
    } else {
        Some(format!("{}{}.{}", currency, whole, fraction))
    }
}

/// Extract text from an element reference by trying comma-separated CSS selectors.
pub fn extract_element_text(el: &ElementRef, selectors: &str) -> Option<String> {
    for sel_str in selectors.split(',') {
        if let Ok(sel) = Selector::parse(sel_str.trim()) {
            if let Some(child) = el.select(&sel).next() {
                let text = collapse_text(child);
                if !text.is_empty() {
                    return Some(text);
                }
            }
        }
    }
    None
}

/// First non-empty attribute value from the first matching element.
pub fn extract_element_attr(el: &ElementRef, selectors: &str, attr: &str) -> Option<String> {
    for sel_str in selectors.split(',') {
        if let Ok(sel) = Selector::parse(sel_str.trim()) {
            let found = el
                .select(&sel)
                .filter_map(|child| child.value().attr(attr))
                .map(str::trim)
                .find(|value| !value.is_empty());
            if let Some(value) = found {
                return Some(value.to_string());
            }
        }
    }
    None
}

/// Does any of the comma-separated selectors match below `el`?
pub fn has_element(el: &ElementRef, selectors: &str) -> bool {
    selectors.split(',').any(|sel_str| {
        Selector::parse(sel_str.trim())
            .map(|sel| el.select(&sel).next().is_some())
            .unwrap_or(false)
    })
}

/// Pick the best image URL from an `<img>`, skipping inline `data:` URIs.
pub fn preferred_image_url(img: &ElementRef) -> Option<String> {
    THUMBNAIL_ATTRS
        .iter()
        .filter_map(|attr| img.value().attr(attr))
        .map(str::trim)
        .find(|url| !url.is_empty() && !url.starts_with("data:"))
        .map(str::to_string)
}

/// All text below `el` with whitespace runs collapsed.
pub fn collapse_text(el: ElementRef) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
