use super::helpers::{
    collapse_text, extract_element_attr, extract_element_text, has_element, join_split_price,
    parse_price_str, parse_price_value, preferred_image_url,
};
use crate::locale::Locale;
use crate::model::{CandidateItem, Price};
use scraper::{ElementRef, Selector};
use serde_json::Value;
use std::sync::LazyLock;

const TITLE_LABEL_SELECTORS: &str = "h2[aria-label]";
const TITLE_TEXT_SELECTORS: &str = "span#productTitle, [class*='s-line-clamp-'], h2";
const PRICE_TEXT_SELECTORS: &str =
    "span#price_inside_buybox, #corePrice_feature_div .a-offscreen, .a-price .a-offscreen";
const IMAGE_SELECTORS: &str =
    "img#landingImage, [data-component-type='s-product-image'] .s-image, img.s-image";
const UNAVAILABLE_SELECTORS: &str = "div#outOfStock, div#unqualifiedBuyBox";
const COUPON_SELECTORS: &str =
    ".s-coupon-unclipped, .s-coupon-clipped, [data-component-type='s-coupon-component']";

static SPLIT_PRICE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".a-price").expect("valid split price selector"));

/// Annotation used when the page says the product cannot be bought.
pub const UNAVAILABLE: &str = "Unavailable";

/// The logical fields every product record exposes, whatever its encoding.
pub trait ProductFacts {
    fn title(&self) -> Option<String>;
    fn price(&self) -> Option<Price>;
    fn thumbnail(&self) -> Option<String>;
    fn availability(&self) -> Option<String>;
}

/// One product's markup: a search result card or a whole product page.
pub struct HtmlRecord<'a> {
    pub element: ElementRef<'a>,
}

/// One product's JSON subtree.
pub struct JsonRecord<'a> {
    pub value: &'a Value,
    pub locale: &'static Locale,
}

pub enum Record<'a> {
    Html { id: String, record: HtmlRecord<'a> },
    Json { id: String, record: JsonRecord<'a> },
}

impl<'a> Record<'a> {
    pub fn html(id: impl Into<String>, element: ElementRef<'a>) -> Self {
        Record::Html {
            id: id.into(),
            record: HtmlRecord { element },
        }
    }

    pub fn json(id: impl Into<String>, value: &'a Value, locale: &'static Locale) -> Self {
        Record::Json {
            id: id.into(),
            record: JsonRecord { value, locale },
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Record::Html { id, .. } | Record::Json { id, .. } => id,
        }
    }

    pub fn facts(&self) -> &dyn ProductFacts {
        match self {
            Record::Html { record, .. } => record as &dyn ProductFacts,
            Record::Json { record, .. } => record as &dyn ProductFacts,
        }
    }

    pub fn to_candidate(&self) -> CandidateItem {
        let facts = self.facts();
        CandidateItem {
            title: facts.title(),
            price: facts.price(),
            thumbnail: facts.thumbnail(),
            availability: facts.availability(),
            ..CandidateItem::new(self.id())
        }
    }
}

impl ProductFacts for HtmlRecord<'_> {
    fn title(&self) -> Option<String> {
        extract_element_attr(&self.element, TITLE_LABEL_SELECTORS, "aria-label")
            .or_else(|| extract_element_text(&self.element, TITLE_TEXT_SELECTORS))
    }

    fn price(&self) -> Option<Price> {
        let text = extract_element_text(&self.element, PRICE_TEXT_SELECTORS)
            .or_else(|| self.split_price())?;
        let amount = parse_price_str(&text)?;
        Some(Price { amount, text })
    }

    fn thumbnail(&self) -> Option<String> {
        IMAGE_SELECTORS.split(',').find_map(|sel_str| {
            let sel = Selector::parse(sel_str.trim()).ok()?;
            self.element.select(&sel).find_map(|img| preferred_image_url(&img))
        })
    }

    fn availability(&self) -> Option<String> {
        if has_element(&self.element, UNAVAILABLE_SELECTORS) {
            return Some(UNAVAILABLE.to_string());
        }
        extract_element_text(&self.element, COUPON_SELECTORS)
    }
}

impl HtmlRecord<'_> {
    /// A price rendered without an off-screen copy, split into nodes.
    fn split_price(&self) -> Option<String> {
        let price = self.element.select(&SPLIT_PRICE).next()?;
        let part = |selector: &str| extract_element_text(&price, selector).unwrap_or_default();
        join_split_price(
            &part(".a-price-symbol"),
            &part(".a-price-whole"),
            &part(".a-price-fraction"),
        )
        .or_else(|| {
            let text = collapse_text(price);
            (!text.is_empty()).then_some(text)
        })
    }
}

impl ProductFacts for JsonRecord<'_> {
    fn title(&self) -> Option<String> {
        self.string_field(&["title", "name", "productTitle"])
    }

    fn price(&self) -> Option<Price> {
        let raw = ["price", "priceAmount", "buyingPrice"]
            .iter()
            .find_map(|key| self.value.get(*key).filter(|v| !v.is_null()))?;
        let amount = parse_price_value(raw)?;
        let text = self
            .string_field(&["displayPrice", "priceText", "formattedPrice"])
            .unwrap_or_else(|| format!("{}{:.2}", self.locale.currency_sign, amount.round_dp(2)));
        Some(Price { amount, text })
    }

    fn thumbnail(&self) -> Option<String> {
        self.string_field(&["imageUrl", "image", "thumbnail", "hiRes"])
            .filter(|url| !url.starts_with("data:"))
    }

    fn availability(&self) -> Option<String> {
        self.string_field(&["availability", "coupon"])
    }
}

impl JsonRecord<'_> {
    fn string_field(&self, keys: &[&str]) -> Option<String> {
        keys.iter()
            .filter_map(|key| self.value.get(*key).and_then(Value::as_str))
            .map(str::trim)
            .find(|s| !s.is_empty())
            .map(str::to_string)
    }
}
