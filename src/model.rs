use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A price as shown by the site plus its exact numeric value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Price {
    pub amount: Decimal,
    pub text: String,
}

/// Facts pulled out of one product record, before filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateItem {
    pub id: String,
    pub title: Option<String>,
    pub price: Option<Price>,
    pub thumbnail: Option<String>,
    pub availability: Option<String>,
}

impl CandidateItem {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
            price: None,
            thumbnail: None,
            availability: None,
        }
    }

    /// The title to show, falling back to the product id.
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    pub id: String,
    pub url: String,
    pub title: String,
    pub content_html: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub date_published: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedDocument {
    pub version: String,
    pub title: String,
    pub home_page_url: String,
    pub favicon: String,
    pub items: Vec<FeedItem>,
}

/// A schema.org `Product` with a single offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkedProduct {
    #[serde(rename = "@context")]
    pub context: &'static str,
    #[serde(rename = "@type")]
    pub kind: &'static str,
    pub asin: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<Vec<String>>,
    pub offers: Offer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    #[serde(rename = "@type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_currency: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    pub availability: &'static str,
}
