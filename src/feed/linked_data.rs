use crate::http::urls::Endpoints;
use crate::locale::Locale;
use crate::model::{CandidateItem, LinkedProduct, Offer};

const SCHEMA_CONTEXT: &str = "https://schema.org/";
const IN_STOCK: &str = "https://schema.org/InStock";
const OUT_OF_STOCK: &str = "https://schema.org/OutOfStock";

/// Describe one filtered candidate as a schema.org product. A candidate
/// without a price is offered as out of stock.
pub fn linked_product(candidate: &CandidateItem, locale: &Locale, endpoints: &Endpoints) -> LinkedProduct {
    let offers = match &candidate.price {
        Some(price) => Offer {
            kind: "Offer",
            price_currency: Some(locale.currency_code),
            price: Some(price.amount),
            availability: IN_STOCK,
        },
        None => Offer {
            kind: "Offer",
            price_currency: None,
            price: None,
            availability: OUT_OF_STOCK,
        },
    };

    LinkedProduct {
        context: SCHEMA_CONTEXT,
        kind: "Product",
        asin: candidate.id.clone(),
        url: endpoints.item_url(&candidate.id),
        name: candidate.title.clone(),
        image: candidate.thumbnail.clone().map(|url| vec![url]),
        offers,
    }
}

/// A minimal HTML page carrying the products in an `application/ld+json`
/// script block.
pub fn linked_data_page(products: &[LinkedProduct]) -> serde_json::Result<String> {
    // `</` would end the script element early.
    let json = serde_json::to_string(products)?.replace("</", "<\\/");
    Ok(format!(
        "<!DOCTYPE html><html><head><script type=\"application/ld+json\">{}</script></head><body></body></html>\n",
        json
    ))
}
