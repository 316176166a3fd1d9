pub mod decode;
pub mod extract;
pub mod helpers;
pub mod item;
pub mod record;
pub mod search;

use crate::config::AppConfig;
use crate::error::FeedError;
use crate::feed::assemble::assemble;
use crate::feed::filter::format_items;
use crate::feed::linked_data::linked_product;
use crate::http::session::Session;
use crate::http::urls::{plan, Endpoints, RequestPlan};
use crate::http::RawResponse;
use crate::model::{CandidateItem, FeedDocument, LinkedProduct};
use crate::query::{Query, QueryKind};
use chrono::Utc;

/// Run a validated query end to end and build its feed.
///
/// # Errors
///
/// Fails with the classification of whatever stopped the pipeline: a bot
/// block, a transport failure or an unexpected source status. No partial
/// feed is returned alongside an error.
pub async fn generate_feed(
    session: &Session,
    config: &AppConfig,
    query: &Query,
) -> Result<FeedDocument, FeedError> {
    let (endpoints, plan, candidates) = find_candidates(session, config, query).await?;
    let items = format_items(&candidates, &endpoints, Utc::now());
    Ok(assemble(query, &endpoints, &plan.home_page_url, items))
}

/// Run a validated query and describe the surviving products as schema.org
/// linked data. Fails the same way as [`generate_feed`].
pub async fn generate_linked_data(
    session: &Session,
    config: &AppConfig,
    query: &Query,
) -> Result<Vec<LinkedProduct>, FeedError> {
    let (endpoints, _, candidates) = find_candidates(session, config, query).await?;
    Ok(candidates
        .iter()
        .map(|candidate| linked_product(candidate, query.locale, &endpoints))
        .collect())
}

async fn find_candidates(
    session: &Session,
    config: &AppConfig,
    query: &Query,
) -> Result<(Endpoints, RequestPlan, Vec<CandidateItem>), FeedError> {
    let endpoints = Endpoints::for_query(query, config);
    let plan = plan(query, &endpoints, config);

    let candidates = match query.kind {
        QueryKind::Keyword { .. } => search::search_items(session, query, &plan).await?,
        QueryKind::ItemId => item::lookup_items(session, config, query, &plan).await?,
    };
    Ok((endpoints, plan, candidates))
}

/// Decode and extract in one step, so the parsed document never outlives
/// this call.
pub(crate) fn candidates_from(raw: &RawResponse, query: &Query) -> Result<Vec<CandidateItem>, FeedError> {
    let payload = decode::decode(raw)?;
    Ok(extract::extract(&payload, query))
}
