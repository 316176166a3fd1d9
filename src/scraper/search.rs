use super::candidates_from;
use crate::error::FeedError;
use crate::feed::filter::filter_candidates;
use crate::http::fetch::fetch;
use crate::http::session::Session;
use crate::http::urls::RequestPlan;
use crate::model::CandidateItem;
use crate::query::Query;

/// Keyword search: one fetch, decode, extract, filter.
///
/// A response that cannot be understood yields zero items rather than an
/// error. A challenge page resets the session and is surfaced as
/// [`FeedError::BotBlocked`].
pub async fn search_items(
    session: &Session,
    query: &Query,
    plan: &RequestPlan,
) -> Result<Vec<CandidateItem>, FeedError> {
    let raw = fetch(session, &plan.request, query).await?;

    let candidates = match candidates_from(&raw, query) {
        Ok(candidates) => candidates,
        Err(FeedError::Parse { reason, .. }) => {
            tracing::error!("\"{}\" - could not parse search results: {}", query.text, reason);
            Vec::new()
        }
        Err(e @ FeedError::BotBlocked { .. }) => {
            session.reset_for(&plan.request.url).await;
            tracing::warn!("\"{}\" - captcha triggered", query.text);
            return Err(e);
        }
        Err(e) => return Err(e),
    };

    Ok(filter_candidates(candidates, query))
}
