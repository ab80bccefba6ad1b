use error::GateError;
use filter::{FilterMap, ParseOptions, RawQuery, split_query};
use tracing::debug;

use crate::{
    Collection, PageRequest, QueryScore, Registry, RequestContext, check_declared_level, needs_scoring,
    resolve_nested, score_query, validate_query_score,
};

/// The outcome of admission and resolution: filters ready for storage
/// execution, plus the score when one was computed.
#[derive(Clone, Debug)]
pub struct QueryPlan {
    pub filters: FilterMap,
    pub score: Option<QueryScore>,
}

/// Chains the whole pipeline for one request: split the raw query, check the
/// declared depth, score and gate when triggered, resolve nested filters and
/// merge everything into one filter map.
///
/// Scoring runs before resolution, a rejected request never triggers
/// membership lookups.
pub async fn plan_query(
    registry: &Registry,
    collection: &dyn Collection,
    raw: &RawQuery,
    request: &PageRequest,
    ctx: &RequestContext,
) -> Result<QueryPlan, GateError> {
    let parsed = split_query(collection.fields(), raw, ParseOptions::default())?;
    check_declared_level(collection.settings(), &parsed)?;

    let score = if needs_scoring(collection.settings(), request, &parsed, ctx) {
        let score = score_query(registry, collection, &parsed.direct, &parsed.nested, ctx).await?;
        validate_query_score(collection.settings(), &score)?;
        debug!(
            "admitted query on {} with score {} (level {})",
            collection.name(),
            score.total,
            score.max_level
        );
        Some(score)
    } else {
        None
    };

    let resolved = resolve_nested(registry, collection, &parsed.nested, ctx).await?;
    let filters = parsed.direct.merge(&resolved);

    Ok(QueryPlan { filters, score })
}
