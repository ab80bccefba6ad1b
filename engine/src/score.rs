use error::GateError;
use filter::{FilterMap, NestedFilterMap, Operator, ParseOptions, RawQuery, split_query};
use futures::future::try_join_all;
use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

use crate::{Collection, Registry, RequestContext};

/// Selectivity estimate for one request: a 0-100 total, the deepest nesting
/// level reached and a per-field breakdown. Computed fresh per request, never
/// cached, as nested parts depend on live remote data.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryScore {
    pub total: u8,
    pub max_level: u32,
    pub filters: IndexMap<String, FilterScore>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FilterScore {
    Direct {
        #[serde(flatten)]
        operators: IndexMap<Operator, u8>,
        level: u32,
    },
    Nested {
        #[serde(flatten)]
        score: QueryScore,
        level: u32,
    },
}

/// Scores a request given its split filters. Nested parts are scored by the
/// related collections themselves, concurrently across siblings.
pub async fn score_query(
    registry: &Registry,
    collection: &dyn Collection,
    direct: &FilterMap,
    nested: &NestedFilterMap,
    ctx: &RequestContext,
) -> Result<QueryScore, GateError> {
    let (scores, mut breakdown) = field_scores(collection, direct);
    let own = own_score(&scores);

    let mut branches = Vec::new();
    for (key, raw) in nested.iter() {
        let field = collection
            .field_by_key(key)
            .ok_or_else(|| GateError::UnknownPath(key.clone()))?;
        let relation = field.relation.as_ref().ok_or_else(|| GateError::NotFilterable(key.clone()))?;
        let target = registry.get(relation.to())?.clone();
        let key = key.clone();
        let raw = raw.clone();
        branches.push(async move {
            let score = target.get_query_score(&raw, ctx).await?;
            Ok::<_, GateError>((key, score))
        });
    }
    let remote = try_join_all(branches).await?;

    // every entry is weighed down by the level it sits on, the denominator
    // grows with both depth and breadth
    let mut entries = vec![(own, 1u32)];
    for (key, score) in remote {
        let level = 1 + score.max_level;
        entries.push((score.total as f64 / 100.0, level));
        breakdown.insert(key, FilterScore::Nested { score, level });
    }

    let max_level = entries.iter().map(|(_, level)| *level).max().unwrap_or(1);
    let count = entries.len() as f64;
    let total = entries
        .iter()
        .map(|(total, level)| total / *level as f64)
        .sum::<f64>()
        / (max_level as f64 + count - 1.0);

    debug!("scored query on {}: total {:.4}, level {}", collection.name(), total, max_level);

    Ok(QueryScore { total: display(total), max_level, filters: breakdown })
}

/// Convenience entry point for implementors of
/// [`Collection::get_query_score`]: split the raw shape, then score.
pub async fn score_request(
    registry: &Registry,
    collection: &dyn Collection,
    raw: &RawQuery,
    ctx: &RequestContext,
) -> Result<QueryScore, GateError> {
    let parsed = split_query(collection.fields(), raw, ParseOptions::default())?;
    score_query(registry, collection, &parsed.direct, &parsed.nested, ctx).await
}

fn field_scores(collection: &dyn Collection, direct: &FilterMap) -> (Vec<f64>, IndexMap<String, FilterScore>) {
    let mut scores = Vec::new();
    let mut breakdown = IndexMap::new();
    for (path, operators) in direct.iter() {
        let (key, weight) = match collection.field_by_path(path) {
            Some(field) => (field.key.clone(), field.weight),
            None => {
                debug!("no field metadata for path {}, falling back to minimum weight", path);
                (path.clone(), 1)
            }
        };
        let mut per_operator = IndexMap::new();
        for operator in operators.keys() {
            let score = (weight as f64 / 100.0) * (operator.weight() as f64 / 100.0);
            scores.push(score);
            per_operator.insert(*operator, display(score));
        }
        breakdown.insert(key, FilterScore::Direct { operators: per_operator, level: 1 });
    }
    (scores, breakdown)
}

/// Combines same-resource filter scores like parallel resistances: a single
/// strong filter passes untouched, stacked filters narrow superlinearly.
fn own_score(scores: &[f64]) -> f64 {
    match scores {
        [] => 0.0,
        [single] => *single,
        scores => {
            let sum = 1.0 + scores.iter().map(|score| 1.0 / (1.0 - score)).sum::<f64>();
            1.0 - 1.0 / sum
        }
    }
}

fn display(score: f64) -> u8 {
    (score * 100.0).round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_own_score_empty() {
        assert_eq!(own_score(&[]), 0.0);
    }

    #[test]
    fn test_own_score_single_passes_through() {
        assert_eq!(own_score(&[0.5]), 0.5);
        assert_eq!(own_score(&[0.005]), 0.005);
    }

    #[test]
    fn test_own_score_stacks_superlinearly() {
        let stacked = own_score(&[0.5, 0.5]);
        assert!(stacked > 0.5);
        assert!(stacked < 1.0);
        // 1 - 1 / (1 + 2 + 2)
        assert!((stacked - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_own_score_never_decreases_with_more_filters() {
        let alone = own_score(&[0.4]);
        let stacked = own_score(&[0.4, 0.01]);
        assert!(stacked >= alone);
    }

    #[test]
    fn test_display_rounds() {
        assert_eq!(display(0.15), 15);
        assert_eq!(display(0.005), 1);
        assert_eq!(display(0.0), 0);
        assert_eq!(display(1.2), 100);
    }
}
