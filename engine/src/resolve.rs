use std::sync::Arc;

use error::GateError;
use filter::{FilterMap, FilterValue, NestedFilterMap, Operator, ParseOptions, RawQuery, Relation, split_query};
use futures::future::{BoxFuture, try_join_all};
use tracing::debug;
use value::Value;

use crate::{Collection, FindOptions, Record, Registry, RequestContext};

/// Turns filters on related resources into local key constraints.
///
/// Siblings resolve concurrently, hops within one relation chain stay
/// strictly sequential. Partial results merge through the filter algebra, so
/// the outcome does not depend on completion order.
pub async fn resolve_nested(
    registry: &Registry,
    collection: &dyn Collection,
    nested: &NestedFilterMap,
    ctx: &RequestContext,
) -> Result<FilterMap, GateError> {
    if nested.is_empty() {
        return Ok(FilterMap::new());
    }

    let mut branches = Vec::new();
    for (key, raw) in nested.iter() {
        branches.push(resolve_branch(registry, collection, key, raw, ctx));
    }
    let partials = try_join_all(branches).await?;

    Ok(partials
        .into_iter()
        .fold(FilterMap::new(), |merged, partial| merged.merge(&partial)))
}

async fn resolve_branch(
    registry: &Registry,
    collection: &dyn Collection,
    key: &str,
    raw: &RawQuery,
    ctx: &RequestContext,
) -> Result<FilterMap, GateError> {
    let field = collection
        .field_by_key(key)
        .ok_or_else(|| GateError::UnknownPath(key.to_string()))?;
    let relation = field
        .relation
        .as_ref()
        .ok_or_else(|| GateError::NotFilterable(key.to_string()))?;
    let local_key = collection.primary_key()?.path.clone();

    match relation {
        Relation::ToOne { to, from_key, to_key } => {
            let keys = membership_keys(registry, to, to_key, raw, ctx).await?;
            if keys.is_empty() {
                return Ok(empty_constraint(&local_key));
            }
            Ok(in_constraint(from_key, keys))
        }
        Relation::ToMany { to, to_key } => {
            let keys = membership_keys(registry, to, to_key, raw, ctx).await?;
            if keys.is_empty() {
                return Ok(empty_constraint(&local_key));
            }
            Ok(in_constraint(&local_key, keys))
        }
        Relation::Through { to, to_key, via, through_key, other_through_key } => {
            let target_keys = membership_keys(registry, to, to_key, raw, ctx).await?;
            if target_keys.is_empty() {
                debug!("nested filter on {} matched nothing, join lookup skipped", key);
                return Ok(empty_constraint(&local_key));
            }
            let join = registry.get(via)?;
            let join_filters = FilterMap::single(other_through_key, Operator::In, FilterValue::List(target_keys));
            let rows = join
                .find(&join_filters, FindOptions::membership(through_key), ctx)
                .await?;
            let local_keys = collect_keys(rows, through_key);
            if local_keys.is_empty() {
                return Ok(empty_constraint(&local_key));
            }
            Ok(in_constraint(&local_key, local_keys))
        }
    }
}

/// One membership hop: recursively resolve the nested predicate on the
/// target, then collect the selected key values.
async fn membership_keys(
    registry: &Registry,
    to: &str,
    select: &str,
    raw: &RawQuery,
    ctx: &RequestContext,
) -> Result<Vec<Value>, GateError> {
    let target = registry.get(to)?;
    let scope = resolve_scope(registry, target.clone(), raw, ctx).await?;
    if scope.is_impossible() {
        // the predicate can no longer match, skip the remote call
        return Ok(vec![]);
    }
    let rows = target.find(&scope, FindOptions::membership(select), ctx).await?;
    Ok(collect_keys(rows, select))
}

/// Split + resolve + merge for one hop's predicate. Boxed so the recursion
/// through further hops stays finite in size.
fn resolve_scope<'a>(
    registry: &'a Registry,
    target: Arc<dyn Collection>,
    raw: &'a RawQuery,
    ctx: &'a RequestContext,
) -> BoxFuture<'a, Result<FilterMap, GateError>> {
    Box::pin(async move {
        let parsed = split_query(target.fields(), raw, ParseOptions::default())?;
        let resolved = resolve_nested(registry, target.as_ref(), &parsed.nested, ctx).await?;
        Ok(parsed.direct.merge(&resolved))
    })
}

fn collect_keys(rows: Vec<Record>, select: &str) -> Vec<Value> {
    let mut keys = Vec::with_capacity(rows.len());
    for row in rows {
        if let Some(value) = row.get(select)
            && !value.is_null()
            && !keys.contains(value)
        {
            keys.push(value.clone());
        }
    }
    keys
}

fn in_constraint(path: &str, keys: Vec<Value>) -> FilterMap {
    // run through the algebra so singletons demote to eq
    FilterMap::new().merge(&FilterMap::single(path, Operator::In, FilterValue::List(keys)))
}

fn empty_constraint(path: &str) -> FilterMap {
    FilterMap::single(path, Operator::In, FilterValue::List(vec![]))
}
