use error::GateError;
use indexmap::IndexMap;
use tracing::debug;

use crate::{Field, FilterMap, FilterValue, NestedFilterMap, Operator, OperatorMap, RawQuery, algebra};

/// Top-level keys that are never treated as filters.
pub const RESERVED_KEYS: [&str; 7] = ["limit", "offset", "sort", "select", "format", "populate", "options"];

pub const OPERATOR_SEPARATOR: &str = "__";

#[derive(Clone, Copy, Debug)]
pub struct ParseOptions {
    pub list_separator: char,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions { list_separator: ',' }
    }
}

/// A raw query split into filters on the resource itself and filters that
/// reach through relations, plus the nesting depth the request declares.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedQuery {
    pub direct: FilterMap,
    pub nested: NestedFilterMap,
    pub declared_level: u32,
}

/// Splits raw query parameters against a resource's field list.
///
/// `field` or `field__operator` keys become direct filters keyed by storage
/// path, dotted keys route their remainder to the relation they traverse.
/// Duplicate keys for one field are combined through the algebra.
pub fn split_query(fields: &[Field], raw: &RawQuery, options: ParseOptions) -> Result<ParsedQuery, GateError> {
    let mut pending: IndexMap<String, Vec<(Operator, FilterValue)>> = IndexMap::new();
    let mut nested = NestedFilterMap::new();
    let mut declared_level = 1u32;

    for (key, value) in raw {
        if RESERVED_KEYS.contains(&key.as_str()) {
            continue;
        }

        if let Some((head, rest)) = key.split_once('.') {
            let field = fields
                .iter()
                .find(|field| field.key == head)
                .ok_or_else(|| GateError::UnknownPath(key.clone()))?;
            if field.relation.is_none() || !field.filterable {
                return Err(GateError::NotFilterable(key.clone()));
            }
            declared_level = declared_level.max(key.split('.').count() as u32);
            nested.push(head, (rest.to_string(), value.clone()));
            continue;
        }

        let (name, operator) = split_operator(key);
        let field = match fields.iter().find(|field| field.key == name) {
            Some(field) => field,
            None => {
                // a known field with an unknown operator suffix reads better
                // as an operator problem than a path problem
                if let Some((prefix, suffix)) = key.rsplit_once(OPERATOR_SEPARATOR)
                    && fields.iter().any(|field| field.key == prefix)
                {
                    return Err(GateError::unsupported_operator(prefix, suffix));
                }
                return Err(GateError::UnknownPath(key.clone()));
            }
        };
        if !field.filterable {
            return Err(GateError::NotFilterable(key.clone()));
        }
        if !field.supports(operator) {
            return Err(GateError::unsupported_operator(&field.key, operator.to_string()));
        }

        let parsed = operator.parse(value, options.list_separator);
        pending.entry(field.path.clone()).or_default().push((operator, parsed));
    }

    let mut direct = FilterMap::new();
    for (path, entries) in pending {
        let has_eq = entries.iter().any(|(operator, _)| *operator == Operator::Eq);
        let has_other = entries
            .iter()
            .any(|(operator, _)| !matches!(operator, Operator::Eq | Operator::Ne));
        if has_eq && has_other {
            return Err(GateError::NotMixableOperators(path));
        }

        let mut consolidated = OperatorMap::new();
        for (operator, value) in entries {
            let mut single = OperatorMap::new();
            single.insert(operator, value);
            consolidated = algebra::merge_filters_for_key(&consolidated, &single);
        }
        direct.insert(path, consolidated);
    }

    debug!(
        "split query into {} direct and {} nested filters (declared level {})",
        direct.len(),
        nested.len(),
        declared_level
    );

    Ok(ParsedQuery { direct, nested, declared_level })
}

fn split_operator(key: &str) -> (&str, Operator) {
    if let Some((name, suffix)) = key.rsplit_once(OPERATOR_SEPARATOR)
        && let Ok(operator) = suffix.parse::<Operator>()
    {
        return (name, operator);
    }
    (key, Operator::Eq)
}
