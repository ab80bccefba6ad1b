//! Pure merge and normalization rules for per-field operator constraints.
//!
//! Merging is commutative and associative up to map equality, so nested
//! resolution branches can fold their partial results in any order.

use indexmap::IndexMap;
use value::Value;

use crate::{FilterMap, FilterValue, Operator, OperatorMap};

/// Consolidates several values supplied for the same operator into a single
/// constraint. The operator may change in the process: a plural `eq` widens to
/// `in`, a singleton `in` narrows to `eq`, and so on.
pub fn merge_operator_values(operator: Operator, values: Vec<FilterValue>) -> (Operator, FilterValue) {
    match operator {
        Operator::Eq => demote(dedup(flatten(values)), Operator::In, Operator::Eq),
        Operator::Ne => demote(dedup(flatten(values)), Operator::Nin, Operator::Ne),
        Operator::In => {
            let mut lists = values.into_iter().map(|value| dedup(value.values()));
            let mut result = lists.next().unwrap_or_default();
            for list in lists {
                result.retain(|value| list.contains(value));
            }
            demote(result, Operator::In, Operator::Eq)
        }
        Operator::Nin => demote(dedup(flatten(values)), Operator::Nin, Operator::Ne),
        Operator::Gt | Operator::Gte => keep_bound(operator, values, Bound::Max),
        Operator::Lt | Operator::Lte => keep_bound(operator, values, Bound::Min),
    }
}

enum Bound {
    Max,
    Min,
}

fn keep_bound(operator: Operator, values: Vec<FilterValue>, bound: Bound) -> (Operator, FilterValue) {
    let values = flatten(values);
    let kept = match bound {
        Bound::Max => values.into_iter().max(),
        Bound::Min => values.into_iter().min(),
    };
    (operator, FilterValue::Scalar(kept.unwrap_or(Value::Null)))
}

fn flatten(values: Vec<FilterValue>) -> Vec<Value> {
    values.iter().flat_map(FilterValue::values).collect()
}

fn dedup(values: Vec<Value>) -> Vec<Value> {
    let mut deduped = Vec::with_capacity(values.len());
    for value in values {
        if !deduped.contains(&value) {
            deduped.push(value);
        }
    }
    deduped
}

fn demote(mut values: Vec<Value>, list_operator: Operator, scalar_operator: Operator) -> (Operator, FilterValue) {
    if values.len() == 1 {
        (scalar_operator, FilterValue::Scalar(values.pop().unwrap_or(Value::Null)))
    } else {
        (list_operator, FilterValue::List(values))
    }
}

fn impossible() -> OperatorMap {
    let mut map = OperatorMap::new();
    map.insert(Operator::In, FilterValue::List(vec![]));
    map
}

/// Normalizes one field's operator map to its simplest equivalent form.
/// Idempotent: normalizing an already-normal map changes nothing.
pub fn dedupe_filters(map: OperatorMap) -> OperatorMap {
    let mut map = map;

    // an empty membership list can never match, siblings are irrelevant
    if map.get(&Operator::In).is_some_and(FilterValue::is_empty_list) {
        return impossible();
    }

    // a field cannot be required and forbidden to hold a value at once
    if map.contains_key(&Operator::Eq) && map.contains_key(&Operator::Ne) {
        return impossible();
    }

    let has_in = map.contains_key(&Operator::In);
    let has_eq = map.contains_key(&Operator::Eq);

    if has_in || (has_eq && map.contains_key(&Operator::Nin)) {
        let mut list = dedup(
            map.shift_remove(&Operator::In)
                .map(|value| value.values())
                .unwrap_or_default(),
        );
        if let Some(eq) = map.shift_remove(&Operator::Eq) {
            for value in eq.values() {
                if !list.contains(&value) {
                    list.push(value);
                }
            }
        }
        if let Some(nin) = map.shift_remove(&Operator::Nin) {
            let excluded = nin.values();
            list.retain(|value| !excluded.contains(value));
        }
        if let Some(ne) = map.shift_remove(&Operator::Ne) {
            let excluded = ne.values();
            list.retain(|value| !excluded.contains(value));
        }
        if list.is_empty() {
            return impossible();
        }
        map.insert(Operator::In, FilterValue::List(list));
    } else if map.contains_key(&Operator::Ne) && map.contains_key(&Operator::Nin) {
        // a scalar exclusion folds into the exclusion list
        let ne = map.shift_remove(&Operator::Ne).map(|value| value.values()).unwrap_or_default();
        let nin = map.shift_remove(&Operator::Nin).map(|value| value.values()).unwrap_or_default();
        let mut excluded = dedup(nin);
        for value in ne {
            if !excluded.contains(&value) {
                excluded.push(value);
            }
        }
        map.insert(Operator::Nin, FilterValue::List(excluded));
    }

    // singletons read better as their scalar counterparts
    for (list_operator, scalar_operator) in [(Operator::In, Operator::Eq), (Operator::Nin, Operator::Ne)] {
        let singleton = map
            .get(&list_operator)
            .and_then(|value| match value {
                FilterValue::List(values) if values.len() == 1 => values.first().cloned(),
                _ => None,
            });
        if let Some(value) = singleton {
            map.shift_remove(&list_operator);
            map.insert(scalar_operator, FilterValue::Scalar(value));
        }
    }

    map
}

/// Merges two operator maps for the same field: collect every pending value
/// per operator, flatten until each operator holds one consolidated value,
/// then normalize.
pub fn merge_filters_for_key(left: &OperatorMap, right: &OperatorMap) -> OperatorMap {
    let mut pending: IndexMap<Operator, Vec<FilterValue>> = IndexMap::new();
    for (operator, value) in left.iter().chain(right.iter()) {
        pending.entry(*operator).or_default().push(value.clone());
    }

    while let Some(operator) = pending
        .iter()
        .find(|(_, values)| values.len() > 1)
        .map(|(operator, _)| *operator)
    {
        let values = pending.shift_remove(&operator).unwrap_or_default();
        let (merged_operator, merged) = merge_operator_values(operator, values);
        pending.entry(merged_operator).or_default().push(merged);
    }

    let map = pending
        .into_iter()
        .filter_map(|(operator, mut values)| values.pop().map(|value| (operator, value)))
        .collect();
    dedupe_filters(map)
}

/// Unions the field key-space of two filter maps and merges per field.
pub fn merge_filters(left: &FilterMap, right: &FilterMap) -> FilterMap {
    let mut merged = FilterMap::new();
    for path in left.keys().chain(right.keys()) {
        if merged.get(path).is_some() {
            continue;
        }
        let map = match (left.get(path), right.get(path)) {
            (Some(l), Some(r)) => merge_filters_for_key(l, r),
            (Some(l), None) => dedupe_filters(l.clone()),
            (None, Some(r)) => dedupe_filters(r.clone()),
            (None, None) => continue,
        };
        merged.insert(path.clone(), map);
    }
    merged
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn operators(entries: Vec<(Operator, FilterValue)>) -> OperatorMap {
        entries.into_iter().collect()
    }

    fn single(operator: Operator, value: FilterValue) -> OperatorMap {
        operators(vec![(operator, value)])
    }

    #[rstest]
    #[case(Operator::Eq, vec![FilterValue::scalar(5i64), FilterValue::scalar(5i64)], (Operator::Eq, FilterValue::scalar(5i64)))]
    #[case(Operator::Eq, vec![FilterValue::scalar(5i64), FilterValue::scalar(7i64)], (Operator::In, FilterValue::list(vec![5i64, 7])))]
    #[case(Operator::Ne, vec![FilterValue::scalar(5i64), FilterValue::scalar(7i64)], (Operator::Nin, FilterValue::list(vec![5i64, 7])))]
    #[case(Operator::In, vec![FilterValue::list(vec![1i64, 2, 3]), FilterValue::list(vec![2i64, 3, 4])], (Operator::In, FilterValue::list(vec![2i64, 3])))]
    #[case(Operator::In, vec![FilterValue::list(vec![1i64, 2]), FilterValue::list(vec![2i64, 4])], (Operator::Eq, FilterValue::scalar(2i64)))]
    #[case(Operator::In, vec![FilterValue::list(vec![1i64]), FilterValue::list(vec![2i64])], (Operator::In, FilterValue::List(vec![])))]
    #[case(Operator::Nin, vec![FilterValue::list(vec![1i64]), FilterValue::list(vec![2i64])], (Operator::Nin, FilterValue::list(vec![1i64, 2])))]
    #[case(Operator::Nin, vec![FilterValue::list(vec![1i64]), FilterValue::list(vec![1i64])], (Operator::Ne, FilterValue::scalar(1i64)))]
    #[case(Operator::Gt, vec![FilterValue::scalar(3i64), FilterValue::scalar(8i64)], (Operator::Gt, FilterValue::scalar(8i64)))]
    #[case(Operator::Gte, vec![FilterValue::scalar(8i64), FilterValue::scalar(3i64)], (Operator::Gte, FilterValue::scalar(8i64)))]
    #[case(Operator::Lt, vec![FilterValue::scalar(3i64), FilterValue::scalar(8i64)], (Operator::Lt, FilterValue::scalar(3i64)))]
    #[case(Operator::Lte, vec![FilterValue::scalar(8i64), FilterValue::scalar(3i64)], (Operator::Lte, FilterValue::scalar(3i64)))]
    fn test_merge_operator_values(
        #[case] operator: Operator,
        #[case] values: Vec<FilterValue>,
        #[case] expected: (Operator, FilterValue),
    ) {
        assert_eq!(merge_operator_values(operator, values), expected);
    }

    #[test]
    fn test_empty_in_absorbs_siblings() {
        let map = operators(vec![
            (Operator::In, FilterValue::List(vec![])),
            (Operator::Gt, FilterValue::scalar(3i64)),
        ]);
        assert_eq!(dedupe_filters(map), single(Operator::In, FilterValue::List(vec![])));
    }

    #[test]
    fn test_eq_and_ne_collapse() {
        let map = operators(vec![
            (Operator::Eq, FilterValue::scalar(5i64)),
            (Operator::Ne, FilterValue::scalar(5i64)),
        ]);
        assert_eq!(dedupe_filters(map), single(Operator::In, FilterValue::List(vec![])));
    }

    #[test]
    fn test_in_subtracts_exclusions() {
        let map = operators(vec![
            (Operator::In, FilterValue::list(vec![5i64, 7])),
            (Operator::Nin, FilterValue::list(vec![7i64])),
        ]);
        assert_eq!(dedupe_filters(map), single(Operator::Eq, FilterValue::scalar(5i64)));
    }

    #[test]
    fn test_eq_absorbed_by_exclusion_list() {
        let map = operators(vec![
            (Operator::Eq, FilterValue::scalar(5i64)),
            (Operator::Nin, FilterValue::list(vec![5i64, 9])),
        ]);
        assert_eq!(dedupe_filters(map), single(Operator::In, FilterValue::List(vec![])));

        let map = operators(vec![
            (Operator::Eq, FilterValue::scalar(5i64)),
            (Operator::Nin, FilterValue::list(vec![9i64])),
        ]);
        assert_eq!(dedupe_filters(map), single(Operator::Eq, FilterValue::scalar(5i64)));
    }

    #[test]
    fn test_singleton_demotion() {
        assert_eq!(
            dedupe_filters(single(Operator::In, FilterValue::list(vec![5i64]))),
            single(Operator::Eq, FilterValue::scalar(5i64))
        );
        assert_eq!(
            dedupe_filters(single(Operator::Nin, FilterValue::list(vec![5i64]))),
            single(Operator::Ne, FilterValue::scalar(5i64))
        );
    }

    #[test]
    fn test_ne_folds_into_nin() {
        let map = operators(vec![
            (Operator::Ne, FilterValue::scalar(5i64)),
            (Operator::Nin, FilterValue::list(vec![7i64])),
        ]);
        assert_eq!(
            dedupe_filters(map),
            single(Operator::Nin, FilterValue::list(vec![7i64, 5]))
        );
    }

    #[test]
    fn test_dedupe_idempotent() {
        let cases = vec![
            operators(vec![
                (Operator::In, FilterValue::list(vec![1i64, 2, 3])),
                (Operator::Gt, FilterValue::scalar(1i64)),
            ]),
            operators(vec![
                (Operator::Eq, FilterValue::scalar(5i64)),
                (Operator::Ne, FilterValue::scalar(5i64)),
            ]),
            single(Operator::In, FilterValue::list(vec![5i64])),
            single(Operator::Nin, FilterValue::list(vec![1i64, 2])),
            operators(vec![
                (Operator::Gte, FilterValue::scalar(1i64)),
                (Operator::Lt, FilterValue::scalar(9i64)),
            ]),
        ];
        for map in cases {
            let once = dedupe_filters(map);
            assert_eq!(dedupe_filters(once.clone()), once);
        }
    }

    #[test]
    fn test_merge_for_key_flattens() {
        // eq on both sides widens, then the membership lists intersect
        let left = single(Operator::Eq, FilterValue::scalar(5i64));
        let right = single(Operator::Eq, FilterValue::scalar(7i64));
        assert_eq!(
            merge_filters_for_key(&left, &right),
            single(Operator::In, FilterValue::list(vec![5i64, 7]))
        );

        let left = single(Operator::In, FilterValue::list(vec![5i64, 7, 9]));
        let right = single(Operator::In, FilterValue::list(vec![7i64, 9]));
        assert_eq!(
            merge_filters_for_key(&left, &right),
            single(Operator::In, FilterValue::list(vec![7i64, 9]))
        );
    }

    #[test]
    fn test_singleton_in_reduces_to_eq() {
        let left = single(Operator::In, FilterValue::list(vec![5i64]));
        let right = single(Operator::Gt, FilterValue::scalar(3i64));
        let merged = merge_filters_for_key(&left, &right);
        assert_eq!(merged.get(&Operator::Eq), Some(&FilterValue::scalar(5i64)));
        assert_eq!(merged.get(&Operator::Gt), Some(&FilterValue::scalar(3i64)));
    }

    #[test]
    fn test_eq_with_ne_of_same_value_is_impossible() {
        let left = single(Operator::Eq, FilterValue::scalar(5i64));
        let right = single(Operator::Ne, FilterValue::scalar(5i64));
        assert_eq!(
            merge_filters_for_key(&left, &right),
            single(Operator::In, FilterValue::List(vec![]))
        );
    }

    #[test]
    fn test_merge_filters_unions_keys() {
        let left = FilterMap::single("age", Operator::Gt, FilterValue::scalar(18i64));
        let right = FilterMap::single("name", Operator::Eq, FilterValue::scalar("isabel"));
        let merged = merge_filters(&left, &right);
        assert_eq!(merged.len(), 2);
        assert!(merged.get("age").is_some());
        assert!(merged.get("name").is_some());
    }

    #[test]
    fn test_merge_filters_commutative() {
        let left = FilterMap::single("id", Operator::In, FilterValue::list(vec![1i64, 2, 3]));
        let mut right = FilterMap::single("id", Operator::In, FilterValue::list(vec![2i64, 3, 4]));
        right.insert(
            "age".to_string(),
            single(Operator::Gt, FilterValue::scalar(18i64)),
        );

        assert_eq!(merge_filters(&left, &right), merge_filters(&right, &left));
    }

    #[test]
    fn test_merge_filters_associative() {
        let a = FilterMap::single("id", Operator::In, FilterValue::list(vec![1i64, 2, 3, 4]));
        let b = FilterMap::single("id", Operator::In, FilterValue::list(vec![2i64, 3, 4]));
        let c = FilterMap::single("id", Operator::Nin, FilterValue::list(vec![4i64]));

        let left_first = merge_filters(&merge_filters(&a, &b), &c);
        let right_first = merge_filters(&a, &merge_filters(&b, &c));
        assert_eq!(left_first, right_first);

        let a = FilterMap::single("age", Operator::Gt, FilterValue::scalar(3i64));
        let b = FilterMap::single("age", Operator::Gt, FilterValue::scalar(8i64));
        let c = FilterMap::single("age", Operator::Lte, FilterValue::scalar(40i64));
        assert_eq!(
            merge_filters(&merge_filters(&a, &b), &c),
            merge_filters(&a, &merge_filters(&b, &c))
        );
    }

    #[test]
    fn test_merge_with_impossible_branch() {
        // a resolved branch that matched nothing wipes the whole field
        let left = FilterMap::single("id", Operator::In, FilterValue::List(vec![]));
        let right = FilterMap::single("id", Operator::In, FilterValue::list(vec![1i64, 2]));
        let merged = merge_filters(&left, &right);
        assert!(merged.is_impossible());
    }
}
