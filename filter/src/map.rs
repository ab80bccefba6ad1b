use indexmap::IndexMap;
use serde::Serialize;
use value::Value;

use crate::{Operator, algebra};

/// The value side of one operator constraint.
#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum FilterValue {
    Scalar(Value),
    List(Vec<Value>),
}

impl FilterValue {
    pub fn scalar(value: impl Into<Value>) -> Self {
        FilterValue::Scalar(value.into())
    }

    pub fn list<V: Into<Value>>(values: Vec<V>) -> Self {
        FilterValue::List(values.into_iter().map(Into::into).collect())
    }

    /// All underlying values, a scalar counting as a singleton.
    pub fn values(&self) -> Vec<Value> {
        match self {
            FilterValue::Scalar(value) => vec![value.clone()],
            FilterValue::List(values) => values.clone(),
        }
    }

    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            FilterValue::Scalar(value) => Some(value),
            FilterValue::List(_) => None,
        }
    }

    pub fn is_empty_list(&self) -> bool {
        matches!(self, FilterValue::List(values) if values.is_empty())
    }
}

// list membership is a set, order carries no meaning
impl PartialEq for FilterValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FilterValue::Scalar(left), FilterValue::Scalar(right)) => left == right,
            (FilterValue::List(left), FilterValue::List(right)) => {
                left.len() == right.len()
                    && left.iter().all(|value| right.contains(value))
                    && right.iter().all(|value| left.contains(value))
            }
            _ => false,
        }
    }
}

impl Eq for FilterValue {}

/// Consolidated constraints for one field, at most one value per operator.
pub type OperatorMap = IndexMap<Operator, FilterValue>;

/// Per-field filters scoped to one resource, keyed by storage path.
///
/// A value object: the only way to combine two maps is [`FilterMap::merge`],
/// which returns a fresh map.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FilterMap(IndexMap<String, OperatorMap>);

impl FilterMap {
    pub fn new() -> Self {
        FilterMap(IndexMap::new())
    }

    pub fn single(path: impl Into<String>, operator: Operator, value: FilterValue) -> Self {
        let mut operators = OperatorMap::new();
        operators.insert(operator, value);
        let mut map = IndexMap::new();
        map.insert(path.into(), operators);
        FilterMap(map)
    }

    pub fn insert(&mut self, path: impl Into<String>, operators: OperatorMap) {
        self.0.insert(path.into(), operators);
    }

    pub fn get(&self, path: &str) -> Option<&OperatorMap> {
        self.0.get(path)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &OperatorMap)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn merge(&self, other: &FilterMap) -> FilterMap {
        algebra::merge_filters(self, other)
    }

    /// True once any field is constrained to an empty `in` list, which no row
    /// can ever satisfy.
    pub fn is_impossible(&self) -> bool {
        self.0
            .values()
            .any(|operators| operators.get(&Operator::In).is_some_and(FilterValue::is_empty_list))
    }
}

impl FromIterator<(String, OperatorMap)> for FilterMap {
    fn from_iter<T: IntoIterator<Item = (String, OperatorMap)>>(iter: T) -> Self {
        FilterMap(iter.into_iter().collect())
    }
}

/// Raw query parameters in arrival order, duplicates preserved.
pub type RawQuery = Vec<(String, String)>;

pub fn raw_query(pairs: &[(&str, &str)]) -> RawQuery {
    pairs.iter().map(|(key, value)| (key.to_string(), value.to_string())).collect()
}

/// Filters expressed against related resources, keyed by the relation field's
/// public key. The payload is a raw query scoped to the related resource and
/// may itself contain further dotted paths.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NestedFilterMap(IndexMap<String, RawQuery>);

impl NestedFilterMap {
    pub fn new() -> Self {
        NestedFilterMap(IndexMap::new())
    }

    pub fn push(&mut self, key: &str, pair: (String, String)) {
        self.0.entry(key.to_string()).or_default().push(pair);
    }

    pub fn get(&self, key: &str) -> Option<&RawQuery> {
        self.0.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &RawQuery)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
