use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use error::GateError;
use filter::{Field, FilterMap, RawQuery};
use indexmap::IndexMap;
use value::Value;

use crate::QueryScore;

/// A partial record returned by a membership lookup, keyed by storage path.
pub type Record = IndexMap<String, Value>;

/// Request-scoped data forwarded to every lookup a resolution triggers.
/// Headers are expected to be pre-filtered by the transport; pagination
/// options are deliberately absent.
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    pub headers: HashMap<String, String>,
    pub trusted: bool,
}

impl RequestContext {
    pub fn new() -> Self {
        RequestContext::default()
    }

    pub fn trusted() -> Self {
        RequestContext { trusted: true, ..Default::default() }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }
}

/// Options for a single `find` call. Membership lookups are unbounded and
/// never count.
#[derive(Clone, Debug)]
pub struct FindOptions {
    pub select: Vec<String>,
    pub limit: u64,
    pub count: bool,
}

impl FindOptions {
    pub fn membership(select: &str) -> Self {
        FindOptions { select: vec![select.to_string()], limit: 0, count: false }
    }
}

/// Per-resource admission thresholds.
#[derive(Clone, Debug, Default)]
pub struct CollectionSettings {
    pub min_query_score: Option<u8>,
    pub max_deep_level: Option<u32>,
    pub is_get_all_allowed: bool,
}

impl CollectionSettings {
    pub fn new() -> Self {
        CollectionSettings::default()
    }

    pub fn with_min_query_score(mut self, min: u8) -> Self {
        self.min_query_score = Some(min);
        self
    }

    pub fn with_max_deep_level(mut self, max: u32) -> Self {
        self.max_deep_level = Some(max);
        self
    }

    pub fn allow_get_all(mut self) -> Self {
        self.is_get_all_allowed = true;
        self
    }
}

/// The seam towards routing, hydration and storage collaborators. The engine
/// only ever issues membership lookups and recursive score requests through
/// this trait; executing the final storage query stays with the caller.
#[async_trait]
pub trait Collection: Send + Sync {
    fn name(&self) -> &str;

    fn fields(&self) -> &[Field];

    fn settings(&self) -> &CollectionSettings;

    fn primary_key(&self) -> Result<&Field, GateError> {
        self.fields()
            .iter()
            .find(|field| field.primary)
            .ok_or_else(|| GateError::UnknownPath(format!("{} exposes no primary key", self.name())))
    }

    fn field_by_key(&self, key: &str) -> Option<&Field> {
        self.fields().iter().find(|field| field.key == key)
    }

    fn field_by_path(&self, path: &str) -> Option<&Field> {
        self.fields().iter().find(|field| field.path == path)
    }

    /// Membership lookup against this collection's storage.
    async fn find(
        &self,
        filters: &FilterMap,
        options: FindOptions,
        ctx: &RequestContext,
    ) -> Result<Vec<Record>, GateError>;

    /// Recursive entry point for remote score computation, accepting the same
    /// raw shape the engine parses locally.
    async fn get_query_score(&self, raw: &RawQuery, ctx: &RequestContext) -> Result<QueryScore, GateError>;
}

/// Resolves resource names to capability handles. Relation fields store
/// names, never references, so registration order does not matter and
/// circular relations need no special treatment.
#[derive(Clone, Default)]
pub struct Registry {
    collections: HashMap<String, Arc<dyn Collection>>,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    pub fn register(&mut self, collection: Arc<dyn Collection>) {
        self.collections.insert(collection.name().to_string(), collection);
    }

    pub fn get(&self, name: &str) -> Result<&Arc<dyn Collection>, GateError> {
        self.collections
            .get(name)
            .ok_or_else(|| GateError::UnknownPath(format!("unknown collection '{}'", name)))
    }
}
