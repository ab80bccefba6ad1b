use error::GateError;
use filter::ParsedQuery;
use tracing::debug;

use crate::{CollectionSettings, QueryScore, RequestContext};

/// Pagination and score-related options of the incoming request, as far as
/// admission is concerned.
#[derive(Clone, Copy, Debug, Default)]
pub struct PageRequest {
    /// `Some(0)` asks for an unbounded result set.
    pub limit: Option<u64>,
    pub wants_score: bool,
}

impl PageRequest {
    pub fn new() -> Self {
        PageRequest::default()
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn wanting_score(mut self) -> Self {
        self.wants_score = true;
        self
    }

    pub fn is_unbounded(&self) -> bool {
        self.limit == Some(0)
    }
}

/// Ordinary bounded, shallow, single-resource requests skip scoring entirely.
pub fn needs_scoring(
    settings: &CollectionSettings,
    request: &PageRequest,
    parsed: &ParsedQuery,
    ctx: &RequestContext,
) -> bool {
    if request.wants_score {
        return true;
    }
    if !parsed.nested.is_empty() {
        return true;
    }
    request.is_unbounded() && !settings.is_get_all_allowed && !ctx.trusted
}

/// Depth check on the nesting a request declares, before any remote work.
pub fn check_declared_level(settings: &CollectionSettings, parsed: &ParsedQuery) -> Result<(), GateError> {
    if let Some(max) = settings.max_deep_level
        && parsed.declared_level > max
    {
        return Err(GateError::RequestOutOfRange(format!(
            "declared nesting level {} exceeds maximum {}",
            parsed.declared_level, max
        )));
    }
    Ok(())
}

/// Final verdict once all recursive scores are in.
pub fn validate_query_score(settings: &CollectionSettings, score: &QueryScore) -> Result<(), GateError> {
    if let Some(min) = settings.min_query_score
        && score.total < min
    {
        debug!("rejecting query: score {} below minimum {}", score.total, min);
        return Err(GateError::RequestOutOfRange(format!(
            "query score {} below minimum {}",
            score.total, min
        )));
    }
    if let Some(max) = settings.max_deep_level
        && score.max_level > max
    {
        debug!("rejecting query: level {} above maximum {}", score.max_level, max);
        return Err(GateError::RequestOutOfRange(format!(
            "nesting level {} exceeds maximum {}",
            score.max_level, max
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::*;

    fn score(total: u8, max_level: u32) -> QueryScore {
        QueryScore { total, max_level, filters: IndexMap::new() }
    }

    #[test]
    fn test_scoring_triggers() {
        let settings = CollectionSettings::new();
        let parsed = ParsedQuery::default();
        let ctx = RequestContext::new();

        assert!(needs_scoring(&settings, &PageRequest::new().wanting_score(), &parsed, &ctx));
        assert!(needs_scoring(&settings, &PageRequest::new().with_limit(0), &parsed, &ctx));
        assert!(!needs_scoring(&settings, &PageRequest::new().with_limit(10), &parsed, &ctx));
        assert!(!needs_scoring(&settings, &PageRequest::new(), &parsed, &ctx));
    }

    #[test]
    fn test_unbounded_with_elevated_trust_skips_scoring() {
        let parsed = ParsedQuery::default();
        let request = PageRequest::new().with_limit(0);

        let allowed = CollectionSettings::new().allow_get_all();
        assert!(!needs_scoring(&allowed, &request, &parsed, &RequestContext::new()));

        let settings = CollectionSettings::new();
        assert!(!needs_scoring(&settings, &request, &parsed, &RequestContext::trusted()));
    }

    #[test]
    fn test_nested_always_scores() {
        let settings = CollectionSettings::new();
        let mut parsed = ParsedQuery::default();
        parsed.nested.push("slackTeams", ("name".to_string(), "Team3".to_string()));
        assert!(needs_scoring(&settings, &PageRequest::new().with_limit(10), &parsed, &RequestContext::new()));
    }

    #[test]
    fn test_score_boundary() {
        let settings = CollectionSettings::new().with_min_query_score(15);
        assert!(validate_query_score(&settings, &score(15, 1)).is_ok());
        assert!(matches!(
            validate_query_score(&settings, &score(14, 1)),
            Err(GateError::RequestOutOfRange(_))
        ));
    }

    #[test]
    fn test_level_boundary() {
        let settings = CollectionSettings::new().with_max_deep_level(2);
        assert!(validate_query_score(&settings, &score(50, 2)).is_ok());
        assert!(matches!(
            validate_query_score(&settings, &score(50, 3)),
            Err(GateError::RequestOutOfRange(_))
        ));
    }

    #[test]
    fn test_unconfigured_settings_accept_anything() {
        let settings = CollectionSettings::new();
        assert!(validate_query_score(&settings, &score(0, 9)).is_ok());
    }

    #[test]
    fn test_declared_level() {
        let settings = CollectionSettings::new().with_max_deep_level(1);
        let mut parsed = ParsedQuery::default();
        parsed.declared_level = 2;
        assert!(matches!(
            check_declared_level(&settings, &parsed),
            Err(GateError::RequestOutOfRange(_))
        ));
        parsed.declared_level = 1;
        assert!(check_declared_level(&settings, &parsed).is_ok());
    }
}
