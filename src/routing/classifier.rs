//! Path → zone classification.
//!
//! # Responsibilities
//! - Store compiled route rules
//! - Look up the most specific rule for a path
//! - Lift zones under the API prefix to their JSON-answering variants
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan over rules sorted by specificity
//! - Unmatched paths fall back to Public (ApiPublic under the API prefix)

use std::sync::Arc;

use crate::config::RouteConfig;
use crate::routing::{PathPattern, Zone};

/// A compiled route rule.
#[derive(Debug, Clone)]
pub struct RouteRule {
    pub pattern: PathPattern,
    pub zone: Zone,
    /// Satisfied by any one entry.
    pub required_permissions: Vec<String>,
    /// Named per-route rate-limit bucket.
    pub rate_limit: Option<String>,
}

impl RouteRule {
    pub fn new(pattern: &str, zone: Zone) -> Self {
        Self {
            pattern: PathPattern::new(pattern),
            zone,
            required_permissions: Vec::new(),
            rate_limit: None,
        }
    }

    pub fn with_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_permissions = permissions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_rate_limit(mut self, bucket: impl Into<String>) -> Self {
        self.rate_limit = Some(bucket.into());
        self
    }
}

impl From<&RouteConfig> for RouteRule {
    fn from(config: &RouteConfig) -> Self {
        Self {
            pattern: PathPattern::new(&config.pattern),
            zone: config.zone,
            required_permissions: config.required_permissions.clone(),
            rate_limit: config.rate_limit.clone(),
        }
    }
}

/// Result of classifying one request path.
#[derive(Debug, Clone)]
pub struct Classification {
    pub zone: Zone,
    /// The rule that matched, if any.
    pub rule: Option<Arc<RouteRule>>,
}

impl Classification {
    pub fn required_permissions(&self) -> &[String] {
        self.rule
            .as_ref()
            .map(|r| r.required_permissions.as_slice())
            .unwrap_or(&[])
    }

    pub fn rate_limit_bucket(&self) -> Option<&str> {
        self.rule.as_ref().and_then(|r| r.rate_limit.as_deref())
    }
}

#[derive(Debug)]
pub struct RouteClassifier {
    rules: Vec<Arc<RouteRule>>,
    api_prefix: PathPattern,
}

impl RouteClassifier {
    pub fn new(rules: Vec<RouteRule>, api_prefix: &str) -> Self {
        let mut rules: Vec<Arc<RouteRule>> = rules.into_iter().map(Arc::new).collect();
        // Stable sort keeps declared order among equally specific rules.
        rules.sort_by(|a, b| b.pattern.specificity().cmp(&a.pattern.specificity()));

        Self {
            rules,
            api_prefix: PathPattern::new(api_prefix),
        }
    }

    pub fn from_config(routes: &[RouteConfig], api_prefix: &str) -> Self {
        Self::new(routes.iter().map(RouteRule::from).collect(), api_prefix)
    }

    pub fn classify(&self, path: &str) -> Classification {
        let rule = self.rules.iter().find(|r| r.pattern.matches(path)).cloned();
        let declared = rule.as_ref().map(|r| r.zone).unwrap_or(Zone::Public);

        let zone = if self.api_prefix.matches(path) {
            declared.api_variant()
        } else {
            declared
        };

        Classification { zone, rule }
    }

    pub fn rules(&self) -> &[Arc<RouteRule>] {
        &self.rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> RouteClassifier {
        RouteClassifier::new(
            vec![
                RouteRule::new("/", Zone::Public),
                RouteRule::new("/auth", Zone::AuthPage),
                RouteRule::new("/auth/verify-email", Zone::Public),
                RouteRule::new("/dashboard", Zone::Protected),
                RouteRule::new("/admin", Zone::Admin),
                RouteRule::new("/moderation", Zone::Moderator),
                RouteRule::new("/api", Zone::Protected),
                RouteRule::new("/api/auth", Zone::Public).with_rate_limit("auth"),
                RouteRule::new("/api/admin", Zone::Admin),
            ],
            "/api",
        )
    }

    #[test]
    fn test_page_zones() {
        let c = classifier();
        assert_eq!(c.classify("/").zone, Zone::Public);
        assert_eq!(c.classify("/dashboard").zone, Zone::Protected);
        assert_eq!(c.classify("/dashboard/goals/7").zone, Zone::Protected);
        assert_eq!(c.classify("/admin").zone, Zone::Admin);
        assert_eq!(c.classify("/moderation/queue").zone, Zone::Moderator);
        assert_eq!(c.classify("/auth/signin").zone, Zone::AuthPage);
    }

    #[test]
    fn test_most_specific_wins() {
        let c = classifier();
        assert_eq!(c.classify("/auth/verify-email").zone, Zone::Public);
        assert_eq!(c.classify("/api/admin/rate-limits").zone, Zone::ApiAdmin);
        assert_eq!(c.classify("/api/auth/signin").zone, Zone::ApiPublic);
    }

    #[test]
    fn test_unmatched_defaults() {
        let c = classifier();
        let page = c.classify("/pricing");
        assert_eq!(page.zone, Zone::Public);
        assert!(page.rule.is_none());
        assert_eq!(c.classify("/administrator").zone, Zone::Public);
    }

    #[test]
    fn test_api_variants() {
        let c = RouteClassifier::new(vec![RouteRule::new("/api/goals", Zone::Protected)], "/api");
        assert_eq!(c.classify("/api/goals").zone, Zone::ApiProtected);
        assert_eq!(c.classify("/api/unknown").zone, Zone::ApiPublic);
    }

    #[test]
    fn test_rule_metadata() {
        let c = classifier();
        let classification = c.classify("/api/auth/callback");
        assert_eq!(classification.rate_limit_bucket(), Some("auth"));
        assert!(classification.required_permissions().is_empty());
    }

    #[test]
    fn test_declared_order_breaks_ties() {
        let c = RouteClassifier::new(
            vec![
                RouteRule::new("/reports", Zone::Moderator),
                RouteRule::new("/reports/", Zone::Admin),
            ],
            "/api",
        );
        assert_eq!(c.classify("/reports").zone, Zone::Moderator);
    }
}
