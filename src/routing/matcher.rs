//! Path pattern matching.
//!
//! # Design Decisions
//! - `/` matches only the root path exactly
//! - Any other pattern is a segment-aware prefix: `/admin` matches `/admin`
//!   and `/admin/users`, but not `/administrator`
//! - Path matching is case-sensitive
//! - No regex to guarantee O(n) matching

/// A compiled route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPattern {
    Exact(String),
    Prefix(String),
}

impl PathPattern {
    /// Compile a configured pattern. Trailing slashes are ignored so that
    /// `/dashboard/` and `/dashboard` are the same rule.
    pub fn new(pattern: &str) -> Self {
        let trimmed = pattern.trim_end_matches('/');
        if trimmed.is_empty() {
            PathPattern::Exact("/".to_string())
        } else {
            PathPattern::Prefix(trimmed.to_string())
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathPattern::Exact(expected) => path == expected,
            PathPattern::Prefix(prefix) => match path.strip_prefix(prefix.as_str()) {
                Some(rest) => rest.is_empty() || rest.starts_with('/'),
                None => false,
            },
        }
    }

    /// Longer patterns are more specific.
    pub fn specificity(&self) -> usize {
        match self {
            PathPattern::Exact(p) | PathPattern::Prefix(p) => p.len(),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            PathPattern::Exact(p) | PathPattern::Prefix(p) => p,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_is_exact() {
        let pattern = PathPattern::new("/");
        assert!(pattern.matches("/"));
        assert!(!pattern.matches("/dashboard"));
    }

    #[test]
    fn test_prefix_matcher() {
        let pattern = PathPattern::new("/api");
        assert!(pattern.matches("/api"));
        assert!(pattern.matches("/api/v1"));
        assert!(!pattern.matches("/apis"));
        assert!(!pattern.matches("/images"));
    }

    #[test]
    fn test_trailing_slash_normalized() {
        assert_eq!(PathPattern::new("/admin/"), PathPattern::new("/admin"));
        assert!(PathPattern::new("/admin/").matches("/admin"));
    }

    #[test]
    fn test_case_sensitive() {
        assert!(!PathPattern::new("/admin").matches("/Admin"));
    }
}
