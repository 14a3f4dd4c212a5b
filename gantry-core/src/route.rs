// Route pattern compilation and matching
//
// Patterns are compiled once at registration into a sequence of
// literal/wildcard segments and matched segment-by-segment; no regex
// engine is involved. Both the pattern and the candidate path are
// normalized to a leading slash and exactly one trailing slash, so
// "/home" and "/home/" are interchangeable on either side.

/// One compiled pattern segment.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Wildcard,
}

/// A compiled route pattern: immutable after registration.
///
/// A trailing `*` matches any (possibly empty) remaining suffix; a `*`
/// anywhere else matches exactly one segment. An empty pattern compiled
/// as a prefix matches every path (the root "use-all" case).
#[derive(Clone, Debug)]
pub struct RoutePattern {
    raw: String,
    segments: Vec<Segment>,
    exact: bool,
}

impl RoutePattern {
    /// Compile a pattern. `as_prefix` selects prefix anchoring; exact
    /// patterns must also consume the whole candidate path.
    pub fn compile(pattern: &str, as_prefix: bool) -> Self {
        let normalized = normalize_path(pattern);
        let segments = normalized
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| {
                if s == "*" {
                    Segment::Wildcard
                } else {
                    Segment::Literal(s.to_string())
                }
            })
            .collect();
        Self {
            raw: pattern.to_string(),
            segments,
            exact: !as_prefix,
        }
    }

    /// The pattern text as registered.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn is_prefix(&self) -> bool {
        !self.exact
    }

    /// Test a request path against this pattern. Idempotent and
    /// side-effect free.
    pub fn matches(&self, path: &str) -> bool {
        let normalized = normalize_path(path);
        let candidate: Vec<&str> = normalized.split('/').filter(|s| !s.is_empty()).collect();

        let last = self.segments.len().wrapping_sub(1);
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                // Trailing wildcard swallows whatever remains.
                Segment::Wildcard if i == last => return true,
                _ if i >= candidate.len() => return false,
                Segment::Literal(text) => {
                    if text != candidate[i] {
                        return false;
                    }
                }
                Segment::Wildcard => {}
            }
        }

        if self.exact {
            candidate.len() == self.segments.len()
        } else {
            true
        }
    }
}

/// Canonical path form: leading slash, exactly one trailing slash.
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return "/".to_string();
    }
    let mut out = String::with_capacity(trimmed.len() + 2);
    if !trimmed.starts_with('/') {
        out.push('/');
    }
    out.push_str(trimmed);
    out.push('/');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/home"), "/home/");
        assert_eq!(normalize_path("/home/"), "/home/");
        assert_eq!(normalize_path("/home///"), "/home/");
        assert_eq!(normalize_path("home"), "/home/");
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("/"), "/");
    }

    #[test]
    fn test_literal_exact_match() {
        let pattern = RoutePattern::compile("/users", false);
        assert!(pattern.matches("/users"));
        assert!(pattern.matches("/users/"));
        assert!(!pattern.matches("/users/42"));
        assert!(!pattern.matches("/user"));
    }

    #[test]
    fn test_trailing_slash_equivalence() {
        let pattern = RoutePattern::compile("/home/", false);
        assert!(pattern.matches("/home"));
        let pattern = RoutePattern::compile("/home", false);
        assert!(pattern.matches("/home/"));
    }

    #[test]
    fn test_interior_wildcard_matches_one_segment() {
        let pattern = RoutePattern::compile("/users/*/posts", false);
        assert!(pattern.matches("/users/42/posts"));
        assert!(!pattern.matches("/users/posts"));
        assert!(!pattern.matches("/users/42/43/posts"));
    }

    #[test]
    fn test_trailing_wildcard_matches_suffix() {
        let pattern = RoutePattern::compile("/files/*", false);
        assert!(pattern.matches("/files/a.txt"));
        assert!(pattern.matches("/files/sub/dir/b.txt"));
        // The suffix may be empty.
        assert!(pattern.matches("/files"));
        assert!(!pattern.matches("/file"));
    }

    #[test]
    fn test_prefix_match() {
        let pattern = RoutePattern::compile("/api", true);
        assert!(pattern.matches("/api"));
        assert!(pattern.matches("/api/v1/users"));
        assert!(!pattern.matches("/apidocs"));
        assert!(!pattern.matches("/other"));
    }

    #[test]
    fn test_empty_prefix_matches_everything() {
        let pattern = RoutePattern::compile("", true);
        assert!(pattern.matches("/"));
        assert!(pattern.matches("/anything"));
        assert!(pattern.matches("/deeply/nested/path"));
    }

    #[test]
    fn test_empty_exact_matches_only_root() {
        let pattern = RoutePattern::compile("/", false);
        assert!(pattern.matches("/"));
        assert!(pattern.matches(""));
        assert!(!pattern.matches("/a"));
    }

    #[test]
    fn test_matches_is_idempotent() {
        let pattern = RoutePattern::compile("/users/*", false);
        assert!(pattern.matches("/users/1"));
        assert!(pattern.matches("/users/1"));
        assert_eq!(pattern.raw(), "/users/*");
    }
}
