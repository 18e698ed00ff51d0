//! Path pattern matching for registered endpoints
//!
//! Patterns are plain paths whose segments may be `:name` placeholders.
//! A placeholder binds any single non-empty segment; literals must match
//! exactly. Exact (placeholder-free) patterns always win over parametric
//! ones; among parametric candidates, registration order decides.

use std::collections::HashMap;

/// One segment of a compiled pattern
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// A compiled path pattern
#[derive(Debug, Clone)]
pub struct PathPattern {
    segments: Vec<Segment>,
    has_params: bool,
}

impl PathPattern {
    /// Compile a pattern string. Empty segments from leading/trailing or
    /// doubled slashes are discarded.
    pub fn compile(pattern: &str) -> Self {
        let segments: Vec<Segment> = pattern
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| {
                if let Some(name) = s.strip_prefix(':') {
                    Segment::Param(name.to_string())
                } else {
                    Segment::Literal(s.to_string())
                }
            })
            .collect();
        let has_params = segments.iter().any(|s| matches!(s, Segment::Param(_)));
        Self { segments, has_params }
    }

    /// True when the pattern contains no placeholders.
    pub fn is_exact(&self) -> bool {
        !self.has_params
    }

    /// Match a request path against the pattern, returning the bound
    /// parameters on success.
    pub fn matches(&self, path: &str) -> Option<HashMap<String, String>> {
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = HashMap::new();
        for (segment, part) in self.segments.iter().zip(parts.iter()) {
            match segment {
                Segment::Literal(lit) => {
                    if lit != part {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    params.insert(name.clone(), (*part).to_string());
                }
            }
        }
        Some(params)
    }
}

/// Result of matching a request path against a set of candidates:
/// the index of the winning candidate plus its bound parameters.
#[derive(Debug, Clone)]
pub struct PathMatch {
    /// Index into the candidate slice passed to [`find_match`]
    pub index: usize,
    /// Bound `:name` parameters
    pub params: HashMap<String, String>,
}

/// Find the winning pattern for `path` among `patterns`, which must be in
/// registration order. An exact match beats any parametric one; ties go
/// to the earliest registration.
pub fn find_match(patterns: &[&str], path: &str) -> Option<PathMatch> {
    let compiled: Vec<PathPattern> = patterns.iter().map(|p| PathPattern::compile(p)).collect();

    // Exact patterns first
    for (index, pattern) in compiled.iter().enumerate() {
        if pattern.is_exact() {
            if let Some(params) = pattern.matches(path) {
                return Some(PathMatch { index, params });
            }
        }
    }

    for (index, pattern) in compiled.iter().enumerate() {
        if let Some(params) = pattern.matches(path) {
            return Some(PathMatch { index, params });
        }
    }

    None
}
