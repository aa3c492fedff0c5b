//! Wildcard include/exclude filters for assemblies, classes and files.
//!
//! Patterns are prefixed `+` (include) or `-` (exclude). `*` matches any run
//! of characters; matching is case-insensitive and anchored to the full name.
//! An exclude match always wins; without any include pattern everything is
//! included.

use regex::{Regex, RegexBuilder};

use crate::errors::CovError;

/// Compiled filter over element names.
///
/// Evaluation is a pure function of the pattern set and the name: no state is
/// consulted or mutated.
#[derive(Debug, Clone)]
pub struct Filter {
    includes: Vec<Regex>,
    excludes: Vec<Regex>,
    has_custom_filters: bool,
}

impl Filter {
    /// Compiles a pattern list. Patterns not starting with `+` or `-` are a
    /// contract violation and fail fast.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, CovError> {
        Self::build(patterns, false)
    }

    /// Like [`Filter::new`], but `/` and `\` in patterns and names are
    /// treated as the same separator. Used for file-path filters.
    pub fn for_paths<S: AsRef<str>>(patterns: &[S]) -> Result<Self, CovError> {
        Self::build(patterns, true)
    }

    fn build<S: AsRef<str>>(patterns: &[S], path_separators: bool) -> Result<Self, CovError> {
        let mut includes = Vec::new();
        let mut excludes = Vec::new();

        for pattern in patterns {
            let pattern = pattern.as_ref();
            let (target, body) = if let Some(body) = pattern.strip_prefix('+') {
                (&mut includes, body)
            } else if let Some(body) = pattern.strip_prefix('-') {
                (&mut excludes, body)
            } else {
                return Err(CovError::invalid_filter(
                    pattern,
                    "expected '+' or '-' prefix",
                ));
            };
            target.push(compile_wildcard(body, path_separators)?);
        }

        let has_custom_filters = !includes.is_empty() || !excludes.is_empty();

        if includes.is_empty() {
            includes.push(compile_wildcard("*", false)?);
        }

        Ok(Self {
            includes,
            excludes,
            has_custom_filters,
        })
    }

    /// Whether the element with the given name passes the filter.
    pub fn is_included(&self, name: &str) -> bool {
        if self.excludes.iter().any(|f| f.is_match(name)) {
            return false;
        }

        self.includes.iter().any(|f| f.is_match(name))
    }

    /// Whether any non-default pattern was supplied.
    pub fn has_custom_filters(&self) -> bool {
        self.has_custom_filters
    }
}

impl Default for Filter {
    /// The include-everything filter.
    fn default() -> Self {
        Self::new::<&str>(&[]).expect("empty pattern set always compiles")
    }
}

/// The three independently configured filters of a report run.
#[derive(Debug, Clone, Default)]
pub struct ReportFilters {
    pub assembly: Filter,
    pub class: Filter,
    pub file: Filter,
}

impl ReportFilters {
    pub fn new(
        assembly_patterns: &[String],
        class_patterns: &[String],
        file_patterns: &[String],
    ) -> Result<Self, CovError> {
        Ok(Self {
            assembly: Filter::new(assembly_patterns)?,
            class: Filter::new(class_patterns)?,
            file: Filter::for_paths(file_patterns)?,
        })
    }
}

/// Escapes the pattern body, then re-expands the wildcard marker into `.*`.
/// Escape-first keeps every other regex metacharacter literal.
fn compile_wildcard(body: &str, path_separators: bool) -> Result<Regex, CovError> {
    const WILDCARD: &str = "\u{1}";
    const SEPARATOR: &str = "\u{2}";

    let mut marked = body.replace('*', WILDCARD);
    if path_separators {
        marked = marked.replace(['/', '\\'], SEPARATOR);
    }

    let mut escaped = regex::escape(&marked);
    escaped = escaped.replace(WILDCARD, ".*");
    if path_separators {
        escaped = escaped.replace(SEPARATOR, r"[/\\]");
    }

    RegexBuilder::new(&format!("^{escaped}$"))
        .case_insensitive(true)
        .build()
        .map_err(|e| CovError::invalid_filter(body, e.to_string()))
}
