//! Shared preprocessing machinery: position enrichment and synthetic-class
//! folding rules.

use std::path::{Path, PathBuf};

use crate::formats::IngestContext;
use crate::model::normalize_class_name;
use crate::source::{MemberSpec, SourceSpan, SymbolSpec};

/// Whether a class name is a compiler-synthesized wrapper (closure
/// environments, async state machines, startup wrappers) rather than a type
/// the user wrote.
pub(crate) fn is_synthetic_class_name(name: &str) -> bool {
    if name.contains("{{closure}}") || name.contains("{closure}") {
        return true;
    }

    // .NET-style wrappers: `<StartupCode$...`, `Outer.<Main>$`, `<>c__...`.
    name.starts_with('<')
        || name
            .rsplit(['.', '/', ':'])
            .next()
            .is_some_and(|segment| segment.starts_with('<'))
}

/// The logical owner class of a synthetic wrapper.
///
/// If the wrapper's own name carries the owner as a prefix
/// (`calc::Calc::{{closure}}`), that prefix wins. Otherwise the owner is
/// derived from the dominant member: a qualified member name loses its final
/// segment, an unqualified one gives no owner.
pub(crate) fn logical_owner(synthetic_name: &str, dominant_member: Option<&str>) -> Option<String> {
    let normalized = normalize_class_name(synthetic_name);

    for marker in ["::{{closure}}", "::{closure}"] {
        if let Some(idx) = normalized.find(marker) {
            return Some(normalized[..idx].to_string());
        }
    }

    let member = normalize_class_name(dominant_member?);
    let (owner, _) = member.rsplit_once("::")?;
    Some(owner.to_string())
}

/// Picks the dominant member: the name occurring most often, ties broken by
/// first occurrence. `counts` is (member name, number of coverage entries).
pub(crate) fn dominant_member(counts: &[(String, usize)]) -> Option<&str> {
    let mut best: Option<(&str, usize)> = None;

    for (name, count) in counts {
        match best {
            Some((_, best_count)) if *count <= best_count => {}
            _ => best = Some((name.as_str(), *count)),
        }
    }

    best.map(|(name, _)| name)
}

/// Resolves a declared source path against the report's source roots: the
/// first root under which the file exists wins; if none exists, the first
/// root is the best-effort default.
pub(crate) fn resolve_against_roots(roots: &[String], declared: &str) -> String {
    let declared_path = Path::new(declared);
    if declared_path.is_absolute() || roots.is_empty() {
        return declared.to_string();
    }

    for root in roots {
        let candidate = Path::new(root).join(declared_path);
        if candidate.exists() {
            return candidate.to_string_lossy().into_owned();
        }
    }

    Path::new(&roots[0])
        .join(declared_path)
        .to_string_lossy()
        .into_owned()
}

/// Position lookup in the documented scope order: module files first, then
/// the longest common ancestor of the module's files, then the global
/// source-search scope. The first file that actually contains the symbol
/// wins.
pub(crate) struct PositionEnricher<'a> {
    ctx: &'a IngestContext,
}

impl<'a> PositionEnricher<'a> {
    pub(crate) fn new(ctx: &'a IngestContext) -> Self {
        Self { ctx }
    }

    pub(crate) fn resolve(
        &self,
        class_name: &str,
        member: &MemberSpec,
        module_files: &[PathBuf],
    ) -> Option<(PathBuf, SourceSpan)> {
        let type_name = normalize_class_name(class_name)
            .rsplit("::")
            .next()
            .unwrap_or(class_name)
            .to_string();

        // Scope 1: files the module already references.
        if let Some(hit) = self.try_files(module_files, &type_name, member) {
            return Some(hit);
        }

        // Scope 2: common ancestor directory of the module's files.
        if let Some(ancestor) = common_ancestor(module_files) {
            let searcher = self.ctx.searcher_factory.searcher_for(Some(&ancestor));
            let candidates = searcher.files_of_class(class_name);
            if let Some(hit) = self.try_files(&candidates, &type_name, member) {
                return Some(hit);
            }
        }

        // Scope 3: all user-declared source directories.
        let candidates = self.ctx.global_searcher().files_of_class(class_name);
        self.try_files(&candidates, &type_name, member)
    }

    fn try_files(
        &self,
        files: &[PathBuf],
        type_name: &str,
        member: &MemberSpec,
    ) -> Option<(PathBuf, SourceSpan)> {
        for file in files {
            let typed = SymbolSpec {
                type_name: Some(type_name.to_string()),
                member: member.clone(),
            };
            if let Some(span) = self.ctx.resolver.find_declaration_span(file, &typed) {
                return Some((file.clone(), span));
            }

            // Free functions: grcov-style classes name a module, not a type.
            let free = SymbolSpec {
                type_name: None,
                member: member.clone(),
            };
            if let Some(span) = self.ctx.resolver.find_declaration_span(file, &free) {
                return Some((file.clone(), span));
            }
        }

        None
    }
}

/// Longest common ancestor directory of the given files.
pub(crate) fn common_ancestor(files: &[PathBuf]) -> Option<PathBuf> {
    let mut iter = files.iter();
    let first = iter.next()?;
    let mut ancestor: PathBuf = first.parent()?.to_path_buf();

    for file in iter {
        let dir = file.parent()?;
        while !dir.starts_with(&ancestor) {
            ancestor = ancestor.parent()?.to_path_buf();
        }
    }

    Some(ancestor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_name_detection() {
        assert!(is_synthetic_class_name("calc::Calc::{{closure}}"));
        assert!(is_synthetic_class_name("<StartupCode$lib>"));
        assert!(is_synthetic_class_name("Outer.<Main>$"));
        assert!(!is_synthetic_class_name("calc::Calc"));
        assert!(!is_synthetic_class_name("Generic<T>Holder"));
    }

    #[test]
    fn test_logical_owner_from_closure_prefix() {
        assert_eq!(
            logical_owner("calc::Calc::{{closure}}", None),
            Some("calc::Calc".to_string())
        );
    }

    #[test]
    fn test_logical_owner_from_dominant_member() {
        assert_eq!(
            logical_owner("<Wrapper>$", Some("calc::Calc::run")),
            Some("calc::Calc".to_string())
        );
        assert_eq!(logical_owner("<Wrapper>$", Some("run")), None);
        assert_eq!(logical_owner("<Wrapper>$", None), None);
    }

    #[test]
    fn test_dominant_member_prefers_most_entries_then_first() {
        let counts = vec![
            ("a::first".to_string(), 2),
            ("a::second".to_string(), 5),
            ("a::third".to_string(), 5),
        ];
        assert_eq!(dominant_member(&counts), Some("a::second"));
        assert_eq!(dominant_member(&[]), None);
    }

    #[test]
    fn test_resolve_against_roots_prefers_existing() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("b")).unwrap();
        std::fs::write(dir.path().join("b/lib.rs"), "").unwrap();

        let roots = vec![
            dir.path().join("a").to_string_lossy().into_owned(),
            dir.path().join("b").to_string_lossy().into_owned(),
        ];

        let resolved = resolve_against_roots(&roots, "lib.rs");
        assert!(resolved.ends_with("b/lib.rs") || resolved.ends_with("b\\lib.rs"));

        // No root contains it: first root is the default.
        let fallback = resolve_against_roots(&roots, "missing.rs");
        assert!(fallback.contains("a"));
    }

    #[test]
    fn test_absolute_paths_are_left_alone() {
        let roots = vec!["/src".to_string()];
        assert_eq!(
            resolve_against_roots(&roots, "/abs/lib.rs"),
            "/abs/lib.rs"
        );
    }

    #[test]
    fn test_common_ancestor() {
        let files = vec![
            PathBuf::from("/work/src/a/x.rs"),
            PathBuf::from("/work/src/b/y.rs"),
        ];
        assert_eq!(common_ancestor(&files), Some(PathBuf::from("/work/src")));
        assert_eq!(common_ancestor(&[]), None);
    }
}
