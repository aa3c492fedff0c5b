//! Class-to-file search over source trees.
//!
//! A [`ClassSearcher`] indexes one root directory: every `.rs` file beneath
//! it is scanned (lightweight text scan, no full parse) for type
//! declarations, keyed by the module path derived from the file's location.
//! The index is built once, on first lookup. A type split across several
//! files — inherent impl blocks in separate files, generated code — maps to
//! all of them.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use regex::Regex;
use walkdir::WalkDir;

use crate::model::normalize_class_name;

fn type_decl_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^[ \t]*(?:pub(?:\([^)]*\))?[ \t]+)?(?:struct|enum|trait|union)[ \t]+([A-Za-z_]\w*)")
            .expect("static regex")
    })
}

fn impl_decl_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Captures the self type path of inherent and trait impls.
        Regex::new(r"(?m)^[ \t]*impl(?:[ \t]*<[^>]*>)?[ \t]+(?:[\w:]+(?:<[^>]*>)?[ \t]+for[ \t]+)?((?:[A-Za-z_]\w*::)*[A-Za-z_]\w*)")
            .expect("static regex")
    })
}

#[derive(Debug, Default)]
struct ClassIndex {
    /// `module::path::Type` → defining files.
    by_qualified: HashMap<String, BTreeSet<PathBuf>>,
    /// Bare type name → defining files (fallback scope).
    by_name: HashMap<String, BTreeSet<PathBuf>>,
}

impl ClassIndex {
    fn insert(&mut self, qualified: String, file: &Path) {
        let bare = qualified
            .rsplit("::")
            .next()
            .unwrap_or(&qualified)
            .to_string();
        self.by_name
            .entry(bare)
            .or_default()
            .insert(file.to_path_buf());
        self.by_qualified
            .entry(qualified)
            .or_default()
            .insert(file.to_path_buf());
    }
}

/// Searches one directory tree for the files defining a class.
///
/// The file index is populated lazily and at most once (`OnceLock`), so
/// concurrent lookups against the same searcher serialize only on the first
/// scan, and searchers for different roots never block each other.
#[derive(Debug)]
pub struct ClassSearcher {
    root: Option<PathBuf>,
    index: OnceLock<ClassIndex>,
}

impl ClassSearcher {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root: Some(root),
            index: OnceLock::new(),
        }
    }

    /// A searcher that never touches the file system and finds nothing.
    pub fn empty() -> Self {
        Self {
            root: None,
            index: OnceLock::new(),
        }
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// The files the given class is defined in, sorted. The class name may
    /// use `.`, `/` or `::` separators.
    pub fn files_of_class(&self, class_name: &str) -> Vec<PathBuf> {
        let Some(root) = &self.root else {
            return Vec::new();
        };

        let index = self.index.get_or_init(|| build_index(root));
        let wanted = normalize_class_name(class_name);

        let mut files: BTreeSet<PathBuf> = BTreeSet::new();

        if let Some(exact) = index.by_qualified.get(&wanted) {
            files.extend(exact.iter().cloned());
        }

        if files.is_empty() {
            // The report's crate-qualified name and the path-derived module
            // prefix rarely agree exactly; accept suffix matches on segment
            // boundaries in either direction.
            for (qualified, paths) in &index.by_qualified {
                if wanted.ends_with(&format!("::{qualified}"))
                    || qualified.ends_with(&format!("::{wanted}"))
                {
                    files.extend(paths.iter().cloned());
                }
            }
        }

        if files.is_empty() {
            if let Some(bare) = wanted.rsplit("::").next() {
                if let Some(named) = index.by_name.get(bare) {
                    files.extend(named.iter().cloned());
                }
            }
        }

        files.into_iter().collect()
    }
}

fn build_index(root: &Path) -> ClassIndex {
    let mut index = ClassIndex::default();

    if !root.is_dir() {
        return index;
    }

    log::debug!("indexing classes under {}", root.display());

    let walker = WalkDir::new(root).into_iter().filter_entry(|e| {
        if e.depth() == 0 {
            return true;
        }
        let name = e.file_name().to_string_lossy();
        !(name.starts_with('.') || name == "target")
    });

    for entry in walker.flatten() {
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().map_or(true, |e| e != "rs") {
            continue;
        }

        let Ok(content) = std::fs::read_to_string(path) else {
            continue;
        };

        let module_path = module_path_of(root, path);
        let mut seen = BTreeSet::new();

        for captures in type_decl_regex()
            .captures_iter(&content)
            .chain(impl_decl_regex().captures_iter(&content))
        {
            let type_name = captures[1].rsplit("::").next().unwrap_or(&captures[1]);
            if !seen.insert(type_name.to_string()) {
                continue;
            }

            let qualified = if module_path.is_empty() {
                type_name.to_string()
            } else {
                format!("{module_path}::{type_name}")
            };
            index.insert(qualified, path);
        }
    }

    index
}

/// Derives the module path of a file from its location below the root:
/// `src/geometry/circle.rs` → `geometry::circle`, with `mod.rs`, `lib.rs`
/// and `main.rs` mapping to their directory.
fn module_path_of(root: &Path, file: &Path) -> String {
    let relative = file.strip_prefix(root).unwrap_or(file);
    let mut segments: Vec<String> = Vec::new();

    for component in relative.iter() {
        segments.push(component.to_string_lossy().into_owned());
    }

    let file_name = segments.pop().unwrap_or_default();
    if segments.first().map(String::as_str) == Some("src") {
        segments.remove(0);
    }

    let stem = file_name.trim_end_matches(".rs");
    if !matches!(stem, "mod" | "lib" | "main") {
        segments.push(stem.to_string());
    }

    segments.join("::")
}

/// Provides [`ClassSearcher`] instances with scoped caching.
///
/// A request for a directory at or below a cached root reuses that searcher
/// (the wider index already covers the narrower scope). A request for a
/// strict ancestor of every cached root gets a fresh, independently cached
/// searcher, so a wider scan is never served from a stale narrow index.
#[derive(Debug, Default)]
pub struct ClassSearcherFactory {
    cached: Mutex<Vec<Arc<ClassSearcher>>>,
}

impl ClassSearcherFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn searcher_for(&self, directory: Option<&Path>) -> Arc<ClassSearcher> {
        let Some(directory) = directory else {
            return Arc::new(ClassSearcher::empty());
        };

        let mut cached = self.cached.lock();

        if let Some(existing) = cached
            .iter()
            .find(|s| s.root().is_some_and(|root| directory.starts_with(root)))
        {
            return Arc::clone(existing);
        }

        let searcher = Arc::new(ClassSearcher::new(directory.to_path_buf()));
        cached.push(Arc::clone(&searcher));
        searcher
    }

    /// One searcher per directory, wrapped for joint lookup.
    pub fn searcher_for_dirs(&self, directories: &[PathBuf]) -> CompositeClassSearcher {
        CompositeClassSearcher {
            searchers: directories
                .iter()
                .map(|d| self.searcher_for(Some(d)))
                .collect(),
        }
    }
}

/// Joint lookup across several searchers (the global source-search scope).
#[derive(Debug, Clone, Default)]
pub struct CompositeClassSearcher {
    searchers: Vec<Arc<ClassSearcher>>,
}

impl CompositeClassSearcher {
    pub fn files_of_class(&self, class_name: &str) -> Vec<PathBuf> {
        let mut files: BTreeSet<PathBuf> = BTreeSet::new();
        for searcher in &self.searchers {
            files.extend(searcher.files_of_class(class_name));
        }
        files.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn fixture_tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "src/geometry/circle.rs",
            "pub struct Circle {\n    radius: f64,\n}\n\nimpl Circle {\n    pub fn new(radius: f64) -> Self {\n        Self { radius }\n    }\n}\n",
        );
        write(
            dir.path(),
            "src/geometry/circle_ext.rs",
            "use super::circle::Circle;\n\nimpl Circle {\n    pub fn area(&self) -> f64 {\n        0.0\n    }\n}\n",
        );
        write(
            dir.path(),
            "src/lib.rs",
            "pub mod geometry;\n\npub enum Shape {\n    Circle,\n}\n",
        );
        dir
    }

    #[test]
    fn test_finds_class_by_qualified_name() {
        let dir = fixture_tree();
        let searcher = ClassSearcher::new(dir.path().to_path_buf());

        let files = searcher.files_of_class("geometry::circle::Circle");
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("src/geometry/circle.rs"));
    }

    #[test]
    fn test_finds_partial_class_across_files_by_name() {
        let dir = fixture_tree();
        let searcher = ClassSearcher::new(dir.path().to_path_buf());

        // Bare-name fallback returns both defining files.
        let files = searcher.files_of_class("Circle");
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_dot_separated_names_are_normalized() {
        let dir = fixture_tree();
        let searcher = ClassSearcher::new(dir.path().to_path_buf());

        let files = searcher.files_of_class("geometry.circle.Circle");
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_crate_prefixed_name_matches_by_suffix() {
        let dir = fixture_tree();
        let searcher = ClassSearcher::new(dir.path().to_path_buf());

        let files = searcher.files_of_class("mycrate::geometry::circle::Circle");
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_empty_searcher_never_finds() {
        let searcher = ClassSearcher::empty();
        assert!(searcher.files_of_class("Circle").is_empty());
    }

    #[test]
    fn test_missing_root_yields_empty_index() {
        let searcher = ClassSearcher::new(PathBuf::from("/does/not/exist"));
        assert!(searcher.files_of_class("Circle").is_empty());
    }

    #[test]
    fn test_factory_reuses_searcher_for_subdirectory() {
        let dir = fixture_tree();
        let factory = ClassSearcherFactory::new();

        let wide = factory.searcher_for(Some(dir.path()));
        let narrow = factory.searcher_for(Some(&dir.path().join("src/geometry")));

        assert!(Arc::ptr_eq(&wide, &narrow));
    }

    #[test]
    fn test_factory_creates_new_searcher_for_strict_parent() {
        let dir = fixture_tree();
        let factory = ClassSearcherFactory::new();

        let narrow = factory.searcher_for(Some(&dir.path().join("src/geometry")));
        let wide = factory.searcher_for(Some(dir.path()));

        assert!(!Arc::ptr_eq(&narrow, &wide));
        assert!(wide.root().is_some_and(|r| r == dir.path()));
    }

    #[test]
    fn test_module_path_of() {
        let root = Path::new("/work");
        assert_eq!(
            module_path_of(root, Path::new("/work/src/geometry/circle.rs")),
            "geometry::circle"
        );
        assert_eq!(
            module_path_of(root, Path::new("/work/src/geometry/mod.rs")),
            "geometry"
        );
        assert_eq!(module_path_of(root, Path::new("/work/src/lib.rs")), "");
    }
}
