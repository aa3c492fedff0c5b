//! Shared helpers: path normalization and coverage percentages.

use std::path::Path;

/// Normalize a path string to forward slashes and strip redundant `./`
/// segments, so the same physical file always produces the same identity
/// string regardless of which tool wrote the report.
pub fn normalize_path_text(path: &str) -> String {
    let mut normalized = path.replace('\\', "/");

    while let Some(stripped) = normalized.strip_prefix("./") {
        normalized = stripped.to_string();
    }

    // Collapse interior "/./" produced by some emitters.
    while normalized.contains("/./") {
        normalized = normalized.replace("/./", "/");
    }

    normalized
}

/// Normalize a [`Path`] via [`normalize_path_text`].
pub fn normalize_path(path: &Path) -> String {
    normalize_path_text(&path.to_string_lossy())
}

/// The file-name component of a normalized path string.
pub fn short_name(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Coverage percentage truncated to one decimal place, `None` when there is
/// nothing coverable. Truncation (not rounding) keeps 99.99% visibly below
/// 100%.
pub fn coverage_percent(covered: usize, coverable: usize) -> Option<f64> {
    if coverable == 0 {
        return None;
    }

    Some((1000.0 * covered as f64 / coverable as f64).trunc() / 10.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_text() {
        assert_eq!(
            normalize_path_text(r"C:\work\src\lib.rs"),
            "C:/work/src/lib.rs"
        );
        assert_eq!(normalize_path_text("./src/./lib.rs"), "src/lib.rs");
        assert_eq!(normalize_path_text("/abs/path.rs"), "/abs/path.rs");
    }

    #[test]
    fn test_short_name() {
        assert_eq!(short_name("/work/target/debug/app"), "app");
        assert_eq!(short_name("app"), "app");
    }

    #[test]
    fn test_coverage_percent_truncates() {
        assert_eq!(coverage_percent(2, 3), Some(66.6));
        assert_eq!(coverage_percent(1, 1), Some(100.0));
        assert_eq!(coverage_percent(0, 0), None);
    }
}
