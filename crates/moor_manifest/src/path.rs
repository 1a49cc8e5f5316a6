//! Path normalization for volumes and secret files.
//!
//! Volume and secret paths in a manifest are written relative to the
//! application root inside the container; absolute paths are taken as-is.
//! Normalization collapses `..` segments without touching the filesystem.

use crate::config::{APP_ROOT, FORBIDDEN_VOLUMES};

/// Split a path into segments, `"/"` first for absolute paths.
pub fn split_path(path: &str) -> Vec<String> {
    let mut segments = Vec::new();
    if path.starts_with('/') {
        segments.push("/".to_string());
    }
    for part in path.split('/') {
        if !part.is_empty() {
            segments.push(part.to_string());
        }
    }
    segments
}

/// Collapse `..` segments. A leading `"/"` is never popped, so `..` at the
/// root is simply discarded.
pub fn simplify_path(segments: &[String]) -> Vec<String> {
    let mut simplified: Vec<String> = Vec::new();
    for segment in segments {
        if segment == ".." {
            if simplified.len() > 1 {
                simplified.pop();
            }
        } else {
            simplified.push(segment.clone());
        }
    }
    simplified
}

/// Re-join segments produced by [`split_path`].
pub fn join_path(segments: &[String]) -> String {
    let mut joined = String::new();
    for segment in segments {
        if joined.is_empty() || joined.ends_with('/') {
            joined.push_str(segment);
        } else {
            joined.push('/');
            joined.push_str(segment);
        }
    }
    joined
}

/// Resolve a manifest path against the application root and normalize it.
/// Absolute paths ignore the root; relative paths are anchored under it.
pub fn resolve(path: &str) -> String {
    let trimmed = path.trim();
    let anchored = if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("{APP_ROOT}/{trimmed}")
    };
    join_path(&simplify_path(&split_path(&anchored)))
}

/// Resolve every path in a list.
pub fn resolve_all(paths: &[String]) -> Vec<String> {
    paths.iter().map(|p| resolve(p)).collect()
}

/// A resolved volume path may not claim a reserved location.
pub fn volume_allowed(resolved: &str) -> bool {
    !FORBIDDEN_VOLUMES.contains(&resolved)
}

/// Routing domain for an application: dot-segments of the name, reversed.
pub fn app_domain(appname: &str) -> String {
    let mut segments: Vec<&str> = appname.split('.').collect();
    segments.reverse();
    segments.join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segs(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_split_path() {
        assert_eq!(split_path("/lain/app/data"), segs(&["/", "lain", "app", "data"]));
        assert_eq!(split_path("data/cache"), segs(&["data", "cache"]));
    }

    #[test]
    fn test_simplify_path_drops_parent_segments() {
        assert_eq!(simplify_path(&segs(&["/", "a", "..", "b"])), segs(&["/", "b"]));
        // `..` at the root has nothing to pop
        assert_eq!(simplify_path(&segs(&["/", "..", "b"])), segs(&["/", "b"]));
    }

    #[test]
    fn test_join_path() {
        assert_eq!(join_path(&segs(&["/", "lain", "app"])), "/lain/app");
        assert_eq!(join_path(&segs(&["data", "cache"])), "data/cache");
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        assert_eq!(resolve("data"), "/lain/app/data");
        assert_eq!(resolve("/data"), "/data");
        assert_eq!(resolve("a/../b"), "/lain/app/b");
        assert_eq!(resolve(" data "), "/lain/app/data");
    }

    #[test]
    fn test_volume_allowed() {
        assert!(!volume_allowed("/"));
        assert!(!volume_allowed("/lain"));
        assert!(!volume_allowed("/lain/app"));
        assert!(volume_allowed("/lain/app/data"));
        assert!(volume_allowed("/data"));
    }

    #[test]
    fn test_app_domain_reverses_segments() {
        assert_eq!(app_domain("hello"), "hello");
        assert_eq!(app_domain("portal.dev"), "dev.portal");
        assert_eq!(app_domain("a.b.c"), "c.b.a");
    }
}
