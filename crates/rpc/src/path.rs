//! Path-string marshaling for the worker's file tree.
//!
//! Paths are absolute and `/`-separated. A trailing separator marks a
//! directory path but carries no meaning beyond that; `/a/b` and `/a/b/`
//! address the same entry.

/// Path separator.
pub const SEPARATOR: char = '/';

/// Root directory path.
pub const ROOT: &str = "/";

/// Splits a path into its non-empty segments.
///
/// Returns `None` for relative paths and for paths containing `.` or `..`
/// segments.
pub fn segments(path: &str) -> Option<Vec<&str>> {
	if !path.starts_with(SEPARATOR) {
		return None;
	}
	let mut out = Vec::new();
	for segment in path.split(SEPARATOR).filter(|s| !s.is_empty()) {
		if segment == "." || segment == ".." {
			return None;
		}
		out.push(segment);
	}
	Some(out)
}

/// Canonical form without a trailing separator (except for the root).
pub fn normalize(path: &str) -> Option<String> {
	let segments = segments(path)?;
	Some(from_segments(&segments))
}

/// Builds an absolute path from segments.
pub fn from_segments(segments: &[&str]) -> String {
	let mut out = String::with_capacity(segments.iter().map(|s| s.len() + 1).sum::<usize>().max(1));
	for segment in segments {
		out.push(SEPARATOR);
		out.push_str(segment);
	}
	if out.is_empty() {
		out.push(SEPARATOR);
	}
	out
}

/// Appends one leaf name to a directory path.
pub fn join(dir: &str, name: &str) -> String {
	let name = name.trim_matches(SEPARATOR);
	let dir = dir.trim_end_matches(SEPARATOR);
	format!("{dir}{SEPARATOR}{name}")
}

/// Parent directory of `path`; `None` for the root.
pub fn parent(path: &str) -> Option<String> {
	let segments = segments(path)?;
	let (_, head) = segments.split_last()?;
	Some(from_segments(head))
}

/// Whether `path` equals `ancestor` or lies below it.
pub fn is_within(path: &str, ancestor: &str) -> bool {
	match (segments(path), segments(ancestor)) {
		(Some(path), Some(ancestor)) => path.starts_with(&ancestor),
		_ => false,
	}
}

/// Whether `name` is usable as a single path segment.
pub fn is_valid_name(name: &str) -> bool {
	!name.is_empty() && name != "." && name != ".." && !name.contains(SEPARATOR)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn normalizes_trailing_separator() {
		assert_eq!(normalize("/docs/").as_deref(), Some("/docs"));
		assert_eq!(normalize("/docs//a").as_deref(), Some("/docs/a"));
		assert_eq!(normalize("/").as_deref(), Some("/"));
		assert_eq!(normalize("docs"), None);
		assert_eq!(normalize("/docs/../etc"), None);
	}

	#[test]
	fn join_and_parent() {
		assert_eq!(join("/", "a.mdm"), "/a.mdm");
		assert_eq!(join("/docs/", "a.mdm"), "/docs/a.mdm");
		assert_eq!(parent("/docs/a.mdm").as_deref(), Some("/docs"));
		assert_eq!(parent("/a.mdm").as_deref(), Some("/"));
		assert_eq!(parent("/"), None);
	}

	#[test]
	fn containment() {
		assert!(is_within("/a/b/c", "/a/b"));
		assert!(is_within("/a/b", "/a/b/"));
		assert!(!is_within("/a/bc", "/a/b"));
		assert!(is_within("/anything", "/"));
	}

	#[test]
	fn names() {
		assert!(is_valid_name("main.mdm"));
		assert!(!is_valid_name(""));
		assert!(!is_valid_name(".."));
		assert!(!is_valid_name("a/b"));
	}
}
