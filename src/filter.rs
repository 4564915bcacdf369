//! Turns a filter pattern string into a predicate over a node's name and its
//! path relative to the watched root.
//!
//! Grounded on the glob-compilation pattern in the teacher's gitignore
//! parser (`Glob::new(...).compile_matcher()`), reused here for the
//! `**`-as-any-depth glob semantics the filter needs.

use globset::{Glob, GlobBuilder};

/// How a node matched the active filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Glob,
    Text,
}

fn is_glob_pattern(pattern: &str) -> bool {
    pattern.contains('*') || pattern.contains('?')
}

fn compile_glob(pattern: &str) -> Option<globset::GlobMatcher> {
    GlobBuilder::new(pattern)
        .literal_separator(false)
        .case_insensitive(true)
        .build()
        .ok()
        .map(|g| g.compile_matcher())
        .or_else(|| Glob::new(pattern).ok().map(|g| g.compile_matcher()))
}

/// Evaluate `pattern` against a node's `name` and its `rel_path` (path
/// relative to the watched root, forward-slash separated, no leading `/`).
///
/// Returns `None` for no match. Ancestors of a match are never themselves
/// considered matches here -- the layout engine draws them anyway because
/// they're needed to position the match, but they don't carry the filter
/// weight bonus.
pub fn match_pattern(pattern: &str, name: &str, rel_path: &str) -> Option<MatchKind> {
    if pattern.is_empty() {
        return None;
    }

    let glob = is_glob_pattern(pattern);

    if let Some(rest) = pattern.strip_prefix('/') {
        return match_rooted(rest, glob, rel_path);
    }
    if pattern.contains('/') {
        return match_rooted(pattern, glob, rel_path);
    }

    if glob {
        let matcher = compile_glob(pattern)?;
        if matcher.is_match(name.to_lowercase()) {
            Some(MatchKind::Glob)
        } else {
            None
        }
    } else if name.to_lowercase().contains(&pattern.to_lowercase()) {
        Some(MatchKind::Text)
    } else {
        None
    }
}

fn match_rooted(cleaned: &str, glob: bool, rel_path: &str) -> Option<MatchKind> {
    if glob {
        let matcher = compile_glob(cleaned)?;
        if matcher.is_match(rel_path.to_lowercase()) {
            Some(MatchKind::Glob)
        } else {
            None
        }
    } else if !cleaned.contains('/') {
        // Exact (case-insensitive) match against the relative path only --
        // matches the directory/file itself, not its children.
        if cleaned.eq_ignore_ascii_case(rel_path) {
            Some(MatchKind::Text)
        } else {
            None
        }
    } else if rel_path.to_lowercase().contains(&cleaned.to_lowercase()) {
        Some(MatchKind::Text)
    } else {
        None
    }
}
