//! A flat list of compiled glob patterns used to exclude paths from the
//! watched tree entirely (never even inserted as ghosts).
//!
//! Simpler than the teacher's `GitignoreParser`: the CLI contract (§6) only
//! exposes a repeatable `--ignore` glob flag, not `.gitignore`-file
//! discovery, so this module skips the per-directory rule-file walk and
//! negation handling and just compiles the given patterns once up front,
//! reusing the teacher's `Glob::new(...).compile_matcher()` call.

use globset::{Glob, GlobMatcher};
use std::path::Path;

pub struct IgnoreList {
    matchers: Vec<GlobMatcher>,
}

impl IgnoreList {
    pub fn new(patterns: &[String]) -> Self {
        let matchers = patterns
            .iter()
            .filter_map(|pattern| Glob::new(pattern).ok())
            .map(|g| g.compile_matcher())
            .collect();
        Self { matchers }
    }

    /// `true` if `rel_path` (or its file name) matches any ignore pattern.
    /// A directory match suppresses the whole subtree; callers are expected
    /// to skip recursion below an ignored directory.
    pub fn is_ignored(&self, rel_path: &Path) -> bool {
        let name = rel_path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        let rel = rel_path.to_string_lossy().replace('\\', "/");

        self.matchers
            .iter()
            .any(|m| m.is_match(name) || m.is_match(&rel))
    }
}
