//! VCS status source: shells out to `git status --porcelain` and
//! `git rev-list` the way the teacher's `git.rs` already shells out to `git`
//! for worktree/log queries, and classifies paths the way
//! `other_examples/549ebd4c_bobisme-maw…app.rs.rs::fetch_dirty_files` reads
//! the two status columns.
//!
//! Rate-limited by a 1s TTL cache (§5): [`VcsWatcher::refresh`] is a no-op
//! if the previous snapshot is still fresh, and any subprocess failure
//! leaves the previous snapshot untouched.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

/// Cap on captured subprocess output, so a runaway `git status` on a huge
/// repo can't balloon memory or stall the event loop (§5).
const MAX_CAPTURED_BYTES: usize = 10 * 1024 * 1024;

const REFRESH_TTL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum VcsClass {
    Untracked = 1,
    Staged = 2,
    Both = 3,
    Unstaged = 4,
    Conflict = 5,
}

/// A read-only snapshot of VCS status for the watched tree.
#[derive(Debug, Clone, Default)]
pub struct VcsStatus {
    file_status: HashMap<PathBuf, VcsClass>,
    dir_status: HashMap<PathBuf, VcsClass>,
    pub ahead: u32,
    pub behind: u32,
}

impl VcsStatus {
    pub fn status_for(&self, path: &Path) -> Option<VcsClass> {
        self.file_status
            .get(path)
            .or_else(|| self.dir_status.get(path))
            .copied()
    }

    /// Build a snapshot directly from file statuses, bypassing the
    /// subprocess -- used by other modules' tests that need a `VcsStatus`
    /// without shelling out to `git`.
    #[cfg(test)]
    pub(crate) fn from_file_statuses(entries: &[(PathBuf, VcsClass)]) -> Self {
        Self {
            file_status: entries.iter().cloned().collect(),
            dir_status: HashMap::new(),
            ahead: 0,
            behind: 0,
        }
    }
}

/// Periodically refreshes [`VcsStatus`] for a watched root, rate-limited and
/// failure-tolerant per spec.md §5/§7.
pub struct VcsWatcher {
    root: PathBuf,
    last_refresh: Option<Instant>,
    snapshot: VcsStatus,
    enabled: bool,
}

impl VcsWatcher {
    pub fn new(root: PathBuf, enabled: bool) -> Self {
        Self {
            root,
            last_refresh: None,
            snapshot: VcsStatus::default(),
            enabled,
        }
    }

    pub fn snapshot(&self) -> Option<&VcsStatus> {
        self.enabled.then_some(&self.snapshot)
    }

    /// Refresh the snapshot if the TTL has elapsed. On any failure (missing
    /// `git`, not a repo, oversized output, no upstream) the previous
    /// snapshot is kept and the failure is swallowed (logged upstream by the
    /// caller, per §7).
    pub fn refresh_if_due(&mut self) {
        if !self.enabled {
            return;
        }
        if let Some(last) = self.last_refresh {
            if last.elapsed() < REFRESH_TTL {
                return;
            }
        }
        self.last_refresh = Some(Instant::now());

        if let Some(new_snapshot) = self.query() {
            self.snapshot = new_snapshot;
        }
    }

    fn query(&self) -> Option<VcsStatus> {
        let porcelain = run_capped(&["status", "--porcelain=v1", "--ignore-submodules"], &self.root)?;
        let mut file_status = parse_porcelain(&porcelain);

        // Resolve relative paths to absolute, under the watched root.
        file_status = file_status
            .into_iter()
            .map(|(rel, class)| (self.root.join(rel), class))
            .collect();

        let dir_status = aggregate_dirs(&file_status, &self.root);

        let (ahead, behind) = self.ahead_behind();

        Some(VcsStatus {
            file_status,
            dir_status,
            ahead,
            behind,
        })
    }

    fn ahead_behind(&self) -> (u32, u32) {
        let Some(out) = run_capped(
            &["rev-list", "--left-right", "--count", "HEAD...@{upstream}"],
            &self.root,
        ) else {
            return (0, 0);
        };

        let mut parts = out.split_whitespace();
        let ahead = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0);
        let behind = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0);
        (ahead, behind)
    }
}

/// Run `git <args>` in `cwd`, returning stdout as a capped, lossily-decoded
/// string. Returns `None` on any spawn/exit-status/output-size failure.
fn run_capped(args: &[&str], cwd: &Path) -> Option<String> {
    let output = Command::new("git").args(args).current_dir(cwd).output().ok()?;
    if !output.status.success() {
        return None;
    }
    if output.stdout.len() > MAX_CAPTURED_BYTES {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Parse `git status --porcelain=v1` lines into `(relative_path, class)`
/// pairs, per spec.md §6's classification rules.
fn parse_porcelain(porcelain: &str) -> HashMap<PathBuf, VcsClass> {
    let mut out = HashMap::new();

    for line in porcelain.lines() {
        if line.len() < 4 {
            continue;
        }
        let x = line.as_bytes()[0] as char;
        let y = line.as_bytes()[1] as char;
        let mut rest = &line[3..];

        // Rename format: "old -> new" -- classify only the right-hand path.
        if let Some(idx) = rest.find(" -> ") {
            rest = &rest[idx + 4..];
        }

        let class = classify(x, y);
        if let Some(class) = class {
            out.insert(PathBuf::from(rest), class);
        }
    }

    out
}

fn classify(x: char, y: char) -> Option<VcsClass> {
    if x == 'U' || y == 'U' || (x == 'A' && y == 'A') || (x == 'D' && y == 'D') {
        return Some(VcsClass::Conflict);
    }
    if x == '?' && y == '?' {
        return Some(VcsClass::Untracked);
    }

    let x_set = x != ' ';
    let y_set = y != ' ';

    if x_set && y_set {
        return Some(VcsClass::Both);
    }
    if y_set {
        return Some(VcsClass::Unstaged);
    }
    if x_set {
        return Some(VcsClass::Staged);
    }
    None
}

/// Aggregate file statuses to every ancestor directory under `root`, taking
/// the maximum-priority class across descendants.
fn aggregate_dirs(
    file_status: &HashMap<PathBuf, VcsClass>,
    root: &Path,
) -> HashMap<PathBuf, VcsClass> {
    let mut dirs: HashMap<PathBuf, VcsClass> = HashMap::new();

    for (path, class) in file_status {
        let mut current = path.parent();
        while let Some(dir) = current {
            let entry = dirs.entry(dir.to_path_buf()).or_insert(*class);
            if *class > *entry {
                *entry = *class;
            }
            if dir == root {
                break;
            }
            current = dir.parent();
        }
    }

    dirs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_untracked() {
        assert_eq!(classify('?', '?'), Some(VcsClass::Untracked));
    }

    #[test]
    fn classify_conflict_variants() {
        assert_eq!(classify('U', 'U'), Some(VcsClass::Conflict));
        assert_eq!(classify('A', 'A'), Some(VcsClass::Conflict));
        assert_eq!(classify('D', 'D'), Some(VcsClass::Conflict));
    }

    #[test]
    fn classify_staged_only() {
        assert_eq!(classify('M', ' '), Some(VcsClass::Staged));
    }

    #[test]
    fn classify_unstaged_only() {
        assert_eq!(classify(' ', 'M'), Some(VcsClass::Unstaged));
    }

    #[test]
    fn classify_both() {
        assert_eq!(classify('M', 'M'), Some(VcsClass::Both));
    }

    #[test]
    fn classify_clean_is_none() {
        assert_eq!(classify(' ', ' '), None);
    }

    #[test]
    fn parse_porcelain_rename_uses_right_hand_path() {
        // Scenario S6.
        let input = "R  old.txt -> new.txt\n";
        let parsed = parse_porcelain(input);

        assert_eq!(parsed.get(&PathBuf::from("new.txt")), Some(&VcsClass::Staged));
        assert!(parsed.get(&PathBuf::from("old.txt")).is_none());
    }

    #[test]
    fn parse_porcelain_basic_lines() {
        let input = " M modified.txt\n?? untracked.txt\nA  staged.txt\n";
        let parsed = parse_porcelain(input);

        assert_eq!(
            parsed.get(&PathBuf::from("modified.txt")),
            Some(&VcsClass::Unstaged)
        );
        assert_eq!(
            parsed.get(&PathBuf::from("untracked.txt")),
            Some(&VcsClass::Untracked)
        );
        assert_eq!(parsed.get(&PathBuf::from("staged.txt")), Some(&VcsClass::Staged));
    }

    #[test]
    fn dir_aggregation_takes_max_priority() {
        let root = PathBuf::from("/repo");
        let mut statuses = HashMap::new();
        statuses.insert(root.join("src/a.txt"), VcsClass::Untracked);
        statuses.insert(root.join("src/b.txt"), VcsClass::Conflict);

        let dirs = aggregate_dirs(&statuses, &root);
        assert_eq!(dirs.get(&root.join("src")), Some(&VcsClass::Conflict));
    }

    #[test]
    fn scenario_s5_vcs_precedes_by_status_presence_not_heat() {
        // a is untracked (status present), b has no status but is warmer.
        // The layout module's sibling comparator handles the actual
        // ordering; here we only assert the status lookup itself.
        let mut file_status = HashMap::new();
        file_status.insert(PathBuf::from("/repo/a"), VcsClass::Untracked);
        let status = VcsStatus {
            file_status,
            dir_status: HashMap::new(),
            ahead: 0,
            behind: 0,
        };
        assert!(status.status_for(Path::new("/repo/a")).is_some());
        assert!(status.status_for(Path::new("/repo/b")).is_none());
    }
}
