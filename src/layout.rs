//! Flattens the tree into an ordered sequence of candidate lines, weighs
//! each one, and selects the subset that fits the available terminal rows
//! while preserving display order.
//!
//! Grounded on the teacher's `renderer.rs::build_tree`/`render_tree_lines`
//! (directories-before-files, case-insensitive alphabetical tiebreak), but
//! reworked from "recurse straight into ratatui `Line`s" into "flatten to a
//! weighed, reorderable candidate list first" per spec.md §4.4.

use std::path::PathBuf;

use crate::heat;
use crate::filter::{self, MatchKind};
use crate::tree::{EventKind, NodeKind, TreeState};
use crate::vcs::{VcsClass, VcsStatus};

pub const HEADER_ROWS: u16 = 2;
pub const FOOTER_ROWS: u16 = 1;
pub const MIN_ROWS: u16 = 5;

/// Dead-band below which two siblings' heats are treated as equal for
/// ordering purposes, to avoid flicker from tiny heat deltas.
const HEAT_ORDER_DEAD_BAND: f64 = 5.0;

/// The additive weight table from spec.md §4.4, pulled out as plain data
/// (per §9's "weights as first-class configuration") instead of being
/// buried as literals in `weigh`, so a future config-file loader has one
/// place to read from and override.
pub mod weights {
    pub const ROOT: f64 = 10_000.0;

    pub const TYPE_FILE: f64 = 50.0;
    pub const TYPE_DIR: f64 = 100.0;

    pub const VCS_CONFLICT: f64 = 800.0;
    pub const VCS_UNSTAGED: f64 = 700.0;
    pub const VCS_BOTH: f64 = 650.0;
    pub const VCS_STAGED: f64 = 600.0;
    pub const VCS_UNTRACKED: f64 = 500.0;
    pub const VCS_NONE: f64 = 0.0;

    pub const HEAT_HOT: f64 = 350.0;
    pub const HEAT_COLD: f64 = 0.0;

    pub const EVENT_UNLINK: f64 = 150.0;
    pub const EVENT_ADD: f64 = 75.0;
    pub const EVENT_CHANGE: f64 = 50.0;
    pub const EVENT_RENAME: f64 = 25.0;
    pub const EVENT_NONE: f64 = 0.0;

    pub const CONTEXT_HOT_DESCENDANT: f64 = 200.0;
    pub const CONTEXT_IN_HISTORY: f64 = 100.0;
    pub const CONTEXT_GHOST: f64 = 50.0;

    pub const FILTER_MATCH: f64 = 9_000.0;
}

/// One candidate entry produced by the flatten pass, before weighing.
#[derive(Debug, Clone)]
struct Candidate {
    path: PathBuf,
    depth: usize,
    is_last_among_siblings: bool,
    parent_continues: Vec<bool>,
    display_order: usize,
}

/// The presently-defined line kind; reserved for future indicator rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Node,
}

/// One line the renderer can draw, fully self-contained so it needs no live
/// back-reference into the tree.
#[derive(Debug, Clone)]
pub struct LayoutLine {
    pub line_kind: LineKind,
    pub path: PathBuf,
    pub name: String,
    pub kind: NodeKind,
    pub depth: usize,
    pub is_last_among_siblings: bool,
    pub parent_continues: Vec<bool>,
    pub display_order: usize,
    pub weight: f64,
    pub heat: f64,
    pub event_kind: EventKind,
    pub ghost: bool,
    pub vcs_class: Option<VcsClass>,
    pub filter_match: Option<MatchKind>,
    pub change_count: usize,
}

/// The outcome of one layout pass.
pub struct LayoutResult {
    pub lines: Vec<LayoutLine>,
    pub total_rows: usize,
    pub available_rows: usize,
    pub collapsed: bool,
    pub root_path: PathBuf,
}

/// Row budget derived from terminal height, floored to [`MIN_ROWS`].
pub fn available_rows(terminal_rows: u16) -> usize {
    terminal_rows
        .saturating_sub(HEADER_ROWS + FOOTER_ROWS)
        .max(MIN_ROWS) as usize
}

/// Run the full layout pipeline: compute heats, flatten, weigh, select.
pub fn compute_layout(
    tree: &mut TreeState,
    vcs: Option<&VcsStatus>,
    filter_pattern: &str,
    terminal_rows: u16,
    now: u64,
) -> LayoutResult {
    tree.calculate_all_heat(now);

    let root_path = tree.root_path.clone();
    let mut candidates = Vec::new();
    flatten(tree, vcs, &root_path, 0, &mut Vec::new(), true, &mut candidates);

    let total_rows = candidates.len();
    let rows_budget = available_rows(terminal_rows);

    let mut lines: Vec<LayoutLine> = candidates
        .into_iter()
        .map(|c| weigh(tree, vcs, filter_pattern, c))
        .collect();

    let collapsed = lines.len() > rows_budget;
    if collapsed {
        lines.sort_by(|a, b| b.weight.partial_cmp(&a.weight).unwrap());
        lines.truncate(rows_budget);
        lines.sort_by_key(|l| l.display_order);
    }

    LayoutResult {
        lines,
        total_rows,
        available_rows: rows_budget,
        collapsed,
        root_path,
    }
}

/// Preorder-flatten the tree into candidates, ordering children at each
/// directory per spec.md §4.4: directories before files; VCS-status
/// entries before status-less ones (if VCS is present); heat descending
/// (dead-banded); else locale-aware case-insensitive name.
fn flatten(
    tree: &TreeState,
    vcs: Option<&VcsStatus>,
    path: &PathBuf,
    depth: usize,
    parent_continues: &mut Vec<bool>,
    is_last: bool,
    out: &mut Vec<Candidate>,
) {
    let Some(node) = tree.get(path) else {
        return;
    };

    out.push(Candidate {
        path: path.clone(),
        depth,
        is_last_among_siblings: is_last,
        parent_continues: parent_continues.clone(),
        display_order: out.len(),
    });

    if node.kind != NodeKind::Directory || node.children.is_empty() {
        return;
    }

    let mut children: Vec<PathBuf> = node.children.values().cloned().collect();
    children.sort_by(|a, b| compare_siblings(tree, vcs, a, b));

    let count = children.len();
    for (i, child) in children.iter().enumerate() {
        let last = i == count - 1;
        parent_continues.push(!is_last);
        flatten(tree, vcs, child, depth + 1, parent_continues, last, out);
        parent_continues.pop();
    }
}

fn compare_siblings(
    tree: &TreeState,
    vcs: Option<&VcsStatus>,
    a: &PathBuf,
    b: &PathBuf,
) -> std::cmp::Ordering {
    use std::cmp::Ordering;

    let (Some(na), Some(nb)) = (tree.get(a), tree.get(b)) else {
        return Ordering::Equal;
    };

    // 1. Directories before files.
    let dir_rank = |n: &crate::tree::Node| if n.kind == NodeKind::Directory { 0 } else { 1 };
    let by_kind = dir_rank(na).cmp(&dir_rank(nb));
    if by_kind != Ordering::Equal {
        return by_kind;
    }

    // 2. VCS-status-present before status-less, if VCS is active.
    if let Some(vcs) = vcs {
        let has_status = |p: &PathBuf| vcs.status_for(p).is_some();
        let by_status = has_status(b).cmp(&has_status(a));
        if by_status != Ordering::Equal {
            return by_status;
        }
    }

    // 3. Heat descending, dead-banded.
    if (na.heat - nb.heat).abs() > HEAT_ORDER_DEAD_BAND {
        if let Some(ord) = nb.heat.partial_cmp(&na.heat) {
            if ord != Ordering::Equal {
                return ord;
            }
        }
    }

    // 4. Locale-aware (approximated with a simple lowercase fold)
    // case-insensitive name comparison.
    na.name.to_lowercase().cmp(&nb.name.to_lowercase())
}

fn weigh(
    tree: &TreeState,
    vcs: Option<&VcsStatus>,
    filter_pattern: &str,
    candidate: Candidate,
) -> LayoutLine {
    let node = tree.get(&candidate.path).expect("candidate came from tree");

    let rel_path = candidate
        .path
        .strip_prefix(&tree.root_path)
        .unwrap_or(&candidate.path)
        .to_string_lossy()
        .replace('\\', "/");

    let filter_match = filter::match_pattern(filter_pattern, &node.name, &rel_path);
    let vcs_class = vcs.and_then(|v| v.status_for(&candidate.path));
    let change_count = tree.change_count(&candidate.path);
    let has_hot_descendant = change_count > 0;

    let mut weight = 0.0;
    if candidate.depth == 0 {
        weight = weights::ROOT;
    } else {
        weight += match node.kind {
            NodeKind::File => weights::TYPE_FILE,
            NodeKind::Directory => weights::TYPE_DIR,
        };

        weight += match vcs_class {
            Some(VcsClass::Conflict) => weights::VCS_CONFLICT,
            Some(VcsClass::Unstaged) => weights::VCS_UNSTAGED,
            Some(VcsClass::Both) => weights::VCS_BOTH,
            Some(VcsClass::Staged) => weights::VCS_STAGED,
            Some(VcsClass::Untracked) => weights::VCS_UNTRACKED,
            None => weights::VCS_NONE,
        };

        weight += if heat::is_hot(node.heat) {
            weights::HEAT_HOT
        } else {
            weights::HEAT_COLD
        };

        weight += match node.event_kind {
            EventKind::Unlink | EventKind::UnlinkDir => weights::EVENT_UNLINK,
            EventKind::Add | EventKind::AddDir => weights::EVENT_ADD,
            EventKind::Change => weights::EVENT_CHANGE,
            EventKind::Rename => weights::EVENT_RENAME,
            EventKind::ChildChange | EventKind::None => weights::EVENT_NONE,
        };

        if node.kind == NodeKind::Directory && has_hot_descendant {
            weight += weights::CONTEXT_HOT_DESCENDANT;
        }
        if tree.is_in_history(&candidate.path) {
            weight += weights::CONTEXT_IN_HISTORY;
        }
        if node.ghost {
            weight += weights::CONTEXT_GHOST;
        }

        if filter_match.is_some() {
            weight += weights::FILTER_MATCH;
        }

        weight += node.heat;
    }

    LayoutLine {
        line_kind: LineKind::Node,
        path: candidate.path,
        name: node.name.clone(),
        kind: node.kind,
        depth: candidate.depth,
        is_last_among_siblings: candidate.is_last_among_siblings,
        parent_continues: candidate.parent_continues,
        display_order: candidate.display_order,
        weight,
        heat: node.heat,
        event_kind: node.event_kind,
        ghost: node.ghost,
        vcs_class,
        filter_match,
        change_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{EventKind, NodeKind};
    use std::path::PathBuf;

    fn root() -> PathBuf {
        PathBuf::from("/root")
    }

    #[test]
    fn layout_fit_and_display_order_increasing() {
        // Property 6.
        let mut tree = TreeState::new(root(), 10, 3);
        for i in 0..50 {
            tree.set_node(
                &root().join(format!("f{i:02}.txt")),
                NodeKind::File,
                EventKind::None,
                0,
            );
        }
        let result = compute_layout(&mut tree, None, "", 8, 0);

        assert!(result.lines.len() <= available_rows(8));
        let orders: Vec<usize> = result.lines.iter().map(|l| l.display_order).collect();
        for w in orders.windows(2) {
            assert!(w[0] < w[1]);
        }
    }

    #[test]
    fn root_present_when_rows_available() {
        // Property 7.
        let mut tree = TreeState::new(root(), 10, 3);
        tree.set_node(&root().join("a.txt"), NodeKind::File, EventKind::Change, 0);
        let result = compute_layout(&mut tree, None, "", 10, 0);
        assert!(result.lines.iter().any(|l| l.path == root()));
    }

    #[test]
    fn filter_dominance_keeps_match_under_pressure() {
        // Property 8 / Scenario S4.
        let mut tree = TreeState::new(root(), 10, 3);
        for i in 0..50 {
            tree.set_node(
                &root().join(format!("f{i:02}.txt")),
                NodeKind::File,
                EventKind::None,
                0,
            );
        }
        tree.set_node(&root().join("x"), NodeKind::File, EventKind::None, 0);
        let result = compute_layout(&mut tree, None, "x", 8, 0);

        assert!(result.lines.iter().any(|l| l.name == "x"));
    }

    #[test]
    fn ordering_dead_band_preserves_alpha_tiebreak() {
        // Property 9.
        let mut tree = TreeState::new(root(), 10, 3);
        tree.set_node(&root().join("alpha.txt"), NodeKind::File, EventKind::Change, 0);
        tree.set_node(&root().join("beta.txt"), NodeKind::File, EventKind::Change, 1);
        // Heats differ by less than the dead-band window once decayed a
        // touch, so alpha should still sort before beta by name.
        let result = compute_layout(&mut tree, None, "", 10, 1);

        let names: Vec<&str> = result
            .lines
            .iter()
            .filter(|l| l.depth == 1)
            .map(|l| l.name.as_str())
            .collect();
        assert_eq!(names, vec!["alpha.txt", "beta.txt"]);
    }

    #[test]
    fn scenario_s3_space_contention() {
        let mut tree = TreeState::new(root(), 10, 3);
        for i in 0..50 {
            tree.set_node(
                &root().join(format!("c{i:02}.txt")),
                NodeKind::File,
                EventKind::None,
                0,
            );
        }
        tree.set_node(&root().join("x.txt"), NodeKind::File, EventKind::Change, 0);
        let result = compute_layout(&mut tree, None, "", 8, 0);

        assert!(result.collapsed);
        assert_eq!(result.available_rows, 5);
        assert!(result.lines.len() <= 5);
        assert!(result.lines.iter().any(|l| l.path == root()));
        assert!(result.lines.iter().any(|l| l.name == "x.txt"));
    }

    #[test]
    fn scenario_s5_vcs_status_precedes_warmer_status_less_sibling() {
        // b is warmer (more recent change) but has no VCS status; a is
        // untracked. Under VCS sort, status-present beats heat.
        let mut tree = TreeState::new(root(), 10, 3);
        tree.set_node(&root().join("a"), NodeKind::File, EventKind::None, 0);
        tree.set_node(&root().join("b"), NodeKind::File, EventKind::Change, 0);

        let vcs = VcsStatus::from_file_statuses(&[(root().join("a"), VcsClass::Untracked)]);
        let result = compute_layout(&mut tree, Some(&vcs), "", 10, 0);

        let names: Vec<&str> = result
            .lines
            .iter()
            .filter(|l| l.depth == 1)
            .map(|l| l.name.as_str())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn total_rows_reported_before_trim() {
        let mut tree = TreeState::new(root(), 10, 3);
        for i in 0..20 {
            tree.set_node(
                &root().join(format!("c{i:02}.txt")),
                NodeKind::File,
                EventKind::None,
                0,
            );
        }
        let result = compute_layout(&mut tree, None, "", 8, 0);
        assert_eq!(result.total_rows, 21); // root + 20 files
    }
}
