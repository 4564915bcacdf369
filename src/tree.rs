//! In-memory, ghost-aware directory tree. Owns every tracked path, the
//! recent-change history, and the deleted-but-fading "ghost" table.
//!
//! All mutation happens through [`TreeState::set_node`] and
//! [`TreeState::remove_node`], driven by normalized filesystem events; the
//! orchestrator (`app.rs`) is the only caller and runs on a single task, so
//! no internal locking is needed (§5 of the design).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::heat;

/// One entry per tracked path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    File,
    Directory,
}

/// The last event applied to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Add,
    AddDir,
    Change,
    Unlink,
    UnlinkDir,
    /// Modeled for completeness (spec §9 Open Questions) -- not produced by
    /// the `notify`/`notify-debouncer-mini` event source used here, but the
    /// heat and layout weighing both handle it.
    Rename,
    /// A parent whose only activity is that a descendant changed.
    ChildChange,
    None,
}

/// A single tracked filesystem entry.
#[derive(Debug, Clone)]
pub struct Node {
    pub path: PathBuf,
    pub name: String,
    pub kind: NodeKind,
    /// Ordered mapping from child name to child path; order is not semantic
    /// (layout sorts at render time). A `BTreeMap` gives deterministic
    /// iteration for tests without implying display order.
    pub children: BTreeMap<String, PathBuf>,
    pub event_kind: EventKind,
    pub event_time: Option<u64>,
    pub heat: f64,
    pub ghost: bool,
    pub ghost_step: u32,
}

impl Node {
    fn new(path: PathBuf, name: String, kind: NodeKind) -> Self {
        Self {
            path,
            name,
            kind,
            children: BTreeMap::new(),
            event_kind: EventKind::None,
            event_time: None,
            heat: 0.0,
            ghost: false,
            ghost_step: 0,
        }
    }
}

struct GhostEntry {
    death_time: u64,
    fade_step: u32,
}

/// Owns the node graph for one watched root.
pub struct TreeState {
    pub root_path: PathBuf,
    index: std::collections::HashMap<PathBuf, Node>,
    /// Most-recently-changed paths first, capped at `history_limit`.
    history: Vec<PathBuf>,
    history_limit: usize,
    ghost_steps: u32,
    ghosts: std::collections::HashMap<PathBuf, GhostEntry>,
}

impl TreeState {
    pub fn new(root_path: PathBuf, history_limit: usize, ghost_steps: u32) -> Self {
        let root_name = root_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| root_path.display().to_string());

        let mut index = std::collections::HashMap::new();
        index.insert(
            root_path.clone(),
            Node::new(root_path.clone(), root_name, NodeKind::Directory),
        );

        Self {
            root_path,
            index,
            history: Vec::new(),
            history_limit,
            ghost_steps,
            ghosts: std::collections::HashMap::new(),
        }
    }

    pub fn get(&self, path: &Path) -> Option<&Node> {
        self.index.get(path)
    }

    pub fn root(&self) -> &Node {
        self.index
            .get(&self.root_path)
            .expect("root node always present")
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn ghost_count(&self) -> usize {
        self.ghosts.len()
    }

    pub fn history(&self) -> &[PathBuf] {
        &self.history
    }

    pub fn is_in_history(&self, path: &Path) -> bool {
        self.history.iter().any(|p| p == path)
    }

    /// Clear the applied event state on every node and empty `history`, so
    /// the initial inventory seeded via `set_node(.., EventKind::None, ..)`
    /// isn't displayed as activity (orchestrator startup, §4.5).
    pub fn clear_all_events(&mut self) {
        for node in self.index.values_mut() {
            node.event_kind = EventKind::None;
            node.event_time = None;
        }
        self.history.clear();
    }

    // ------------------------------------------------------------------
    // Ancestor helpers (path arithmetic only, no back-pointers -- §9)
    // ------------------------------------------------------------------

    /// Ancestors of `path` from its immediate parent up to and including the
    /// root, provided `path` lies under the root.
    fn ancestors_of<'a>(&self, path: &'a Path) -> Vec<PathBuf> {
        let mut out = Vec::new();
        let mut current = path;
        while let Some(parent) = current.parent() {
            out.push(parent.to_path_buf());
            if parent == self.root_path {
                break;
            }
            if !parent.starts_with(&self.root_path) {
                break;
            }
            current = parent;
        }
        out
    }

    /// Ensure every ancestor directory between `path` and the root exists
    /// as a (no-event) directory node, creating any that are missing.
    fn ensure_parents(&mut self, path: &Path) {
        let ancestors = self.ancestors_of(path);
        for parent in ancestors.into_iter().rev() {
            if self.index.contains_key(&parent) {
                continue;
            }
            let name = parent
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| parent.display().to_string());
            self.index
                .insert(parent.clone(), Node::new(parent.clone(), name, NodeKind::Directory));
            self.link_child(&parent);
        }
    }

    /// Register `path` as a child of its immediate parent, if the parent is
    /// tracked.
    fn link_child(&mut self, path: &Path) {
        let Some(parent) = path.parent().map(|p| p.to_path_buf()) else {
            return;
        };
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().to_string()) else {
            return;
        };
        if let Some(parent_node) = self.index.get_mut(&parent) {
            parent_node.children.insert(name, path.to_path_buf());
        }
    }

    // ------------------------------------------------------------------
    // Mutation API
    // ------------------------------------------------------------------

    /// Apply an add/change event at `path`, creating any missing ancestor
    /// directories, updating history, and lighting up parents.
    pub fn set_node(&mut self, path: &Path, kind: NodeKind, event_kind: EventKind, now: u64) {
        if path != self.root_path {
            self.ensure_parents(path);
        }

        let is_new = !self.index.contains_key(path);
        if is_new {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string());
            self.index
                .insert(path.to_path_buf(), Node::new(path.to_path_buf(), name, kind));
            if path != self.root_path {
                self.link_child(path);
            }
        }

        if let Some(node) = self.index.get_mut(path) {
            node.kind = kind;
            node.event_kind = event_kind;
            node.event_time = Some(now);
            node.ghost = false;
            node.ghost_step = 0;
        }

        self.ghosts.remove(path);
        self.push_history(path.to_path_buf());
        self.propagate_to_parents(path, now);
    }

    /// Mark `path` and its descendants as ghosts following a delete event.
    /// The node is not yet detached from `index` or its parent's children --
    /// that happens after `ghost_steps` calls to [`Self::advance_ghosts`].
    pub fn remove_node(&mut self, path: &Path, event_kind: EventKind, now: u64) {
        debug_assert!(matches!(event_kind, EventKind::Unlink | EventKind::UnlinkDir));

        if !self.index.contains_key(path) {
            return;
        }

        let descendants = self.descendants_of(path);

        for p in std::iter::once(path.to_path_buf()).chain(descendants) {
            if let Some(node) = self.index.get_mut(&p) {
                node.ghost = true;
                node.ghost_step = 0;
            }
        }

        if let Some(node) = self.index.get_mut(path) {
            node.event_kind = event_kind;
            node.event_time = Some(now);
        }

        self.ghosts.insert(
            path.to_path_buf(),
            GhostEntry {
                death_time: now,
                fade_step: 0,
            },
        );

        self.push_history(path.to_path_buf());
        self.propagate_to_parents(path, now);
    }

    /// All descendants of `path` (not including `path` itself), via a
    /// breadth-first walk of the children maps.
    fn descendants_of(&self, path: &Path) -> Vec<PathBuf> {
        let mut out = Vec::new();
        let mut stack = Vec::new();
        if let Some(node) = self.index.get(path) {
            stack.extend(node.children.values().cloned());
        }
        while let Some(p) = stack.pop() {
            out.push(p.clone());
            if let Some(node) = self.index.get(&p) {
                stack.extend(node.children.values().cloned());
            }
        }
        out
    }

    /// Advance every fading ghost by one tick, finalizing (fully detaching)
    /// any that have reached `ghost_steps`. Returns `true` if anything was
    /// finalized.
    pub fn advance_ghosts(&mut self) -> bool {
        let mut finalized_any = false;
        let mut to_finalize = Vec::new();

        for (path, entry) in self.ghosts.iter_mut() {
            entry.fade_step += 1;
            if let Some(node) = self.index.get_mut(path) {
                node.ghost_step = entry.fade_step;
            }
            if entry.fade_step >= self.ghost_steps {
                to_finalize.push(path.clone());
            }
        }

        for path in to_finalize {
            self.fully_remove_node(&path);
            finalized_any = true;
        }

        finalized_any
    }

    /// Detach `path` and its ghost-marked descendants from the tree
    /// entirely: removed from `index`, its parent's children, `history`,
    /// and `ghosts`.
    fn fully_remove_node(&mut self, path: &Path) {
        let descendants = self.descendants_of(path);

        if let Some(parent) = path.parent() {
            if let Some(parent_node) = self.index.get_mut(parent) {
                if let Some(name) = path.file_name().map(|n| n.to_string_lossy().to_string()) {
                    parent_node.children.remove(&name);
                }
            }
        }

        for p in std::iter::once(path.to_path_buf()).chain(descendants) {
            self.index.remove(&p);
            self.ghosts.remove(&p);
            self.history.retain(|h| h != &p);
        }
    }

    /// Walk parents up to and including the root, lighting up any that are
    /// cold or stale so activity under them is visible without stomping a
    /// parent's own direct event.
    fn propagate_to_parents(&mut self, path: &Path, now: u64) {
        if path == self.root_path {
            return;
        }
        for parent in self.ancestors_of(path) {
            let Some(node) = self.index.get_mut(&parent) else {
                continue;
            };
            let stale = match node.event_time {
                None => true,
                Some(t) => now.saturating_sub(t) > 100,
            };
            if stale {
                node.event_time = Some(now);
            }
            if node.event_kind == EventKind::None || node.event_kind == EventKind::ChildChange {
                node.event_kind = EventKind::ChildChange;
            }
        }
    }

    fn push_history(&mut self, path: PathBuf) {
        self.history.retain(|p| p != &path);
        self.history.insert(0, path);
        self.history.truncate(self.history_limit);
    }

    // ------------------------------------------------------------------
    // Heat computation
    // ------------------------------------------------------------------

    /// Recompute `heat` for every node via a post-order traversal, folding
    /// child heats upward through directories and boosting freshly-deleted
    /// ghosts so they remain visible through their fadeout.
    pub fn calculate_all_heat(&mut self, now: u64) {
        let root = self.root_path.clone();
        self.calculate_heat_recursive(&root, now);
    }

    fn calculate_heat_recursive(&mut self, path: &Path, now: u64) -> f64 {
        let children: Vec<PathBuf> = self
            .index
            .get(path)
            .map(|n| n.children.values().cloned().collect())
            .unwrap_or_default();

        let mut child_heats = Vec::with_capacity(children.len());
        for child in &children {
            child_heats.push(self.calculate_heat_recursive(child, now));
        }

        let Some(node) = self.index.get(path) else {
            return 0.0;
        };

        let own_heat = heat::heat(node.event_kind, node.event_time, now);
        let mut final_heat = if node.kind == NodeKind::Directory {
            heat::dir_heat(&child_heats, own_heat)
        } else {
            own_heat
        };

        if node.ghost && node.ghost_step < self.ghost_steps {
            let ghost_floor = 90.0 - 25.0 * node.ghost_step as f64;
            final_heat = final_heat.max(ghost_floor);
        }
        final_heat = final_heat.clamp(0.0, heat::MAX_HEAT);

        if let Some(node) = self.index.get_mut(path) {
            node.heat = final_heat;
        }

        final_heat
    }

    /// `true` iff any live node is hot, or any ghost is still fading.
    pub fn has_hot_items(&self) -> bool {
        if !self.ghosts.is_empty() {
            return true;
        }
        self.index.values().any(|n| heat::is_hot(n.heat))
    }

    /// Recursive count of descendants of `dir` whose heat is hot.
    pub fn change_count(&self, dir: &Path) -> usize {
        let mut count = 0;
        let mut stack: Vec<PathBuf> = self
            .index
            .get(dir)
            .map(|n| n.children.values().cloned().collect())
            .unwrap_or_default();

        while let Some(p) = stack.pop() {
            if let Some(n) = self.index.get(&p) {
                if heat::is_hot(n.heat) {
                    count += 1;
                }
                stack.extend(n.children.values().cloned());
            }
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> PathBuf {
        PathBuf::from("/root")
    }

    #[test]
    fn set_node_creates_missing_ancestors() {
        let mut tree = TreeState::new(root(), 4, 3);
        tree.set_node(
            &root().join("a/b/c.txt"),
            NodeKind::File,
            EventKind::Add,
            0,
        );

        assert!(tree.get(&root().join("a")).is_some());
        assert!(tree.get(&root().join("a/b")).is_some());
        assert!(tree.get(&root().join("a/b/c.txt")).is_some());
        assert_eq!(tree.get(&root().join("a")).unwrap().kind, NodeKind::Directory);
    }

    #[test]
    fn set_node_pushes_history_deduped() {
        let mut tree = TreeState::new(root(), 2, 3);
        tree.set_node(&root().join("a.txt"), NodeKind::File, EventKind::Add, 0);
        tree.set_node(&root().join("b.txt"), NodeKind::File, EventKind::Add, 1);
        tree.set_node(&root().join("a.txt"), NodeKind::File, EventKind::Change, 2);

        assert_eq!(tree.history().len(), 2);
        assert_eq!(tree.history()[0], root().join("a.txt"));
        assert_eq!(tree.history()[1], root().join("b.txt"));
    }

    #[test]
    fn history_bound_never_exceeds_limit() {
        // Property 5.
        let mut tree = TreeState::new(root(), 3, 3);
        for i in 0..10 {
            tree.set_node(
                &root().join(format!("f{i}.txt")),
                NodeKind::File,
                EventKind::Add,
                i,
            );
            assert!(tree.history().len() <= 3);
        }
        let mut seen = std::collections::HashSet::new();
        for p in tree.history() {
            assert!(seen.insert(p.clone()), "duplicate path in history");
        }
    }

    #[test]
    fn ghost_lifecycle_full_cycle() {
        // Property 4 / Scenario S2.
        let mut tree = TreeState::new(root(), 4, 3);
        let path = root().join("a.txt");
        tree.set_node(&path, NodeKind::File, EventKind::Change, 0);
        tree.remove_node(&path, EventKind::Unlink, 100);

        assert!(tree.get(&path).unwrap().ghost);
        assert_eq!(tree.ghost_count(), 1);

        tree.advance_ghosts();
        assert!(tree.get(&path).is_some());
        tree.advance_ghosts();
        assert!(tree.get(&path).is_some());
        let finalized = tree.advance_ghosts();

        assert!(finalized);
        assert!(tree.get(&path).is_none());
        assert!(!tree.is_in_history(&path));
        assert_eq!(tree.ghost_count(), 0);
    }

    #[test]
    fn remove_node_marks_descendants_as_ghosts() {
        let mut tree = TreeState::new(root(), 4, 3);
        tree.set_node(&root().join("d/a.txt"), NodeKind::File, EventKind::Add, 0);
        tree.set_node(&root().join("d/b.txt"), NodeKind::File, EventKind::Add, 0);
        tree.remove_node(&root().join("d"), EventKind::UnlinkDir, 10);

        assert!(tree.get(&root().join("d")).unwrap().ghost);
        assert!(tree.get(&root().join("d/a.txt")).unwrap().ghost);
        assert!(tree.get(&root().join("d/b.txt")).unwrap().ghost);
    }

    #[test]
    fn calculate_all_heat_propagates_upward() {
        let mut tree = TreeState::new(root(), 4, 3);
        tree.set_node(&root().join("a.txt"), NodeKind::File, EventKind::Change, 0);
        tree.calculate_all_heat(0);

        let leaf_heat = tree.get(&root().join("a.txt")).unwrap().heat;
        let root_heat = tree.root().heat;
        assert_eq!(leaf_heat, 60.0);
        assert_eq!(root_heat, 66.0);
    }

    #[test]
    fn ghost_boost_keeps_deleted_node_visible() {
        let mut tree = TreeState::new(root(), 4, 3);
        tree.set_node(&root().join("a.txt"), NodeKind::File, EventKind::Change, 0);
        tree.remove_node(&root().join("a.txt"), EventKind::Unlink, 0);
        tree.calculate_all_heat(0);

        let h = tree.get(&root().join("a.txt")).unwrap().heat;
        assert!(h >= 90.0);
    }

    #[test]
    fn propagate_to_parents_does_not_overwrite_fresh_direct_event() {
        let mut tree = TreeState::new(root(), 4, 3);
        // Parent dir gets its own direct event at t=50.
        tree.set_node(&root().join("d"), NodeKind::Directory, EventKind::AddDir, 50);
        // A child changes later at t=60 -- within the 100ms staleness window.
        tree.set_node(&root().join("d/a.txt"), NodeKind::File, EventKind::Change, 60);

        let dir = tree.get(&root().join("d")).unwrap();
        assert_eq!(dir.event_kind, EventKind::AddDir);
        assert_eq!(dir.event_time, Some(50));
    }

    #[test]
    fn root_always_present() {
        // Property 7 (tree-level half).
        let tree = TreeState::new(root(), 4, 3);
        assert!(tree.get(&root()).is_some());
    }

    #[test]
    fn clear_all_events_zeroes_heat_and_history() {
        let mut tree = TreeState::new(root(), 4, 3);
        tree.set_node(&root().join("a.txt"), NodeKind::File, EventKind::Add, 0);
        tree.clear_all_events();
        tree.calculate_all_heat(0);

        assert_eq!(tree.get(&root().join("a.txt")).unwrap().heat, 0.0);
        assert!(tree.history().is_empty());
    }

    #[test]
    fn change_count_counts_hot_descendants_only() {
        let mut tree = TreeState::new(root(), 4, 3);
        // cold.txt's event happened long enough ago to have decayed below
        // the hot threshold by the time we observe it.
        tree.set_node(&root().join("cold.txt"), NodeKind::File, EventKind::Change, 0);
        tree.set_node(&root().join("hot.txt"), NodeKind::File, EventKind::Change, 100_000);
        tree.calculate_all_heat(100_000);

        assert_eq!(tree.change_count(&root()), 1);
    }
}
