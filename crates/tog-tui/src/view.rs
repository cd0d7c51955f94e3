//! Parent/child view tree, focus management, numeric-prefix input, and
//! the dispatch loop — spec §4.5's View Manager.
//!
//! The tagged-variant dispatch DESIGN NOTES §9 recommends ("Function-
//! pointer view dispatch maps cleanly to a tagged variant with an
//! explicit method per variant, avoiding dynamic dispatch unless
//! convenient") is `ViewKind`'s `show`/`input`/`close`/`search_start`/
//! `search_next` match arms below. The tree itself is an arena
//! (`ViewId` indices into a map) rather than `Rc<RefCell<_>>` nodes —
//! DESIGN NOTES §9's "weak handle by identifier" guidance for the
//! diff↔log back-reference generalizes naturally to every parent/child
//! edge here, and sidesteps a literal doubly-linked structure Rust
//! ownership can't express directly.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::blame_view::BlameView;
use crate::diff_view::DiffView;
use crate::error::TuiError;
use crate::log_view::LogView;
use crate::ref_view::RefView;
use crate::screen::{Region, Screen};
use crate::search::SearchDirection;
use crate::tree_view::TreeView;

/// Every keystroke the dispatch loop recognizes. Digits are split out so
/// the numeric-prefix accumulator (spec §4.5) can intercept them before
/// a view ever sees them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Digit(u8),
    Enter,
    Backspace,
    Tab,
    FKey,
    PageUp,
    PageDown,
    Home,
    End,
    Up,
    Down,
    CtrlU,
    CtrlD,
    CtrlL,
}

/// What the view tree should do after a keystroke's been dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    /// The focused view wants to close (`q`).
    CloseFocused,
    /// Global quit (`Q`).
    QuitAll,
}

/// The minimum terminal width spec §4.5 requires for split layout.
pub const MIN_SPLIT_WIDTH: u16 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Split,
    FullScreen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(u64);

/// The five per-variant operations spec §4.5 calls "vtable-like",
/// realized as a flat match over one tagged enum instead of dynamic
/// dispatch.
pub enum ViewKind {
    Log(LogView),
    Diff(DiffView),
    Blame(BlameView),
    Tree(TreeView),
    Ref(RefView),
}

impl ViewKind {
    fn show(&mut self, screen: &mut dyn Screen, region: Region) {
        match self {
            ViewKind::Log(v) => v.show(screen, region),
            ViewKind::Diff(v) => v.show(screen, region),
            ViewKind::Blame(v) => v.show(screen, region),
            ViewKind::Tree(v) => v.show(screen, region),
            ViewKind::Ref(v) => v.show(screen, region),
        }
    }

    fn input(&mut self, key: Key, count: Option<u32>) -> Result<ViewInputResult, TuiError> {
        match self {
            ViewKind::Log(v) => v.input(key, count),
            ViewKind::Diff(v) => v.input(key, count),
            ViewKind::Blame(v) => v.input(key, count),
            ViewKind::Tree(v) => v.input(key, count),
            ViewKind::Ref(v) => v.input(key, count),
        }
    }

    fn close(&mut self) {
        match self {
            ViewKind::Log(v) => v.close(),
            ViewKind::Diff(v) => v.close(),
            ViewKind::Blame(v) => v.close(),
            ViewKind::Tree(v) => v.close(),
            ViewKind::Ref(v) => v.close(),
        }
    }

    fn search_start(&mut self, pattern: &str, dir: SearchDirection) -> Result<(), TuiError> {
        match self {
            ViewKind::Log(v) => v.search_start(pattern, dir),
            ViewKind::Diff(v) => v.search_start(pattern, dir),
            ViewKind::Blame(_) => Ok(()),
            ViewKind::Tree(v) => v.search_start(pattern, dir),
            ViewKind::Ref(v) => v.search_start(pattern, dir),
        }
    }

    fn search_next(&mut self) {
        match self {
            ViewKind::Log(v) => v.search_next(),
            ViewKind::Diff(v) => v.search_next(),
            ViewKind::Blame(_) => {}
            ViewKind::Tree(v) => v.search_next(),
            ViewKind::Ref(v) => v.search_next(),
        }
    }
}

/// What a view's own `input` wants the manager to do next: nothing
/// special, open a new child/promote-to-parent, or request to close.
pub enum ViewInputResult {
    Handled,
    Open(ViewKind),
    Close,
}

struct Node {
    view: ViewKind,
    parent: Option<ViewId>,
    child: Option<ViewId>,
    /// Sticky bit: which child to re-focus when focus returns to this
    /// parent (spec §4.5: "a 'focus_child' sticky bit remembers which
    /// child should be re-focused").
    focus_child: bool,
    layout: Layout,
}

/// Numeric-prefix accumulator (spec §4.5): digits 1-9 enter
/// count-accumulation mode with a 0.5s inter-key timeout; the result is
/// capped at 9,999,999 and applied to the next non-digit command.
pub struct NumericPrefix {
    value: u32,
    last_digit_at: Option<Instant>,
}

const PREFIX_TIMEOUT: Duration = Duration::from_millis(500);
const PREFIX_CAP: u32 = 9_999_999;

impl NumericPrefix {
    pub fn new() -> Self {
        Self { value: 0, last_digit_at: None }
    }

    pub fn push_digit(&mut self, digit: u8, now: Instant) {
        if let Some(last) = self.last_digit_at {
            if now.duration_since(last) > PREFIX_TIMEOUT {
                self.value = 0;
            }
        }
        self.value = (self.value.saturating_mul(10) + digit as u32).min(PREFIX_CAP);
        self.last_digit_at = Some(now);
    }

    /// Consume the accumulated count (`None` if nothing was accumulated,
    /// or the timeout elapsed before the next non-digit key).
    pub fn take(&mut self, now: Instant) -> Option<u32> {
        let expired = self.last_digit_at.is_some_and(|last| now.duration_since(last) > PREFIX_TIMEOUT);
        let value = if self.value == 0 || expired { None } else { Some(self.value) };
        self.value = 0;
        self.last_digit_at = None;
        value
    }
}

impl Default for NumericPrefix {
    fn default() -> Self {
        Self::new()
    }
}

/// The parent/child view tree plus focus, layout, and numeric-prefix
/// state — spec §4.5's View Manager.
pub struct ViewManager {
    nodes: HashMap<ViewId, Node>,
    /// Parent views in opening order, oldest first (spec §3: "parents
    /// form a sequence (oldest first)").
    parents: Vec<ViewId>,
    focused: Option<ViewId>,
    next_id: u64,
    prefix: NumericPrefix,
    term_size: (u16, u16),
}

impl ViewManager {
    pub fn new(term_size: (u16, u16)) -> Self {
        Self {
            nodes: HashMap::new(),
            parents: Vec::new(),
            focused: None,
            next_id: 0,
            prefix: NumericPrefix::new(),
            term_size,
        }
    }

    fn alloc_id(&mut self) -> ViewId {
        let id = ViewId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Open `view` as a new top-level parent, focused immediately —
    /// the entry point for the very first view (e.g. `tog log`).
    pub fn open_parent(&mut self, view: ViewKind) -> ViewId {
        let id = self.alloc_id();
        self.nodes.insert(
            id,
            Node { view, parent: None, child: None, focus_child: false, layout: Layout::FullScreen },
        );
        self.parents.push(id);
        self.focused = Some(id);
        id
    }

    /// Open `view` as a child of `from` (spec §4.5): "Opening a new view
    /// from a *parent* replaces its child; opening from a *child*
    /// promotes the new view to a parent and appends it to the parent
    /// list."
    pub fn open_from(&mut self, from: ViewId, view: ViewKind) -> ViewId {
        let from_is_parent = self.nodes.get(&from).is_some_and(|n| n.parent.is_none());
        if from_is_parent {
            let id = self.alloc_id();
            self.nodes.insert(
                id,
                Node { view, parent: Some(from), child: None, focus_child: false, layout: Layout::Split },
            );
            if let Some(node) = self.nodes.get_mut(&from) {
                node.child = Some(id);
                node.focus_child = true;
            }
            self.focused = Some(id);
            id
        } else {
            self.open_parent(view)
        }
    }

    pub fn focused(&self) -> Option<ViewId> {
        self.focused
    }

    pub fn view_mut(&mut self, id: ViewId) -> Option<&mut ViewKind> {
        self.nodes.get_mut(&id).map(|n| &mut n.view)
    }

    pub fn view(&self, id: ViewId) -> Option<&ViewKind> {
        self.nodes.get(&id).map(|n| &n.view)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// `Tab`: swap focus between a parent and its child, if a child
    /// exists; otherwise a no-op.
    pub fn toggle_focus(&mut self) {
        let Some(focused) = self.focused else { return };
        let Some(node) = self.nodes.get(&focused) else { return };
        if let Some(parent) = node.parent {
            self.focused = Some(parent);
        } else if let Some(child) = node.child {
            self.focused = Some(child);
        }
    }

    /// `F`: toggle split/full-screen layout for the focused parent (or
    /// its parent, if a child is focused). Split requires `cols >=
    /// MIN_SPLIT_WIDTH`.
    pub fn toggle_layout(&mut self) -> Result<(), TuiError> {
        let Some(focused) = self.focused else { return Ok(()) };
        let parent_id = match self.nodes.get(&focused) {
            Some(n) if n.parent.is_none() => focused,
            Some(n) => n.parent.unwrap(),
            None => return Ok(()),
        };
        let node = self.nodes.get_mut(&parent_id).unwrap();
        let next = match node.layout {
            Layout::Split => Layout::FullScreen,
            Layout::FullScreen => Layout::Split,
        };
        if next == Layout::Split && self.term_size.0 < MIN_SPLIT_WIDTH {
            return Err(TuiError::TooNarrowForSplit(self.term_size.0));
        }
        node.layout = next;
        Ok(())
    }

    /// Split column per spec §4.5: `cols − max(cols/2, 80)`.
    pub fn split_column(cols: u16) -> u16 {
        cols.saturating_sub((cols / 2).max(80))
    }

    pub fn resize(&mut self, term_size: (u16, u16)) {
        self.term_size = term_size;
    }

    /// Render every focused-and-visible view, parent first then its
    /// child (spec §4.5: "render focused views from back to front
    /// (parent first, then its child)").
    pub fn show(&mut self, screen: &mut dyn Screen) {
        let (cols, rows) = self.term_size;
        for &parent_id in &self.parents {
            let node = self.nodes.get(&parent_id).unwrap();
            let has_child = node.child.is_some();
            let region = if has_child && node.layout == Layout::Split && cols >= MIN_SPLIT_WIDTH {
                Region { row: 0, col: 0, width: Self::split_column(cols), height: rows }
            } else {
                Region { row: 0, col: 0, width: cols, height: rows }
            };
            if !(has_child && node.layout == Layout::FullScreen) {
                self.nodes.get_mut(&parent_id).unwrap().view.show(screen, region);
            }
            if let Some(child_id) = node.child {
                let child_region = if node.layout == Layout::Split && cols >= MIN_SPLIT_WIDTH {
                    Region { row: 0, col: Self::split_column(cols), width: cols - Self::split_column(cols), height: rows }
                } else {
                    Region { row: 0, col: 0, width: cols, height: rows }
                };
                self.nodes.get_mut(&child_id).unwrap().view.show(screen, child_region);
            }
        }
        screen.refresh();
    }

    /// Dispatch one keystroke to the focused view, applying the
    /// accumulated numeric prefix (if any) first.
    pub fn dispatch(&mut self, key: Key, now: Instant) -> Result<Outcome, TuiError> {
        if let Key::Digit(d) = key {
            self.prefix.push_digit(d, now);
            return Ok(Outcome::Continue);
        }
        let count = self.prefix.take(now);

        if key == Key::Char('Q') {
            return Ok(Outcome::QuitAll);
        }
        if key == Key::Tab {
            self.toggle_focus();
            return Ok(Outcome::Continue);
        }
        if key == Key::FKey {
            self.toggle_layout()?;
            return Ok(Outcome::Continue);
        }
        if let Key::Char(c @ ('<' | '>' | ',' | '.')) = key {
            let delta = if matches!(c, '<' | ',') { -1 } else { 1 };
            if self.navigate_linked_diff(delta)? {
                return Ok(Outcome::Continue);
            }
        }

        let Some(focused) = self.focused else { return Ok(Outcome::Continue) };
        let node = self.nodes.get_mut(&focused).unwrap();
        let result = node.view.input(key, count)?;

        match result {
            ViewInputResult::Handled => Ok(Outcome::Continue),
            ViewInputResult::Open(view) => {
                self.open_from(focused, view);
                Ok(Outcome::Continue)
            }
            ViewInputResult::Close => Ok(Outcome::CloseFocused),
        }
    }

    /// Close the focused view (spec §4.5: "after input handling it is
    /// closed and the focus picker chooses: its previous parent sibling
    /// if it was a parent, else its parent").
    pub fn close_focused(&mut self) {
        let Some(focused) = self.focused else { return };
        let Some(mut node) = self.nodes.remove(&focused) else { return };
        node.view.close();

        if let Some(parent_id) = node.parent {
            if let Some(parent) = self.nodes.get_mut(&parent_id) {
                parent.child = None;
            }
            self.focused = Some(parent_id);
        } else {
            let idx = self.parents.iter().position(|&id| id == focused);
            self.parents.retain(|&id| id != focused);
            let fallback = idx
                .and_then(|i| i.checked_sub(1))
                .and_then(|i| self.parents.get(i))
                .or_else(|| self.parents.last());
            self.focused = fallback.copied();
        }
    }

    /// `<`/`>` (`,`/`.`): if the focused view is a Diff opened from a Log
    /// view, step that Log view's selection by `delta` and re-diff the
    /// new commit against its first parent (spec §4.7). Returns `false`
    /// (a no-op) when the focused view isn't a linked Diff, so the caller
    /// can fall back to treating the key as a normal view command.
    fn navigate_linked_diff(&mut self, delta: i64) -> Result<bool, TuiError> {
        let Some(focused) = self.focused else { return Ok(false) };
        let log_link = match self.nodes.get(&focused) {
            Some(node) => match &node.view {
                ViewKind::Diff(d) => d.log_link(),
                _ => return Ok(false),
            },
            None => return Ok(false),
        };
        let Some(log_id) = log_link else { return Ok(false) };

        let commit = match self.nodes.get_mut(&log_id) {
            Some(node) => match &mut node.view {
                ViewKind::Log(l) => l.advance_selection(delta),
                _ => None,
            },
            None => None,
        };
        let Some(commit) = commit else { return Ok(false) };

        if let Some(node) = self.nodes.get_mut(&focused) {
            if let ViewKind::Diff(d) = &mut node.view {
                d.retarget(commit)?;
            }
        }
        Ok(true)
    }

    pub fn start_search(&mut self, pattern: &str, dir: SearchDirection) -> Result<(), TuiError> {
        let Some(focused) = self.focused else { return Ok(()) };
        self.nodes.get_mut(&focused).unwrap().view.search_start(pattern, dir)
    }

    pub fn search_next(&mut self) {
        let Some(focused) = self.focused else { return };
        self.nodes.get_mut(&focused).unwrap().view.search_next();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ref_view::RefView;

    fn dummy_ref_view() -> ViewKind {
        ViewKind::Ref(RefView::empty())
    }

    mod diff_navigation {
        use super::*;
        use crate::diff_view::{DiffSide, DiffView};
        use crate::log_view::LogView;
        use flate2::write::ZlibEncoder;
        use flate2::Compression;
        use std::io::Write;
        use std::sync::Arc;
        use tog_hash::ObjectId;
        use tog_repo::Repository;

        fn write_loose(objects_dir: &std::path::Path, kind: &str, content: &[u8]) -> ObjectId {
            let id = tog_hash::hasher::hash_object(kind, content);
            let mut raw = Vec::new();
            raw.extend_from_slice(kind.as_bytes());
            raw.push(b' ');
            raw.extend_from_slice(content.len().to_string().as_bytes());
            raw.push(0);
            raw.extend_from_slice(content);
            let mut compressed = Vec::new();
            {
                let mut enc = ZlibEncoder::new(&mut compressed, Compression::default());
                enc.write_all(&raw).unwrap();
                enc.finish().unwrap();
            }
            let path = objects_dir.join(id.loose_path());
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, &compressed).unwrap();
            id
        }

        fn tree_with_file(objects_dir: &std::path::Path, blob: &ObjectId) -> ObjectId {
            let mut content = Vec::new();
            content.extend_from_slice(b"100644 file.txt\0");
            content.extend_from_slice(blob.as_bytes());
            write_loose(objects_dir, "tree", &content)
        }

        fn commit(
            objects_dir: &std::path::Path,
            tree: &ObjectId,
            parents: &[ObjectId],
            date: i64,
        ) -> ObjectId {
            let mut buf = Vec::new();
            buf.extend_from_slice(format!("tree {}\n", tree.to_hex()).as_bytes());
            for p in parents {
                buf.extend_from_slice(format!("parent {}\n", p.to_hex()).as_bytes());
            }
            buf.extend_from_slice(format!("author A <a@b.c> {date} +0000\n").as_bytes());
            buf.extend_from_slice(format!("committer A <a@b.c> {date} +0000\n").as_bytes());
            buf.extend_from_slice(b"\nmsg\n");
            write_loose(objects_dir, "commit", &buf)
        }

        /// A diff linked to a Log view advances the Log view's selection
        /// and re-targets itself to the newly selected commit when the
        /// focused view receives `>` (spec §4.7).
        #[test]
        fn greater_than_advances_linked_log_and_retargets_diff() {
            let dir = tempfile::tempdir().unwrap();
            let git_dir = dir.path().join(".got");
            let objects_dir = git_dir.join("objects");
            std::fs::create_dir_all(&objects_dir).unwrap();

            let blob1 = write_loose(&objects_dir, "blob", b"one\n");
            let blob2 = write_loose(&objects_dir, "blob", b"two\n");
            let tree1 = tree_with_file(&objects_dir, &blob1);
            let tree2 = tree_with_file(&objects_dir, &blob2);
            let root_commit = commit(&objects_dir, &tree1, &[], 100);
            let child_commit = commit(&objects_dir, &tree2, &[root_commit], 200);

            let repo = Arc::new(Repository::open(&git_dir, None).unwrap());

            let mut mgr = ViewManager::new((200, 50));
            let log = LogView::open_at(repo.clone(), child_commit);
            let log_id = mgr.open_parent(ViewKind::Log(log));

            let colors = Arc::new(crate::color::ColorConfig::from_env());
            let diff = DiffView::new(
                repo.clone(),
                colors,
                DiffSide { label: "a".into(), oid: Some(root_commit) },
                DiffSide { label: "b".into(), oid: Some(child_commit) },
                Some(log_id),
            )
            .unwrap();
            assert_eq!(diff.new_oid(), Some(child_commit));
            let diff_id = mgr.open_from(log_id, ViewKind::Diff(diff));
            mgr.focused = Some(diff_id);

            // The loader thread populates entries asynchronously; retry
            // the navigation dispatch until it has caught up.
            for _ in 0..200 {
                mgr.dispatch(Key::Char('>'), Instant::now()).unwrap();
                let ViewKind::Diff(diff) = mgr.view(diff_id).unwrap() else { panic!("expected diff view") };
                if diff.new_oid() == Some(root_commit) {
                    return;
                }
                std::thread::sleep(std::time::Duration::from_millis(10));
            }
            panic!("diff view never retargeted to the root commit");
        }
    }

    #[test]
    fn opening_from_parent_replaces_its_child() {
        let mut mgr = ViewManager::new((200, 50));
        let parent = mgr.open_parent(dummy_ref_view());
        let child1 = mgr.open_from(parent, dummy_ref_view());
        let child2 = mgr.open_from(parent, dummy_ref_view());
        assert_eq!(mgr.nodes.get(&parent).unwrap().child, Some(child2));
        assert_ne!(child1, child2);
    }

    #[test]
    fn opening_from_a_child_promotes_to_a_new_parent() {
        let mut mgr = ViewManager::new((200, 50));
        let parent = mgr.open_parent(dummy_ref_view());
        let child = mgr.open_from(parent, dummy_ref_view());
        let grandchild_turned_parent = mgr.open_from(child, dummy_ref_view());
        assert!(mgr.nodes.get(&grandchild_turned_parent).unwrap().parent.is_none());
        assert_eq!(mgr.parents.len(), 2);
    }

    #[test]
    fn tab_swaps_focus_between_parent_and_child() {
        let mut mgr = ViewManager::new((200, 50));
        let parent = mgr.open_parent(dummy_ref_view());
        let child = mgr.open_from(parent, dummy_ref_view());
        assert_eq!(mgr.focused(), Some(child));
        mgr.toggle_focus();
        assert_eq!(mgr.focused(), Some(parent));
        mgr.toggle_focus();
        assert_eq!(mgr.focused(), Some(child));
    }

    #[test]
    fn split_requires_minimum_width() {
        let mut mgr = ViewManager::new((100, 50));
        let parent = mgr.open_parent(dummy_ref_view());
        mgr.open_from(parent, dummy_ref_view());
        mgr.focused = Some(parent);
        assert!(mgr.toggle_layout().is_err());
    }

    #[test]
    fn split_column_matches_spec_formula() {
        assert_eq!(ViewManager::split_column(200), 100);
        assert_eq!(ViewManager::split_column(120), 40);
    }

    #[test]
    fn numeric_prefix_accumulates_and_caps() {
        let mut prefix = NumericPrefix::new();
        let t0 = Instant::now();
        prefix.push_digit(2, t0);
        prefix.push_digit(5, t0);
        assert_eq!(prefix.take(t0), Some(25));
    }

    #[test]
    fn numeric_prefix_resets_after_timeout() {
        let mut prefix = NumericPrefix::new();
        let t0 = Instant::now();
        prefix.push_digit(9, t0);
        let later = t0 + Duration::from_millis(600);
        assert_eq!(prefix.take(later), None);
    }

    #[test]
    fn closing_a_child_returns_focus_to_its_parent() {
        let mut mgr = ViewManager::new((200, 50));
        let parent = mgr.open_parent(dummy_ref_view());
        mgr.open_from(parent, dummy_ref_view());
        mgr.close_focused();
        assert_eq!(mgr.focused(), Some(parent));
        assert!(mgr.nodes.get(&parent).unwrap().child.is_none());
    }
}
