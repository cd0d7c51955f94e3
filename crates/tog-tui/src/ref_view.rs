//! The Ref View (spec §4.9): a sortable list of branch/tag/backup refs.
//!
//! Grounded on `tog_repo::RefStore::iter_heads_and_tags`, which already
//! applies the `refs/got/**` exclusion (keeping only `refs/got/backup/**`)
//! spec §4.9 restates for this view.

use std::sync::Arc;

use tog_hash::ObjectId;
use tog_object::Object;
use tog_repo::{Reference, Repository};

use crate::color::{ColorSlot, Style};
use crate::error::TuiError;
use crate::screen::{Region, Screen};
use crate::search::{Search, SearchDirection};
use crate::view::{Key, ViewInputResult, ViewKind};

#[derive(Clone, Copy, PartialEq, Eq)]
enum SortMode {
    Name,
    DateDescending,
}

struct RefEntry {
    name: String,
    target_commit: ObjectId,
    timestamp: i64,
    is_backup: bool,
}

pub struct RefView {
    repo: Option<Arc<Repository>>,
    entries: Vec<RefEntry>,
    sort: SortMode,
    show_date: bool,
    show_id: bool,
    selected: usize,
    first_displayed: usize,
    search: Search,
    window_rows: u16,
}

impl RefView {
    pub fn open(repo: Arc<Repository>) -> Result<Self, TuiError> {
        let refs = repo.refs().iter_heads_and_tags()?;
        let mut entries = Vec::with_capacity(refs.len());
        for r in &refs {
            let Some(oid) = resolve_target(&repo, r)? else { continue };
            let commit = repo.peel_to_commit(oid)?;
            let c = repo.read_commit(&commit)?;
            entries.push(RefEntry {
                name: r.name().to_string(),
                target_commit: commit,
                timestamp: c.committer.timestamp,
                is_backup: r.name().as_str().starts_with("refs/got/backup/"),
            });
        }
        let mut view = Self {
            repo: Some(repo),
            entries,
            sort: SortMode::Name,
            show_date: false,
            show_id: false,
            selected: 0,
            first_displayed: 0,
            search: Search::new(),
            window_rows: 24,
        };
        view.resort();
        Ok(view)
    }

    /// An empty view with no backing repository, used only as a
    /// placeholder in `ViewManager` unit tests.
    pub fn empty() -> Self {
        Self {
            repo: None,
            entries: Vec::new(),
            sort: SortMode::Name,
            show_date: false,
            show_id: false,
            selected: 0,
            first_displayed: 0,
            search: Search::new(),
            window_rows: 24,
        }
    }

    fn resort(&mut self) {
        match self.sort {
            SortMode::Name => {
                self.entries.sort_by(|a, b| match (a.is_backup, b.is_backup) {
                    (false, true) => std::cmp::Ordering::Less,
                    (true, false) => std::cmp::Ordering::Greater,
                    _ => a.name.cmp(&b.name),
                });
            }
            SortMode::DateDescending => {
                self.entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
            }
        }
    }

    pub fn search_start(&mut self, pattern: &str, dir: SearchDirection) -> Result<(), TuiError> {
        self.search.start(pattern, dir, self.selected)?;
        self.search_next();
        Ok(())
    }

    pub fn search_next(&mut self) {
        let Some(re) = self.search.pattern().cloned() else { return };
        let entries = &self.entries;
        if let Some(idx) = self.search.advance(entries.len(), |i| re.is_match(&entries[i].name)) {
            self.selected = idx;
        }
    }

    pub fn show(&mut self, screen: &mut dyn Screen, region: Region) {
        self.window_rows = region.height;
        screen.clear(region);
        for (row, entry) in self.entries.iter().enumerate().skip(self.first_displayed).take(region.height as usize) {
            let display_row = (row - self.first_displayed) as u16;
            let mut line = String::new();
            if self.show_id {
                line.push_str(&entry.target_commit.to_hex()[..8]);
                line.push(' ');
            }
            if self.show_date {
                line.push_str(&format!("{} ", entry.timestamp));
            }
            line.push_str(&entry.name);
            let style = if row == self.selected {
                Style::inverted()
            } else if entry.is_backup {
                self.backup_style()
            } else {
                Style::NORMAL
            };
            screen.write(region, display_row, 0, &line, style);
        }
    }

    fn backup_style(&self) -> Style {
        // Falls back to the fixed default when opened via `empty()`
        // (no `ColorConfig` is threaded through the test placeholder).
        crate::color::ColorConfig::from_env_with(|_| None, false).style(ColorSlot::RefBackup)
    }

    pub fn input(&mut self, key: Key, count: Option<u32>) -> Result<ViewInputResult, TuiError> {
        let n = count.unwrap_or(1).max(1) as usize;
        match key {
            Key::Char('q') => Ok(ViewInputResult::Close),
            Key::Down => {
                self.selected = (self.selected + n).min(self.entries.len().saturating_sub(1));
                Ok(ViewInputResult::Handled)
            }
            Key::Up => {
                self.selected = self.selected.saturating_sub(n);
                Ok(ViewInputResult::Handled)
            }
            Key::Char('o') => {
                self.sort = match self.sort {
                    SortMode::Name => SortMode::DateDescending,
                    SortMode::DateDescending => SortMode::Name,
                };
                self.resort();
                Ok(ViewInputResult::Handled)
            }
            Key::Char('m') => {
                self.show_date = !self.show_date;
                Ok(ViewInputResult::Handled)
            }
            Key::Char('i') => {
                self.show_id = !self.show_id;
                Ok(ViewInputResult::Handled)
            }
            Key::Enter => {
                let Some(repo) = self.repo.clone() else { return Ok(ViewInputResult::Handled) };
                let Some(entry) = self.entries.get(self.selected) else { return Ok(ViewInputResult::Handled) };
                let log = crate::log_view::LogView::open_at(repo, entry.target_commit);
                Ok(ViewInputResult::Open(ViewKind::Log(log)))
            }
            Key::Char('t') => {
                let Some(repo) = self.repo.clone() else { return Ok(ViewInputResult::Handled) };
                let Some(entry) = self.entries.get(self.selected) else { return Ok(ViewInputResult::Handled) };
                let commit = repo.read_commit(&entry.target_commit)?;
                let tree = crate::tree_view::TreeView::open(
                    repo.clone(),
                    Arc::new(crate::color::ColorConfig::from_env()),
                    entry.target_commit,
                    commit.tree,
                )?;
                Ok(ViewInputResult::Open(ViewKind::Tree(tree)))
            }
            _ => Ok(ViewInputResult::Handled),
        }
    }

    pub fn close(&mut self) {}
}

/// Resolve a ref's target to an object id, dereferencing an annotated
/// tag's `packed-refs` peeled entry if recorded, otherwise leaving tag
/// objects to `Repository::peel_to_commit`.
fn resolve_target(repo: &Repository, r: &Reference) -> Result<Option<ObjectId>, TuiError> {
    let oid = match r {
        Reference::Direct { target, .. } => *target,
        Reference::Symbolic { target, .. } => {
            let Some(oid) = repo.refs().resolve_to_oid(target)? else { return Ok(None) };
            oid
        }
    };
    if let Some(peeled) = repo.refs().packed_peeled(r.name()) {
        return Ok(Some(peeled));
    }
    let handle = repo.odb().open_object(&oid)?;
    match repo.odb().extract(&handle)? {
        Object::Tag(_) | Object::Commit(_) => Ok(Some(oid)),
        _ => Ok(None),
    }
}
