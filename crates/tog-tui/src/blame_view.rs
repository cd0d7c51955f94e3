//! The Blame View and its background annotation thread (spec §4.8).
//!
//! The annotation algorithm itself is grounded on the teacher's
//! `git-cli` `blame` command (`commands/blame.rs`'s `blame_file`): walk
//! commits oldest-reachable-first is wrong, so instead — as that
//! function does — walk from the blamed commit backwards via `RevWalk`,
//! diffing each commit's file content against its first parent with
//! `tog_diff::algorithm::diff_edits`, and attribute any line that
//! changed (or, at a root commit, every line still unattributed) to
//! that commit. Unlike the teacher's one-shot CLI output, this runs on
//! a background thread that reports progress through the spec's
//! `(lineno, commit, id)` callback protocol so the view can render
//! partial results while annotation continues.

use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

use tog_diff::algorithm::{diff_edits, EditOp};
use tog_hash::ObjectId;
use tog_object::Object;
use tog_repo::{CommitGraph, Repository, RevWalk};

use crate::color::Style;
use crate::error::TuiError;
use crate::screen::{Region, Screen};
use crate::view::{Key, ViewInputResult};

#[derive(Clone, Copy)]
pub struct LineSlot {
    pub annotated: bool,
    pub id: Option<ObjectId>,
}

struct AnnotatorShared {
    lines: Vec<LineSlot>,
    done: bool,
    blame_complete: bool,
    error: Option<TuiError>,
}

struct Annotator {
    shared: Arc<Mutex<AnnotatorShared>>,
    progress: Arc<Condvar>,
    handle: Option<JoinHandle<()>>,
}

impl Annotator {
    fn spawn(repo: Arc<Repository>, commit: ObjectId, path: String, line_count: usize) -> Self {
        let shared = Arc::new(Mutex::new(AnnotatorShared {
            lines: vec![LineSlot { annotated: false, id: None }; line_count],
            done: false,
            blame_complete: false,
            error: None,
        }));
        let progress = Arc::new(Condvar::new());
        let thread_shared = shared.clone();
        let thread_progress = progress.clone();

        let handle = std::thread::spawn(move || {
            let result = run_blame(&repo, commit, &path, &thread_shared);
            let mut guard = thread_shared.lock().unwrap();
            if let Err(e) = result {
                if !matches!(e, TuiError::Cancelled) {
                    guard.error = Some(e);
                }
            }
            guard.blame_complete = true;
            thread_progress.notify_all();
        });

        Self { shared, progress, handle: Some(handle) }
    }

    fn cancel(&mut self) {
        {
            let mut guard = self.shared.lock().unwrap();
            guard.done = true;
        }
        self.progress.notify_all();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Annotator {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Walk history from `commit`, diffing each against its first parent
/// and attributing changed lines, calling `(lineno, commit, id)` for
/// each — spec §4.8's external-blamer protocol, with the cancellation
/// flag under `shared`'s mutex checked between commits.
fn run_blame(
    repo: &Repository,
    commit: ObjectId,
    path: &str,
    shared: &Arc<Mutex<AnnotatorShared>>,
) -> Result<(), TuiError> {
    let mut walker = RevWalk::new(repo);
    walker.push(commit)?;

    loop {
        {
            let guard = shared.lock().unwrap();
            if guard.done {
                return Err(TuiError::Cancelled);
            }
            if guard.lines.iter().all(|l| l.annotated) {
                return Ok(());
            }
        }
        let Some(oid) = walker.next()? else { return Ok(()) };
        let c = repo.read_commit(&oid)?;

        let current = read_file_lines(repo, &oid, path).unwrap_or_default();
        let parent_lines = match c.first_parent() {
            Some(p) => read_file_lines(repo, &p, path).unwrap_or_default(),
            None => Vec::new(),
        };

        let changed = changed_line_indices(&parent_lines, &current);
        let is_root = c.first_parent().is_none();

        let mut guard = shared.lock().unwrap();
        for idx in 0..guard.lines.len().min(current.len()) {
            let lineno = (idx + 1) as i64;
            if lineno < 1 {
                continue;
            }
            let should_annotate = changed.contains(&idx) || is_root;
            if should_annotate && !guard.lines[idx].annotated {
                annotate(&mut guard, lineno, oid)?;
            }
        }
        drop(guard);
    }
}

fn annotate(guard: &mut AnnotatorShared, lineno: i64, commit: ObjectId) -> Result<(), TuiError> {
    if lineno == -1 {
        return Ok(());
    }
    let idx = (lineno - 1) as usize;
    let Some(slot) = guard.lines.get_mut(idx) else {
        return Err(TuiError::Range(lineno));
    };
    if !slot.annotated {
        slot.id = Some(commit);
        slot.annotated = true;
    }
    Ok(())
}

fn read_file_lines(repo: &Repository, commit: &ObjectId, path: &str) -> Result<Vec<Vec<u8>>, TuiError> {
    let c = repo.read_commit(commit)?;
    let Some((oid, _)) = repo.resolve_path(&c.tree, path)? else {
        return Ok(Vec::new());
    };
    let handle = repo.odb().open_object(&oid)?;
    match repo.odb().extract(&handle)? {
        Object::Blob(blob) => Ok(blob.lines().into_iter().map(|l| l.to_vec()).collect()),
        _ => Ok(Vec::new()),
    }
}

fn changed_line_indices(parent: &[Vec<u8>], current: &[Vec<u8>]) -> std::collections::HashSet<usize> {
    if parent.is_empty() {
        return (0..current.len()).collect();
    }
    let old_bytes: Vec<u8> = parent.concat();
    let new_bytes: Vec<u8> = current.concat();
    let edits = diff_edits(&old_bytes, &new_bytes, false);
    let mut changed: std::collections::HashSet<usize> = (0..current.len()).collect();
    for edit in &edits {
        if edit.op == EditOp::Equal {
            changed.remove(&edit.new_index);
        }
    }
    changed
}

/// One entry in the stack of commits a blame view has drilled into
/// (spec §4.8: "stack of 'blamed commits' (head is the current one)").
struct BlamedCommit {
    commit: ObjectId,
    path: String,
}

pub struct BlameView {
    repo: Arc<Repository>,
    stack: Vec<BlamedCommit>,
    content: Vec<Vec<u8>>,
    annotator: Annotator,
    selected: usize,
    first_displayed: usize,
    window_rows: u16,
}

impl BlameView {
    pub fn open(repo: Arc<Repository>, commit: ObjectId, path: String) -> Result<Self, TuiError> {
        let content = read_file_lines(&repo, &commit, &path)?;
        let annotator = Annotator::spawn(repo.clone(), commit, path.clone(), content.len());
        Ok(Self {
            repo,
            stack: vec![BlamedCommit { commit, path }],
            content,
            annotator,
            selected: 0,
            first_displayed: 0,
            window_rows: 24,
        })
    }

    fn current(&self) -> &BlamedCommit {
        self.stack.last().unwrap()
    }

    fn reopen(&mut self, commit: ObjectId, path: String) -> Result<(), TuiError> {
        self.annotator.cancel();
        self.content = read_file_lines(&self.repo, &commit, &path)?;
        self.annotator = Annotator::spawn(self.repo.clone(), commit, path.clone(), self.content.len());
        self.selected = 0;
        self.first_displayed = 0;
        Ok(())
    }

    fn selected_line_commit(&self) -> Option<ObjectId> {
        let guard = self.annotator.shared.lock().unwrap();
        guard.lines.get(self.selected).and_then(|l| l.id)
    }

    pub fn show(&mut self, screen: &mut dyn Screen, region: Region) {
        self.window_rows = region.height.saturating_sub(2);
        screen.clear(region);
        screen.write(region, 0, 0, &self.current().commit.to_hex(), Style::NORMAL);

        let guard = self.annotator.shared.lock().unwrap();
        let annotated_count = guard.lines.iter().filter(|l| l.annotated).count();
        let status = format!(
            "[{}/{}] {}/{} annotated {}",
            self.selected + 1,
            self.content.len(),
            annotated_count,
            guard.lines.len(),
            self.current().path
        );
        screen.write(region, 1, 0, &status, Style::NORMAL);

        let mut prev_id: Option<ObjectId> = None;
        for (row, line) in self
            .content
            .iter()
            .enumerate()
            .skip(self.first_displayed)
            .take(self.window_rows as usize)
        {
            let display_row = (row - self.first_displayed) as u16 + 2;
            let slot = guard.lines.get(row);
            let prefix = match slot {
                Some(s) if s.annotated => {
                    if s.id == prev_id {
                        "        ".to_string()
                    } else {
                        prev_id = s.id;
                        s.id.map(|i| i.to_hex()[..8].to_string()).unwrap_or_default()
                    }
                }
                _ => "........".to_string(),
            };
            let text = String::from_utf8_lossy(line);
            let text = text.trim_end_matches('\n');
            let style = if row == self.selected { Style::inverted() } else { Style::NORMAL };
            screen.write(region, display_row, 0, &format!("{prefix} {text}"), style);
        }
    }

    pub fn input(&mut self, key: Key, count: Option<u32>) -> Result<ViewInputResult, TuiError> {
        let n = count.unwrap_or(1).max(1) as usize;
        match key {
            Key::Char('q') => Ok(ViewInputResult::Close),
            Key::Down => {
                self.selected = (self.selected + n).min(self.content.len().saturating_sub(1));
                Ok(ViewInputResult::Handled)
            }
            Key::Up => {
                self.selected = self.selected.saturating_sub(n);
                Ok(ViewInputResult::Handled)
            }
            Key::Char('c') | Key::Enter => {
                let Some(commit) = self.selected_line_commit() else { return Ok(ViewInputResult::Handled) };
                let c = self.repo.read_commit(&commit)?;
                let diff = crate::diff_view::DiffView::new(
                    self.repo.clone(),
                    Arc::new(crate::color::ColorConfig::from_env()),
                    crate::diff_view::DiffSide { label: "a".into(), oid: c.first_parent() },
                    crate::diff_view::DiffSide { label: "b".into(), oid: Some(commit) },
                    None,
                )?;
                Ok(ViewInputResult::Open(crate::view::ViewKind::Diff(diff)))
            }
            Key::Char('p') => {
                let Some(commit_oid) = self.selected_line_commit() else { return Ok(ViewInputResult::Handled) };
                let c = self.repo.read_commit(&commit_oid)?;
                let Some(parent) = c.first_parent() else { return Ok(ViewInputResult::Handled) };
                let path = self.current().path.clone();
                if self.repo.resolve_path(&self.repo.read_commit(&parent)?.tree, &path)?.is_none() {
                    return Ok(ViewInputResult::Handled);
                }
                self.stack.push(BlamedCommit { commit: parent, path: path.clone() });
                self.reopen(parent, path)?;
                Ok(ViewInputResult::Handled)
            }
            Key::Char('C') => {
                if self.stack.len() > 1 {
                    self.stack.pop();
                    let commit = self.current().commit;
                    let path = self.current().path.clone();
                    self.reopen(commit, path)?;
                }
                Ok(ViewInputResult::Handled)
            }
            _ => Ok(ViewInputResult::Handled),
        }
    }

    pub fn close(&mut self) {
        self.annotator.cancel();
    }
}
