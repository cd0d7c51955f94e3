//! The Log View and its background loader thread (spec §4.6).
//!
//! Grounded on the teacher's `git_revwalk::RevWalk` as the commit source
//! and `git-cli`'s `log` command for rendering conventions (date/author
//! column layout), with the loader itself modeled after spec §5's
//! producer/consumer protocol: a dedicated `Mutex`+two `Condvar`s per
//! view stand in for the single process-wide mutex `M` the spec
//! describes, since this crate exposes independently testable views
//! rather than one singleton application loop (noted in DESIGN.md).

use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

use regex::Regex;
use tog_hash::ObjectId;
use tog_object::Commit;
use tog_repo::{CommitGraph, Repository, RevWalk};

use crate::color::Style;
use crate::error::TuiError;
use crate::screen::{Region, Screen};
use crate::search::{Search, SearchDirection, SearchState};
use crate::view::{Key, ViewInputResult};

/// One loaded commit, in load order.
pub struct CommitEntry {
    pub id: ObjectId,
    pub commit: Commit,
    pub idx: u64,
}

struct LoaderShared {
    entries: Vec<CommitEntry>,
    log_complete: bool,
    commits_needed: i64,
    load_all: bool,
    quit: bool,
}

/// The loader thread's handle plus the state it shares with the UI
/// thread under `shared`'s mutex.
struct Loader {
    shared: Arc<Mutex<LoaderShared>>,
    commit_loaded: Arc<Condvar>,
    need_commits: Arc<Condvar>,
    handle: Option<JoinHandle<()>>,
}

impl Loader {
    /// Spawn the loader thread (spec §4.6 loader protocol). `path_filter`
    /// and `branch_scope` configure the `RevWalk` the thread owns; `start`
    /// pins the walk to a single tip instead of HEAD/all branches (used
    /// when a Log view is opened from a specific ref or commit).
    fn spawn(
        repo: Arc<Repository>,
        path_filter: Option<String>,
        branch_scope: bool,
        start: Option<ObjectId>,
    ) -> Self {
        let shared = Arc::new(Mutex::new(LoaderShared {
            entries: Vec::new(),
            log_complete: false,
            commits_needed: 32,
            load_all: false,
            quit: false,
        }));
        let commit_loaded = Arc::new(Condvar::new());
        let need_commits = Arc::new(Condvar::new());

        let thread_shared = shared.clone();
        let thread_commit_loaded = commit_loaded.clone();
        let thread_need_commits = need_commits.clone();

        let handle = std::thread::spawn(move || {
            let mut walk = RevWalk::new(&repo);
            walk.set_path_filter(path_filter);
            let pushed = match start {
                Some(oid) => walk.push(oid),
                None if branch_scope => walk.push_all_branches(),
                None => walk.push_head(),
            };
            if pushed.is_err() {
                let mut guard = thread_shared.lock().unwrap();
                guard.log_complete = true;
                thread_commit_loaded.notify_all();
                return;
            }

            let mut idx = 0u64;
            loop {
                {
                    let guard = thread_shared.lock().unwrap();
                    if guard.quit {
                        return;
                    }
                }
                let next = walk.next();
                let oid = match next {
                    Ok(Some(oid)) => oid,
                    Ok(None) => {
                        let mut guard = thread_shared.lock().unwrap();
                        guard.log_complete = true;
                        thread_commit_loaded.notify_all();
                        return;
                    }
                    Err(_) => {
                        let mut guard = thread_shared.lock().unwrap();
                        guard.log_complete = true;
                        thread_commit_loaded.notify_all();
                        return;
                    }
                };
                let Ok(commit) = repo.read_commit(&oid) else { continue };

                let mut guard = thread_shared.lock().unwrap();
                if guard.quit {
                    return;
                }
                guard.entries.push(CommitEntry { id: oid, commit, idx });
                idx += 1;
                thread_commit_loaded.notify_all();

                if guard.commits_needed > 0 {
                    guard.commits_needed -= 1;
                } else if !guard.load_all {
                    let _unused = thread_need_commits.wait_while(guard, |g| {
                        g.commits_needed <= 0 && !g.load_all && !g.quit
                    });
                }
            }
        });

        Self { shared, commit_loaded, need_commits, handle: Some(handle) }
    }

    /// Ask the loader for `more` additional commits and wait for at
    /// least one to arrive (or completion).
    fn request_more(&self, more: i64, wait: bool) {
        let mut guard = self.shared.lock().unwrap();
        guard.commits_needed += more;
        self.need_commits.notify_all();
        if wait && !guard.log_complete {
            let _unused = self
                .commit_loaded
                .wait_timeout_while(guard, std::time::Duration::from_millis(200), |g| {
                    g.commits_needed > 0 && !g.log_complete
                });
        }
    }

    fn request_all(&self) {
        let mut guard = self.shared.lock().unwrap();
        guard.load_all = true;
        self.need_commits.notify_all();
        let _unused = self.commit_loaded.wait_while(guard, |g| !g.log_complete);
    }

    fn stop(&mut self) {
        {
            let mut guard = self.shared.lock().unwrap();
            guard.quit = true;
        }
        self.need_commits.notify_all();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Loader {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The Log View: a scrollable window over the loader's commit queue,
/// with a path filter, branch scope, and regex search over
/// author/committer/id/message.
pub struct LogView {
    repo: Arc<Repository>,
    loader: Loader,
    first_displayed: usize,
    selected: usize,
    x_offset: u16,
    path_filter: Option<String>,
    branch_scope: bool,
    start: Option<ObjectId>,
    matched_entry: Option<usize>,
    search: Search,
    window_rows: u16,
    show_ids: bool,
}

impl LogView {
    /// Open a Log view rooted at HEAD (or every branch tip, if
    /// `branch_scope`), optionally filtered to `path_filter`.
    pub fn open(repo: Arc<Repository>, path_filter: Option<String>, branch_scope: bool) -> Self {
        Self::open_from(repo, path_filter, branch_scope, None)
    }

    /// Open a Log view rooted at a single commit — used when opening
    /// from a specific ref (spec §4.9's Ref View `Enter`).
    pub fn open_at(repo: Arc<Repository>, start: ObjectId) -> Self {
        Self::open_from(repo, None, false, Some(start))
    }

    fn open_from(
        repo: Arc<Repository>,
        path_filter: Option<String>,
        branch_scope: bool,
        start: Option<ObjectId>,
    ) -> Self {
        let loader = Loader::spawn(repo.clone(), path_filter.clone(), branch_scope, start);
        loader.request_more(32, false);
        Self {
            repo,
            loader,
            first_displayed: 0,
            selected: 0,
            x_offset: 0,
            path_filter,
            branch_scope,
            start,
            matched_entry: None,
            search: Search::new(),
            window_rows: 24,
            show_ids: false,
        }
    }

    fn entry_count(&self) -> usize {
        self.loader.shared.lock().unwrap().entries.len()
    }

    fn log_complete(&self) -> bool {
        self.loader.shared.lock().unwrap().log_complete
    }

    fn clamp_selection(&mut self) {
        let count = self.entry_count();
        if count == 0 {
            self.selected = 0;
            self.first_displayed = 0;
            return;
        }
        self.selected = self.selected.min(count - 1);
        if self.selected < self.first_displayed {
            self.first_displayed = self.selected;
        }
        let window = self.window_rows.max(1) as usize;
        if self.selected >= self.first_displayed + window {
            self.first_displayed = self.selected + 1 - window;
        }
    }

    fn move_selection(&mut self, delta: i64) {
        let count = self.entry_count();
        if count == 0 {
            return;
        }
        let new = (self.selected as i64 + delta).clamp(0, count as i64 - 1);
        self.selected = new as usize;
        if self.selected >= self.entry_count().saturating_sub(4) && !self.log_complete() {
            self.loader.request_more(32, false);
        }
        self.clamp_selection();
    }

    fn restart(&mut self) {
        self.loader.stop();
        self.start = None;
        self.loader = Loader::spawn(self.repo.clone(), self.path_filter.clone(), self.branch_scope, self.start);
        self.loader.request_more(32, false);
        self.first_displayed = 0;
        self.selected = 0;
        self.matched_entry = None;
        self.search.reset();
    }

    fn pop_path_component(&mut self) {
        if let Some(path) = &self.path_filter {
            let trimmed = match path.rsplit_once('/') {
                Some((head, _)) if !head.is_empty() => Some(head.to_string()),
                _ => None,
            };
            self.path_filter = trimmed;
            self.restart();
        }
    }

    fn matches(entry: &CommitEntry, re: &Regex) -> bool {
        re.is_match(entry.commit.author.name.to_string().as_str())
            || re.is_match(entry.commit.author.email.to_string().as_str())
            || re.is_match(entry.commit.committer.name.to_string().as_str())
            || re.is_match(&entry.id.to_hex())
            || re.is_match(entry.commit.message.to_string().as_str())
    }

    pub fn search_start(&mut self, pattern: &str, dir: SearchDirection) -> Result<(), TuiError> {
        let start = self.matched_entry.unwrap_or(self.selected);
        self.search.start(pattern, dir, start)?;
        self.run_search();
        Ok(())
    }

    pub fn search_next(&mut self) {
        self.run_search();
    }

    fn run_search(&mut self) {
        let Some(re) = self.search.pattern().cloned() else { return };
        loop {
            let count = self.entry_count();
            let found = {
                let guard = self.loader.shared.lock().unwrap();
                let entries = &guard.entries;
                self.search.advance(count, |i| Self::matches(&entries[i], &re))
            };
            if let Some(idx) = found {
                self.matched_entry = Some(idx);
                self.selected = idx;
                self.clamp_selection();
                return;
            }
            if self.search.state() == SearchState::NoMore || self.search.state() == SearchState::HaveNone {
                if self.log_complete() {
                    return;
                }
                self.loader.request_more(1, true);
                continue;
            }
            return;
        }
    }

    pub fn show(&mut self, screen: &mut dyn Screen, region: Region) {
        self.window_rows = region.height.saturating_sub(1);
        screen.clear(region);
        let guard = self.loader.shared.lock().unwrap();
        let entries = &guard.entries;
        let max_author = entries
            .iter()
            .skip(self.first_displayed)
            .take(self.window_rows as usize)
            .map(|e| e.commit.author.name.len())
            .max()
            .unwrap_or(10)
            .min(32);

        for (row, entry) in entries.iter().enumerate().skip(self.first_displayed).take(self.window_rows as usize) {
            let display_row = (row - self.first_displayed) as u16;
            let date = format_date(entry.commit.committer.timestamp);
            let author = truncate(&entry.commit.author.name.to_string(), max_author);
            let message = first_line(&entry.commit.message.to_string());
            let message = expand_tabs(&message);
            let message = horizontal_scroll(&message, self.x_offset as usize);

            let mut line = format!("{date} ");
            if self.show_ids {
                line.push_str(&entry.id.to_hex()[..9.min(entry.id.to_hex().len())]);
                line.push(' ');
            }
            line.push_str(&format!("{author:<width$} ", width = max_author));
            line.push_str(&message);

            let style = if row == self.selected { Style::inverted() } else { Style::NORMAL };
            screen.write(region, display_row, 0, &line, style);
        }
        drop(guard);

        let status = if !self.log_complete() { "loading..." } else { "" };
        screen.write(region, region.height.saturating_sub(1), 0, status, Style::NORMAL);
    }

    pub fn input(&mut self, key: Key, count: Option<u32>) -> Result<ViewInputResult, TuiError> {
        let n = count.unwrap_or(1).max(1) as i64;
        match key {
            Key::Char('q') => Ok(ViewInputResult::Close),
            Key::Up => {
                self.move_selection(-n);
                Ok(ViewInputResult::Handled)
            }
            Key::Down => {
                self.move_selection(n);
                Ok(ViewInputResult::Handled)
            }
            Key::CtrlU | Key::PageUp => {
                let half = (self.window_rows / 2).max(1) as i64;
                self.move_selection(-half);
                Ok(ViewInputResult::Handled)
            }
            Key::CtrlD | Key::PageDown => {
                let half = (self.window_rows / 2).max(1) as i64;
                self.move_selection(half);
                Ok(ViewInputResult::Handled)
            }
            Key::End => {
                self.loader.request_all();
                self.selected = self.entry_count().saturating_sub(1);
                self.clamp_selection();
                Ok(ViewInputResult::Handled)
            }
            Key::Home => {
                self.selected = 0;
                self.first_displayed = 0;
                Ok(ViewInputResult::Handled)
            }
            Key::Backspace => {
                self.pop_path_component();
                Ok(ViewInputResult::Handled)
            }
            Key::CtrlL => {
                self.restart();
                Ok(ViewInputResult::Handled)
            }
            Key::Char('B') => {
                self.branch_scope = !self.branch_scope;
                self.restart();
                Ok(ViewInputResult::Handled)
            }
            Key::Char('i') => {
                self.show_ids = !self.show_ids;
                Ok(ViewInputResult::Handled)
            }
            _ => Ok(ViewInputResult::Handled),
        }
    }

    pub fn close(&mut self) {
        self.loader.stop();
    }

    /// The commit id currently selected, if any (used by a linked Diff
    /// view to advance, spec §4.7's `<`/`>`).
    pub fn selected_commit(&self) -> Option<ObjectId> {
        let guard = self.loader.shared.lock().unwrap();
        guard.entries.get(self.selected).map(|e| e.id)
    }

    pub fn advance_selection(&mut self, delta: i64) -> Option<ObjectId> {
        self.move_selection(delta);
        self.selected_commit()
    }
}

fn format_date(timestamp: i64) -> String {
    let days = timestamp.div_euclid(86_400);
    let secs_of_day = timestamp.rem_euclid(86_400);
    let _ = secs_of_day;
    let (y, m, d) = civil_from_days(days);
    format!("{y:04}-{m:02}-{d:02} ")
}

/// Full date and time, used by the Diff View's `date:` commit-metadata
/// header line (§4.7's `^date: ` color rule).
pub(crate) fn format_datetime(timestamp: i64) -> String {
    let days = timestamp.div_euclid(86_400);
    let secs_of_day = timestamp.rem_euclid(86_400);
    let (y, m, d) = civil_from_days(days);
    let (hh, mm, ss) = (secs_of_day / 3600, (secs_of_day / 60) % 60, secs_of_day % 60);
    format!("{y:04}-{m:02}-{d:02} {hh:02}:{mm:02}:{ss:02}")
}

/// Convert a day count since the Unix epoch to a (year, month, day)
/// civil date, using Howard Hinnant's well-known proleptic Gregorian
/// algorithm.
pub(crate) fn civil_from_days(z: i64) -> (i64, u32, u32) {
    let z = z + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = (z - era * 146_097) as u64;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let m = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    (if m <= 2 { y + 1 } else { y }, m, d)
}

fn first_line(message: &str) -> String {
    message.lines().next().unwrap_or("").to_string()
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() > width {
        s.chars().take(width.saturating_sub(1)).collect::<String>() + "+"
    } else {
        s.to_string()
    }
}

fn expand_tabs(s: &str) -> String {
    let mut out = String::new();
    let mut col = 0;
    for ch in s.chars() {
        if ch == '\t' {
            let spaces = 8 - (col % 8);
            out.push_str(&" ".repeat(spaces));
            col += spaces;
        } else {
            out.push(ch);
            col += 1;
        }
    }
    out
}

fn horizontal_scroll(s: &str, offset: usize) -> String {
    s.chars().skip(offset).collect()
}
