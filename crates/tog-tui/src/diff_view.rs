//! The Diff View (spec §4.7): renders the unified diff text `tog_diff`
//! produces between two object ids, one of which may be "null" (diffed
//! against `/dev/null`).
//!
//! The diff↔log back-reference is the literal "weak handle by
//! identifier" DESIGN NOTES §9 prescribes: this view stores an opaque
//! [`crate::view::ViewId`] rather than a borrow of the `LogView`, since
//! Rust ownership makes a direct cyclic reference impossible and the
//! view tree is single-rooted (parent owns child) regardless.

use std::collections::BTreeMap;

use regex::Regex;
use tog_hash::ObjectId;
use tog_object::{FileMode, Object, ObjectKind};
use tog_repo::Repository;

use crate::color::{ColorConfig, ColorSlot};
use crate::error::TuiError;
use crate::screen::{Region, Screen};
use crate::search::{Search, SearchDirection};
use crate::view::{Key, ViewId, ViewInputResult};

/// One labeled side of the diff: `None` renders as `/dev/null` (a root
/// commit's parent, or a newly added blob).
#[derive(Clone)]
pub struct DiffSide {
    pub label: String,
    pub oid: Option<ObjectId>,
}

pub struct DiffView {
    repo: std::sync::Arc<Repository>,
    old: DiffSide,
    new: DiffSide,
    text: String,
    line_offsets: Vec<usize>,
    first_displayed: usize,
    context_lines: u32,
    ignore_whitespace: bool,
    force_text: bool,
    rebuilding: bool,
    colors: std::sync::Arc<ColorConfig>,
    search: Search,
    /// Opaque back-link to the Log view that opened this diff, if any
    /// (spec §4.7's `<`/`>` navigation).
    log_link: Option<ViewId>,
    window_rows: u16,
}

impl DiffView {
    pub fn new(
        repo: std::sync::Arc<Repository>,
        colors: std::sync::Arc<ColorConfig>,
        old: DiffSide,
        new: DiffSide,
        log_link: Option<ViewId>,
    ) -> Result<Self, TuiError> {
        let mut view = Self {
            repo,
            old,
            new,
            text: String::new(),
            line_offsets: Vec::new(),
            first_displayed: 0,
            context_lines: 3,
            ignore_whitespace: false,
            force_text: false,
            rebuilding: false,
            colors,
            search: Search::new(),
            log_link,
            window_rows: 24,
        };
        view.rebuild()?;
        Ok(view)
    }

    /// Apply the `-C`/`-w`/`-a` command-line flags before the first
    /// render, rebuilding once with all three in place instead of
    /// replaying the equivalent keystrokes one at a time.
    pub fn set_options(&mut self, context_lines: u32, ignore_whitespace: bool, force_text: bool) -> Result<(), TuiError> {
        self.context_lines = context_lines.min(tog_diff::MAX_CONTEXT);
        self.ignore_whitespace = ignore_whitespace;
        self.force_text = force_text;
        self.rebuild()
    }

    fn blob_bytes(&self, oid: Option<ObjectId>) -> Result<Option<Vec<u8>>, TuiError> {
        let Some(oid) = oid else { return Ok(None) };
        let handle = self.repo.odb().open_object(&oid)?;
        match self.repo.odb().extract(&handle)? {
            Object::Blob(blob) => Ok(Some(blob.as_bytes().to_vec())),
            other => Ok(Some(format!("({} object, not shown)", other.kind().as_str()).into_bytes())),
        }
    }

    fn object_kind(&self, oid: Option<ObjectId>) -> Result<Option<ObjectKind>, TuiError> {
        oid.map(|o| self.repo.object_kind(&o)).transpose().map_err(TuiError::from)
    }

    /// Flatten a tree to `path -> (blob oid, mode)` for every non-directory,
    /// non-submodule entry reachable from it, recursing into sub-trees.
    /// `None` (a root commit's absent parent, or a `/dev/null` side)
    /// flattens to the empty tree.
    fn flatten_tree(&self, root: Option<ObjectId>, prefix: &str, out: &mut BTreeMap<String, (ObjectId, FileMode)>) -> Result<(), TuiError> {
        let Some(root) = root else { return Ok(()) };
        let tree = self.repo.read_tree(&root)?;
        for entry in &tree.entries {
            let name = entry.name.to_string();
            let path = if prefix.is_empty() { name } else { format!("{prefix}/{name}") };
            match entry.mode {
                FileMode::Directory => self.flatten_tree(Some(entry.oid), &path, out)?,
                FileMode::Submodule => {}
                _ => {
                    out.insert(path, (entry.oid, entry.mode));
                }
            }
        }
        Ok(())
    }

    /// Diff two (possibly absent) trees path by path, emitting one
    /// section per changed path: a `<keyword> <path>` header line (§4.7's
    /// `DiffMeta` color rule matches `file`/`tree` at line start), the
    /// blob ids on either side, and the unified diff body.
    fn diff_paths(&self, old_tree: Option<ObjectId>, new_tree: Option<ObjectId>, keyword: &str) -> Result<String, TuiError> {
        let mut old_map = BTreeMap::new();
        self.flatten_tree(old_tree, "", &mut old_map)?;
        let mut new_map = BTreeMap::new();
        self.flatten_tree(new_tree, "", &mut new_map)?;

        let mut paths: Vec<&String> = old_map.keys().chain(new_map.keys()).collect();
        paths.sort();
        paths.dedup();

        let options = tog_diff::DiffOptions {
            context_lines: self.context_lines,
            ignore_whitespace: self.ignore_whitespace,
        };

        let mut out = String::new();
        for path in paths {
            let old_entry = old_map.get(path);
            let new_entry = new_map.get(path);
            if old_entry.map(|(oid, _)| oid) == new_entry.map(|(oid, _)| oid) {
                continue;
            }
            let old_oid = old_entry.map(|(oid, _)| *oid);
            let new_oid = new_entry.map(|(oid, _)| *oid);

            out.push_str(&format!("{keyword} {path}\n"));
            out.push_str(&format!(
                "blob - {}\n",
                old_oid.map(|o| o.to_string()).unwrap_or_else(|| "/dev/null".to_string())
            ));
            out.push_str(&format!(
                "blob + {}\n",
                new_oid.map(|o| o.to_string()).unwrap_or_else(|| "/dev/null".to_string())
            ));

            let old_bytes = self.blob_bytes(old_oid)?;
            let new_bytes = self.blob_bytes(new_oid)?;
            let old_side = tog_diff::Side::new(path, old_bytes.as_deref());
            let new_side = tog_diff::Side::new(path, new_bytes.as_deref());
            let file_diff = tog_diff::diff(old_side, new_side, options)?;
            out.push_str(&file_diff.text);
        }
        Ok(out)
    }

    /// The `commit <id>` / `parent N: <id>` / `from: ` / `date: ` /
    /// `via: ` header a got commit diff carries, grounded on `tog.c`'s
    /// `print_commit_oneline`-style header writer.
    fn commit_header(&self, commit_oid: ObjectId) -> Result<String, TuiError> {
        let commit = self.repo.read_commit(&commit_oid)?;
        let mut out = String::new();
        out.push_str(&format!("commit {commit_oid}\n"));
        if commit.parents.len() > 1 {
            for (i, parent) in commit.parents.iter().enumerate() {
                out.push_str(&format!("parent {}: {parent}\n", i + 1));
            }
        }
        let author = format!("{} <{}>", commit.author.name, commit.author.email);
        let committer = format!("{} <{}>", commit.committer.name, commit.committer.email);
        out.push_str(&format!("from: {author}\n"));
        out.push_str(&format!("date: {} UTC\n", crate::log_view::format_datetime(commit.committer.timestamp)));
        if author != committer {
            out.push_str(&format!("via: {committer}\n"));
        }
        for line in commit.message.to_string().lines() {
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');
        Ok(out)
    }

    /// Diff the two sides as blobs (or against `/dev/null`): the Diff
    /// View's original behavior, used when neither side is a commit or a
    /// tree.
    fn build_blob_diff(&self) -> Result<(String, Vec<usize>), TuiError> {
        let old_bytes = self.blob_bytes(self.old.oid)?;
        let new_bytes = self.blob_bytes(self.new.oid)?;
        let options = tog_diff::DiffOptions {
            context_lines: self.context_lines,
            ignore_whitespace: self.ignore_whitespace,
        };
        let old_side = tog_diff::Side::new(&self.old.label, old_bytes.as_deref());
        let new_side = tog_diff::Side::new(&self.new.label, new_bytes.as_deref());
        let output = tog_diff::diff(old_side, new_side, options)?;
        Ok((output.text, output.line_offsets))
    }

    /// Diff two commits: a `commit`-headed full tree diff, walked
    /// recursively down to per-blob unified diffs (spec §4.7's primary
    /// use case — Log/Blame navigation and `diff <commit> <commit>` both
    /// feed commit oids here).
    fn build_commit_diff(&self) -> Result<(String, Vec<usize>), TuiError> {
        let primary = self.new.oid.or(self.old.oid).expect("at least one side is a commit");
        let mut text = self.commit_header(primary)?;

        let old_tree = self.old.oid.map(|o| self.repo.read_commit(&o)).transpose()?.map(|c| c.tree);
        let new_tree = self.new.oid.map(|o| self.repo.read_commit(&o)).transpose()?.map(|c| c.tree);
        text.push_str(&self.diff_paths(old_tree, new_tree, "file")?);

        let line_offsets = tog_diff::line_offsets(&text);
        Ok((text, line_offsets))
    }

    /// Diff two bare tree objects directly (no enclosing commit): a
    /// `tree <id>` header followed by the same per-path diff sections,
    /// using `tree` rather than `file` as the section keyword.
    fn build_tree_diff(&self) -> Result<(String, Vec<usize>), TuiError> {
        let primary = self.new.oid.or(self.old.oid).expect("at least one side is a tree");
        let mut text = format!("tree {primary}\n\n");
        text.push_str(&self.diff_paths(self.old.oid, self.new.oid, "tree")?);
        let line_offsets = tog_diff::line_offsets(&text);
        Ok((text, line_offsets))
    }

    fn rebuild(&mut self) -> Result<(), TuiError> {
        self.rebuilding = true;
        let old_kind = self.object_kind(self.old.oid)?;
        let new_kind = self.object_kind(self.new.oid)?;

        let (text, line_offsets) = if matches!(old_kind, Some(ObjectKind::Commit)) || matches!(new_kind, Some(ObjectKind::Commit)) {
            self.build_commit_diff()?
        } else if matches!(old_kind, Some(ObjectKind::Tree)) || matches!(new_kind, Some(ObjectKind::Tree)) {
            self.build_tree_diff()?
        } else {
            self.build_blob_diff()?
        };

        self.text = text;
        self.line_offsets = line_offsets;
        self.first_displayed = 0;
        self.rebuilding = false;
        Ok(())
    }

    fn lines(&self) -> Vec<&str> {
        if self.line_offsets.len() < 2 {
            return Vec::new();
        }
        self.line_offsets
            .windows(2)
            .map(|w| self.text[w[0]..w[1]].trim_end_matches('\n'))
            .collect()
    }

    fn line_style(&self, line: &str) -> crate::color::Style {
        let rules: &[(&str, ColorSlot)] = &[
            ("^-", ColorSlot::DiffMinus),
            (r"^\+", ColorSlot::DiffPlus),
            ("^@@", ColorSlot::DiffChunkHeader),
            ("^(commit|parent|blob|file|tree) ", ColorSlot::DiffMeta),
            ("^(from|via): ", ColorSlot::DiffAuthor),
            ("^date: ", ColorSlot::DiffDate),
        ];
        for (pattern, slot) in rules {
            if Regex::new(pattern).is_ok_and(|re| re.is_match(line)) {
                return self.colors.style(*slot);
            }
        }
        crate::color::Style::NORMAL
    }

    pub fn search_start(&mut self, pattern: &str, dir: SearchDirection) -> Result<(), TuiError> {
        self.search.start(pattern, dir, self.first_displayed)?;
        self.search_next();
        Ok(())
    }

    pub fn search_next(&mut self) {
        let Some(re) = self.search.pattern().cloned() else { return };
        let text = &self.text;
        let offsets = &self.line_offsets;
        if offsets.len() < 2 {
            return;
        }
        let count = offsets.len() - 1;
        let line_at = |i: usize| text[offsets[i]..offsets[i + 1]].trim_end_matches('\n');
        if let Some(idx) = self.search.advance(count, |i| re.is_match(line_at(i))) {
            self.first_displayed = idx;
        }
    }

    pub fn show(&mut self, screen: &mut dyn Screen, region: Region) {
        self.window_rows = region.height;
        screen.clear(region);
        if self.rebuilding {
            screen.write(region, 0, 0, "diffing...", crate::color::Style::NORMAL);
            screen.refresh();
            return;
        }
        let lines = self.lines();
        let mut row = 0u16;
        for line in lines.iter().skip(self.first_displayed).take(region.height as usize) {
            let style = self.line_style(line);
            screen.write(region, row, 0, line, style);
            row += 1;
        }
        if self.first_displayed + row as usize >= lines.len() && row < region.height {
            screen.write(
                region,
                region.height.saturating_sub(1),
                0,
                "(END)",
                crate::color::Style::inverted(),
            );
        }
    }

    pub fn input(&mut self, key: Key, count: Option<u32>) -> Result<ViewInputResult, TuiError> {
        let n = count.unwrap_or(1).max(1) as usize;
        match key {
            Key::Char('q') => Ok(ViewInputResult::Close),
            Key::Down => {
                self.first_displayed = self.first_displayed.saturating_add(n);
                Ok(ViewInputResult::Handled)
            }
            Key::Up => {
                self.first_displayed = self.first_displayed.saturating_sub(n);
                Ok(ViewInputResult::Handled)
            }
            Key::Char('[') => {
                self.context_lines = self.context_lines.saturating_sub(1);
                self.rebuild()?;
                Ok(ViewInputResult::Handled)
            }
            Key::Char(']') => {
                self.context_lines = (self.context_lines + 1).min(tog_diff::MAX_CONTEXT);
                self.rebuild()?;
                Ok(ViewInputResult::Handled)
            }
            Key::Char('w') => {
                self.ignore_whitespace = !self.ignore_whitespace;
                self.rebuild()?;
                Ok(ViewInputResult::Handled)
            }
            Key::Char('a') => {
                self.force_text = !self.force_text;
                self.rebuild()?;
                Ok(ViewInputResult::Handled)
            }
            _ => Ok(ViewInputResult::Handled),
        }
    }

    pub fn close(&mut self) {}

    pub fn log_link(&self) -> Option<ViewId> {
        self.log_link
    }

    /// The commit id currently diffed against its first parent (`None`
    /// before the first commit is targeted, e.g. a root commit's base).
    pub fn new_oid(&self) -> Option<ObjectId> {
        self.new.oid
    }

    /// Re-diff against a new commit pair, used when the linked Log view
    /// advances (spec §4.7: "`<`/`>` advance the linked Log view ...
    /// and re-diff the new commit against its first parent").
    pub fn retarget(&mut self, commit: ObjectId) -> Result<(), TuiError> {
        let c = self.repo.read_commit(&commit)?;
        self.old = DiffSide { label: "a".to_string(), oid: c.first_parent() };
        self.new = DiffSide { label: "b".to_string(), oid: Some(commit) };
        self.rebuild()
    }
}
