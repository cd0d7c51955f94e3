//! The commit-graph traversal oracle `spec.md` §1/§9 keeps abstract
//! (`commit_graph.next() -> id`), plus one concrete reverse-chronological
//! implementation so the rest of the system has something to walk.
//!
//! Grounded on the *shape* of the teacher's `git_revwalk::walk::RevWalk`
//! (a `BinaryHeap<WalkEntry>` ordered by commit date, a `seen` set, parents
//! enqueued lazily as each commit is emitted) — trimmed to the single sort
//! order the spec's views need (newest-committer-date-first); topological
//! sort, `--ancestry-path`, and the teacher's other `SortOrder` variants
//! are cut, since ambient commit-graph traversal order is explicitly out
//! of scope (§1) and only enough is kept to exercise the rest of the
//! system.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

use tog_hash::ObjectId;

use crate::error::RepoError;
use crate::repository::Repository;

/// The literal oracle signature spec.md §1/§9 names: "an abstract
/// `commit_graph.next() -> id`".
pub trait CommitGraph {
    fn next(&mut self) -> Result<Option<ObjectId>, RepoError>;
}

struct WalkEntry {
    oid: ObjectId,
    commit_date: i64,
    insertion_ctr: u64,
}

impl PartialEq for WalkEntry {
    fn eq(&self, other: &Self) -> bool {
        self.oid == other.oid
    }
}
impl Eq for WalkEntry {}
impl PartialOrd for WalkEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for WalkEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.commit_date
            .cmp(&other.commit_date)
            .then_with(|| other.insertion_ctr.cmp(&self.insertion_ctr))
    }
}

/// Reverse-chronological (newest committer-date first) walk over parent
/// pointers, starting from one or more tips.
pub struct RevWalk<'a> {
    repo: &'a Repository,
    queue: BinaryHeap<WalkEntry>,
    seen: HashSet<ObjectId>,
    insertion_ctr: u64,
    /// Repository-relative path filter (§4.6): only commits that changed
    /// this path (relative to their first parent) are emitted. `None`
    /// means no filter.
    path_filter: Option<String>,
}

impl<'a> RevWalk<'a> {
    pub fn new(repo: &'a Repository) -> Self {
        Self {
            repo,
            queue: BinaryHeap::new(),
            seen: HashSet::new(),
            insertion_ctr: 0,
            path_filter: None,
        }
    }

    pub fn set_path_filter(&mut self, path: Option<String>) {
        self.path_filter = path.filter(|p| !p.is_empty());
    }

    /// Start the walk from `HEAD`.
    pub fn push_head(&mut self) -> Result<(), RepoError> {
        if let Some(oid) = self.repo.head_oid()? {
            self.push(oid)?;
        }
        Ok(())
    }

    /// Start the walk from every branch tip (§4.6's "branch scope" `-b`).
    pub fn push_all_branches(&mut self) -> Result<(), RepoError> {
        for r in self.repo.refs().iter_heads_and_tags()? {
            if r.name().is_branch() {
                if let Some(oid) = self.repo.refs().resolve_to_oid(r.name())? {
                    self.push(oid)?;
                }
            }
        }
        Ok(())
    }

    pub fn push(&mut self, oid: ObjectId) -> Result<(), RepoError> {
        if !self.seen.insert(oid) {
            return Ok(());
        }
        let commit = self.repo.read_commit(&oid)?;
        self.enqueue(oid, commit.committer.timestamp);
        Ok(())
    }

    fn enqueue(&mut self, oid: ObjectId, commit_date: i64) {
        self.queue.push(WalkEntry {
            oid,
            commit_date,
            insertion_ctr: self.insertion_ctr,
        });
        self.insertion_ctr += 1;
    }

    /// Whether `oid`'s tree differs from its first parent's tree at
    /// `path` (root commits with no parent always match, if the path
    /// exists there at all).
    fn touches_path(&self, oid: &ObjectId, path: &str) -> Result<bool, RepoError> {
        let commit = self.repo.read_commit(oid)?;
        let here = self.repo.resolve_path(&commit.tree, path)?;
        match commit.first_parent() {
            None => Ok(here.is_some()),
            Some(parent) => {
                let parent_commit = self.repo.read_commit(&parent)?;
                let there = self.repo.resolve_path(&parent_commit.tree, path)?;
                Ok(here.map(|(oid, _)| oid) != there.map(|(oid, _)| oid))
            }
        }
    }
}

impl CommitGraph for RevWalk<'_> {
    fn next(&mut self) -> Result<Option<ObjectId>, RepoError> {
        loop {
            let Some(entry) = self.queue.pop() else {
                return Ok(None);
            };
            let commit = self.repo.read_commit(&entry.oid)?;
            for parent in &commit.parents {
                if self.seen.insert(*parent) {
                    let parent_commit = self.repo.read_commit(parent)?;
                    self.enqueue(*parent, parent_commit.committer.timestamp);
                }
            }

            if let Some(path) = self.path_filter.clone() {
                if !self.touches_path(&entry.oid, &path)? {
                    continue;
                }
            }

            return Ok(Some(entry.oid));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;
    use std::path::Path;

    fn write_loose(objects_dir: &Path, kind: &str, content: &[u8]) -> ObjectId {
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

    fn commit(
        objects_dir: &Path,
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

    #[test]
    fn walks_newest_first_and_visits_each_commit_once() {
        let dir = tempfile::tempdir().unwrap();
        let git_dir = dir.path().join(".got");
        let objects_dir = git_dir.join("objects");
        std::fs::create_dir_all(&objects_dir).unwrap();

        let tree = write_loose(&objects_dir, "tree", b"");
        let c1 = commit(&objects_dir, &tree, &[], 100);
        let c2 = commit(&objects_dir, &tree, &[c1], 200);
        let c3 = commit(&objects_dir, &tree, &[c2], 300);

        std::fs::create_dir_all(git_dir.join("refs/heads")).unwrap();
        std::fs::write(git_dir.join("refs/heads/main"), format!("{}\n", c3.to_hex())).unwrap();
        std::fs::write(git_dir.join("HEAD"), "ref: refs/heads/main\n").unwrap();

        let repo = Repository::open(&git_dir, None).unwrap();
        let mut walk = RevWalk::new(&repo);
        walk.push_head().unwrap();

        let mut seen = Vec::new();
        while let Some(oid) = walk.next().unwrap() {
            seen.push(oid);
        }
        assert_eq!(seen, vec![c3, c2, c1]);
    }

    #[test]
    fn merge_commit_parents_both_enqueued_once() {
        let dir = tempfile::tempdir().unwrap();
        let git_dir = dir.path().join(".got");
        let objects_dir = git_dir.join("objects");
        std::fs::create_dir_all(&objects_dir).unwrap();

        let tree = write_loose(&objects_dir, "tree", b"");
        let base = commit(&objects_dir, &tree, &[], 100);
        let left = commit(&objects_dir, &tree, &[base], 200);
        let right = commit(&objects_dir, &tree, &[base], 201);
        let merge = commit(&objects_dir, &tree, &[left, right], 300);

        std::fs::write(git_dir.join("HEAD"), format!("{}\n", merge.to_hex())).unwrap();

        let repo = Repository::open(&git_dir, None).unwrap();
        let mut walk = RevWalk::new(&repo);
        walk.push_head().unwrap();

        let mut seen = Vec::new();
        while let Some(oid) = walk.next().unwrap() {
            seen.push(oid);
        }
        assert_eq!(seen.len(), 4);
        assert_eq!(seen[0], merge);
        assert_eq!(*seen.last().unwrap(), base);
    }
}
