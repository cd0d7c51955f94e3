use std::path::{Path, PathBuf};

use bstr::ByteSlice;
use tog_hash::ObjectId;
use tog_object::{Commit, Object, ObjectKind, Tree};

use crate::error::RepoError;
use crate::refname::RefName;
use crate::refs::{RefStore, Reference};

/// The top-level handle every view is built against: the object store
/// plus the ref store, rooted at a discovered `.got`/`.git` directory.
///
/// Grounded on the shape of the teacher's `git_repository::Repository`
/// (an object-store handle plus a `refs()` accessor), trimmed of
/// worktree/hooks/gpg/editor machinery this read-only browser never uses.
pub struct Repository {
    odb: tog_odb::ObjectStore,
    refs: RefStore,
    git_dir: PathBuf,
    work_tree: Option<PathBuf>,
}

impl Repository {
    pub fn open(git_dir: impl Into<PathBuf>, work_tree: Option<PathBuf>) -> Result<Self, RepoError> {
        let git_dir = git_dir.into();
        let odb = tog_odb::ObjectStore::open(git_dir.join("objects"))?;
        let refs = RefStore::open(&git_dir)?;
        Ok(Self {
            odb,
            refs,
            git_dir,
            work_tree,
        })
    }

    /// Discover and open the repository containing `start`.
    pub fn discover(start: &Path) -> Result<Self, RepoError> {
        let found = crate::discover::discover(start)?;
        Self::open(found.git_dir, found.work_tree)
    }

    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    pub fn work_tree(&self) -> Option<&Path> {
        self.work_tree.as_deref()
    }

    pub fn odb(&self) -> &tog_odb::ObjectStore {
        &self.odb
    }

    pub fn refs(&self) -> &RefStore {
        &self.refs
    }

    pub fn head_oid(&self) -> Result<Option<ObjectId>, RepoError> {
        Ok(self.refs.head_oid()?)
    }

    /// Resolve a human-entered ref/commit spec: a full ref name, a short
    /// branch/tag name, or a hex object id prefix.
    pub fn resolve_commitish(&self, spec: &str) -> Result<ObjectId, RepoError> {
        if let Ok(oid) = ObjectId::from_hex(spec) {
            return Ok(self.peel_to_commit(oid)?);
        }
        for candidate in [
            format!("refs/heads/{spec}"),
            format!("refs/tags/{spec}"),
            spec.to_string(),
        ] {
            if let Ok(name) = RefName::new(candidate) {
                if let Some(oid) = self.refs.resolve_to_oid(&name)? {
                    return Ok(self.peel_to_commit(oid)?);
                }
            }
        }
        Err(RepoError::Parse(format!("unknown revision: {spec}")))
    }

    /// Dereference an annotated tag to the commit it ultimately names; a
    /// bare commit id passes through unchanged. Non-commit targets are
    /// errors (§4.9: "non-commit targets are errors").
    pub fn peel_to_commit(&self, mut oid: ObjectId) -> Result<ObjectId, RepoError> {
        loop {
            let handle = self.odb.open_object(&oid)?;
            let obj = self.odb.extract(&handle)?;
            match obj {
                Object::Commit(_) => return Ok(oid),
                Object::Tag(tag) => oid = tag.object,
                _ => return Err(RepoError::NotACommit { oid }),
            }
        }
    }

    pub fn read_commit(&self, oid: &ObjectId) -> Result<Commit, RepoError> {
        let handle = self.odb.open_object(oid)?;
        match self.odb.extract(&handle)? {
            Object::Commit(c) => Ok(c),
            _ => Err(RepoError::NotACommit { oid: *oid }),
        }
    }

    pub fn read_tree(&self, oid: &ObjectId) -> Result<Tree, RepoError> {
        let handle = self.odb.open_object(oid)?;
        match self.odb.extract(&handle)? {
            Object::Tree(t) => Ok(t),
            _ => Err(RepoError::Parse(format!("{oid} is not a tree"))),
        }
    }

    pub fn object_kind(&self, oid: &ObjectId) -> Result<ObjectKind, RepoError> {
        let handle = self.odb.open_object(oid)?;
        Ok(self.odb.extract(&handle)?.kind())
    }

    /// Resolve a slash-separated repository path to the object id of the
    /// tree entry it names, starting from `root_tree`. Returns `None` if
    /// any path component is missing.
    pub fn resolve_path(
        &self,
        root_tree: &ObjectId,
        path: &str,
    ) -> Result<Option<(ObjectId, ObjectKind)>, RepoError> {
        if path.is_empty() {
            return Ok(Some((*root_tree, ObjectKind::Tree)));
        }
        let mut current = *root_tree;
        let components: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
        for (i, component) in components.iter().enumerate() {
            let tree = self.read_tree(&current)?;
            let Some(entry) = tree.entries.iter().find(|e| e.name == component.as_bytes()) else {
                return Ok(None);
            };
            if i == components.len() - 1 {
                let kind = self.object_kind(&entry.oid)?;
                return Ok(Some((entry.oid, kind)));
            }
            current = entry.oid;
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;

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

    fn tree_entry(mode: &str, name: &str, oid: &ObjectId) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(mode.as_bytes());
        buf.push(b' ');
        buf.extend_from_slice(name.as_bytes());
        buf.push(0);
        buf.extend_from_slice(oid.as_bytes());
        buf
    }

    #[test]
    fn resolves_nested_path_through_trees() {
        let dir = tempfile::tempdir().unwrap();
        let git_dir = dir.path().join(".got");
        let objects_dir = git_dir.join("objects");
        std::fs::create_dir_all(&objects_dir).unwrap();

        let blob = write_loose(&objects_dir, "blob", b"hello\n");
        let mut inner_tree_content = Vec::new();
        inner_tree_content.extend(tree_entry("100644", "file.txt", &blob));
        let inner_tree = write_loose(&objects_dir, "tree", &inner_tree_content);

        let mut root_tree_content = Vec::new();
        root_tree_content.extend(tree_entry("40000", "subdir", &inner_tree));
        let root_tree = write_loose(&objects_dir, "tree", &root_tree_content);

        let repo = Repository::open(&git_dir, None).unwrap();
        let (oid, kind) = repo
            .resolve_path(&root_tree, "subdir/file.txt")
            .unwrap()
            .unwrap();
        assert_eq!(oid, blob);
        assert_eq!(kind, ObjectKind::Blob);
    }

    #[test]
    fn missing_path_component_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let git_dir = dir.path().join(".got");
        let objects_dir = git_dir.join("objects");
        std::fs::create_dir_all(&objects_dir).unwrap();
        let root_tree = write_loose(&objects_dir, "tree", b"");

        let repo = Repository::open(&git_dir, None).unwrap();
        assert!(repo.resolve_path(&root_tree, "nope").unwrap().is_none());
    }
}
