//! Read-only reference resolution: loose refs under `refs/` plus a
//! `packed-refs` side file, the way the teacher's `git-ref::files` backend
//! reads them — trimmed of the write path, transactions, and reflogs, none
//! of which any view uses (§1: "on-disk reference resolution (abstract
//! `refs` service)").

use std::fs;
use std::path::{Path, PathBuf};

use bstr::ByteSlice;
use tog_hash::ObjectId;

use crate::error::RepoError;
use crate::refname::RefName;

/// A resolved reference: either a direct pointer to an object, or a
/// symbolic pointer to another ref name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    Direct { name: RefName, target: ObjectId },
    Symbolic { name: RefName, target: RefName },
}

impl Reference {
    pub fn name(&self) -> &RefName {
        match self {
            Self::Direct { name, .. } => name,
            Self::Symbolic { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone)]
struct PackedRef {
    name: RefName,
    oid: ObjectId,
    peeled: Option<ObjectId>,
}

/// Read-only view over a repository's `refs/` directory and `packed-refs`
/// file, including `HEAD` and the other special single-file refs.
pub struct RefStore {
    git_dir: PathBuf,
    packed: Vec<PackedRef>,
}

impl RefStore {
    pub fn open(git_dir: impl Into<PathBuf>) -> Result<Self, RepoError> {
        let git_dir = git_dir.into();
        let packed = load_packed_refs(&git_dir)?;
        Ok(Self { git_dir, packed })
    }

    /// Resolve a ref name to its `Reference`, without following symbolic
    /// chains.
    pub fn resolve(&self, name: &RefName) -> Result<Option<Reference>, RepoError> {
        if let Some(r) = self.read_loose(name)? {
            return Ok(Some(r));
        }
        if let Some(packed) = self.packed.iter().find(|p| p.name == *name) {
            return Ok(Some(Reference::Direct {
                name: name.clone(),
                target: packed.oid,
            }));
        }
        Ok(None)
    }

    /// Resolve a ref name all the way to an object id, following symbolic
    /// ref chains (bounded, to reject cycles).
    pub fn resolve_to_oid(&self, name: &RefName) -> Result<Option<ObjectId>, RepoError> {
        let mut current = name.clone();
        for _ in 0..16 {
            match self.resolve(&current)? {
                None => return Ok(None),
                Some(Reference::Direct { target, .. }) => return Ok(Some(target)),
                Some(Reference::Symbolic { target, .. }) => current = target,
            }
        }
        Err(RepoError::Parse(format!(
            "symbolic ref chain too deep starting at '{name}'"
        )))
    }

    /// `HEAD`'s resolved object id, if it points anywhere.
    pub fn head_oid(&self) -> Result<Option<ObjectId>, RepoError> {
        self.resolve_to_oid(&RefName::new_unchecked("HEAD"))
    }

    /// Every ref under `refs/heads/`, `refs/tags/`, and `refs/got/backup/`
    /// (excluding the rest of `refs/got/**`, per §4.9's Ref View filter),
    /// sorted by name. `i` numbers the list afterwards, since the view
    /// applies its own sort toggle before assigning indices.
    pub fn iter_heads_and_tags(&self) -> Result<Vec<Reference>, RepoError> {
        let mut out = Vec::new();
        self.enumerate_loose(&self.git_dir.join("refs"), "refs", &mut out)?;
        for p in &self.packed {
            if !out.iter().any(|r: &Reference| r.name() == &p.name) {
                out.push(Reference::Direct {
                    name: p.name.clone(),
                    target: p.oid,
                });
            }
        }
        out.retain(|r| {
            let n = r.name().as_str();
            (n.starts_with("refs/heads/") || n.starts_with("refs/tags/"))
                || n.starts_with("refs/got/backup/")
        });
        out.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(out)
    }

    /// The peeled (dereferenced) target of an annotated tag, if recorded in
    /// `packed-refs`. Loose tags are peeled by the caller via the object
    /// store (tag objects resolve their own `object` field).
    pub fn packed_peeled(&self, name: &RefName) -> Option<ObjectId> {
        self.packed.iter().find(|p| p.name == *name).and_then(|p| p.peeled)
    }

    fn read_loose(&self, name: &RefName) -> Result<Option<Reference>, RepoError> {
        let path = self.loose_path(name);
        if !path.is_file() {
            return Ok(None);
        }
        let contents = fs::read(&path).map_err(|e| RepoError::IoPath {
            path: path.clone(),
            source: e,
        })?;
        let trimmed = contents.trim();
        if let Some(target) = trimmed.strip_prefix(b"ref: ") {
            let target_str = std::str::from_utf8(target.trim())
                .map_err(|_| RepoError::Parse("invalid UTF-8 in symbolic ref target".into()))?;
            let target = RefName::new(target_str)?;
            Ok(Some(Reference::Symbolic {
                name: name.clone(),
                target,
            }))
        } else {
            let hex = std::str::from_utf8(trimmed)
                .map_err(|_| RepoError::Parse("invalid UTF-8 in ref target".into()))?;
            let oid = ObjectId::from_hex(hex)?;
            Ok(Some(Reference::Direct {
                name: name.clone(),
                target: oid,
            }))
        }
    }

    fn loose_path(&self, name: &RefName) -> PathBuf {
        self.git_dir.join(name.as_str())
    }

    fn enumerate_loose(
        &self,
        dir: &Path,
        name_prefix: &str,
        out: &mut Vec<Reference>,
    ) -> Result<(), RepoError> {
        if !dir.is_dir() {
            return Ok(());
        }
        let mut entries: Vec<_> = fs::read_dir(dir)
            .map_err(|e| RepoError::IoPath {
                path: dir.to_path_buf(),
                source: e,
            })?
            .filter_map(|e| e.ok())
            .collect();
        entries.sort_by_key(|e| e.file_name());
        for entry in entries {
            let path = entry.path();
            let file_name = entry.file_name();
            let file_name = file_name.to_string_lossy();
            let child_name = format!("{name_prefix}/{file_name}");
            if path.is_dir() {
                self.enumerate_loose(&path, &child_name, out)?;
            } else if let Ok(name) = RefName::new(child_name) {
                if let Some(r) = self.read_loose(&name)? {
                    out.push(r);
                }
            }
        }
        Ok(())
    }
}

fn load_packed_refs(git_dir: &Path) -> Result<Vec<PackedRef>, RepoError> {
    let path = git_dir.join("packed-refs");
    if !path.is_file() {
        return Ok(Vec::new());
    }
    let data = fs::read(&path).map_err(|e| RepoError::IoPath {
        path: path.clone(),
        source: e,
    })?;
    parse_packed_refs(&data)
}

fn parse_packed_refs(data: &[u8]) -> Result<Vec<PackedRef>, RepoError> {
    let mut refs: Vec<PackedRef> = Vec::new();
    for line in data.lines() {
        if line.is_empty() || line.starts_with(b"#") {
            continue;
        }
        if let Some(hex) = line.strip_prefix(b"^") {
            let hex = std::str::from_utf8(hex)
                .map_err(|_| RepoError::Parse("invalid UTF-8 in peeled oid".into()))?;
            let peeled = ObjectId::from_hex(hex.trim())?;
            if let Some(last) = refs.last_mut() {
                last.peeled = Some(peeled);
            }
            continue;
        }
        let space = line
            .find_byte(b' ')
            .ok_or_else(|| RepoError::Parse("invalid packed-refs line".into()))?;
        let hex = std::str::from_utf8(&line[..space])
            .map_err(|_| RepoError::Parse("invalid UTF-8 in packed-refs oid".into()))?;
        let oid = ObjectId::from_hex(hex)?;
        let name_str = std::str::from_utf8(line[space + 1..].trim())
            .map_err(|_| RepoError::Parse("invalid UTF-8 in packed-refs name".into()))?;
        let name = RefName::new(name_str)?;
        refs.push(PackedRef {
            name,
            oid,
            peeled: None,
        });
    }
    Ok(refs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn resolves_loose_direct_ref() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "refs/heads/main",
            "da39a3ee5e6b4b0d3255bfef95601890afd80709\n",
        );
        let store = RefStore::open(dir.path()).unwrap();
        let name = RefName::new("refs/heads/main").unwrap();
        let r = store.resolve(&name).unwrap().unwrap();
        assert_eq!(
            r,
            Reference::Direct {
                name: name.clone(),
                target: ObjectId::from_hex("da39a3ee5e6b4b0d3255bfef95601890afd80709").unwrap(),
            }
        );
    }

    #[test]
    fn follows_symbolic_head_to_oid() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "HEAD", "ref: refs/heads/main\n");
        write(
            dir.path(),
            "refs/heads/main",
            "da39a3ee5e6b4b0d3255bfef95601890afd80709\n",
        );
        let store = RefStore::open(dir.path()).unwrap();
        let oid = store.head_oid().unwrap().unwrap();
        assert_eq!(oid.to_hex(), "da39a3ee5e6b4b0d3255bfef95601890afd80709");
    }

    #[test]
    fn falls_back_to_packed_refs() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "packed-refs",
            "# pack-refs with: peeled fully-peeled sorted\naaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa refs/heads/old\n",
        );
        let store = RefStore::open(dir.path()).unwrap();
        let name = RefName::new("refs/heads/old").unwrap();
        assert!(store.resolve(&name).unwrap().is_some());
    }

    #[test]
    fn iter_excludes_non_backup_got_refs() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "refs/heads/main", &"a".repeat(40));
        write(dir.path(), "refs/tags/v1", &"b".repeat(40));
        write(dir.path(), "refs/got/worktree/x", &"c".repeat(40));
        write(dir.path(), "refs/got/backup/main", &"d".repeat(40));
        let store = RefStore::open(dir.path()).unwrap();
        let names: Vec<_> = store
            .iter_heads_and_tags()
            .unwrap()
            .into_iter()
            .map(|r| r.name().to_string())
            .collect();
        assert_eq!(
            names,
            vec!["refs/got/backup/main", "refs/heads/main", "refs/tags/v1"]
        );
    }

    #[test]
    fn missing_ref_resolves_to_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = RefStore::open(dir.path()).unwrap();
        let name = RefName::new("refs/heads/nonexistent").unwrap();
        assert!(store.resolve(&name).unwrap().is_none());
    }
}
