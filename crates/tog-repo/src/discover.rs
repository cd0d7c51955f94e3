//! Repository discovery: walk up from a starting directory looking for a
//! `.got` or `.git` directory, grounded on the teacher's
//! `git_repository::discover::discover_git_dir` walk (§1: "file-system/
//! working-tree discovery" is an out-of-scope collaborator, but the `tog`
//! binary still needs *some* concrete way to find the repository it's
//! asked to browse).

use std::path::{Path, PathBuf};

use crate::error::RepoError;

/// Where a discovered repository's metadata directory lives, and the
/// working tree it belongs to (if any — bare repositories have none).
pub struct Discovered {
    pub git_dir: PathBuf,
    pub work_tree: Option<PathBuf>,
}

const DIR_NAMES: &[&str] = &[".got", ".git"];

/// Walk up from `start` looking for a `.got`/`.git` directory (in that
/// order of preference — `tog` is a got-history browser first).
pub fn discover(start: &Path) -> Result<Discovered, RepoError> {
    let start = std::fs::canonicalize(start).map_err(|_| RepoError::NotFound(start.to_path_buf()))?;

    let mut current = start.clone();
    loop {
        for dir_name in DIR_NAMES {
            let candidate = current.join(dir_name);
            if candidate.is_dir() && is_metadata_dir(&candidate) {
                return Ok(Discovered {
                    git_dir: candidate,
                    work_tree: Some(current),
                });
            }
        }

        // Bare repository: the directory itself looks like a metadata dir.
        if is_metadata_dir(&current) {
            return Ok(Discovered {
                git_dir: current,
                work_tree: None,
            });
        }

        match current.parent() {
            Some(parent) if parent != current => current = parent.to_path_buf(),
            _ => return Err(RepoError::NotFound(start)),
        }
    }
}

fn is_metadata_dir(path: &Path) -> bool {
    path.join("objects").is_dir() && (path.join("HEAD").is_file() || path.join("refs").is_dir())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_repo(root: &Path) {
        std::fs::create_dir_all(root.join(".got/objects/pack")).unwrap();
        std::fs::create_dir_all(root.join(".got/refs/heads")).unwrap();
        std::fs::write(root.join(".got/HEAD"), "ref: refs/heads/main\n").unwrap();
    }

    #[test]
    fn finds_repo_in_current_dir() {
        let dir = tempfile::tempdir().unwrap();
        make_repo(dir.path());
        let found = discover(dir.path()).unwrap();
        assert_eq!(found.git_dir, dir.path().join(".got"));
        assert_eq!(found.work_tree, Some(dir.path().canonicalize().unwrap()));
    }

    #[test]
    fn finds_repo_from_nested_subdirectory() {
        let dir = tempfile::tempdir().unwrap();
        make_repo(dir.path());
        let nested = dir.path().join("a/b/c");
        std::fs::create_dir_all(&nested).unwrap();
        let found = discover(&nested).unwrap();
        assert_eq!(found.git_dir, dir.path().join(".got"));
    }

    #[test]
    fn errors_when_no_repo_found() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover(dir.path()).is_err());
    }
}
