//! Read-only loose object storage.
//!
//! Each loose object lives at `.git/objects/XX/YYYY...` (`XX` the first hex
//! byte of the id, `YYYY...` the rest) and holds zlib-compressed
//! `"<kind> <size>\0<content>"`. The facade in `tog-odb` consults this after
//! a pack miss (§4.4's "on miss, consult loose-object backing").

mod enumerate;
mod read;

pub use enumerate::LooseObjectIter;

use std::path::{Path, PathBuf};

use tog_hash::ObjectId;

/// Handle to a repository's `objects/` directory.
pub struct LooseObjectStore {
    objects_dir: PathBuf,
}

impl LooseObjectStore {
    pub fn open(objects_dir: impl AsRef<Path>) -> Self {
        Self {
            objects_dir: objects_dir.as_ref().to_path_buf(),
        }
    }

    pub fn object_path(&self, id: &ObjectId) -> PathBuf {
        self.objects_dir.join(id.loose_path())
    }
}

/// Errors from loose object operations.
#[derive(Debug, thiserror::Error)]
pub enum LooseError {
    #[error("corrupt loose object {id}: {reason}")]
    Corrupt { id: String, reason: String },

    #[error("hash mismatch for {path}: expected {expected}, got {actual}")]
    HashMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Object(#[from] tog_object::ObjectError),

    #[error(transparent)]
    Hash(#[from] tog_hash::HashError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_path_splits_first_two_chars() {
        let store = LooseObjectStore::open("/tmp/objects");
        let id = ObjectId::from_hex("da39a3ee5e6b4b0d3255bfef95601890afd80709").unwrap();
        assert_eq!(
            store.object_path(&id),
            PathBuf::from("/tmp/objects/da/39a3ee5e6b4b0d3255bfef95601890afd80709")
        );
    }
}
