//! Opaque commit/tree/blob/tag object types.
//!
//! `spec.md` §3 calls these "opaque higher-level entities produced by
//! decompressing and parsing an object" and puts their internal fields out
//! of scope beyond what the history browser actually renders: the
//! author/committer line, the commit date, the message, tree entries, and
//! blob bytes.

mod blob;
mod commit;
mod signature;
mod tag;
mod tree;

pub use blob::Blob;
pub use commit::Commit;
pub use signature::Signature;
pub use tag::Tag;
pub use tree::{FileMode, Tree, TreeEntry};

use bstr::BString;
use tog_hash::ObjectId;

/// Errors produced while parsing object content.
#[derive(Debug, thiserror::Error)]
pub enum ObjectError {
    #[error("invalid object kind: {0:?}")]
    InvalidKind(BString),

    #[error("truncated object: missing '{field}' header")]
    MissingField { field: &'static str },

    #[error("invalid object header: {0}")]
    InvalidHeader(String),

    #[error("invalid tree entry at offset {offset}: {reason}")]
    InvalidTreeEntry { offset: usize, reason: String },

    #[error(transparent)]
    Hash(#[from] tog_hash::HashError),
}

/// The four resolved kinds of object a pack or loose store can hold.
///
/// Offset-delta and ref-delta are chain links, not resolved kinds (§3: "The
/// two delta kinds never appear as a resolved type").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Commit,
    Tree,
    Blob,
    Tag,
}

impl ObjectKind {
    pub fn from_bytes(s: &[u8]) -> Result<Self, ObjectError> {
        match s {
            b"commit" => Ok(Self::Commit),
            b"tree" => Ok(Self::Tree),
            b"blob" => Ok(Self::Blob),
            b"tag" => Ok(Self::Tag),
            _ => Err(ObjectError::InvalidKind(BString::from(s))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Commit => "commit",
            Self::Tree => "tree",
            Self::Blob => "blob",
            Self::Tag => "tag",
        }
    }
}

/// A decompressed, not-yet-typed object: raw content plus its kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawObject {
    pub kind: ObjectKind,
    pub data: Vec<u8>,
}

/// A fully parsed object, one variant per `ObjectKind`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Object {
    Commit(Commit),
    Tree(Tree),
    Blob(Blob),
    Tag(Tag),
}

impl Object {
    pub fn parse(raw: &RawObject) -> Result<Self, ObjectError> {
        Ok(match raw.kind {
            ObjectKind::Commit => Self::Commit(Commit::parse(&raw.data)?),
            ObjectKind::Tree => Self::Tree(Tree::parse(&raw.data)?),
            ObjectKind::Blob => Self::Blob(Blob::from_bytes(raw.data.clone())),
            ObjectKind::Tag => Self::Tag(Tag::parse(&raw.data)?),
        })
    }

    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Commit(_) => ObjectKind::Commit,
            Self::Tree(_) => ObjectKind::Tree,
            Self::Blob(_) => ObjectKind::Blob,
            Self::Tag(_) => ObjectKind::Tag,
        }
    }

    pub fn as_commit(&self) -> Option<&Commit> {
        match self {
            Self::Commit(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_tree(&self) -> Option<&Tree> {
        match self {
            Self::Tree(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_blob(&self) -> Option<&Blob> {
        match self {
            Self::Blob(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_tag(&self) -> Option<&Tag> {
        match self {
            Self::Tag(t) => Some(t),
            _ => None,
        }
    }
}

/// Parse a hex object id out of a header value, wrapping the hash error.
pub(crate) fn parse_oid(value: &[u8]) -> Result<ObjectId, ObjectError> {
    let hex = std::str::from_utf8(value)
        .map_err(|_| ObjectError::InvalidHeader("non-UTF8 object id".into()))?;
    Ok(ObjectId::from_hex(hex)?)
}
