//! Pack index and pack file reading, delta chain resolution.
//!
//! Implements the on-disk pack index (v2) and pack file formats: a
//! fan-out indexed, binary-searched id-to-offset table and a stream of
//! zlib-deflated, possibly deltified object records.

pub mod chain;
pub mod delta;
pub mod entry;
pub mod index;
pub mod pack;

use tog_hash::ObjectId;

/// Errors produced while reading pack indexes and pack files.
#[derive(Debug, thiserror::Error)]
pub enum PackError {
    #[error("bad pack index: {0}")]
    BadPackIndex(String),

    #[error("pack index checksum mismatch: expected {expected}, computed {computed}")]
    PackIndexChecksum {
        expected: ObjectId,
        computed: ObjectId,
    },

    #[error("bad pack file: {0}")]
    BadPackFile(String),

    #[error("size or offset varint overflowed 64 bits")]
    Overflow,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Object(#[from] tog_object::ObjectError),

    #[error(transparent)]
    Hash(#[from] tog_hash::HashError),
}

/// Type of a packed object entry, as read from its record header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackEntryType {
    Commit,
    Tree,
    Blob,
    Tag,
    /// Delta against a base earlier in the same pack.
    OfsDelta { base_offset: u64 },
    /// Delta against a base identified by object id, possibly in another pack.
    RefDelta { base_oid: ObjectId },
}

impl PackEntryType {
    pub fn to_object_kind(self) -> Option<tog_object::ObjectKind> {
        match self {
            Self::Commit => Some(tog_object::ObjectKind::Commit),
            Self::Tree => Some(tog_object::ObjectKind::Tree),
            Self::Blob => Some(tog_object::ObjectKind::Blob),
            Self::Tag => Some(tog_object::ObjectKind::Tag),
            Self::OfsDelta { .. } | Self::RefDelta { .. } => None,
        }
    }

    /// Type number as used in pack entry headers (bits 6-4 of byte 0).
    pub fn type_number(&self) -> u8 {
        match self {
            Self::Commit => 1,
            Self::Tree => 2,
            Self::Blob => 3,
            Self::Tag => 4,
            Self::OfsDelta { .. } => 6,
            Self::RefDelta { .. } => 7,
        }
    }
}

/// A fully resolved object read from a pack, after delta chain application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedObject {
    pub kind: tog_object::ObjectKind,
    pub data: Vec<u8>,
}

pub const PACK_SIGNATURE: &[u8; 4] = b"PACK";
pub const PACK_VERSION: u32 = 2;
pub const PACK_HEADER_SIZE: usize = 12;

/// `0xff744f63`, i.e. `"\377tOc"`.
pub const IDX_SIGNATURE: [u8; 4] = [0xff, 0x74, 0x4f, 0x63];
pub const IDX_VERSION: u32 = 2;

/// §4.3's recommended depth cap before a cyclic or pathological chain is
/// treated as `BadPackFile`.
pub const MAX_DELTA_CHAIN_DEPTH: usize = 50;
