//! Object identifiers: fixed 20-byte SHA-1 ids, lexical ordering, hex
//! rendering, and object-content hashing.
//!
//! This crate is deliberately single-algorithm (SHA-1 only): the system this
//! workspace implements reads SHA-1 packs exclusively (see the pack index
//! and pack file formats in `tog-pack`), unlike a general-purpose object
//! database that might support SHA-256 transition.

mod error;
pub mod hasher;
pub mod hex;

pub use error::HashError;
pub use hasher::RunningHasher;

use std::fmt;
use std::str::FromStr;

/// Number of bytes in an object id.
pub const OBJECT_ID_LEN: usize = 20;

/// A 20-byte SHA-1 object identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; OBJECT_ID_LEN]);

impl ObjectId {
    /// The all-zero id, used as a sentinel for "no object" (e.g. a diff
    /// against `/dev/null`).
    pub const NULL: Self = Self([0u8; OBJECT_ID_LEN]);

    /// Build an id from exactly 20 raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, HashError> {
        if bytes.len() != OBJECT_ID_LEN {
            return Err(HashError::InvalidLength {
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; OBJECT_ID_LEN];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }

    /// Build an id from a 40-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, HashError> {
        if s.len() != OBJECT_ID_LEN * 2 {
            return Err(HashError::InvalidHexLength { actual: s.len() });
        }
        let mut bytes = [0u8; OBJECT_ID_LEN];
        hex::hex_decode(s, &mut bytes)?;
        Ok(Self(bytes))
    }

    /// Raw bytes of the id.
    pub fn as_bytes(&self) -> &[u8; OBJECT_ID_LEN] {
        &self.0
    }

    /// First byte, used to index a pack index's fan-out table.
    pub fn first_byte(&self) -> u8 {
        self.0[0]
    }

    /// Whether this is the all-zero sentinel id.
    pub fn is_null(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }

    /// Lowercase 40-character hex rendering.
    pub fn to_hex(&self) -> String {
        hex::hex_to_string(&self.0)
    }

    /// Loose-object path component, `"xx/yyyy..."`.
    pub fn loose_path(&self) -> String {
        let hex = self.to_hex();
        format!("{}/{}", &hex[..2], &hex[2..])
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", &self.to_hex()[..8])
    }
}

impl FromStr for ObjectId {
    type Err = HashError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEX: &str = "da39a3ee5e6b4b0d3255bfef95601890afd80709";

    #[test]
    fn from_hex_roundtrip() {
        let oid = ObjectId::from_hex(HEX).unwrap();
        assert_eq!(oid.to_hex(), HEX);
    }

    #[test]
    fn case_insensitive_hex() {
        let lower = ObjectId::from_hex(HEX).unwrap();
        let upper = ObjectId::from_hex(&HEX.to_uppercase()).unwrap();
        assert_eq!(lower, upper);
    }

    #[test]
    fn lexical_ordering() {
        let a = ObjectId::from_hex("0000000000000000000000000000000000000001").unwrap();
        let b = ObjectId::from_hex("0000000000000000000000000000000000000002").unwrap();
        assert!(a < b);
    }

    #[test]
    fn first_byte_indexes_fanout() {
        let oid = ObjectId::from_hex(HEX).unwrap();
        assert_eq!(oid.first_byte(), 0xda);
    }

    #[test]
    fn null_id() {
        assert!(ObjectId::NULL.is_null());
        let oid = ObjectId::from_hex(HEX).unwrap();
        assert!(!oid.is_null());
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(ObjectId::from_bytes(&[0u8; 10]).is_err());
        assert!(ObjectId::from_hex("abcd").is_err());
    }

    #[test]
    fn rejects_non_hex() {
        let bad = "zz39a3ee5e6b4b0d3255bfef95601890afd80709";
        assert!(ObjectId::from_hex(bad).is_err());
    }

    #[test]
    fn debug_shows_short_prefix() {
        let oid = ObjectId::from_hex(HEX).unwrap();
        assert_eq!(format!("{oid:?}"), "ObjectId(da39a3ee)");
    }

    #[test]
    fn loose_path_splits_first_two_chars() {
        let oid = ObjectId::from_hex(HEX).unwrap();
        assert_eq!(oid.loose_path(), format!("da/{}", &HEX[2..]));
    }
}
