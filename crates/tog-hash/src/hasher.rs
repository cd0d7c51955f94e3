//! SHA-1 hashing of object content, matching git's `"<kind> <len>\0<content>"`
//! hashing convention, and incremental hashing for checksum trailers.

use sha1::{Digest, Sha1};

use crate::ObjectId;

/// Hash an object's canonical form: `"<kind> <len>\0"` followed by `content`.
pub fn hash_object(kind: &str, content: &[u8]) -> ObjectId {
    let mut hasher = Sha1::new();
    hasher.update(kind.as_bytes());
    hasher.update(b" ");
    hasher.update(content.len().to_string().as_bytes());
    hasher.update(b"\0");
    hasher.update(content);
    ObjectId::from_bytes(&hasher.finalize()).expect("sha1 digest is 20 bytes")
}

/// Incremental SHA-1 hasher used for pack/index trailer checksums.
pub struct RunningHasher(Sha1);

impl RunningHasher {
    pub fn new() -> Self {
        Self(Sha1::new())
    }

    pub fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    pub fn finalize(self) -> ObjectId {
        ObjectId::from_bytes(&self.0.finalize()).expect("sha1 digest is 20 bytes")
    }
}

impl Default for RunningHasher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_object_matches_known_vector() {
        // `git hash-object` on an empty blob is well known.
        let oid = hash_object("blob", b"");
        assert_eq!(oid.to_hex(), "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391");
    }

    #[test]
    fn running_hasher_matches_one_shot() {
        let mut h = RunningHasher::new();
        h.update(b"hello ");
        h.update(b"world");
        let incremental = h.finalize();

        let mut one_shot = Sha1::new();
        one_shot.update(b"hello world");
        let direct = ObjectId::from_bytes(&one_shot.finalize()).unwrap();

        assert_eq!(incremental, direct);
    }
}
