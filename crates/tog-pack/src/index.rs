//! Pack index (v2) reading and lookup (§4.1).
//!
//! ```text
//! Header:  \xff tOc (4 bytes) | version (4 bytes = 2)
//! Fanout:  256 x 4-byte big-endian cumulative counts
//! OIDs:    N x 20-byte sorted object ids
//! CRC32:   N x 4-byte CRC32 values
//! Offsets: N x 4-byte offsets (high bit set -> index into 64-bit table)
//! 64-bit:  M x 8-byte offsets (packs > 2GiB)
//! Trailer: 20-byte pack id | 20-byte index id
//! ```

use std::path::{Path, PathBuf};

use memmap2::Mmap;
use tog_hash::{ObjectId, OBJECT_ID_LEN};

use crate::{PackError, IDX_SIGNATURE, IDX_VERSION};

/// An open, memory-mapped pack index.
pub struct PackIndex {
    data: Mmap,
    version: u32,
    num_objects: u32,
    fanout_offset: usize,
    oid_offset: usize,
    crc_offset: usize,
    offset32_offset: usize,
    offset64_offset: usize,
    idx_path: PathBuf,
}

impl PackIndex {
    /// Open and validate a `.idx` file, including its trailing checksum.
    pub fn open(idx_path: impl AsRef<Path>) -> Result<Self, PackError> {
        let idx_path = idx_path.as_ref().to_path_buf();
        let file = std::fs::File::open(&idx_path)?;
        let data = unsafe { Mmap::map(&file)? };

        if data.len() < 8 + 1024 + 2 * OBJECT_ID_LEN {
            return Err(PackError::BadPackIndex("file too small".into()));
        }
        if data[0..4] != IDX_SIGNATURE {
            return Err(PackError::BadPackIndex("bad magic".into()));
        }
        let version = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);
        if version != IDX_VERSION {
            return Err(PackError::BadPackIndex(format!(
                "unsupported version {version}, expected {IDX_VERSION}"
            )));
        }

        let fanout_offset = 8;
        let mut prev = 0u32;
        for i in 0..256 {
            let pos = fanout_offset + i * 4;
            let entry = u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]]);
            if entry < prev {
                return Err(PackError::BadPackIndex("fan-out table not monotone".into()));
            }
            prev = entry;
        }
        let num_objects = prev;

        let n = num_objects as usize;
        let oid_offset = fanout_offset + 1024;
        let crc_offset = oid_offset + n * OBJECT_ID_LEN;
        let offset32_offset = crc_offset + n * 4;
        let offset64_offset = offset32_offset + n * 4;

        let min_size = offset64_offset + 2 * OBJECT_ID_LEN;
        if data.len() < min_size {
            return Err(PackError::BadPackIndex(format!(
                "file too small: {} < {min_size}",
                data.len()
            )));
        }

        let index = Self {
            data,
            version,
            num_objects,
            fanout_offset,
            oid_offset,
            crc_offset,
            offset32_offset,
            offset64_offset,
            idx_path,
        };
        index.verify_checksum()?;
        Ok(index)
    }

    fn verify_checksum(&self) -> Result<(), PackError> {
        let trailer_start = self.data.len() - 2 * OBJECT_ID_LEN;
        let mut hasher = tog_hash::RunningHasher::new();
        hasher.update(&self.data[..trailer_start + OBJECT_ID_LEN]);
        let computed = hasher.finalize();
        let expected = ObjectId::from_bytes(
            &self.data[trailer_start + OBJECT_ID_LEN..trailer_start + 2 * OBJECT_ID_LEN],
        )?;
        if computed != expected {
            return Err(PackError::PackIndexChecksum { expected, computed });
        }
        Ok(())
    }

    /// `find(id)`: binary search the fan-out bucket for `id`, returning
    /// its absolute sorted index.
    pub fn find(&self, id: &ObjectId) -> Option<u32> {
        let (lo, hi) = self.fanout_range(id.first_byte());
        if lo >= hi {
            return None;
        }
        let target = id.as_bytes();

        let mut low = lo;
        let mut high = hi;
        while low < high {
            let mid = low + (high - low) / 2;
            match self.oid_bytes_at(mid).cmp(target) {
                std::cmp::Ordering::Less => low = mid + 1,
                std::cmp::Ordering::Greater => high = mid,
                std::cmp::Ordering::Equal => return Some(mid as u32),
            }
        }
        None
    }

    /// Look up an id directly to its pack offset.
    pub fn lookup(&self, id: &ObjectId) -> Option<u64> {
        self.find(id).map(|index| self.offset_at(index))
    }

    /// All (id, offset) pairs whose id starts with `prefix`.
    pub fn lookup_prefix(&self, prefix: &[u8]) -> Vec<(ObjectId, u64)> {
        if prefix.is_empty() {
            return Vec::new();
        }
        let (lo, hi) = self.fanout_range(prefix[0]);
        let mut results = Vec::new();
        for i in lo..hi {
            let bytes = self.oid_bytes_at(i);
            if bytes.len() >= prefix.len() && bytes[..prefix.len()] == *prefix {
                if let Ok(id) = ObjectId::from_bytes(bytes) {
                    results.push((id, self.offset_at(i as u32)));
                }
            }
        }
        results
    }

    pub fn oid_at(&self, index: u32) -> ObjectId {
        let start = self.oid_offset + index as usize * OBJECT_ID_LEN;
        ObjectId::from_bytes(&self.data[start..start + OBJECT_ID_LEN])
            .expect("index entries are validated at open()")
    }

    /// Decode the pack offset at `index` (§4.1 "offset decode").
    pub fn offset_at(&self, index: u32) -> u64 {
        let pos = self.offset32_offset + index as usize * 4;
        let raw = u32::from_be_bytes([
            self.data[pos],
            self.data[pos + 1],
            self.data[pos + 2],
            self.data[pos + 3],
        ]);

        if raw & 0x8000_0000 != 0 {
            let idx64 = (raw & 0x7FFF_FFFF) as usize;
            let pos64 = self.offset64_offset + idx64 * 8;
            u64::from_be_bytes(self.data[pos64..pos64 + 8].try_into().unwrap())
        } else {
            raw as u64
        }
    }

    pub fn crc32_at(&self, index: u32) -> u32 {
        let pos = self.crc_offset + index as usize * 4;
        u32::from_be_bytes([
            self.data[pos],
            self.data[pos + 1],
            self.data[pos + 2],
            self.data[pos + 3],
        ])
    }

    pub fn num_objects(&self) -> u32 {
        self.num_objects
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn path(&self) -> &Path {
        &self.idx_path
    }

    pub fn pack_id(&self) -> ObjectId {
        let start = self.data.len() - 2 * OBJECT_ID_LEN;
        ObjectId::from_bytes(&self.data[start..start + OBJECT_ID_LEN])
            .expect("index trailer validated at open()")
    }

    pub fn index_id(&self) -> ObjectId {
        let start = self.data.len() - OBJECT_ID_LEN;
        ObjectId::from_bytes(&self.data[start..start + OBJECT_ID_LEN])
            .expect("index trailer validated at open()")
    }

    pub fn iter(&self) -> PackIndexIter<'_> {
        PackIndexIter { index: self, pos: 0 }
    }

    /// `(lo, hi)` bounds into the sorted id table for `first_byte`.
    fn fanout_range(&self, first_byte: u8) -> (usize, usize) {
        let end = self.fanout_entry(first_byte) as usize;
        let start = if first_byte == 0 {
            0
        } else {
            self.fanout_entry(first_byte - 1) as usize
        };
        (start, end)
    }

    fn fanout_entry(&self, index: u8) -> u32 {
        let pos = self.fanout_offset + index as usize * 4;
        u32::from_be_bytes([
            self.data[pos],
            self.data[pos + 1],
            self.data[pos + 2],
            self.data[pos + 3],
        ])
    }

    fn oid_bytes_at(&self, index: usize) -> &[u8] {
        let start = self.oid_offset + index * OBJECT_ID_LEN;
        &self.data[start..start + OBJECT_ID_LEN]
    }
}

pub struct PackIndexIter<'a> {
    index: &'a PackIndex,
    pos: u32,
}

impl<'a> Iterator for PackIndexIter<'a> {
    type Item = (ObjectId, u64);

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.index.num_objects {
            return None;
        }
        let id = self.index.oid_at(self.pos);
        let offset = self.index.offset_at(self.pos);
        self.pos += 1;
        Some((id, offset))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.index.num_objects - self.pos) as usize;
        (remaining, Some(remaining))
    }
}

impl<'a> ExactSizeIterator for PackIndexIter<'a> {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    /// Build a synthetic v2 pack index in memory for testing.
    fn build_test_index(entries: &[(ObjectId, u64, u32)]) -> Vec<u8> {
        let mut entries: Vec<_> = entries.to_vec();
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let mut buf = Vec::new();
        buf.extend_from_slice(&IDX_SIGNATURE);
        buf.extend_from_slice(&IDX_VERSION.to_be_bytes());

        let mut fanout = [0u32; 256];
        for (id, _, _) in &entries {
            fanout[id.first_byte() as usize] += 1;
        }
        for i in 1..256 {
            fanout[i] += fanout[i - 1];
        }
        for count in fanout {
            buf.extend_from_slice(&count.to_be_bytes());
        }

        for (id, _, _) in &entries {
            buf.extend_from_slice(id.as_bytes());
        }
        for (_, _, crc) in &entries {
            buf.extend_from_slice(&crc.to_be_bytes());
        }
        for (_, offset, _) in &entries {
            buf.extend_from_slice(&(*offset as u32).to_be_bytes());
        }

        let fake_pack_id = [0u8; OBJECT_ID_LEN];
        buf.extend_from_slice(&fake_pack_id);

        let mut hasher = tog_hash::RunningHasher::new();
        hasher.update(&buf);
        let index_id = hasher.finalize();
        buf.extend_from_slice(index_id.as_bytes());

        buf
    }

    fn write_test_index(dir: &Path, data: &[u8]) -> PathBuf {
        let path = dir.join("test.idx");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(data).unwrap();
        path
    }

    fn make_oid(first_byte: u8, suffix: u8) -> ObjectId {
        let mut bytes = [0u8; OBJECT_ID_LEN];
        bytes[0] = first_byte;
        bytes[OBJECT_ID_LEN - 1] = suffix;
        ObjectId::from_bytes(&bytes).unwrap()
    }

    #[test]
    fn open_and_lookup_single_object() {
        let dir = tempfile::tempdir().unwrap();
        let oid = make_oid(0xab, 0x01);
        let data = build_test_index(&[(oid, 12, 0xdeadbeef)]);
        let path = write_test_index(dir.path(), &data);

        let idx = PackIndex::open(&path).unwrap();
        assert_eq!(idx.num_objects(), 1);
        assert_eq!(idx.version(), 2);
        assert_eq!(idx.lookup(&oid), Some(12));

        let missing = make_oid(0xab, 0x02);
        assert_eq!(idx.lookup(&missing), None);
    }

    #[test]
    fn lookup_multiple_objects() {
        let dir = tempfile::tempdir().unwrap();
        let entries = vec![
            (make_oid(0x00, 0x01), 100, 0x111),
            (make_oid(0x00, 0x02), 200, 0x222),
            (make_oid(0x0a, 0x01), 300, 0x333),
            (make_oid(0xff, 0x01), 400, 0x444),
        ];
        let data = build_test_index(&entries);
        let path = write_test_index(dir.path(), &data);

        let idx = PackIndex::open(&path).unwrap();
        assert_eq!(idx.num_objects(), 4);
        for (oid, offset, _) in &entries {
            assert_eq!(idx.lookup(oid), Some(*offset));
        }
    }

    #[test]
    fn oid_at_returns_sorted_order() {
        let dir = tempfile::tempdir().unwrap();
        let entries = vec![
            (make_oid(0xff, 0x01), 100, 0),
            (make_oid(0x00, 0x01), 200, 0),
            (make_oid(0x55, 0x01), 300, 0),
        ];
        let data = build_test_index(&entries);
        let path = write_test_index(dir.path(), &data);

        let idx = PackIndex::open(&path).unwrap();
        assert_eq!(idx.oid_at(0), make_oid(0x00, 0x01));
        assert_eq!(idx.oid_at(1), make_oid(0x55, 0x01));
        assert_eq!(idx.oid_at(2), make_oid(0xff, 0x01));
    }

    #[test]
    fn crc32_at_matches() {
        let dir = tempfile::tempdir().unwrap();
        let entries = vec![
            (make_oid(0x10, 0x01), 100, 0xAAAA_BBBB),
            (make_oid(0x20, 0x01), 200, 0xCCCC_DDDD),
        ];
        let data = build_test_index(&entries);
        let path = write_test_index(dir.path(), &data);

        let idx = PackIndex::open(&path).unwrap();
        assert_eq!(idx.crc32_at(0), 0xAAAA_BBBB);
        assert_eq!(idx.crc32_at(1), 0xCCCC_DDDD);
    }

    #[test]
    fn iterator_yields_all_entries() {
        let dir = tempfile::tempdir().unwrap();
        let entries = vec![
            (make_oid(0x01, 0x01), 100, 0),
            (make_oid(0x02, 0x01), 200, 0),
            (make_oid(0x03, 0x01), 300, 0),
        ];
        let data = build_test_index(&entries);
        let path = write_test_index(dir.path(), &data);

        let idx = PackIndex::open(&path).unwrap();
        let items: Vec<_> = idx.iter().collect();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].0, make_oid(0x01, 0x01));
        assert_eq!(items[0].1, 100);
    }

    #[test]
    fn lookup_prefix_returns_bucket_matches() {
        let dir = tempfile::tempdir().unwrap();
        let entries = vec![
            (make_oid(0xab, 0x01), 100, 0),
            (make_oid(0xab, 0x02), 200, 0),
            (make_oid(0xac, 0x01), 300, 0),
        ];
        let data = build_test_index(&entries);
        let path = write_test_index(dir.path(), &data);

        let idx = PackIndex::open(&path).unwrap();
        let results = idx.lookup_prefix(&[0xab]);
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn empty_index_has_no_entries() {
        let dir = tempfile::tempdir().unwrap();
        let data = build_test_index(&[]);
        let path = write_test_index(dir.path(), &data);

        let idx = PackIndex::open(&path).unwrap();
        assert_eq!(idx.num_objects(), 0);
        assert_eq!(idx.lookup(&make_oid(0x00, 0x00)), None);
        assert_eq!(idx.iter().count(), 0);
    }

    #[test]
    fn decodes_64bit_offset_indirection() {
        let oid = make_oid(0x42, 0x01);
        let mut buf = Vec::new();
        buf.extend_from_slice(&IDX_SIGNATURE);
        buf.extend_from_slice(&IDX_VERSION.to_be_bytes());

        let mut fanout = [0u32; 256];
        for entry in fanout.iter_mut().skip(0x42) {
            *entry = 1;
        }
        for count in fanout {
            buf.extend_from_slice(&count.to_be_bytes());
        }
        buf.extend_from_slice(oid.as_bytes());
        buf.extend_from_slice(&0u32.to_be_bytes());
        buf.extend_from_slice(&0x8000_0000u32.to_be_bytes());

        let large_offset: u64 = 5 * 1024 * 1024 * 1024;
        buf.extend_from_slice(&large_offset.to_be_bytes());

        buf.extend_from_slice(&[0u8; OBJECT_ID_LEN]);
        let mut hasher = tog_hash::RunningHasher::new();
        hasher.update(&buf);
        buf.extend_from_slice(hasher.finalize().as_bytes());

        let dir = tempfile::tempdir().unwrap();
        let path = write_test_index(dir.path(), &buf);

        let idx = PackIndex::open(&path).unwrap();
        assert_eq!(idx.num_objects(), 1);
        assert_eq!(idx.lookup(&oid), Some(large_offset));
    }

    #[test]
    fn rejects_bad_magic() {
        let dir = tempfile::tempdir().unwrap();
        let mut data = build_test_index(&[(make_oid(1, 1), 1, 1)]);
        data[0] = 0x00;
        let path = write_test_index(dir.path(), &data);
        assert!(PackIndex::open(&path).is_err());
    }

    #[test]
    fn rejects_tampered_checksum() {
        let dir = tempfile::tempdir().unwrap();
        let mut data = build_test_index(&[(make_oid(1, 1), 1, 1)]);
        let last = data.len() - 1;
        data[last] ^= 0xff;
        let path = write_test_index(dir.path(), &data);
        let err = PackIndex::open(&path).unwrap_err();
        assert!(matches!(err, PackError::PackIndexChecksum { .. }));
    }
}
