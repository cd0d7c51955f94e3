//! Unified object store facade (§4.4): `open`/`extract` across every
//! pack index and the loose-object backing in a repository's `objects/`
//! directory.
//!
//! Grounded on `git_odb::ObjectDatabase`'s shape (a pack list behind a
//! lock, a loose store alongside, `discover_packs` sorting newest-first
//! and skipping corrupt packs), trimmed of the teacher's write path,
//! object cache, alternates, and multi-hash-algorithm support — none of
//! which the spec names.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;

use tog_hash::ObjectId;
use tog_object::{Object, ObjectKind, RawObject};
use tog_pack::pack::PackFile;

/// Errors from opening or extracting objects through the facade.
#[derive(Debug, thiserror::Error)]
pub enum OdbError {
    #[error("no such object: {0}")]
    NoSuchObject(ObjectId),

    #[error(transparent)]
    Pack(#[from] tog_pack::PackError),

    #[error(transparent)]
    Loose(#[from] tog_loose::LooseError),

    #[error(transparent)]
    Object(#[from] tog_object::ObjectError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Where `open` found an object. Loose hits are already fully parsed;
/// pack hits still need [`ObjectStore::extract`] to inflate (and, for
/// delta entries, apply) their record.
#[derive(Clone, Copy)]
enum Location {
    Packed { pack_index: usize, offset: u64 },
    Loose,
}

/// Handle returned by `open`, naming where the object lives without
/// re-searching the pack directory.
pub struct OpenedObject {
    pub id: ObjectId,
    location: Location,
}

struct PackCache {
    packs: Vec<PackFile>,
    pack_dir_mtime: Option<SystemTime>,
}

/// A unified view over a repository's packed and loose objects.
///
/// `open` never decompresses; it only locates an object's record and,
/// for delta entries, walks and decompresses the chain's links up to
/// (but not including) applying them (§4.4: "chain populated for delta
/// entries at open time"). `extract` does the final byte-reconstruction
/// and header parse.
pub struct ObjectStore {
    loose: tog_loose::LooseObjectStore,
    packs: Mutex<PackCache>,
    objects_dir: PathBuf,
}

impl ObjectStore {
    /// Open the object store rooted at a repository's `objects/`
    /// directory.
    pub fn open(objects_dir: impl AsRef<Path>) -> Result<Self, OdbError> {
        let objects_dir = objects_dir.as_ref().to_path_buf();
        let loose = tog_loose::LooseObjectStore::open(&objects_dir);
        let (packs, pack_dir_mtime) = Self::discover_packs(&objects_dir)?;
        Ok(Self {
            loose,
            packs: Mutex::new(PackCache { packs, pack_dir_mtime }),
            objects_dir,
        })
    }

    /// §4.4 `open(id)`: search every pack index in undefined order; on
    /// miss consult loose-object backing; else [`OdbError::NoSuchObject`].
    pub fn open_object(&self, id: &ObjectId) -> Result<OpenedObject, OdbError> {
        let packs = self.packs.lock().unwrap();
        for (pack_index, pack) in packs.packs.iter().enumerate() {
            if let Some(offset) = pack.offset_of(id) {
                return Ok(OpenedObject {
                    id: *id,
                    location: Location::Packed { pack_index, offset },
                });
            }
        }
        drop(packs);

        if self.loose.contains(id) {
            return Ok(OpenedObject { id: *id, location: Location::Loose });
        }

        Err(OdbError::NoSuchObject(*id))
    }

    /// §4.4 `extract(object)`: plain kinds inflate directly at their
    /// payload offset; delta kinds recursively extract their base and
    /// apply deltas upward. Ref-delta bases outside the owning pack are
    /// resolved by searching the other open packs.
    pub fn extract(&self, handle: &OpenedObject) -> Result<Object, OdbError> {
        match handle.location {
            Location::Loose => self
                .loose
                .read(&handle.id)?
                .ok_or(OdbError::NoSuchObject(handle.id)),
            Location::Packed { pack_index, offset } => {
                let packs = self.packs.lock().unwrap();
                let pack = &packs.packs[pack_index];
                let located = pack.locate_at_offset_with_resolver(offset, |base_oid| {
                    Self::resolve_ref_delta_base(&packs.packs, pack_index, base_oid)
                })?;
                let packed = located.resolve()?;
                Ok(Object::parse(&RawObject {
                    kind: packed.kind,
                    data: packed.data,
                })?)
            }
        }
    }

    /// Existence check across packs and loose storage, without parsing.
    pub fn contains(&self, id: &ObjectId) -> bool {
        let packs = self.packs.lock().unwrap();
        packs.packs.iter().any(|pack| pack.contains(id)) || self.loose.contains(id)
    }

    /// Re-scan the pack directory. Cheap no-op unless its mtime moved
    /// since the last open or refresh (§2.5's "handle-cache...shared
    /// small handle cache").
    pub fn refresh(&self) -> Result<(), OdbError> {
        let mut packs = self.packs.lock().unwrap();
        let current_mtime = Self::pack_dir_mtime(&self.objects_dir);
        if current_mtime == packs.pack_dir_mtime {
            return Ok(());
        }
        let (fresh, mtime) = Self::discover_packs(&self.objects_dir)?;
        packs.packs = fresh;
        packs.pack_dir_mtime = mtime;
        Ok(())
    }

    fn resolve_ref_delta_base(
        packs: &[PackFile],
        skip: usize,
        base_oid: &ObjectId,
    ) -> Option<(ObjectKind, Vec<u8>)> {
        packs
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != skip)
            .find_map(|(_, pack)| pack.read_object(base_oid).ok().flatten())
            .map(|packed| (packed.kind, packed.data))
    }

    fn pack_dir_mtime(objects_dir: &Path) -> Option<SystemTime> {
        std::fs::metadata(objects_dir.join("pack"))
            .and_then(|m| m.modified())
            .ok()
    }

    /// Every `*.pack` in `objects/pack`, newest-first by mtime, silently
    /// skipping packs that fail to open (their objects fall back to
    /// whichever other pack or loose path still has them).
    fn discover_packs(objects_dir: &Path) -> Result<(Vec<PackFile>, Option<SystemTime>), OdbError> {
        let pack_dir = objects_dir.join("pack");
        let mtime = Self::pack_dir_mtime(objects_dir);
        if !pack_dir.is_dir() {
            return Ok((Vec::new(), mtime));
        }

        let mut entries: Vec<_> = std::fs::read_dir(&pack_dir)?.filter_map(|e| e.ok()).collect();
        entries.sort_by(|a, b| {
            let a_time = a.metadata().and_then(|m| m.modified()).ok();
            let b_time = b.metadata().and_then(|m| m.modified()).ok();
            b_time.cmp(&a_time)
        });

        let mut packs = Vec::new();
        for entry in entries {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "pack") {
                if let Ok(pack) = PackFile::open(&path) {
                    packs.push(pack);
                }
            }
        }
        Ok((packs, mtime))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tog_pack::entry::encode_entry_header;

    fn write_loose_blob(objects_dir: &Path, content: &[u8]) -> ObjectId {
        let id = tog_hash::hasher::hash_object("blob", content);
        let mut raw = Vec::new();
        raw.extend_from_slice(b"blob ");
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

    fn build_test_idx(entries: &[(ObjectId, u64, u32)], pack_id: &[u8]) -> Vec<u8> {
        let mut sorted: Vec<_> = entries.to_vec();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));

        let mut buf = Vec::new();
        buf.extend_from_slice(&tog_pack::IDX_SIGNATURE);
        buf.extend_from_slice(&tog_pack::IDX_VERSION.to_be_bytes());

        let mut fanout = [0u32; 256];
        for (id, _, _) in &sorted {
            fanout[id.first_byte() as usize] += 1;
        }
        for i in 1..256 {
            fanout[i] += fanout[i - 1];
        }
        for count in fanout {
            buf.extend_from_slice(&count.to_be_bytes());
        }
        for (id, _, _) in &sorted {
            buf.extend_from_slice(id.as_bytes());
        }
        for (_, _, crc) in &sorted {
            buf.extend_from_slice(&crc.to_be_bytes());
        }
        for (_, offset, _) in &sorted {
            buf.extend_from_slice(&(*offset as u32).to_be_bytes());
        }
        buf.extend_from_slice(pack_id);

        let mut hasher = tog_hash::RunningHasher::new();
        hasher.update(&buf);
        buf.extend_from_slice(hasher.finalize().as_bytes());
        buf
    }

    /// Write a single-blob pack + index under `objects_dir/pack/`.
    fn write_test_pack(objects_dir: &Path, name: &str, content: &[u8]) -> ObjectId {
        let pack_dir = objects_dir.join("pack");
        std::fs::create_dir_all(&pack_dir).unwrap();

        let header = encode_entry_header(3, content.len() as u64);
        let mut compressed = Vec::new();
        {
            let mut enc = ZlibEncoder::new(&mut compressed, Compression::default());
            enc.write_all(content).unwrap();
            enc.finish().unwrap();
        }

        let mut pack_data = Vec::new();
        pack_data.extend_from_slice(tog_pack::PACK_SIGNATURE);
        pack_data.extend_from_slice(&tog_pack::PACK_VERSION.to_be_bytes());
        pack_data.extend_from_slice(&1u32.to_be_bytes());
        pack_data.extend_from_slice(&header);
        pack_data.extend_from_slice(&compressed);

        let oid = tog_hash::hasher::hash_object("blob", content);
        let crc = {
            let mut h = crc32fast::Hasher::new();
            h.update(&header);
            h.update(&compressed);
            h.finalize()
        };

        let pack_id = {
            let mut h = tog_hash::RunningHasher::new();
            h.update(&pack_data);
            h.finalize()
        };
        pack_data.extend_from_slice(pack_id.as_bytes());

        std::fs::write(pack_dir.join(format!("{name}.pack")), &pack_data).unwrap();
        let idx_data = build_test_idx(&[(oid, 12, crc)], pack_id.as_bytes());
        std::fs::write(pack_dir.join(format!("{name}.idx")), &idx_data).unwrap();

        oid
    }

    #[test]
    fn finds_object_in_pack() {
        let dir = tempfile::tempdir().unwrap();
        let oid = write_test_pack(dir.path(), "pack-a", b"packed content");

        let store = ObjectStore::open(dir.path()).unwrap();
        assert!(store.contains(&oid));
        let handle = store.open_object(&oid).unwrap();
        let obj = store.extract(&handle).unwrap();
        assert_eq!(obj.as_blob().unwrap().as_bytes(), b"packed content");
    }

    #[test]
    fn falls_back_to_loose_on_pack_miss() {
        let dir = tempfile::tempdir().unwrap();
        write_test_pack(dir.path(), "pack-a", b"packed content");
        let loose_id = write_loose_blob(dir.path(), b"loose content");

        let store = ObjectStore::open(dir.path()).unwrap();
        let handle = store.open_object(&loose_id).unwrap();
        let obj = store.extract(&handle).unwrap();
        assert_eq!(obj.as_blob().unwrap().as_bytes(), b"loose content");
    }

    #[test]
    fn missing_object_is_no_such_object() {
        let dir = tempfile::tempdir().unwrap();
        let store = ObjectStore::open(dir.path()).unwrap();
        let missing = ObjectId::from_hex("0000000000000000000000000000000000000001").unwrap();
        assert!(!store.contains(&missing));
        assert!(matches!(
            store.open_object(&missing),
            Err(OdbError::NoSuchObject(_))
        ));
    }

    #[test]
    fn empty_objects_dir_has_no_packs() {
        let dir = tempfile::tempdir().unwrap();
        let store = ObjectStore::open(dir.path()).unwrap();
        let missing = ObjectId::from_hex("0000000000000000000000000000000000000001").unwrap();
        assert!(!store.contains(&missing));
    }

    #[test]
    fn refresh_picks_up_newly_added_pack() {
        let dir = tempfile::tempdir().unwrap();
        let store = ObjectStore::open(dir.path()).unwrap();

        let oid = write_test_pack(dir.path(), "pack-a", b"added after open");
        assert!(!store.contains(&oid));

        store.refresh().unwrap();
        assert!(store.contains(&oid));
    }
}
