//! PackFile: reading `.pack` files (§4.2) and driving delta chain
//! resolution (§4.3) against their paired index.

use std::io::Read;
use std::path::{Path, PathBuf};

use flate2::bufread::ZlibDecoder;
use memmap2::Mmap;
use tog_hash::ObjectId;

use crate::chain::{DeltaChain, DeltaEntry};
use crate::entry::parse_entry_header;
use crate::index::PackIndex;
use crate::{
    PackEntryType, PackError, PackedObject, MAX_DELTA_CHAIN_DEPTH, PACK_HEADER_SIZE,
    PACK_SIGNATURE, PACK_VERSION,
};

/// Result of locating an object's record without applying its delta
/// chain. Plain entries are already final; delta entries still need
/// [`DeltaChain::resolve`] (exposed here as [`Located::resolve`]).
pub enum Located {
    Plain {
        kind: tog_object::ObjectKind,
        data: Vec<u8>,
    },
    Delta(DeltaChain),
}

impl Located {
    pub fn resolve(self) -> Result<PackedObject, PackError> {
        match self {
            Located::Plain { kind, data } => Ok(PackedObject { kind, data }),
            Located::Delta(chain) => chain.resolve(),
        }
    }
}

/// A memory-mapped pack file paired with its index.
pub struct PackFile {
    data: Mmap,
    index: PackIndex,
    pack_path: PathBuf,
    num_objects: u32,
}

impl PackFile {
    /// Open a `.pack` file and its companion `.idx` (same stem).
    pub fn open(pack_path: impl AsRef<Path>) -> Result<Self, PackError> {
        let pack_path = pack_path.as_ref().to_path_buf();
        let idx_path = pack_path.with_extension("idx");

        let file = std::fs::File::open(&pack_path)?;
        let data = unsafe { Mmap::map(&file)? };

        if data.len() < PACK_HEADER_SIZE {
            return Err(PackError::BadPackFile("file too small".into()));
        }
        if &data[0..4] != PACK_SIGNATURE {
            return Err(PackError::BadPackFile("bad PACK signature".into()));
        }
        let version = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);
        if version != PACK_VERSION {
            return Err(PackError::BadPackFile(format!(
                "unsupported pack version {version}"
            )));
        }
        let num_objects = u32::from_be_bytes([data[8], data[9], data[10], data[11]]);

        let index = PackIndex::open(&idx_path)?;
        if index.num_objects() != num_objects {
            return Err(PackError::BadPackFile(format!(
                "pack has {num_objects} objects but index has {}",
                index.num_objects()
            )));
        }

        Ok(Self {
            data,
            index,
            pack_path,
            num_objects,
        })
    }

    /// Read an object by id, resolving any delta chain. `None` if not in
    /// this pack's index.
    pub fn read_object(&self, id: &ObjectId) -> Result<Option<PackedObject>, PackError> {
        match self.index.lookup(id) {
            Some(offset) => self.read_at_offset(offset).map(Some),
            None => Ok(None),
        }
    }

    /// Read an object at a known record offset, resolving ref-deltas
    /// against an external resolver when their base isn't in this pack.
    pub fn read_object_with_resolver(
        &self,
        id: &ObjectId,
        resolver: impl Fn(&ObjectId) -> Option<(tog_object::ObjectKind, Vec<u8>)>,
    ) -> Result<Option<PackedObject>, PackError> {
        match self.index.lookup(id) {
            Some(offset) => self
                .read_at_offset_with_resolver(offset, resolver)
                .map(Some),
            None => Ok(None),
        }
    }

    pub fn read_at_offset(&self, offset: u64) -> Result<PackedObject, PackError> {
        self.read_at_offset_with_resolver(offset, |_| None)
    }

    fn read_at_offset_with_resolver(
        &self,
        offset: u64,
        resolver: impl Fn(&ObjectId) -> Option<(tog_object::ObjectKind, Vec<u8>)>,
    ) -> Result<PackedObject, PackError> {
        self.locate_at_offset_with_resolver(offset, resolver)?.resolve()
    }

    /// Locate an object at a known record offset without applying its
    /// delta chain yet (§4.4's `open`: "chain populated for delta entries
    /// at open time"). `extract` is then just [`Located::resolve`].
    pub fn locate_at_offset(&self, offset: u64) -> Result<Located, PackError> {
        self.locate_at_offset_with_resolver(offset, |_| None)
    }

    /// Same as [`Self::locate_at_offset`], but resolves ref-delta bases
    /// that aren't in this pack's index through an external resolver.
    pub fn locate_at_offset_with_resolver(
        &self,
        offset: u64,
        resolver: impl Fn(&ObjectId) -> Option<(tog_object::ObjectKind, Vec<u8>)>,
    ) -> Result<Located, PackError> {
        let mut entries: Vec<DeltaEntry> = Vec::new();
        let mut current_offset = offset;

        for depth in 0..=MAX_DELTA_CHAIN_DEPTH {
            if depth == MAX_DELTA_CHAIN_DEPTH {
                return Err(PackError::BadPackFile(format!(
                    "delta chain exceeds max depth {MAX_DELTA_CHAIN_DEPTH} starting at offset {offset}"
                )));
            }

            let header = parse_entry_header(&self.data[current_offset as usize..], current_offset)?;
            let compressed = &self.data[header.data_offset as usize..];
            let decompressed = inflate(compressed, header.uncompressed_size, current_offset)?;

            match header.entry_type {
                PackEntryType::Commit | PackEntryType::Tree | PackEntryType::Blob | PackEntryType::Tag => {
                    let base_type = header
                        .entry_type
                        .to_object_kind()
                        .expect("non-delta entry type");
                    if entries.is_empty() {
                        return Ok(Located::Plain {
                            kind: base_type,
                            data: decompressed,
                        });
                    }
                    return Ok(Located::Delta(DeltaChain::new(entries, base_type, decompressed)));
                }
                PackEntryType::OfsDelta { base_offset } => {
                    entries.push(DeltaEntry {
                        offset: current_offset,
                        entry_type: header.entry_type,
                        delta_bytes: decompressed,
                    });
                    current_offset = base_offset;
                }
                PackEntryType::RefDelta { base_oid } => {
                    if let Some(base_offset) = self.index.lookup(&base_oid) {
                        entries.push(DeltaEntry {
                            offset: current_offset,
                            entry_type: header.entry_type,
                            delta_bytes: decompressed,
                        });
                        current_offset = base_offset;
                    } else if let Some((base_type, base_data)) = resolver(&base_oid) {
                        entries.push(DeltaEntry {
                            offset: current_offset,
                            entry_type: header.entry_type,
                            delta_bytes: decompressed,
                        });
                        return Ok(Located::Delta(DeltaChain::new(entries, base_type, base_data)));
                    } else {
                        return Err(PackError::BadPackFile(format!(
                            "ref-delta base {base_oid} not found"
                        )));
                    }
                }
            }
        }

        unreachable!("loop always returns or errors before exhausting MAX_DELTA_CHAIN_DEPTH")
    }

    /// Record offset for `id` in this pack's index, if present.
    pub fn offset_of(&self, id: &ObjectId) -> Option<u64> {
        self.index.lookup(id)
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.index.lookup(id).is_some()
    }

    pub fn num_objects(&self) -> u32 {
        self.num_objects
    }

    pub fn index(&self) -> &PackIndex {
        &self.index
    }

    pub fn path(&self) -> &Path {
        &self.pack_path
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

fn inflate(compressed: &[u8], expected_size: usize, offset: u64) -> Result<Vec<u8>, PackError> {
    let mut decoder = ZlibDecoder::new(compressed);
    let mut buf = Vec::with_capacity(expected_size);
    decoder
        .read_to_end(&mut buf)
        .map_err(|_| PackError::BadPackFile(format!("corrupt zlib payload at offset {offset}")))?;
    Ok(buf)
}
