//! The explicit delta chain structure demanded by §4.3: resolution
//! returns an ordered `(base_type, deltas[])` value rather than directly
//! producing the reconstructed bytes, so callers can inspect or re-apply
//! a chain without re-walking the pack.

use tog_object::ObjectKind;

use crate::delta::apply::apply_delta;
use crate::{PackEntryType, PackError, PackedObject};

/// One link in a delta chain: the delta's own record offset, its kind
/// (offset- or ref-delta), and its decompressed instruction stream.
#[derive(Debug, Clone)]
pub struct DeltaEntry {
    pub offset: u64,
    pub entry_type: PackEntryType,
    pub delta_bytes: Vec<u8>,
}

/// A resolved delta chain: the leaf-first ordered deltas plus the
/// terminal plain-kind base they bottom out at.
#[derive(Debug, Clone)]
pub struct DeltaChain {
    /// Leaf-first: `entries[0]` is the originally requested delta record,
    /// `entries.last()` is the delta applied directly to `base_data`.
    pub entries: Vec<DeltaEntry>,
    pub base_type: ObjectKind,
    pub base_data: Vec<u8>,
}

impl DeltaChain {
    /// Invariant (§4.3): a chain always has at least one entry.
    pub fn new(entries: Vec<DeltaEntry>, base_type: ObjectKind, base_data: Vec<u8>) -> Self {
        debug_assert!(!entries.is_empty(), "delta chain must have at least one entry");
        Self {
            entries,
            base_type,
            base_data,
        }
    }

    /// Apply every delta in the chain, base outward to the leaf, producing
    /// the originally requested object.
    pub fn resolve(&self) -> Result<PackedObject, PackError> {
        let mut data = self.base_data.clone();
        for entry in self.entries.iter().rev() {
            data = apply_delta(&data, &entry.delta_bytes)?;
        }
        Ok(PackedObject {
            kind: self.base_type,
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delta::{encode_copy, encode_insert, write_varint};

    fn make_delta(source_size: usize, target_size: usize, instructions: &[u8]) -> Vec<u8> {
        let mut delta = Vec::new();
        delta.extend_from_slice(&write_varint(source_size));
        delta.extend_from_slice(&write_varint(target_size));
        delta.extend_from_slice(instructions);
        delta
    }

    #[test]
    fn resolves_single_link_chain() {
        let base = b"Hello, World!".to_vec();
        let mut instructions = Vec::new();
        instructions.extend_from_slice(&encode_copy(0, 5));
        instructions.extend_from_slice(&encode_insert(b"!"));
        let delta_bytes = make_delta(base.len(), 6, &instructions);

        let chain = DeltaChain::new(
            vec![DeltaEntry {
                offset: 100,
                entry_type: PackEntryType::OfsDelta { base_offset: 0 },
                delta_bytes,
            }],
            ObjectKind::Blob,
            base,
        );

        let resolved = chain.resolve().unwrap();
        assert_eq!(resolved.kind, ObjectKind::Blob);
        assert_eq!(resolved.data, b"Hello!");
    }

    #[test]
    fn resolves_multi_link_chain_in_order() {
        // base -> mid ("Hello" + "X") -> leaf (mid + "Y")
        let base = b"Hello".to_vec();

        let mut mid_instructions = Vec::new();
        mid_instructions.extend_from_slice(&encode_copy(0, 5));
        mid_instructions.extend_from_slice(&encode_insert(b"X"));
        let mid_delta = make_delta(base.len(), 6, &mid_instructions);

        let mut leaf_instructions = Vec::new();
        leaf_instructions.extend_from_slice(&encode_copy(0, 6));
        leaf_instructions.extend_from_slice(&encode_insert(b"Y"));
        let leaf_delta = make_delta(6, 7, &leaf_instructions);

        let chain = DeltaChain::new(
            vec![
                DeltaEntry {
                    offset: 200,
                    entry_type: PackEntryType::OfsDelta { base_offset: 100 },
                    delta_bytes: leaf_delta,
                },
                DeltaEntry {
                    offset: 100,
                    entry_type: PackEntryType::OfsDelta { base_offset: 0 },
                    delta_bytes: mid_delta,
                },
            ],
            ObjectKind::Blob,
            base,
        );

        let resolved = chain.resolve().unwrap();
        assert_eq!(resolved.data, b"HelloXY");
    }
}
