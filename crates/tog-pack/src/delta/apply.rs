//! Apply a delta instruction stream to a base object, producing the target.

use super::DeltaInstruction;
use crate::PackError;

/// Resolve a single delta step against its concrete base bytes.
///
/// Validates the delta's claimed source size against `base`, bounds-checks
/// every copy, and validates the claimed target size against what was
/// actually produced.
pub fn apply_delta(base: &[u8], delta: &[u8]) -> Result<Vec<u8>, PackError> {
    let (source_size, target_size, instructions) = super::parse_delta_instructions(delta)?;

    if source_size != base.len() {
        return Err(PackError::BadPackFile(format!(
            "delta source size mismatch: delta says {source_size}, base is {}",
            base.len()
        )));
    }

    let mut output = Vec::with_capacity(target_size);
    for instruction in &instructions {
        match instruction {
            DeltaInstruction::Copy { offset, size } => {
                let offset = *offset as usize;
                let size = *size;
                let in_bounds = offset.checked_add(size).map(|end| end <= base.len());
                if in_bounds != Some(true) {
                    return Err(PackError::BadPackFile(format!(
                        "delta copy out of bounds: offset={offset}, size={size}, base_len={}",
                        base.len()
                    )));
                }
                output.extend_from_slice(&base[offset..offset + size]);
            }
            DeltaInstruction::Insert(bytes) => output.extend_from_slice(bytes),
        }
    }

    if output.len() != target_size {
        return Err(PackError::BadPackFile(format!(
            "delta target size mismatch: delta says {target_size}, got {}",
            output.len()
        )));
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delta::{encode_copy, encode_insert, write_varint};

    fn build_delta(source_size: usize, target_size: usize, instructions: &[u8]) -> Vec<u8> {
        let mut delta = Vec::new();
        delta.extend_from_slice(&write_varint(source_size));
        delta.extend_from_slice(&write_varint(target_size));
        delta.extend_from_slice(instructions);
        delta
    }

    #[test]
    fn apply_copy_only() {
        let base = b"Hello, World!";
        let mut instructions = Vec::new();
        instructions.extend_from_slice(&encode_copy(0, 5));
        instructions.extend_from_slice(&encode_copy(7, 5));

        let delta = build_delta(base.len(), 10, &instructions);
        let result = apply_delta(base, &delta).unwrap();
        assert_eq!(result, b"HelloWorld");
    }

    #[test]
    fn apply_insert_only() {
        let base = b"unused base";
        let mut instructions = Vec::new();
        instructions.extend_from_slice(&encode_insert(b"NEW"));

        let delta = build_delta(base.len(), 3, &instructions);
        let result = apply_delta(base, &delta).unwrap();
        assert_eq!(result, b"NEW");
    }

    #[test]
    fn apply_mixed_instructions() {
        let base = b"ABCDEFGHIJ";
        let mut instructions = Vec::new();
        instructions.extend_from_slice(&encode_copy(0, 3));
        instructions.extend_from_slice(&encode_insert(b"xyz"));
        instructions.extend_from_slice(&encode_copy(7, 3));

        let delta = build_delta(base.len(), 9, &instructions);
        let result = apply_delta(base, &delta).unwrap();
        assert_eq!(result, b"ABCxyzHIJ");
    }

    #[test]
    fn copy_out_of_bounds_fails() {
        let base = b"short";
        let mut instructions = Vec::new();
        instructions.extend_from_slice(&encode_copy(0, 100));

        let delta = build_delta(base.len(), 100, &instructions);
        assert!(apply_delta(base, &delta).is_err());
    }

    #[test]
    fn target_size_mismatch_fails() {
        let base = b"Hello";
        let mut instructions = Vec::new();
        instructions.extend_from_slice(&encode_copy(0, 5));

        let delta = build_delta(base.len(), 10, &instructions);
        assert!(apply_delta(base, &delta).is_err());
    }

    #[test]
    fn source_size_mismatch_fails() {
        let base = b"Hello";
        let mut instructions = Vec::new();
        instructions.extend_from_slice(&encode_copy(0, 5));

        let delta = build_delta(100, 5, &instructions);
        assert!(apply_delta(base, &delta).is_err());
    }

    #[test]
    fn empty_delta_produces_empty_output() {
        let base = b"anything";
        let delta = build_delta(base.len(), 0, &[]);
        let result = apply_delta(base, &delta).unwrap();
        assert!(result.is_empty());
    }
}
