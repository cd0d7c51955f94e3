use std::fs;
use std::io::Read;

use flate2::read::ZlibDecoder;
use tog_object::{Object, ObjectKind, RawObject};

use crate::{LooseError, LooseObjectStore};

impl LooseObjectStore {
    pub fn contains(&self, id: &tog_hash::ObjectId) -> bool {
        self.object_path(id).is_file()
    }

    /// Read and parse a loose object. `Ok(None)` if it doesn't exist.
    pub fn read(&self, id: &tog_hash::ObjectId) -> Result<Option<Object>, LooseError> {
        let Some(decompressed) = self.read_raw(id)? else {
            return Ok(None);
        };
        let (kind, content) = split_header(&decompressed, id)?;
        Ok(Some(Object::parse(&RawObject {
            kind,
            data: content.to_vec(),
        })?))
    }

    /// Read a loose object and verify its content hashes to `id`.
    pub fn read_verified(&self, id: &tog_hash::ObjectId) -> Result<Option<Object>, LooseError> {
        let Some(decompressed) = self.read_raw(id)? else {
            return Ok(None);
        };
        let (kind, content) = split_header(&decompressed, id)?;
        let actual = tog_hash::hasher::hash_object(kind.as_str(), content);
        if actual != *id {
            return Err(LooseError::HashMismatch {
                path: self.object_path(id),
                expected: id.to_hex(),
                actual: actual.to_hex(),
            });
        }
        Ok(Some(Object::parse(&RawObject {
            kind,
            data: content.to_vec(),
        })?))
    }

    fn read_raw(&self, id: &tog_hash::ObjectId) -> Result<Option<Vec<u8>>, LooseError> {
        let path = self.object_path(id);
        let compressed = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(LooseError::Io(e)),
        };
        let mut decoder = ZlibDecoder::new(&compressed[..]);
        let mut decompressed = Vec::new();
        decoder.read_to_end(&mut decompressed)?;
        Ok(Some(decompressed))
    }
}

/// Split `"<kind> <size>\0<content>"` into its kind and content slice.
fn split_header<'a>(
    data: &'a [u8],
    id: &tog_hash::ObjectId,
) -> Result<(ObjectKind, &'a [u8]), LooseError> {
    let nul = data.iter().position(|&b| b == 0).ok_or_else(|| LooseError::Corrupt {
        id: id.to_hex(),
        reason: "missing header terminator".into(),
    })?;
    let header = &data[..nul];
    let space = header.iter().position(|&b| b == b' ').ok_or_else(|| LooseError::Corrupt {
        id: id.to_hex(),
        reason: "missing header separator".into(),
    })?;
    let kind = ObjectKind::from_bytes(&header[..space])?;
    Ok((kind, &data[nul + 1..]))
}
