use bstr::BString;
use tog_hash::ObjectId;

use crate::ObjectError;

/// The mode bits git stores for a tree entry, decoded to the handful of
/// shapes the tree view actually decorates (§4.9: `/` directory, `@`
/// symlink, `*` executable, `$` submodule).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMode {
    Directory,
    RegularFile,
    ExecutableFile,
    Symlink,
    Submodule,
}

impl FileMode {
    fn from_octal(mode: u32) -> Result<Self, ObjectError> {
        Ok(match mode {
            0o040000 => Self::Directory,
            0o100644 | 0o100664 => Self::RegularFile,
            0o100755 => Self::ExecutableFile,
            0o120000 => Self::Symlink,
            0o160000 => Self::Submodule,
            other => {
                return Err(ObjectError::InvalidTreeEntry {
                    offset: 0,
                    reason: format!("unrecognized file mode {other:o}"),
                })
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub mode: FileMode,
    pub name: BString,
    pub oid: ObjectId,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tree {
    pub entries: Vec<TreeEntry>,
}

impl Tree {
    /// Parse the binary tree format: repeated
    /// `"<octal mode> <name>\0<20 raw oid bytes>"` records.
    pub fn parse(content: &[u8]) -> Result<Self, ObjectError> {
        let mut entries = Vec::new();
        let mut pos = 0;

        while pos < content.len() {
            let start = pos;
            let space = content[pos..]
                .iter()
                .position(|&b| b == b' ')
                .ok_or_else(|| ObjectError::InvalidTreeEntry {
                    offset: start,
                    reason: "missing mode separator".into(),
                })?
                + pos;

            let mode_str = std::str::from_utf8(&content[pos..space]).map_err(|_| {
                ObjectError::InvalidTreeEntry {
                    offset: start,
                    reason: "non-UTF8 mode".into(),
                }
            })?;
            let mode_val = u32::from_str_radix(mode_str, 8).map_err(|_| {
                ObjectError::InvalidTreeEntry {
                    offset: start,
                    reason: format!("invalid octal mode {mode_str:?}"),
                }
            })?;
            let mode = FileMode::from_octal(mode_val)?;

            pos = space + 1;
            let nul = content[pos..]
                .iter()
                .position(|&b| b == 0)
                .ok_or_else(|| ObjectError::InvalidTreeEntry {
                    offset: start,
                    reason: "missing name terminator".into(),
                })?
                + pos;
            let name = BString::from(&content[pos..nul]);

            pos = nul + 1;
            if pos + 20 > content.len() {
                return Err(ObjectError::InvalidTreeEntry {
                    offset: start,
                    reason: "truncated entry oid".into(),
                });
            }
            let oid = ObjectId::from_bytes(&content[pos..pos + 20])?;
            pos += 20;

            entries.push(TreeEntry { mode, name, oid });
        }

        Ok(Self { entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_entry(mode: &str, name: &str, oid: &ObjectId) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(mode.as_bytes());
        buf.push(b' ');
        buf.extend_from_slice(name.as_bytes());
        buf.push(0);
        buf.extend_from_slice(oid.as_bytes());
        buf
    }

    #[test]
    fn parses_mixed_entries() {
        let oid = ObjectId::from_hex("da39a3ee5e6b4b0d3255bfef95601890afd80709").unwrap();
        let mut content = Vec::new();
        content.extend(build_entry("40000", "subdir", &oid));
        content.extend(build_entry("100644", "file.txt", &oid));
        content.extend(build_entry("100755", "run.sh", &oid));
        content.extend(build_entry("120000", "link", &oid));
        content.extend(build_entry("160000", "sub", &oid));

        let tree = Tree::parse(&content).unwrap();
        assert_eq!(tree.entries.len(), 5);
        assert_eq!(tree.entries[0].mode, FileMode::Directory);
        assert_eq!(tree.entries[0].name, "subdir");
        assert_eq!(tree.entries[1].mode, FileMode::RegularFile);
        assert_eq!(tree.entries[2].mode, FileMode::ExecutableFile);
        assert_eq!(tree.entries[3].mode, FileMode::Symlink);
        assert_eq!(tree.entries[4].mode, FileMode::Submodule);
    }

    #[test]
    fn empty_tree_has_no_entries() {
        let tree = Tree::parse(&[]).unwrap();
        assert!(tree.entries.is_empty());
    }

    #[test]
    fn rejects_unknown_mode() {
        let oid = ObjectId::from_hex("da39a3ee5e6b4b0d3255bfef95601890afd80709").unwrap();
        let content = build_entry("777", "weird", &oid);
        assert!(Tree::parse(&content).is_err());
    }
}
