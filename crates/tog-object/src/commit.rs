use bstr::BString;
use tog_hash::ObjectId;

use crate::{parse_oid, signature::Signature, ObjectError};

/// A commit object, trimmed to the fields the log/blame/tree views render:
/// tree, parents, author/committer identity, and message. Extra headers
/// (`gpgsig`, `mergetag`, `encoding`, ...) are out of scope per §3.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub tree: ObjectId,
    pub parents: Vec<ObjectId>,
    pub author: Signature,
    pub committer: Signature,
    pub message: BString,
}

impl Commit {
    pub fn parse(content: &[u8]) -> Result<Self, ObjectError> {
        let mut tree = None;
        let mut parents = Vec::new();
        let mut author = None;
        let mut committer = None;

        let mut pos = 0;
        loop {
            if pos >= content.len() {
                break;
            }
            if content[pos] == b'\n' {
                pos += 1;
                break;
            }
            let line_end = content[pos..]
                .iter()
                .position(|&b| b == b'\n')
                .map(|p| p + pos)
                .unwrap_or(content.len());
            let line = &content[pos..line_end];

            if let Some(space) = line.iter().position(|&b| b == b' ') {
                let key = &line[..space];
                let value = &line[space + 1..];
                match key {
                    b"tree" => tree = Some(parse_oid(value)?),
                    b"parent" => parents.push(parse_oid(value)?),
                    b"author" => author = Signature::parse(value),
                    b"committer" => committer = Signature::parse(value),
                    _ => {} // extra headers are out of scope
                }
            }
            pos = line_end + 1;
        }

        let message = BString::from(&content[pos.min(content.len())..]);

        Ok(Self {
            tree: tree.ok_or(ObjectError::MissingField { field: "tree" })?,
            parents,
            author: author.ok_or(ObjectError::MissingField { field: "author" })?,
            committer: committer.ok_or(ObjectError::MissingField { field: "committer" })?,
            message,
        })
    }

    /// The first parent, if any (used to diff a commit against its
    /// predecessor, §4.7/§4.8 navigation rules).
    pub fn first_parent(&self) -> Option<ObjectId> {
        self.parents.first().copied()
    }
}
