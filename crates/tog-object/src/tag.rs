use bstr::BString;
use tog_hash::ObjectId;

use crate::{parse_oid, signature::Signature, ObjectError, ObjectKind};

/// An annotated tag: a named pointer to another object plus a message.
/// The ref view dereferences these to their target commit (§4.9).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub object: ObjectId,
    pub target_kind: ObjectKind,
    pub name: BString,
    pub tagger: Option<Signature>,
    pub message: BString,
}

impl Tag {
    pub fn parse(content: &[u8]) -> Result<Self, ObjectError> {
        let mut object = None;
        let mut target_kind = None;
        let mut name = None;
        let mut tagger = None;

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
                    b"object" => object = Some(parse_oid(value)?),
                    b"type" => target_kind = Some(ObjectKind::from_bytes(value)?),
                    b"tag" => name = Some(BString::from(value)),
                    b"tagger" => tagger = Signature::parse(value),
                    _ => {}
                }
            }
            pos = line_end + 1;
        }

        let message = BString::from(&content[pos.min(content.len())..]);

        Ok(Self {
            object: object.ok_or(ObjectError::MissingField { field: "object" })?,
            target_kind: target_kind.ok_or(ObjectError::MissingField { field: "type" })?,
            name: name.ok_or(ObjectError::MissingField { field: "tag" })?,
            tagger,
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"object da39a3ee5e6b4b0d3255bfef95601890afd80709\n");
        buf.extend_from_slice(b"type commit\n");
        buf.extend_from_slice(b"tag v1.0\n");
        buf.extend_from_slice(b"tagger A U Thor <a@example.com> 1700000000 +0000\n");
        buf.extend_from_slice(b"\n");
        buf.extend_from_slice(b"release notes\n");
        buf
    }

    #[test]
    fn parses_annotated_tag() {
        let tag = Tag::parse(&sample()).unwrap();
        assert_eq!(tag.name, "v1.0");
        assert_eq!(tag.target_kind, ObjectKind::Commit);
        assert!(tag.tagger.is_some());
        assert_eq!(tag.message, "release notes\n");
    }

    #[test]
    fn missing_tag_name_is_an_error() {
        let data = b"object da39a3ee5e6b4b0d3255bfef95601890afd80709\ntype commit\n\nmsg\n";
        assert!(Tag::parse(data).is_err());
    }

    #[test]
    fn tagger_is_optional() {
        let data = b"object da39a3ee5e6b4b0d3255bfef95601890afd80709\ntype commit\ntag lightweight-ish\n\nm\n";
        let tag = Tag::parse(data).unwrap();
        assert!(tag.tagger.is_none());
    }
}
