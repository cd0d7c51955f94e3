/// A blob's raw bytes. The blame view slices these into lines; otherwise
/// the content is opaque (§3: blob content is not interpreted as text by
/// the object store layer).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Blob {
    data: Vec<u8>,
}

impl Blob {
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Split on `\n`, keeping the terminator with each line (matches how
    /// the blame view numbers source lines one-to-one with git's own
    /// notion of a line).
    pub fn lines(&self) -> Vec<&[u8]> {
        let mut lines = Vec::new();
        let mut start = 0;
        for (i, &b) in self.data.iter().enumerate() {
            if b == b'\n' {
                lines.push(&self.data[start..=i]);
                start = i + 1;
            }
        }
        if start < self.data.len() {
            lines.push(&self.data[start..]);
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_lines_keeping_terminators() {
        let blob = Blob::from_bytes(b"a\nb\nc".to_vec());
        let lines = blob.lines();
        assert_eq!(lines, vec![&b"a\n"[..], &b"b\n"[..], &b"c"[..]]);
    }

    #[test]
    fn empty_blob_has_no_lines() {
        let blob = Blob::from_bytes(Vec::new());
        assert!(blob.lines().is_empty());
    }

    #[test]
    fn trailing_newline_does_not_add_empty_line() {
        let blob = Blob::from_bytes(b"a\nb\n".to_vec());
        assert_eq!(blob.lines().len(), 2);
    }
}
