//! Diff text production for the Diff View: a Myers line diff, rendered as
//! unified-diff text with a parallel line-offset index so the view can
//! scroll and search by line without re-scanning the text.
//!
//! Spec.md §1 treats `diff(a,b,ctx,flags)→text+line_offsets` as an
//! external abstract oracle; this crate is the one concrete
//! implementation `tog-tui` calls through.

pub mod algorithm;
mod error;
mod format;

pub use algorithm::{DiffLine, Hunk};
pub use error::DiffError;

/// The maximum context size the Diff View's `[`/`]` keys can reach
/// (spec §4.7: "current context size in {0..max_context}").
pub const MAX_CONTEXT: u32 = 64;

/// One labeled side of a diff: `None` renders as `/dev/null`.
pub struct Side<'a> {
    pub label: &'a str,
    pub content: Option<&'a [u8]>,
}

impl<'a> Side<'a> {
    pub fn new(label: &'a str, content: Option<&'a [u8]>) -> Self {
        Self { label, content }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DiffOptions {
    pub context_lines: u32,
    pub ignore_whitespace: bool,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self { context_lines: 3, ignore_whitespace: false }
    }
}

/// Unified diff text plus a byte-offset index of each of its lines,
/// enough for the Diff View to scroll to an arbitrary line or binary
/// search for a match position.
pub struct DiffOutput {
    pub text: String,
    pub line_offsets: Vec<usize>,
}

/// Diff two byte buffers, producing unified diff text and its
/// line-offset index. Either side may be absent (diffing against
/// `/dev/null`, e.g. a root commit or a newly added file).
pub fn diff(old: Side<'_>, new: Side<'_>, options: DiffOptions) -> Result<DiffOutput, DiffError> {
    if options.context_lines > MAX_CONTEXT {
        return Err(DiffError::ContextTooLarge(options.context_lines, MAX_CONTEXT));
    }

    let old_bytes = old.content.unwrap_or(b"");
    let new_bytes = new.content.unwrap_or(b"");
    let hunks = algorithm::diff_lines(old_bytes, new_bytes, options.context_lines, options.ignore_whitespace);

    let old_label = if old.content.is_some() { format!("a/{}", old.label) } else { "/dev/null".to_string() };
    let new_label = if new.content.is_some() { format!("b/{}", new.label) } else { "/dev/null".to_string() };

    let text = format::format_unified(&old_label, &new_label, &hunks);
    let line_offsets = line_offsets(&text);

    Ok(DiffOutput { text, line_offsets })
}

/// Byte offset of the start of each line in `text`, including a final
/// entry at `text.len()` so the last line's length can be computed the
/// same way as every other line's.
///
/// Exposed so callers that assemble diff text from several `diff()`
/// calls (e.g. a commit's per-file diffs) can index the concatenated
/// result the same way a single call's `line_offsets` would.
pub fn line_offsets(text: &str) -> Vec<usize> {
    let mut offsets = vec![0];
    for (i, b) in text.bytes().enumerate() {
        if b == b'\n' {
            offsets.push(i + 1);
        }
    }
    if *offsets.last().unwrap() != text.len() {
        offsets.push(text.len());
    }
    offsets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diffs_two_buffers() {
        let old = Side::new("file.txt", Some(b"a\nb\nc\n"));
        let new = Side::new("file.txt", Some(b"a\nx\nc\n"));
        let out = diff(old, new, DiffOptions::default()).unwrap();
        assert!(out.text.contains("-b\n+x\n"));
        assert!(out.line_offsets.len() > 1);
    }

    #[test]
    fn null_old_side_renders_dev_null() {
        let old = Side::new("file.txt", None);
        let new = Side::new("file.txt", Some(b"a\n"));
        let out = diff(old, new, DiffOptions::default()).unwrap();
        assert!(out.text.starts_with("--- /dev/null\n"));
    }

    #[test]
    fn identical_sides_produce_no_hunks() {
        let old = Side::new("file.txt", Some(b"a\n"));
        let new = Side::new("file.txt", Some(b"a\n"));
        let out = diff(old, new, DiffOptions::default()).unwrap();
        assert_eq!(out.text, "");
    }

    #[test]
    fn context_above_max_is_an_error() {
        let old = Side::new("f", Some(b"a\n"));
        let new = Side::new("f", Some(b"b\n"));
        let opts = DiffOptions { context_lines: MAX_CONTEXT + 1, ignore_whitespace: false };
        assert!(diff(old, new, opts).is_err());
    }

    #[test]
    fn line_offsets_index_each_line_start() {
        let offsets = line_offsets("a\nbb\nccc");
        assert_eq!(offsets, vec![0, 2, 5, 8]);
    }
}
