//! Line-level diff edit scripts and hunk building.
//!
//! Grounded on the teacher's `git_diff::algorithm` module — kept to the
//! Myers algorithm alone (the teacher's histogram/patience variants have
//! no counterpart here, since the diff *algorithm* choice is out of
//! scope and only its consumption by the Diff View is in scope).

pub mod myers;

use bstr::BString;

/// An edit operation in the edit script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOp {
    Equal,
    Insert,
    Delete,
}

/// A single edit, referencing lines by index into the old/new sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edit {
    pub op: EditOp,
    pub old_index: usize,
    pub new_index: usize,
}

/// One line of a hunk as it will be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffLine {
    Context(BString),
    Addition(BString),
    Deletion(BString),
}

/// A contiguous run of changed lines plus their surrounding context.
#[derive(Debug, Clone)]
pub struct Hunk {
    pub old_start: u32,
    pub old_count: u32,
    pub new_start: u32,
    pub new_count: u32,
    pub lines: Vec<DiffLine>,
}

/// Compute a line-level diff between two byte slices.
pub fn diff_edits(old: &[u8], new: &[u8], ignore_whitespace: bool) -> Vec<Edit> {
    let old_lines = split_lines(old);
    let new_lines = split_lines(new);
    myers::diff(&old_lines, &new_lines, ignore_whitespace)
}

/// Compute a line-level diff and build hunks with `context_lines` of
/// surrounding context on each side.
pub fn diff_lines(old: &[u8], new: &[u8], context_lines: u32, ignore_whitespace: bool) -> Vec<Hunk> {
    let old_lines = split_lines(old);
    let new_lines = split_lines(new);
    let edits = myers::diff(&old_lines, &new_lines, ignore_whitespace);
    edits_to_hunks(&edits, &old_lines, &new_lines, context_lines)
}

fn edits_to_hunks(
    edits: &[Edit],
    old_lines: &[&[u8]],
    new_lines: &[&[u8]],
    context_lines: u32,
) -> Vec<Hunk> {
    if edits.is_empty() {
        return Vec::new();
    }
    let ctx = context_lines as usize;

    let mut change_ranges: Vec<(usize, usize)> = Vec::new();
    let mut i = 0;
    while i < edits.len() {
        if edits[i].op != EditOp::Equal {
            let start = i;
            while i < edits.len() && edits[i].op != EditOp::Equal {
                i += 1;
            }
            change_ranges.push((start, i));
        } else {
            i += 1;
        }
    }
    if change_ranges.is_empty() {
        return Vec::new();
    }

    let mut merged_ranges: Vec<(usize, usize)> = Vec::new();
    let mut current = change_ranges[0];
    for &(start, end) in &change_ranges[1..] {
        let gap = start - current.1;
        if gap <= 2 * ctx {
            current.1 = end;
        } else {
            merged_ranges.push(current);
            current = (start, end);
        }
    }
    merged_ranges.push(current);

    let mut hunks = Vec::new();
    for (change_start, change_end) in merged_ranges {
        let mut lines = Vec::new();

        let ctx_before_start = change_start.saturating_sub(ctx);
        let old_start;
        let new_start;

        for j in ctx_before_start..change_start {
            let line_data = old_lines[edits[j].old_index];
            lines.push(DiffLine::Context(BString::from(line_data)));
        }
        old_start = edits[ctx_before_start].old_index;
        new_start = edits[ctx_before_start].new_index;

        let mut old_count = lines.len() as u32;
        let mut new_count = lines.len() as u32;
        for j in change_start..change_end {
            match edits[j].op {
                EditOp::Equal => {
                    lines.push(DiffLine::Context(BString::from(old_lines[edits[j].old_index])));
                    old_count += 1;
                    new_count += 1;
                }
                EditOp::Delete => {
                    lines.push(DiffLine::Deletion(BString::from(old_lines[edits[j].old_index])));
                    old_count += 1;
                }
                EditOp::Insert => {
                    lines.push(DiffLine::Addition(BString::from(new_lines[edits[j].new_index])));
                    new_count += 1;
                }
            }
        }

        let ctx_after_end = (change_end + ctx).min(edits.len());
        for j in change_end..ctx_after_end {
            lines.push(DiffLine::Context(BString::from(old_lines[edits[j].old_index])));
            old_count += 1;
            new_count += 1;
        }

        hunks.push(Hunk {
            old_start: (old_start + 1) as u32,
            old_count,
            new_start: (new_start + 1) as u32,
            new_count,
            lines,
        });
    }

    hunks
}

/// Split a byte slice into lines, preserving line endings.
pub fn split_lines(data: &[u8]) -> Vec<&[u8]> {
    if data.is_empty() {
        return Vec::new();
    }
    let mut lines = Vec::new();
    let mut start = 0;
    for (i, &byte) in data.iter().enumerate() {
        if byte == b'\n' {
            lines.push(&data[start..=i]);
            start = i + 1;
        }
    }
    if start < data.len() {
        lines.push(&data[start..]);
    }
    lines
}

/// DJB2a hash of a line, used for fast equality pre-checks.
pub(crate) fn line_hash(line: &[u8]) -> u64 {
    let mut hash: u64 = 5381;
    for &b in line {
        hash = hash.wrapping_mul(33) ^ (b as u64);
    }
    hash
}

/// Line equality under the ignore-whitespace flag: strips all ASCII
/// whitespace before comparing, leaving the original bytes untouched for
/// display.
pub(crate) fn lines_equal(a: &[u8], b: &[u8], ignore_whitespace: bool) -> bool {
    if !ignore_whitespace {
        return a == b;
    }
    a.iter()
        .filter(|b| !b.is_ascii_whitespace())
        .eq(b.iter().filter(|b| !b.is_ascii_whitespace()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_lines_empty() {
        assert!(split_lines(b"").is_empty());
    }

    #[test]
    fn split_lines_no_trailing_newline() {
        let lines = split_lines(b"a\nb");
        assert_eq!(lines, vec![b"a\n".as_slice(), b"b"]);
    }

    #[test]
    fn ignore_whitespace_equality() {
        assert!(lines_equal(b"foo  bar\n", b"foo bar\n", true));
        assert!(!lines_equal(b"foo  bar\n", b"foo bar\n", false));
    }
}
