//! Unified diff text formatting, grounded on the teacher's
//! `git_diff::format::unified` — trimmed to the single pieces the Diff
//! View actually renders: `--- `/`+++ ` labels, `@@ -a,b +c,d @@` hunk
//! headers, and context/addition/deletion lines. The teacher's mode
//! headers, rename/copy similarity lines, and index lines describe a
//! `diff --git` *patch*, which this read-only browser never produces.

use bstr::ByteSlice;

use crate::algorithm::{DiffLine, Hunk};

pub fn format_unified(old_label: &str, new_label: &str, hunks: &[Hunk]) -> String {
    let mut out = String::new();
    if hunks.is_empty() {
        return out;
    }
    out.push_str(&format!("--- {old_label}\n"));
    out.push_str(&format!("+++ {new_label}\n"));
    for hunk in hunks {
        format_hunk(&mut out, hunk);
    }
    out
}

fn format_hunk(out: &mut String, hunk: &Hunk) {
    let old_range = if hunk.old_count == 1 {
        format!("{}", hunk.old_start)
    } else {
        format!("{},{}", hunk.old_start, hunk.old_count)
    };
    let new_range = if hunk.new_count == 1 {
        format!("{}", hunk.new_start)
    } else {
        format!("{},{}", hunk.new_start, hunk.new_count)
    };
    out.push_str(&format!("@@ -{old_range} +{new_range} @@\n"));

    for line in &hunk.lines {
        match line {
            DiffLine::Context(content) => {
                out.push(' ');
                out.push_str(&content.to_str_lossy());
            }
            DiffLine::Addition(content) => {
                out.push('+');
                out.push_str(&content.to_str_lossy());
            }
            DiffLine::Deletion(content) => {
                out.push('-');
                out.push_str(&content.to_str_lossy());
            }
        }
        ensure_newline(out);
    }
}

fn ensure_newline(out: &mut String) {
    if !out.ends_with('\n') {
        out.push_str("\n\\ No newline at end of file\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::diff_lines;

    #[test]
    fn formats_a_single_hunk() {
        let old = b"a\nb\nc\n";
        let new = b"a\nx\nc\n";
        let hunks = diff_lines(old, new, 3, false);
        let text = format_unified("a/file", "b/file", &hunks);
        assert!(text.starts_with("--- a/file\n+++ b/file\n"));
        assert!(text.contains("@@ -1,3 +1,3 @@\n"));
        assert!(text.contains("-b\n"));
        assert!(text.contains("+x\n"));
    }

    #[test]
    fn no_newline_at_eof_is_marked() {
        let old = b"a\n";
        let new = b"a\nb";
        let hunks = diff_lines(old, new, 3, false);
        let text = format_unified("a/file", "b/file", &hunks);
        assert!(text.contains("\\ No newline at end of file"));
    }
}
