//! Fill-in-the-middle hole insertion.
//!
//! Every maximal run of consecutive flagged lines collapses to a single
//! [`FIM_HOLE`] marker; all other lines are kept verbatim.

use std::collections::BTreeSet;

use crate::scanner::Finding;

/// Opens the code region of a FIM prompt.
pub const FIM_BEGIN: &str = "<｜fim▁begin｜>";
/// Replaces a run of masked lines.
pub const FIM_HOLE: &str = "<｜fim▁hole｜>";
/// Closes the code region of a FIM prompt.
pub const FIM_END: &str = "<｜fim▁end｜>";

/// Union of the lines flagged by `findings`.
pub fn flagged_lines(findings: &[Finding]) -> BTreeSet<usize> {
    findings
        .iter()
        .flat_map(|f| f.lines().iter().copied())
        .collect()
}

/// Replace flagged line runs in `source` with [`FIM_HOLE`].
///
/// Line numbers past the end of `source` never get reached by the walk and
/// are ignored without error.
pub fn insert_holes(source: &str, flagged: &BTreeSet<usize>) -> String {
    let lines = split_lines(source);
    let mut out: Vec<&str> = Vec::with_capacity(lines.len());

    let mut n = 1;
    while n <= lines.len() {
        if flagged.contains(&n) {
            out.push(FIM_HOLE);
            while flagged.contains(&n) {
                n += 1;
            }
        } else {
            out.push(lines[n - 1]);
            n += 1;
        }
    }

    out.join("\n")
}

/// Split on `\r\n`, `\n` or a lone `\r`, the same breaks the lexer and
/// the scanner count. A trailing terminator does not start an empty line.
fn split_lines(source: &str) -> Vec<&str> {
    let bytes = source.as_bytes();
    let mut lines = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\n' => {
                lines.push(&source[start..i]);
                i += 1;
                start = i;
            }
            b'\r' => {
                lines.push(&source[start..i]);
                i += if bytes.get(i + 1) == Some(&b'\n') { 2 } else { 1 };
                start = i;
            }
            _ => i += 1,
        }
    }
    if start < bytes.len() {
        lines.push(&source[start..]);
    }
    lines
}

/// [`insert_holes`] over the lines flagged by `findings`.
pub fn mask_findings(source: &str, findings: &[Finding]) -> String {
    insert_holes(source, &flagged_lines(findings))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(n: usize) -> String {
        (1..=n)
            .map(|i| format!("line{i}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn set(lines: &[usize]) -> BTreeSet<usize> {
        lines.iter().copied().collect()
    }

    #[test]
    fn empty_set_is_identity() {
        let src = numbered(6);
        assert_eq!(insert_holes(&src, &BTreeSet::new()), src);
    }

    #[test]
    fn all_lines_flagged_yields_single_hole() {
        let src = numbered(5);
        assert_eq!(insert_holes(&src, &set(&[1, 2, 3, 4, 5])), FIM_HOLE);
    }

    #[test]
    fn contiguous_runs_collapse() {
        let out = insert_holes(&numbered(8), &set(&[2, 3, 4, 7]));
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines,
            vec!["line1", FIM_HOLE, "line5", "line6", FIM_HOLE, "line8"]
        );
        assert_eq!(out.matches(FIM_HOLE).count(), 2);
    }

    #[test]
    fn masking_own_output_is_stable() {
        let once = insert_holes(&numbered(8), &set(&[1, 4, 5]));
        assert_eq!(insert_holes(&once, &BTreeSet::new()), once);
    }

    #[test]
    fn out_of_range_lines_are_ignored() {
        let src = numbered(3);
        assert_eq!(insert_holes(&src, &set(&[10, 11])), src);
        assert_eq!(
            insert_holes(&src, &set(&[3, 4, 5])),
            format!("line1\nline2\n{FIM_HOLE}")
        );
    }

    #[test]
    fn findings_use_range_when_present() {
        let findings = vec![
            Finding::new(3, "eval"),
            Finding::new(5, "shell").with_range(vec![5, 6]),
        ];
        assert_eq!(flagged_lines(&findings), set(&[3, 5, 6]));

        let out = mask_findings(&numbered(10), &findings);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 9);
        assert_eq!(lines[2], FIM_HOLE);
        assert_eq!(lines[4], FIM_HOLE);
        let kept: Vec<&str> = lines.iter().copied().filter(|l| *l != FIM_HOLE).collect();
        assert_eq!(
            kept,
            vec!["line1", "line2", "line4", "line7", "line8", "line9", "line10"]
        );
    }

    #[test]
    fn order_and_duplicates_do_not_matter() {
        let a = vec![Finding::new(2, "x"), Finding::new(4, "y"), Finding::new(2, "x")];
        let b = vec![Finding::new(4, "y"), Finding::new(2, "x")];
        assert_eq!(
            mask_findings(&numbered(5), &a),
            mask_findings(&numbered(5), &b)
        );
    }

    #[test]
    fn lone_carriage_returns_count_as_line_breaks() {
        let out = insert_holes("import os\rx = input()\ros.system(x)", &set(&[3]));
        assert_eq!(out, format!("import os\nx = input()\n{FIM_HOLE}"));

        let out = insert_holes("a\r\nb\rc\nd\n", &set(&[2, 3]));
        assert_eq!(out, format!("a\n{FIM_HOLE}\nd"));
    }

    #[test]
    fn split_matches_line_iterator_for_plain_newlines() {
        let src = "one\ntwo\r\n\nfour\n";
        assert_eq!(split_lines(src), src.lines().collect::<Vec<_>>());
    }

    #[test]
    fn empty_source() {
        assert_eq!(insert_holes("", &set(&[1])), "");
    }
}
