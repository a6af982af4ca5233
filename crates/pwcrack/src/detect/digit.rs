//! Digit-run detection: every maximal digit run in an unlabeled segment
//! becomes its own `D<n>` segment.

use super::{merge_adjacent_unlabeled, RawSegment};
use crate::types::Label;

/// Run digit detection over a pipeline of segments. Must run after year
/// detection so that `(19|20)\d\d` runs are claimed first.
pub fn detect(segments: Vec<RawSegment>) -> Vec<RawSegment> {
    let mut out = Vec::with_capacity(segments.len());
    for seg in segments {
        if seg.label.is_some() {
            out.push(seg);
            continue;
        }
        out.extend(split_digit_runs(&seg.text));
    }
    merge_adjacent_unlabeled(out)
}

fn split_digit_runs(text: &str) -> Vec<RawSegment> {
    let chars: Vec<char> = text.chars().collect();
    let mut out = Vec::new();
    let mut buf = String::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i].is_ascii_digit() {
            if !buf.is_empty() {
                out.push(RawSegment::unlabeled(std::mem::take(&mut buf)));
            }
            let start = i;
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
            let run: String = chars[start..i].iter().collect();
            out.push(RawSegment::labeled(run, Label::Digit));
        } else {
            buf.push(chars[i]);
            i += 1;
        }
    }
    if !buf.is_empty() {
        out.push(RawSegment::unlabeled(buf));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_a_single_digit_run() {
        let out = detect(vec![RawSegment::unlabeled("abc12345def")]);
        assert_eq!(
            out,
            vec![
                RawSegment::unlabeled("abc"),
                RawSegment::labeled("12345", Label::Digit),
                RawSegment::unlabeled("def"),
            ]
        );
    }

    #[test]
    fn splits_multiple_digit_runs_in_one_segment() {
        let out = detect(vec![RawSegment::unlabeled("a1b22c333")]);
        assert_eq!(
            out,
            vec![
                RawSegment::unlabeled("a"),
                RawSegment::labeled("1", Label::Digit),
                RawSegment::unlabeled("b"),
                RawSegment::labeled("22", Label::Digit),
                RawSegment::unlabeled("c"),
                RawSegment::labeled("333", Label::Digit),
            ]
        );
    }
}
