//! Alphabet-run detection: splits unlabeled text on alpha/non-alpha
//! boundaries and tags each alphabetic span `A<n>`.

use super::{merge_adjacent_unlabeled, RawSegment};
use crate::types::Label;

/// Run alphabet-run detection over a pipeline of segments.
pub fn detect(segments: Vec<RawSegment>) -> Vec<RawSegment> {
    let mut out = Vec::with_capacity(segments.len());
    for seg in segments {
        if seg.label.is_some() {
            out.push(seg);
            continue;
        }
        out.extend(split_alpha_runs(&seg.text));
    }
    merge_adjacent_unlabeled(out)
}

fn split_alpha_runs(text: &str) -> Vec<RawSegment> {
    let chars: Vec<char> = text.chars().collect();
    let mut out = Vec::new();
    let mut buf = String::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i].is_alphabetic() {
            if !buf.is_empty() {
                out.push(RawSegment::unlabeled(std::mem::take(&mut buf)));
            }
            let start = i;
            while i < chars.len() && chars[i].is_alphabetic() {
                i += 1;
            }
            let run: String = chars[start..i].iter().collect();
            out.push(RawSegment::labeled(run, Label::Alpha));
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
    fn splits_alpha_from_non_alpha() {
        let out = detect(vec![RawSegment::unlabeled("abc12345def")]);
        assert_eq!(
            out,
            vec![
                RawSegment::labeled("abc", Label::Alpha),
                RawSegment::unlabeled("12345"),
                RawSegment::labeled("def", Label::Alpha),
            ]
        );
    }
}
