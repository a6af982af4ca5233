//! Keyboard-walk detection: QWERTY and JCUKEN adjacency runs.
//!
//! Runs first in the pipeline because keyboard walks (`qwerty`, `asdf`,
//! `йцукен`) otherwise masquerade as dictionary or alphabet runs.

use std::collections::HashMap;
use std::sync::OnceLock;

use super::{merge_adjacent_unlabeled, RawSegment};
use crate::types::Label;

/// Default minimum run length to qualify as a keyboard walk.
pub const MIN_RUN_DEFAULT: usize = 4;

const QWERTY_ROWS: [&str; 4] = ["`1234567890-=", "qwertyuiop[]\\", "asdfghjkl;'", "zxcvbnm,./"];
const JCUKEN_ROWS: [&str; 3] = ["йцукенгшщзхъ", "фывапролджэ", "ячсмитьбю"];

type Coords = HashMap<char, (i32, i32)>;

fn build_coords(rows: &[&str]) -> Coords {
    let mut map = HashMap::new();
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, ch) in row.chars().enumerate() {
            map.insert(ch, (row_idx as i32, col_idx as i32));
        }
    }
    map
}

fn layouts() -> &'static Vec<Coords> {
    static LAYOUTS: OnceLock<Vec<Coords>> = OnceLock::new();
    LAYOUTS.get_or_init(|| vec![build_coords(&QWERTY_ROWS), build_coords(&JCUKEN_ROWS)])
}

/// True if `a` and `b` are Chebyshev-adjacent (distance <= 1) under at
/// least one supported keyboard layout.
pub fn is_adjacent(a: char, b: char) -> bool {
    let (a, b) = (a.to_ascii_lowercase(), b.to_ascii_lowercase());
    layouts().iter().any(|layout| {
        match (layout.get(&a), layout.get(&b)) {
            (Some(&(r1, c1)), Some(&(r2, c2))) => (r1 - r2).abs() <= 1 && (c1 - c2).abs() <= 1,
            _ => false,
        }
    })
}

/// Run keyboard-walk detection over a pipeline of segments, re-splitting
/// only the unlabeled ones.
pub fn detect(segments: Vec<RawSegment>, min_run: usize) -> Vec<RawSegment> {
    let mut out = Vec::with_capacity(segments.len());
    for seg in segments {
        if seg.label.is_some() {
            out.push(seg);
            continue;
        }
        out.extend(split_runs(&seg.text, min_run));
    }
    merge_adjacent_unlabeled(out)
}

fn split_runs(text: &str, min_run: usize) -> Vec<RawSegment> {
    let chars: Vec<char> = text.chars().collect();
    let mut result = Vec::new();
    let mut buf = String::new();
    let mut i = 0;
    while i < chars.len() {
        let mut j = i + 1;
        while j < chars.len() && is_adjacent(chars[j - 1], chars[j]) {
            j += 1;
        }
        let run_len = j - i;
        if run_len >= min_run {
            if !buf.is_empty() {
                result.push(RawSegment::unlabeled(std::mem::take(&mut buf)));
            }
            let run: String = chars[i..j].iter().collect();
            result.push(RawSegment::labeled(run, Label::Keyboard));
        } else {
            buf.extend(chars[i..j].iter());
        }
        i = j;
    }
    if !buf.is_empty() {
        result.push(RawSegment::unlabeled(buf));
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qwerty_run_is_detected() {
        let segments = vec![RawSegment::unlabeled("qwerty123")];
        let out = detect(segments, MIN_RUN_DEFAULT);
        assert_eq!(out[0], RawSegment::labeled("qwerty", Label::Keyboard));
        assert_eq!(out[1], RawSegment::unlabeled("123"));
    }

    #[test]
    fn short_run_stays_unlabeled() {
        let segments = vec![RawSegment::unlabeled("qaz12")];
        let out = detect(segments, MIN_RUN_DEFAULT);
        assert_eq!(out, vec![RawSegment::unlabeled("qaz12")]);
    }

    #[test]
    fn detector_is_identity_on_labeled_input() {
        let segments = vec![RawSegment::labeled("qwerty", Label::Keyboard)];
        let out = detect(segments.clone(), MIN_RUN_DEFAULT);
        assert_eq!(out, segments);
    }
}
