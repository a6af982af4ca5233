//! Year detection: `(19|20)\d\d` not adjacent to other digits, plus a
//! narrow `MMDD` special case.

use super::{merge_adjacent_unlabeled, RawSegment};
use crate::types::Label;

/// Run year detection over a pipeline of segments.
pub fn detect(segments: Vec<RawSegment>) -> Vec<RawSegment> {
    let mut out = Vec::with_capacity(segments.len());
    for seg in segments {
        if seg.label.is_some() {
            out.push(seg);
            continue;
        }
        out.extend(split_years(&seg.text));
    }
    merge_adjacent_unlabeled(out)
}

fn split_years(text: &str) -> Vec<RawSegment> {
    let chars: Vec<char> = text.chars().collect();

    // MMDD only fires when the entire unlabeled segment is exactly 4 digits.
    if chars.len() == 4 && chars.iter().all(|c| c.is_ascii_digit()) {
        let mm: u32 = chars[0..2].iter().collect::<String>().parse().unwrap_or(0);
        let dd: u32 = chars[2..4].iter().collect::<String>().parse().unwrap_or(0);
        if (1..=12).contains(&mm) && (1..=31).contains(&dd) {
            return vec![RawSegment::labeled(text, Label::Year)];
        }
    }

    let mut out = Vec::new();
    let mut buf = String::new();
    let mut i = 0;
    while i < chars.len() {
        if i + 4 <= chars.len() {
            let four: String = chars[i..i + 4].iter().collect();
            let all_digit = four.chars().all(|c| c.is_ascii_digit());
            let is_year_prefix = four.starts_with("19") || four.starts_with("20");
            if all_digit && is_year_prefix {
                let left_ok = i == 0 || !chars[i - 1].is_ascii_digit();
                let right_ok = i + 4 >= chars.len() || !chars[i + 4].is_ascii_digit();
                if left_ok && right_ok {
                    if !buf.is_empty() {
                        out.push(RawSegment::unlabeled(std::mem::take(&mut buf)));
                    }
                    out.push(RawSegment::labeled(four, Label::Year));
                    i += 4;
                    continue;
                }
            }
        }
        buf.push(chars[i]);
        i += 1;
    }
    if !buf.is_empty() {
        out.push(RawSegment::unlabeled(buf));
    }
    out
}
