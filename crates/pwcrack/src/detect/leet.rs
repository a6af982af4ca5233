//! Leet-speak expansion (§4.1): finds substrings that decode to recognized
//! English dictionary words, resolves overlaps greedily, and enumerates the
//! section-merge Cartesian product over the remaining unlabeled runs.

use std::collections::HashSet;

use super::dictionary::{zipf, MAX_WORD_LEN};
use super::RawSegment;
use crate::types::Label;

/// `(leet char, decoded letter)` substitution table.
pub const LEET_MAP: &[(char, char)] = &[
    ('0', 'o'),
    ('1', 'i'),
    ('3', 'e'),
    ('4', 'a'),
    ('5', 's'),
    ('7', 't'),
    ('8', 'b'),
    ('@', 'a'),
    ('$', 's'),
    ('!', 'i'),
];

/// Decode leet substitutions in `text`; returns the decoded string and
/// whether any substitution actually fired.
pub fn decode(text: &str) -> (String, bool) {
    let mut changed = false;
    let decoded = text
        .chars()
        .map(|c| {
            if let Some(&(_, letter)) = LEET_MAP.iter().find(|&&(k, _)| k == c) {
                changed = true;
                letter
            } else {
                c
            }
        })
        .collect();
    (decoded, changed)
}

/// Find every `(start, end)` character span of `chars` whose decode contains
/// at least one leet substitution and whose decoded form is a recognized
/// dictionary word (length >= 3, Zipf >= 4.0).
fn find_leet_words(chars: &[char]) -> Vec<(usize, usize, String)> {
    let n = chars.len();
    let mut out = Vec::new();
    for start in 0..n {
        let max_end = n.min(start + MAX_WORD_LEN);
        for end in (start + 3)..=max_end {
            let raw: String = chars[start..end].iter().collect();
            let (decoded, changed) = decode(&raw);
            if !changed {
                continue;
            }
            if zipf(&decoded.to_lowercase()) >= 4.0 {
                out.push((start, end, raw));
            }
        }
    }
    out
}

/// Split `text` into leet-word hits (tagged `Alpha`, text kept as the raw
/// observed spelling) and the untouched runs between them, choosing among
/// overlapping candidates by earliest start, then longest span.
fn leet_segment(text: &str) -> Vec<RawSegment> {
    let chars: Vec<char> = text.chars().collect();
    let mut candidates = find_leet_words(&chars);
    candidates.sort_by(|a, b| a.0.cmp(&b.0).then((b.1 - b.0).cmp(&(a.1 - a.0))));

    let mut chosen = Vec::new();
    let mut cursor = 0usize;
    for (start, end, raw) in candidates {
        if start >= cursor {
            chosen.push((start, end, raw));
            cursor = end;
        }
    }

    let mut segments = Vec::new();
    let mut pos = 0usize;
    for (start, end, raw) in chosen {
        if pos < start {
            let prefix: String = chars[pos..start].iter().collect();
            segments.push(RawSegment::unlabeled(prefix));
        }
        segments.push(RawSegment::labeled(raw, Label::Alpha));
        pos = end;
    }
    if pos < chars.len() {
        let suffix: String = chars[pos..].iter().collect();
        segments.push(RawSegment::unlabeled(suffix));
    }
    segments
}

/// Every way to coalesce adjacent segments of `segments` (`2^(n-1)`
/// patterns); merging two segments drops their label, since the combined
/// text no longer necessarily matches the word either side was tagged for.
fn merge_combinations(segments: &[RawSegment]) -> Vec<Vec<RawSegment>> {
    if segments.is_empty() {
        return Vec::new();
    }
    let n = segments.len();
    let mut results = Vec::with_capacity(1usize << (n - 1));
    for mask in 0u32..(1 << (n - 1)) {
        let mut combo = Vec::with_capacity(n);
        let mut current = segments[0].clone();
        for (i, seg) in segments.iter().enumerate().skip(1) {
            let merge = mask & (1 << (i - 1)) == 0;
            if merge {
                let mut text = current.text;
                text.push_str(&seg.text);
                current = RawSegment::unlabeled(text);
            } else {
                combo.push(current);
                current = seg.clone();
            }
        }
        combo.push(current);
        results.push(combo);
    }
    results.sort_by_key(|v| sort_key(v));
    results
}

fn sort_key(segments: &[RawSegment]) -> (usize, String) {
    let joined: String = segments.iter().map(|s| s.text.as_str()).collect();
    (segments.len(), joined)
}

/// Generate leet-decode variants of a segmentation (§4.1): for each
/// unlabeled section, run [`leet_segment`] and every merge combination of
/// the result (plus the untouched section itself), then take the Cartesian
/// product across sections. Already-labeled sections pass through as-is.
pub fn variants(segments: &[RawSegment]) -> Vec<Vec<RawSegment>> {
    let options: Vec<Vec<Vec<RawSegment>>> = segments
        .iter()
        .map(|seg| {
            if seg.label.is_some() {
                return vec![vec![seg.clone()]];
            }
            let base = leet_segment(&seg.text);
            let mut combos = merge_combinations(&base);
            let identity = vec![RawSegment::unlabeled(seg.text.clone())];
            if !combos.contains(&identity) {
                combos.push(identity);
            }
            combos
        })
        .collect();

    let mut out = dedup(cartesian_product(&options));
    out.sort_by_key(|v| sort_key(v));
    out
}

fn cartesian_product(options: &[Vec<Vec<RawSegment>>]) -> Vec<Vec<RawSegment>> {
    let mut results: Vec<Vec<RawSegment>> = vec![Vec::new()];
    for group in options {
        let mut next = Vec::with_capacity(results.len() * group.len().max(1));
        for prefix in &results {
            for choice in group {
                let mut combo = prefix.clone();
                combo.extend(choice.iter().cloned());
                next.push(combo);
            }
        }
        results = next;
    }
    results
}

fn dedup(variants: Vec<Vec<RawSegment>>) -> Vec<Vec<RawSegment>> {
    let mut seen: HashSet<Vec<(String, Option<Label>)>> = HashSet::new();
    variants
        .into_iter()
        .filter(|v| {
            let key: Vec<(String, Option<Label>)> =
                v.iter().map(|s| (s.text.clone(), s.label)).collect();
            seen.insert(key)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_common_substitutions() {
        let (decoded, changed) = decode("p4ssw0rd");
        assert_eq!(decoded, "password");
        assert!(changed);
    }

    #[test]
    fn identity_segment_yields_no_extra_variant() {
        let segments = vec![RawSegment::unlabeled("hello")];
        assert_eq!(variants(&segments).len(), 1);
    }

    #[test]
    fn leet_segment_yields_identity_plus_decoded_variant() {
        let segments = vec![RawSegment::unlabeled("p4ssw0rd")];
        let vs = variants(&segments);
        assert_eq!(vs.len(), 2);
        assert!(vs.iter().any(|v| v[0].text == "p4ssw0rd" && v[0].label.is_none()));
        assert!(vs.iter().any(|v| v[0].text == "p4ssw0rd" && v[0].label == Some(Label::Alpha)));
    }

    #[test]
    fn partial_leet_token_without_a_dictionary_hit_yields_only_identity() {
        // "h4xor" has a leet substitution but never decodes to a recognized
        // dictionary word at any span, so the Zipf gate rejects every
        // candidate and no extra variant is produced.
        let segments = vec![RawSegment::unlabeled("h4xor")];
        let vs = variants(&segments);
        assert_eq!(vs.len(), 1);
        assert_eq!(vs[0][0].text, "h4xor");
        assert!(vs[0][0].label.is_none());
    }

    #[test]
    fn leet_hit_shorter_than_the_whole_token_still_keeps_its_raw_spelling() {
        // "monkey" (zipf 4.5) embedded with a leading digit run the leet
        // table can't decode into anything else: only the "m0nkey" suffix
        // should get tagged, and it keeps its raw (not decoded) spelling.
        let segments = vec![RawSegment::unlabeled("99m0nkey")];
        let vs = variants(&segments);
        assert!(vs.iter().any(|v| {
            v.len() == 2
                && v[0].text == "99"
                && v[0].label.is_none()
                && v[1].text == "m0nkey"
                && v[1].label == Some(Label::Alpha)
        }));
    }

    #[test]
    fn already_labeled_segments_pass_through_untouched() {
        let segments = vec![RawSegment::labeled("qwerty", Label::Keyboard)];
        let vs = variants(&segments);
        assert_eq!(vs, vec![segments]);
    }

    #[test]
    fn full_span_hit_is_not_split_into_shorter_overlapping_candidates() {
        // Every shorter span inside "p4ssw0rd" (e.g. "w0rd" -> "word") fails
        // the Zipf gate, so the full 8-character span is the only candidate
        // and `leet_segment` emits it whole rather than splitting it up.
        let segmented = leet_segment("p4ssw0rd");
        assert_eq!(segmented, vec![RawSegment::labeled("p4ssw0rd", Label::Alpha)]);
    }
}
