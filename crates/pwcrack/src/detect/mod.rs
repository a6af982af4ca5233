//! # Detector pipeline
//!
//! Each detector is a total function over a sequence of labeled/unlabeled
//! segments: it processes only the unlabeled ones, replacing each with a new
//! subsequence of labeled and/or unlabeled pieces. Detectors compose in a
//! fixed order (see `pwcrack_training::session`), re-splitting only what the
//! previous stage left unlabeled.

pub mod alphabet;
pub mod capitalization;
pub mod digit;
pub mod dictionary;
pub mod keyboard;
pub mod korean;
pub mod leet;
pub mod special;
pub mod word_trie;
pub mod year;

use crate::types::Label;

/// A segment mid-pipeline: labeled segments are frozen; `None` segments are
/// re-processed by the next detector in the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSegment {
    /// The literal text of this run.
    pub text: String,
    /// The category assigned so far, or `None` if still unclassified.
    pub label: Option<Label>,
}

impl RawSegment {
    /// Construct a labeled segment.
    pub fn labeled(text: impl Into<String>, label: Label) -> Self {
        Self {
            text: text.into(),
            label: Some(label),
        }
    }

    /// Construct an unlabeled segment.
    pub fn unlabeled(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            label: None,
        }
    }

    /// Character length of this segment's text.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Merge adjacent unlabeled segments into one, leaving labeled segments untouched.
pub fn merge_adjacent_unlabeled(segments: Vec<RawSegment>) -> Vec<RawSegment> {
    let mut out: Vec<RawSegment> = Vec::with_capacity(segments.len());
    for seg in segments {
        if seg.text.is_empty() {
            continue;
        }
        if seg.label.is_none() {
            if let Some(last) = out.last_mut() {
                if last.label.is_none() {
                    last.text.push_str(&seg.text);
                    continue;
                }
            }
        }
        out.push(seg);
    }
    out
}

/// True if every segment in the sequence is labeled — detectors must be
/// the identity on an already-fully-labeled input (§8 invariant 6).
pub fn is_fully_labeled(segments: &[RawSegment]) -> bool {
    segments.iter().all(|s| s.label.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_adjacent_unlabeled_joins_only_unlabeled_runs() {
        let segments = vec![
            RawSegment::unlabeled("ab"),
            RawSegment::unlabeled("cd"),
            RawSegment::labeled("12", Label::Digit),
            RawSegment::unlabeled("ef"),
        ];
        let merged = merge_adjacent_unlabeled(segments);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].text, "abcd");
        assert_eq!(merged[1].label, Some(Label::Digit));
        assert_eq!(merged[2].text, "ef");
    }
}
