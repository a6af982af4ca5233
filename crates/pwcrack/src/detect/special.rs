//! Special-character detection: the terminal stage of the pipeline —
//! whatever is still unlabeled after every other detector has run is,
//! by construction, non-alphanumeric.

use super::RawSegment;
use crate::types::Label;

/// Label every remaining unlabeled segment `S<n>`.
pub fn detect(segments: Vec<RawSegment>) -> Vec<RawSegment> {
    segments
        .into_iter()
        .map(|seg| {
            if seg.label.is_none() && !seg.text.is_empty() {
                RawSegment::labeled(seg.text, Label::Special)
            } else {
                seg
            }
        })
        .collect()
}
