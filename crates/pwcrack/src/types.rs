//! # Common Types

use std::collections::{HashMap, HashSet};

/// Type alias for hash maps in this crate.
pub type CommonHashMap<K, V> = HashMap<K, V>;

/// Type alias for hash sets in this crate.
pub type CommonHashSet<V> = HashSet<V>;

/// The single-character label identifying a segment's category.
///
/// Mirrors the labels produced by the detector pipeline: `K` (keyboard
/// walk), `Y` (year), `D` (digit run), `A` (alphabet run), `H` (Hangul
/// run), `S` (special characters), `C` (capitalization mask), `M` (OMEN
/// Markov terminal, used only in base structures, never emitted directly
/// by a detector).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, strum::Display, strum::EnumString)]
pub enum Label {
    /// Keyboard-walk run.
    #[strum(serialize = "K")]
    Keyboard,
    /// Year run (`19xx`/`20xx`, or narrow `MMDD`).
    #[strum(serialize = "Y")]
    Year,
    /// Maximal digit run.
    #[strum(serialize = "D")]
    Digit,
    /// Maximal alphabetic run (Latin).
    #[strum(serialize = "A")]
    Alpha,
    /// Maximal Hangul run.
    #[strum(serialize = "H")]
    Hangul,
    /// Maximal run of special (non-alphanumeric) characters.
    #[strum(serialize = "S")]
    Special,
    /// Capitalization mask, always paired immediately after an `A`/`H` run.
    #[strum(serialize = "C")]
    Capitalization,
    /// Markov (OMEN) terminal, used only as a synthetic base-structure label.
    #[strum(serialize = "M")]
    Markov,
}

/// A single labeled run within a parsed password, e.g. `("1234", Label::Digit)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Segment {
    /// The raw text of this run.
    pub text: String,
    /// The category this run was detected as.
    pub label: Label,
}

impl Segment {
    /// Construct a new segment.
    pub fn new(text: impl Into<String>, label: Label) -> Self {
        Self {
            text: text.into(),
            label,
        }
    }

    /// The number of characters (not bytes) in this segment.
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    /// Whether this segment has no characters.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_round_trips_through_strum() {
        for label in [
            Label::Keyboard,
            Label::Year,
            Label::Digit,
            Label::Alpha,
            Label::Hangul,
            Label::Special,
            Label::Capitalization,
            Label::Markov,
        ] {
            let s = label.to_string();
            let parsed: Label = s.parse().unwrap();
            assert_eq!(parsed, label);
        }
    }

    #[test]
    fn segment_len_counts_chars_not_bytes() {
        let seg = Segment::new("가나다", Label::Hangul);
        assert_eq!(seg.len(), 3);
    }
}
