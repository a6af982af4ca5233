//! Orchestrates the detector pipeline against a single training password
//! (§4.2): keyboard walk, then per leet-expansion variant, dictionary word
//! detection, alphabet/year/digit/special detection, and base-structure
//! construction.

use crate::detect::dictionary::KoreanLexicon;
use crate::detect::{alphabet, capitalization, digit, dictionary, keyboard, leet, special, year, RawSegment};
use crate::grammar::symbol_name;
use crate::types::{Label, Segment};

/// One leet-expansion variant's fully-labeled parse of a training password.
#[derive(Debug, Clone)]
pub struct ParsedVariant {
    /// The final labeled segments.
    pub segments: Vec<Segment>,
    /// The concatenated base-structure string (e.g. `A4D2S1`).
    pub base_structure: String,
    /// `(C<n> symbol, mask)` pairs, one per `A`/`H` segment.
    pub capitalization_masks: Vec<(String, String)>,
    /// `(lowercased word, label)` pairs to commit to the word trie.
    pub words: Vec<(String, Label)>,
}

/// Parse one training password into every leet-expansion variant's
/// segmentation (§4.2). Returns one `ParsedVariant` per variant; all
/// contribute independently to the caller's running counters.
pub fn parse_password(password: &str, min_run: usize, lexicon: &impl KoreanLexicon) -> Vec<ParsedVariant> {
    if password.is_empty() {
        return Vec::new();
    }

    let after_keyboard = keyboard::detect(vec![RawSegment::unlabeled(password)], min_run);

    leet::variants(&after_keyboard)
        .into_iter()
        .map(|variant| parse_variant(variant, lexicon))
        .collect()
}

fn parse_variant(segments: Vec<RawSegment>, lexicon: &impl KoreanLexicon) -> ParsedVariant {
    let after_dict = dictionary::detect(segments, lexicon);
    let after_alpha = alphabet::detect(after_dict);
    let after_year = year::detect(after_alpha);
    let after_digit = digit::detect(after_year);
    let after_special = special::detect(after_digit);

    let mut words = Vec::new();
    let mut masks = Vec::new();
    let mut base_structure = String::new();
    let mut segments = Vec::with_capacity(after_special.len());

    for seg in after_special {
        let label = seg
            .label
            .expect("the special detector labels every remaining segment");
        let len = seg.char_len();
        base_structure.push_str(&symbol_name(label, len));

        if matches!(label, Label::Alpha | Label::Hangul) {
            let folded = seg.text.to_lowercase();
            let mask = if label == Label::Hangul {
                // §4.1: compare against the canonical (originally-stored)
                // form, not a blanket lowercase. If this token hasn't been
                // committed to the lexicon yet (its first occurrence), its
                // own observed spelling is the only canonical form known so
                // far, which `mask_korean` reduces to the `mask_latin`
                // result anyway.
                let canonical = lexicon.lookup(&folded).map(|(c, _)| c).unwrap_or_else(|| seg.text.clone());
                capitalization::mask_korean(&seg.text, &canonical)
            } else {
                capitalization::mask_latin(&seg.text)
            };
            words.push((folded, label));
            masks.push((symbol_name(Label::Capitalization, len), mask));
        }

        segments.push(Segment::new(seg.text, label));
    }

    ParsedVariant {
        segments,
        base_structure,
        capitalization_masks: masks,
        words,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_korean(_folded: &str) -> Option<(String, f64)> {
        None
    }

    #[test]
    fn parses_digit_alpha_scenario() {
        let variants = parse_password("abc12345def", keyboard::MIN_RUN_DEFAULT, &no_korean);
        assert_eq!(variants.len(), 1);
        assert_eq!(variants[0].base_structure, "A3C3D5A3C3");
    }

    #[test]
    fn parses_keyboard_walk_scenario() {
        let variants = parse_password("qwerty123", keyboard::MIN_RUN_DEFAULT, &no_korean);
        assert_eq!(variants[0].base_structure, "K6D3");
    }

    #[test]
    fn hangul_segment_mask_uses_canonical_form_not_blanket_lowercase() {
        // The lexicon claims this token was first committed in all-lowercase
        // form; the password observed now capitalizes it. §4.1 requires
        // comparing against that canonical form (whose lowercase matches
        // either observed case), not a blanket `mask_latin` reading of the
        // newly observed text — which would have reported 'U' at index 0.
        let lexicon = |folded: &str| (folded == "barzz").then(|| ("barzz".to_string(), 0.05));
        let variants = parse_password("Barzz", keyboard::MIN_RUN_DEFAULT, &lexicon);
        assert_eq!(variants.len(), 1);
        let variant = &variants[0];
        assert_eq!(variant.base_structure, "H5");
        assert_eq!(
            variant.capitalization_masks,
            vec![("C5".to_string(), "LLLLL".to_string())]
        );
    }
}
