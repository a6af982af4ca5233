//! Capitalization-mask extraction (`C<n>`): one `U`/`L` per character of a
//! tagged `A<n>` or `H<n>` segment.

/// Mask an ASCII/Latin alphabetic word: `'U'` per uppercase char, `'L'` per
/// everything else.
pub fn mask_latin(word: &str) -> String {
    word.chars()
        .map(|c| if c.is_uppercase() { 'U' } else { 'L' })
        .collect()
}

/// Mask an observed Korean (Dubeolsik-transliterated) token against the
/// *canonical*, originally-stored form, rather than a blanket lowercase.
///
/// Per the case-fold rule: uppercase in the canonical form must match
/// exactly; lowercase in the canonical form matches either case in the
/// observed form.
pub fn mask_korean(observed: &str, canonical: &str) -> String {
    observed
        .chars()
        .zip(canonical.chars())
        .map(|(observed_ch, canon_ch)| {
            if canon_ch.is_uppercase() {
                if observed_ch == canon_ch {
                    'U'
                } else {
                    'L'
                }
            } else {
                'L'
            }
        })
        .collect()
}

/// True if `observed` is consistent with `canonical` under the case-fold
/// rule above (used by the Korean round-trip testable property).
pub fn korean_case_matches(observed: &str, canonical: &str) -> bool {
    if observed.chars().count() != canonical.chars().count() {
        return false;
    }
    observed.chars().zip(canonical.chars()).all(|(o, c)| {
        if c.is_uppercase() {
            o == c
        } else {
            o.to_lowercase().eq(c.to_lowercase())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_mixed_case_word() {
        assert_eq!(mask_latin("PassWord"), "ULLLULLL");
    }

    #[test]
    fn korean_mask_respects_canonical_uppercase() {
        assert_eq!(mask_korean("hangul", "Hangul"), "ULLLLL");
        assert_eq!(mask_korean("HANGUL", "Hangul"), "ULLLLL");
    }

    #[test]
    fn korean_case_matches_allows_lowercase_either_way() {
        assert!(korean_case_matches("hangul", "hangul"));
        assert!(korean_case_matches("HANGUL", "hangul"));
        assert!(!korean_case_matches("hangul", "Hangul"));
    }
}
