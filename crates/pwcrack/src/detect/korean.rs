//! Korean (Dubeolsik) transliteration: reverse-maps a Latin-keyed substring
//! to Hangul syllables, the way a two-set Korean keyboard would have typed
//! them.
//!
//! This is a from-scratch encoder/decoder over the standard Unicode Hangul
//! syllable composition (`initial*21*28 + medial*28 + final + 0xAC00`); it
//! does not call out to an external jamo/romanization library (those are
//! explicitly out of scope — see the crate root docs).

const INITIAL_KEYS: [&str; 19] = [
    "r", "R", "s", "e", "E", "f", "a", "q", "Q", "t", "T", "d", "w", "W", "c", "z", "x", "v", "g",
];
const MEDIAL_KEYS: [&str; 21] = [
    "k", "o", "i", "O", "j", "p", "u", "P", "h", "hk", "ho", "hl", "y", "n", "nj", "np", "nl", "b",
    "m", "ml", "l",
];
const FINAL_KEYS: [&str; 28] = [
    "", "r", "R", "rt", "s", "sw", "sg", "e", "f", "fr", "fa", "fq", "ft", "fx", "fv", "fg", "a",
    "q", "qt", "t", "T", "d", "w", "c", "z", "x", "v", "g",
];

const HANGUL_BASE: u32 = 0xAC00;
const MEDIAL_COUNT: u32 = 21;
const FINAL_COUNT: u32 = 28;

/// Encode a Hangul string into its Dubeolsik keystrokes, or `None` if any
/// character is outside the precomposed Hangul syllable block.
pub fn encode(hangul: &str) -> Option<String> {
    let mut out = String::new();
    for ch in hangul.chars() {
        let code = ch as u32;
        if !(HANGUL_BASE..=0xD7A3).contains(&code) {
            return None;
        }
        let s_index = code - HANGUL_BASE;
        let initial = s_index / (MEDIAL_COUNT * FINAL_COUNT);
        let medial = (s_index % (MEDIAL_COUNT * FINAL_COUNT)) / FINAL_COUNT;
        let fin = s_index % FINAL_COUNT;
        out.push_str(INITIAL_KEYS[initial as usize]);
        out.push_str(MEDIAL_KEYS[medial as usize]);
        out.push_str(FINAL_KEYS[fin as usize]);
    }
    Some(out)
}

/// Reverse-map Dubeolsik keystrokes back to Hangul syllables. Returns
/// `None` if the keystrokes don't fully consume into whole syllables
/// (unpaired jamo).
///
/// A batchim (final consonant) key is ambiguous with the next syllable's
/// initial consonant key (both draw from the same letter alphabet), so
/// this backtracks over how much of a trailing run to claim as a final
/// rather than greedily maximizing it.
pub fn decode(keys: &str) -> Option<String> {
    let chars: Vec<char> = keys.chars().collect();
    decode_from(&chars).map(|syllables| syllables.into_iter().collect())
}

fn decode_from(chars: &[char]) -> Option<Vec<char>> {
    if chars.is_empty() {
        return Some(Vec::new());
    }
    let (initial_idx, used) = match_longest(chars, &INITIAL_KEYS)?;
    let after_initial = &chars[used..];
    let (medial_idx, used) = match_longest(after_initial, &MEDIAL_KEYS)?;
    let after_medial = &after_initial[used..];

    for final_len in [2usize, 1, 0] {
        if final_len > after_medial.len() {
            continue;
        }
        let final_idx = if final_len == 0 {
            Some(0)
        } else {
            let candidate: String = after_medial[..final_len].iter().collect();
            FINAL_KEYS
                .iter()
                .position(|&k| !k.is_empty() && k == candidate)
        };
        let Some(final_idx) = final_idx else {
            continue;
        };
        let remainder = &after_medial[final_len..];
        if let Some(mut tail) = decode_from(remainder) {
            let code = HANGUL_BASE
                + initial_idx as u32 * MEDIAL_COUNT * FINAL_COUNT
                + medial_idx as u32 * FINAL_COUNT
                + final_idx as u32;
            let mut syllables = vec![char::from_u32(code)?];
            syllables.append(&mut tail);
            return Some(syllables);
        }
    }
    None
}

fn match_longest(chars: &[char], table: &[&str]) -> Option<(usize, usize)> {
    for len in (1..=2).rev() {
        if chars.len() < len {
            continue;
        }
        let candidate: String = chars[..len].iter().collect();
        if let Some(idx) = table.iter().position(|&k| k == candidate) {
            return Some((idx, len));
        }
    }
    None
}

/// True if `text` reverse-maps through Dubeolsik into at least 3 Hangul
/// syllables with no leftover, unpaired jamo.
pub fn can_parse_hangul(text: &str) -> bool {
    matches!(decode(text), Some(syllables) if syllables.chars().count() > 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_simple_no_batchim_syllables() {
        // "사랑" (love), no final consonants.
        let hangul = "사랑";
        let keys = encode(hangul).unwrap();
        let decoded = decode(&keys).unwrap();
        assert_eq!(decoded, hangul);
    }

    #[test]
    fn rejects_unparseable_keys() {
        assert_eq!(decode("zzz999"), None);
    }

    #[test]
    fn can_parse_hangul_requires_more_than_two_syllables() {
        let keys = encode("가나").unwrap();
        assert!(!can_parse_hangul(&keys));
        let keys = encode("가나다").unwrap();
        assert!(can_parse_hangul(&keys));
    }
}
