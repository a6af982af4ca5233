//! Grammar data model: terminal groups, base structures, and the
//! add-one-smoothed unigram table used by the dictionary detector.

use crate::errors::{PwCrackError, PwResult};
use crate::types::{CommonHashMap, Label};

/// A set of concrete strings sharing one probability within a grammar symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct TerminalGroup {
    /// The terminal strings in this group.
    pub terminals: Vec<String>,
    /// This group's probability mass.
    pub prob: f64,
}

impl TerminalGroup {
    /// Terminal length of this symbol (the `n` in `A<n>`), i.e. the number
    /// of characters in any one terminal (all terminals in a symbol share
    /// a length by construction).
    pub fn terminal_char_len(&self) -> usize {
        self.terminals
            .first()
            .map(|t| t.chars().count())
            .unwrap_or(0)
    }
}

/// Mapping from symbol name (e.g. `A4`, `D2`, `M`) to its ordered list of
/// terminal groups, sorted by strictly decreasing probability.
#[derive(Debug, Clone, Default)]
pub struct Grammar {
    symbols: CommonHashMap<String, Vec<TerminalGroup>>,
}

impl Grammar {
    /// Build a grammar symbol from raw observation counts: terminals with
    /// equal counts collapse into one probability-sharing group.
    pub fn insert_symbol_from_counts(&mut self, symbol: impl Into<String>, counts: CommonHashMap<String, u64>) {
        let total: u64 = counts.values().sum();
        if total == 0 {
            return;
        }
        let mut by_count: CommonHashMap<u64, Vec<String>> = CommonHashMap::new();
        for (terminal, count) in counts {
            by_count.entry(count).or_default().push(terminal);
        }
        let mut groups: Vec<TerminalGroup> = by_count
            .into_iter()
            .map(|(count, mut terminals)| {
                terminals.sort();
                TerminalGroup {
                    terminals,
                    prob: count as f64 / total as f64,
                }
            })
            .collect();
        groups.sort_by(|a, b| b.prob.partial_cmp(&a.prob).unwrap());
        self.symbols.insert(symbol.into(), groups);
    }

    /// Insert an already-built, already-sorted list of terminal groups.
    pub fn insert_symbol(&mut self, symbol: impl Into<String>, groups: Vec<TerminalGroup>) {
        self.symbols.insert(symbol.into(), groups);
    }

    /// Look up a symbol's terminal groups.
    pub fn symbol(&self, symbol: &str) -> Option<&[TerminalGroup]> {
        self.symbols.get(symbol).map(|v| v.as_slice())
    }

    /// Iterate all known symbols.
    pub fn symbols(&self) -> impl Iterator<Item = (&str, &[TerminalGroup])> {
        self.symbols.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Validate invariant 1 (§8): every symbol's groups sum to 1 within
    /// tolerance and are in strictly non-increasing probability order.
    ///
    /// The `M` symbol is exempt from the sum-to-1 check: its "groups" are
    /// `PcfgOmenProb[level]` weights (§4.9), a per-level density used
    /// directly by the PCFG guesser rather than a probability simplex over
    /// alternative terminals, so it has no reason to sum to 1 across levels.
    pub fn validate(&self) -> PwResult<()> {
        for (symbol, groups) in &self.symbols {
            if symbol != "M" {
                let sum: f64 = groups.iter().map(|g| g.prob).sum();
                if (sum - 1.0).abs() > 1e-6 {
                    return Err(PwCrackError::GrammarConflict(format!(
                        "symbol {symbol} probabilities sum to {sum}, expected 1"
                    )));
                }
            }
            for pair in groups.windows(2) {
                if pair[1].prob > pair[0].prob {
                    return Err(PwCrackError::GrammarConflict(format!(
                        "symbol {symbol} groups are not in non-increasing probability order"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// The set of base structures (label-concatenation skeletons) and their
/// prior probabilities; probabilities sum to 1 over the set.
#[derive(Debug, Clone, Default)]
pub struct BaseStructureSet {
    /// Base-structure string -> probability.
    pub structures: CommonHashMap<String, f64>,
}

impl BaseStructureSet {
    /// Build from raw occurrence counts.
    pub fn from_counts(counts: &CommonHashMap<String, u64>) -> Self {
        let total: u64 = counts.values().sum();
        let structures = counts
            .iter()
            .map(|(s, c)| (s.clone(), *c as f64 / total.max(1) as f64))
            .collect();
        Self { structures }
    }

    /// Apply the `markov_proportion` knob (§13 of the expanded spec):
    /// synthesize a synthetic `"M"` structure weight so Markov-terminal
    /// derivations compete with PCFG derivations in the shared heap.
    ///
    /// - `markov_proportion == 0.0`: replace the entire set with `{"M": 1.0}`.
    /// - `markov_proportion == 1.0`: leave the set untouched.
    /// - otherwise: add a synthetic `"M"` weight of `(n / p) - n`, where `n`
    ///   is the total number of training passwords, then renormalize.
    pub fn apply_markov_proportion(&mut self, num_passwords: u64, markov_proportion: f64) {
        if markov_proportion == 0.0 {
            self.structures.clear();
            self.structures.insert("M".to_string(), 1.0);
            return;
        }
        if markov_proportion == 1.0 {
            return;
        }
        let n = num_passwords as f64;
        let markov_weight = (n / markov_proportion) - n;
        let total_existing: f64 = self.structures.values().sum::<f64>() * n.max(1.0);
        let total = total_existing + markov_weight;
        if total <= 0.0 {
            return;
        }
        let mut rescaled: CommonHashMap<String, f64> = self
            .structures
            .iter()
            .map(|(k, p)| (k.clone(), (p * n.max(1.0)) / total))
            .collect();
        rescaled.insert("M".to_string(), markov_weight / total);
        self.structures = rescaled;
    }
}

/// Add-one-smoothed unigram probability table, keyed by case-folded token;
/// also records each token's canonical (originally-observed) casing for
/// the Korean capitalization-mask rule.
#[derive(Debug, Clone, Default)]
pub struct UnigramProbs {
    entries: CommonHashMap<String, (String, f64)>,
}

impl UnigramProbs {
    /// Build from `(canonical form, count)` pairs keyed by case-folded token.
    pub fn from_counts(counts: &CommonHashMap<String, (String, u64)>) -> Self {
        let total: u64 = counts.values().map(|(_, c)| *c).sum();
        let vocab = counts.len() as f64;
        let entries = counts
            .iter()
            .map(|(folded, (canonical, count))| {
                let prob = (*count as f64 + 1.0) / (total as f64 + vocab);
                (folded.clone(), (canonical.clone(), prob))
            })
            .collect();
        Self { entries }
    }

    /// Reconstruct a table directly from already-smoothed
    /// `(case-folded token, canonical form, probability)` rows, as loaded
    /// back from persistence (§4.9) — bypasses re-deriving counts.
    pub fn from_probabilities(entries: impl IntoIterator<Item = (String, String, f64)>) -> Self {
        let entries = entries
            .into_iter()
            .map(|(folded, canonical, prob)| (folded, (canonical, prob)))
            .collect();
        Self { entries }
    }

    /// Look up `(canonical form, probability)` for a case-folded token.
    pub fn lookup(&self, folded: &str) -> Option<(String, f64)> {
        self.entries.get(folded).cloned()
    }

    /// Iterate all entries.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, f64)> {
        self.entries
            .iter()
            .map(|(folded, (canonical, prob))| (folded.as_str(), canonical.as_str(), *prob))
    }
}

/// Build the grammar symbol name for a `(label, length)` pair (e.g.
/// `(Label::Digit, 5) -> "D5"`, `(Label::Markov, _) -> "M"`).
pub fn symbol_name(label: Label, length: usize) -> String {
    if label == Label::Markov {
        "M".to_string()
    } else {
        format!("{label}{length}")
    }
}

/// Tokenize a base-structure string into `(Label, length)` pairs, inserting
/// a `Capitalization` token immediately after every `Alpha`/`Hangul` token
/// (the Grammar-table load-time rule from persistence §4.9).
pub fn parse_base_structure(structure: &str) -> PwResult<Vec<(Label, usize)>> {
    let chars: Vec<char> = structure.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let letter = chars[i];
        i += 1;
        if letter == 'M' {
            tokens.push((Label::Markov, 0));
            continue;
        }
        let label = label_from_char(letter)?;
        let start = i;
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
        if start == i {
            return Err(PwCrackError::InvalidSegment(structure.to_string()));
        }
        let length: usize = chars[start..i].iter().collect::<String>().parse().unwrap();
        tokens.push((label, length));
        if matches!(label, Label::Alpha | Label::Hangul) {
            tokens.push((Label::Capitalization, length));
        }
    }
    Ok(tokens)
}

fn label_from_char(c: char) -> PwResult<Label> {
    match c {
        'K' => Ok(Label::Keyboard),
        'Y' => Ok(Label::Year),
        'D' => Ok(Label::Digit),
        'A' => Ok(Label::Alpha),
        'H' => Ok(Label::Hangul),
        'S' => Ok(Label::Special),
        'C' => Ok(Label::Capitalization),
        'M' => Ok(Label::Markov),
        other => Err(PwCrackError::InvalidSegment(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_from_counts_groups_equal_counts_and_sorts_descending() {
        let mut grammar = Grammar::default();
        let mut counts = CommonHashMap::new();
        counts.insert("1234".to_string(), 6u64);
        counts.insert("0000".to_string(), 3u64);
        counts.insert("1111".to_string(), 3u64);
        grammar.insert_symbol_from_counts("D4", counts);
        let groups = grammar.symbol("D4").unwrap();
        assert_eq!(groups.len(), 2);
        assert!(groups[0].prob > groups[1].prob);
        assert!((groups[0].prob - 0.5).abs() < 1e-9);
        grammar.validate().unwrap();
    }

    #[test]
    fn parse_base_structure_inserts_capitalization_after_alpha() {
        let tokens = parse_base_structure("A4D2S1").unwrap();
        assert_eq!(
            tokens,
            vec![
                (Label::Alpha, 4),
                (Label::Capitalization, 4),
                (Label::Digit, 2),
                (Label::Special, 1),
            ]
        );
    }

    #[test]
    fn parse_base_structure_handles_markov_symbol() {
        let tokens = parse_base_structure("M").unwrap();
        assert_eq!(tokens, vec![(Label::Markov, 0)]);
    }

    #[test]
    fn markov_proportion_zero_replaces_structures() {
        let mut set = BaseStructureSet::default();
        set.structures.insert("A4".to_string(), 1.0);
        set.apply_markov_proportion(100, 0.0);
        assert_eq!(set.structures.len(), 1);
        assert_eq!(set.structures.get("M"), Some(&1.0));
    }

    #[test]
    fn validate_exempts_m_symbol_from_sum_to_one() {
        let mut grammar = Grammar::default();
        // PcfgOmenProb-derived weights, one per level — not a simplex.
        grammar.insert_symbol(
            "M",
            vec![
                TerminalGroup { terminals: vec!["0".into()], prob: 0.003 },
                TerminalGroup { terminals: vec!["1".into()], prob: 0.001 },
            ],
        );
        grammar.validate().unwrap();
    }

    #[test]
    fn markov_proportion_one_leaves_structures_untouched() {
        let mut set = BaseStructureSet::default();
        set.structures.insert("A4".to_string(), 1.0);
        set.apply_markov_proportion(100, 1.0);
        assert_eq!(set.structures.get("A4"), Some(&1.0));
        assert!(set.structures.get("M").is_none());
    }
}
