//! Best-first PCFG derivation enumeration: `TreeItem`, the canonicality
//! ("parent-is-best") rule, and the max-heap-driven guesser.

use std::cmp::Ordering;

use crate::errors::{PwCrackError, PwResult};
use crate::grammar::{parse_base_structure, symbol_name, BaseStructureSet, Grammar};
use crate::types::Label;

/// A cursor into `grammar[symbol][index]`. `index = 0` is always the
/// maximum-likelihood terminal group for `symbol`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Structure {
    /// The grammar symbol this cursor points into (e.g. `"D4"`, `"M"`).
    pub symbol: String,
    /// The index of the selected terminal group within that symbol.
    pub index: usize,
}

/// A derivation in flight: a concrete choice of terminal group per
/// position in a base structure, plus its log-probability.
#[derive(Debug, Clone)]
pub struct TreeItem {
    /// The base structure's prior probability.
    pub base_prob: f64,
    /// One cursor per label position in the base structure.
    pub structures: Vec<Structure>,
    /// `log(base_prob) + sum(log(group.prob))` over `structures`.
    pub prob: f64,
    /// Monotonic creation order, used only to break probability ties
    /// deterministically (§9 design note).
    seq: u64,
}

impl TreeItem {
    /// Recompute `prob` from `structures` against `grammar`, for invariant
    /// checking (§8 invariant 2).
    pub fn recompute_prob(&self, grammar: &Grammar) -> PwResult<f64> {
        recompute(grammar, self.base_prob, &self.structures)
    }
}

fn recompute(grammar: &Grammar, base_prob: f64, structures: &[Structure]) -> PwResult<f64> {
    let mut total = base_prob.ln();
    for s in structures {
        let groups = grammar
            .symbol(&s.symbol)
            .ok_or_else(|| PwCrackError::OutOfRange(format!("unknown symbol {}", s.symbol)))?;
        let group = groups
            .get(s.index)
            .ok_or_else(|| PwCrackError::OutOfRange(format!("{}[{}] out of range", s.symbol, s.index)))?;
        total += group.prob.ln();
    }
    Ok(total)
}

impl PartialEq for TreeItem {
    fn eq(&self, other: &Self) -> bool {
        self.prob == other.prob && self.seq == other.seq
    }
}
impl Eq for TreeItem {}

impl PartialOrd for TreeItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TreeItem {
    /// Max-heap ordering on `prob`; ties broken by insertion order so the
    /// queue stays total and deterministic for testing (§9 design note).
    fn cmp(&self, other: &Self) -> Ordering {
        self.prob
            .partial_cmp(&other.prob)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Expands base structures into derivations and drives best-first
/// enumeration via the canonicality ("parent-is-best") rule.
pub struct PCFGGuesser<'g> {
    grammar: &'g Grammar,
    seq: u64,
}

impl<'g> PCFGGuesser<'g> {
    /// Construct a guesser over an immutable, already-loaded grammar.
    pub fn new(grammar: &'g Grammar) -> Self {
        Self { grammar, seq: 0 }
    }

    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    /// Build the initial `TreeItem` for every base structure (§4.6): every
    /// replacement symbol starts at `index = 0`, except the Markov symbol
    /// `M`, which starts at `index = 1` (index 0 is reserved for an
    /// internal seed level).
    pub fn initial_items(&mut self, base_structures: &BaseStructureSet) -> PwResult<Vec<TreeItem>> {
        let mut items = Vec::with_capacity(base_structures.structures.len());
        for (structure_str, base_prob) in &base_structures.structures {
            let tokens = parse_base_structure(structure_str)?;
            let mut structures = Vec::with_capacity(tokens.len());
            for (label, length) in tokens {
                let symbol = symbol_name(label, length);
                let index = if label == Label::Markov { 1 } else { 0 };
                structures.push(Structure { symbol, index });
            }
            let prob = recompute(self.grammar, *base_prob, &structures)?;
            items.push(TreeItem {
                base_prob: *base_prob,
                structures,
                prob,
                seq: self.next_seq(),
            });
        }
        Ok(items)
    }

    /// Generate the canonical children of `parent` (§4.6). For each
    /// position, advancing that position's index by one yields a candidate;
    /// the candidate is only accepted if `parent` is its unique canonical
    /// predecessor.
    pub fn children(&mut self, parent: &TreeItem) -> PwResult<Vec<TreeItem>> {
        let mut children = Vec::new();
        for i in 0..parent.structures.len() {
            let symbol = &parent.structures[i].symbol;
            let Some(groups) = self.grammar.symbol(symbol) else {
                continue;
            };
            let next_index = parent.structures[i].index + 1;
            if next_index >= groups.len() {
                continue;
            }
            let mut candidate = parent.structures.clone();
            candidate[i].index = next_index;

            if self.is_canonical_child(parent.prob, parent.base_prob, &candidate, i)? {
                let prob = recompute(self.grammar, parent.base_prob, &candidate)?;
                children.push(TreeItem {
                    base_prob: parent.base_prob,
                    structures: candidate,
                    prob,
                    seq: self.next_seq(),
                });
            }
        }
        Ok(children)
    }

    /// The "parent-is-best" canonicality rule: for every position `j != i`
    /// with `candidate[j].index > 0`, construct the hypothetical
    /// predecessor by decrementing position `j`. If that predecessor's
    /// probability is strictly less than `parent_prob`, some other parent
    /// (with higher probability) legitimately owns this child — reject.
    /// On an exact tie, the smaller position wins the tie-break; reject if
    /// `j < i`.
    fn is_canonical_child(
        &self,
        parent_prob: f64,
        base_prob: f64,
        candidate: &[Structure],
        i: usize,
    ) -> PwResult<bool> {
        for j in 0..candidate.len() {
            if j == i || candidate[j].index == 0 {
                continue;
            }
            let mut hypothetical = candidate.to_vec();
            hypothetical[j].index -= 1;
            let hypothetical_prob = recompute(self.grammar, base_prob, &hypothetical)?;
            if hypothetical_prob < parent_prob {
                return Ok(false);
            }
            if (hypothetical_prob - parent_prob).abs() < 1e-9 && j < i {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::TerminalGroup;
    use std::collections::BinaryHeap;

    fn minimal_grammar() -> Grammar {
        let mut grammar = Grammar::default();
        grammar.insert_symbol(
            "X1",
            vec![
                TerminalGroup { terminals: vec!["x0".into()], prob: 0.5 },
                TerminalGroup { terminals: vec!["x1".into()], prob: 0.3 },
                TerminalGroup { terminals: vec!["x2".into()], prob: 0.2 },
            ],
        );
        grammar.insert_symbol(
            "Y1",
            vec![
                TerminalGroup { terminals: vec!["y0".into()], prob: 0.5 },
                TerminalGroup { terminals: vec!["y1".into()], prob: 0.3 },
                TerminalGroup { terminals: vec!["y2".into()], prob: 0.2 },
            ],
        );
        grammar
    }

    #[test]
    fn popped_sequence_is_non_increasing_and_canonicality_holds() {
        let grammar = minimal_grammar();
        let mut base = BaseStructureSet::default();
        base.structures.insert("X1Y1".to_string(), 1.0);

        let mut guesser = PCFGGuesser::new(&grammar);
        let initial = guesser.initial_items(&base).unwrap();
        assert_eq!(initial.len(), 1);

        let mut heap: BinaryHeap<TreeItem> = BinaryHeap::new();
        heap.push(initial.into_iter().next().unwrap());

        let mut popped = Vec::new();
        let mut seen_cursors = std::collections::HashSet::new();
        while popped.len() < 9 {
            let Some(item) = heap.pop() else { break };
            let recomputed = item.recompute_prob(&grammar).unwrap();
            assert!((recomputed - item.prob).abs() < 1e-9);

            let cursor_key: Vec<usize> = item.structures.iter().map(|s| s.index).collect();
            assert!(seen_cursors.insert(cursor_key), "duplicate derivation popped");

            for child in guesser.children(&item).unwrap() {
                heap.push(child);
            }
            popped.push(item.prob);
        }

        assert_eq!(popped.len(), 9);
        for pair in popped.windows(2) {
            assert!(pair[0] >= pair[1] - 1e-9, "popped sequence must be non-increasing");
        }
        assert_eq!(seen_cursors.len(), 9, "every (i,j) cursor pair must appear exactly once");
    }
}
