//! Turns a [`TreeItem`] into its concrete candidate strings (§4.6): a
//! left-to-right, lazily-evaluated Cartesian product over each position's
//! terminal group, with two special cases — `M` instantiates an OMEN
//! guesser at the level named by its terminal, and `C<n>` overwrites the
//! trailing `n` characters already emitted rather than appending.
//!
//! Implemented as an explicit-state DFS odometer rather than a recursive
//! coroutine (§9 design note), so it can be driven one candidate at a time
//! and honor cancellation between yields (§5).

use std::sync::atomic::{AtomicBool, Ordering};

use crate::errors::{PwCrackError, PwResult};
use crate::grammar::Grammar;
use crate::omen::{OmenGrammar, OmenGuesser};
use crate::pcfg::guesser::TreeItem;

enum SlotSpec {
    /// Append one of these full-length strings.
    Append(Vec<String>),
    /// Overwrite the trailing `len` characters already emitted, one of
    /// these masks at a time (`C<n>`).
    Overwrite { len: usize, masks: Vec<String> },
    /// Append a string drawn from a fresh OMEN guesser at this level (`M`).
    Markov { target_level: u32 },
}

enum Cursor<'g> {
    Append { idx: usize },
    Overwrite { idx: usize },
    Markov(Option<OmenGuesser<'g>>),
}

/// Build the per-position slot specification for one derivation, resolving
/// `M`'s level and `C<n>`'s overwrite width against `grammar`.
fn build_specs(grammar: &Grammar, item: &TreeItem) -> PwResult<Vec<SlotSpec>> {
    let mut specs = Vec::with_capacity(item.structures.len());
    for structure in &item.structures {
        let groups = grammar.symbol(&structure.symbol).ok_or_else(|| {
            PwCrackError::OutOfRange(format!("unknown symbol {}", structure.symbol))
        })?;
        let group = groups.get(structure.index).ok_or_else(|| {
            PwCrackError::OutOfRange(format!(
                "{}[{}] out of range",
                structure.symbol, structure.index
            ))
        })?;

        if structure.symbol == "M" {
            let level: u32 = group
                .terminals
                .first()
                .ok_or_else(|| PwCrackError::GrammarConflict("M terminal group is empty".into()))?
                .parse()
                .map_err(|_| PwCrackError::GrammarConflict("M terminal is not a level".into()))?;
            specs.push(SlotSpec::Markov { target_level: level });
        } else if let Some(rest) = structure.symbol.strip_prefix('C') {
            let len: usize = rest
                .parse()
                .map_err(|_| PwCrackError::GrammarConflict(format!("bad C symbol {}", structure.symbol)))?;
            specs.push(SlotSpec::Overwrite { len, masks: group.terminals.clone() });
        } else {
            specs.push(SlotSpec::Append(group.terminals.clone()));
        }
    }
    Ok(specs)
}

/// Overwrite the trailing `mask.len()` characters of `prefix` with the
/// upper/lowercase pattern in `mask` (`'U'` -> uppercase, anything else ->
/// lowercase), preserving every other character.
fn apply_mask(prefix: &str, mask: &str, len: usize) -> String {
    let chars: Vec<char> = prefix.chars().collect();
    let split = chars.len().saturating_sub(len);
    let mut out: String = chars[..split].iter().collect();
    for (ch, m) in chars[split..].iter().zip(mask.chars()) {
        if m == 'U' {
            out.extend(ch.to_uppercase());
        } else {
            out.extend(ch.to_lowercase());
        }
    }
    out
}

/// Lazy, cancellable enumerator over one [`TreeItem`]'s concrete candidate
/// strings (§4.6).
pub struct PcfgEnumerator<'g> {
    specs: Vec<SlotSpec>,
    omen_grammar: Option<&'g OmenGrammar>,
    exit: &'g AtomicBool,
    prefixes: Vec<String>,
    cursors: Vec<Option<Cursor<'g>>>,
    pos: usize,
    done: bool,
}

impl<'g> PcfgEnumerator<'g> {
    /// Construct an enumerator over `item`'s derivation. `omen_grammar` must
    /// be `Some` if any position is the `M` symbol. `exit` is checked
    /// between every emitted candidate (§5 cancellation).
    pub fn new(
        grammar: &Grammar,
        omen_grammar: Option<&'g OmenGrammar>,
        item: &TreeItem,
        exit: &'g AtomicBool,
    ) -> PwResult<Self> {
        let specs = build_specs(grammar, item)?;
        let n = specs.len();
        Ok(Self {
            specs,
            omen_grammar,
            exit,
            prefixes: vec![String::new(); n + 1],
            cursors: (0..n).map(|_| None).collect(),
            pos: 0,
            done: n == 0,
        })
    }

    fn make_cursor(&self, pos: usize) -> Cursor<'g> {
        match &self.specs[pos] {
            SlotSpec::Append { .. } => Cursor::Append { idx: 0 },
            SlotSpec::Overwrite { .. } => Cursor::Overwrite { idx: 0 },
            SlotSpec::Markov { target_level } => {
                let guesser = self
                    .omen_grammar
                    .and_then(|g| OmenGuesser::new(g, *target_level).ok());
                Cursor::Markov(guesser)
            }
        }
    }

    fn advance(&mut self, pos: usize) -> Option<String> {
        let prefix = self.prefixes[pos].clone();
        match (&self.specs[pos], self.cursors[pos].as_mut().unwrap()) {
            (SlotSpec::Append(choices), Cursor::Append { idx }) => {
                if *idx >= choices.len() {
                    return None;
                }
                let out = format!("{prefix}{}", choices[*idx]);
                *idx += 1;
                Some(out)
            }
            (SlotSpec::Overwrite { len, masks }, Cursor::Overwrite { idx }) => {
                if *idx >= masks.len() {
                    return None;
                }
                let out = apply_mask(&prefix, &masks[*idx], *len);
                *idx += 1;
                Some(out)
            }
            (SlotSpec::Markov { .. }, Cursor::Markov(guesser)) => {
                let guesser = guesser.as_mut()?;
                let candidate = guesser.next_guess()?;
                Some(format!("{prefix}{candidate}"))
            }
            _ => unreachable!("cursor kind always matches its spec"),
        }
    }
}

impl<'g> Iterator for PcfgEnumerator<'g> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.done {
            return None;
        }
        if self.specs.is_empty() {
            self.done = true;
            return Some(String::new());
        }
        let n = self.specs.len();
        loop {
            if self.exit.load(Ordering::Relaxed) {
                self.done = true;
                return None;
            }
            if self.pos == n {
                let out = self.prefixes[n].clone();
                self.pos = n - 1;
                return Some(out);
            }
            if self.cursors[self.pos].is_none() {
                self.cursors[self.pos] = Some(self.make_cursor(self.pos));
            }
            match self.advance(self.pos) {
                Some(next_prefix) => {
                    self.prefixes[self.pos + 1] = next_prefix;
                    self.pos += 1;
                }
                None => {
                    self.cursors[self.pos] = None;
                    if self.pos == 0 {
                        self.done = true;
                        return None;
                    }
                    self.pos -= 1;
                }
            }
        }
    }
}
