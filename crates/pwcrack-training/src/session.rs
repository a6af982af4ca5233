//! The training pipeline's "accumulate, then finalize" shape (§9 of the
//! expanded spec): `TrainingSession::ingest` folds one password at a time
//! into running counters; `TrainingSession::finalize` builds the immutable
//! `Grammar` + `OmenGrammar` a `guess` session loads.

use pwcrack::detect::{keyboard, word_trie::WordTrie};
use pwcrack::grammar::{symbol_name, BaseStructureSet, Grammar, UnigramProbs};
use pwcrack::omen::{OmenGrammar, OmenGrammarBuilder};
use pwcrack::pcfg::parser;
use pwcrack::types::{CommonHashMap, Label};

use crate::config::TrainConfig;

/// The fully-trained, immutable model produced by [`TrainingSession::finalize`].
pub struct TrainedModel {
    /// The PCFG terminal-group grammar.
    pub grammar: Grammar,
    /// The base-structure prior, with the `markov_proportion` knob applied.
    pub base_structures: BaseStructureSet,
    /// Add-one-smoothed unigram probabilities for promoted Korean words.
    pub unigram_probs: UnigramProbs,
    /// The trained OMEN n-gram grammar.
    pub omen_grammar: OmenGrammar,
    /// Keyspace per level (§4.4), used to derive `PcfgOmenProb`.
    pub keyspace: CommonHashMap<u32, f64>,
    /// Training passwords observed at each OMEN level (§8 invariant 5).
    pub passwords_per_level: CommonHashMap<u32, f64>,
    /// Total number of accepted training passwords.
    pub valid_password_count: u64,
}

/// Running accumulation state for one training run.
pub struct TrainingSession {
    config: TrainConfig,
    hangul_trie: WordTrie,
    category_counts: CommonHashMap<String, CommonHashMap<String, u64>>,
    base_structure_counts: CommonHashMap<String, u64>,
    omen_builder: OmenGrammarBuilder,
    passwords: Vec<String>,
    valid_password_count: u64,
}

impl TrainingSession {
    /// Construct an empty session for `config`.
    pub fn new(config: TrainConfig) -> Self {
        let ngram = config.ngram;
        let needed_appear = config.needed_appear;
        Self {
            config,
            hangul_trie: WordTrie::new(needed_appear),
            category_counts: CommonHashMap::new(),
            base_structure_counts: CommonHashMap::new(),
            omen_builder: OmenGrammarBuilder::new(ngram),
            passwords: Vec::new(),
            valid_password_count: 0,
        }
    }

    /// Pre-train the Korean word trie from an external corpus (§4.3): every
    /// word given here is promoted regardless of how rarely it is
    /// subsequently observed in the training stream.
    pub fn pretrain_korean_words<'a>(&mut self, words: impl IntoIterator<Item = &'a str>) {
        for word in words {
            self.hangul_trie.pretrain_word(&word.to_lowercase());
        }
    }

    /// Fold one already-validated-and-decoded password into the running
    /// counters (§4.2). Malformed input should be filtered out beforehand
    /// with [`crate::validate::decode_and_validate`]; this method assumes a
    /// clean password and never fails.
    pub fn ingest(&mut self, password: &str) {
        let variants = {
            let trie = &self.hangul_trie;
            let lexicon = move |folded: &str| trie.count(folded).map(|c| (folded.to_string(), c as f64));
            parser::parse_password(password, keyboard::MIN_RUN_DEFAULT, &lexicon)
        };

        for variant in &variants {
            *self.base_structure_counts.entry(variant.base_structure.clone()).or_insert(0) += 1;

            for seg in &variant.segments {
                if seg.label == Label::Capitalization {
                    continue;
                }
                let symbol = symbol_name(seg.label, seg.len());
                *self
                    .category_counts
                    .entry(symbol)
                    .or_default()
                    .entry(seg.text.clone())
                    .or_insert(0) += 1;
            }
            for (symbol, mask) in &variant.capitalization_masks {
                *self
                    .category_counts
                    .entry(symbol.clone())
                    .or_default()
                    .entry(mask.clone())
                    .or_insert(0) += 1;
            }
            for (word, label) in &variant.words {
                if *label == Label::Hangul {
                    self.hangul_trie.commit_word(word, 0);
                }
            }
        }

        self.omen_builder.parse(password, self.config.weight);
        self.passwords.push(password.to_string());
        self.valid_password_count += 1;
    }

    /// Number of passwords folded in so far.
    pub fn valid_password_count(&self) -> u64 {
        self.valid_password_count
    }

    /// Apply `needed_appear` filtering, OMEN level smoothing, and the
    /// `markov_proportion` knob, producing the immutable trained model.
    pub fn finalize(
        self,
        max_level: u32,
    ) -> TrainedModel {
        let needed_appear = self.config.needed_appear;
        let mut grammar = Grammar::default();
        for (symbol, counts) in self.category_counts {
            let filtered: CommonHashMap<String, u64> =
                counts.into_iter().filter(|(_, count)| *count >= needed_appear).collect();
            if filtered.is_empty() {
                continue;
            }
            grammar.insert_symbol_from_counts(symbol, filtered);
        }

        let mut base_structures = BaseStructureSet::from_counts(&self.base_structure_counts);
        base_structures.apply_markov_proportion(self.valid_password_count, self.config.markov_proportion);

        let korean_counts: CommonHashMap<String, (String, u64)> = self
            .hangul_trie
            .promoted_words()
            .into_iter()
            .map(|(word, count)| (word.clone(), (word, count)))
            .collect();
        let unigram_probs = UnigramProbs::from_counts(&korean_counts);

        let omen_grammar = self.omen_builder.finalize(max_level);
        let keyspace = omen_grammar.keyspace(max_level, 1e10);

        let mut passwords_per_level: CommonHashMap<u32, f64> = CommonHashMap::new();
        for password in &self.passwords {
            if let Some(level) = omen_grammar.password_level(password) {
                *passwords_per_level.entry(level).or_insert(0.0) += 1.0;
            }
        }

        TrainedModel {
            grammar,
            base_structures,
            unigram_probs,
            omen_grammar,
            keyspace,
            passwords_per_level,
            valid_password_count: self.valid_password_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ingest_builds_a_valid_grammar() {
        let mut config = TrainConfig::default();
        config.needed_appear = 1;
        let mut session = TrainingSession::new(config);
        for pw in ["abc1234", "abc5678", "xyz9999", "password1"] {
            session.ingest(pw);
        }
        let model = session.finalize(10);
        model.grammar.validate().unwrap();
        let base_sum: f64 = model.base_structures.structures.values().sum();
        assert!((base_sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn needed_appear_filters_rare_terminals() {
        let mut config = TrainConfig::default();
        config.needed_appear = 3;
        let mut session = TrainingSession::new(config);
        session.ingest("onlyonce1");
        let model = session.finalize(10);
        // "onlyonce" only appears once; its A<n> symbol should be dropped
        // entirely rather than surviving with prob 1.0 from a single count.
        assert!(model.grammar.symbol("A8").is_none());
    }

    #[test]
    fn passwords_per_level_sums_to_valid_count_for_long_enough_passwords() {
        let mut config = TrainConfig::default();
        config.min_length = 4;
        let mut session = TrainingSession::new(config);
        for pw in ["password", "passphrase", "passenger", "passport"] {
            session.ingest(pw);
        }
        let model = session.finalize(10);
        let total: f64 = model.passwords_per_level.values().sum();
        assert_eq!(total as u64, model.valid_password_count);
    }
}
