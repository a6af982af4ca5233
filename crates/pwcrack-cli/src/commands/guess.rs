//! The `guess` subcommand (§6): loads a trained grammar, enumerates
//! candidate plaintexts in best-first order, and reports matches against a
//! file of target hashes.

use std::collections::{HashSet, VecDeque};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use dary_heap::OctonaryHeap;
use indicatif::{ProgressBar, ProgressStyle};
use pwcrack::grammar::BaseStructureSet;
use pwcrack::pcfg::PCFGGuesser;

use crate::common::{AttackMode, DatabaseArgs, HashAlgorithm};
use crate::pool::WorkerPool;
use crate::LogArgs;

/// Default hash-to-match buffer size per worker (§4.8).
const DEFAULT_BUFFER_SIZE: usize = 1000;
/// Recent-guess ring buffer size for the text-mode progress UI (§4.8).
const RECENT_GUESS_RING_SIZE: usize = 10;
/// How long the driver waits for any one outstanding worker before polling
/// the UI / checking for an empty target set again (§5 suspension point (c)).
const WAIT_TIMEOUT: Duration = Duration::from_millis(200);

/// Args for the `guess` subcommand.
#[derive(clap::Args, Debug)]
pub struct GuessArgs {
    #[clap(flatten)]
    logging: LogArgs,

    #[command(flatten)]
    database: DatabaseArgs,

    /// Hash algorithm to match candidates against.
    #[arg(long, value_enum, default_value_t = HashAlgorithm::Md5)]
    mode: HashAlgorithm,

    /// Which grammar(s) drive enumeration.
    #[arg(long = "attack-mode", value_enum, default_value_t = AttackMode::Pcfg)]
    attack_mode: AttackMode,

    /// Minimum candidate length to hash.
    #[arg(long = "pw-min", default_value_t = 1)]
    pw_min: usize,

    /// Maximum candidate length to hash.
    #[arg(long = "pw-max", default_value_t = 64)]
    pw_max: usize,

    /// Number of worker threads, clamped to `[1, CPU_COUNT]`.
    #[arg(long, default_value_t = default_core_count())]
    core: usize,

    /// Use an external password-cracker process + pot-file polling as the
    /// match backend instead of in-process hashing (§4.8 "alternate match
    /// backend"). Not yet wired to a concrete external tool; reserved so
    /// the flag's presence in the CLI surface matches spec §6.
    #[arg(long = "use-john")]
    use_john: bool,

    /// Dump the loaded grammar's symbol summary before guessing.
    #[arg(short = 'l', long = "log-grammar")]
    log_grammar: bool,

    /// Path to the target hash file (must end in `.hash`).
    hash_file: String,
}

fn default_core_count() -> usize {
    crate::pool::clamp_core_count(std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1))
}

impl GuessArgs {
    /// Run the `guess` subcommand.
    pub fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.logging.setup_logging(3)?;

        if !self.hash_file.ends_with(".hash") {
            return Err(format!("hash file {:?} must end in .hash", self.hash_file).into());
        }
        if self.pw_min > self.pw_max {
            return Err(format!("--pw-min ({}) exceeds --pw-max ({})", self.pw_min, self.pw_max).into());
        }

        if self.use_john {
            log::warn!(
                "--use-john requested but no external password-cracker backend is wired up; \
                 falling back to in-process hashing (§4.8 \"alternate match backend\")"
            );
        }

        let targets = load_targets(&self.hash_file)?;
        let total_targets = targets.len();
        log::info!("loaded {total_targets} target hashes from {}", self.hash_file);

        let store = self.database.open_store()?;
        let grammar = Arc::new(store.load_grammar()?);
        grammar.validate()?;

        let config = store.load_config()?;
        let ngram: usize = config.get("ngram").and_then(|v| v.parse().ok()).unwrap_or(4);
        let max_level: u32 = 10;
        let omen_grammar = Arc::new(Some(store.load_omen_grammar(ngram, max_level)?));

        if self.log_grammar {
            log_grammar_summary(&grammar);
        }

        let base_structures = select_base_structures(store.load_base_structures()?, self.attack_mode);

        let core = crate::pool::clamp_core_count(self.core);
        log::info!("dispatching up to {core} concurrent derivations");

        let mut pcfg_guesser = PCFGGuesser::new(&grammar);
        let mut heap: OctonaryHeap<pwcrack::pcfg::TreeItem> = OctonaryHeap::new();
        for item in pcfg_guesser.initial_items(&base_structures)? {
            heap.push(item);
        }

        let targets = Arc::new(Mutex::new(targets));
        let pool = WorkerPool::new(core)?;
        let exit = pool.exit_flag();

        let progress = ProgressBar::new(total_targets as u64);
        progress.set_style(
            ProgressStyle::with_template("{spinner} cracked {pos}/{len} | {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );

        let started = Instant::now();
        let mut found: Vec<(String, String)> = Vec::new();
        let mut generated: u64 = 0;
        let mut in_flight = 0usize;
        let mut recent_guesses: VecDeque<String> = VecDeque::with_capacity(RECENT_GUESS_RING_SIZE);

        loop {
            if targets.lock().expect("target set mutex poisoned").is_empty() {
                exit.store(true, Ordering::Relaxed);
            }

            while in_flight < core {
                let Some(item) = heap.pop() else { break };
                pool.submit(
                    grammar.clone(),
                    omen_grammar.clone(),
                    item,
                    targets.clone(),
                    self.mode,
                    DEFAULT_BUFFER_SIZE,
                    self.pw_min,
                    self.pw_max,
                );
                in_flight += 1;
            }

            if in_flight == 0 {
                break;
            }

            if let Some(outcome) = pool.recv_outcome(WAIT_TIMEOUT) {
                in_flight -= 1;
                generated += outcome.generated;
                found.extend(outcome.matches);
                if !exit.load(Ordering::Relaxed) {
                    for child in outcome.children {
                        heap.push(child);
                    }
                }
            }

            for candidate in pool.drain_candidates() {
                if recent_guesses.len() == RECENT_GUESS_RING_SIZE {
                    recent_guesses.pop_front();
                }
                recent_guesses.push_back(candidate);
            }

            let remaining = targets.lock().expect("target set mutex poisoned").len();
            progress.set_position((total_targets - remaining) as u64);
            if let Some(last) = recent_guesses.back() {
                progress.set_message(format!("{generated} generated, last: {last}"));
            }
        }

        progress.finish_and_clear();

        let elapsed = started.elapsed().as_secs_f64();
        println!(
            "{}/{total_targets} cracked in {elapsed:.2}s, {generated} candidates",
            found.len()
        );
        for (digest, plaintext) in &found {
            println!("{digest}:{plaintext}");
        }

        Ok(())
    }
}

/// Apply `--attack-mode` (§4.6) to the loaded base-structure prior.
fn select_base_structures(loaded: BaseStructureSet, mode: AttackMode) -> BaseStructureSet {
    match mode {
        AttackMode::Pcfg => loaded,
        AttackMode::MarkovOnly => {
            // "attack_mode=1 forces base structure [M] with prob=1.0" (spec §8f).
            let mut forced = BaseStructureSet::default();
            forced.structures.insert("M".to_string(), 1.0);
            forced
        }
        AttackMode::Both => {
            let mut combined = loaded;
            if !combined.structures.contains_key("M") {
                // No Markov structure survived training (markov_proportion == 1.0):
                // synthesize one so OMEN derivations interleave with PCFG
                // derivations in the same heap, per §4.6's "interleave both".
                let n = combined.structures.len().max(1) as f64;
                for weight in combined.structures.values_mut() {
                    *weight *= n / (n + 1.0);
                }
                combined.structures.insert("M".to_string(), 1.0 / (n + 1.0));
            }
            combined
        }
    }
}

/// Load and validate target hex digests (§6 "Hash-file format"): one
/// lowercase hex digest per line, blank lines ignored.
fn load_targets(path: &str) -> Result<HashSet<String>, Box<dyn std::error::Error>> {
    let file = File::open(path).map_err(|e| format!("failed to open hash file {path:?}: {e}"))?;
    let reader = BufReader::new(file);
    let mut targets = HashSet::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if !trimmed.bytes().all(|b| b.is_ascii_hexdigit()) || trimmed.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(format!("{path}:{}: not a lowercase hex digest: {trimmed:?}", lineno + 1).into());
        }
        targets.insert(trimmed.to_string());
    }
    Ok(targets)
}

fn log_grammar_summary(grammar: &pwcrack::grammar::Grammar) {
    let mut symbols: Vec<&str> = grammar.symbols().map(|(s, _)| s).collect();
    symbols.sort();
    for symbol in symbols {
        let groups = grammar.symbol(symbol).unwrap_or(&[]);
        log::info!("{symbol}: {} terminal group(s)", groups.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markov_only_forces_m_with_prob_one() {
        let mut loaded = BaseStructureSet::default();
        loaded.structures.insert("A4".to_string(), 1.0);
        let forced = select_base_structures(loaded, AttackMode::MarkovOnly);
        assert_eq!(forced.structures.len(), 1);
        assert_eq!(forced.structures.get("M"), Some(&1.0));
    }

    #[test]
    fn pcfg_mode_leaves_loaded_structures_untouched() {
        let mut loaded = BaseStructureSet::default();
        loaded.structures.insert("A4".to_string(), 1.0);
        let kept = select_base_structures(loaded.clone(), AttackMode::Pcfg);
        assert_eq!(kept.structures, loaded.structures);
    }

    #[test]
    fn both_mode_synthesizes_markov_structure_when_absent() {
        let mut loaded = BaseStructureSet::default();
        loaded.structures.insert("A4".to_string(), 1.0);
        let combined = select_base_structures(loaded, AttackMode::Both);
        assert!(combined.structures.contains_key("M"));
        let total: f64 = combined.structures.values().sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn load_targets_rejects_uppercase_hex() {
        let dir = tempdir::TempDir::new("pwcrack-guess-test").unwrap();
        let path = dir.path().join("targets.hash");
        std::fs::write(&path, "ABCDEF0123456789\n").unwrap();
        assert!(load_targets(path.to_str().unwrap()).is_err());
    }

    #[test]
    fn load_targets_ignores_blank_lines() {
        let dir = tempdir::TempDir::new("pwcrack-guess-test").unwrap();
        let path = dir.path().join("targets.hash");
        std::fs::write(&path, "5f4dcc3b5aa765d61d8327deb882cf99\n\n\n").unwrap();
        let targets = load_targets(path.to_str().unwrap()).unwrap();
        assert_eq!(targets.len(), 1);
    }
}
