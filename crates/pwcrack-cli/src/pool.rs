//! The worker pool & match pipeline (§4.8): parallel workers consume
//! derivations, stream candidates, hash, compare against a target set, and
//! feed new children back to the shared heap the driver owns.
//!
//! Each [`WorkItem`] carries only `(structures, base_prob)` across the
//! thread boundary — no grammar crosses it, only an `Arc` handle (§9 design
//! note "Worker boundary").

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, SyncSender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pwcrack::grammar::Grammar;
use pwcrack::omen::OmenGrammar;
use pwcrack::pcfg::{PCFGGuesser, PcfgEnumerator, TreeItem};

use crate::common::HashAlgorithm;

/// A cracked `(hex digest, plaintext)` pair.
pub type Match = (String, String);

/// What a worker reports back to the driver when its node's stream is
/// exhausted or cancelled: the node's canonical children (to push onto the
/// heap) and any matches found along the way (§4.8 steps 3-4).
pub struct WorkOutcome {
    /// Canonical children of the completed node (§4.6).
    pub children: Vec<TreeItem>,
    /// Matches found while streaming this node's candidates.
    pub matches: Vec<Match>,
    /// Number of candidates generated by this node (for the UI's running total).
    pub generated: u64,
}

/// A bounded pool of worker threads plus the shared channels workers
/// publish through (§5 "Shared-resource policy"): a multiple-producer,
/// single-consumer candidate stream for the UI, and a single `mpsc`
/// channel workers use to return `WorkOutcome`s to the driver.
pub struct WorkerPool {
    pool: rayon::ThreadPool,
    outcome_tx: Sender<WorkOutcome>,
    outcome_rx: Receiver<WorkOutcome>,
    candidate_tx: SyncSender<String>,
    candidate_rx: Receiver<String>,
    exit: Arc<AtomicBool>,
}

impl WorkerPool {
    /// Build a pool with `core` worker threads (`--core`, clamped to `[1,
    /// CPU_COUNT]` by the caller).
    pub fn new(core: usize) -> Result<Self, rayon::ThreadPoolBuildError> {
        let pool = rayon::ThreadPoolBuilder::new().num_threads(core).build()?;
        let (outcome_tx, outcome_rx) = mpsc::channel();
        let (candidate_tx, candidate_rx) = mpsc::sync_channel(10_000);
        Ok(Self {
            pool,
            outcome_tx,
            outcome_rx,
            candidate_tx,
            candidate_rx,
            exit: Arc::new(AtomicBool::new(false)),
        })
    }

    /// The shared cancellation flag (§5): set it to stop every in-flight
    /// worker at its next candidate or OMEN-guesser boundary.
    pub fn exit_flag(&self) -> Arc<AtomicBool> {
        self.exit.clone()
    }

    /// Submit one derivation to the pool. Returns immediately; the
    /// `WorkOutcome` arrives later via [`WorkerPool::recv_outcome`].
    #[allow(clippy::too_many_arguments)]
    pub fn submit(
        &self,
        grammar: Arc<Grammar>,
        omen_grammar: Arc<Option<OmenGrammar>>,
        item: TreeItem,
        targets: Arc<Mutex<HashSet<String>>>,
        hash_algorithm: HashAlgorithm,
        buffer_size: usize,
        pw_min: usize,
        pw_max: usize,
    ) {
        let outcome_tx = self.outcome_tx.clone();
        let candidate_tx = self.candidate_tx.clone();
        let exit = self.exit.clone();

        self.pool.spawn(move || {
            let outcome = run_one(
                &grammar,
                omen_grammar.as_ref().as_ref(),
                &item,
                &targets,
                hash_algorithm,
                buffer_size,
                pw_min,
                pw_max,
                &candidate_tx,
                &exit,
            );
            // The driver may have already shut down its receiver on
            // cancellation; a dropped receiver here is not an error.
            let _ = outcome_tx.send(outcome);
        });
    }

    /// Bounded wait (§5 suspension point (c)) for any one outstanding
    /// `WorkOutcome`. Never deadlocks: returns `None` on timeout.
    pub fn recv_outcome(&self, timeout: Duration) -> Option<WorkOutcome> {
        self.outcome_rx.recv_timeout(timeout).ok()
    }

    /// Drain whatever candidates have accumulated on the UI stream without
    /// blocking (§5 suspension point (d)).
    pub fn drain_candidates(&self) -> Vec<String> {
        self.candidate_rx.try_iter().collect()
    }
}

/// One worker's run over a single derivation (§4.8 steps 1-4): stream
/// candidates, hash-and-match in batches of `buffer_size`, then compute the
/// node's canonical children.
#[allow(clippy::too_many_arguments)]
fn run_one(
    grammar: &Grammar,
    omen_grammar: Option<&OmenGrammar>,
    item: &TreeItem,
    targets: &Mutex<HashSet<String>>,
    hash_algorithm: HashAlgorithm,
    buffer_size: usize,
    pw_min: usize,
    pw_max: usize,
    candidate_tx: &SyncSender<String>,
    exit: &AtomicBool,
) -> WorkOutcome {
    let mut generated: u64 = 0;
    let mut matches = Vec::new();
    let mut buffer: Vec<String> = Vec::with_capacity(buffer_size);

    match PcfgEnumerator::new(grammar, omen_grammar, item, exit) {
        Ok(enumerator) => {
            for candidate in enumerator {
                generated += 1;
                // Best-effort publish; a full/disconnected UI channel never
                // blocks candidate generation.
                let _ = candidate_tx.try_send(candidate.clone());
                let len = candidate.chars().count();
                if len >= pw_min && len <= pw_max {
                    buffer.push(candidate);
                }
                if buffer.len() >= buffer_size {
                    flush_buffer(&mut buffer, hash_algorithm, targets, &mut matches);
                }
            }
            flush_buffer(&mut buffer, hash_algorithm, targets, &mut matches);
        }
        Err(err) => {
            log::error!("worker failed to build enumerator: {err}");
        }
    }

    let children = match PCFGGuesser::new(grammar).children(item) {
        Ok(children) => children,
        Err(err) => {
            log::error!("worker failed to compute children: {err}");
            Vec::new()
        }
    };

    WorkOutcome { children, matches, generated }
}

/// Hash every buffered candidate and check it against the shared target
/// set (§4.8 step 3); removal is idempotent so concurrent workers can never
/// double-report the same hash.
fn flush_buffer(
    buffer: &mut Vec<String>,
    hash_algorithm: HashAlgorithm,
    targets: &Mutex<HashSet<String>>,
    matches: &mut Vec<Match>,
) {
    for candidate in buffer.drain(..) {
        let digest = hash_algorithm.digest(&candidate);
        let removed = {
            let mut guard = targets.lock().expect("target set mutex poisoned");
            guard.remove(&digest)
        };
        if removed {
            matches.push((digest, candidate));
        }
    }
}

/// Resolve the effective worker count for `--core`, clamping to `[1,
/// CPU_COUNT]` (§6).
pub fn clamp_core_count(requested: usize) -> usize {
    let max = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
    requested.clamp(1, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pwcrack::grammar::{symbol_name, BaseStructureSet, TerminalGroup};
    use pwcrack::types::Label;
    use std::time::Duration;

    fn md5_hex(s: &str) -> String {
        use md5::{Digest, Md5};
        let mut hasher = Md5::new();
        hasher.update(s.as_bytes());
        hex::encode(hasher.finalize())
    }

    #[test]
    fn submits_a_derivation_and_reports_a_match() {
        let mut grammar = Grammar::default();
        grammar.insert_symbol(
            symbol_name(Label::Alpha, 8),
            vec![TerminalGroup { terminals: vec!["password".into()], prob: 1.0 }],
        );
        grammar.insert_symbol(
            symbol_name(Label::Capitalization, 8),
            vec![TerminalGroup { terminals: vec!["LLLLLLLL".into()], prob: 1.0 }],
        );
        let grammar = Arc::new(grammar);

        let mut base = BaseStructureSet::default();
        base.structures.insert("A8".to_string(), 1.0);
        let mut guesser = PCFGGuesser::new(&grammar);
        let item = guesser.initial_items(&base).unwrap().into_iter().next().unwrap();

        let mut targets = HashSet::new();
        targets.insert(md5_hex("password"));
        let targets = Arc::new(Mutex::new(targets));

        let pool = WorkerPool::new(1).unwrap();
        pool.submit(grammar, Arc::new(None), item, targets.clone(), HashAlgorithm::Md5, 1000, 0, 64);

        let outcome = pool.recv_outcome(Duration::from_secs(5)).expect("outcome within timeout");
        assert_eq!(outcome.matches.len(), 1);
        assert_eq!(outcome.matches[0].1, "password");
        assert!(targets.lock().unwrap().is_empty());
    }

    #[test]
    fn core_count_clamps_to_at_least_one() {
        assert!(clamp_core_count(0) >= 1);
        assert!(clamp_core_count(10_000) <= std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1));
    }
}
