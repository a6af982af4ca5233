//! OMEN: an n-gram Markov-backoff grammar, used both as a standalone
//! guessing mode and as the low-probability `M` terminal inside PCFG
//! derivations (§4.4, §4.5).

pub mod grammar;
pub mod guesser;

pub use grammar::{OmenGrammar, OmenGrammarBuilder};
pub use guesser::OmenGuesser;
