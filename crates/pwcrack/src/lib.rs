#![warn(missing_docs, unused)]
//! # `pwcrack`
//!
//! Core library for a probabilistic password-guessing engine combining a
//! PCFG (probabilistic context-free grammar) over password *structure* with
//! an OMEN n-gram Markov model as a low-probability backoff terminal.
//!
//! ## Client Summary
//!
//! * [`detect`] — the detector pipeline that segments a training password
//!   into labeled runs (keyboard walk, year, digit, alphabet/Hangul,
//!   special, dictionary word, leet variant, capitalization mask).
//! * [`grammar`] — the PCFG data model: [`grammar::Grammar`]'s per-symbol
//!   terminal groups, [`grammar::BaseStructureSet`], and the add-one-smoothed
//!   [`grammar::UnigramProbs`] table.
//! * [`pcfg`] — [`pcfg::PCFGGuesser`]'s best-first derivation enumeration
//!   over [`pcfg::TreeItem`], and [`pcfg::PcfgEnumerator`], which turns one
//!   derivation into its concrete candidate strings.
//! * [`omen`] — the n-gram Markov grammar ([`omen::OmenGrammar`]) and its
//!   best-first guesser ([`omen::OmenGuesser`]), usable standalone
//!   (attack-mode 1) or as the PCFG `M` terminal.
//! * [`types`] — shared types: [`types::Label`], [`types::Segment`].
//! * [`errors`] — [`errors::PwCrackError`] / [`errors::PwResult`].
//!
//! This crate is pure and I/O-free: grammars are loaded once by
//! `pwcrack-training`/`pwcrack-store` and then shared read-only (`Arc`)
//! across worker threads by `pwcrack-cli`.

pub mod detect;
pub mod errors;
pub mod grammar;
pub mod omen;
pub mod pcfg;
pub mod types;

pub use errors::{PwCrackError, PwResult};
pub use types::{Label, Segment};
