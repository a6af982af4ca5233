//! PCFG parsing and best-first guessing.

pub mod enumerate;
pub mod guesser;
pub mod parser;

pub use enumerate::PcfgEnumerator;
pub use guesser::{PCFGGuesser, Structure, TreeItem};
