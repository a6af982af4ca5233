//! # `pwcrack-training`
//!
//! Builds a [`pwcrack::grammar::Grammar`] + [`pwcrack::omen::OmenGrammar`]
//! from a raw `DATA_FILE` of example passwords (§4.2/§4.3 of the expanded
//! spec): `config.ini` parsing, per-line validation/`$HEX[...]` decoding,
//! and the accumulate/finalize training session that `pwcrack-cli`'s
//! `train` subcommand drives.
#![warn(missing_docs)]

pub mod config;
pub mod session;
pub mod validate;

#[doc(inline)]
pub use config::TrainConfig;
#[doc(inline)]
pub use session::{TrainedModel, TrainingSession};
#[doc(inline)]
pub use validate::decode_and_validate;
