//! # `pwcrack-store`
//!
//! SQLite-backed persistence for a trained PCFG+OMEN grammar, plus
//! base-directory resolution for where that database lives on disk.
#![warn(missing_docs)]

mod errors;
mod path_resolver;
mod path_utils;
mod store;

#[doc(inline)]
pub use errors::{StoreError, StoreResult};
#[doc(inline)]
pub use path_resolver::PathResolver;
#[doc(inline)]
pub use path_utils::extend_path;
#[doc(inline)]
pub use store::SqliteStore;

/// Environment variable key to override the default cache directory.
pub const PWCRACK_CACHE_DIR: &str = "PWCRACK_CACHE_DIR";
/// Environment variable key to override the default data directory.
pub const PWCRACK_DATA_DIR: &str = "PWCRACK_DATA_DIR";

/// Default [`PathResolver`] for pwcrack, used to locate the trained-grammar
/// database when `--output`/`--database` isn't given explicitly.
pub const PWCRACK_PATH_CONFIG: PathResolver = PathResolver {
    qualifier: "io.crates.pwcrack",
    organization: "",
    application: "pwcrack",
    cache_env_vars: &[PWCRACK_CACHE_DIR],
    data_env_vars: &[PWCRACK_DATA_DIR],
};
