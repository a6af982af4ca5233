use std::path::PathBuf;

use pwcrack_store::{SqliteStore, StoreResult, PWCRACK_PATH_CONFIG};

/// Shared `--database` selection for both subcommands (§6: the database is
/// the persistence boundary between `train` and `guess`).
#[derive(clap::Args, Debug)]
pub struct DatabaseArgs {
    /// Path to the trained-grammar SQLite database. Defaults to the
    /// platform data directory (`$PWCRACK_DATA_DIR`, or the OS default
    /// project data dir) joined with `grammar.sqlite3`.
    #[arg(long, default_value = None)]
    pub database: Option<String>,
}

impl DatabaseArgs {
    /// Resolve the configured (or default) database path.
    pub fn resolve_path(&self) -> PathBuf {
        if let Some(path) = &self.database {
            return PathBuf::from(path);
        }
        let data_dir = PWCRACK_PATH_CONFIG
            .resolve_data_dir::<&str>(None)
            .unwrap_or_else(|| PathBuf::from("."));
        data_dir.join("grammar.sqlite3")
    }

    /// Open the database for writing, recreating its schema (used by `train`).
    pub fn create_store(&self) -> StoreResult<SqliteStore> {
        SqliteStore::create(self.resolve_path())
    }

    /// Open the database read-only (used by `guess`).
    pub fn open_store(&self) -> StoreResult<SqliteStore> {
        SqliteStore::open_readonly(self.resolve_path())
    }
}

/// `--attack-mode` (§5/§6): which grammar(s) drive enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum AttackMode {
    /// PCFG derivations, with the `M` terminal drawing from OMEN.
    Pcfg,
    /// OMEN alone, forcing base structure `[M]` with probability 1.0.
    MarkovOnly,
    /// Interleave both: the PCFG heap and a standalone OMEN sweep.
    Both,
}

/// `--mode` (§6): the configured hash algorithm. Only MD5 is presently
/// exposed; the enum is left open so fast hashes can be added without
/// touching the worker pool (§9 design note).
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum HashAlgorithm {
    /// MD5.
    Md5,
}

impl HashAlgorithm {
    /// Hash `candidate` and return its lowercase hex digest.
    pub fn digest(&self, candidate: &str) -> String {
        match self {
            HashAlgorithm::Md5 => {
                use md5::{Digest, Md5};
                let mut hasher = Md5::new();
                hasher.update(candidate.as_bytes());
                hex::encode(hasher.finalize())
            }
        }
    }
}
