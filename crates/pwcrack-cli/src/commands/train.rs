//! The `train` subcommand (§6): builds a PCFG + OMEN grammar from a
//! `DATA_FILE` of leaked passwords and persists it with `pwcrack-store`.

use std::io::{BufRead, BufReader};
use std::path::Path;

use pwcrack_training::{decode_and_validate, TrainConfig, TrainingSession};

use crate::common::DatabaseArgs;
use crate::LogArgs;

/// Args for the `train` subcommand.
#[derive(clap::Args, Debug)]
pub struct TrainArgs {
    /// Source corpus: a `.db` SQLite file (reads `password_train_data_filtered`)
    /// or a `.txt` line-delimited file (`$HEX[...]` lines decoded as hex-encoded
    /// UTF-8).
    data_file: String,

    #[clap(flatten)]
    logging: LogArgs,

    #[command(flatten)]
    database: DatabaseArgs,

    /// Path to `config.ini`. Falls back to built-in defaults if absent.
    #[arg(long, default_value = "config.ini")]
    config: String,

    /// Optional pre-built Korean word list (one word per line) to force-promote
    /// into the Hangul word trie regardless of observed frequency (§4.3).
    #[arg(long = "korean-words")]
    korean_words: Option<String>,

    /// Maximum OMEN level (§4.4's `clamp(..., 0, max_level)`).
    #[arg(long, default_value_t = 10)]
    max_level: u32,
}

impl TrainArgs {
    /// Run the `train` subcommand.
    pub fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.logging.setup_logging(3)?;

        let config = match std::fs::read_to_string(&self.config) {
            Ok(body) => TrainConfig::from_ini_str(&body)?,
            Err(_) => {
                log::info!("{} not found, using default training configuration", self.config);
                TrainConfig::default()
            }
        };

        let mut session = TrainingSession::new(config.clone());

        if let Some(path) = &self.korean_words {
            let body = std::fs::read_to_string(path)?;
            session.pretrain_korean_words(body.lines().map(str::trim).filter(|l| !l.is_empty()));
        }

        log::info!("reading training corpus from {}", self.data_file);
        let mut accepted = 0u64;
        let mut dropped = 0u64;
        for line in self.read_passwords()? {
            match decode_and_validate(&line, config.min_length, config.max_length) {
                Some(password) => {
                    session.ingest(&password);
                    accepted += 1;
                }
                None => {
                    log::debug!("dropped malformed/out-of-range training line: {line:?}");
                    dropped += 1;
                }
            }
            if accepted > 0 && accepted % 100_000 == 0 {
                log::info!("{accepted} passwords ingested so far");
            }
        }
        log::info!("ingested {accepted} passwords, dropped {dropped}");

        let model = session.finalize(self.max_level);
        log::info!(
            "finalized grammar: {} base structures, {} valid passwords",
            model.base_structures.structures.len(),
            model.valid_password_count
        );

        let store = self.database.create_store()?;
        store.write_grammar_categories(&model.grammar)?;
        store.write_base_structures(&model.base_structures)?;
        store.write_unigram_probs(&model.unigram_probs)?;
        store.write_omen_grammar(&model.omen_grammar, &model.keyspace, &model.passwords_per_level)?;
        store.write_config(&[
            ("ngram", &config.ngram.to_string()),
            ("encoding", &config.encoding),
            ("min_length", &config.min_length.to_string()),
            ("max_length", &config.max_length.to_string()),
            ("alphabet", &config.alphabet),
            ("needed_appear", &config.needed_appear.to_string()),
            ("weight", &config.weight.to_string()),
            ("markov_proportion", &config.markov_proportion.to_string()),
        ])?;

        log::info!("wrote trained grammar to {:?}", self.database.resolve_path());
        Ok(())
    }

    /// Read raw training lines from `data_file`, dispatching on its
    /// extension (§6): `.db` sources `SELECT password FROM
    /// password_train_data_filtered`; `.txt` sources are line-delimited.
    fn read_passwords(&self) -> Result<Vec<String>, Box<dyn std::error::Error>> {
        let path = Path::new(&self.data_file);
        match path.extension().and_then(|e| e.to_str()) {
            Some("db") => read_sqlite_passwords(&self.data_file),
            Some("txt") => read_text_passwords(&self.data_file),
            _ => Err(format!("{:?}: DATA_FILE must end in .db or .txt", self.data_file).into()),
        }
    }
}

fn read_sqlite_passwords(path: &str) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let conn = rusqlite::Connection::open_with_flags(path, rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY)?;
    let mut stmt = conn.prepare("SELECT password FROM password_train_data_filtered")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

fn read_text_passwords(path: &str) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let reader = BufReader::new(std::fs::File::open(path)?);
    let mut out = Vec::new();
    for line in reader.lines() {
        out.push(line?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unsupported_extension() {
        let args = TrainArgs {
            data_file: "corpus.csv".to_string(),
            logging: LogArgs::default(),
            database: DatabaseArgs { database: None },
            config: "config.ini".to_string(),
            korean_words: None,
            max_level: 10,
        };
        assert!(args.read_passwords().is_err());
    }

    #[test]
    fn reads_text_corpus_line_by_line() {
        let dir = tempdir::TempDir::new("pwcrack-train-test").unwrap();
        let path = dir.path().join("corpus.txt");
        std::fs::write(&path, "password1\nhunter2\n").unwrap();
        let args = TrainArgs {
            data_file: path.to_str().unwrap().to_string(),
            logging: LogArgs::default(),
            database: DatabaseArgs { database: None },
            config: "config.ini".to_string(),
            korean_words: None,
            max_level: 10,
        };
        let lines = args.read_passwords().unwrap();
        assert_eq!(lines, vec!["password1".to_string(), "hunter2".to_string()]);
    }
}
