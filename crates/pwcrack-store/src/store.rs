//! SQLite persistence for a trained PCFG+OMEN grammar (§4.9/§6). Every table
//! is dropped and recreated per training run; `guess` sessions open the
//! database read-only and load every table back into the in-memory grammar
//! types from `pwcrack`.

use std::path::Path;

use pwcrack::grammar::{BaseStructureSet, Grammar, TerminalGroup, UnigramProbs};
use pwcrack::omen::OmenGrammar;
use pwcrack::types::{CommonHashMap, Label};
use rusqlite::{params, Connection, OptionalExtension};

use crate::errors::{StoreError, StoreResult};

/// The per-category grammar tables (§4.9): one table per detector label
/// that contributes terminal groups, named by that label's single-letter
/// symbol (`K`, `Y`, `A`, `C`, `D`, `S`, `H`).
const CATEGORY_LABELS: [Label; 7] = [
    Label::Keyboard,
    Label::Year,
    Label::Alpha,
    Label::Capitalization,
    Label::Digit,
    Label::Special,
    Label::Hangul,
];

fn category_table(label: Label) -> String {
    format!("Category_{label}")
}

/// A SQLite-backed grammar database (§4.9).
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (creating if absent) the database at `path` and drop-and-recreate
    /// every table, ready for a fresh training run to populate.
    pub fn create(path: impl AsRef<Path>) -> StoreResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.drop_and_create_schema()?;
        Ok(store)
    }

    /// Open an existing database read-only, for a `guess` session.
    pub fn open_readonly(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open_with_flags(path, rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        Ok(Self { conn })
    }

    fn drop_and_create_schema(&self) -> StoreResult<()> {
        for label in CATEGORY_LABELS {
            let table = category_table(label);
            self.conn.execute(&format!("DROP TABLE IF EXISTS {table}"), [])?;
            self.conn.execute(
                &format!("CREATE TABLE {table} (length TEXT NOT NULL, item TEXT NOT NULL, probability REAL NOT NULL)"),
                [],
            )?;
        }
        self.conn.execute("DROP TABLE IF EXISTS Grammar", [])?;
        self.conn.execute(
            "CREATE TABLE Grammar (length TEXT NOT NULL, item TEXT NOT NULL, probability REAL NOT NULL)",
            [],
        )?;
        self.conn.execute("DROP TABLE IF EXISTS UnigramProbs", [])?;
        self.conn.execute(
            "CREATE TABLE UnigramProbs (token TEXT PRIMARY KEY, canonical TEXT NOT NULL, probability REAL NOT NULL)",
            [],
        )?;
        self.conn.execute("DROP TABLE IF EXISTS PrefixLevel", [])?;
        self.conn
            .execute("CREATE TABLE PrefixLevel (level INTEGER NOT NULL, prefix TEXT NOT NULL)", [])?;
        self.conn.execute("DROP TABLE IF EXISTS SuffixLevel", [])?;
        self.conn
            .execute("CREATE TABLE SuffixLevel (prefix TEXT NOT NULL, level INTEGER NOT NULL)", [])?;
        self.conn.execute("DROP TABLE IF EXISTS ConditionalProb", [])?;
        self.conn.execute(
            "CREATE TABLE ConditionalProb (prefix TEXT NOT NULL, level INTEGER NOT NULL, next_char TEXT NOT NULL)",
            [],
        )?;
        self.conn.execute("DROP TABLE IF EXISTS LengthLevel", [])?;
        self.conn
            .execute("CREATE TABLE LengthLevel (length INTEGER NOT NULL, level INTEGER NOT NULL)", [])?;
        self.conn.execute("DROP TABLE IF EXISTS Alphabet", [])?;
        self.conn.execute("CREATE TABLE Alphabet (ch TEXT NOT NULL)", [])?;
        self.conn.execute("DROP TABLE IF EXISTS OmenKeyspace", [])?;
        self.conn.execute(
            "CREATE TABLE OmenKeyspace (level INTEGER PRIMARY KEY, keyspace REAL NOT NULL)",
            [],
        )?;
        self.conn.execute("DROP TABLE IF EXISTS PasswordsPerLevel", [])?;
        self.conn.execute(
            "CREATE TABLE PasswordsPerLevel (level INTEGER PRIMARY KEY, count REAL NOT NULL)",
            [],
        )?;
        self.conn.execute("DROP TABLE IF EXISTS PcfgOmenProb", [])?;
        self.conn.execute(
            "CREATE TABLE PcfgOmenProb (level INTEGER PRIMARY KEY, probability REAL NOT NULL)",
            [],
        )?;
        self.conn.execute("DROP TABLE IF EXISTS Config", [])?;
        self.conn
            .execute("CREATE TABLE Config (key TEXT PRIMARY KEY, value TEXT NOT NULL)", [])?;
        Ok(())
    }

    /// Persist every category symbol present in `grammar` (any `K<n>`,
    /// `Y<n>`, `A<n>`, `C<n>`, `D<n>`, `S<n>`, `H<n>` symbol) into its
    /// category table.
    pub fn write_grammar_categories(&self, grammar: &Grammar) -> StoreResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        for (symbol, groups) in grammar.symbols() {
            if symbol == "M" {
                continue;
            }
            let Some(label) = symbol.chars().next().and_then(label_from_char) else {
                continue;
            };
            let table = category_table(label);
            let length: String = symbol.chars().skip(1).collect();
            for group in groups {
                for terminal in &group.terminals {
                    tx.execute(
                        &format!("INSERT INTO {table} (length, item, probability) VALUES (?1, ?2, ?3)"),
                        params![length, terminal, group.prob],
                    )?;
                }
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Persist the base-structure set as `Grammar` rows.
    pub fn write_base_structures(&self, base_structures: &BaseStructureSet) -> StoreResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        for (structure, prob) in &base_structures.structures {
            tx.execute(
                "INSERT INTO Grammar (length, item, probability) VALUES ('grammar', ?1, ?2)",
                params![structure, prob],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Persist the add-one-smoothed unigram table.
    pub fn write_unigram_probs(&self, unigrams: &UnigramProbs) -> StoreResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        for (folded, canonical, prob) in unigrams.iter() {
            tx.execute(
                "INSERT INTO UnigramProbs (token, canonical, probability) VALUES (?1, ?2, ?3)",
                params![folded, canonical, prob],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Persist every OMEN table: `PrefixLevel`, `SuffixLevel`,
    /// `ConditionalProb`, `LengthLevel`, `Alphabet`, plus the derived
    /// `OmenKeyspace`/`PasswordsPerLevel`/`PcfgOmenProb` tables.
    pub fn write_omen_grammar(
        &self,
        omen: &OmenGrammar,
        keyspace: &CommonHashMap<u32, f64>,
        passwords_per_level: &CommonHashMap<u32, f64>,
    ) -> StoreResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        for (level, prefix) in omen.ip_entries() {
            tx.execute("INSERT INTO PrefixLevel (level, prefix) VALUES (?1, ?2)", params![level, prefix])?;
        }
        for (prefix, level) in omen.ending_level_entries() {
            tx.execute("INSERT INTO SuffixLevel (prefix, level) VALUES (?1, ?2)", params![prefix, level])?;
        }
        for (prefix, level, ch) in omen.conditional_entries() {
            tx.execute(
                "INSERT INTO ConditionalProb (prefix, level, next_char) VALUES (?1, ?2, ?3)",
                params![prefix, level, ch.to_string()],
            )?;
        }
        for (length, level) in omen.length_level_entries() {
            tx.execute(
                "INSERT INTO LengthLevel (length, level) VALUES (?1, ?2)",
                params![length as i64, level],
            )?;
        }
        for ch in omen.alphabet() {
            tx.execute("INSERT INTO Alphabet (ch) VALUES (?1)", params![ch.to_string()])?;
        }

        let total_passwords: f64 = passwords_per_level.values().sum();
        for (&level, &k) in keyspace {
            tx.execute(
                "INSERT INTO OmenKeyspace (level, keyspace) VALUES (?1, ?2)",
                params![level, k],
            )?;
            let count = passwords_per_level.get(&level).copied().unwrap_or(0.0);
            tx.execute(
                "INSERT INTO PasswordsPerLevel (level, count) VALUES (?1, ?2)",
                params![level, count],
            )?;
            // PcfgOmenProb[L] = (passwords_per_level[L] / total) / keyspace[L] (§4.9).
            let prob = if k > 0.0 && total_passwords > 0.0 {
                (count / total_passwords) / k
            } else {
                0.0
            };
            tx.execute(
                "INSERT INTO PcfgOmenProb (level, probability) VALUES (?1, ?2)",
                params![level, prob],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Persist training configuration (`ngram`, `markov_proportion`, etc.)
    /// as `Config` rows, for the `guess` session to reconstruct matching
    /// OMEN parameters.
    pub fn write_config(&self, entries: &[(&str, &str)]) -> StoreResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        for (key, value) in entries {
            tx.execute("INSERT INTO Config (key, value) VALUES (?1, ?2)", params![key, value])?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Reconstruct the PCFG [`Grammar`] from its persisted category tables
    /// and `Grammar` rows.
    pub fn load_grammar(&self) -> StoreResult<Grammar> {
        let mut grammar = Grammar::default();
        for label in CATEGORY_LABELS {
            let table = category_table(label);
            let mut stmt = self
                .conn
                .prepare(&format!("SELECT length, item, probability FROM {table} ORDER BY length, probability DESC"))?;
            let mut by_length: CommonHashMap<String, Vec<TerminalGroup>> = CommonHashMap::new();
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, f64>(2)?))
            })?;
            for row in rows {
                let (length, item, prob) = row?;
                let groups = by_length.entry(length).or_default();
                match groups.iter_mut().find(|g| (g.prob - prob).abs() < 1e-12) {
                    Some(group) => group.terminals.push(item),
                    None => groups.push(TerminalGroup { terminals: vec![item], prob }),
                }
            }
            for (length, mut groups) in by_length {
                groups.sort_by(|a, b| b.prob.partial_cmp(&a.prob).unwrap());
                let symbol = format!("{label}{length}");
                grammar.insert_symbol(symbol, groups);
            }
        }

        let level_probs = self.load_pcfg_omen_probs()?;
        if !level_probs.is_empty() {
            let mut groups: Vec<TerminalGroup> = level_probs
                .into_iter()
                .map(|(level, prob)| TerminalGroup { terminals: vec![level.to_string()], prob })
                .collect();
            groups.sort_by(|a, b| b.prob.partial_cmp(&a.prob).unwrap());
            grammar.insert_symbol("M", groups);
        }
        Ok(grammar)
    }

    /// Load the persisted base-structure set (the `Grammar` table's rows).
    pub fn load_base_structures(&self) -> StoreResult<BaseStructureSet> {
        let mut stmt = self
            .conn
            .prepare("SELECT item, probability FROM Grammar WHERE length = 'grammar'")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?)))?;
        let mut set = BaseStructureSet::default();
        for row in rows {
            let (structure, prob) = row?;
            set.structures.insert(structure, prob);
        }
        Ok(set)
    }

    /// Load the add-one-smoothed unigram table.
    pub fn load_unigram_probs(&self) -> StoreResult<UnigramProbs> {
        let mut stmt = self.conn.prepare("SELECT token, canonical, probability FROM UnigramProbs")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, f64>(2)?))
        })?;
        let entries: Vec<(String, String, f64)> = rows.collect::<rusqlite::Result<_>>()?;
        Ok(UnigramProbs::from_probabilities(entries))
    }

    /// Reconstruct the trained [`OmenGrammar`] from its persisted tables.
    pub fn load_omen_grammar(&self, ngram: usize, max_level: u32) -> StoreResult<OmenGrammar> {
        let mut ip_stmt = self.conn.prepare("SELECT level, prefix FROM PrefixLevel")?;
        let ip_entries: Vec<(u32, String)> = ip_stmt
            .query_map([], |row| Ok((row.get::<_, u32>(0)?, row.get::<_, String>(1)?)))?
            .collect::<rusqlite::Result<_>>()?;

        let mut ln_stmt = self.conn.prepare("SELECT length, level FROM LengthLevel")?;
        let length_entries: Vec<(usize, u32)> = ln_stmt
            .query_map([], |row| Ok((row.get::<_, i64>(0)? as usize, row.get::<_, u32>(1)?)))?
            .collect::<rusqlite::Result<_>>()?;

        let mut ep_stmt = self.conn.prepare("SELECT prefix, level FROM SuffixLevel")?;
        let ep_entries: Vec<(String, u32)> = ep_stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, u32>(1)?)))?
            .collect::<rusqlite::Result<_>>()?;

        let mut cp_stmt = self.conn.prepare("SELECT prefix, level, next_char FROM ConditionalProb")?;
        let cp_entries: Vec<(String, u32, char)> = cp_stmt
            .query_map([], |row| {
                let ch: String = row.get(2)?;
                Ok((row.get::<_, String>(0)?, row.get::<_, u32>(1)?, ch.chars().next().unwrap_or('\0')))
            })?
            .collect::<rusqlite::Result<_>>()?;

        Ok(OmenGrammar::from_parts(ngram, max_level, ip_entries, length_entries, ep_entries, cp_entries))
    }

    /// Load `PcfgOmenProb[level] -> probability`, the probability table the
    /// PCFG guesser uses for its `M` terminal.
    pub fn load_pcfg_omen_probs(&self) -> StoreResult<CommonHashMap<u32, f64>> {
        let mut stmt = self.conn.prepare("SELECT level, probability FROM PcfgOmenProb")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, u32>(0)?, row.get::<_, f64>(1)?)))?;
        let mut out = CommonHashMap::new();
        for row in rows {
            let (level, prob) = row?;
            out.insert(level, prob);
        }
        Ok(out)
    }

    /// Load the `Config` table.
    pub fn load_config(&self) -> StoreResult<CommonHashMap<String, String>> {
        let mut stmt = self.conn.prepare("SELECT key, value FROM Config")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;
        let mut out = CommonHashMap::new();
        for row in rows {
            let (k, v) = row?;
            out.insert(k, v);
        }
        Ok(out)
    }

    /// Look up a single config value.
    pub fn config_value(&self, key: &str) -> StoreResult<Option<String>> {
        self.conn
            .query_row("SELECT value FROM Config WHERE key = ?1", params![key], |row| row.get(0))
            .optional()
            .map_err(StoreError::from)
    }
}

fn label_from_char(c: char) -> Option<Label> {
    match c {
        'K' => Some(Label::Keyboard),
        'Y' => Some(Label::Year),
        'D' => Some(Label::Digit),
        'A' => Some(Label::Alpha),
        'H' => Some(Label::Hangul),
        'S' => Some(Label::Special),
        'C' => Some(Label::Capitalization),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pwcrack::grammar::TerminalGroup;
    use tempdir::TempDir;

    #[test]
    fn round_trips_category_and_base_structure_tables() {
        let dir = TempDir::new("pwcrack-store-test").unwrap();
        let path = dir.path().join("grammar.db");

        let mut grammar = Grammar::default();
        grammar.insert_symbol(
            "D4",
            vec![
                TerminalGroup { terminals: vec!["1234".into()], prob: 0.6 },
                TerminalGroup { terminals: vec!["0000".into(), "1111".into()], prob: 0.2 },
            ],
        );
        let mut base = BaseStructureSet::default();
        base.structures.insert("D4".to_string(), 1.0);

        {
            let store = SqliteStore::create(&path).unwrap();
            store.write_grammar_categories(&grammar).unwrap();
            store.write_base_structures(&base).unwrap();
        }

        let store = SqliteStore::open_readonly(&path).unwrap();
        let loaded = store.load_grammar().unwrap();
        let groups = loaded.symbol("D4").unwrap();
        assert_eq!(groups.len(), 2);
        assert!(groups[0].prob > groups[1].prob);

        let loaded_base = store.load_base_structures().unwrap();
        assert_eq!(loaded_base.structures.get("D4"), Some(&1.0));
    }

    #[test]
    fn round_trips_omen_tables() {
        use pwcrack::omen::OmenGrammarBuilder;

        let dir = TempDir::new("pwcrack-store-omen-test").unwrap();
        let path = dir.path().join("omen.db");

        let mut builder = OmenGrammarBuilder::new(4);
        for pw in ["password", "passphrase", "passenger"] {
            builder.parse(pw, 1.0);
        }
        let omen = builder.finalize(10);
        let keyspace = omen.keyspace(3, 1e10);
        let mut passwords_per_level = CommonHashMap::new();
        passwords_per_level.insert(0u32, 3.0);

        {
            let store = SqliteStore::create(&path).unwrap();
            store.write_omen_grammar(&omen, &keyspace, &passwords_per_level).unwrap();
        }

        let store = SqliteStore::open_readonly(&path).unwrap();
        let loaded = store.load_omen_grammar(4, 10).unwrap();
        assert_eq!(loaded.password_level("password"), omen.password_level("password"));

        let probs = store.load_pcfg_omen_probs().unwrap();
        assert!(probs.contains_key(&0));
    }

    #[test]
    fn config_round_trips() {
        let dir = TempDir::new("pwcrack-store-config-test").unwrap();
        let path = dir.path().join("config.db");
        {
            let store = SqliteStore::create(&path).unwrap();
            store.write_config(&[("ngram", "4"), ("markov_proportion", "0.5")]).unwrap();
        }
        let store = SqliteStore::open_readonly(&path).unwrap();
        assert_eq!(store.config_value("ngram").unwrap(), Some("4".to_string()));
        assert_eq!(store.config_value("missing").unwrap(), None);
    }
}
