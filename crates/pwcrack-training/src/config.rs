//! `config.ini` parsing (§6/§12): a small hand-rolled `key=value` line
//! parser accepting the keys §6 names plus the `markov_proportion` knob
//! (§13).

use pwcrack::errors::{PwCrackError, PwResult};

/// Training configuration loaded from `config.ini`.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainConfig {
    /// OMEN n-gram window size (full window, e.g. `4`).
    pub ngram: usize,
    /// Source text encoding name, carried through for diagnostics; training
    /// always operates on decoded `str` regardless of this value.
    pub encoding: String,
    /// Minimum accepted password length (§6).
    pub min_length: usize,
    /// Maximum accepted password length (§6).
    pub max_length: usize,
    /// The alphabet string used to validate/segment non-Latin input.
    pub alphabet: String,
    /// Minimum observation count for a terminal/word to be promoted.
    pub needed_appear: u64,
    /// Per-password training weight (`OmenGrammarBuilder::parse`'s `weight`).
    pub weight: f64,
    /// §13 knob: proportion of guessing probability mass reserved for the
    /// synthetic Markov (`M`) base structure. `1.0` = untouched PCFG mix,
    /// `0.0` = pure Markov-only mode.
    pub markov_proportion: f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            ngram: 4,
            encoding: "utf-8".to_string(),
            min_length: 4,
            max_length: 30,
            alphabet: "abcdefghijklmnopqrstuvwxyz".to_string(),
            needed_appear: 1,
            weight: 1.0,
            markov_proportion: 1.0,
        }
    }
}

impl TrainConfig {
    /// Parse a `config.ini` body. Blank lines, `#`/`;` comments, and
    /// `[section]` headers are ignored; every other non-blank line must be
    /// `key = value`. Unrecognized keys are rejected as a config error, not
    /// silently ignored, so a typo in `config.ini` surfaces immediately.
    pub fn from_ini_str(body: &str) -> PwResult<Self> {
        let mut config = Self::default();
        for (lineno, raw_line) in body.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') || line.starts_with('[') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(PwCrackError::Config(format!(
                    "line {}: expected key=value, got {raw_line:?}",
                    lineno + 1
                )));
            };
            let key = key.trim();
            let value = value.trim();
            match key {
                "ngram" => config.ngram = parse_field(key, value)?,
                "encoding" => config.encoding = value.to_string(),
                "min_length" => config.min_length = parse_field(key, value)?,
                "max_length" => config.max_length = parse_field(key, value)?,
                "alphabet" => config.alphabet = value.to_string(),
                "needed_appear" => config.needed_appear = parse_field(key, value)?,
                "weight" => config.weight = parse_field(key, value)?,
                "markov_proportion" => config.markov_proportion = parse_field(key, value)?,
                other => {
                    return Err(PwCrackError::Config(format!("line {}: unknown config key {other:?}", lineno + 1)));
                }
            }
        }
        if config.min_length > config.max_length {
            return Err(PwCrackError::Config(format!(
                "min_length ({}) exceeds max_length ({})",
                config.min_length, config.max_length
            )));
        }
        Ok(config)
    }
}

fn parse_field<T: std::str::FromStr>(key: &str, value: &str) -> PwResult<T> {
    value
        .parse()
        .map_err(|_| PwCrackError::Config(format!("invalid value for {key}: {value:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_documented_key() {
        let body = "\
            # comment\n\
            [training]\n\
            ngram=4\n\
            encoding = utf-8\n\
            min_length=6\n\
            max_length=20\n\
            alphabet = abcdefghijklmnopqrstuvwxyz\n\
            needed_appear = 5\n\
            weight = 1.5\n\
            markov_proportion = 0.5\n\
        ";
        let config = TrainConfig::from_ini_str(body).unwrap();
        assert_eq!(config.ngram, 4);
        assert_eq!(config.min_length, 6);
        assert_eq!(config.max_length, 20);
        assert_eq!(config.needed_appear, 5);
        assert!((config.weight - 1.5).abs() < 1e-9);
        assert!((config.markov_proportion - 0.5).abs() < 1e-9);
    }

    #[test]
    fn rejects_unknown_key() {
        assert!(TrainConfig::from_ini_str("bogus_key=1").is_err());
    }

    #[test]
    fn rejects_inverted_length_bounds() {
        assert!(TrainConfig::from_ini_str("min_length=20\nmax_length=5\n").is_err());
    }

    #[test]
    fn defaults_are_self_consistent() {
        let config = TrainConfig::default();
        assert!(config.min_length <= config.max_length);
    }
}
