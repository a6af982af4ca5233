//! OMEN n-gram training: initial/conditional/ending/length level tables
//! built with Good-Turing-style discrete smoothing (§4.4).

use crate::types::CommonHashMap;

/// `level(x, total, factor) = clamp(floor(-log(x/total*factor + 1e-11)), 0, max_level)`.
fn smoothed_level(
    x: f64,
    total: f64,
    factor: f64,
    max_level: u32,
) -> u32 {
    if total <= 0.0 {
        return max_level;
    }
    let ratio = x / total * factor + 1e-11;
    let raw = (-ratio.ln()).floor();
    raw.clamp(0.0, max_level as f64) as u32
}

const START_FACTOR: f64 = 250.0;
const MIDDLE_FACTOR: f64 = 2.0;
const END_FACTOR: f64 = 250.0;
const LENGTH_FACTOR: f64 = 1.0;

/// Accumulates raw n-gram observation counts over a training corpus (§4.4
/// `parse`); call [`OmenGrammarBuilder::finalize`] once to apply level
/// smoothing and produce the immutable [`OmenGrammar`] used for guessing.
#[derive(Debug, Clone)]
pub struct OmenGrammarBuilder {
    ngram: usize,
    count_at_start: CommonHashMap<String, f64>,
    count_at_end: CommonHashMap<String, f64>,
    next_char_counts: CommonHashMap<String, CommonHashMap<char, f64>>,
    global_count_at_start: f64,
    global_count_at_end: f64,
    ln_lookup: CommonHashMap<usize, f64>,
    ln_counter: f64,
}

impl OmenGrammarBuilder {
    /// Construct an empty builder for the given n-gram window size (the
    /// full window, e.g. `4`; the initial-prefix length is `ngram - 1`).
    pub fn new(ngram: usize) -> Self {
        assert!(ngram >= 2, "ngram must allow at least a 1-character prefix");
        Self {
            ngram,
            count_at_start: CommonHashMap::new(),
            count_at_end: CommonHashMap::new(),
            next_char_counts: CommonHashMap::new(),
            global_count_at_start: 0.0,
            global_count_at_end: 0.0,
            ln_lookup: CommonHashMap::new(),
            ln_counter: 0.0,
        }
    }

    /// Fold one training password into the running counters (§4.4).
    pub fn parse(
        &mut self,
        password: &str,
        weight: f64,
    ) {
        let chars: Vec<char> = password.chars().collect();
        let len = chars.len();
        if len == 0 {
            return;
        }
        *self.ln_lookup.entry(len).or_insert(0.0) += weight;
        self.ln_counter += weight;

        let prefix_len = self.ngram - 1;
        if len < prefix_len {
            return;
        }
        let last_i = len - prefix_len;
        for i in 0..=last_i {
            let prefix: String = chars[i..i + prefix_len].iter().collect();
            if i == 0 {
                *self.count_at_start.entry(prefix.clone()).or_insert(0.0) += weight;
                self.global_count_at_start += weight;
            }
            if i < last_i {
                let next_char = chars[i + prefix_len];
                *self
                    .next_char_counts
                    .entry(prefix)
                    .or_default()
                    .entry(next_char)
                    .or_insert(0.0) += weight;
            } else {
                *self.count_at_end.entry(prefix).or_insert(0.0) += weight;
                self.global_count_at_end += weight;
            }
        }
    }

    /// Apply level smoothing and build the immutable guessing-time grammar.
    pub fn finalize(
        self,
        max_level: u32,
    ) -> OmenGrammar {
        let mut all_prefixes: std::collections::HashSet<String> = std::collections::HashSet::new();
        all_prefixes.extend(self.count_at_start.keys().cloned());
        all_prefixes.extend(self.count_at_end.keys().cloned());
        all_prefixes.extend(self.next_char_counts.keys().cloned());

        let mut ip_level_by_prefix = CommonHashMap::new();
        let mut ip_by_level: Vec<Vec<String>> = vec![Vec::new(); max_level as usize + 1];
        for prefix in &all_prefixes {
            let count = self.count_at_start.get(prefix).copied().unwrap_or(0.0);
            let level = smoothed_level(count, self.global_count_at_start, START_FACTOR, max_level);
            ip_level_by_prefix.insert(prefix.clone(), level);
            ip_by_level[level as usize].push(prefix.clone());
        }
        for bucket in &mut ip_by_level {
            bucket.sort();
        }

        let mut ep = CommonHashMap::new();
        for prefix in &all_prefixes {
            let count = self.count_at_end.get(prefix).copied().unwrap_or(0.0);
            let level = smoothed_level(count, self.global_count_at_end, END_FACTOR, max_level);
            ep.insert(prefix.clone(), level);
        }

        let mut cp: CommonHashMap<String, CommonHashMap<u32, Vec<char>>> = CommonHashMap::new();
        let mut cp_level_by_prefix_char: CommonHashMap<String, CommonHashMap<char, u32>> =
            CommonHashMap::new();
        for (prefix, next_chars) in &self.next_char_counts {
            let total: f64 = next_chars.values().sum();
            for (&ch, &count) in next_chars {
                let level = smoothed_level(count, total, MIDDLE_FACTOR, max_level);
                cp.entry(prefix.clone())
                    .or_default()
                    .entry(level)
                    .or_default()
                    .push(ch);
                cp_level_by_prefix_char
                    .entry(prefix.clone())
                    .or_default()
                    .insert(ch, level);
            }
        }
        for levels in cp.values_mut() {
            for chars in levels.values_mut() {
                chars.sort();
            }
        }

        let mut ln_level_by_length = CommonHashMap::new();
        let mut ln_by_level: Vec<Vec<usize>> = vec![Vec::new(); max_level as usize + 1];
        for (&length, &count) in &self.ln_lookup {
            let level = smoothed_level(count, self.ln_counter, LENGTH_FACTOR, max_level);
            ln_level_by_length.insert(length, level);
            if length >= self.ngram {
                ln_by_level[level as usize].push(length);
            }
        }
        for bucket in &mut ln_by_level {
            bucket.sort_unstable();
        }

        OmenGrammar {
            ngram: self.ngram,
            max_level,
            ip_by_level,
            ip_level_by_prefix,
            ep,
            cp,
            cp_level_by_prefix_char,
            ln_by_level,
            ln_level_by_length,
        }
    }
}

/// The immutable, smoothed OMEN grammar used for guessing and keyspace
/// estimation (§4.4). Shared read-only across worker threads once loaded.
#[derive(Debug, Clone)]
pub struct OmenGrammar {
    /// Full n-gram window size; the initial-prefix length is `ngram - 1`.
    pub ngram: usize,
    /// Maximum discretized level (§4.4 default 10).
    pub max_level: u32,
    ip_by_level: Vec<Vec<String>>,
    ip_level_by_prefix: CommonHashMap<String, u32>,
    ep: CommonHashMap<String, u32>,
    cp: CommonHashMap<String, CommonHashMap<u32, Vec<char>>>,
    cp_level_by_prefix_char: CommonHashMap<String, CommonHashMap<char, u32>>,
    ln_by_level: Vec<Vec<usize>>,
    ln_level_by_length: CommonHashMap<usize, u32>,
}

impl OmenGrammar {
    /// Reconstruct a grammar from persisted rows (§4.9 reload path), the
    /// inverse of [`OmenGrammar::ip_entries`]/[`OmenGrammar::length_level_entries`]/
    /// [`OmenGrammar::ending_level_entries`]/[`OmenGrammar::conditional_entries`].
    pub fn from_parts(
        ngram: usize,
        max_level: u32,
        ip_entries: impl IntoIterator<Item = (u32, String)>,
        length_level_entries: impl IntoIterator<Item = (usize, u32)>,
        ending_level_entries: impl IntoIterator<Item = (String, u32)>,
        conditional_entries: impl IntoIterator<Item = (String, u32, char)>,
    ) -> Self {
        let mut ip_by_level: Vec<Vec<String>> = vec![Vec::new(); max_level as usize + 1];
        let mut ip_level_by_prefix = CommonHashMap::new();
        for (level, prefix) in ip_entries {
            ip_level_by_prefix.insert(prefix.clone(), level);
            ip_by_level[level as usize].push(prefix);
        }
        for bucket in &mut ip_by_level {
            bucket.sort();
        }

        let mut ln_level_by_length = CommonHashMap::new();
        let mut ln_by_level: Vec<Vec<usize>> = vec![Vec::new(); max_level as usize + 1];
        for (length, level) in length_level_entries {
            ln_level_by_length.insert(length, level);
            if length >= ngram {
                ln_by_level[level as usize].push(length);
            }
        }
        for bucket in &mut ln_by_level {
            bucket.sort_unstable();
        }

        let ep: CommonHashMap<String, u32> = ending_level_entries.into_iter().collect();

        let mut cp: CommonHashMap<String, CommonHashMap<u32, Vec<char>>> = CommonHashMap::new();
        let mut cp_level_by_prefix_char: CommonHashMap<String, CommonHashMap<char, u32>> = CommonHashMap::new();
        for (prefix, level, ch) in conditional_entries {
            cp.entry(prefix.clone()).or_default().entry(level).or_default().push(ch);
            cp_level_by_prefix_char.entry(prefix).or_default().insert(ch, level);
        }
        for levels in cp.values_mut() {
            for chars in levels.values_mut() {
                chars.sort();
            }
        }

        OmenGrammar {
            ngram,
            max_level,
            ip_by_level,
            ip_level_by_prefix,
            ep,
            cp,
            cp_level_by_prefix_char,
            ln_by_level,
            ln_level_by_length,
        }
    }

    /// The initial prefix at `ip[level][index]`, if any.
    pub fn ip_at(
        &self,
        level: u32,
        index: usize,
    ) -> Option<&str> {
        self.ip_by_level
            .get(level as usize)
            .and_then(|v| v.get(index))
            .map(|s| s.as_str())
    }

    /// Number of initial prefixes at `level`.
    pub fn ip_level_len(
        &self,
        level: u32,
    ) -> usize {
        self.ip_by_level.get(level as usize).map(|v| v.len()).unwrap_or(0)
    }

    /// The smallest level with at least one initial prefix.
    pub fn first_nonempty_ip_level(&self) -> Option<u32> {
        (0..=self.max_level).find(|&lvl| self.ip_level_len(lvl) > 0)
    }

    /// The length at `ln[level][index]` (only lengths `>= ngram` are
    /// tracked here; a [`OmenGrammar::password_level`] lookup for shorter
    /// training passwords consults the unfiltered length table directly).
    pub fn ln_at(
        &self,
        level: u32,
        index: usize,
    ) -> Option<usize> {
        self.ln_by_level
            .get(level as usize)
            .and_then(|v| v.get(index))
            .copied()
    }

    /// Number of lengths at `level`.
    pub fn ln_level_len(
        &self,
        level: u32,
    ) -> usize {
        self.ln_by_level.get(level as usize).map(|v| v.len()).unwrap_or(0)
    }

    /// The smallest level with at least one length.
    pub fn first_nonempty_ln_level(&self) -> Option<u32> {
        (0..=self.max_level).find(|&lvl| self.ln_level_len(lvl) > 0)
    }

    /// The next-character candidates for `prefix` at exactly `level`.
    pub fn cp_chars(
        &self,
        prefix: &str,
        level: u32,
    ) -> Option<&[char]> {
        self.cp.get(prefix).and_then(|levels| levels.get(&level)).map(|v| v.as_slice())
    }

    /// All `(level -> candidates)` entries for `prefix`.
    pub fn cp_levels(
        &self,
        prefix: &str,
    ) -> Option<&CommonHashMap<u32, Vec<char>>> {
        self.cp.get(prefix)
    }

    /// Every `(level, initial prefix)` pair, for the `PrefixLevel` table (§4.9).
    pub fn ip_entries(&self) -> impl Iterator<Item = (u32, &str)> {
        self.ip_by_level
            .iter()
            .enumerate()
            .flat_map(|(level, prefixes)| prefixes.iter().map(move |p| (level as u32, p.as_str())))
    }

    /// Every `(length, level)` pair, for the `LengthLevel` table (§4.9) —
    /// includes lengths shorter than `ngram`, which are excluded from
    /// [`OmenGrammar::ln_at`]'s guessing-time traversal.
    pub fn length_level_entries(&self) -> impl Iterator<Item = (usize, u32)> + '_ {
        self.ln_level_by_length.iter().map(|(&len, &level)| (len, level))
    }

    /// Every `(prefix, level)` pair, for the `SuffixLevel` table (§4.9).
    pub fn ending_level_entries(&self) -> impl Iterator<Item = (&str, u32)> {
        self.ep.iter().map(|(p, &level)| (p.as_str(), level))
    }

    /// Every `(prefix, level, next char)` triple, for the `ConditionalProb`
    /// table (§4.9).
    pub fn conditional_entries(&self) -> impl Iterator<Item = (&str, u32, char)> {
        self.cp.iter().flat_map(|(prefix, levels)| {
            levels
                .iter()
                .flat_map(move |(&level, chars)| chars.iter().map(move |&ch| (prefix.as_str(), level, ch)))
        })
    }

    /// The distinct alphabet of characters observed as conditional
    /// candidates, for the `Alphabet` table (§4.9).
    pub fn alphabet(&self) -> Vec<char> {
        let mut chars: std::collections::BTreeSet<char> = std::collections::BTreeSet::new();
        for levels in self.cp.values() {
            for group in levels.values() {
                chars.extend(group.iter().copied());
            }
        }
        chars.into_iter().collect()
    }

    /// This prefix's ending level (`SuffixLevel`, §4.9) — tracked for
    /// persistence fidelity; unused by guessing or keyspace estimation (the
    /// reference implementation computes neither from it; see DESIGN.md).
    pub fn ending_level(
        &self,
        prefix: &str,
    ) -> Option<u32> {
        self.ep.get(prefix).copied()
    }

    /// Total OMEN level for a training password under this grammar: the
    /// length level plus the initial-prefix level plus the sum of
    /// conditional levels along its n-gram walk. Returns `None` if any
    /// n-gram along the walk is unknown to the grammar (mirrors
    /// `find_omen_level`'s `KeyError -> -1` in the reference trainer).
    pub fn password_level(
        &self,
        password: &str,
    ) -> Option<u32> {
        let chars: Vec<char> = password.chars().collect();
        let len = chars.len();
        let prefix_len = self.ngram - 1;
        if len < prefix_len {
            return None;
        }
        let ip: String = chars[0..prefix_len].iter().collect();
        let ln_level = *self.ln_level_by_length.get(&len)?;
        let mut chain_level = *self.ip_level_by_prefix.get(&ip)?;

        let mut end_pos = self.ngram;
        while end_pos <= len {
            let chunk_prefix: String = chars[end_pos - self.ngram..end_pos - 1].iter().collect();
            let ch = chars[end_pos - 1];
            let level = *self.cp_level_by_prefix_char.get(&chunk_prefix)?.get(&ch)?;
            chain_level += level;
            end_pos += 1;
        }
        Some(ln_level + chain_level)
    }

    /// Keyspace per level `K(L)` for `L` in `0..=max_target_level` (§4.4),
    /// via the memoized DP over `(prefix, remaining-length, remaining-level)`,
    /// clamped at `cap` (spec default `1e10`).
    pub fn keyspace(
        &self,
        max_target_level: u32,
        cap: f64,
    ) -> CommonHashMap<u32, f64> {
        let mut memo = CommonHashMap::new();
        let mut out = CommonHashMap::new();
        for level in 0..=max_target_level {
            let mut total = 0.0f64;
            for (ip, &ip_level) in &self.ip_level_by_prefix {
                if total > cap {
                    break;
                }
                let level_minus_ip = level as i64 - ip_level as i64;
                if level_minus_ip < 0 {
                    continue;
                }
                for (&length, &len_level) in &self.ln_level_by_length {
                    if length <= self.ngram {
                        continue;
                    }
                    if len_level as i64 > level_minus_ip {
                        continue;
                    }
                    let steps = length - self.ngram + 1;
                    total += self.rec_keyspace(ip, level_minus_ip - len_level as i64, steps, &mut memo, cap);
                }
            }
            out.insert(level, total.min(cap));
        }
        out
    }

    fn rec_keyspace(
        &self,
        ip: &str,
        level: i64,
        length: usize,
        memo: &mut CommonHashMap<(String, usize, i64), f64>,
        cap: f64,
    ) -> f64 {
        if level < 0 {
            return 0.0;
        }
        let key = (ip.to_string(), length, level);
        if let Some(&cached) = memo.get(&key) {
            return cached;
        }

        let result = if length == 1 {
            self.cp
                .get(ip)
                .and_then(|levels| levels.get(&(level as u32)))
                .map(|v| v.len() as f64)
                .unwrap_or(0.0)
        } else {
            let mut total = 0.0;
            if let Some(levels) = self.cp.get(ip) {
                for (&lvl, chars) in levels {
                    if lvl as i64 > level {
                        continue;
                    }
                    for &ch in chars {
                        let mut next_ip: String = ip.chars().skip(1).collect();
                        next_ip.push(ch);
                        total += self.rec_keyspace(&next_ip, level - lvl as i64, length - 1, memo, cap);
                        if total > cap {
                            break;
                        }
                    }
                    if total > cap {
                        break;
                    }
                }
            }
            total.min(cap)
        };
        memo.insert(key, result);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_parts_round_trips_password_level() {
        let mut builder = OmenGrammarBuilder::new(4);
        for pw in ["password", "passphrase", "passenger"] {
            builder.parse(pw, 1.0);
        }
        let grammar = builder.finalize(10);

        let reloaded = OmenGrammar::from_parts(
            grammar.ngram,
            grammar.max_level,
            grammar.ip_entries().map(|(l, p)| (l, p.to_string())),
            grammar.length_level_entries(),
            grammar.ending_level_entries().map(|(p, l)| (p.to_string(), l)),
            grammar.conditional_entries().map(|(p, l, c)| (p.to_string(), l, c)),
        );

        assert_eq!(reloaded.password_level("password"), grammar.password_level("password"));
        assert_eq!(reloaded.first_nonempty_ip_level(), grammar.first_nonempty_ip_level());
    }

    #[test]
    fn smoothed_level_extremes_match_invariant_8() {
        assert_eq!(smoothed_level(0.0, 100.0, 250.0, 10), 10);
        assert_eq!(smoothed_level(100.0, 100.0, 250.0, 10), 0);
    }

    #[test]
    fn finalize_groups_prefixes_by_start_level() {
        let mut builder = OmenGrammarBuilder::new(4);
        for _ in 0..100 {
            builder.parse("passwo", 1.0);
        }
        builder.parse("xyzzy", 1.0);
        let grammar = builder.finalize(10);
        // "pas" (the common prefix) should land at a lower level than the
        // rare "xyz" prefix.
        let pas_level = grammar.ip_level_by_prefix["pas"];
        let xyz_level = grammar.ip_level_by_prefix["xyz"];
        assert!(pas_level < xyz_level);
    }

    #[test]
    fn password_level_is_none_for_unknown_ngram() {
        let mut builder = OmenGrammarBuilder::new(4);
        builder.parse("password", 1.0);
        let grammar = builder.finalize(10);
        assert!(grammar.password_level("password").is_some());
        assert!(grammar.password_level("zzzzzzzz").is_none());
    }

    #[test]
    fn keyspace_is_monotonic_non_decreasing_in_level() {
        let mut builder = OmenGrammarBuilder::new(4);
        for pw in ["password", "passphrase", "passenger", "passport"] {
            builder.parse(pw, 1.0);
        }
        let grammar = builder.finalize(10);
        let keyspace = grammar.keyspace(6, 1e10);
        let mut prev = 0.0;
        for level in 0..=6 {
            let k = keyspace[&level];
            assert!(k + 1e-9 >= prev, "keyspace should not shrink as level grows");
            prev = k;
        }
    }
}
